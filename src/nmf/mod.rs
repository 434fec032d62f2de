//! # Factorization clusterer family
//!
//! Non-negative matrix factorization `X ≈ W H` with rank `k`; every row takes
//! the label of its dominant basis component. Input data of any sign is
//! first mapped to a non-negative matrix by [`nmf_transform`].

pub mod brunet;
pub mod factorization;
pub mod lee;
pub mod update_rules;

#[cfg(test)]
pub(crate) mod test_utils;

use std::fmt;

use log::debug;
use ndarray::Array2;

use crate::cluster::{ensure_enough_items, ClusterContext, MatrixClusterer, Partition};
use crate::error::{ClusteringFailure, EnsembleError};
use crate::matrix::drop_zero_columns;
use crate::util::{argmax_axis1, one_based};

pub use brunet::BrunetUpdater;
pub use factorization::{run_factorization, NmfConfig, NmfResult, NmfUpdater};
pub use lee::LeeUpdater;

/// Supported factorization methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NmfMethod {
    Brunet,
    Lee,
}

impl NmfMethod {
    /// Parse a method name (case-insensitive)
    pub fn parse(name: &str) -> Result<Self, EnsembleError> {
        match name.to_ascii_lowercase().as_str() {
            "brunet" => Ok(NmfMethod::Brunet),
            "lee" => Ok(NmfMethod::Lee),
            _ => Err(EnsembleError::UnknownNmfMethod(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NmfMethod::Brunet => "brunet",
            NmfMethod::Lee => "lee",
        }
    }

    /// Variant label in the ensemble array
    pub fn label(&self) -> String {
        format!("NMF_{}", crate::distance::capitalize(self.name()))
    }

    fn updater(&self) -> Box<dyn NmfUpdater> {
        match self {
            NmfMethod::Brunet => Box::new(BrunetUpdater),
            NmfMethod::Lee => Box::new(LeeUpdater),
        }
    }
}

impl fmt::Display for NmfMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// `[x, -x]` column-wise with negatives clipped to zero (2p columns)
pub fn nmf_transform(x: &Array2<f64>) -> Array2<f64> {
    let p = x.ncols();
    Array2::from_shape_fn((x.nrows(), 2 * p), |(i, j)| {
        if j < p {
            x[[i, j]].max(0.0)
        } else {
            (-x[[i, j - p]]).max(0.0)
        }
    })
}

/// One NMF method applied as a clusterer
#[derive(Debug, Clone)]
pub struct NmfClusterer {
    pub method: NmfMethod,
    pub max_iter: usize,
    pub n_init: usize,
    pub tol: f64,
}

impl NmfClusterer {
    pub fn new(method: NmfMethod) -> Self {
        Self {
            method,
            max_iter: 500,
            n_init: 1,
            tol: 1e-6,
        }
    }
}

impl MatrixClusterer for NmfClusterer {
    fn cluster(
        &self,
        data: &Array2<f64>,
        ctx: &ClusterContext,
    ) -> Result<Partition, ClusteringFailure> {
        let algorithm = self.method.label();
        ensure_enough_items(&algorithm, data.nrows(), ctx.k)?;

        let v = drop_zero_columns(&nmf_transform(data));
        if v.ncols() == 0 || v.iter().all(|&x| x == 0.0) {
            return Err(ClusteringFailure::new(algorithm, "all columns are zero"));
        }
        debug!(
            "{}: factorizing {}x{} with rank {}",
            algorithm,
            v.nrows(),
            v.ncols(),
            ctx.k
        );

        let config = NmfConfig {
            rank: ctx.k,
            max_iter: self.max_iter,
            n_init: self.n_init,
            tol: self.tol,
            seed: ctx.seed,
        };
        let result = run_factorization(&config, self.method.updater().as_ref(), &v);
        if !result.criterion.is_finite() {
            return Err(ClusteringFailure::new(algorithm, "factorization diverged"));
        }
        Ok(one_based(argmax_axis1(&result.w)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::test_utils::{check_block_labels, labels_within};
    use ndarray::array;
    use test_utils::make_block_diagonal;

    #[test]
    fn test_transform_splits_signs() {
        let x = array![[1.0, -2.0], [-0.5, 0.0]];
        let t = nmf_transform(&x);
        assert_eq!(t, array![[1.0, 0.0, 0.0, 2.0], [0.0, 0.0, 0.5, 0.0]]);
    }

    #[test]
    fn test_parse_methods() {
        assert_eq!(NmfMethod::parse("Brunet").unwrap(), NmfMethod::Brunet);
        assert_eq!(NmfMethod::Lee.label(), "NMF_Lee");
        match NmfMethod::parse("offset") {
            Err(EnsembleError::UnknownNmfMethod(name)) => assert_eq!(name, "offset"),
            other => panic!("unexpected: {:?}", other.map(|m| m.name())),
        }
    }

    #[test]
    fn test_nmf_recovers_blocks() {
        let x = make_block_diagonal();
        for method in [NmfMethod::Brunet, NmfMethod::Lee] {
            let labels = NmfClusterer::new(method)
                .cluster(&x, &ClusterContext::new(2, 3))
                .unwrap();
            assert!(labels_within(&labels, 2));
            assert!(check_block_labels(&labels, 10), "{} failed", method);
        }
    }

    #[test]
    fn test_nmf_is_seeded() {
        let x = make_block_diagonal();
        let c = NmfClusterer::new(NmfMethod::Brunet);
        let a = c.cluster(&x, &ClusterContext::new(3, 9)).unwrap();
        let b = c.cluster(&x, &ClusterContext::new(3, 9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_nmf_all_zero_fails() {
        let x = Array2::zeros((6, 3));
        let result = NmfClusterer::new(NmfMethod::Lee).cluster(&x, &ClusterContext::new(2, 0));
        assert!(result.is_err());
    }
}
