//! `gmm`: Gaussian mixture with `k` full-covariance components fitted by EM.

use linfa::prelude::{Fit, Predict};
use linfa::DatasetBase;
use linfa_clustering::GaussianMixtureModel;
use log::debug;
use ndarray::Array2;
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::SeedableRng;

use super::{ensure_enough_items, ClusterContext, MatrixClusterer, Partition};
use crate::error::ClusteringFailure;
use crate::util::one_based;

#[derive(Debug, Clone)]
pub struct GmmClusterer {
    pub n_runs: u64,
    pub max_iter: u64,
    pub tol: f64,
    /// Added to the covariance diagonals
    pub reg_covariance: f64,
}

impl Default for GmmClusterer {
    fn default() -> Self {
        Self {
            n_runs: 1,
            max_iter: 200,
            tol: 1e-3,
            reg_covariance: 1e-6,
        }
    }
}

impl MatrixClusterer for GmmClusterer {
    fn cluster(
        &self,
        data: &Array2<f64>,
        ctx: &ClusterContext,
    ) -> Result<Partition, ClusteringFailure> {
        ensure_enough_items("gmm", data.nrows(), ctx.k)?;
        let dataset = DatasetBase::from(data.clone());
        let model = GaussianMixtureModel::params(ctx.k)
            .n_runs(self.n_runs)
            .max_n_iterations(self.max_iter)
            .tolerance(self.tol)
            .reg_covariance(self.reg_covariance)
            .with_rng(StdRng::seed_from_u64(ctx.seed))
            .fit(&dataset)
            .map_err(|e| {
                // convergence trouble is expected on small subsamples
                debug!("gmm: k={} fit failed: {}", ctx.k, e);
                ClusteringFailure::from_error("gmm", e)
            })?;

        let labels = model.predict(dataset.records());
        Ok(one_based(labels.iter().copied()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::test_utils::{check_block_labels, make_blobs};

    #[test]
    fn test_gmm_two_blobs() {
        let x = make_blobs(&[[0.0, 0.0], [10.0, 10.0]], 25, 13);
        let labels = GmmClusterer::default()
            .cluster(&x, &ClusterContext::new(2, 7))
            .unwrap();
        assert!(check_block_labels(&labels, 25));
    }

    #[test]
    fn test_gmm_too_few_rows() {
        let x = ndarray::array![[0.0, 1.0]];
        assert!(GmmClusterer::default()
            .cluster(&x, &ClusterContext::new(2, 0))
            .is_err());
    }
}
