//! # Clusterer families
//!
//! Two narrow contracts cover every non-factorization algorithm:
//!
//! * [`DissimilarityClusterer`]: precomputed dissimilarity + k → labels
//!   (`hc`, `diana`, `km`, `pam`);
//! * [`MatrixClusterer`]: raw (sub-sampled) data + k → labels
//!   (`ap`, `sc`, `gmm`, `block`, `som`, `cmeans`, `dbscan`).
//!
//! Closures with the matching signature implement the traits, so custom
//! algorithms are registered exactly like the built-ins.

pub mod affinity;
pub mod block;
pub mod cmeans;
pub mod dbscan;
pub mod divisive;
pub mod gmm;
pub mod hierarchical;
pub mod partitioning;
pub mod som;
pub mod spectral;

use ndarray::Array2;

use crate::distance::Dissimilarity;
use crate::error::ClusteringFailure;

/// One label (or missing) per input row
pub type Partition = Vec<Option<usize>>;

/// Per-call parameters shared by every clusterer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterContext {
    /// Requested number of clusters
    pub k: usize,
    /// Seed for the algorithm's own randomness
    pub seed: u64,
}

impl ClusterContext {
    pub fn new(k: usize, seed: u64) -> Self {
        Self { k, seed }
    }
}

/// Clustering from a precomputed dissimilarity matrix
pub trait DissimilarityClusterer: Send + Sync {
    fn cluster(
        &self,
        diss: &Dissimilarity,
        ctx: &ClusterContext,
    ) -> Result<Partition, ClusteringFailure>;
}

impl<F> DissimilarityClusterer for F
where
    F: Fn(&Dissimilarity, &ClusterContext) -> Result<Partition, ClusteringFailure> + Send + Sync,
{
    fn cluster(
        &self,
        diss: &Dissimilarity,
        ctx: &ClusterContext,
    ) -> Result<Partition, ClusteringFailure> {
        self(diss, ctx)
    }
}

/// Clustering from the data matrix itself
pub trait MatrixClusterer: Send + Sync {
    fn cluster(
        &self,
        data: &Array2<f64>,
        ctx: &ClusterContext,
    ) -> Result<Partition, ClusteringFailure>;
}

impl<F> MatrixClusterer for F
where
    F: Fn(&Array2<f64>, &ClusterContext) -> Result<Partition, ClusteringFailure> + Send + Sync,
{
    fn cluster(
        &self,
        data: &Array2<f64>,
        ctx: &ClusterContext,
    ) -> Result<Partition, ClusteringFailure> {
        self(data, ctx)
    }
}

/// Fail when `n` items cannot be split into `k` clusters
pub(crate) fn ensure_enough_items(
    algorithm: &str,
    n: usize,
    k: usize,
) -> Result<(), ClusteringFailure> {
    if k == 0 || n < k {
        return Err(ClusteringFailure::new(
            algorithm,
            format!("cannot form {} clusters from {} items", k, n),
        ));
    }
    Ok(())
}

/// Squared euclidean distance between two slices
pub(crate) fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
pub(crate) mod test_utils;
