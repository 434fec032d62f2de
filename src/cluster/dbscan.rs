//! `dbscan`: density-based clustering.
//!
//! The number of clusters is emergent: the requested `k` is accepted like for
//! every other clusterer but does not influence the result, and the labels are
//! never coerced to `k` groups. Noise points are returned as missing.

use linfa::traits::Transformer;
use linfa_clustering::Dbscan;
use log::debug;
use ndarray::Array2;

use super::{ClusterContext, MatrixClusterer, Partition};
use crate::config::DbscanParams;
use crate::error::ClusteringFailure;
use crate::util::relabel_dense;

#[derive(Debug, Clone)]
pub struct DbscanClusterer {
    pub eps: f64,
    pub min_points: usize,
}

impl From<&DbscanParams> for DbscanClusterer {
    fn from(params: &DbscanParams) -> Self {
        Self {
            eps: params.eps,
            min_points: params.min_points,
        }
    }
}

impl MatrixClusterer for DbscanClusterer {
    fn cluster(
        &self,
        data: &Array2<f64>,
        ctx: &ClusterContext,
    ) -> Result<Partition, ClusteringFailure> {
        if data.nrows() == 0 {
            return Err(ClusteringFailure::new("dbscan", "empty input"));
        }
        let memberships = Dbscan::params(self.min_points)
            .tolerance(self.eps)
            .transform(data)
            .map_err(|e| ClusteringFailure::from_error("dbscan", e))?;

        let labels: Vec<Option<usize>> = memberships.iter().copied().collect();
        let partition = relabel_dense(&labels);
        debug!(
            "dbscan: {} clusters found (requested k={} is not used), {} noise points",
            crate::util::n_distinct_labels(&partition),
            ctx.k,
            partition.iter().filter(|l| l.is_none()).count()
        );
        Ok(partition)
    }
}
