//! `sc`: spectral clustering with a radial-basis kernel.

use nalgebra::SymmetricEigen;
use ndarray::{Array2, Axis};

use super::partitioning::kmeans_labels;
use super::{ensure_enough_items, squared_euclidean, ClusterContext, MatrixClusterer, Partition};
use crate::error::ClusteringFailure;
use crate::util::{clone_to_dmatrix, one_based};

/// Kernel width is `1 / median(squared pairwise distance)` unless fixed.
#[derive(Debug, Clone, Default)]
pub struct SpectralClusterer {
    pub gamma: Option<f64>,
}

impl SpectralClusterer {
    /// RBF affinity with zero diagonal
    fn affinity(&self, data: &Array2<f64>) -> Array2<f64> {
        let n = data.nrows();
        let rows: Vec<Vec<f64>> = data.axis_iter(Axis(0)).map(|r| r.to_vec()).collect();
        let sq = Array2::from_shape_fn((n, n), |(i, j)| squared_euclidean(&rows[i], &rows[j]));

        let gamma = self.gamma.unwrap_or_else(|| {
            let mut off: Vec<f64> = Vec::with_capacity(n * n.saturating_sub(1) / 2);
            for i in 0..n {
                for j in (i + 1)..n {
                    off.push(sq[[i, j]]);
                }
            }
            off.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            match off.get(off.len() / 2) {
                Some(&m) if m > 0.0 => 1.0 / m,
                _ => 1.0,
            }
        });

        let mut a = sq.mapv(|d| (-gamma * d).exp());
        for i in 0..n {
            a[[i, i]] = 0.0;
        }
        a
    }

    /// Rows of the top-k eigenvectors of D^-1/2 A D^-1/2, each row scaled to
    /// unit length
    fn embedding(&self, data: &Array2<f64>, k: usize) -> Result<Array2<f64>, ClusteringFailure> {
        let a = self.affinity(data);
        let n = a.nrows();
        let inv_sqrt_deg: Vec<f64> = a
            .axis_iter(Axis(0))
            .map(|row| {
                let d = row.sum();
                if d > 0.0 {
                    d.powf(-0.5)
                } else {
                    0.0
                }
            })
            .collect();
        let normalized =
            Array2::from_shape_fn((n, n), |(i, j)| inv_sqrt_deg[i] * a[[i, j]] * inv_sqrt_deg[j]);

        if normalized.iter().any(|v| !v.is_finite()) {
            return Err(ClusteringFailure::new("sc", "non-finite affinity"));
        }
        let eigen = SymmetricEigen::new(clone_to_dmatrix(normalized.view()));

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&i, &j| {
            eigen.eigenvalues[j]
                .partial_cmp(&eigen.eigenvalues[i])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut features = Array2::zeros((n, k));
        for (c, &idx) in order.iter().take(k).enumerate() {
            for r in 0..n {
                features[[r, c]] = eigen.eigenvectors[(r, idx)];
            }
        }
        for mut row in features.axis_iter_mut(Axis(0)) {
            let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 1e-30 {
                row.mapv_inplace(|v| v / norm);
            }
        }
        Ok(features)
    }
}

impl MatrixClusterer for SpectralClusterer {
    fn cluster(
        &self,
        data: &Array2<f64>,
        ctx: &ClusterContext,
    ) -> Result<Partition, ClusteringFailure> {
        ensure_enough_items("sc", data.nrows(), ctx.k)?;
        let features = self.embedding(data, ctx.k)?;
        let labels = kmeans_labels("sc", features, ctx.k, ctx.seed)?;
        Ok(one_based(labels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::test_utils::{check_block_labels, labels_within, make_blobs, two_blobs};

    #[test]
    fn test_spectral_two_blobs() {
        let labels = SpectralClusterer::default()
            .cluster(&two_blobs(), &ClusterContext::new(2, 3))
            .unwrap();
        assert!(check_block_labels(&labels, 10));
    }

    #[test]
    fn test_spectral_three_blobs_in_range() {
        let x = make_blobs(&[[0.0, 0.0], [6.0, 0.0], [0.0, 6.0]], 12, 4);
        let labels = SpectralClusterer::default()
            .cluster(&x, &ClusterContext::new(3, 3))
            .unwrap();
        assert!(labels_within(&labels, 3));
        assert!(check_block_labels(&labels, 12));
    }

    #[test]
    fn test_affinity_is_symmetric() {
        let x = two_blobs();
        let a = SpectralClusterer::default().affinity(&x);
        assert_eq!(a[[0, 0]], 0.0);
        assert!((a[[3, 15]] - a[[15, 3]]).abs() < 1e-15);
    }
}
