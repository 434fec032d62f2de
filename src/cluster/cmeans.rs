//! `cmeans`: fuzzy c-means, hardened by maximum membership.

use ndarray::{Array2, Axis};
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

use super::{ensure_enough_items, squared_euclidean, ClusterContext, MatrixClusterer, Partition};
use crate::error::ClusteringFailure;
use crate::util::{argmax_axis1, one_based};

#[derive(Debug, Clone)]
pub struct FuzzyCMeans {
    /// Fuzzifier, > 1
    pub m: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for FuzzyCMeans {
    fn default() -> Self {
        Self {
            m: 2.0,
            max_iter: 100,
            tol: 1e-6,
        }
    }
}

impl FuzzyCMeans {
    /// Membership matrix (n × k), rows sum to one
    pub fn memberships(&self, data: &Array2<f64>, k: usize, seed: u64) -> Array2<f64> {
        let n = data.nrows();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut u = Array2::random_using((n, k), Uniform::new(0.01, 1.0), &mut rng);
        normalize_rows(&mut u);

        for _ in 0..self.max_iter {
            let centers = self.centers(data, &u);
            let next = self.update_memberships(data, &centers);
            let change = (&next - &u).mapv(f64::abs).fold(0.0_f64, |m, &v| m.max(v));
            u = next;
            if change < self.tol {
                break;
            }
        }
        u
    }

    fn centers(&self, data: &Array2<f64>, u: &Array2<f64>) -> Array2<f64> {
        let w = u.mapv(|v| v.powf(self.m)); // n × k
        let mut centers = w.t().dot(data); // k × p
        for (mut center, total) in centers.axis_iter_mut(Axis(0)).zip(w.sum_axis(Axis(0))) {
            if total > 0.0 {
                center.mapv_inplace(|v| v / total);
            }
        }
        centers
    }

    fn update_memberships(&self, data: &Array2<f64>, centers: &Array2<f64>) -> Array2<f64> {
        let n = data.nrows();
        let k = centers.nrows();
        let exponent = 1.0 / (self.m - 1.0);
        let mut u = Array2::zeros((n, k));
        let centers: Vec<Vec<f64>> = centers.axis_iter(Axis(0)).map(|c| c.to_vec()).collect();

        for (i, row) in data.axis_iter(Axis(0)).enumerate() {
            let row = row.to_vec();
            let dist: Vec<f64> = centers.iter().map(|c| squared_euclidean(&row, c)).collect();
            if let Some(hit) = dist.iter().position(|&d| d == 0.0) {
                // point sits on a center
                u[[i, hit]] = 1.0;
                continue;
            }
            for c in 0..k {
                let inv: f64 = dist.iter().map(|&d| (dist[c] / d).powf(exponent)).sum();
                u[[i, c]] = 1.0 / inv;
            }
        }
        u
    }
}

fn normalize_rows(u: &mut Array2<f64>) {
    for mut row in u.axis_iter_mut(Axis(0)) {
        let s = row.sum();
        if s > 0.0 {
            row.mapv_inplace(|v| v / s);
        }
    }
}

impl MatrixClusterer for FuzzyCMeans {
    fn cluster(
        &self,
        data: &Array2<f64>,
        ctx: &ClusterContext,
    ) -> Result<Partition, ClusteringFailure> {
        ensure_enough_items("cmeans", data.nrows(), ctx.k)?;
        let u = self.memberships(data, ctx.k, ctx.seed);
        if u.iter().any(|v| !v.is_finite()) {
            return Err(ClusteringFailure::new("cmeans", "memberships diverged"));
        }
        Ok(one_based(argmax_axis1(&u)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::test_utils::{check_block_labels, two_blobs};

    #[test]
    fn test_cmeans_two_blobs() {
        let labels = FuzzyCMeans::default()
            .cluster(&two_blobs(), &ClusterContext::new(2, 5))
            .unwrap();
        assert!(check_block_labels(&labels, 10));
    }

    #[test]
    fn test_memberships_sum_to_one() {
        let u = FuzzyCMeans::default().memberships(&two_blobs(), 3, 1);
        for row in u.axis_iter(Axis(0)) {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }
}
