//! `som`: self-organizing map followed by hierarchical clustering of the
//! codebook.
//!
//! Stages run strictly in order:
//!
//! 1. train a hexagonal `xdim × ydim` map on the rows;
//! 2. cluster the codebook vectors with average linkage and cut at `k`;
//! 3. give every row the label of its best-matching unit.

/**
 * File: /src/cluster/som.rs
 * Created Date: Saturday, October 10th 2026
 * Author: Zihan
 * -----
 * Last Modified: Saturday, 17th October 2026 4:12:09 pm
 * Modified By: the developer formerly known as Zihan at <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 17-10-2026		Zihan	bubble radius from unit distance quantile
**/
use log::debug;
use ndarray::{Array2, ArrayView1, Axis};
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::seq::SliceRandom;
use ndarray_rand::rand::{Rng, SeedableRng};
use statrs::statistics::{Data, OrderStatistics};

use super::hierarchical::{cut_condensed, Linkage};
use super::{squared_euclidean, ClusterContext, MatrixClusterer, Partition};
use crate::config::SomParams;
use crate::error::ClusteringFailure;
use crate::util::one_based;

#[derive(Debug, Clone)]
pub struct SomPipeline {
    pub params: SomParams,
}

impl From<&SomParams> for SomPipeline {
    fn from(params: &SomParams) -> Self {
        Self {
            params: params.clone(),
        }
    }
}

/// Trained map: one codebook vector per grid unit
#[derive(Debug, Clone)]
pub struct SelfOrganizingMap {
    pub codebook: Array2<f64>,
}

/// Hexagonal grid coordinates, odd rows shifted by half a unit
pub fn hex_grid(xdim: usize, ydim: usize) -> Array2<f64> {
    let mut grid = Array2::zeros((xdim * ydim, 2));
    for y in 0..ydim {
        for x in 0..xdim {
            let u = y * xdim + x;
            grid[[u, 0]] = x as f64 + if y % 2 == 1 { 0.5 } else { 0.0 };
            grid[[u, 1]] = y as f64 * 3f64.sqrt() / 2.0;
        }
    }
    grid
}

fn unit_distances(grid: &Array2<f64>) -> Array2<f64> {
    let pts: Vec<Vec<f64>> = grid.axis_iter(Axis(0)).map(|r| r.to_vec()).collect();
    let n = pts.len();
    Array2::from_shape_fn((n, n), |(i, j)| squared_euclidean(&pts[i], &pts[j]).sqrt())
}

fn best_matching_unit(codebook: &Array2<f64>, row: ArrayView1<f64>) -> usize {
    let mut best = (0, f64::INFINITY);
    for (u, code) in codebook.axis_iter(Axis(0)).enumerate() {
        let d: f64 = code.iter().zip(row.iter()).map(|(a, b)| (a - b) * (a - b)).sum();
        if d < best.1 {
            best = (u, d);
        }
    }
    best.0
}

impl SomPipeline {
    /// Stage 1: online training with a shrinking bubble neighbourhood
    pub fn train(&self, data: &Array2<f64>, seed: u64) -> Result<SelfOrganizingMap, ClusteringFailure> {
        let n = data.nrows();
        if n == 0 {
            return Err(ClusteringFailure::new("som", "empty input"));
        }
        let p = &self.params;
        let grid = hex_grid(p.xdim, p.ydim);
        let units = grid.nrows();
        let dist = unit_distances(&grid);

        let mut off_diagonal = Vec::with_capacity(units * units.saturating_sub(1) / 2);
        for i in 0..units {
            for j in (i + 1)..units {
                off_diagonal.push(dist[[i, j]]);
            }
        }
        let start_radius = if off_diagonal.is_empty() {
            0.0
        } else {
            Data::new(off_diagonal).quantile(2.0 / 3.0)
        };

        let mut rng = StdRng::seed_from_u64(seed);
        let mut codebook = Array2::zeros((units, data.ncols()));
        for mut code in codebook.axis_iter_mut(Axis(0)) {
            code.assign(&data.row(rng.gen_range(0..n)));
        }

        let total_steps = (p.rlen * n).max(1) as f64;
        let mut order: Vec<usize> = (0..n).collect();
        let mut step = 0usize;
        for _ in 0..p.rlen {
            order.shuffle(&mut rng);
            for &i in &order {
                let progress = step as f64 / total_steps;
                let alpha = p.alpha.0 + (p.alpha.1 - p.alpha.0) * progress;
                let radius = start_radius * (1.0 - progress);
                let row = data.row(i);
                let bmu = best_matching_unit(&codebook, row);

                for (u, mut code) in codebook.axis_iter_mut(Axis(0)).enumerate() {
                    if u == bmu || dist[[bmu, u]] <= radius {
                        code.zip_mut_with(&row, |c, &x| *c += alpha * (x - *c));
                    }
                }
                step += 1;
            }
        }

        if codebook.iter().any(|v| !v.is_finite()) {
            return Err(ClusteringFailure::new("som", "non-finite codebook"));
        }
        Ok(SelfOrganizingMap { codebook })
    }

    /// Stage 2: average-linkage clustering of the codebook cut at `k`.
    /// Returns one 0-based label per unit.
    pub fn cluster_codebook(
        &self,
        map: &SelfOrganizingMap,
        k: usize,
    ) -> Result<Vec<usize>, ClusteringFailure> {
        let units = map.codebook.nrows();
        if units < k {
            return Err(ClusteringFailure::new(
                "som",
                format!("grid of {} units cannot hold {} clusters", units, k),
            ));
        }
        let codes: Vec<Vec<f64>> = map.codebook.axis_iter(Axis(0)).map(|r| r.to_vec()).collect();
        let mut condensed = Vec::with_capacity(units * units.saturating_sub(1) / 2);
        for i in 0..units {
            for j in (i + 1)..units {
                condensed.push(squared_euclidean(&codes[i], &codes[j]).sqrt());
            }
        }
        cut_condensed(condensed, units, k, Linkage::Average)
            .map_err(|reason| ClusteringFailure::new("som", reason))
    }

    /// Stage 3: every row inherits the label of its best-matching unit
    pub fn assign(&self, map: &SelfOrganizingMap, unit_labels: &[usize], data: &Array2<f64>) -> Partition {
        one_based(
            data.axis_iter(Axis(0))
                .map(|row| unit_labels[best_matching_unit(&map.codebook, row)]),
        )
    }
}

impl MatrixClusterer for SomPipeline {
    fn cluster(
        &self,
        data: &Array2<f64>,
        ctx: &ClusterContext,
    ) -> Result<Partition, ClusteringFailure> {
        let units = self.params.xdim * self.params.ydim;
        if units < ctx.k {
            return Err(ClusteringFailure::new(
                "som",
                format!("grid of {} units cannot hold {} clusters", units, ctx.k),
            ));
        }
        let map = self.train(data, ctx.seed)?;
        let unit_labels = self.cluster_codebook(&map, ctx.k)?;
        debug!("som: {} units clustered into {} groups", units, ctx.k);
        Ok(self.assign(&map, &unit_labels, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::test_utils::{check_block_labels, labels_within, two_blobs};

    fn small_map() -> SomPipeline {
        SomPipeline::from(&SomParams {
            xdim: 3,
            ydim: 3,
            rlen: 50,
            alpha: (0.05, 0.01),
        })
    }

    #[test]
    fn test_hex_grid_shift() {
        let grid = hex_grid(2, 2);
        assert_eq!(grid.nrows(), 4);
        assert_eq!(grid[[2, 0]], 0.5);
        assert!((grid[[2, 1]] - 3f64.sqrt() / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_som_two_blobs() {
        let labels = small_map()
            .cluster(&two_blobs(), &ClusterContext::new(2, 4))
            .unwrap();
        assert!(labels_within(&labels, 2));
        assert!(check_block_labels(&labels, 10));
    }

    #[test]
    fn test_grid_smaller_than_k_fails() {
        let som = SomPipeline::from(&SomParams {
            xdim: 1,
            ydim: 2,
            rlen: 5,
            alpha: (0.05, 0.01),
        });
        assert!(som.cluster(&two_blobs(), &ClusterContext::new(3, 0)).is_err());
    }

    #[test]
    fn test_empty_input_fails() {
        let x = Array2::<f64>::zeros((0, 2));
        assert!(small_map().cluster(&x, &ClusterContext::new(2, 0)).is_err());
    }
}
