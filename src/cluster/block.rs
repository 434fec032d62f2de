//! `block`: Gaussian latent block model.
//!
//! Rows and columns are both partitioned into `k` groups; every (row group,
//! column group) block has its own mean and variance. The model is fitted by
//! classification EM, alternating hard row and column assignments until they
//! stop moving. Only the row partition is reported.

use log::debug;
use ndarray::{Array2, Axis};
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::seq::SliceRandom;
use ndarray_rand::rand::{Rng, SeedableRng};

use super::{ensure_enough_items, ClusterContext, MatrixClusterer, Partition};
use crate::error::ClusteringFailure;
use crate::util::one_based;

const VARIANCE_FLOOR: f64 = 1e-8;

#[derive(Debug, Clone)]
pub struct LatentBlockModel {
    pub max_iter: usize,
    /// Random restarts, the best complete-data likelihood is kept
    pub n_init: usize,
}

impl Default for LatentBlockModel {
    fn default() -> Self {
        Self {
            max_iter: 100,
            n_init: 10,
        }
    }
}

/// Block means and variances plus group proportions
struct BlockParams {
    mean: Array2<f64>,
    var: Array2<f64>,
    row_prop: Vec<f64>,
    col_prop: Vec<f64>,
}

/// Random assignment of `n` items to `k` groups, none of them empty
fn random_groups(n: usize, k: usize, rng: &mut StdRng) -> Vec<usize> {
    let mut groups: Vec<usize> = (0..n).map(|_| rng.gen_range(0..k)).collect();
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    for (g, &i) in order.iter().take(k).enumerate() {
        groups[i] = g;
    }
    groups
}

fn group_sizes(groups: &[usize], k: usize) -> Vec<usize> {
    let mut sizes = vec![0; k];
    for &g in groups {
        sizes[g] += 1;
    }
    sizes
}

fn estimate(
    x: &Array2<f64>,
    rows: &[usize],
    cols: &[usize],
    k: usize,
) -> Result<BlockParams, String> {
    let row_sizes = group_sizes(rows, k);
    let col_sizes = group_sizes(cols, k);
    if row_sizes.contains(&0) || col_sizes.contains(&0) {
        return Err("empty block".to_string());
    }

    let mut sum = Array2::<f64>::zeros((k, k));
    let mut sumsq = Array2::<f64>::zeros((k, k));
    for ((i, j), &v) in x.indexed_iter() {
        sum[[rows[i], cols[j]]] += v;
        sumsq[[rows[i], cols[j]]] += v * v;
    }

    let mut mean = Array2::zeros((k, k));
    let mut var = Array2::zeros((k, k));
    for r in 0..k {
        for c in 0..k {
            let count = (row_sizes[r] * col_sizes[c]) as f64;
            let m = sum[[r, c]] / count;
            mean[[r, c]] = m;
            var[[r, c]] = (sumsq[[r, c]] / count - m * m).max(VARIANCE_FLOOR);
        }
    }

    let n = rows.len() as f64;
    let p = cols.len() as f64;
    Ok(BlockParams {
        mean,
        var,
        row_prop: row_sizes.iter().map(|&s| s as f64 / n).collect(),
        col_prop: col_sizes.iter().map(|&s| s as f64 / p).collect(),
    })
}

/// Gaussian log-density of a set of values summarized by count, sum and sum
/// of squares
fn log_density(count: f64, sum: f64, sumsq: f64, mean: f64, var: f64) -> f64 {
    -0.5 * (count * (2.0 * std::f64::consts::PI * var).ln()
        + (sumsq - 2.0 * mean * sum + count * mean * mean) / var)
}

/// Hard reassignment of the rows of `x` given the column groups. Call with
/// `x.t()` and transposed parameters to reassign columns.
fn assign(
    x: ndarray::ArrayView2<f64>,
    other: &[usize],
    mean: &Array2<f64>,
    var: &Array2<f64>,
    prop: &[f64],
    k: usize,
) -> (Vec<usize>, f64) {
    let mut groups = Vec::with_capacity(x.nrows());
    let mut total = 0.0;
    for row in x.axis_iter(Axis(0)) {
        let mut count = vec![0.0; k];
        let mut sum = vec![0.0; k];
        let mut sumsq = vec![0.0; k];
        for (j, &v) in row.iter().enumerate() {
            count[other[j]] += 1.0;
            sum[other[j]] += v;
            sumsq[other[j]] += v * v;
        }

        let (best, score) = (0..k)
            .map(|g| {
                let ll: f64 = (0..k)
                    .map(|c| log_density(count[c], sum[c], sumsq[c], mean[[g, c]], var[[g, c]]))
                    .sum();
                (g, prop[g].ln() + ll)
            })
            .fold((0, f64::NEG_INFINITY), |acc, cur| if cur.1 > acc.1 { cur } else { acc });
        groups.push(best);
        total += score;
    }
    (groups, total)
}

impl LatentBlockModel {
    /// One classification EM run. Returns row groups and final score.
    fn fit_once(
        &self,
        x: &Array2<f64>,
        k: usize,
        rng: &mut StdRng,
    ) -> Result<(Vec<usize>, f64), String> {
        let mut rows = random_groups(x.nrows(), k, rng);
        let mut cols = random_groups(x.ncols(), k, rng);
        let mut score = f64::NEG_INFINITY;

        for _ in 0..self.max_iter {
            let params = estimate(x, &rows, &cols, k)?;
            let (new_rows, _) =
                assign(x.view(), &cols, &params.mean, &params.var, &params.row_prop, k);

            let params = estimate(x, &new_rows, &cols, k)?;
            let (new_cols, col_score) = assign(
                x.t(),
                &new_rows,
                &params.mean.t().to_owned(),
                &params.var.t().to_owned(),
                &params.col_prop,
                k,
            );

            let converged = new_rows == rows && new_cols == cols;
            rows = new_rows;
            cols = new_cols;
            score = col_score;
            if converged {
                break;
            }
        }
        // final parameters must still be estimable
        estimate(x, &rows, &cols, k)?;
        if !score.is_finite() {
            return Err("non-finite likelihood".to_string());
        }
        Ok((rows, score))
    }
}

impl MatrixClusterer for LatentBlockModel {
    fn cluster(
        &self,
        data: &Array2<f64>,
        ctx: &ClusterContext,
    ) -> Result<Partition, ClusteringFailure> {
        ensure_enough_items("block", data.nrows(), ctx.k)?;
        if data.ncols() < ctx.k {
            return Err(ClusteringFailure::new(
                "block",
                format!("{} variables cannot form {} column groups", data.ncols(), ctx.k),
            ));
        }

        let mut rng = StdRng::seed_from_u64(ctx.seed);
        let mut best: Option<(Vec<usize>, f64)> = None;
        let mut last_error = String::from("no successful run");
        for run in 0..self.n_init.max(1) {
            match self.fit_once(data, ctx.k, &mut rng) {
                Ok((rows, score)) => {
                    if best.as_ref().map_or(true, |(_, s)| score > *s) {
                        best = Some((rows, score));
                    }
                }
                Err(e) => {
                    debug!("block: run {} failed: {}", run, e);
                    last_error = e;
                }
            }
        }

        match best {
            Some((rows, _)) => Ok(one_based(rows)),
            None => Err(ClusteringFailure::new("block", last_error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::test_utils::check_block_labels;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;

    /// Two row groups of 10 and two column groups of 4 with distinct means
    fn block_matrix() -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(3);
        let mut x = Array2::random_using((20, 8), Uniform::new(-0.3, 0.3), &mut rng);
        for i in 0..20 {
            for j in 0..8 {
                let high = (i < 10) == (j < 4);
                if high {
                    x[[i, j]] += 5.0;
                }
            }
        }
        x
    }

    #[test]
    fn test_block_recovers_row_groups() {
        let labels = LatentBlockModel::default()
            .cluster(&block_matrix(), &ClusterContext::new(2, 11))
            .unwrap();
        assert!(check_block_labels(&labels, 10));
    }

    #[test]
    fn test_block_needs_enough_columns() {
        let x = Array2::zeros((10, 1));
        let result = LatentBlockModel::default().cluster(&x, &ClusterContext::new(2, 0));
        assert!(result.is_err());
    }

    #[test]
    fn test_random_groups_are_complete() {
        let mut rng = StdRng::seed_from_u64(0);
        let groups = random_groups(7, 3, &mut rng);
        assert!(group_sizes(&groups, 3).iter().all(|&s| s > 0));
    }
}
