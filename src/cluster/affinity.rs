//! `ap`: affinity propagation targeted at `k` exemplars.
//!
//! Similarities are negative squared euclidean distances. The preference
//! (diagonal of the similarity matrix) controls how many exemplars emerge, so
//! the clusterer bisects it between the bounds of "one cluster" and "every
//! point its own exemplar" until exactly `k` exemplars are found or the
//! bisection budget runs out. The result may therefore hold a number of
//! clusters different from `k`; labels are always dense `1..=m`.

use log::debug;
use ndarray::{Array2, Axis};
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::{Rng, SeedableRng};

use super::{ensure_enough_items, squared_euclidean, ClusterContext, MatrixClusterer, Partition};
use crate::error::ClusteringFailure;
use crate::util::relabel_dense;

#[derive(Debug, Clone)]
pub struct AffinityPropagation {
    pub damping: f64,
    pub max_iter: usize,
    /// Iterations without change of the exemplar set before stopping
    pub conv_iter: usize,
    /// Bisection steps on the preference
    pub bisection_steps: usize,
}

impl Default for AffinityPropagation {
    fn default() -> Self {
        Self {
            damping: 0.9,
            max_iter: 1000,
            conv_iter: 100,
            bisection_steps: 10,
        }
    }
}

impl AffinityPropagation {
    /// Run message passing for one preference value. Returns the exemplar of
    /// every item (empty when no exemplar emerged).
    fn run(&self, similarity: &Array2<f64>, preference: f64) -> Vec<usize> {
        let n = similarity.nrows();
        let mut s = similarity.clone();
        for i in 0..n {
            s[[i, i]] = preference;
        }
        let mut r = Array2::<f64>::zeros((n, n));
        let mut a = Array2::<f64>::zeros((n, n));
        let mut exemplars: Vec<usize> = Vec::new();
        let mut unchanged = 0;

        for _ in 0..self.max_iter {
            // responsibilities
            for i in 0..n {
                let (mut first, mut second, mut arg) = (f64::NEG_INFINITY, f64::NEG_INFINITY, 0);
                for k in 0..n {
                    let v = a[[i, k]] + s[[i, k]];
                    if v > first {
                        second = first;
                        first = v;
                        arg = k;
                    } else if v > second {
                        second = v;
                    }
                }
                for k in 0..n {
                    let competitor = if k == arg { second } else { first };
                    let new = s[[i, k]] - competitor;
                    r[[i, k]] = self.damping * r[[i, k]] + (1.0 - self.damping) * new;
                }
            }

            // availabilities
            for k in 0..n {
                let positive_sum: f64 = (0..n)
                    .filter(|&i| i != k)
                    .map(|i| r[[i, k]].max(0.0))
                    .sum();
                for i in 0..n {
                    let new = if i == k {
                        positive_sum
                    } else {
                        (r[[k, k]] + positive_sum - r[[i, k]].max(0.0)).min(0.0)
                    };
                    a[[i, k]] = self.damping * a[[i, k]] + (1.0 - self.damping) * new;
                }
            }

            let current: Vec<usize> = (0..n).filter(|&k| a[[k, k]] + r[[k, k]] > 0.0).collect();
            if current == exemplars && !current.is_empty() {
                unchanged += 1;
                if unchanged >= self.conv_iter {
                    break;
                }
            } else {
                unchanged = 0;
                exemplars = current;
            }
        }

        if exemplars.is_empty() {
            return Vec::new();
        }
        (0..n)
            .map(|i| {
                if exemplars.contains(&i) {
                    i
                } else {
                    *exemplars
                        .iter()
                        .max_by(|&&x, &&y| {
                            s[[i, x]]
                                .partial_cmp(&s[[i, y]])
                                .unwrap_or(std::cmp::Ordering::Equal)
                        })
                        .unwrap_or(&exemplars[0])
                }
            })
            .collect()
    }
}

/// Lower and upper preference bounds: the upper bound makes every point an
/// exemplar, the lower bound yields a single cluster.
fn preference_range(s: &Array2<f64>) -> (f64, f64) {
    let n = s.nrows();
    let mut pmax = f64::NEG_INFINITY;
    for i in 0..n {
        for k in 0..n {
            if i != k {
                pmax = pmax.max(s[[i, k]]);
            }
        }
    }

    let off_diag_sum = |j: usize| (0..n).filter(|&i| i != j).map(|i| s[[i, j]]).sum::<f64>();
    let m1 = (0..n).map(off_diag_sum).fold(f64::NEG_INFINITY, f64::max);
    let mut m2 = f64::NEG_INFINITY;
    for j in 0..n {
        for k in (j + 1)..n {
            let v: f64 = (0..n)
                .filter(|&i| i != j && i != k)
                .map(|i| s[[i, j]].max(s[[i, k]]))
                .sum();
            m2 = m2.max(v);
        }
    }
    (m1 - m2, pmax)
}

fn n_exemplars(assignment: &[usize]) -> usize {
    let mut e = assignment.to_vec();
    e.sort_unstable();
    e.dedup();
    e.len()
}

impl MatrixClusterer for AffinityPropagation {
    fn cluster(
        &self,
        data: &Array2<f64>,
        ctx: &ClusterContext,
    ) -> Result<Partition, ClusteringFailure> {
        let n = data.nrows();
        ensure_enough_items("ap", n, ctx.k)?;

        let rows: Vec<Vec<f64>> = data.axis_iter(Axis(0)).map(|r| r.to_vec()).collect();
        let mut similarity = Array2::from_shape_fn((n, n), |(i, k)| {
            -squared_euclidean(&rows[i], &rows[k])
        });
        // tiny seeded jitter removes degenerate ties
        let mut rng = StdRng::seed_from_u64(ctx.seed);
        let scale = similarity.iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(1e-300);
        similarity.mapv_inplace(|v| v + scale * 1e-12 * rng.gen::<f64>());

        let (mut lo, mut hi) = preference_range(&similarity);
        let mut best: Option<(usize, Vec<usize>)> = None;
        for step in 0..self.bisection_steps {
            let preference = if step == 0 { lo } else { (lo + hi) / 2.0 };
            let assignment = self.run(&similarity, preference);
            let found = n_exemplars(&assignment);
            debug!("ap: preference {:.4} -> {} exemplars (k={})", preference, found, ctx.k);

            if !assignment.is_empty() {
                let closer = match &best {
                    Some((m, _)) => found.abs_diff(ctx.k) < m.abs_diff(ctx.k),
                    None => true,
                };
                if closer {
                    best = Some((found, assignment));
                }
            }
            if found == ctx.k {
                break;
            }
            if step > 0 {
                if found > ctx.k {
                    hi = preference;
                } else {
                    lo = preference;
                }
            }
        }

        match best {
            Some((_, assignment)) => {
                let labels: Vec<Option<usize>> = assignment.into_iter().map(Some).collect();
                Ok(relabel_dense(&labels))
            }
            None => Err(ClusteringFailure::new("ap", "no exemplars found")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::test_utils::{check_block_labels, make_blobs};
    use crate::util::n_distinct_labels;

    #[test]
    fn test_ap_finds_blobs() {
        let x = make_blobs(&[[0.0, 0.0], [8.0, 0.0], [0.0, 8.0]], 10, 5);
        let labels = AffinityPropagation::default()
            .cluster(&x, &ClusterContext::new(3, 1))
            .unwrap();
        assert_eq!(n_distinct_labels(&labels), 3);
        assert!(check_block_labels(&labels, 10));
    }

    #[test]
    fn test_ap_labels_are_dense() {
        let x = make_blobs(&[[0.0, 0.0], [8.0, 0.0]], 10, 9);
        let labels = AffinityPropagation::default()
            .cluster(&x, &ClusterContext::new(2, 1))
            .unwrap();
        let m = n_distinct_labels(&labels);
        assert!(labels.iter().all(|l| matches!(l, Some(v) if *v >= 1 && *v <= m)));
    }

    #[test]
    fn test_preference_bounds_are_ordered() {
        let x = make_blobs(&[[0.0, 0.0], [8.0, 0.0]], 5, 2);
        let rows: Vec<Vec<f64>> = x.axis_iter(Axis(0)).map(|r| r.to_vec()).collect();
        let n = rows.len();
        let s = Array2::from_shape_fn((n, n), |(i, k)| -squared_euclidean(&rows[i], &rows[k]));
        let (lo, hi) = preference_range(&s);
        assert!(lo < hi);
    }
}
