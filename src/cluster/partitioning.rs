//! Partitioning clusterers on a dissimilarity: `km` and `pam`.

use linfa::prelude::{Fit, Predict};
use linfa::DatasetBase;
use linfa_clustering::KMeans;
use ndarray::Array2;
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::SeedableRng;

use super::{ensure_enough_items, ClusterContext, DissimilarityClusterer, Partition};
use crate::distance::Dissimilarity;
use crate::error::ClusteringFailure;
use crate::util::one_based;

/// Seeded k-means (linfa) on the rows of `records`. Zero-based labels.
pub fn kmeans_labels(
    algorithm: &str,
    records: Array2<f64>,
    k: usize,
    seed: u64,
) -> Result<Vec<usize>, ClusteringFailure> {
    ensure_enough_items(algorithm, records.nrows(), k)?;
    let rng = StdRng::seed_from_u64(seed);
    let dataset = DatasetBase::from(records);
    let model = KMeans::params_with_rng(k, rng)
        .n_runs(10)
        .max_n_iterations(300)
        .tolerance(1e-4)
        .fit(&dataset)
        .map_err(|e| ClusteringFailure::from_error(algorithm, e))?;

    Ok(model.predict(dataset.records()).to_vec())
}

/// `km`: k-means applied to the dissimilarity matrix, each row of the matrix
/// being used as the feature vector of its item
#[derive(Debug, Clone, Default)]
pub struct KMeansClusterer;

impl DissimilarityClusterer for KMeansClusterer {
    fn cluster(
        &self,
        diss: &Dissimilarity,
        ctx: &ClusterContext,
    ) -> Result<Partition, ClusteringFailure> {
        let labels = kmeans_labels("km", diss.matrix().clone(), ctx.k, ctx.seed)?;
        Ok(one_based(labels))
    }
}

/// `pam`: partitioning around medoids (BUILD + SWAP). Deterministic for a
/// given dissimilarity; ties go to the lowest index.
#[derive(Debug, Clone)]
pub struct PamClusterer {
    max_swaps: usize,
}

impl Default for PamClusterer {
    fn default() -> Self {
        Self { max_swaps: 100 }
    }
}

impl DissimilarityClusterer for PamClusterer {
    fn cluster(
        &self,
        diss: &Dissimilarity,
        ctx: &ClusterContext,
    ) -> Result<Partition, ClusteringFailure> {
        ensure_enough_items("pam", diss.len(), ctx.k)?;
        let mut medoids = build(diss, ctx.k);
        for _ in 0..self.max_swaps {
            if !swap_once(diss, &mut medoids) {
                break;
            }
        }
        let (nearest, _, _) = nearest_medoids(diss, &medoids);
        Ok(one_based(nearest))
    }
}

/// Greedy BUILD phase
fn build(diss: &Dissimilarity, k: usize) -> Vec<usize> {
    let n = diss.len();
    let first = (0..n)
        .map(|i| (i, (0..n).map(|j| diss.get(i, j)).sum::<f64>()))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
        .0;
    let mut medoids = vec![first];
    let mut closest: Vec<f64> = (0..n).map(|j| diss.get(j, first)).collect();

    while medoids.len() < k {
        let mut best = (usize::MAX, f64::NEG_INFINITY);
        for c in (0..n).filter(|c| !medoids.contains(c)) {
            let gain: f64 = (0..n)
                .map(|j| (closest[j] - diss.get(j, c)).max(0.0))
                .sum();
            if gain > best.1 {
                best = (c, gain);
            }
        }
        medoids.push(best.0);
        for (j, d) in closest.iter_mut().enumerate() {
            *d = d.min(diss.get(j, best.0));
        }
    }
    medoids
}

/// For every item: position of its nearest medoid, distance to it, and
/// distance to the second nearest
fn nearest_medoids(diss: &Dissimilarity, medoids: &[usize]) -> (Vec<usize>, Vec<f64>, Vec<f64>) {
    let n = diss.len();
    let mut nearest = vec![0; n];
    let mut first = vec![f64::INFINITY; n];
    let mut second = vec![f64::INFINITY; n];
    for j in 0..n {
        for (pos, &m) in medoids.iter().enumerate() {
            let d = diss.get(j, m);
            if d < first[j] {
                second[j] = first[j];
                first[j] = d;
                nearest[j] = pos;
            } else if d < second[j] {
                second[j] = d;
            }
        }
    }
    (nearest, first, second)
}

/// Apply the best cost-reducing swap. Returns false at a local optimum.
fn swap_once(diss: &Dissimilarity, medoids: &mut [usize]) -> bool {
    let n = diss.len();
    let (nearest, first, second) = nearest_medoids(diss, medoids);

    let mut best = (0, 0, -1e-12);
    for pos in 0..medoids.len() {
        for h in (0..n).filter(|h| !medoids.contains(h)) {
            let delta: f64 = (0..n)
                .map(|j| {
                    let to_h = diss.get(j, h);
                    let new = if nearest[j] == pos {
                        second[j].min(to_h)
                    } else {
                        first[j].min(to_h)
                    };
                    new - first[j]
                })
                .sum();
            if delta < best.2 {
                best = (pos, h, delta);
            }
        }
    }

    if best.2 < -1e-12 {
        medoids[best.0] = best.1;
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::test_utils::{check_block_labels, labels_within, make_blobs, two_blobs};
    use crate::distance::Metric;

    fn euclidean(x: &Array2<f64>) -> Dissimilarity {
        Dissimilarity::from_rows(x, |a, b| Metric::Euclidean.distance(a, b, 2.0))
    }

    #[test]
    fn test_pam_two_blobs() {
        let d = euclidean(&two_blobs());
        let labels = PamClusterer::default()
            .cluster(&d, &ClusterContext::new(2, 0))
            .unwrap();
        assert!(check_block_labels(&labels, 10));
        assert!(labels_within(&labels, 2));
    }

    #[test]
    fn test_pam_is_deterministic() {
        let x = make_blobs(&[[0.0, 0.0], [4.0, 0.0], [2.0, 3.0]], 15, 11);
        let d = euclidean(&x);
        let a = PamClusterer::default().cluster(&d, &ClusterContext::new(3, 1)).unwrap();
        let b = PamClusterer::default().cluster(&d, &ClusterContext::new(3, 99)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_pam_medoids_on_line() {
        // 0, 1, 2 | 10, 11, 12 -> medoids 1 and 11
        let x = ndarray::array![[0.0], [1.0], [2.0], [10.0], [11.0], [12.0]];
        let d = euclidean(&x);
        let mut medoids = build(&d, 2);
        while swap_once(&d, &mut medoids) {}
        medoids.sort();
        assert_eq!(medoids, vec![1, 4]);
    }

    #[test]
    fn test_km_on_dissimilarity() {
        let d = euclidean(&two_blobs());
        let labels = KMeansClusterer.cluster(&d, &ClusterContext::new(2, 42)).unwrap();
        assert!(check_block_labels(&labels, 10));
    }

    #[test]
    fn test_km_too_few_items() {
        let d = Dissimilarity::from_condensed(2, &[1.0]).unwrap();
        assert!(KMeansClusterer.cluster(&d, &ClusterContext::new(3, 0)).is_err());
    }
}
