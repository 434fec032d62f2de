//! Agglomerative hierarchical clustering on a dissimilarity, cut at `k`.
//!
//! The linkage itself is delegated to `kodama`, whose dendrogram uses
//! SciPy-style ids: leaves are `0..n`, merge `i` creates cluster `n + i`.

use kodama::{linkage, Method};

use super::{ensure_enough_items, ClusterContext, DissimilarityClusterer, Partition};
use crate::distance::Dissimilarity;
use crate::error::ClusteringFailure;
use crate::util::one_based;

/// Linkage method for hierarchical clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    Single,
    Complete,
    Average,
    Ward,
}

impl Linkage {
    fn method(&self) -> Method {
        match self {
            Linkage::Single => Method::Single,
            Linkage::Complete => Method::Complete,
            Linkage::Average => Method::Average,
            Linkage::Ward => Method::Ward,
        }
    }
}

/// `hc`: agglomerative clustering, average linkage by default
#[derive(Debug, Clone)]
pub struct HierarchicalClusterer {
    linkage: Linkage,
}

impl Default for HierarchicalClusterer {
    fn default() -> Self {
        Self {
            linkage: Linkage::Average,
        }
    }
}

impl HierarchicalClusterer {
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }
}

impl DissimilarityClusterer for HierarchicalClusterer {
    fn cluster(
        &self,
        diss: &Dissimilarity,
        ctx: &ClusterContext,
    ) -> Result<Partition, ClusteringFailure> {
        let labels = cut_condensed(diss.condensed(), diss.len(), ctx.k, self.linkage)
            .map_err(|reason| ClusteringFailure::new("hc", reason))?;
        Ok(one_based(labels))
    }
}

/// Cluster `n` items from their condensed dissimilarity and cut the tree into
/// `k` groups. Labels are `0..k` in order of first appearance.
pub fn cut_condensed(
    mut condensed: Vec<f64>,
    n: usize,
    k: usize,
    linkage_method: Linkage,
) -> Result<Vec<usize>, String> {
    ensure_enough_items("hc", n, k).map_err(|e| e.reason)?;
    if condensed.iter().any(|v| !v.is_finite()) {
        return Err("dissimilarity contains non-finite values".to_string());
    }
    if n == 1 {
        return Ok(vec![0]);
    }

    let dendrogram = linkage(&mut condensed, n, linkage_method.method());

    // Union-find over the 2n-1 dendrogram ids, applying the first n-k merges
    let mut parent: Vec<usize> = (0..(2 * n - 1)).collect();
    for (i, step) in dendrogram.steps().iter().take(n - k).enumerate() {
        parent[step.cluster1] = n + i;
        parent[step.cluster2] = n + i;
    }

    let find = |mut c: usize| {
        while parent[c] != c {
            c = parent[c];
        }
        c
    };

    let mut root_to_label: Vec<(usize, usize)> = Vec::with_capacity(k);
    let labels = (0..n)
        .map(|leaf| {
            let root = find(leaf);
            match root_to_label.iter().find(|(r, _)| *r == root) {
                Some(&(_, label)) => label,
                None => {
                    let label = root_to_label.len();
                    root_to_label.push((root, label));
                    label
                }
            }
        })
        .collect();
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::test_utils::{check_block_labels, labels_within, two_blobs};
    use crate::distance::{DistanceRegistry, Metric};

    fn euclidean(x: &ndarray::Array2<f64>) -> Dissimilarity {
        Dissimilarity::from_rows(x, |a, b| Metric::Euclidean.distance(a, b, 2.0))
    }

    #[test]
    fn test_hierarchical_basic() {
        let d = Dissimilarity::from_condensed(4, &[0.1, 10.0, 10.0, 10.0, 10.0, 0.1]).unwrap();
        let labels = HierarchicalClusterer::default()
            .cluster(&d, &ClusterContext::new(2, 0))
            .unwrap();
        assert_eq!(labels, vec![Some(1), Some(1), Some(2), Some(2)]);
    }

    #[test]
    fn test_hierarchical_two_blobs() {
        let x = two_blobs();
        let d = euclidean(&x);
        let labels = HierarchicalClusterer::default()
            .cluster(&d, &ClusterContext::new(2, 0))
            .unwrap();
        assert!(check_block_labels(&labels, 10));
    }

    #[test]
    fn test_cut_produces_k_groups() {
        let x = two_blobs();
        let reg = DistanceRegistry::default();
        let d = reg.compute(&reg.resolve("manhattan").unwrap(), &x).unwrap();
        for k in 2..6 {
            let labels = HierarchicalClusterer::default()
                .with_linkage(Linkage::Complete)
                .cluster(&d, &ClusterContext::new(k, 0))
                .unwrap();
            assert!(labels_within(&labels, k));
            assert_eq!(crate::util::n_distinct_labels(&labels), k);
        }
    }

    #[test]
    fn test_too_few_items() {
        let d = Dissimilarity::from_condensed(2, &[1.0]).unwrap();
        let result = HierarchicalClusterer::default().cluster(&d, &ClusterContext::new(3, 0));
        assert!(result.is_err());
    }
}
