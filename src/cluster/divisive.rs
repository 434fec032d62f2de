//! `diana`: divisive (top-down) hierarchical clustering.
//!
//! Starting from one cluster holding every item, the cluster with the largest
//! diameter is split by growing a splinter group: the item with the highest
//! average dissimilarity seeds it, and items keep moving over while they are
//! on average closer to the splinter group than to the rest. Splitting stops
//! once `k` clusters exist, which is the same as cutting the full DIANA
//! tree at `k`.

use super::{ensure_enough_items, ClusterContext, DissimilarityClusterer, Partition};
use crate::distance::Dissimilarity;
use crate::error::ClusteringFailure;
use crate::util::relabel_dense;

#[derive(Debug, Clone, Default)]
pub struct DivisiveClusterer;

impl DissimilarityClusterer for DivisiveClusterer {
    fn cluster(
        &self,
        diss: &Dissimilarity,
        ctx: &ClusterContext,
    ) -> Result<Partition, ClusteringFailure> {
        let n = diss.len();
        ensure_enough_items("diana", n, ctx.k)?;

        let mut clusters: Vec<Vec<usize>> = vec![(0..n).collect()];
        while clusters.len() < ctx.k {
            let target = clusters
                .iter()
                .enumerate()
                .filter(|(_, c)| c.len() > 1)
                .map(|(i, c)| (i, diameter(diss, c)))
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(i, _)| i)
                .ok_or_else(|| ClusteringFailure::new("diana", "no splittable cluster left"))?;

            let cluster = clusters.swap_remove(target);
            let (rest, splinter) = split(diss, cluster);
            clusters.push(rest);
            clusters.push(splinter);
        }

        let mut labels = vec![None; n];
        for (c, members) in clusters.iter().enumerate() {
            for &i in members {
                labels[i] = Some(c);
            }
        }
        Ok(relabel_dense(&labels))
    }
}

fn diameter(diss: &Dissimilarity, members: &[usize]) -> f64 {
    let mut max = 0.0;
    for (a, &i) in members.iter().enumerate() {
        for &j in &members[a + 1..] {
            max = f64::max(max, diss.get(i, j));
        }
    }
    max
}

fn mean_to(diss: &Dissimilarity, i: usize, group: &[usize]) -> f64 {
    let others: Vec<usize> = group.iter().copied().filter(|&j| j != i).collect();
    if others.is_empty() {
        return 0.0;
    }
    others.iter().map(|&j| diss.get(i, j)).sum::<f64>() / others.len() as f64
}

/// Split `cluster` (size >= 2) into (remaining, splinter group)
fn split(diss: &Dissimilarity, cluster: Vec<usize>) -> (Vec<usize>, Vec<usize>) {
    let mut rest = cluster;

    // seed: item with the largest average dissimilarity to the others
    let seed_pos = (0..rest.len())
        .max_by(|&a, &b| {
            mean_to(diss, rest[a], &rest)
                .partial_cmp(&mean_to(diss, rest[b], &rest))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .unwrap_or(0);
    let mut splinter = vec![rest.remove(seed_pos)];

    while rest.len() > 1 {
        let best = rest
            .iter()
            .enumerate()
            .map(|(pos, &i)| (pos, mean_to(diss, i, &rest) - mean_to(diss, i, &splinter)))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        match best {
            Some((pos, gain)) if gain > 0.0 => splinter.push(rest.remove(pos)),
            _ => break,
        }
    }
    (rest, splinter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::test_utils::{check_block_labels, labels_within, make_blobs};
    use crate::distance::Metric;
    use crate::util::n_distinct_labels;

    #[test]
    fn test_diana_three_blobs() {
        let x = make_blobs(&[[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]], 8, 3);
        let d = Dissimilarity::from_rows(&x, |a, b| Metric::Euclidean.distance(a, b, 2.0));
        let labels = DivisiveClusterer.cluster(&d, &ClusterContext::new(3, 0)).unwrap();
        assert!(check_block_labels(&labels, 8));
        assert!(labels_within(&labels, 3));
    }

    #[test]
    fn test_diana_k_equals_n() {
        let d = Dissimilarity::from_condensed(3, &[1.0, 2.0, 3.0]).unwrap();
        let labels = DivisiveClusterer.cluster(&d, &ClusterContext::new(3, 0)).unwrap();
        assert_eq!(n_distinct_labels(&labels), 3);
    }

    #[test]
    fn test_diana_too_few_items() {
        let d = Dissimilarity::from_condensed(2, &[1.0]).unwrap();
        assert!(DivisiveClusterer.cluster(&d, &ClusterContext::new(3, 0)).is_err());
    }
}
