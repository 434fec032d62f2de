/**
 * File: /src/util.rs
 * Created Date: Tuesday, June 18th 2024
 * Author: Zihan
 * -----
 * Last Modified: Wednesday, 11th March 2026 4:30:02 pm
 * Modified By: the developer formerly known as Zihan at <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
**/
use std::collections::HashMap;
extern crate nalgebra as na;
use na::DMatrix;
use ndarray::{Array2, Axis};

use crate::cluster::Partition;

pub fn clone_to_dmatrix<T>(array_view: ndarray::ArrayView2<T>) -> DMatrix<T>
where
    T: Clone,
    T: na::Scalar,
{
    let nrows = array_view.ncols();
    let ncols = array_view.nrows();
    let elements = array_view.iter().cloned().collect::<Vec<T>>();
    DMatrix::from_vec(nrows, ncols, elements).transpose()
}

/// Compute argmax along axis 1 for each row
pub fn argmax_axis1(a: &Array2<f64>) -> Vec<usize> {
    a.axis_iter(Axis(0))
        .map(|row| {
            row.iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(idx, _)| idx)
                .unwrap_or(0)
        })
        .collect()
}

/// Zero-based cluster ids to 1-based labels
pub fn one_based(labels: impl IntoIterator<Item = usize>) -> Partition {
    labels.into_iter().map(|l| Some(l + 1)).collect()
}

/// Relabel arbitrary ids to `1..=m` in order of first appearance
pub fn relabel_dense(labels: &[Option<usize>]) -> Partition {
    let mut mapping = HashMap::new();
    labels
        .iter()
        .map(|label| {
            label.map(|l| {
                let next = mapping.len() + 1;
                *mapping.entry(l).or_insert(next)
            })
        })
        .collect()
}

/// Number of distinct non-missing labels
pub fn n_distinct_labels(labels: &[Option<usize>]) -> usize {
    let mut seen: Vec<usize> = labels.iter().flatten().copied().collect();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn test_clone_to_dmatrix() {
        let array = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let array_view = array.view();
        let dmatrix = clone_to_dmatrix(array_view);

        assert_eq!(array_view.nrows(), dmatrix.nrows());
        assert_eq!(array_view.ncols(), dmatrix.ncols());
        for i in 0..array_view.nrows() {
            for j in 0..array_view.ncols() {
                assert_eq!(array_view[(i, j)], dmatrix[(i, j)]);
            }
        }
    }

    #[test]
    fn test_argmax_axis1() {
        let a = array![[0.1, 0.9], [0.7, 0.3], [0.5, 0.5]];
        assert_eq!(argmax_axis1(&a), vec![1, 0, 1]);
    }

    #[test]
    fn test_relabel_dense() {
        let labels = [Some(7), Some(3), None, Some(7), Some(11)];
        assert_eq!(
            relabel_dense(&labels),
            vec![Some(1), Some(2), None, Some(1), Some(3)]
        );
        assert_eq!(n_distinct_labels(&labels), 3);
    }

    #[test]
    fn test_one_based() {
        assert_eq!(one_based(vec![0, 2, 1]), vec![Some(1), Some(3), Some(2)]);
    }
}
