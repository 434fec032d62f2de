/*
 * File: /matrix.rs
 * Created Date: Thursday November 23rd 2023
 * Author: Zihan
 * -----
 * Last Modified: Tuesday, 10th March 2026 3:02:11 pm
 * Modified By: the developer formerly known as Zihan at <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-03-10		Zihan	Row-labelled data matrix for subsampling ensembles
 */

use ndarray::{Array2, Axis};

use crate::error::EnsembleError;

/// Samples × variables matrix with one identifier per sample (row).
#[derive(Debug, Clone)]
pub struct DataMatrix {
    data: Array2<f64>,
    row_names: Vec<String>,
}

impl DataMatrix {
    /// constructor with Array2<f64>, rows are named `S1..Sn`
    pub fn new(data: Array2<f64>) -> Result<DataMatrix, EnsembleError> {
        let row_names = (1..=data.nrows()).map(|i| format!("S{}", i)).collect();
        Self::with_row_names(data, row_names)
    }

    pub fn with_row_names(
        data: Array2<f64>,
        row_names: Vec<String>,
    ) -> Result<DataMatrix, EnsembleError> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(EnsembleError::InvalidConfiguration(format!(
                "data matrix must be non-empty, got {}x{}",
                data.nrows(),
                data.ncols()
            )));
        }
        if row_names.len() != data.nrows() {
            return Err(EnsembleError::InvalidConfiguration(format!(
                "{} row names for {} rows",
                row_names.len(),
                data.nrows()
            )));
        }
        if let Some((idx, v)) = data.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(EnsembleError::InvalidConfiguration(format!(
                "non-finite value {} at row {}, column {}",
                v, idx.0, idx.1
            )));
        }
        Ok(DataMatrix { data, row_names })
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn row_names(&self) -> &[String] {
        &self.row_names
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }
}

/// Copy the given rows (in the given order) into a new matrix
pub fn select_rows(data: &Array2<f64>, rows: &[usize]) -> Array2<f64> {
    data.select(Axis(0), rows)
}

/// Drop every column whose entries are all zero. Returns `data` unchanged
/// (as a copy) when no column qualifies.
pub fn drop_zero_columns(data: &Array2<f64>) -> Array2<f64> {
    let keep: Vec<usize> = data
        .axis_iter(Axis(1))
        .enumerate()
        .filter(|(_, col)| col.iter().any(|&v| v != 0.0))
        .map(|(j, _)| j)
        .collect();
    if keep.len() == data.ncols() {
        data.clone()
    } else {
        data.select(Axis(1), &keep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_new_matrix() {
        let data = Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let matrix = DataMatrix::new(data).unwrap();
        assert_eq!(matrix.nrows(), 2);
        assert_eq!(matrix.ncols(), 2);
        assert_eq!(matrix.row_names(), &["S1".to_string(), "S2".to_string()]);
    }

    #[test]
    fn test_row_name_mismatch() {
        let data = Array2::zeros((3, 2));
        let result = DataMatrix::with_row_names(data, vec!["a".to_string()]);
        assert!(matches!(result, Err(EnsembleError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_empty_matrix_rejected() {
        assert!(DataMatrix::new(Array2::zeros((0, 3))).is_err());
        assert!(DataMatrix::new(Array2::zeros((3, 0))).is_err());
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let result = DataMatrix::new(array![[1.0, f64::NAN], [3.0, 4.0]]);
        match result {
            Err(EnsembleError::InvalidConfiguration(msg)) => assert!(msg.contains("row 0, column 1")),
            other => panic!("expected InvalidConfiguration, got {:?}", other),
        }
        assert!(DataMatrix::new(array![[f64::INFINITY, 1.0]]).is_err());
    }

    #[test]
    fn test_select_rows() {
        let data = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let sub = select_rows(&data, &[2, 0]);
        assert_eq!(sub, array![[5.0, 6.0], [1.0, 2.0]]);
    }

    #[test]
    fn test_drop_zero_columns() {
        let data = array![[0.0, 1.0, 0.0], [0.0, 2.0, 3.0]];
        let kept = drop_zero_columns(&data);
        assert_eq!(kept, array![[1.0, 0.0], [2.0, 3.0]]);
    }
}
