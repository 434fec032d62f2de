//! Default data preparation: low-variance filtering and column scaling.
//!
//! The ensemble treats preparation as an opaque `matrix -> matrix` function,
//! this is only the implementation installed when the caller provides none.

use std::sync::Arc;

use log::debug;
use ndarray::{Array2, Axis};
use statrs::statistics::{Data, Median, Statistics};

use crate::config::{PrepareOptions, ScaleType};

/// Scale factor turning a MAD into a consistent estimate of the sd
const MAD_CONSTANT: f64 = 1.4826;

/// A data preparation step. Must keep the number of rows.
pub type Preparer = Arc<dyn Fn(&Array2<f64>) -> Array2<f64> + Send + Sync>;

/// Preparer built from options
pub fn default_preparer(options: PrepareOptions) -> Preparer {
    Arc::new(move |x: &Array2<f64>| prepare_data(x, &options))
}

pub fn prepare_data(x: &Array2<f64>, options: &PrepareOptions) -> Array2<f64> {
    let filtered = filter_low_variance(x, options.min_var);
    if options.scale {
        scale_columns(&filtered, options.scale_type)
    } else {
        filtered
    }
}

/// Drop columns with variance below `min_var`. If every column would go, the
/// data is returned as is.
pub fn filter_low_variance(x: &Array2<f64>, min_var: f64) -> Array2<f64> {
    let keep: Vec<usize> = x
        .axis_iter(Axis(1))
        .enumerate()
        .filter(|(_, col)| {
            let var = col.iter().variance();
            var.is_finite() && var >= min_var
        })
        .map(|(j, _)| j)
        .collect();

    if keep.is_empty() {
        debug!("variance filter (min_var={}) would drop every column, skipped", min_var);
        return x.clone();
    }
    if keep.len() < x.ncols() {
        debug!("variance filter kept {} of {} columns", keep.len(), x.ncols());
    }
    x.select(Axis(1), &keep)
}

pub fn scale_columns(x: &Array2<f64>, scale_type: ScaleType) -> Array2<f64> {
    let mut out = x.clone();
    for mut col in out.axis_iter_mut(Axis(1)) {
        let (center, spread) = match scale_type {
            ScaleType::Conventional => (col.iter().mean(), col.iter().std_dev()),
            ScaleType::Robust => {
                let median = Data::new(col.to_vec()).median();
                let deviations: Vec<f64> = col.iter().map(|v| (v - median).abs()).collect();
                (median, MAD_CONSTANT * Data::new(deviations).median())
            }
        };
        if spread.is_finite() && spread > 0.0 {
            col.mapv_inplace(|v| (v - center) / spread);
        } else if center.is_finite() {
            col.mapv_inplace(|v| v - center);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_conventional_scaling() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]];
        let scaled = scale_columns(&x, ScaleType::Conventional);
        for col in scaled.axis_iter(Axis(1)) {
            assert!(col.iter().mean().abs() < 1e-12);
            assert!((col.iter().std_dev() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_robust_scaling_centres_on_median() {
        let x = array![[1.0], [2.0], [3.0], [100.0]];
        let scaled = scale_columns(&x, ScaleType::Robust);
        // median 2.5, MAD 1.0
        assert!((scaled[[0, 0]] - (1.0 - 2.5) / MAD_CONSTANT).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_is_centred_only() {
        let x = array![[5.0, 1.0], [5.0, 2.0]];
        let scaled = scale_columns(&x, ScaleType::Conventional);
        assert_eq!(scaled.column(0).to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_filter_low_variance() {
        let x = array![[1.0, 0.0, 10.0], [1.0, 0.1, 20.0], [1.0, 0.2, 30.0]];
        let filtered = filter_low_variance(&x, 1.0);
        assert_eq!(filtered.ncols(), 1);
        assert_eq!(filtered.column(0).to_vec(), vec![10.0, 20.0, 30.0]);

        // nothing survives -> untouched
        let filtered = filter_low_variance(&x, 1e6);
        assert_eq!(filtered, x);
    }

    #[test]
    fn test_default_preparer_keeps_rows() {
        let x = array![[1.0, 4.0], [2.0, 8.0], [3.0, 1.0]];
        let prep = default_preparer(PrepareOptions::default());
        let out = prep(&x);
        assert_eq!(out.nrows(), 3);
    }
}
