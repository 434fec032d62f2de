/// Shared test utilities for the factorization methods
use ndarray::Array2;

/// Create a synthetic block-diagonal matrix with clear 2x2 structure.
/// Blocks (0,0) and (1,1) hold 5.0, off-diagonal blocks hold 0.1.
/// Returns a 20x20 matrix: rows 0-9 → cluster 0, rows 10-19 → cluster 1.
pub fn make_block_diagonal() -> Array2<f64> {
    let n = 20;
    let mut x = Array2::from_elem((n, n), 0.1);
    for i in 0..n {
        for j in 0..n {
            if (i < 10) == (j < 10) {
                x[[i, j]] = 5.0;
            }
        }
    }
    x
}
