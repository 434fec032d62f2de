/// Shared test utilities for the clusterer families
use ndarray::Array2;
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

use crate::cluster::Partition;

/// `n_per_blob` points around each of `centers`, jittered by +-0.5.
/// Rows of blob b are b*n_per_blob..(b+1)*n_per_blob.
pub fn make_blobs(centers: &[[f64; 2]], n_per_blob: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Array2::random_using(
        (centers.len() * n_per_blob, 2),
        Uniform::new(-0.5, 0.5),
        &mut rng,
    );
    let mut x = noise;
    for (b, c) in centers.iter().enumerate() {
        for i in 0..n_per_blob {
            let row = b * n_per_blob + i;
            x[[row, 0]] += c[0];
            x[[row, 1]] += c[1];
        }
    }
    x
}

/// Two well separated blobs of 10 points each
pub fn two_blobs() -> Array2<f64> {
    make_blobs(&[[0.0, 0.0], [10.0, 10.0]], 10, 7)
}

/// Check that consecutive blocks of `block_size` rows share one label and
/// that different blocks have different labels.
pub fn check_block_labels(labels: &Partition, block_size: usize) -> bool {
    if labels.is_empty() || labels.len() % block_size != 0 {
        return false;
    }
    let mut block_labels = Vec::new();
    for block in labels.chunks(block_size) {
        let first = match block[0] {
            Some(l) => l,
            None => return false,
        };
        if !block.iter().all(|&l| l == Some(first)) {
            return false;
        }
        if block_labels.contains(&first) {
            return false;
        }
        block_labels.push(first);
    }
    true
}

/// Every label lies in 1..=k and no label is missing
pub fn labels_within(labels: &Partition, k: usize) -> bool {
    labels.iter().all(|l| matches!(l, Some(v) if *v >= 1 && *v <= k))
}
