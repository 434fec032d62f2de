//! Subsample index tables.

use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::seq::index::sample;
use ndarray_rand::rand::SeedableRng;

/// Row indices of every repetition, drawn without replacement and sorted
/// ascending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsampleTable {
    indices: Vec<Vec<usize>>,
}

impl SubsampleTable {
    /// Draw `reps` subsets of `size` rows out of `n` from a stream seeded
    /// with `seed`. Panics if `size > n`.
    pub fn draw(n: usize, size: usize, reps: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let indices = (0..reps)
            .map(|_| {
                let mut rows = sample(&mut rng, n, size).into_vec();
                rows.sort_unstable();
                rows
            })
            .collect();
        Self { indices }
    }

    pub fn get(&self, rep: usize) -> &[usize] {
        &self.indices[rep]
    }

    pub fn reps(&self) -> usize {
        self.indices.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[usize]> {
        self.indices.iter().map(|v| v.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_is_reproducible() {
        let a = SubsampleTable::draw(50, 40, 5, 11);
        let b = SubsampleTable::draw(50, 40, 5, 11);
        assert_eq!(a, b);
        assert_ne!(a, SubsampleTable::draw(50, 40, 5, 12));
    }

    #[test]
    fn test_rows_are_distinct_sorted_and_in_range() {
        let table = SubsampleTable::draw(30, 24, 4, 1);
        assert_eq!(table.reps(), 4);
        for rows in table.iter() {
            assert_eq!(rows.len(), 24);
            assert!(rows.windows(2).all(|w| w[0] < w[1]));
            assert!(rows.iter().all(|&r| r < 30));
        }
    }

    #[test]
    fn test_full_proportion_takes_every_row() {
        let table = SubsampleTable::draw(10, 10, 2, 3);
        assert_eq!(table.get(1), (0..10).collect::<Vec<_>>().as_slice());
    }
}
