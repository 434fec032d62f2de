use std::sync::atomic::{AtomicUsize, Ordering};

use log::info;

/// Shared completion counter over every (k, variant, repetition) cell
#[derive(Debug)]
pub struct Progress {
    done: AtomicUsize,
    total: usize,
    enabled: bool,
    /// Log every `step` cells
    step: usize,
}

impl Progress {
    pub fn new(total: usize, enabled: bool) -> Self {
        Self {
            done: AtomicUsize::new(0),
            total,
            enabled,
            step: (total / 20).max(1),
        }
    }

    /// Mark one cell as finished and return the new count
    pub fn tick(&self) -> usize {
        let done = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        if self.enabled && (done % self.step == 0 || done == self.total) {
            info!(
                "progress: {}/{} cells ({:.0}%)",
                done,
                self.total,
                100.0 * done as f64 / self.total.max(1) as f64
            );
        }
        done
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_complete(&self) -> bool {
        self.done() >= self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_ticks_from_many_threads() {
        let progress = Progress::new(1000, false);
        (0..1000).into_par_iter().for_each(|_| {
            progress.tick();
        });
        assert_eq!(progress.done(), 1000);
        assert!(progress.is_complete());
    }
}
