use ndarray::Array2;
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

/// Configuration shared by the factorization methods
#[derive(Debug, Clone)]
pub struct NmfConfig {
    /// Factorization rank
    pub rank: usize,
    pub max_iter: usize,
    pub n_init: usize,
    /// Relative criterion change that stops the iteration
    pub tol: f64,
    pub seed: u64,
}

impl Default for NmfConfig {
    fn default() -> Self {
        Self {
            rank: 2,
            max_iter: 500,
            n_init: 1,
            tol: 1e-6,
            seed: 1,
        }
    }
}

/// Result of a factorization: V ≈ W * H
pub struct NmfResult {
    pub w: Array2<f64>,
    pub h: Array2<f64>,
    pub criterion: f64,
}

/// Method-specific update rules for V ≈ W * H
pub trait NmfUpdater: Send + Sync {
    fn update_w(&self, v: &Array2<f64>, w: &mut Array2<f64>, h: &Array2<f64>);
    fn update_h(&self, v: &Array2<f64>, w: &Array2<f64>, h: &mut Array2<f64>);
    /// Lower is better
    fn compute_criterion(&self, v: &Array2<f64>, w: &Array2<f64>, h: &Array2<f64>) -> f64;
}

/// Run the factorization with `n_init` random restarts and keep the lowest
/// criterion. Restart `i` is seeded with `seed + i`.
pub fn run_factorization(config: &NmfConfig, updater: &dyn NmfUpdater, v: &Array2<f64>) -> NmfResult {
    let n = v.nrows();
    let q = v.ncols();
    let k = config.rank;

    // start near the scale of V
    let mean = if v.is_empty() { 0.0 } else { v.sum() / v.len() as f64 };
    let scale = (mean / k.max(1) as f64).sqrt().max(1e-8);

    let mut best = NmfResult {
        w: Array2::zeros((n, k)),
        h: Array2::zeros((k, q)),
        criterion: f64::INFINITY,
    };

    for init_idx in 0..config.n_init.max(1) {
        let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(init_idx as u64));
        let mut w = Array2::random_using((n, k), Uniform::new(0.0, 1.0), &mut rng) * scale;
        let mut h = Array2::random_using((k, q), Uniform::new(0.0, 1.0), &mut rng) * scale;

        let mut prev_criterion = f64::INFINITY;
        for iter in 0..config.max_iter {
            updater.update_h(v, &w, &mut h);
            updater.update_w(v, &mut w, &h);

            if iter % 10 == 9 {
                let criterion = updater.compute_criterion(v, &w, &h);
                if (prev_criterion - criterion).abs() <= config.tol * prev_criterion.abs().max(1.0) {
                    break;
                }
                prev_criterion = criterion;
            }
        }

        let criterion = updater.compute_criterion(v, &w, &h);
        if criterion < best.criterion {
            best = NmfResult { w, h, criterion };
        }
    }
    best
}
