//! `brunet`: multiplicative updates minimizing the KL divergence
//! (Brunet et al. 2004).

use ndarray::{Array2, Axis};

use super::factorization::NmfUpdater;
use super::update_rules::{kl_divergence, multiplicative_update, ratio, EPS};

pub struct BrunetUpdater;

impl NmfUpdater for BrunetUpdater {
    /// W <- W * ((V / WH) H^T) / (1 H^T)
    fn update_w(&self, v: &Array2<f64>, w: &mut Array2<f64>, h: &Array2<f64>) {
        let r = ratio(v, &w.dot(h));
        let numer = r.dot(&h.t());
        let h_rows = h.sum_axis(Axis(1)).insert_axis(Axis(0));
        let denom = h_rows.broadcast(w.raw_dim()).map(|b| b.to_owned());
        if let Some(denom) = denom {
            *w = multiplicative_update(w, &numer, &denom, EPS);
        }
    }

    /// H <- H * (W^T (V / WH)) / (W^T 1)
    fn update_h(&self, v: &Array2<f64>, w: &Array2<f64>, h: &mut Array2<f64>) {
        let r = ratio(v, &w.dot(h));
        let numer = w.t().dot(&r);
        let w_cols = w.sum_axis(Axis(0)).insert_axis(Axis(1));
        let denom = w_cols.broadcast(h.raw_dim()).map(|b| b.to_owned());
        if let Some(denom) = denom {
            *h = multiplicative_update(h, &numer, &denom, EPS);
        }
    }

    fn compute_criterion(&self, v: &Array2<f64>, w: &Array2<f64>, h: &Array2<f64>) -> f64 {
        kl_divergence(v, w, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmf::factorization::{run_factorization, NmfConfig};
    use crate::nmf::test_utils::make_block_diagonal;

    #[test]
    fn test_brunet_decreases_divergence() {
        let v = make_block_diagonal();
        let short = run_factorization(
            &NmfConfig { max_iter: 1, ..Default::default() },
            &BrunetUpdater,
            &v,
        );
        let long = run_factorization(
            &NmfConfig { max_iter: 200, ..Default::default() },
            &BrunetUpdater,
            &v,
        );
        assert!(long.criterion < short.criterion);
        assert!(long.w.iter().all(|&x| x >= 0.0));
    }
}
