//! `lee`: multiplicative updates minimizing the Frobenius reconstruction
//! error (Lee & Seung 2001).

use ndarray::Array2;

use super::factorization::NmfUpdater;
use super::update_rules::{multiplicative_update, reconstruction_error, EPS};

pub struct LeeUpdater;

impl NmfUpdater for LeeUpdater {
    fn update_w(&self, v: &Array2<f64>, w: &mut Array2<f64>, h: &Array2<f64>) {
        let numer = v.dot(&h.t());
        let denom = w.dot(h).dot(&h.t());
        *w = multiplicative_update(w, &numer, &denom, EPS);
    }

    fn update_h(&self, v: &Array2<f64>, w: &Array2<f64>, h: &mut Array2<f64>) {
        let numer = w.t().dot(v);
        let denom = w.t().dot(w).dot(h);
        *h = multiplicative_update(h, &numer, &denom, EPS);
    }

    fn compute_criterion(&self, v: &Array2<f64>, w: &Array2<f64>, h: &Array2<f64>) -> f64 {
        reconstruction_error(v, w, h)
    }
}
