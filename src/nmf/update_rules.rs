use ndarray::Array2;

/// Guards divisions in the update rules
pub const EPS: f64 = 1e-16;

/// Elementwise multiplicative update: base * numer / (denom + eps)
pub fn multiplicative_update(
    base: &Array2<f64>,
    numer: &Array2<f64>,
    denom: &Array2<f64>,
    eps: f64,
) -> Array2<f64> {
    let mut result = base.clone();
    ndarray::Zip::from(&mut result)
        .and(numer)
        .and(denom)
        .for_each(|r, &n, &d| {
            *r *= n / (d + eps);
        });
    nan_to_num(&mut result);
    result
}

/// Replace NaN and Inf with 0.0 in-place
pub fn nan_to_num(a: &mut Array2<f64>) {
    a.mapv_inplace(|v| if v.is_finite() { v } else { 0.0 });
}

/// Elementwise ratio V / (WH + eps)
pub fn ratio(v: &Array2<f64>, wh: &Array2<f64>) -> Array2<f64> {
    let mut out = v.clone();
    ndarray::Zip::from(&mut out).and(wh).for_each(|o, &a| {
        *o /= a + EPS;
    });
    out
}

/// Frobenius norm squared: ||V - W*H||_F^2
pub fn reconstruction_error(v: &Array2<f64>, w: &Array2<f64>, h: &Array2<f64>) -> f64 {
    let diff = v - &w.dot(h);
    diff.mapv(|d| d * d).sum()
}

/// Generalized Kullback-Leibler divergence D(V || WH)
pub fn kl_divergence(v: &Array2<f64>, w: &Array2<f64>, h: &Array2<f64>) -> f64 {
    let wh = w.dot(h);
    let mut total = 0.0;
    ndarray::Zip::from(v).and(&wh).for_each(|&a, &b| {
        let b = b + EPS;
        total += if a > 0.0 { a * (a / b).ln() - a + b } else { b };
    });
    total
}
