//! Minimal field-vector arithmetic used by the integrators.

use num_complex::Complex64;

/// Squared Euclidean norm `Σ |v_i|²`.
pub fn norm_sq(values: &[Complex64]) -> f64 {
    values.iter().map(|value| value.norm_sqr()).sum()
}

/// In-place `y += a * x`.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn axpy(a: f64, x: &[Complex64], y: &mut [Complex64]) {
    assert_eq!(x.len(), y.len(), "axpy: length mismatch");
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi += *xi * a;
    }
}

/// Returns the element-wise negation of `values`.
pub fn negated(values: &[Complex64]) -> Vec<Complex64> {
    values.iter().map(|value| -*value).collect()
}

/// Largest absolute element-wise difference between two vectors.
pub fn max_abs_diff(a: &[Complex64], b: &[Complex64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (*x - *y).norm())
        .fold(0.0, f64::max)
}
