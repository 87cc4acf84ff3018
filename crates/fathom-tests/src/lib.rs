//! Shared helpers for the fathom integration test suite.

/// Asserts that `actual` is within `tol` of `expected`, labelling the failure.
pub fn assert_close(actual: f64, expected: f64, tol: f64, label: &str) {
    assert!(
        (actual - expected).abs() <= tol,
        "{} mismatch: expected {:.15}, got {:.15}, diff={:.3e}",
        label,
        expected,
        actual,
        (actual - expected).abs()
    );
}

/// Arithmetic mean of a slice; `NaN` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance of a slice around its mean.
pub fn variance(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}
