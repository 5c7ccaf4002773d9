//! Small numeric helpers shared by the transform resolver and the builders.

/// Tolerance used for "is this effectively equal" checks.
pub const EPSILON: f64 = 1e-6;

pub fn float_almost_equal(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() < EPSILON
}

/// Normalize an angle in degrees to (-180, 180].
pub fn normalize_angle(angle: f64) -> f64 {
    let mut angle = angle % 360.0;
    angle = (angle + 360.0) % 360.0;
    if angle > 180.0 {
        angle -= 360.0;
    }
    angle
}

/// Division that never fails: a zero denominator yields an infinity carrying
/// the numerator's sign, or positive infinity for a zero numerator.
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator != 0.0 {
        numerator / denominator
    } else if numerator < 0.0 {
        f64::NEG_INFINITY
    } else {
        f64::INFINITY
    }
}
