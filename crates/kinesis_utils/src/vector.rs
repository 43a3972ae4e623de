//! 2D vector helpers used by gameplay response code.

use glam::Vec2;

/// Reflects `v` around the surface normal `n`. `n` is expected to be normalized.
///
/// ```
/// # use glam::Vec2;
/// # use kinesis_utils::vector::reflect;
/// let bounced = reflect(Vec2::new(2.0, 3.0), Vec2::new(0.0, -1.0));
/// assert_eq!(bounced, Vec2::new(2.0, -3.0));
/// ```
#[inline]
pub fn reflect(v: Vec2, n: Vec2) -> Vec2 {
    v - 2.0 * v.dot(n) * n
}

/// Normalizes `v`, returning a zero vector for zero length input instead of NaNs.
#[inline]
pub fn normalise(v: Vec2) -> Vec2 {
    v.normalize_or_zero()
}

/// Angle of `v` in radians, counter-clockwise from the positive X axis.
#[inline]
pub fn rotation(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}
