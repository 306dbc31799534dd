/*!
Math aliases and small vector helpers used across the controller.

This module intentionally contains no controller logic. Every function is
total: degenerate inputs (zero-length vectors, non-positive deltas) return a
well-defined value instead of NaN, so callers can chain these without extra
guards.
*/

use nalgebra as na;

use crate::settings::DIST_EPS;

/// Common math aliases for clarity and consistency.
pub type Vec3 = na::Vector3<f32>;
pub type Vec2 = na::Vector2<f32>;
pub type Quat = na::UnitQuaternion<f32>;
pub type Iso = na::Isometry3<f32>;

/// Removes the component of `v` along `plane_normal`.
///
/// `plane_normal` does not need to be unit length; a degenerate normal
/// returns `v` unchanged.
#[inline]
pub fn project_on_plane(v: Vec3, plane_normal: Vec3) -> Vec3 {
    match plane_normal.try_normalize(DIST_EPS) {
        Some(n) => v - n * v.dot(&n),
        None => v,
    }
}

/// Clamps `v` to at most `max_len` without changing its direction.
#[inline]
pub fn clamp_magnitude(v: Vec3, max_len: f32) -> Vec3 {
    let len_sq = v.norm_squared();
    if max_len <= 0.0 {
        return Vec3::zeros();
    }
    if len_sq > max_len * max_len {
        v * (max_len / len_sq.sqrt())
    } else {
        v
    }
}

/// Frame-rate independent exponential smoothing factor: `1 - e^(-response * dt)`.
///
/// Result is in `[0, 1)` for `response, dt >= 0`, approaching 1 as
/// `response * dt` grows. Blending with this factor each tick converges on
/// the target without overshooting, regardless of the tick length.
#[inline]
pub fn smooth_factor(response: f32, dt: f32) -> f32 {
    let x = (response * dt).max(0.0);
    1.0 - (-x).exp()
}

/// Reorients `direction` so it lies in the surface plane while keeping its
/// heading relative to `up`.
///
/// This is the tangent projection used to glue grounded movement to slopes:
/// `normalize(surface_normal x (direction x up))`. Returns zero when the
/// inputs are degenerate (e.g. `direction` parallel to `up`).
#[inline]
pub fn tangent_to_surface(direction: Vec3, up: Vec3, surface_normal: Vec3) -> Vec3 {
    let direction_right = direction.cross(&up);
    let tangent = surface_normal.cross(&direction_right);
    match tangent.try_normalize(DIST_EPS) {
        Some(t) => t,
        None => Vec3::zeros(),
    }
}
