/*!
Controller and collision tolerances.

These constants centralize the parameters used by the velocity integrator,
the reference scene motor, and the overlap queries. Keeping them together
makes tuning easier and helps ensure deterministic behavior across platforms.

Notes
- Distances are in meters, time in seconds.
- Favor practical world-space tolerances over machine epsilon for robust
  behavior.
*/

/// Practical small distance for comparisons (meters).
/// Use for dot-product guards, normalization thresholds, etc.
pub const DIST_EPS: f32 = 1.0e-6;

/// Minimum squared movement threshold to consider a sweep step meaningful (m^2).
/// Movements below this are treated as zero to avoid tiny oscillations.
pub const MIN_MOVE_SQ: f32 = 1.0e-8;

/// Separation from surfaces kept when landing or sliding (meters).
/// Too large creates visible gaps; too small risks jitter on contact.
pub const DEFAULT_SKIN: f32 = 0.02;

/// Maximum number of slide iterations per kinematic step.
/// Higher values help with tight corners at the cost of more queries.
pub const DEFAULT_MAX_ITERATIONS: u32 = 4;

/// Cosine of the steepest slope that still counts as stable ground.
/// 0.707 corresponds to 45 degrees.
pub const MAX_SLOPE_COS: f32 = 0.707;

/// Downward probe distance used to confirm ground contact while grounded (meters).
pub const GROUND_PROBE_DISTANCE: f32 = 0.08;

/// Max downward snap distance to search for ground when airborne (meters).
/// Small values keep the controller from snapping across gaps.
pub const SNAP_MAX_DISTANCE: f32 = 0.30;

/// Hover height kept above detected ground along the contact normal (meters).
/// Prevents exact contact, which reduces jitter and depenetration needs.
pub const SNAP_HOVER_HEIGHT: f32 = 0.02;

/// Capacity of the fixed overlap-result buffer used by the uncrouch test.
///
/// A scene producing more simultaneous overlaps than this silently
/// undercounts; overlaps beyond the capacity are not reported. This is a
/// documented precision loss, not an error.
pub const OVERLAP_CAPACITY: usize = 8;
