/*!
View-ray and damage collaborators for the attack step.

The controller only needs two operations from the outside world to resolve a
melee attack: cast a ray from the view origin along the view forward, and
deliver damage to whatever damageable thing the ray hit. Both are bundled in
[`CombatContext`] so a single collaborator (typically the physics scene) can
service the attack step. The ray must already exclude the character's own
collision volume; the reference scene motor satisfies this trivially because
the character is not part of its collider set.
*/

use crate::math::Vec3;

/// Opaque handle to a damageable target known to the combat context.
pub type TargetId = usize;

/// Nearest intersection of a view ray with the scene.
#[derive(Clone, Copy, Debug)]
pub struct RayHit {
    /// World-space hit point.
    pub point: Vec3,
    /// Distance from the ray origin to the hit point (meters).
    pub distance: f32,
    /// The damageable target that was struck, if the hit thing is one.
    pub target: Option<TargetId>,
}

/// Raycast provider plus damage sink, consumed by the attack step.
pub trait CombatContext {
    /// Casts a ray and returns the nearest hit within `max_distance`, or
    /// `None` on a miss. `forward` does not need to be unit length.
    fn cast_view_ray(&mut self, origin: Vec3, forward: Vec3, max_distance: f32) -> Option<RayHit>;

    /// Applies damage to a previously reported target. Unknown or already
    /// destroyed targets are a no-op.
    fn apply_damage(&mut self, target: TargetId, amount: f32);
}

/// Combat context for ticks with no combat wired up: every ray misses.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullCombat;

impl CombatContext for NullCombat {
    fn cast_view_ray(&mut self, _origin: Vec3, _forward: Vec3, _max: f32) -> Option<RayHit> {
        None
    }

    fn apply_damage(&mut self, _target: TargetId, _amount: f32) {}
}
