/*!
Motor interface and the per-tick callback contract.

The collision/motor solver is an external collaborator: it owns the capsule,
performs the sweep-and-slide position update, and decides grounding. The
controller consumes it through the [`Motor`] trait and is driven by it
through the [`CharacterController`] trait, whose five phases run in a strict
total order each tick (see [`step`]). Any motor implementation, real or test
double, can drive a controller; [`scene::SceneMotor`] is the reference
implementation shipped with this crate.
*/

pub mod scene;

use crate::combat::CombatContext;
use crate::math::{self, Quat, Vec3};

/// Bitmask used to filter colliders in overlap and ray queries.
pub type CollisionMask = u32;

/// The motor's per-tick ground determination.
#[derive(Clone, Copy, Debug)]
pub struct GroundingReport {
    /// True when the character rests on a traversable (walkable-slope) surface.
    pub stable_on_ground: bool,
    /// True when any ground was detected, including steep, unstable slopes.
    /// Used by airborne steering to avoid climbing wall-like surfaces.
    pub found_any_ground: bool,
    /// World-space normal of the detected ground. Meaningful only when
    /// `found_any_ground` is true; defaults to the character up axis.
    pub normal: Vec3,
}

impl Default for GroundingReport {
    fn default() -> Self {
        Self {
            stable_on_ground: false,
            found_any_ground: false,
            normal: Vec3::y(),
        }
    }
}

/// Current collision capsule geometry.
#[derive(Clone, Copy, Debug)]
pub struct CapsuleDims {
    pub radius: f32,
    /// Full height from base to top (meters).
    pub height: f32,
}

/// Interface of the external kinematic collision motor.
///
/// Queries reflect the motor's transient (mid-tick) state. Operations take
/// effect immediately: in particular `set_capsule_dimensions` resizes the
/// collision capsule atomically, which is what allows the stance machine to
/// shrink in `before_update` and provisionally grow in `after_update` within
/// the same tick.
pub trait Motor {
    fn grounding(&self) -> GroundingReport;
    fn capsule(&self) -> CapsuleDims;
    fn transient_position(&self) -> Vec3;
    fn transient_rotation(&self) -> Quat;
    fn velocity(&self) -> Vec3;
    fn character_up(&self) -> Vec3;

    /// Resizes the collision capsule. `vertical_offset` is the capsule
    /// center's height above the character base (normally `height / 2`).
    fn set_capsule_dimensions(&mut self, radius: f32, height: f32, vertical_offset: f32);

    /// Detaches the character from the ground for at least `time` seconds
    /// (zero means the current tick only), suppressing ground snapping so a
    /// jump or knockback can actually leave the surface.
    fn force_unground(&mut self, time: f32);

    /// Tests the capsule volume at the given pose for overlaps, writing
    /// collider handles into `hits`. Returns the number written; overlaps
    /// beyond the buffer capacity are silently truncated.
    fn overlap_test(
        &mut self,
        position: Vec3,
        rotation: Quat,
        mask: CollisionMask,
        hits: &mut [usize],
    ) -> usize;

    /// Layers the character collides with; used for the uncrouch overlap test.
    fn collidable_layers(&self) -> CollisionMask {
        CollisionMask::MAX
    }

    /// Maps a movement direction onto the plane of `surface_normal`, keeping
    /// its heading relative to the character up axis.
    fn tangent_to_surface(&self, direction: Vec3, surface_normal: Vec3) -> Vec3 {
        math::tangent_to_surface(direction, self.character_up(), surface_normal)
    }

    /// Teleports the character base. Does not sweep; collision is resolved
    /// on the next integration.
    fn set_position(&mut self, position: Vec3);

    /// Overwrites the motor's resolved velocity.
    fn set_base_velocity(&mut self, velocity: Vec3);

    /// Collision-aware position update: move by `velocity * dt` with
    /// sweep-and-slide, then refresh the grounding report. Invoked by the
    /// tick driver between the velocity and after-update phases.
    fn integrate(&mut self, velocity: Vec3, rotation: Quat, dt: f32);
}

/// The five-phase callback contract a motor drives each tick.
///
/// Ordering is load-bearing:
/// - slide-on-landing detection in `update_velocity` depends on the state
///   snapshot taken in `before_update`;
/// - the uncrouch overlap test in `after_update` depends on the capsule
///   possibly having shrunk in `before_update`.
pub trait CharacterController {
    /// Phase 1: snapshot state, apply pending Stand->Crouch shrink.
    fn before_update(&mut self, motor: &mut dyn Motor, dt: f32);

    /// Phase 2: derive facing (yaw only) from the requested rotation.
    fn update_rotation(&mut self, current: &mut Quat, motor: &dyn Motor, dt: f32);

    /// Phase 3: the velocity integrator. May mutate stance and force the
    /// motor to unground.
    fn update_velocity(
        &mut self,
        current: &mut Vec3,
        motor: &mut dyn Motor,
        combat: &mut dyn CombatContext,
        dt: f32,
    );

    /// Phase 4: provisional uncrouch attempt, then refresh the public state
    /// from the motor's post-integration report.
    fn after_update(&mut self, motor: &mut dyn Motor, dt: f32);

    /// Phase 5: stance cleanup that depends on final grounding (Slide ends
    /// when airborne).
    fn post_grounding_update(&mut self, motor: &mut dyn Motor, dt: f32);
}

/// Runs one simulation tick in the contract order.
///
/// This is the single entry point drivers should use; it is what keeps the
/// phase ordering total. The visual-only height animation
/// ([`crate::PlayerCharacter::update_body`]) is deliberately not part of the
/// tick: callers run it whenever their render loop likes, any time after the
/// tick settles.
pub fn step<M, C, P>(motor: &mut M, combat: &mut C, controller: &mut P, dt: f32)
where
    M: Motor,
    C: CombatContext,
    P: CharacterController,
{
    let dt = dt.max(0.0);

    controller.before_update(motor, dt);

    let mut rotation = motor.transient_rotation();
    controller.update_rotation(&mut rotation, motor, dt);

    let mut velocity = motor.velocity();
    controller.update_velocity(&mut velocity, motor, combat, dt);

    motor.integrate(velocity, rotation, dt);

    controller.after_update(motor, dt);
    controller.post_grounding_update(motor, dt);
}
