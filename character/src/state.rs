/*!
Character kinematic state and stance transitions.

The stance machine is an explicit enum plus guarded transition predicates
taking the full relevant context, rather than ad hoc boolean flags. The
transitions themselves are applied by the controller inside the motor
callback phases; the predicates here are pure so they can be tested without
a motor.
*/

use crate::math::Vec3;

/// The character's locomotion mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Stance {
    #[default]
    Stand,
    Crouch,
    Slide,
}

impl Stance {
    /// Stand and Crouch share the smoothed ground-movement path; Slide does not.
    #[inline]
    pub fn uses_ground_smoothing(self) -> bool {
        matches!(self, Stance::Stand | Stance::Crouch)
    }
}

/// The character's kinematic status, owned by the controller and exposed
/// read-only to collaborators (camera, animation).
///
/// `acceleration` is derived each tick from the grounded velocity update and
/// exists only to drive camera-lean cosmetics; it plays no role in the
/// integration itself.
#[derive(Clone, Copy, Debug)]
pub struct CharacterState {
    pub grounded: bool,
    pub stance: Stance,
    pub velocity: Vec3,
    pub acceleration: Vec3,
}

impl Default for CharacterState {
    fn default() -> Self {
        Self {
            grounded: false,
            stance: Stance::Stand,
            velocity: Vec3::zeros(),
            acceleration: Vec3::zeros(),
        }
    }
}

/// Should a grounded, crouched character drop into a slide this tick?
///
/// This is a one-tick edge trigger, not a held condition: the character must
/// be moving and crouched now, and must have been either standing or airborne
/// on the previous tick (`last` is the snapshot captured before this tick's
/// mutations).
#[inline]
pub fn slide_entry(moving: bool, stance: Stance, last: &CharacterState) -> bool {
    moving && stance == Stance::Crouch && (last.stance == Stance::Stand || !last.grounded)
}
