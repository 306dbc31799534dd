/*!
Per-tick input snapshot.

An external input source produces exactly one [`CharacterInput`] per
simulation tick. Edge-triggered fields (`jump`) must be true only on the tick
of the initiating event; level-triggered fields (`jump_sustain`, `attack`)
stay true for the duration of the hold. The snapshot is a plain value type;
all latching and stickiness is handled by the controller when the snapshot is
consumed.
*/

use crate::math::{Quat, Vec2};

/// How the crouch key is delivered.
///
/// `Toggle` flips the controller's crouch request on the press tick;
/// `None` leaves it as-is. Hold-to-crouch can be layered on by the input
/// source emitting toggles on press and release.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CrouchInput {
    #[default]
    None,
    Toggle,
}

/// Immutable per-tick input record.
#[derive(Clone, Copy, Debug)]
pub struct CharacterInput {
    /// Requested view orientation. Only the projection of its forward axis
    /// onto the character's up plane affects facing.
    pub rotation: Quat,
    /// Planar move request: x = strafe (right positive), y = forward.
    /// Each component is in [-1, 1] before clamping; the controller clamps
    /// the combined magnitude to 1.
    pub movement: Vec2,
    /// Edge-triggered jump press.
    pub jump: bool,
    /// True while the jump key is held; reduces gravity on the rising arc.
    pub jump_sustain: bool,
    /// Crouch request mode for this tick.
    pub crouch: CrouchInput,
    /// True while the attack key is held.
    pub attack: bool,
}

impl Default for CharacterInput {
    fn default() -> Self {
        Self {
            rotation: Quat::identity(),
            movement: Vec2::zeros(),
            jump: false,
            jump_sustain: false,
            crouch: CrouchInput::None,
            attack: false,
        }
    }
}

impl CharacterInput {
    /// Convenience for tests and scripted drivers: a forward-only move.
    #[inline]
    pub fn forward() -> Self {
        Self {
            movement: Vec2::new(0.0, 1.0),
            ..Self::default()
        }
    }
}
