/*!
Tunable constants for the character controller.

Everything that shapes how the character feels lives in one immutable
[`CharacterConfig`] passed at construction, instead of being scattered across
mutable fields. The defaults are tuned for a fast, slide-heavy movement feel.
*/

/// Immutable tuning for a [`crate::PlayerCharacter`].
///
/// Units: meters, seconds, meters per second. Gravity values are signed
/// accelerations along the character's up axis (negative = downward).
#[derive(Clone, Copy, Debug)]
pub struct CharacterConfig {
    /// Top speed while standing (m/s).
    pub walk_speed: f32,
    /// Top speed while crouched (m/s).
    pub crouch_speed: f32,
    /// Exponential response rate toward the walk target velocity (1/s).
    pub walk_response: f32,
    /// Exponential response rate toward the crouch target velocity (1/s).
    pub crouch_response: f32,

    /// Planar speed cap enforced by air steering (m/s).
    pub air_speed: f32,
    /// Planar acceleration available while airborne (m/s^2).
    pub air_acceleration: f32,

    /// Minimum vertical speed granted by a jump (m/s).
    pub jump_speed: f32,
    /// Gravity multiplier applied while rising with the jump held, in [0, 1].
    pub jump_sustain_gravity: f32,
    /// Gravity along the up axis (m/s^2, negative).
    pub gravity: f32,
    /// Grace window after leaving the ground during which a jump is still
    /// honored, and the lifetime of a buffered jump request (seconds).
    pub coyote_time: f32,

    /// Speed granted when deliberately entering a slide (m/s).
    pub slide_start_speed: f32,
    /// Below this speed a slide collapses into a crouch (m/s).
    pub slide_end_speed: f32,
    /// Slide friction coefficient (1/s); applied as `v -= v * friction * dt`.
    pub slide_friction: f32,
    /// How quickly slide steering blends toward the input direction (1/s).
    pub slide_steer_acceleration: f32,
    /// Gravity along the slope tangent while sliding (m/s^2, negative).
    pub slide_gravity: f32,

    /// Capsule radius (meters). The radius never changes with stance.
    pub capsule_radius: f32,
    /// Capsule height while standing (meters).
    pub stand_height: f32,
    /// Capsule height while crouched or sliding (meters).
    pub crouch_height: f32,
    /// Exponential response rate of the visual height animation (1/s).
    pub crouch_height_response: f32,
    /// Camera anchor height while standing, as a fraction of capsule height.
    pub stand_camera_anchor: f32,
    /// Camera anchor height while crouched, as a fraction of capsule height.
    pub crouch_camera_anchor: f32,

    /// Maximum reach of the attack ray (meters).
    pub attack_distance: f32,
    /// Hits closer than this knock the character back (meters).
    pub attack_knockback_radius: f32,
    /// Impulse magnitude applied away from the hit point (m/s).
    pub attack_knockback_power: f32,
    /// Minimum time between attacks (seconds).
    pub attack_interval: f32,
    /// Damage delivered to a damageable target on a hit.
    pub attack_damage: f32,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            walk_speed: 20.0,
            crouch_speed: 7.0,
            walk_response: 25.0,
            crouch_response: 20.0,

            air_speed: 15.0,
            air_acceleration: 70.0,

            jump_speed: 20.0,
            jump_sustain_gravity: 0.4,
            gravity: -90.0,
            coyote_time: 0.2,

            slide_start_speed: 25.0,
            slide_end_speed: 15.0,
            slide_friction: 0.8,
            slide_steer_acceleration: 5.0,
            slide_gravity: -90.0,

            capsule_radius: 0.5,
            stand_height: 2.0,
            crouch_height: 1.0,
            crouch_height_response: 15.0,
            stand_camera_anchor: 0.9,
            crouch_camera_anchor: 0.7,

            attack_distance: 50.0,
            attack_knockback_radius: 3.0,
            attack_knockback_power: 30.0,
            attack_interval: 0.5,
            attack_damage: 25.0,
        }
    }
}
