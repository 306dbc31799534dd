/*!
First-person character controller: the per-tick velocity and stance
integrator.

[`PlayerCharacter`] consumes one [`CharacterInput`] snapshot per tick and
implements the five-phase [`CharacterController`] contract an external motor
drives (see [`crate::motor::step`]). It owns the character's kinematic state
(grounding, stance, velocity), all latched input requests, and the purely
visual crouch-height rig. The collision capsule itself belongs to the motor;
this controller only tells it when to resize, when to unground, and what
velocity to integrate.
*/

use nalgebra as na;

use crate::combat::CombatContext;
use crate::config::CharacterConfig;
use crate::input::{CharacterInput, CrouchInput};
use crate::math::{self, Quat, Vec3};
use crate::motor::{CharacterController, Motor};
use crate::settings::{DIST_EPS, OVERLAP_CAPACITY};
use crate::state::{self, CharacterState, Stance};

pub struct PlayerCharacter {
    config: CharacterConfig,

    state: CharacterState,
    /// Snapshot taken at the start of each tick, before any mutation.
    /// Slide initiation needs the velocity the character had the instant
    /// before landing.
    last_state: CharacterState,

    requested_rotation: Quat,
    /// World-space movement request, magnitude <= 1, rotated into facing space.
    requested_movement: Vec3,
    /// Sticky until consumed or the buffering window elapses.
    requested_jump: bool,
    requested_sustained_jump: bool,
    /// Toggled by crouch input; provisional uncrouching may re-latch it.
    requested_crouch: bool,
    /// True only if the latest crouch press happened while airborne; gates
    /// the slide-on-landing speed boost.
    requested_crouch_in_air: bool,
    /// Sticky until the attack cooldown lets it fire.
    requested_attack: bool,

    time_since_ungrounded: f32,
    time_since_jump_request: f32,
    /// Set when a jump consumes the grounding; cleared on re-grounding.
    /// Prevents a second coyote jump off the same takeoff.
    ungrounded_due_to_jump: bool,
    time_since_last_attack: f32,

    view_origin: Vec3,
    view_forward: Vec3,

    /// Visual rig: lags behind the instantly resized collision capsule.
    camera_anchor: Vec3,
    root_scale: Vec3,

    /// Fixed-capacity result buffer for the uncrouch overlap test.
    overlap_results: [usize; OVERLAP_CAPACITY],
}

impl PlayerCharacter {
    pub fn new(config: CharacterConfig) -> Self {
        let state = CharacterState::default();
        Self {
            config,
            state,
            last_state: state,
            requested_rotation: Quat::identity(),
            requested_movement: Vec3::zeros(),
            requested_jump: false,
            requested_sustained_jump: false,
            requested_crouch: false,
            requested_crouch_in_air: false,
            requested_attack: false,
            time_since_ungrounded: 0.0,
            time_since_jump_request: 0.0,
            ungrounded_due_to_jump: false,
            // Start with the cooldown elapsed so the first attack is not
            // swallowed by a timer that never had a chance to accrue.
            time_since_last_attack: config.attack_interval,
            view_origin: Vec3::zeros(),
            view_forward: -Vec3::z(),
            camera_anchor: Vec3::new(
                0.0,
                config.stand_height * config.stand_camera_anchor,
                0.0,
            ),
            root_scale: Vec3::new(1.0, 1.0, 1.0),
            overlap_results: [0; OVERLAP_CAPACITY],
        }
    }

    /// Binds the controller to a motor: resets state and sets the standing
    /// capsule. Call once when the character becomes controllable.
    pub fn initialize(&mut self, motor: &mut dyn Motor) {
        self.state = CharacterState::default();
        self.last_state = self.state;
        motor.set_capsule_dimensions(
            self.config.capsule_radius,
            self.config.stand_height,
            self.config.stand_height * 0.5,
        );
    }

    /// Consumes the per-tick input snapshot, latching edge-triggered
    /// requests until the integrator resolves them.
    pub fn update_input(&mut self, input: &CharacterInput) {
        self.requested_rotation = input.rotation;

        // Lift the 2D request onto the local movement plane (forward = -Z),
        // clamp, then orient it relative to the requested facing.
        let movement = math::clamp_magnitude(
            Vec3::new(input.movement.x, 0.0, -input.movement.y),
            1.0,
        );
        self.requested_movement = input.rotation * movement;

        let was_requesting_jump = self.requested_jump;
        self.requested_jump |= input.jump;
        if self.requested_jump && !was_requesting_jump {
            self.time_since_jump_request = 0.0;
        }
        self.requested_sustained_jump = input.jump_sustain;

        let was_requesting_crouch = self.requested_crouch;
        self.requested_crouch = match input.crouch {
            CrouchInput::Toggle => !self.requested_crouch,
            CrouchInput::None => self.requested_crouch,
        };
        if self.requested_crouch && !was_requesting_crouch {
            self.requested_crouch_in_air = !self.state.grounded;
        } else if !self.requested_crouch && was_requesting_crouch {
            self.requested_crouch_in_air = false;
        }

        self.requested_attack |= input.attack;
    }

    /// The view ray used by the attack step, typically the camera origin and
    /// forward. Set by the camera glue each tick.
    pub fn set_view_ray(&mut self, origin: Vec3, forward: Vec3) {
        self.view_origin = origin;
        self.view_forward = forward;
    }

    /// Visual crouch-height animation: smooths the render root's vertical
    /// scale and the camera anchor toward targets derived from the current
    /// capsule height. Purely cosmetic; never touches the collision capsule,
    /// which the stance machine resizes instantly.
    pub fn update_body(&mut self, motor: &dyn Motor, dt: f32) {
        let current_height = motor.capsule().height;
        let normalized_height = current_height / self.config.stand_height;
        let camera_height = current_height
            * match self.state.stance {
                Stance::Stand => self.config.stand_camera_anchor,
                Stance::Crouch | Stance::Slide => self.config.crouch_camera_anchor,
            };

        let t = math::smooth_factor(self.config.crouch_height_response, dt);
        self.camera_anchor = self
            .camera_anchor
            .lerp(&Vec3::new(0.0, camera_height, 0.0), t);
        self.root_scale = self
            .root_scale
            .lerp(&Vec3::new(1.0, normalized_height, 1.0), t);
    }

    /// Teleports the character, optionally zeroing its velocity.
    pub fn teleport(&mut self, motor: &mut dyn Motor, position: Vec3, kill_velocity: bool) {
        motor.set_position(position);
        if kill_velocity {
            motor.set_base_velocity(Vec3::zeros());
            self.state.velocity = Vec3::zeros();
        }
    }

    #[inline]
    pub fn config(&self) -> &CharacterConfig {
        &self.config
    }

    #[inline]
    pub fn state(&self) -> &CharacterState {
        &self.state
    }

    #[inline]
    pub fn last_state(&self) -> &CharacterState {
        &self.last_state
    }

    /// Camera anchor position, local to the character base.
    #[inline]
    pub fn camera_anchor(&self) -> Vec3 {
        self.camera_anchor
    }

    /// Render root scale; only the vertical component animates.
    #[inline]
    pub fn root_scale(&self) -> Vec3 {
        self.root_scale
    }

    fn shrink_capsule(&self, motor: &mut dyn Motor) {
        motor.set_capsule_dimensions(
            motor.capsule().radius,
            self.config.crouch_height,
            self.config.crouch_height * 0.5,
        );
    }

    fn integrate_grounded(&mut self, velocity: &mut Vec3, motor: &mut dyn Motor, dt: f32) {
        self.time_since_ungrounded = 0.0;
        self.ungrounded_due_to_jump = false;

        let grounding = motor.grounding();

        // Keep the request glued to the slope, preserving its magnitude.
        let grounded_movement = motor
            .tangent_to_surface(self.requested_movement, grounding.normal)
            * self.requested_movement.norm();

        // Slide initiation: a one-tick edge, judged against the snapshot
        // taken before this tick's mutations.
        let moving = grounded_movement.norm_squared() > 0.0;
        if state::slide_entry(moving, self.state.stance, &self.last_state) {
            self.state.stance = Stance::Slide;

            if !self.last_state.grounded {
                // The motor's own landing projection only zeroes the normal
                // component; tangential speed lost on impact is reinstated
                // from the pre-landing velocity.
                *velocity = math::project_on_plane(self.last_state.velocity, grounding.normal);
            }

            // A fall into a slide without a deliberate air-crouch gets no
            // speed boost.
            let effective_start_speed =
                if !self.last_state.grounded && !self.requested_crouch_in_air {
                    0.0
                } else {
                    self.config.slide_start_speed
                };
            self.requested_crouch_in_air = false;

            let slide_speed = effective_start_speed.max(velocity.norm());
            *velocity = motor.tangent_to_surface(*velocity, grounding.normal) * slide_speed;
        }

        if self.state.stance.uses_ground_smoothing() {
            let (speed, response) = match self.state.stance {
                Stance::Stand => (self.config.walk_speed, self.config.walk_response),
                _ => (self.config.crouch_speed, self.config.crouch_response),
            };

            let target_velocity = grounded_movement * speed;
            let smoothed = velocity.lerp(&target_velocity, math::smooth_factor(response, dt));
            self.state.acceleration = if dt > 0.0 {
                (smoothed - *velocity) / dt
            } else {
                Vec3::zeros()
            };
            *velocity = smoothed;
        } else {
            // Slide: friction decay.
            *velocity -= *velocity * (self.config.slide_friction * dt);

            // Slope gravity: the component of gravity along the ground
            // tangent speeds up downhill slides and brakes uphill ones.
            let up = motor.character_up();
            let slope = math::project_on_plane(-up, grounding.normal);
            *velocity -= slope * (self.config.slide_gravity * dt);

            // Steering may redirect the slide but never add energy: blend
            // toward the input direction at the current speed, then clamp
            // back to the pre-steer speed.
            let current_speed = velocity.norm();
            let target_velocity = grounded_movement * current_speed;
            let steer_force = (target_velocity - *velocity) * (self.config.slide_steer_acceleration * dt);
            let steered = math::clamp_magnitude(*velocity + steer_force, current_speed);
            self.state.acceleration = if dt > 0.0 {
                (steered - *velocity) / dt
            } else {
                Vec3::zeros()
            };
            *velocity = steered;

            if velocity.norm() < self.config.slide_end_speed {
                self.state.stance = Stance::Crouch;
            }
        }
    }

    fn integrate_airborne(&mut self, velocity: &mut Vec3, motor: &dyn Motor, dt: f32) {
        self.time_since_ungrounded += dt;
        self.state.acceleration = Vec3::zeros();

        let up = motor.character_up();

        if self.requested_movement.norm_squared() > 0.0 {
            // Direction on the plane orthogonal to up, at the requested
            // magnitude (the request may carry pitch from the view rotation).
            let planar_direction = math::project_on_plane(self.requested_movement, up)
                .try_normalize(DIST_EPS)
                .unwrap_or_else(Vec3::zeros);
            let planar_movement = planar_direction * self.requested_movement.norm();

            let current_planar = math::project_on_plane(*velocity, up);
            let mut movement_force = planar_movement * (self.config.air_acceleration * dt);

            if current_planar.norm() < self.config.air_speed {
                // Below the cap: steer and clamp to the cap.
                let target_planar = math::clamp_magnitude(
                    current_planar + movement_force,
                    self.config.air_speed,
                );
                movement_force = target_planar - current_planar;
            } else if movement_force.dot(&current_planar) > 0.0 {
                // At or above the cap: redirect without adding speed.
                movement_force = math::project_on_plane(movement_force, current_planar);
            }

            // Air control must not climb steep, unstable slopes: when any
            // ground is reported and the net motion pushes into it, constrain
            // the force to the obstruction plane.
            let grounding = motor.grounding();
            if grounding.found_any_ground
                && movement_force.dot(&(*velocity + movement_force)) > 0.0
            {
                let obstruction = up.cross(&up.cross(&grounding.normal));
                if let Some(obstruction) = na::Unit::try_new(obstruction, DIST_EPS) {
                    movement_force =
                        math::project_on_plane(movement_force, obstruction.into_inner());
                }
            }

            *velocity += movement_force;
        }

        // Gravity, eased while rising with the jump held.
        let vertical_speed = velocity.dot(&up);
        let mut effective_gravity = self.config.gravity;
        if self.requested_sustained_jump && vertical_speed > 0.0 {
            effective_gravity *= self.config.jump_sustain_gravity;
        }
        *velocity += up * (effective_gravity * dt);
    }

    fn resolve_jump(&mut self, velocity: &mut Vec3, motor: &mut dyn Motor, dt: f32) {
        if !self.requested_jump {
            return;
        }

        let grounded = motor.grounding().stable_on_ground;
        let can_coyote_jump =
            self.time_since_ungrounded < self.config.coyote_time && !self.ungrounded_due_to_jump;

        if grounded || can_coyote_jump {
            self.requested_jump = false;
            self.requested_crouch = false;
            self.requested_crouch_in_air = false;

            motor.force_unground(0.0);
            self.ungrounded_due_to_jump = true;

            // Raise the vertical component to at least jump speed; never
            // reduce an already-higher vertical speed (e.g. from a bounce).
            let up = motor.character_up();
            let current_vertical_speed = velocity.dot(&up);
            let target_vertical_speed = current_vertical_speed.max(self.config.jump_speed);
            *velocity += up * (target_vertical_speed - current_vertical_speed);
        } else {
            // Not eligible: keep the request alive briefly so a jump pressed
            // just before landing still fires (jump buffering).
            self.time_since_jump_request += dt;
            self.requested_jump = self.time_since_jump_request < self.config.coyote_time;
        }
    }

    fn resolve_attack(
        &mut self,
        velocity: &mut Vec3,
        motor: &mut dyn Motor,
        combat: &mut dyn CombatContext,
        dt: f32,
    ) {
        self.time_since_last_attack += dt;
        if !self.requested_attack || self.time_since_last_attack < self.config.attack_interval {
            return;
        }

        // The request and cooldown reset whether or not anything was hit.
        self.requested_attack = false;
        self.time_since_last_attack = 0.0;

        let Some(hit) =
            combat.cast_view_ray(self.view_origin, self.view_forward, self.config.attack_distance)
        else {
            return;
        };

        if let Some(target) = hit.target {
            combat.apply_damage(target, self.config.attack_damage);
        }

        if hit.distance <= self.config.attack_knockback_radius {
            if let Some(recoil) = (self.view_origin - hit.point).try_normalize(DIST_EPS) {
                motor.force_unground(0.0);
                *velocity += recoil * self.config.attack_knockback_power;
            }
        }
    }
}

impl CharacterController for PlayerCharacter {
    fn before_update(&mut self, motor: &mut dyn Motor, _dt: f32) {
        self.last_state = self.state;

        // Stand -> Crouch is immediate; the collision capsule shrinks
        // atomically with the stance change.
        if self.requested_crouch && self.state.stance == Stance::Stand {
            self.state.stance = Stance::Crouch;
            self.shrink_capsule(motor);
        }
    }

    fn update_rotation(&mut self, current: &mut Quat, motor: &dyn Motor, _dt: f32) {
        // Yaw only: project the requested forward onto the up plane. Looking
        // straight up or down projects to zero; keep the previous facing
        // rather than produce an undefined orientation.
        let up = motor.character_up();
        let forward = self.requested_rotation * -Vec3::z();
        let Some(planar_forward) = math::project_on_plane(forward, up).try_normalize(DIST_EPS)
        else {
            return;
        };
        *current = Quat::face_towards(&-planar_forward, &up);
    }

    fn update_velocity(
        &mut self,
        current: &mut Vec3,
        motor: &mut dyn Motor,
        combat: &mut dyn CombatContext,
        dt: f32,
    ) {
        if motor.grounding().stable_on_ground {
            self.integrate_grounded(current, motor, dt);
        } else {
            self.integrate_airborne(current, motor, dt);
        }

        self.resolve_jump(current, motor, dt);
        self.resolve_attack(current, motor, combat, dt);
    }

    fn after_update(&mut self, motor: &mut dyn Motor, _dt: f32) {
        // Uncrouching is provisional: grow the capsule, test the new volume,
        // and revert within the same tick if something blocks it.
        if !self.requested_crouch && self.state.stance != Stance::Stand {
            let radius = motor.capsule().radius;
            motor.set_capsule_dimensions(
                radius,
                self.config.stand_height,
                self.config.stand_height * 0.5,
            );

            let position = motor.transient_position();
            let rotation = motor.transient_rotation();
            let mask = motor.collidable_layers();
            let overlaps =
                motor.overlap_test(position, rotation, mask, &mut self.overlap_results);
            if overlaps > 0 {
                log::debug!("uncrouch blocked by {overlaps} overlap(s); staying crouched");
                self.requested_crouch = true;
                self.shrink_capsule(motor);
            } else {
                self.state.stance = Stance::Stand;
            }
        }

        self.state.grounded = motor.grounding().stable_on_ground;
        self.state.velocity = motor.velocity();
    }

    fn post_grounding_update(&mut self, motor: &mut dyn Motor, _dt: f32) {
        // A slide cannot continue in the air.
        if self.state.stance == Stance::Slide && !motor.grounding().stable_on_ground {
            self.state.stance = Stance::Crouch;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::{NullCombat, RayHit, TargetId};
    use crate::input::CrouchInput;
    use crate::math::Vec2;
    use crate::motor::{CapsuleDims, CollisionMask, GroundingReport, step};

    const DT: f32 = 1.0 / 60.0;
    const EPS: f32 = 1.0e-4;

    /// Scripted motor: grounding is set by the test, integration is a bare
    /// position update. Counts unground/resize calls so tests can observe
    /// controller decisions without collision geometry.
    struct ScriptedMotor {
        grounding: GroundingReport,
        capsule: CapsuleDims,
        position: Vec3,
        rotation: Quat,
        velocity: Vec3,
        overlap_count: usize,
        unground_requests: u32,
        resize_calls: u32,
    }

    impl ScriptedMotor {
        fn grounded() -> Self {
            Self {
                grounding: GroundingReport {
                    stable_on_ground: true,
                    found_any_ground: true,
                    normal: Vec3::y(),
                },
                capsule: CapsuleDims {
                    radius: 0.5,
                    height: 2.0,
                },
                position: Vec3::zeros(),
                rotation: Quat::identity(),
                velocity: Vec3::zeros(),
                overlap_count: 0,
                unground_requests: 0,
                resize_calls: 0,
            }
        }

        fn airborne() -> Self {
            let mut motor = Self::grounded();
            motor.grounding.stable_on_ground = false;
            motor.grounding.found_any_ground = false;
            motor
        }

        fn set_stable(&mut self, stable: bool) {
            self.grounding.stable_on_ground = stable;
            self.grounding.found_any_ground = stable;
        }
    }

    impl Motor for ScriptedMotor {
        fn grounding(&self) -> GroundingReport {
            self.grounding
        }
        fn capsule(&self) -> CapsuleDims {
            self.capsule
        }
        fn transient_position(&self) -> Vec3 {
            self.position
        }
        fn transient_rotation(&self) -> Quat {
            self.rotation
        }
        fn velocity(&self) -> Vec3 {
            self.velocity
        }
        fn character_up(&self) -> Vec3 {
            Vec3::y()
        }
        fn set_capsule_dimensions(&mut self, radius: f32, height: f32, _vertical_offset: f32) {
            self.capsule = CapsuleDims { radius, height };
            self.resize_calls += 1;
        }
        fn force_unground(&mut self, _time: f32) {
            self.unground_requests += 1;
        }
        fn overlap_test(
            &mut self,
            _position: Vec3,
            _rotation: Quat,
            _mask: CollisionMask,
            hits: &mut [usize],
        ) -> usize {
            let written = self.overlap_count.min(hits.len());
            for (i, slot) in hits.iter_mut().take(written).enumerate() {
                *slot = i;
            }
            written
        }
        fn set_position(&mut self, position: Vec3) {
            self.position = position;
        }
        fn set_base_velocity(&mut self, velocity: Vec3) {
            self.velocity = velocity;
        }
        fn integrate(&mut self, velocity: Vec3, rotation: Quat, dt: f32) {
            self.velocity = velocity;
            self.rotation = rotation;
            self.position += velocity * dt;
        }
    }

    struct FakeCombat {
        hit: Option<RayHit>,
        casts: u32,
        damage: Vec<(TargetId, f32)>,
    }

    impl FakeCombat {
        fn new(hit: Option<RayHit>) -> Self {
            Self {
                hit,
                casts: 0,
                damage: Vec::new(),
            }
        }
    }

    impl CombatContext for FakeCombat {
        fn cast_view_ray(&mut self, _origin: Vec3, _forward: Vec3, _max: f32) -> Option<RayHit> {
            self.casts += 1;
            self.hit
        }
        fn apply_damage(&mut self, target: TargetId, amount: f32) {
            self.damage.push((target, amount));
        }
    }

    fn character(motor: &mut ScriptedMotor) -> PlayerCharacter {
        let mut ch = PlayerCharacter::new(CharacterConfig::default());
        ch.initialize(motor);
        ch
    }

    fn tick(ch: &mut PlayerCharacter, motor: &mut ScriptedMotor, input: CharacterInput) {
        ch.update_input(&input);
        step(motor, &mut NullCombat, ch, DT);
    }

    fn crouch_toggle() -> CharacterInput {
        CharacterInput {
            crouch: CrouchInput::Toggle,
            ..CharacterInput::default()
        }
    }

    #[test]
    fn walking_converges_monotonically_to_walk_speed() {
        let mut motor = ScriptedMotor::grounded();
        let mut ch = character(&mut motor);
        let walk_speed = ch.config().walk_speed;

        let mut previous_speed = 0.0;
        for _ in 0..60 {
            tick(&mut ch, &mut motor, CharacterInput::forward());
            let speed = motor.velocity.norm();
            assert!(speed >= previous_speed - EPS, "speed regressed");
            assert!(speed <= walk_speed + EPS, "overshot walk speed");
            previous_speed = speed;
        }
        assert!(previous_speed >= 0.95 * walk_speed);

        // Forward input with identity rotation moves along -Z.
        assert!(motor.velocity.z < 0.0);
        assert!(motor.velocity.x.abs() < EPS);
    }

    #[test]
    fn walk_speed_is_nearly_reached_well_before_a_second() {
        let mut motor = ScriptedMotor::grounded();
        let mut ch = character(&mut motor);

        // Time constant is 1/25 s; 95% convergence takes ~0.12 s.
        for _ in 0..10 {
            tick(&mut ch, &mut motor, CharacterInput::forward());
        }
        assert!(motor.velocity.norm() >= 0.95 * ch.config().walk_speed);
    }

    #[test]
    fn acceleration_is_recorded_and_decays_at_steady_state() {
        let mut motor = ScriptedMotor::grounded();
        let mut ch = character(&mut motor);

        tick(&mut ch, &mut motor, CharacterInput::forward());
        assert!(ch.state().acceleration.norm() > 1.0);

        for _ in 0..120 {
            tick(&mut ch, &mut motor, CharacterInput::forward());
        }
        assert!(ch.state().acceleration.norm() < 0.5);
    }

    #[test]
    fn crouch_shrinks_capsule_immediately_and_slide_starts_from_standing_run() {
        let mut motor = ScriptedMotor::grounded();
        let mut ch = character(&mut motor);
        let cfg = *ch.config();

        // Build up running speed.
        for _ in 0..30 {
            tick(&mut ch, &mut motor, CharacterInput::forward());
        }

        // Crouch while moving: capsule shrinks this tick, and the stance
        // machine drops straight into a slide at the boosted start speed.
        let mut input = CharacterInput::forward();
        input.crouch = CrouchInput::Toggle;
        tick(&mut ch, &mut motor, input);

        assert_eq!(ch.state().stance, Stance::Slide);
        assert!((motor.capsule.height - cfg.crouch_height).abs() < EPS);
        // One tick of slide friction already applied to the 25 m/s boost.
        assert!((motor.velocity.norm() - cfg.slide_start_speed).abs() < 0.5);
    }

    #[test]
    fn slide_decays_strictly_and_ends_exactly_below_end_speed() {
        let mut motor = ScriptedMotor::grounded();
        let mut ch = character(&mut motor);
        let cfg = *ch.config();

        for _ in 0..30 {
            tick(&mut ch, &mut motor, CharacterInput::forward());
        }
        let mut input = CharacterInput::forward();
        input.crouch = CrouchInput::Toggle;
        tick(&mut ch, &mut motor, input);
        assert_eq!(ch.state().stance, Stance::Slide);

        // Coast with no input: friction and zero-target steering decay the
        // slide until it collapses into a crouch.
        let mut previous_speed = motor.velocity.norm();
        let mut ended = false;
        for _ in 0..120 {
            tick(&mut ch, &mut motor, CharacterInput::default());
            let speed = motor.velocity.norm();
            assert!(speed < previous_speed, "slide speed must strictly decrease");

            if ch.state().stance != Stance::Slide {
                // The flip happens exactly on the tick speed first drops
                // below the end threshold.
                assert_eq!(ch.state().stance, Stance::Crouch);
                assert!(speed < cfg.slide_end_speed);
                assert!(previous_speed >= cfg.slide_end_speed);
                ended = true;
                break;
            }
            assert!(speed >= cfg.slide_end_speed);
            previous_speed = speed;
        }
        assert!(ended, "slide never ended");
    }

    #[test]
    fn landing_slide_reinstates_tangential_momentum_from_last_state() {
        let mut motor = ScriptedMotor::airborne();
        let mut ch = character(&mut motor);

        // Falling fast and forward; crouch is pressed mid-air.
        motor.velocity = Vec3::new(0.0, -30.0, -28.0);
        let mut input = CharacterInput::forward();
        input.crouch = CrouchInput::Toggle;
        tick(&mut ch, &mut motor, input);
        assert!(!ch.state().grounded);

        // Touch down. Pretend the solver's own landing projection discarded
        // most of the tangential speed; the controller must reinstate it
        // from the pre-landing snapshot.
        motor.set_stable(true);
        motor.velocity = Vec3::new(0.0, 0.0, -5.0);
        tick(&mut ch, &mut motor, CharacterInput::forward());

        assert_eq!(ch.state().stance, Stance::Slide);
        let speed = motor.velocity.norm();
        // Pre-landing planar speed was 28, above the 25 m/s configured
        // boost, so momentum wins.
        assert!(speed > 27.0, "slide speed {speed} lost landing momentum");
        assert!(motor.velocity.z < 0.0);
        assert!(motor.velocity.y.abs() < 0.5);
    }

    #[test]
    fn accidental_fall_into_slide_gets_no_speed_boost() {
        let mut motor = ScriptedMotor::grounded();
        let mut ch = character(&mut motor);
        let cfg = *ch.config();

        // Crouch deliberately while grounded and stationary.
        tick(&mut ch, &mut motor, crouch_toggle());
        assert_eq!(ch.state().stance, Stance::Crouch);

        // Walk off a ledge while crouched...
        motor.set_stable(false);
        motor.velocity = Vec3::new(0.0, -10.0, -3.0);
        tick(&mut ch, &mut motor, CharacterInput::forward());
        assert!(!ch.state().grounded);

        // ...and land still moving. The crouch was not an air-crouch, so the
        // slide entry gets no boost and immediately collapses.
        motor.set_stable(true);
        motor.velocity = Vec3::new(0.0, 0.0, -3.0);
        tick(&mut ch, &mut motor, CharacterInput::forward());

        assert_eq!(ch.state().stance, Stance::Crouch);
        assert!(motor.velocity.norm() < cfg.slide_start_speed * 0.5);
    }

    #[test]
    fn coyote_jump_is_honored_inside_the_window() {
        let mut motor = ScriptedMotor::grounded();
        let mut ch = character(&mut motor);

        tick(&mut ch, &mut motor, CharacterInput::default());

        // Walk off the ledge; 6 ticks is 0.1 s, inside the 0.2 s window.
        motor.set_stable(false);
        for _ in 0..6 {
            tick(&mut ch, &mut motor, CharacterInput::default());
        }

        let mut input = CharacterInput::default();
        input.jump = true;
        tick(&mut ch, &mut motor, input);

        assert_eq!(motor.unground_requests, 1);
        assert!((motor.velocity.y - ch.config().jump_speed).abs() < EPS);
    }

    #[test]
    fn coyote_jump_expires_outside_the_window() {
        let mut motor = ScriptedMotor::grounded();
        let mut ch = character(&mut motor);

        tick(&mut ch, &mut motor, CharacterInput::default());

        // 14 ticks is ~0.23 s, past the window.
        motor.set_stable(false);
        for _ in 0..14 {
            tick(&mut ch, &mut motor, CharacterInput::default());
        }

        let mut input = CharacterInput::default();
        input.jump = true;
        tick(&mut ch, &mut motor, input);

        assert_eq!(motor.unground_requests, 0);
        assert!(motor.velocity.y < 0.0);
    }

    #[test]
    fn buffered_jump_fires_on_the_first_grounded_tick() {
        let mut motor = ScriptedMotor::airborne();
        let mut ch = character(&mut motor);

        // Long airborne stretch, then a jump press while falling.
        for _ in 0..30 {
            tick(&mut ch, &mut motor, CharacterInput::default());
        }
        let mut input = CharacterInput::default();
        input.jump = true;
        tick(&mut ch, &mut motor, input);
        assert_eq!(motor.unground_requests, 0, "jump must not fire mid-air");

        // Land 3 ticks later, well inside the buffering window.
        for _ in 0..3 {
            tick(&mut ch, &mut motor, CharacterInput::default());
        }
        motor.set_stable(true);
        motor.velocity = Vec3::zeros();
        tick(&mut ch, &mut motor, CharacterInput::default());

        assert_eq!(motor.unground_requests, 1);
        assert!((motor.velocity.y - ch.config().jump_speed).abs() < EPS);
    }

    #[test]
    fn buffered_jump_is_dropped_after_the_window() {
        let mut motor = ScriptedMotor::airborne();
        let mut ch = character(&mut motor);

        for _ in 0..30 {
            tick(&mut ch, &mut motor, CharacterInput::default());
        }
        let mut input = CharacterInput::default();
        input.jump = true;
        tick(&mut ch, &mut motor, input);

        // Stay airborne past the buffering window before landing.
        for _ in 0..15 {
            tick(&mut ch, &mut motor, CharacterInput::default());
        }
        motor.set_stable(true);
        motor.velocity = Vec3::zeros();
        tick(&mut ch, &mut motor, CharacterInput::default());

        assert_eq!(motor.unground_requests, 0);
    }

    #[test]
    fn a_jump_cannot_coyote_jump_again() {
        let mut motor = ScriptedMotor::grounded();
        let mut ch = character(&mut motor);

        tick(&mut ch, &mut motor, CharacterInput::default());

        let mut input = CharacterInput::default();
        input.jump = true;
        tick(&mut ch, &mut motor, input);
        assert_eq!(motor.unground_requests, 1);

        // Immediately airborne due to the jump; a second press inside what
        // would be the coyote window must not fire.
        motor.set_stable(false);
        for _ in 0..3 {
            tick(&mut ch, &mut motor, CharacterInput::default());
        }
        let mut input = CharacterInput::default();
        input.jump = true;
        tick(&mut ch, &mut motor, input);
        assert_eq!(motor.unground_requests, 1);
    }

    #[test]
    fn uncrouch_is_blocked_by_overlaps_and_relatches_the_request() {
        let mut motor = ScriptedMotor::grounded();
        let mut ch = character(&mut motor);
        let cfg = *ch.config();

        tick(&mut ch, &mut motor, crouch_toggle());
        assert_eq!(ch.state().stance, Stance::Crouch);

        // Something is overhead: releasing crouch grows the capsule, finds
        // the overlap, and reverts within the same tick.
        motor.overlap_count = 1;
        tick(&mut ch, &mut motor, crouch_toggle());
        assert_eq!(ch.state().stance, Stance::Crouch);
        assert!((motor.capsule.height - cfg.crouch_height).abs() < EPS);

        // The request was re-latched: with nothing new from the player the
        // next ticks do not retry the grow-and-test dance.
        let resizes = motor.resize_calls;
        tick(&mut ch, &mut motor, CharacterInput::default());
        assert_eq!(motor.resize_calls, resizes);

        // Once clear, toggling crouch off stands up for real.
        motor.overlap_count = 0;
        tick(&mut ch, &mut motor, crouch_toggle());
        assert_eq!(ch.state().stance, Stance::Stand);
        assert!((motor.capsule.height - cfg.stand_height).abs() < EPS);
    }

    #[test]
    fn after_update_is_idempotent_without_an_intervening_tick() {
        let mut motor = ScriptedMotor::grounded();
        let mut ch = character(&mut motor);

        tick(&mut ch, &mut motor, crouch_toggle());
        tick(&mut ch, &mut motor, crouch_toggle());
        assert_eq!(ch.state().stance, Stance::Stand);

        let resizes = motor.resize_calls;
        ch.after_update(&mut motor, DT);
        assert_eq!(ch.state().stance, Stance::Stand);
        assert_eq!(motor.resize_calls, resizes);
    }

    #[test]
    fn gravity_integrates_to_expected_fall_speed() {
        let mut motor = ScriptedMotor::airborne();
        let mut ch = character(&mut motor);

        for _ in 0..30 {
            tick(&mut ch, &mut motor, CharacterInput::default());
        }

        // -90 m/s^2 for half a second.
        assert!((motor.velocity.y - (-45.0)).abs() < 1.0e-2);
        assert!((ch.state().velocity.y - (-45.0)).abs() < 1.0e-2);
    }

    #[test]
    fn jump_sustain_reduces_gravity_only_while_rising() {
        let cfg = CharacterConfig::default();

        let mut motor = ScriptedMotor::airborne();
        let mut ch = character(&mut motor);
        motor.velocity = Vec3::new(0.0, 10.0, 0.0);
        let mut input = CharacterInput::default();
        input.jump_sustain = true;
        tick(&mut ch, &mut motor, input);
        let expected = 10.0 + cfg.gravity * cfg.jump_sustain_gravity * DT;
        assert!((motor.velocity.y - expected).abs() < EPS);

        // Falling: sustain no longer matters.
        let mut motor = ScriptedMotor::airborne();
        let mut ch = character(&mut motor);
        motor.velocity = Vec3::new(0.0, -1.0, 0.0);
        let mut input = CharacterInput::default();
        input.jump_sustain = true;
        tick(&mut ch, &mut motor, input);
        let expected = -1.0 + cfg.gravity * DT;
        assert!((motor.velocity.y - expected).abs() < EPS);
    }

    #[test]
    fn air_steering_does_not_accelerate_past_air_speed() {
        let mut motor = ScriptedMotor::airborne();
        let mut ch = character(&mut motor);
        let air_speed = ch.config().air_speed;

        motor.velocity = Vec3::new(air_speed, 0.0, 0.0);
        // Strafe right pushes along +X, the current direction of travel.
        let mut input = CharacterInput::default();
        input.movement = Vec2::new(1.0, 0.0);
        for _ in 0..10 {
            tick(&mut ch, &mut motor, input);
        }

        let planar = Vec3::new(motor.velocity.x, 0.0, motor.velocity.z);
        assert!(planar.norm() <= air_speed + EPS);
    }

    #[test]
    fn air_control_cannot_climb_a_steep_slope() {
        let mut motor = ScriptedMotor::airborne();
        let mut ch = character(&mut motor);

        // Sliding along a steep (non-walkable) slope to the +X side.
        motor.grounding.found_any_ground = true;
        motor.grounding.normal = Vec3::new(-0.8, 0.6, 0.0).normalize();
        motor.velocity = Vec3::new(5.0, 0.0, 0.0);

        let mut input = CharacterInput::default();
        input.movement = Vec2::new(1.0, 0.0);
        tick(&mut ch, &mut motor, input);

        // The obstruction plane removes the into-slope component; only
        // gravity changed the velocity.
        assert!((motor.velocity.x - 5.0).abs() < EPS);
    }

    #[test]
    fn facing_follows_requested_yaw_and_ignores_pitch() {
        let mut motor = ScriptedMotor::grounded();
        let mut ch = character(&mut motor);

        // Quarter turn to the left: forward becomes -X.
        let mut input = CharacterInput::default();
        input.rotation = Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::FRAC_PI_2);
        tick(&mut ch, &mut motor, input);
        let forward = motor.rotation * -Vec3::z();
        assert!((forward - -Vec3::x()).norm() < 1.0e-3);

        // Adding pitch must not tilt the character.
        let pitched = input.rotation
            * Quat::from_axis_angle(&Vec3::x_axis(), -0.8);
        let mut input = CharacterInput::default();
        input.rotation = pitched;
        tick(&mut ch, &mut motor, input);
        let forward = motor.rotation * -Vec3::z();
        assert!(forward.y.abs() < 1.0e-3);
        assert!((Vec3::new(forward.x, 0.0, forward.z).normalize() - -Vec3::x()).norm() < 1.0e-3);
    }

    #[test]
    fn looking_straight_down_keeps_the_previous_facing() {
        let mut motor = ScriptedMotor::grounded();
        let mut ch = character(&mut motor);
        let initial = motor.rotation;

        let mut input = CharacterInput::default();
        input.rotation = Quat::from_axis_angle(&Vec3::x_axis(), -std::f32::consts::FRAC_PI_2);
        tick(&mut ch, &mut motor, input);

        assert_eq!(motor.rotation, initial);
    }

    #[test]
    fn attack_hit_applies_knockback_and_damage_then_cools_down() {
        let mut motor = ScriptedMotor::grounded();
        let mut ch = character(&mut motor);
        let cfg = *ch.config();

        ch.set_view_ray(Vec3::new(0.0, 1.0, 0.0), -Vec3::z());
        let mut combat = FakeCombat::new(Some(RayHit {
            point: Vec3::new(0.0, 1.0, -2.0),
            distance: 2.0,
            target: Some(7),
        }));

        let mut input = CharacterInput::default();
        input.attack = true;
        ch.update_input(&input);
        step(&mut motor, &mut combat, &mut ch, DT);

        assert_eq!(combat.casts, 1);
        assert_eq!(combat.damage, vec![(7, cfg.attack_damage)]);
        assert_eq!(motor.unground_requests, 1);
        // Knockback pushes from the hit point back toward the view origin.
        assert!((motor.velocity.z - cfg.attack_knockback_power).abs() < 0.5);

        // Held attack does not fire again until the cooldown elapses.
        for _ in 0..5 {
            ch.update_input(&input);
            step(&mut motor, &mut combat, &mut ch, DT);
        }
        assert_eq!(combat.casts, 1);

        for _ in 0..30 {
            ch.update_input(&input);
            step(&mut motor, &mut combat, &mut ch, DT);
        }
        assert_eq!(combat.casts, 2);
    }

    #[test]
    fn attack_beyond_knockback_radius_damages_without_impulse() {
        let mut motor = ScriptedMotor::grounded();
        let mut ch = character(&mut motor);
        let cfg = *ch.config();

        ch.set_view_ray(Vec3::new(0.0, 1.0, 0.0), -Vec3::z());
        let mut combat = FakeCombat::new(Some(RayHit {
            point: Vec3::new(0.0, 1.0, -20.0),
            distance: 20.0,
            target: Some(3),
        }));

        let mut input = CharacterInput::default();
        input.attack = true;
        ch.update_input(&input);
        step(&mut motor, &mut combat, &mut ch, DT);

        assert_eq!(combat.damage, vec![(3, cfg.attack_damage)]);
        assert_eq!(motor.unground_requests, 0);
        assert!(motor.velocity.norm() < 0.5);
    }

    #[test]
    fn attack_miss_still_restarts_the_cooldown() {
        let mut motor = ScriptedMotor::grounded();
        let mut ch = character(&mut motor);

        let mut combat = FakeCombat::new(None);
        let mut input = CharacterInput::default();
        input.attack = true;

        ch.update_input(&input);
        step(&mut motor, &mut combat, &mut ch, DT);
        assert_eq!(combat.casts, 1);
        assert!(combat.damage.is_empty());

        // Held attack stays swallowed until the interval passes.
        for _ in 0..5 {
            ch.update_input(&input);
            step(&mut motor, &mut combat, &mut ch, DT);
        }
        assert_eq!(combat.casts, 1);
    }

    #[test]
    fn crouch_height_animation_lags_behind_the_instant_capsule() {
        let mut motor = ScriptedMotor::grounded();
        let mut ch = character(&mut motor);
        let cfg = *ch.config();

        tick(&mut ch, &mut motor, crouch_toggle());
        // Collision capsule snapped immediately...
        assert!((motor.capsule.height - cfg.crouch_height).abs() < EPS);

        // ...but the visuals ease toward the target.
        ch.update_body(&motor, DT);
        let first_scale = ch.root_scale().y;
        assert!(first_scale < 1.0 && first_scale > 0.5);

        for _ in 0..120 {
            ch.update_body(&motor, DT);
        }
        let expected_scale = cfg.crouch_height / cfg.stand_height;
        let expected_anchor = cfg.crouch_height * cfg.crouch_camera_anchor;
        assert!((ch.root_scale().y - expected_scale).abs() < 1.0e-2);
        assert!((ch.camera_anchor().y - expected_anchor).abs() < 1.0e-2);
    }

    #[test]
    fn teleport_moves_the_motor_and_can_kill_velocity() {
        let mut motor = ScriptedMotor::grounded();
        let mut ch = character(&mut motor);
        motor.velocity = Vec3::new(3.0, 0.0, -4.0);

        let destination = Vec3::new(10.0, 2.0, -5.0);
        ch.teleport(&mut motor, destination, true);

        assert_eq!(motor.position, destination);
        assert_eq!(motor.velocity, Vec3::zeros());
        assert_eq!(ch.state().velocity, Vec3::zeros());
    }
}
