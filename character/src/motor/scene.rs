/*!
Reference kinematic motor backed by parry3d shape queries.

[`SceneMotor`] implements [`Motor`] over a flat list of static colliders:
swept capsule movement with slide resolution, a downward ground probe with
snap-to-hover, and capsule overlap queries for the uncrouch test. It also
implements [`CombatContext`]: statics occlude view rays, and registered
[`CombatTarget`]s can be struck and damaged. The collider list is scanned
linearly; the scenes this motor serves are small enough that broad-phase
pruning would not pay for itself.
*/

use nalgebra as na;
use parry3d::{
    query::{self, Ray, RayCast, ShapeCastOptions},
    shape as pshape,
};

use crate::combat::{CombatContext, RayHit, TargetId};
use crate::math::{Iso, Quat, Vec3};
use crate::motor::{CapsuleDims, CollisionMask, GroundingReport, Motor};
use crate::settings::{
    DEFAULT_MAX_ITERATIONS, DEFAULT_SKIN, DIST_EPS, GROUND_PROBE_DISTANCE, MAX_SLOPE_COS,
    MIN_MOVE_SQ, SNAP_HOVER_HEIGHT, SNAP_MAX_DISTANCE,
};

/// Static collision shapes supported by the scene.
///
/// - Plane: infinite solid half-space satisfying `normal . x <= dist`.
/// - Cuboid: oriented box with local half-extents, placed by center/rotation.
/// - Sphere: ball placed by its center; rotation is irrelevant.
#[derive(Clone, Copy, Debug)]
pub enum StaticShape {
    Plane {
        /// World-space normal of the plane surface.
        normal: Vec3,
        /// Offset along the normal: the surface satisfies `normal . x = dist`.
        dist: f32,
    },
    Cuboid {
        half_extents: Vec3,
        center: Vec3,
        rotation: Quat,
    },
    Sphere {
        radius: f32,
        center: Vec3,
    },
}

impl StaticShape {
    /// Resolves the variant to a parry shape and world pose without cloning
    /// into an owned trait object.
    fn with_parry<R>(&self, f: impl FnOnce(&Iso, &dyn pshape::Shape) -> R) -> R {
        match *self {
            StaticShape::Plane { normal, dist } => {
                let unit = na::Unit::new_normalize(normal);
                let offset = unit.into_inner() * dist;
                let iso = Iso::translation(offset.x, offset.y, offset.z);
                f(&iso, &pshape::HalfSpace { normal: unit })
            }
            StaticShape::Cuboid {
                half_extents,
                center,
                rotation,
            } => {
                let iso = Iso::from_parts(
                    na::Translation3::new(center.x, center.y, center.z),
                    rotation,
                );
                f(&iso, &pshape::Cuboid::new(half_extents))
            }
            StaticShape::Sphere { radius, center } => {
                let iso = Iso::translation(center.x, center.y, center.z);
                f(&iso, &pshape::Ball::new(radius))
            }
        }
    }
}

/// A static collider plus the layer bits it lives on.
#[derive(Clone, Copy, Debug)]
pub struct SceneCollider {
    pub shape: StaticShape,
    pub layer: CollisionMask,
}

impl SceneCollider {
    /// Horizontal floor plane at the given world height.
    pub fn floor(height: f32) -> Self {
        Self::plane(Vec3::y(), height)
    }

    pub fn plane(normal: Vec3, dist: f32) -> Self {
        Self {
            shape: StaticShape::Plane { normal, dist },
            layer: CollisionMask::MAX,
        }
    }

    pub fn cuboid(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            shape: StaticShape::Cuboid {
                half_extents,
                center,
                rotation: Quat::identity(),
            },
            layer: CollisionMask::MAX,
        }
    }

    pub fn sphere(center: Vec3, radius: f32) -> Self {
        Self {
            shape: StaticShape::Sphere { radius, center },
            layer: CollisionMask::MAX,
        }
    }

    pub fn with_layer(mut self, layer: CollisionMask) -> Self {
        self.layer = layer;
        self
    }
}

/// A damageable prop: a ball the view ray can strike. Targets are sensors
/// for combat queries only and never obstruct movement.
#[derive(Clone, Copy, Debug)]
pub struct CombatTarget {
    pub center: Vec3,
    pub radius: f32,
    pub health: f32,
}

impl CombatTarget {
    pub fn new(center: Vec3, radius: f32, health: f32) -> Self {
        Self {
            center,
            radius,
            health,
        }
    }
}

/// Earliest contact of a swept capsule, as a fraction of the tested
/// translation plus the world-space surface normal opposing the motion.
#[derive(Clone, Copy, Debug)]
struct SweepHit {
    normal: Vec3,
    fraction: f32,
}

fn sweep_options() -> ShapeCastOptions {
    let mut options = ShapeCastOptions::with_max_time_of_impact(1.0);
    options.stop_at_penetration = true;
    options.compute_impact_geometry_on_penetration = true;
    options
}

/// Casts the capsule along `translation` against every collider and returns
/// the earliest hit, with the normal flipped to oppose the motion.
fn earliest_sweep_hit(
    colliders: &[SceneCollider],
    capsule_iso: &Iso,
    capsule: &pshape::Capsule,
    translation: Vec3,
) -> Option<SweepHit> {
    let mut best: Option<SweepHit> = None;
    for collider in colliders {
        let hit = collider.shape.with_parry(|pose, shape| {
            query::cast_shapes(
                capsule_iso,
                &translation,
                capsule as &dyn pshape::Shape,
                pose,
                &Vec3::zeros(),
                shape,
                sweep_options(),
            )
            .ok()
            .flatten()
        });
        let Some(hit) = hit else {
            continue;
        };

        let mut normal = hit.normal1.into_inner();
        if normal.dot(&translation) > 0.0 {
            normal = -normal;
        }
        let candidate = SweepHit {
            normal,
            fraction: hit.time_of_impact,
        };
        if best.map_or(true, |b| candidate.fraction < b.fraction) {
            best = Some(candidate);
        }
    }
    best
}

/// Kinematic capsule motor over a static collider set.
///
/// `position` is the character base (feet); the collision capsule is a
/// Y-aligned parry capsule centered `vertical_offset` above it, so resizing
/// the capsule keeps the feet planted.
pub struct SceneMotor {
    colliders: Vec<SceneCollider>,
    targets: Vec<CombatTarget>,

    radius: f32,
    height: f32,
    vertical_offset: f32,

    position: Vec3,
    rotation: Quat,
    velocity: Vec3,
    grounding: GroundingReport,

    unground_requested: bool,
    unground_timer: f32,
}

impl SceneMotor {
    pub fn new(position: Vec3) -> Self {
        Self {
            colliders: Vec::new(),
            targets: Vec::new(),
            radius: 0.5,
            height: 2.0,
            vertical_offset: 1.0,
            position,
            rotation: Quat::identity(),
            velocity: Vec3::zeros(),
            grounding: GroundingReport::default(),
            unground_requested: false,
            unground_timer: 0.0,
        }
    }

    pub fn add_collider(&mut self, collider: SceneCollider) {
        self.colliders.push(collider);
    }

    pub fn add_target(&mut self, target: CombatTarget) -> TargetId {
        self.targets.push(target);
        self.targets.len() - 1
    }

    pub fn target(&self, id: TargetId) -> Option<&CombatTarget> {
        self.targets.get(id)
    }

    fn capsule_shape(&self) -> pshape::Capsule {
        // Degenerate segment (height <= 2 * radius) collapses to a ball,
        // which parry handles fine.
        let half_height = (self.height * 0.5 - self.radius).max(0.0);
        pshape::Capsule::new_y(half_height, self.radius)
    }

    fn capsule_center(&self, base: Vec3) -> Vec3 {
        base + Vec3::y() * self.vertical_offset
    }
}

impl Motor for SceneMotor {
    fn grounding(&self) -> GroundingReport {
        self.grounding
    }

    fn capsule(&self) -> CapsuleDims {
        CapsuleDims {
            radius: self.radius,
            height: self.height,
        }
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

    fn set_capsule_dimensions(&mut self, radius: f32, height: f32, vertical_offset: f32) {
        self.radius = radius;
        self.height = height;
        self.vertical_offset = vertical_offset;
    }

    fn force_unground(&mut self, time: f32) {
        self.unground_requested = true;
        self.unground_timer = self.unground_timer.max(time);
    }

    fn overlap_test(
        &mut self,
        position: Vec3,
        _rotation: Quat,
        mask: CollisionMask,
        hits: &mut [usize],
    ) -> usize {
        let capsule = self.capsule_shape();
        let center = self.capsule_center(position);
        let capsule_iso = Iso::translation(center.x, center.y, center.z);

        let mut written = 0;
        for (index, collider) in self.colliders.iter().enumerate() {
            if collider.layer & mask == 0 {
                continue;
            }
            let overlapping = collider.shape.with_parry(|pose, shape| {
                query::intersection_test(&capsule_iso, &capsule, pose, shape).unwrap_or(false)
            });
            if !overlapping {
                continue;
            }
            if written == hits.len() {
                log::debug!("overlap query truncated at {written} results");
                break;
            }
            hits[written] = index;
            written += 1;
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
        self.rotation = rotation;
        let mut velocity = velocity;

        let suppress_snap = self.unground_requested || self.unground_timer > 0.0;
        self.unground_requested = false;
        self.unground_timer = (self.unground_timer - dt).max(0.0);

        let capsule = self.capsule_shape();
        let mut center = self.capsule_center(self.position);
        let mut remaining = velocity * dt;

        // Sweep-and-slide: shape-cast along the desired translation, stop at
        // contact minus the skin, slide the leftover along the hit plane.
        // Iterate to handle corners.
        for _ in 0..DEFAULT_MAX_ITERATIONS {
            if remaining.norm_squared() <= MIN_MOVE_SQ {
                break;
            }
            let len = remaining.norm();
            let dir = remaining / len;
            let capsule_iso = Iso::translation(center.x, center.y, center.z);

            let Some(hit) = earliest_sweep_hit(&self.colliders, &capsule_iso, &capsule, remaining)
            else {
                center += remaining;
                break;
            };

            let travel = (len * hit.fraction).max(0.0);
            center += dir * (travel - DEFAULT_SKIN).max(0.0);

            let normal = match hit.normal.try_normalize(DIST_EPS) {
                Some(n) => n,
                None => break,
            };

            let leftover = dir * (len - travel);
            remaining = leftover - normal * leftover.dot(&normal);

            // The resolved velocity loses its into-surface component so the
            // controller sees the wall/floor contact next tick.
            let into_surface = velocity.dot(&normal);
            if into_surface < 0.0 {
                velocity -= normal * into_surface;
            }

            if remaining.norm_squared() <= MIN_MOVE_SQ {
                break;
            }
        }

        // Ground probe: short downward cast from the settled position. A
        // forced unground suppresses stability and snapping but still
        // reports what was found, which airborne steering needs.
        let mut grounding = GroundingReport::default();
        let probe = Vec3::new(0.0, -SNAP_MAX_DISTANCE, 0.0);
        let capsule_iso = Iso::translation(center.x, center.y, center.z);
        if let Some(hit) = earliest_sweep_hit(&self.colliders, &capsule_iso, &capsule, probe) {
            let normal = hit.normal.try_normalize(DIST_EPS).unwrap_or_else(Vec3::y);
            grounding.found_any_ground = true;
            grounding.normal = normal;

            let travel = SNAP_MAX_DISTANCE * hit.fraction;
            let stable = !suppress_snap
                && normal.y >= MAX_SLOPE_COS
                && travel <= GROUND_PROBE_DISTANCE + SNAP_HOVER_HEIGHT;
            if stable {
                grounding.stable_on_ground = true;

                // Hover slightly above the contact along its normal.
                center = center + probe * hit.fraction + normal * SNAP_HOVER_HEIGHT;

                let into_ground = velocity.dot(&normal);
                if into_ground < 0.0 {
                    velocity -= normal * into_ground;
                }
            }
        }

        self.position = center - Vec3::y() * self.vertical_offset;
        self.velocity = velocity;
        self.grounding = grounding;
    }
}

impl CombatContext for SceneMotor {
    fn cast_view_ray(&mut self, origin: Vec3, forward: Vec3, max_distance: f32) -> Option<RayHit> {
        let dir = forward.try_normalize(DIST_EPS)?;
        let ray = Ray::new(na::Point3::from(origin), dir);
        let mut nearest: Option<RayHit> = None;

        // Statics occlude but are not damageable.
        for collider in &self.colliders {
            let toi = collider
                .shape
                .with_parry(|pose, shape| shape.cast_ray(pose, &ray, max_distance, true));
            if let Some(toi) = toi {
                if nearest.map_or(true, |h| toi < h.distance) {
                    nearest = Some(RayHit {
                        point: origin + dir * toi,
                        distance: toi,
                        target: None,
                    });
                }
            }
        }

        for (id, target) in self.targets.iter().enumerate() {
            if target.health <= 0.0 {
                continue;
            }
            let ball = pshape::Ball::new(target.radius);
            let pose = Iso::translation(target.center.x, target.center.y, target.center.z);
            if let Some(toi) = ball.cast_ray(&pose, &ray, max_distance, true) {
                if nearest.map_or(true, |h| toi < h.distance) {
                    nearest = Some(RayHit {
                        point: origin + dir * toi,
                        distance: toi,
                        target: Some(id),
                    });
                }
            }
        }

        nearest
    }

    fn apply_damage(&mut self, target: TargetId, amount: f32) {
        let Some(t) = self.targets.get_mut(target) else {
            return;
        };
        if t.health <= 0.0 {
            return;
        }
        t.health = (t.health - amount).max(0.0);
        if t.health == 0.0 {
            log::debug!("target {target} destroyed");
        }
    }
}
