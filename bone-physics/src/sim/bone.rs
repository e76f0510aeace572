// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Spring-damper bone
//!
//! Each [`SpringBone`] simulates one point, the bone's centre of gravity,
//! pulled towards a target fixed in the parent node's frame. The displacement
//! of that point from the target is clamped per axis, scaled and written to
//! the bone as a local translation (and optionally rotation) on top of its
//! rest pose.
//!
//! # Integration
//!
//! Each call to [`SpringBone::integrate`] performs one semi-implicit Euler
//! step:
//!
//! ```text
//! diff  = target - position
//! F     = (diff * stiffness + diff * |diff| * stiffness2) * slack^2 - z * gravity_bias * mass + queued
//! v     = v * (1 - min(damping * resistance * contact_mul * dt, 1)) + F / mass * dt
//! v     = clamp_length(v, min(max_velocity, global max_velocity))
//! x     = x + v * dt
//! ```
//!
//! # Motion constraints
//!
//! The predicted displacement is then bounded by the enabled constraints.
//! The sphere and box constraints each push back on the velocity with a
//! biased impulse, the way a contact would, and the box additionally clamps
//! the displacement so it never exceeds `max_offset`.

use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};

use glam::{EulerRot, Mat3, Vec3};

use crate::collision::{BoneRef, CollisionBody, ColliderRegistry};
use crate::config::{GlobalPhysics, GroupName, NodeConfig, PhysicsConfig};
use crate::error::{SimError, SimResult};
use crate::math::{lerp_by_weight, lerp_by_weight_vec, Transform, EPSILON};
use crate::skeleton::BoneNode;
use crate::ActorHandle;

use super::Collider;

/// Maximum number of queued forces per bone
pub const MAX_PENDING_FORCES: usize = 1000;

/// Forces whose squared magnitude is below this are dropped
const MIN_FORCE_SQUARED: f32 = 1e-8;

/// Upper bound of the contact damping multiplier
pub const MAX_CONTACT_DAMPING: f32 = 15.0;

/// Velocity scale inside the resistance term
const RESISTANCE_SCALE: f32 = 0.0075;

/// Bias velocity per unit of constraint violation, per second
const CONSTRAINT_BIAS_RATE: f32 = 2880.0;

/// Violation tolerated before a constraint adds bias
const CONSTRAINT_BIAS_SLOP: f32 = 0.01;

/// A timed impulse waiting to be applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingForce {
    /// Remaining integration steps
    pub steps: u32,
    /// Force in the parent node's frame
    pub force: Vec3,
}

/// True iff both cluster ids are set and both the parent and group ids match
pub(crate) fn same_cluster(a_parent: u64, a_group: u32, b_parent: u64, b_group: u32) -> bool {
    a_group != 0 && b_group != 0 && a_parent != 0 && a_parent == b_parent && a_group == b_group
}

/// Spring force scale from the slack window
///
/// 0 inside `offset`, ramping linearly to 1 over the next `mag` units.
fn slack_factor(length: f32, offset: f32, mag: f32) -> f32 {
    if mag <= EPSILON {
        return if length >= offset { 1.0 } else { 0.0 };
    }
    ((length - offset) / mag).clamp(0.0, 1.0)
}

/// Parent id for cluster matching; 0 when the node has no parent
fn derive_parent_id(actor: ActorHandle, parent: Option<&str>) -> u64 {
    match parent {
        Some(name) => {
            let mut hasher = DefaultHasher::new();
            actor.hash(&mut hasher);
            name.hash(&mut hasher);
            hasher.finish() | 1
        }
        None => 0,
    }
}

/// One simulated bone
#[derive(Debug, Clone)]
pub struct SpringBone {
    actor: ActorHandle,
    name: String,
    parent_name: Option<String>,
    group: GroupName,
    conf: PhysicsConfig,
    max_velocity: f32,
    max_diff: f32,

    rest: Transform,
    parent_world: Transform,
    local: Transform,
    position: Vec3,
    prev_world: Vec3,
    velocity: Vec3,
    offset: Vec3,
    forces: VecDeque<PendingForce>,

    collider: Option<Collider>,
    collision: bool,
    movement: bool,
    suspended: bool,
    node_present: bool,
    node_col_offset_min: Vec3,
    node_col_offset_max: Vec3,
    weight: f32,

    group_id: u32,
    parent_id: u64,
    inv_mass: f32,
    in_contact: bool,
    damping_mul: f32,
    restore_rest: bool,
    reseed_velocity: bool,
}

impl SpringBone {
    /// Create a bone resting at the node's current pose
    ///
    /// The collider is not created here; call [`SpringBone::update_config`]
    /// with a registry to apply the collision toggle.
    pub fn new(
        actor: ActorHandle,
        node: &BoneNode,
        node_conf: &NodeConfig,
        conf: PhysicsConfig,
        global: &GlobalPhysics,
        weight: f32,
    ) -> Self {
        let mut bone = SpringBone {
            actor,
            name: node.name.clone(),
            parent_name: node.parent_name.clone(),
            group: node_conf.group.clone(),
            conf,
            max_velocity: global.max_velocity,
            max_diff: global.max_diff,
            rest: node.local,
            parent_world: node.parent_world,
            local: node.local,
            position: Vec3::ZERO,
            prev_world: Vec3::ZERO,
            velocity: Vec3::ZERO,
            offset: Vec3::ZERO,
            forces: VecDeque::new(),
            collider: None,
            collision: false,
            movement: node_conf.movement,
            suspended: false,
            node_present: true,
            node_col_offset_min: node_conf.col_offset_min,
            node_col_offset_max: node_conf.col_offset_max,
            weight,
            group_id: node_conf.collision_group,
            parent_id: derive_parent_id(actor, node.parent_name.as_deref()),
            inv_mass: 0.0,
            in_contact: false,
            damping_mul: 1.0,
            restore_rest: false,
            reseed_velocity: false,
        };
        bone.inv_mass = bone.collision_inv_mass();
        bone.reset();
        bone
    }

    /// Advance the spring by one sub-step
    ///
    /// No-op while suspended or when movement is disabled.
    pub fn integrate(&mut self, dt: f32) {
        if self.suspended || !self.movement {
            return;
        }

        let target = self.target();
        let diff = target - self.position;
        if diff.abs().max_element() > self.max_diff {
            log::debug!("{}: {} moved {} units, resetting", self.actor, self.name, diff.length());
            self.reset();
            return;
        }

        let conf = &self.conf;
        let mut force = diff * conf.stiffness + diff * diff.abs() * conf.stiffness2;
        if conf.spring_slack_offset > 0.0 || conf.spring_slack_mag > 0.0 {
            let m = slack_factor(self.offset.length(), conf.spring_slack_offset, conf.spring_slack_mag);
            force *= m * m;
        }
        force.z -= conf.gravity_bias * conf.mass;

        let queued = self.drain_forces();
        if queued != Vec3::ZERO && dt > 0.0 {
            force += self.parent_world.rotation * queued * (self.conf.mass / dt);
        }

        let resistance = if self.conf.resistance > 0.0 {
            (1.0 - 1.0 / (self.velocity.length() * RESISTANCE_SCALE + 1.0)) * self.conf.resistance + 1.0
        } else {
            1.0
        };
        let damping = (self.conf.damping * resistance * self.damping_mul * dt).clamp(0.0, 1.0);
        self.velocity -= self.velocity * damping;
        self.velocity += force / self.conf.mass * dt;
        self.velocity = self.velocity.clamp_length_max(self.velocity_limit());
        if !self.velocity.is_finite() {
            log::warn!("{}: {} produced a non-finite velocity, zeroed", self.actor, self.name);
            self.velocity = Vec3::ZERO;
        }

        let mut predicted = self.position + self.velocity * dt;
        if self.conf.sphere_constraint {
            predicted = self.constrain_sphere(predicted, target, dt);
        }
        if self.conf.box_constraint {
            predicted = self.constrain_box(predicted, target, dt);
        }
        self.place(predicted, target);
    }

    /// Derive velocity from the node's own motion since the last call
    ///
    /// Used for movement-disabled bones whose node is driven by animation, so
    /// their colliders still push with a meaningful velocity. The first call
    /// after a resume only records the position.
    pub fn compute_velocity(&mut self, dt: f32) {
        let current = self.world().translation;
        if self.reseed_velocity {
            self.reseed_velocity = false;
            self.velocity = Vec3::ZERO;
        } else if dt > 0.0 {
            let velocity = ((current - self.prev_world) / dt).clamp_length_max(self.velocity_limit());
            self.velocity = if velocity.is_finite() { velocity } else { Vec3::ZERO };
        }
        self.prev_world = current;
        self.position = current;
        self.refresh_collider();
    }

    /// Hot-swap parameters and apply the collision and movement toggles
    ///
    /// Calling this again with identical arguments changes nothing and keeps
    /// the existing collider registration. Turning movement off puts the node
    /// back at its rest pose; the next commit writes that pose once, after
    /// which the node belongs to animation again.
    pub fn update_config(
        &mut self,
        conf: &PhysicsConfig,
        collision: bool,
        movement: bool,
        registry: &mut ColliderRegistry,
    ) -> SimResult<()> {
        self.conf = *conf;
        if movement != self.movement {
            self.forces.clear();
            self.movement = movement;
            if movement {
                self.restore_rest = false;
                self.prev_world = self.world().translation;
                self.position = self.target() + self.parent_world.rotation * self.offset;
            } else {
                self.velocity = Vec3::ZERO;
                self.offset = Vec3::ZERO;
                self.clear_contact();
                self.local = self.rest;
                self.restore_rest = true;
                self.prev_world = self.world().translation;
                self.position = self.prev_world;
                self.refresh_collider();
            }
        }
        self.inv_mass = self.collision_inv_mass();
        self.collision = collision;
        self.sync_collider(registry)
    }

    /// Update the global limits
    pub fn set_limits(&mut self, max_velocity: f32, max_diff: f32) {
        self.max_velocity = max_velocity;
        self.max_diff = max_diff;
    }

    /// Take the node-level group, collider offsets and cluster ids
    pub fn set_node_config(&mut self, node_conf: &NodeConfig) {
        self.group = node_conf.group.clone();
        self.node_col_offset_min = node_conf.col_offset_min;
        self.node_col_offset_max = node_conf.col_offset_max;
        self.group_id = node_conf.collision_group;
        self.parent_id = derive_parent_id(self.actor, self.parent_name.as_deref());
    }

    /// Re-derive the weight-dependent collider geometry
    pub fn update_weight(&mut self, weight: f32, registry: &mut ColliderRegistry) -> SimResult<()> {
        self.weight = weight;
        self.sync_collider(registry)
    }

    /// Queue a force for the next `steps` integrations
    ///
    /// Returns `false` and queues nothing when `steps` is zero, movement is
    /// disabled, the queue is full, or the force is negligible.
    pub fn apply_force(&mut self, steps: u32, force: Vec3) -> bool {
        if steps == 0
            || !self.movement
            || self.forces.len() >= MAX_PENDING_FORCES
            || !force.is_finite()
            || force.length_squared() < MIN_FORCE_SQUARED
        {
            return false;
        }
        self.forces.push_back(PendingForce { steps, force });
        true
    }

    /// Snap back to the rest pose with zero velocity
    pub fn reset(&mut self) {
        self.velocity = Vec3::ZERO;
        self.offset = Vec3::ZERO;
        self.forces.clear();
        self.clear_contact();
        self.position = self.target();
        if self.movement {
            self.local = self.compute_local();
        }
        self.prev_world = self.world().translation;
        self.refresh_collider();
    }

    /// Check if both bones belong to the same collision cluster
    pub fn is_same_group(&self, other: &SpringBone) -> bool {
        same_cluster(self.parent_id, self.group_id, other.parent_id, other.group_id)
    }

    /// Take the node's latest parent transform and, for animated bones, its pose
    pub fn sync_node(&mut self, node: &BoneNode) {
        if node.parent_name != self.parent_name {
            self.parent_name = node.parent_name.clone();
            self.parent_id = derive_parent_id(self.actor, self.parent_name.as_deref());
        }
        self.parent_world = node.parent_world;
        if !self.movement && !self.restore_rest {
            self.local = node.local;
        }
        self.node_present = true;
    }

    /// Mark the node as gone; the collider is released
    pub fn detach_node(&mut self, registry: &mut ColliderRegistry) {
        self.node_present = false;
        if let Some(mut collider) = self.collider.take() {
            collider.destroy(registry);
        }
    }

    /// Suspend or resume integration
    ///
    /// Resuming restarts velocity tracking, so motion of the node while
    /// suspended is not read as speed.
    pub fn set_suspended(&mut self, suspended: bool) {
        if self.suspended && !suspended {
            self.reseed_velocity = true;
        }
        self.suspended = suspended;
        if let Some(collider) = self.collider.as_mut() {
            collider.set_enabled(!suspended);
        }
    }

    /// Collision proxy data for this sub-step, if the collider is active
    ///
    /// Suspended bones have their collider disabled and export nothing.
    pub fn collision_body(&self, owner: BoneRef) -> Option<CollisionBody> {
        if !self.node_present {
            return None;
        }
        let collider = self.collider.as_ref().filter(|c| c.is_active())?;
        Some(CollisionBody {
            id: collider.id()?,
            owner,
            center: collider.center(),
            radius: collider.scaled_radius(),
            velocity: self.velocity,
            inv_mass: self.inv_mass,
            restitution: self.conf.col_restitution,
            group_id: self.group_id,
            parent_id: self.parent_id,
        })
    }

    /// Take the outcome of collision resolution
    ///
    /// `center` is the resolved sphere centre. The collider rides on the
    /// written pose, which moves by `offset * linear`, so the simulated point
    /// moves by the sphere's displacement divided by `linear` per parent axis.
    /// Axes with a zero `linear` cannot move the sphere and take the
    /// displacement as is.
    pub fn apply_collision(&mut self, center: Vec3, velocity: Vec3) {
        if !self.movement || self.suspended {
            return;
        }
        let Some(collider) = self.collider.as_ref() else {
            return;
        };
        let displacement = center - collider.center();
        self.velocity = velocity.clamp_length_max(self.velocity_limit());
        if !self.velocity.is_finite() {
            self.velocity = Vec3::ZERO;
        }

        let rotation = self.parent_world.rotation;
        let mut local = rotation.transpose() * displacement;
        for axis in 0..3 {
            let gain = self.conf.linear[axis];
            if gain > EPSILON {
                local[axis] /= gain;
            }
        }
        let target = self.target();
        self.place(self.position + rotation * local, target);
    }

    /// Flag a contact for this sub-step
    ///
    /// The damping multiplier for the next integration becomes
    /// `clamp(depth * col_damping_coef, 1, 15)`.
    pub fn on_contact(&mut self, depth: f32) {
        self.in_contact = true;
        let mul = (depth * self.conf.col_damping_coef).clamp(1.0, MAX_CONTACT_DAMPING);
        self.damping_mul = self.damping_mul.max(mul);
    }

    /// Clear the contact flag and damping multiplier
    pub fn clear_contact(&mut self) {
        self.in_contact = false;
        self.damping_mul = 1.0;
    }

    /// Release the collider
    pub fn release(&mut self, registry: &mut ColliderRegistry) {
        if let Some(mut collider) = self.collider.take() {
            collider.destroy(registry);
        }
    }

    /// Node name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configuration group
    pub fn group(&self) -> &GroupName {
        &self.group
    }

    /// Current parameters
    pub fn config(&self) -> &PhysicsConfig {
        &self.conf
    }

    /// World position of the simulated point
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Current velocity
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Clamped displacement from the target, in the parent frame
    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    /// Point the spring pulls towards
    pub fn target(&self) -> Vec3 {
        self.parent_world.transform_point(self.conf.cog_offset)
    }

    /// Local transform to write back to the node
    pub fn local_transform(&self) -> &Transform {
        &self.local
    }

    /// Rest local transform
    pub fn rest_transform(&self) -> &Transform {
        &self.rest
    }

    /// World transform of the node as currently simulated
    pub fn world(&self) -> Transform {
        self.parent_world.mul_transform(&self.local)
    }

    /// Attached collider, if any
    pub fn collider(&self) -> Option<&Collider> {
        self.collider.as_ref()
    }

    /// Number of queued forces
    pub fn pending_forces(&self) -> usize {
        self.forces.len()
    }

    /// Whether movement integration is enabled
    pub fn movement(&self) -> bool {
        self.movement
    }

    /// Whether collision is wanted
    pub fn collision(&self) -> bool {
        self.collision
    }

    /// Whether the bone is suspended
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Whether the underlying node was found at the last validation
    pub fn node_present(&self) -> bool {
        self.node_present
    }

    /// Whether the bone's collider took part in a contact this sub-step
    pub fn in_contact(&self) -> bool {
        self.in_contact
    }

    /// Damping multiplier for the next integration
    pub fn damping_multiplier(&self) -> f32 {
        self.damping_mul
    }

    /// Cluster id from the node configuration
    pub fn group_id(&self) -> u32 {
        self.group_id
    }

    /// Id derived from the parent node
    pub fn parent_id(&self) -> u64 {
        self.parent_id
    }

    /// Inverse mass seen by the collision solver, 0 for static bones
    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Velocity bound from the group and the global limit, whichever is lower
    pub fn velocity_limit(&self) -> f32 {
        self.max_velocity.min(self.conf.max_velocity)
    }

    /// Whether the next commit should write this bone's local transform
    pub fn needs_commit(&self) -> bool {
        (self.movement || self.restore_rest) && self.node_present
    }

    /// Record that the local transform reached the skeleton
    pub fn mark_committed(&mut self) {
        self.restore_rest = false;
    }

    fn collision_inv_mass(&self) -> f32 {
        if self.movement {
            1.0 / (self.conf.mass * self.conf.col_mass_scale)
        } else {
            0.0
        }
    }

    fn drain_forces(&mut self) -> Vec3 {
        let mut total = Vec3::ZERO;
        self.forces.retain_mut(|pending| {
            total += pending.force;
            pending.steps -= 1;
            pending.steps > 0
        });
        total
    }

    /// Push back on velocity leaving the offset box; returns the new prediction
    fn constrain_box(&mut self, predicted: Vec3, target: Vec3, dt: f32) -> Vec3 {
        let rotation = self.parent_world.rotation;
        let raw = rotation.transpose() * (predicted - target);
        let depth = raw - raw.clamp(-self.conf.max_offset, self.conf.max_offset);
        if depth == Vec3::ZERO {
            return predicted;
        }
        if self.constraint_impulse(rotation * depth, depth.length(), dt) {
            self.position + self.velocity * dt
        } else {
            predicted
        }
    }

    /// Push back on velocity leaving the offset sphere; returns the new prediction
    fn constrain_sphere(&mut self, predicted: Vec3, target: Vec3, dt: f32) -> Vec3 {
        let rotation = self.parent_world.rotation;
        let diff = rotation.transpose() * (predicted - target) - self.conf.max_offset_sphere_offset;
        let length = diff.length();
        let radius = self.conf.max_offset_sphere_radius;
        if length <= radius {
            return predicted;
        }
        if self.constraint_impulse(rotation * diff, length - radius, dt) {
            self.position + self.velocity * dt
        } else {
            predicted
        }
    }

    /// Biased velocity impulse against `direction`; false if nothing changed
    fn constraint_impulse(&mut self, direction: Vec3, violation: f32, dt: f32) -> bool {
        let len_sq = direction.length_squared();
        if len_sq < EPSILON * EPSILON {
            return false;
        }
        let normal = direction / len_sq.sqrt();

        let mut impulse = self.velocity.dot(normal);
        if violation > CONSTRAINT_BIAS_SLOP {
            let bias = (violation - CONSTRAINT_BIAS_SLOP)
                .min(self.conf.max_offset_max_bias_mag)
                .max(0.0);
            impulse += dt * CONSTRAINT_BIAS_RATE * bias;
        }
        if impulse <= 0.0 {
            return false;
        }
        let j = (1.0 + self.conf.max_offset_restitution_coef) * impulse;
        self.velocity -= normal * (j * self.conf.max_offset_vel_response_scale);
        self.velocity = self.velocity.clamp_length_max(self.velocity_limit());
        true
    }

    /// Bound `world_pos` around `target` and rebuild the local pose
    ///
    /// With the box constraint on, the displacement is clamped to `max_offset`.
    fn place(&mut self, world_pos: Vec3, target: Vec3) {
        let rotation = self.parent_world.rotation;
        let inv_rotation = rotation.transpose();
        let raw = inv_rotation * (world_pos - target);
        let clamped = if self.conf.box_constraint {
            raw.clamp(-self.conf.max_offset, self.conf.max_offset)
        } else {
            raw
        };
        if clamped != raw {
            // drop velocity that pushes further out of the box
            let mut local_velocity = inv_rotation * self.velocity;
            for axis in 0..3 {
                if clamped[axis] != raw[axis] && local_velocity[axis] * raw[axis] > 0.0 {
                    local_velocity[axis] = 0.0;
                }
            }
            self.velocity = rotation * local_velocity;
        }
        self.offset = clamped;
        self.position = target + rotation * clamped;
        self.local = self.compute_local();
        self.refresh_collider();
    }

    fn compute_local(&self) -> Transform {
        let scale = if self.parent_world.scale > EPSILON {
            self.parent_world.scale
        } else {
            1.0
        };
        let inv_rotation = self.parent_world.rotation.transpose();
        let lift = inv_rotation * Vec3::new(0.0, 0.0, self.conf.gravity_correction);
        let shift = (self.offset * self.conf.linear + lift) / scale;

        let mut angles = self.offset * self.conf.rotational;
        angles.z += self.conf.rot_gravity_correction * self.conf.rotational.z;
        let rotation = if angles == Vec3::ZERO {
            self.rest.rotation
        } else {
            self.rest.rotation
                * Mat3::from_euler(
                    EulerRot::XYZ,
                    angles.x.to_radians(),
                    angles.y.to_radians(),
                    angles.z.to_radians(),
                )
        };

        Transform {
            rotation,
            translation: self.rest.translation + shift,
            scale: self.rest.scale,
        }
    }

    fn collider_geometry(&self) -> (f32, Vec3) {
        let radius = lerp_by_weight(
            self.weight,
            self.conf.col_sphere_radius_min,
            self.conf.col_sphere_radius_max,
        );
        let offset = lerp_by_weight_vec(self.weight, self.conf.col_offset_min, self.conf.col_offset_max)
            + lerp_by_weight_vec(self.weight, self.node_col_offset_min, self.node_col_offset_max);
        (radius, offset)
    }

    fn sync_collider(&mut self, registry: &mut ColliderRegistry) -> SimResult<()> {
        let (radius, offset) = self.collider_geometry();
        let wanted = self.collision && radius > 0.0;

        if !wanted {
            self.release(registry);
            return Ok(());
        }

        let world = self.node_present.then(|| self.world());
        let suspended = self.suspended;
        let collider = self
            .collider
            .get_or_insert_with(|| Collider::new(radius, offset));
        collider.set_enabled(!suspended);
        collider.set_radius(radius);
        collider.set_sphere_offset(offset);
        if collider.create(registry, world.as_ref()) {
            Ok(())
        } else {
            self.collider = None;
            Err(SimError::MissingNode {
                actor: self.actor,
                node: self.name.clone(),
            })
        }
    }

    fn refresh_collider(&mut self) {
        let world = self.world();
        if let Some(collider) = self.collider.as_mut() {
            collider.update(&world);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rest_node() -> BoneNode {
        BoneNode {
            name: "NPC L Breast".to_string(),
            parent_name: Some("NPC Spine2".to_string()),
            parent_world: Transform::from_translation(Vec3::new(0.0, 0.0, 100.0)),
            local: Transform::from_translation(Vec3::new(0.0, 5.0, 0.0)),
        }
    }

    fn bone_with(conf: PhysicsConfig) -> SpringBone {
        SpringBone::new(
            ActorHandle::new(1),
            &rest_node(),
            &NodeConfig::new("Breast").with_collision(false),
            conf,
            &GlobalPhysics::default(),
            50.0,
        )
    }

    #[test]
    fn test_starts_at_rest() {
        let bone = bone_with(PhysicsConfig::default());
        assert_eq!(bone.velocity(), Vec3::ZERO);
        assert_eq!(bone.position(), bone.target());
        assert_eq!(bone.local_transform().translation, Vec3::new(0.0, 5.0, 0.0));
    }

    #[test]
    fn test_rest_bone_stays_bounded() {
        let conf = PhysicsConfig {
            stiffness: 100.0,
            damping: 0.5,
            gravity_bias: 10.0,
            ..PhysicsConfig::default()
        };
        let mut bone = bone_with(conf);
        bone.integrate(1.0 / 60.0);

        assert!(bone.velocity().is_finite());
        assert!(bone.velocity().length() > 0.0);
        assert!((bone.position() - bone.target()).length() < 1.0);
    }

    #[test]
    fn test_spring_pulls_back_to_target() {
        let conf = PhysicsConfig {
            stiffness: 100.0,
            damping: 5.0,
            ..PhysicsConfig::default()
        };
        let mut bone = bone_with(conf);
        bone.apply_force(1, Vec3::new(0.0, 0.0, 5.0));
        for _ in 0..600 {
            bone.integrate(1.0 / 60.0);
        }
        assert!((bone.position() - bone.target()).length() < 0.01);
        assert_eq!(bone.pending_forces(), 0);
    }

    #[test]
    fn test_velocity_clamped() {
        let mut bone = bone_with(PhysicsConfig::default());
        bone.set_limits(50.0, 360.0);
        assert!(bone.apply_force(3, Vec3::new(1.0e6, 0.0, 0.0)));
        for _ in 0..3 {
            bone.integrate(1.0 / 60.0);
            assert!(bone.velocity().length() <= 50.0 * (1.0 + 1e-5));
        }
    }

    #[test]
    fn test_zero_step_force_is_noop() {
        let mut with_force = bone_with(PhysicsConfig::default());
        let mut without = bone_with(PhysicsConfig::default());
        assert!(!with_force.apply_force(0, Vec3::new(0.0, 100.0, 0.0)));
        with_force.integrate(1.0 / 60.0);
        without.integrate(1.0 / 60.0);
        assert_eq!(with_force.position(), without.position());
        assert_eq!(with_force.velocity(), without.velocity());
    }

    #[test]
    fn test_force_rejections() {
        let mut bone = bone_with(PhysicsConfig::default());
        assert!(!bone.apply_force(5, Vec3::ZERO));
        assert!(!bone.apply_force(5, Vec3::new(f32::NAN, 0.0, 0.0)));
        for _ in 0..MAX_PENDING_FORCES {
            assert!(bone.apply_force(5, Vec3::X));
        }
        assert!(!bone.apply_force(5, Vec3::X));
        assert_eq!(bone.pending_forces(), MAX_PENDING_FORCES);
    }

    #[test]
    fn test_force_lifetime() {
        let mut bone = bone_with(PhysicsConfig::default());
        bone.apply_force(2, Vec3::X);
        bone.integrate(1.0 / 60.0);
        assert_eq!(bone.pending_forces(), 1);
        bone.integrate(1.0 / 60.0);
        assert_eq!(bone.pending_forces(), 0);
    }

    #[test]
    fn test_offset_box_clamp() {
        let conf = PhysicsConfig {
            max_offset: Vec3::splat(2.0),
            stiffness: 0.0,
            damping: 0.0,
            ..PhysicsConfig::default()
        };
        let mut bone = bone_with(conf);
        bone.apply_force(1, Vec3::new(600.0, 0.0, 0.0));
        bone.integrate(1.0 / 60.0);
        assert_relative_eq!(bone.offset().x, 2.0);
        // outward velocity is removed at the wall
        assert_eq!(bone.velocity().x, 0.0);
        assert_relative_eq!(bone.local_transform().translation.x, 2.0);
    }

    #[test]
    fn test_teleport_resets() {
        let mut bone = bone_with(PhysicsConfig::default());
        let mut node = rest_node();
        node.parent_world.translation.x += 1000.0;
        bone.sync_node(&node);
        bone.integrate(1.0 / 60.0);
        assert_eq!(bone.position(), bone.target());
        assert_eq!(bone.velocity(), Vec3::ZERO);
    }

    #[test]
    fn test_reset_restores_rest() {
        let mut bone = bone_with(PhysicsConfig::default());
        bone.apply_force(5, Vec3::new(3.0, 0.0, 0.0));
        for _ in 0..3 {
            bone.integrate(1.0 / 60.0);
        }
        assert_ne!(bone.offset(), Vec3::ZERO);
        bone.reset();
        assert_eq!(bone.offset(), Vec3::ZERO);
        assert_eq!(bone.velocity(), Vec3::ZERO);
        assert_eq!(bone.pending_forces(), 0);
        assert_eq!(bone.local_transform(), bone.rest_transform());
    }

    #[test]
    fn test_suspension_disables_collider() {
        let mut registry = ColliderRegistry::new();
        let mut bone = bone_with(PhysicsConfig::default());
        let conf = *bone.config();
        bone.update_config(&conf, true, true, &mut registry).unwrap();
        let owner = BoneRef {
            actor: ActorHandle::new(1),
            bone: 0,
        };
        assert!(bone.collision_body(owner).is_some());

        bone.set_suspended(true);
        assert!(bone.collider().is_some_and(|c| c.is_created() && !c.is_enabled()));
        assert!(bone.collision_body(owner).is_none());

        // a config reload while suspended keeps the sphere disabled
        bone.update_config(&conf, true, true, &mut registry).unwrap();
        assert!(bone.collision_body(owner).is_none());

        bone.set_suspended(false);
        assert!(bone.collision_body(owner).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_suspended_bone_does_not_move() {
        let mut bone = bone_with(PhysicsConfig::default());
        bone.apply_force(1, Vec3::X);
        bone.set_suspended(true);
        let before = bone.position();
        bone.integrate(1.0 / 60.0);
        assert_eq!(bone.position(), before);
        assert_eq!(bone.pending_forces(), 1);
    }

    #[test]
    fn test_update_config_idempotent() {
        let mut registry = ColliderRegistry::new();
        let mut bone = bone_with(PhysicsConfig::default());
        let conf = PhysicsConfig {
            stiffness: 12.0,
            ..PhysicsConfig::default()
        };
        bone.update_config(&conf, true, true, &mut registry).unwrap();
        let id = bone.collider().and_then(|c| c.id());
        assert!(id.is_some());

        bone.update_config(&conf, true, true, &mut registry).unwrap();
        assert_eq!(bone.collider().and_then(|c| c.id()), id);
        assert_eq!(bone.config(), &conf);
        assert_eq!(registry.len(), 1);

        bone.update_config(&conf, false, true, &mut registry).unwrap();
        assert!(bone.collider().is_none());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_movement_toggle_clears_forces() {
        let mut registry = ColliderRegistry::new();
        let mut bone = bone_with(PhysicsConfig::default());
        bone.apply_force(10, Vec3::X);
        let conf = *bone.config();
        bone.update_config(&conf, false, false, &mut registry).unwrap();
        assert_eq!(bone.pending_forces(), 0);
        assert_eq!(bone.inv_mass(), 0.0);
        assert!(!bone.apply_force(10, Vec3::X));
    }

    #[test]
    fn test_collider_requires_node() {
        let mut registry = ColliderRegistry::new();
        let mut bone = bone_with(PhysicsConfig::default());
        bone.detach_node(&mut registry);
        let conf = *bone.config();
        let err = bone.update_config(&conf, true, true, &mut registry);
        assert!(matches!(err, Err(SimError::MissingNode { .. })));
        assert!(bone.collider().is_none());
    }

    #[test]
    fn test_contact_damping_multiplier() {
        let mut bone = bone_with(PhysicsConfig::default());
        bone.on_contact(0.2);
        assert!(bone.in_contact());
        assert_eq!(bone.damping_multiplier(), 1.0);
        bone.on_contact(40.0);
        assert_eq!(bone.damping_multiplier(), MAX_CONTACT_DAMPING);
        bone.clear_contact();
        assert!(!bone.in_contact());
        assert_eq!(bone.damping_multiplier(), 1.0);
    }

    #[test]
    fn test_parent_id_shared_by_siblings() {
        let a = bone_with(PhysicsConfig::default());
        let mut node = rest_node();
        node.name = "NPC R Breast".to_string();
        let b = SpringBone::new(
            ActorHandle::new(1),
            &node,
            &NodeConfig::new("Breast").with_collision_group(2),
            PhysicsConfig::default(),
            &GlobalPhysics::default(),
            50.0,
        );
        assert_ne!(a.parent_id(), 0);
        assert_eq!(a.parent_id(), b.parent_id());
        // no cluster id on the first bone
        assert!(!a.is_same_group(&b));

        let mut a = a;
        a.set_node_config(&NodeConfig::new("Breast").with_collision_group(2));
        assert!(a.is_same_group(&b));
    }

    #[test]
    fn test_apply_collision_moves_point() {
        let mut registry = ColliderRegistry::new();
        let mut bone = bone_with(PhysicsConfig::default());
        let conf = *bone.config();
        bone.update_config(&conf, true, true, &mut registry).unwrap();
        let before = bone.position();
        let center = bone.collider().map(|c| c.center()).unwrap();

        bone.apply_collision(center + Vec3::new(0.5, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0));
        assert_relative_eq!(bone.position().x, before.x + 0.5, epsilon = 1e-5);
        assert_eq!(bone.velocity(), Vec3::new(2.0, 0.0, 0.0));
        let moved = bone.collider().map(|c| c.center()).unwrap();
        assert_relative_eq!(moved.x, center.x + 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_same_group() {
        assert!(same_cluster(7, 1, 7, 1));
        assert!(!same_cluster(7, 1, 8, 1));
        assert!(!same_cluster(7, 0, 7, 0));
        assert!(!same_cluster(0, 1, 0, 1));
    }

    #[test]
    fn test_compute_velocity_tracks_node() {
        let mut registry = ColliderRegistry::new();
        let mut bone = bone_with(PhysicsConfig::default());
        let conf = *bone.config();
        bone.update_config(&conf, false, false, &mut registry).unwrap();
        bone.compute_velocity(1.0 / 60.0);

        let mut node = rest_node();
        node.parent_world.translation.y += 1.0;
        bone.sync_node(&node);
        bone.compute_velocity(0.5);
        assert_relative_eq!(bone.velocity().y, 2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_collision_displacement_respects_linear_scale() {
        let mut registry = ColliderRegistry::new();
        let conf = PhysicsConfig {
            linear: Vec3::splat(0.5),
            ..PhysicsConfig::default()
        };
        let mut bone = bone_with(conf);
        bone.update_config(&conf, true, true, &mut registry).unwrap();
        let center = bone.collider().map(|c| c.center()).unwrap();

        bone.apply_collision(center + Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO);
        let moved = bone.collider().map(|c| c.center()).unwrap();
        assert_relative_eq!(moved.x, center.x + 1.0, epsilon = 1e-4);
        assert_relative_eq!(bone.offset().x, 2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_movement_off_restores_rest_once() {
        let mut registry = ColliderRegistry::new();
        let mut bone = bone_with(PhysicsConfig::default());
        bone.apply_force(3, Vec3::new(0.0, 0.0, 4.0));
        for _ in 0..3 {
            bone.integrate(1.0 / 60.0);
        }
        assert_ne!(bone.local_transform(), bone.rest_transform());

        let conf = *bone.config();
        bone.update_config(&conf, false, false, &mut registry).unwrap();
        assert_eq!(bone.local_transform(), bone.rest_transform());
        assert_eq!(bone.velocity(), Vec3::ZERO);
        assert!(bone.needs_commit());

        // the skeleton still holds the displaced pose until the rest pose is written
        let mut displaced = rest_node();
        displaced.local.translation.z += 3.0;
        bone.sync_node(&displaced);
        assert_eq!(bone.local_transform(), bone.rest_transform());

        bone.mark_committed();
        assert!(!bone.needs_commit());
        bone.sync_node(&displaced);
        assert_eq!(bone.local_transform(), &displaced.local);
    }

    #[test]
    fn test_slack_factor() {
        assert_eq!(slack_factor(0.5, 1.0, 2.0), 0.0);
        assert_relative_eq!(slack_factor(2.0, 1.0, 2.0), 0.5);
        assert_eq!(slack_factor(5.0, 1.0, 2.0), 1.0);
        assert_eq!(slack_factor(1.0, 1.0, 0.0), 1.0);
        assert_eq!(slack_factor(0.9, 1.0, 0.0), 0.0);
    }

    #[test]
    fn test_spring_slack_lets_bone_drift() {
        let tight = PhysicsConfig {
            stiffness: 100.0,
            damping: 0.0,
            ..PhysicsConfig::default()
        };
        let slack = PhysicsConfig {
            spring_slack_offset: 10.0,
            ..tight
        };
        let mut a = bone_with(tight);
        let mut b = bone_with(slack);
        a.apply_force(1, Vec3::new(0.0, 0.0, 1.0));
        b.apply_force(1, Vec3::new(0.0, 0.0, 1.0));
        for _ in 0..10 {
            a.integrate(1.0 / 60.0);
            b.integrate(1.0 / 60.0);
        }
        // no restoring force inside the slack window
        assert_relative_eq!(b.offset().z, 10.0 / 60.0, epsilon = 1e-4);
        assert_relative_eq!(b.velocity().z, 1.0, epsilon = 1e-4);
        assert!(a.offset().z < b.offset().z);
    }

    #[test]
    fn test_resistance_damps_fast_motion() {
        let plain = PhysicsConfig {
            stiffness: 0.0,
            damping: 1.0,
            ..PhysicsConfig::default()
        };
        let resisted = PhysicsConfig {
            resistance: 100.0,
            ..plain
        };
        let mut a = bone_with(plain);
        let mut b = bone_with(resisted);
        a.apply_force(1, Vec3::new(0.0, 0.0, 50.0));
        b.apply_force(1, Vec3::new(0.0, 0.0, 50.0));
        for _ in 0..2 {
            a.integrate(1.0 / 60.0);
            b.integrate(1.0 / 60.0);
        }
        assert!(b.velocity().length() < 0.75 * a.velocity().length());
    }

    #[test]
    fn test_group_velocity_limit() {
        let conf = PhysicsConfig {
            max_velocity: 8.0,
            ..PhysicsConfig::default()
        };
        let mut bone = bone_with(conf);
        assert_eq!(bone.velocity_limit(), 8.0);
        bone.apply_force(1, Vec3::new(1.0e4, 0.0, 0.0));
        bone.integrate(1.0 / 60.0);
        assert!(bone.velocity().length() <= 8.0 * (1.0 + 1e-5));

        // the global clamp still applies when it is lower
        bone.set_limits(5.0, 360.0);
        assert_eq!(bone.velocity_limit(), 5.0);
    }

    #[test]
    fn test_box_constraint_can_be_disabled() {
        let conf = PhysicsConfig {
            max_offset: Vec3::splat(2.0),
            stiffness: 0.0,
            damping: 0.0,
            box_constraint: false,
            ..PhysicsConfig::default()
        };
        let mut bone = bone_with(conf);
        bone.apply_force(1, Vec3::new(600.0, 0.0, 0.0));
        bone.integrate(1.0 / 60.0);
        assert_relative_eq!(bone.offset().x, 10.0, epsilon = 1e-3);
    }

    #[test]
    fn test_box_constraint_bounces_back() {
        let conf = PhysicsConfig {
            max_offset: Vec3::splat(2.0),
            stiffness: 0.0,
            damping: 0.0,
            max_offset_vel_response_scale: 1.0,
            max_offset_restitution_coef: 0.5,
            max_offset_max_bias_mag: 0.0,
            ..PhysicsConfig::default()
        };
        let mut bone = bone_with(conf);
        bone.apply_force(1, Vec3::new(150.0, 0.0, 0.0));
        bone.integrate(1.0 / 60.0);
        // 150 out, 1.5 * 150 back
        assert_relative_eq!(bone.velocity().x, -75.0, epsilon = 1e-2);
        assert_relative_eq!(bone.offset().x, -1.25, epsilon = 1e-3);
    }

    #[test]
    fn test_sphere_constraint_removes_outward_velocity() {
        let conf = PhysicsConfig {
            stiffness: 0.0,
            damping: 0.0,
            box_constraint: false,
            sphere_constraint: true,
            max_offset_sphere_radius: 1.0,
            max_offset_vel_response_scale: 1.0,
            max_offset_max_bias_mag: 0.0,
            ..PhysicsConfig::default()
        };
        let mut bone = bone_with(conf);
        bone.apply_force(1, Vec3::new(0.0, 600.0, 0.0));
        bone.integrate(1.0 / 60.0);
        assert_relative_eq!(bone.velocity().y, 0.0, epsilon = 1e-3);
        assert!(bone.offset().length() <= 1.0);
    }

    #[test]
    fn test_sphere_constraint_ignores_motion_inside() {
        let conf = PhysicsConfig {
            stiffness: 0.0,
            damping: 0.0,
            sphere_constraint: true,
            max_offset_sphere_radius: 5.0,
            max_offset_sphere_offset: Vec3::new(0.0, 0.0, 1.0),
            ..PhysicsConfig::default()
        };
        let mut bone = bone_with(conf);
        bone.apply_force(1, Vec3::new(0.0, 0.0, 60.0));
        bone.integrate(1.0 / 60.0);
        assert_relative_eq!(bone.offset().z, 1.0, epsilon = 1e-4);
        assert_relative_eq!(bone.velocity().z, 60.0, epsilon = 1e-3);
    }

    #[test]
    fn test_rot_gravity_correction_tilts_rest_pose() {
        let conf = PhysicsConfig {
            rotational: Vec3::new(0.0, 0.0, 2.0),
            rot_gravity_correction: 5.0,
            ..PhysicsConfig::default()
        };
        let bone = bone_with(conf);
        let expected = Mat3::from_rotation_z(10.0f32.to_radians());
        assert!(bone.local_transform().rotation.abs_diff_eq(expected, 1e-5));

        let level = bone_with(PhysicsConfig {
            rot_gravity_correction: 0.0,
            ..conf
        });
        assert_eq!(level.local_transform().rotation, level.rest_transform().rotation);
    }

    #[test]
    fn test_resume_does_not_spike_velocity() {
        let mut registry = ColliderRegistry::new();
        let mut bone = bone_with(PhysicsConfig::default());
        let conf = *bone.config();
        bone.update_config(&conf, false, false, &mut registry).unwrap();
        bone.compute_velocity(1.0 / 60.0);

        bone.set_suspended(true);
        let mut node = rest_node();
        node.parent_world.translation.y += 30.0;
        bone.sync_node(&node);
        bone.set_suspended(false);
        bone.compute_velocity(1.0 / 60.0);
        assert_eq!(bone.velocity(), Vec3::ZERO);

        node.parent_world.translation.y += 1.0;
        bone.sync_node(&node);
        bone.compute_velocity(0.5);
        assert_relative_eq!(bone.velocity().y, 2.0, epsilon = 1e-4);
    }
}
