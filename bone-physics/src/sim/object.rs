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
//! Per-actor simulation state
//!
//! A [`SimObject`] owns every [`SpringBone`] of one actor and indexes them by
//! configuration group. Bones are created once from a descriptor list and
//! then updated in place; configuration reloads never reallocate them.

use std::collections::BTreeMap;

use glam::Vec3;

use crate::collision::{BoneRef, CollisionBody, ColliderRegistry};
use crate::config::{ConfigSnapshot, EffectiveConfig, GroupName, NodeConfig};
use crate::error::{SimError, SimResult};
use crate::skeleton::{BoneNode, SkeletonProvider};
use crate::ActorHandle;

use super::SpringBone;

/// A skeleton node matched against a configured node name
#[derive(Debug, Clone, PartialEq)]
pub struct BoneDescriptor {
    /// Resolved node
    pub node: BoneNode,
    /// Node entry from the snapshot
    pub config: NodeConfig,
}

/// Walk the actor's skeleton and match every configured node name
///
/// Fails with [`SimError::NoSimulatedBones`] when none of the names exist,
/// which includes skeletons that are not loaded yet.
pub fn create_descriptor_list(
    actor: ActorHandle,
    skeleton: &dyn SkeletonProvider,
    config: &ConfigSnapshot,
) -> SimResult<Vec<BoneDescriptor>> {
    let names: Vec<&str> = config.nodes().map(|(name, _)| name).collect();
    let descriptors: Vec<BoneDescriptor> = skeleton
        .resolve_bones(actor, &names)
        .into_iter()
        .filter_map(|node| {
            let config = config.node(&node.name)?.clone();
            Some(BoneDescriptor { node, config })
        })
        .collect();

    if descriptors.is_empty() {
        return Err(SimError::NoSimulatedBones(actor));
    }
    Ok(descriptors)
}

/// Name and group of one bone, for live editing tools
#[derive(Debug, Clone, PartialEq)]
pub struct BoneInfo {
    /// Node name
    pub name: String,
    /// Group name as configured
    pub group: String,
    /// Movement toggle
    pub movement: bool,
    /// Collision toggle
    pub collision: bool,
}

/// Read-only summary of one simulated actor
#[derive(Debug, Clone, PartialEq)]
pub struct ActorInfo {
    /// Actor handle
    pub actor: ActorHandle,
    /// Whether the actor is suspended
    pub suspended: bool,
    /// Simulated bones in creation order
    pub bones: Vec<BoneInfo>,
    /// Distinct group names
    pub groups: Vec<String>,
}

/// Bones that vanished during [`SimObject::validate_nodes`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeValidation {
    /// Names of the dropped bones
    pub dropped: Vec<String>,
}

/// All simulated bones of one actor
#[derive(Debug, Clone)]
pub struct SimObject {
    actor: ActorHandle,
    bones: Vec<SpringBone>,
    groups: BTreeMap<GroupName, Vec<usize>>,
    suspended: bool,
    weight: f32,
}

impl SimObject {
    /// Create the bones of an actor and apply the configuration
    ///
    /// Collider creation failures are logged; the bone stays simulated
    /// without a collider.
    pub fn new(
        actor: ActorHandle,
        descriptors: Vec<BoneDescriptor>,
        config: EffectiveConfig<'_>,
        weight: f32,
        registry: &mut ColliderRegistry,
    ) -> Self {
        let global = config.global();
        let bones = descriptors
            .iter()
            .map(|desc| {
                let conf = config.physics(&desc.config.group);
                SpringBone::new(actor, &desc.node, &desc.config, conf, global, weight)
            })
            .collect();

        let mut object = SimObject {
            actor,
            bones,
            groups: BTreeMap::new(),
            suspended: false,
            weight,
        };
        object.update_config(config, registry);
        object
    }

    /// Resolve the skeleton and create the object in one go
    pub fn build(
        actor: ActorHandle,
        skeleton: &dyn SkeletonProvider,
        config: EffectiveConfig<'_>,
        registry: &mut ColliderRegistry,
    ) -> SimResult<Self> {
        if !skeleton.is_valid(actor) {
            return Err(SimError::ActorNotFound(actor));
        }
        let descriptors = create_descriptor_list(actor, skeleton, config.snapshot())?;
        Ok(SimObject::new(
            actor,
            descriptors,
            config,
            skeleton.weight(actor),
            registry,
        ))
    }

    /// Integrate every movement-enabled bone for one sub-step
    pub fn update_movement(&mut self, dt: f32) {
        if self.suspended {
            return;
        }
        for bone in self.bones.iter_mut().filter(|bone| bone.movement()) {
            bone.integrate(dt);
        }
    }

    /// Track animation-driven velocity of movement-disabled bones
    ///
    /// `dt` is the simulated time covered since the previous call.
    pub fn update_velocity(&mut self, dt: f32) {
        if self.suspended {
            return;
        }
        for bone in self.bones.iter_mut().filter(|bone| !bone.movement()) {
            bone.compute_velocity(dt);
        }
    }

    /// Pull the current parent transforms from the skeleton
    ///
    /// Fails on the first missing node; bones read before it keep their new
    /// transforms.
    pub fn read_transforms(&mut self, skeleton: &dyn SkeletonProvider) -> SimResult<()> {
        for bone in &mut self.bones {
            let node = skeleton
                .bone(self.actor, bone.name())
                .ok_or_else(|| SimError::MissingNode {
                    actor: self.actor,
                    node: bone.name().to_string(),
                })?;
            bone.sync_node(&node);
        }
        Ok(())
    }

    /// Write the simulated local transforms back to the skeleton
    ///
    /// Bones whose movement was just turned off get their rest pose written
    /// once.
    pub fn commit(&mut self, skeleton: &mut dyn SkeletonProvider) -> SimResult<()> {
        if self.suspended {
            return Ok(());
        }
        let actor = self.actor;
        for bone in self.bones.iter_mut().filter(|b| b.needs_commit()) {
            skeleton.write_local(actor, bone.name(), bone.local_transform())?;
            bone.mark_committed();
        }
        Ok(())
    }

    /// Re-resolve each bone's group and apply its parameters in place
    ///
    /// A bone whose node is no longer configured keeps existing but is
    /// neither moved nor collided.
    pub fn update_config(&mut self, config: EffectiveConfig<'_>, registry: &mut ColliderRegistry) {
        let global = config.global();
        for bone in &mut self.bones {
            bone.set_limits(global.max_velocity, global.max_diff);
            let (conf, collision, movement) = match config.node(bone.name()) {
                Some(node) => {
                    bone.set_node_config(node);
                    (
                        config.physics(&node.group),
                        global.collisions && node.collision,
                        node.movement,
                    )
                }
                None => {
                    log::debug!("{}: {} is no longer configured", self.actor, bone.name());
                    (*bone.config(), false, false)
                }
            };
            if let Err(err) = bone.update_config(&conf, collision, movement, registry) {
                log::warn!("collider creation failed: {err}");
            }
        }
        self.rebuild_groups();
    }

    /// Re-read weight-dependent collider geometry
    pub fn update_weight(&mut self, weight: f32, registry: &mut ColliderRegistry) {
        self.weight = weight;
        for bone in &mut self.bones {
            if let Err(err) = bone.update_weight(weight, registry) {
                log::warn!("collider update failed: {err}");
            }
        }
    }

    /// Queue a force on every bone of a group, matched case-insensitively
    ///
    /// Returns the number of bones that accepted it.
    pub fn apply_force(&mut self, steps: u32, group: &str, force: Vec3) -> usize {
        let Some(indices) = self.groups.get(&GroupName::new(group)) else {
            return 0;
        };
        let mut applied = 0;
        for &idx in indices {
            if self.bones[idx].apply_force(steps, force) {
                applied += 1;
            }
        }
        applied
    }

    /// Drop bones whose node vanished and refresh the others
    pub fn validate_nodes(
        &mut self,
        skeleton: &dyn SkeletonProvider,
        registry: &mut ColliderRegistry,
    ) -> NodeValidation {
        let mut report = NodeValidation::default();
        let actor = self.actor;
        self.bones.retain_mut(|bone| match skeleton.bone(actor, bone.name()) {
            Some(node) => {
                bone.sync_node(&node);
                true
            }
            None => {
                bone.detach_node(registry);
                report.dropped.push(bone.name().to_string());
                false
            }
        });
        if !report.dropped.is_empty() {
            log::info!("{}: dropped vanished nodes {:?}", self.actor, report.dropped);
            self.rebuild_groups();
        }
        report
    }

    /// Check if the skeleton gained configured nodes this object lacks
    pub fn has_new_nodes(&self, skeleton: &dyn SkeletonProvider, config: &ConfigSnapshot) -> bool {
        config
            .nodes()
            .filter(|(name, _)| self.bone(name).is_none())
            .any(|(name, _)| skeleton.bone(self.actor, name).is_some())
    }

    /// Snap every bone to its rest pose
    pub fn reset(&mut self) {
        for bone in &mut self.bones {
            bone.reset();
        }
    }

    /// Gate movement and collision without touching bone state
    pub fn set_suspended(&mut self, suspended: bool) {
        if self.suspended == suspended {
            return;
        }
        self.suspended = suspended;
        for bone in &mut self.bones {
            bone.set_suspended(suspended);
        }
    }

    /// Append the collision bodies of this sub-step
    pub fn collision_bodies(&self, out: &mut Vec<CollisionBody>) {
        if self.suspended {
            return;
        }
        out.extend(self.bones.iter().enumerate().filter_map(|(bone, b)| {
            b.collision_body(BoneRef {
                actor: self.actor,
                bone,
            })
        }));
    }

    /// Apply a collision result to one bone
    pub fn apply_collision(&mut self, bone: usize, center: Vec3, velocity: Vec3) {
        if let Some(bone) = self.bones.get_mut(bone) {
            bone.apply_collision(center, velocity);
        }
    }

    /// Flag a contact on one bone
    pub fn mark_contact(&mut self, bone: usize, depth: f32) {
        if let Some(bone) = self.bones.get_mut(bone) {
            bone.on_contact(depth);
        }
    }

    /// Clear contact flags on every bone
    pub fn clear_contacts(&mut self) {
        for bone in &mut self.bones {
            bone.clear_contact();
        }
    }

    /// Release every collider
    pub fn release(&mut self, registry: &mut ColliderRegistry) {
        for bone in &mut self.bones {
            bone.release(registry);
        }
    }

    /// Check if any bone currently has an active collider
    pub fn has_active_colliders(&self) -> bool {
        !self.suspended
            && self
                .bones
                .iter()
                .any(|bone| bone.collider().is_some_and(|c| c.is_active()))
    }

    /// Summary for tools
    pub fn info(&self) -> ActorInfo {
        ActorInfo {
            actor: self.actor,
            suspended: self.suspended,
            bones: self
                .bones
                .iter()
                .map(|bone| BoneInfo {
                    name: bone.name().to_string(),
                    group: bone.group().to_string(),
                    movement: bone.movement(),
                    collision: bone.collision(),
                })
                .collect(),
            groups: self.groups.keys().map(|g| g.to_string()).collect(),
        }
    }

    /// Actor handle
    pub fn actor(&self) -> ActorHandle {
        self.actor
    }

    /// All bones
    pub fn bones(&self) -> &[SpringBone] {
        &self.bones
    }

    /// Bone by node name
    pub fn bone(&self, name: &str) -> Option<&SpringBone> {
        self.bones.iter().find(|bone| bone.name() == name)
    }

    /// Bones of a group
    pub fn group(&self, group: &str) -> impl Iterator<Item = &SpringBone> {
        self.groups
            .get(&GroupName::new(group))
            .into_iter()
            .flatten()
            .map(|&idx| &self.bones[idx])
    }

    /// Distinct group names
    pub fn group_names(&self) -> impl Iterator<Item = &GroupName> {
        self.groups.keys()
    }

    /// Check if the object has no bones left
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Whether the object is suspended
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Weight used for collider geometry
    pub fn weight(&self) -> f32 {
        self.weight
    }

    fn rebuild_groups(&mut self) {
        self.groups.clear();
        for (idx, bone) in self.bones.iter().enumerate() {
            self.groups.entry(bone.group().clone()).or_default().push(idx);
        }
    }
}
