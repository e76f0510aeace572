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
//! Skeleton access
//!
//! The simulation reads bone transforms from, and writes simulated local
//! transforms back to, a [`SkeletonProvider`]. Engines implement the trait
//! over their scene graph; [`MemorySkeleton`] is a self-contained version used
//! by tests, benchmarks and the demo.

use std::collections::{BTreeMap, HashMap};

use glam::Vec3;

use crate::error::{SimError, SimResult};
use crate::math::Transform;
use crate::ActorHandle;

/// A resolved skeleton node
#[derive(Debug, Clone, PartialEq)]
pub struct BoneNode {
    /// Node name
    pub name: String,
    /// Name of the parent node, if any
    pub parent_name: Option<String>,
    /// World transform of the parent node
    pub parent_world: Transform,
    /// Transform relative to the parent
    pub local: Transform,
}

impl BoneNode {
    /// World transform of the node
    pub fn world(&self) -> Transform {
        self.parent_world.mul_transform(&self.local)
    }
}

/// Bone resolver and transform sink for simulated actors
pub trait SkeletonProvider {
    /// Check if the actor's engine object still exists
    fn is_valid(&self, actor: ActorHandle) -> bool;

    /// Check if the actor is loaded and in simulation range
    fn is_attached(&self, actor: ActorHandle) -> bool {
        self.is_valid(actor)
    }

    /// Actor body weight in `0..=100`
    fn weight(&self, _actor: ActorHandle) -> f32 {
        50.0
    }

    /// Look up one node by name
    fn bone(&self, actor: ActorHandle, name: &str) -> Option<BoneNode>;

    /// Look up every node in `names` that exists on the actor's skeleton
    ///
    /// Returns an empty list when the skeleton is not loaded yet.
    fn resolve_bones(&self, actor: ActorHandle, names: &[&str]) -> Vec<BoneNode> {
        names
            .iter()
            .filter_map(|name| self.bone(actor, name))
            .collect()
    }

    /// Write a node's simulated local transform
    fn write_local(&mut self, actor: ActorHandle, name: &str, local: &Transform) -> SimResult<()>;
}

#[derive(Debug, Clone)]
struct MemoryNode {
    parent_name: Option<String>,
    parent_world: Transform,
    local: Transform,
}

#[derive(Debug, Clone)]
struct MemoryActor {
    attached: bool,
    weight: f32,
    nodes: BTreeMap<String, MemoryNode>,
}

/// In-memory [`SkeletonProvider`]
///
/// Each node stores its parent's world transform directly, so moving a
/// character is a matter of updating parent transforms.
///
/// # Examples
///
/// ```
/// use bone_physics::skeleton::{MemorySkeleton, SkeletonProvider};
/// use bone_physics::math::Transform;
/// use bone_physics::ActorHandle;
/// use glam::Vec3;
///
/// let actor = ActorHandle::new(1);
/// let mut skeleton = MemorySkeleton::new();
/// skeleton.add_actor(actor);
/// skeleton.add_bone(actor, "NPC Belly", Some("NPC Spine"), Transform::IDENTITY, Transform::IDENTITY);
///
/// skeleton.translate_actor(actor, Vec3::new(0.0, 10.0, 0.0));
/// let bone = skeleton.bone(actor, "NPC Belly").unwrap();
/// assert_eq!(bone.world().translation, Vec3::new(0.0, 10.0, 0.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySkeleton {
    actors: HashMap<ActorHandle, MemoryActor>,
}

impl MemorySkeleton {
    /// Create an empty skeleton store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an attached actor with weight 50 and no nodes
    pub fn add_actor(&mut self, actor: ActorHandle) {
        self.actors.entry(actor).or_insert(MemoryActor {
            attached: true,
            weight: 50.0,
            nodes: BTreeMap::new(),
        });
    }

    /// Remove an actor, invalidating its handle
    pub fn remove_actor(&mut self, actor: ActorHandle) -> bool {
        self.actors.remove(&actor).is_some()
    }

    /// Add or replace a node
    ///
    /// Registers the actor if needed.
    pub fn add_bone(
        &mut self,
        actor: ActorHandle,
        name: &str,
        parent_name: Option<&str>,
        parent_world: Transform,
        local: Transform,
    ) {
        self.add_actor(actor);
        if let Some(entry) = self.actors.get_mut(&actor) {
            entry.nodes.insert(
                name.to_string(),
                MemoryNode {
                    parent_name: parent_name.map(str::to_string),
                    parent_world,
                    local,
                },
            );
        }
    }

    /// Remove a node; returns `false` if it did not exist
    pub fn remove_bone(&mut self, actor: ActorHandle, name: &str) -> bool {
        self.actors
            .get_mut(&actor)
            .is_some_and(|entry| entry.nodes.remove(name).is_some())
    }

    /// Replace the parent world transform of a node
    pub fn set_parent_world(&mut self, actor: ActorHandle, name: &str, parent_world: Transform) -> bool {
        match self.node_mut(actor, name) {
            Some(node) => {
                node.parent_world = parent_world;
                true
            }
            None => false,
        }
    }

    /// Move every node of an actor by `delta` in world space
    pub fn translate_actor(&mut self, actor: ActorHandle, delta: Vec3) {
        if let Some(entry) = self.actors.get_mut(&actor) {
            for node in entry.nodes.values_mut() {
                node.parent_world.translation += delta;
            }
        }
    }

    /// Set the attached flag
    pub fn set_attached(&mut self, actor: ActorHandle, attached: bool) {
        if let Some(entry) = self.actors.get_mut(&actor) {
            entry.attached = attached;
        }
    }

    /// Set the body weight
    pub fn set_weight(&mut self, actor: ActorHandle, weight: f32) {
        if let Some(entry) = self.actors.get_mut(&actor) {
            entry.weight = weight;
        }
    }

    /// Current local transform of a node
    pub fn local(&self, actor: ActorHandle, name: &str) -> Option<Transform> {
        self.actors
            .get(&actor)
            .and_then(|entry| entry.nodes.get(name))
            .map(|node| node.local)
    }

    fn node_mut(&mut self, actor: ActorHandle, name: &str) -> Option<&mut MemoryNode> {
        self.actors
            .get_mut(&actor)
            .and_then(|entry| entry.nodes.get_mut(name))
    }
}

impl SkeletonProvider for MemorySkeleton {
    fn is_valid(&self, actor: ActorHandle) -> bool {
        self.actors.contains_key(&actor)
    }

    fn is_attached(&self, actor: ActorHandle) -> bool {
        self.actors.get(&actor).is_some_and(|entry| entry.attached)
    }

    fn weight(&self, actor: ActorHandle) -> f32 {
        self.actors.get(&actor).map_or(50.0, |entry| entry.weight)
    }

    fn bone(&self, actor: ActorHandle, name: &str) -> Option<BoneNode> {
        let node = self.actors.get(&actor)?.nodes.get(name)?;
        Some(BoneNode {
            name: name.to_string(),
            parent_name: node.parent_name.clone(),
            parent_world: node.parent_world,
            local: node.local,
        })
    }

    fn write_local(&mut self, actor: ActorHandle, name: &str, local: &Transform) -> SimResult<()> {
        let entry = self
            .actors
            .get_mut(&actor)
            .ok_or(SimError::ActorNotFound(actor))?;
        let node = entry.nodes.get_mut(name).ok_or_else(|| SimError::MissingNode {
            actor,
            node: name.to_string(),
        })?;
        node.local = *local;
        Ok(())
    }
}
