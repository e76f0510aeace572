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
//! Sphere collision proxies
//!
//! A [`Collider`] is owned by exactly one spring bone. Its registration with
//! the [`ColliderRegistry`] is what makes the collision engine see it; the
//! proxy never points back at the bone. The collision engine refers to the
//! owner through a [`BoneRef`](crate::collision::BoneRef) index instead.

use std::fmt;

use glam::Vec3;

use crate::collision::ColliderRegistry;
use crate::math::Transform;

/// Registration id of a collider
///
/// Ids are handed out in increasing order, which is also the order in which
/// the collision engine visits colliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColliderId(pub(crate) u64);

impl ColliderId {
    /// Raw id value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ColliderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Collider#{}", self.0)
    }
}

/// Sphere proxy attached to a bone node
///
/// # Examples
///
/// ```
/// use bone_physics::collision::ColliderRegistry;
/// use bone_physics::math::Transform;
/// use bone_physics::sim::Collider;
/// use glam::Vec3;
///
/// let mut registry = ColliderRegistry::new();
/// let mut collider = Collider::new(2.0, Vec3::ZERO);
/// assert!(!collider.is_active());
///
/// let node = Transform::new(glam::Mat3::IDENTITY, Vec3::ZERO, 1.5);
/// assert!(collider.create(&mut registry, Some(&node)));
/// assert!(collider.is_active());
/// assert_eq!(collider.scaled_radius(), 3.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    id: Option<ColliderId>,
    radius: f32,
    node: Transform,
    offset: Vec3,
    center: Vec3,
    enabled: bool,
}

impl Collider {
    /// Create an unregistered collider
    pub fn new(radius: f32, offset: Vec3) -> Self {
        Collider {
            id: None,
            radius,
            node: Transform::IDENTITY,
            offset,
            center: Vec3::ZERO,
            enabled: true,
        }
    }

    /// Register the proxy and place it on `node`
    ///
    /// Returns `false` if the node is missing. Creating an already created
    /// collider only refreshes its placement.
    pub fn create(&mut self, registry: &mut ColliderRegistry, node: Option<&Transform>) -> bool {
        let Some(node) = node else {
            return false;
        };
        if self.id.is_none() {
            self.id = Some(registry.register());
        }
        self.update(node);
        true
    }

    /// Release the proxy
    ///
    /// Destroying an already destroyed collider is a no-op that also returns
    /// `true`.
    pub fn destroy(&mut self, registry: &mut ColliderRegistry) -> bool {
        if let Some(id) = self.id.take() {
            registry.release(id);
        }
        true
    }

    /// Re-synchronize the sphere with the node's world transform
    pub fn update(&mut self, node: &Transform) {
        self.node = *node;
        self.center = node.transform_point(self.offset);
    }

    /// Set the unscaled radius
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
    }

    /// Set the node-space offset of the sphere centre
    pub fn set_sphere_offset(&mut self, offset: Vec3) {
        self.offset = offset;
        self.center = self.node.transform_point(offset);
    }

    /// Keep the registration but take the sphere out of collision, or put it back
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether the sphere is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Check if the collision engine should consider this collider
    pub fn is_active(&self) -> bool {
        self.id.is_some() && self.enabled && self.scaled_radius() > 0.0
    }

    /// Check if the proxy is registered
    pub fn is_created(&self) -> bool {
        self.id.is_some()
    }

    /// Registration id, if created
    pub fn id(&self) -> Option<ColliderId> {
        self.id
    }

    /// Unscaled radius
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Radius scaled by the node's current scale
    pub fn scaled_radius(&self) -> f32 {
        self.radius * self.node.scale
    }

    /// Node-space offset
    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    /// World-space sphere centre
    pub fn center(&self) -> Vec3 {
        self.center
    }
}
