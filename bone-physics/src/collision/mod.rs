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
//! Sphere-sphere contact detection and resolution
//!
//! Once per sub-step, after every bone has integrated, the controller gathers
//! one [`CollisionBody`] per active collider and hands the batch to
//! [`CollisionEngine::resolve`]. Overlapping pairs exchange velocity along the
//! contact normal as in a 1-D collision between point masses, then are pushed
//! apart by the penetration depth, weighted by inverse mass.
//!
//! Bodies are visited in ascending [`ColliderId`] order and candidate pairs are
//! processed in sorted order, so identical input produces identical output.

mod broadphase;
mod registry;

pub use broadphase::sweep_and_prune;
pub use registry::ColliderRegistry;

use glam::Vec3;

use crate::math::EPSILON;
use crate::sim::{same_cluster, ColliderId};
use crate::ActorHandle;

/// Penetration below this depth is treated as touching, not overlapping
pub const CONTACT_SLOP: f32 = 1e-5;

/// Hard ceiling on resolution passes per sub-step
pub const MAX_PASSES: u32 = 1024;

/// Non-owning reference from a collider to its bone
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoneRef {
    /// Owning actor
    pub actor: ActorHandle,
    /// Index of the bone inside the actor's [`SimObject`](crate::sim::SimObject)
    pub bone: usize,
}

/// Collider state handed to the engine for one sub-step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionBody {
    /// Collider id, used for ordering
    pub id: ColliderId,
    /// Bone that owns the collider
    pub owner: BoneRef,
    /// Sphere centre in world space
    pub center: Vec3,
    /// Scaled radius
    pub radius: f32,
    /// Velocity of the owning bone
    pub velocity: Vec3,
    /// Inverse mass, 0 for static anchors
    pub inv_mass: f32,
    /// Coefficient of restitution
    pub restitution: f32,
    /// Collision cluster id, 0 for none
    pub group_id: u32,
    /// Id derived from the parent node
    pub parent_id: u64,
}

impl CollisionBody {
    /// Check if both bodies belong to the same collision cluster
    pub fn is_same_group(&self, other: &CollisionBody) -> bool {
        same_cluster(self.parent_id, self.group_id, other.parent_id, other.group_id)
    }

    fn is_static(&self) -> bool {
        self.inv_mass <= 0.0
    }
}

/// A resolved contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEvent {
    /// First participant
    pub a: BoneRef,
    /// Second participant
    pub b: BoneRef,
    /// Unit normal pointing from `a` to `b`
    pub normal: Vec3,
    /// Penetration depth before resolution
    pub depth: f32,
}

/// Engine settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionSettings {
    /// Skip pairs whose bones belong to the same cluster
    pub ignore_same_group: bool,
    /// Minimum pass budget per sub-step
    ///
    /// The engine keeps iterating until no pair penetrates deeper than
    /// [`CONTACT_SLOP`]; the budget grows with the body count up to
    /// [`MAX_PASSES`].
    pub iterations: u32,
}

impl Default for CollisionSettings {
    fn default() -> Self {
        CollisionSettings {
            ignore_same_group: false,
            iterations: 4,
        }
    }
}

/// Counters for the last call to [`CollisionEngine::resolve`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionStats {
    /// Bodies considered
    pub bodies: usize,
    /// Pairs reported by the broad phase, over all passes
    pub candidate_pairs: usize,
    /// Contacts resolved, over all passes
    pub contacts: usize,
    /// Pairs skipped because both bodies are static
    pub skipped_static: usize,
    /// Pairs skipped because both bodies share a cluster
    pub skipped_same_group: usize,
    /// Passes run
    pub passes: u32,
}

/// Contact detection and resolution for sphere colliders
///
/// # Examples
///
/// ```
/// use bone_physics::collision::{BoneRef, CollisionBody, CollisionEngine, ColliderRegistry};
/// use bone_physics::ActorHandle;
/// use glam::Vec3;
///
/// let mut registry = ColliderRegistry::new();
/// let owner = BoneRef { actor: ActorHandle::new(1), bone: 0 };
/// let make = |center: Vec3, id| CollisionBody {
///     id,
///     owner,
///     center,
///     radius: 1.0,
///     velocity: Vec3::ZERO,
///     inv_mass: 1.0,
///     restitution: 1.0,
///     group_id: 0,
///     parent_id: 0,
/// };
/// let mut bodies = vec![
///     make(Vec3::ZERO, registry.register()),
///     make(Vec3::new(1.5, 0.0, 0.0), registry.register()),
/// ];
///
/// let mut engine = CollisionEngine::new();
/// let contacts = engine.resolve(&mut bodies);
/// assert_eq!(contacts.len(), 1);
/// assert!(bodies[0].center.distance(bodies[1].center) >= 2.0 - 1e-5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CollisionEngine {
    settings: CollisionSettings,
    stats: CollisionStats,
}

impl CollisionEngine {
    /// Create an engine with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with custom settings
    pub fn with_settings(settings: CollisionSettings) -> Self {
        CollisionEngine {
            settings,
            stats: CollisionStats::default(),
        }
    }

    /// Current settings
    pub fn settings(&self) -> &CollisionSettings {
        &self.settings
    }

    /// Toggle skipping of same-cluster pairs
    pub fn set_ignore_same_group(&mut self, ignore: bool) {
        self.settings.ignore_same_group = ignore;
    }

    /// Counters of the last resolve
    pub fn stats(&self) -> &CollisionStats {
        &self.stats
    }

    /// Detect and resolve every contact among `bodies`
    ///
    /// Bodies are sorted by id in place. Centres and velocities are updated;
    /// callers read the results back by [`BoneRef`].
    pub fn resolve(&mut self, bodies: &mut [CollisionBody]) -> Vec<ContactEvent> {
        bodies.sort_by_key(|body| body.id);
        self.stats = CollisionStats {
            bodies: bodies.len(),
            ..CollisionStats::default()
        };

        let mut contacts = Vec::new();
        if bodies.len() < 2 {
            return contacts;
        }

        let budget = pass_budget(self.settings.iterations, bodies.len());
        let mut settled = false;
        for _ in 0..budget {
            self.stats.passes += 1;
            let pairs = sweep_and_prune(bodies);
            self.stats.candidate_pairs += pairs.len();

            let mut resolved = 0;
            for (i, k) in pairs {
                let (a, b) = pair_mut(bodies, i, k);
                if a.is_static() && b.is_static() {
                    self.stats.skipped_static += 1;
                    continue;
                }
                if self.settings.ignore_same_group && a.is_same_group(b) {
                    self.stats.skipped_same_group += 1;
                    continue;
                }
                if let Some(contact) = resolve_pair(a, b) {
                    contacts.push(contact);
                    resolved += 1;
                }
            }

            self.stats.contacts += resolved;
            if resolved == 0 {
                settled = true;
                break;
            }
        }
        if !settled {
            log::debug!(
                "collision: {} bodies still overlapping after {} passes",
                bodies.len(),
                self.stats.passes
            );
        }

        contacts
    }
}

/// Passes allowed for `bodies` colliders
///
/// Gauss-Seidel on a chain of touching spheres converges in O(n^2) passes.
fn pass_budget(iterations: u32, bodies: usize) -> u32 {
    let n = u32::try_from(bodies).unwrap_or(u32::MAX);
    let scaled = n.saturating_mul(n).saturating_mul(4);
    iterations.max(scaled).clamp(1, MAX_PASSES.max(iterations))
}

fn pair_mut<T>(items: &mut [T], i: usize, k: usize) -> (&mut T, &mut T) {
    debug_assert!(i < k);
    let (head, tail) = items.split_at_mut(k);
    (&mut head[i], &mut tail[0])
}

/// Resolve one pair in place; `None` if the spheres do not penetrate
fn resolve_pair(a: &mut CollisionBody, b: &mut CollisionBody) -> Option<ContactEvent> {
    let delta = b.center - a.center;
    let sum = a.radius + b.radius;
    let dist_sq = delta.length_squared();
    if a.radius <= 0.0 || b.radius <= 0.0 || dist_sq >= sum * sum {
        return None;
    }

    let dist = dist_sq.sqrt();
    let depth = sum - dist;
    if depth <= CONTACT_SLOP {
        return None;
    }
    // coincident centres: separate along world up
    let normal = if dist > EPSILON { delta / dist } else { Vec3::Z };
    let inv_sum = a.inv_mass + b.inv_mass;

    let approach = (b.velocity - a.velocity).dot(normal);
    if approach < 0.0 {
        let restitution = a.restitution.max(b.restitution);
        let impulse = -(1.0 + restitution) * approach / inv_sum;
        a.velocity -= normal * (impulse * a.inv_mass);
        b.velocity += normal * (impulse * b.inv_mass);
    }

    let correction = normal * (depth / inv_sum);
    a.center -= correction * a.inv_mass;
    b.center += correction * b.inv_mass;

    Some(ContactEvent {
        a: a.owner,
        b: b.owner,
        normal,
        depth,
    })
}
