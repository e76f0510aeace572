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
//! Immutable configuration snapshots
//!
//! Publishers build a complete [`ConfigSnapshot`] and swap it into a
//! [`ConfigStore`]. The controller clones the current `Arc` once per tick, so
//! a tick never observes a half-applied update.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use super::{ArmorOverride, GlobalPhysics, GroupName, NodeConfig, PhysicsConfig};

/// A consistent view of every simulation setting
#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot {
    global: GlobalPhysics,
    groups: HashMap<GroupName, PhysicsConfig>,
    nodes: BTreeMap<String, NodeConfig>,
    default_physics: PhysicsConfig,
    revision: u64,
}

impl ConfigSnapshot {
    /// Start building a snapshot
    pub fn builder() -> ConfigSnapshotBuilder {
        ConfigSnapshotBuilder::default()
    }

    /// Global settings
    pub fn global(&self) -> &GlobalPhysics {
        &self.global
    }

    /// Parameters of a group, falling back to the default parameters
    pub fn physics(&self, group: &GroupName) -> &PhysicsConfig {
        self.groups.get(group).unwrap_or(&self.default_physics)
    }

    /// Node entry for a skeleton node name
    pub fn node(&self, name: &str) -> Option<&NodeConfig> {
        self.nodes.get(name)
    }

    /// Every configured node name with its entry, in name order
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &NodeConfig)> {
        self.nodes.iter().map(|(name, node)| (name.as_str(), node))
    }

    /// Number of configured groups
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Monotonic revision assigned by the store
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Layer an actor's armor override on top of this snapshot
    pub fn effective<'a>(&'a self, armor: Option<&'a ArmorOverride>) -> EffectiveConfig<'a> {
        EffectiveConfig {
            snapshot: self,
            armor,
        }
    }
}

/// Builder for [`ConfigSnapshot`]
///
/// # Examples
///
/// ```
/// use bone_physics::config::{ConfigSnapshot, NodeConfig, PhysicsConfig};
///
/// let snapshot = ConfigSnapshot::builder()
///     .group("Breast", PhysicsConfig::default())
///     .node("NPC L Breast", NodeConfig::new("Breast"))
///     .build();
/// assert!(snapshot.node("NPC L Breast").is_some());
/// assert_eq!(snapshot.group_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshotBuilder {
    global: GlobalPhysics,
    groups: HashMap<GroupName, PhysicsConfig>,
    nodes: BTreeMap<String, NodeConfig>,
    default_physics: PhysicsConfig,
}

impl ConfigSnapshotBuilder {
    /// Set the global settings
    pub fn global(mut self, global: GlobalPhysics) -> Self {
        self.global = global;
        self
    }

    /// Add or replace a group
    pub fn group(mut self, name: impl Into<GroupName>, physics: PhysicsConfig) -> Self {
        self.groups.insert(name.into(), physics);
        self
    }

    /// Add or replace a node entry
    pub fn node(mut self, name: impl Into<String>, node: NodeConfig) -> Self {
        self.nodes.insert(name.into(), node);
        self
    }

    /// Parameters used by nodes whose group is not configured
    pub fn default_physics(mut self, physics: PhysicsConfig) -> Self {
        self.default_physics = physics;
        self
    }

    /// Finish the snapshot, clamping every value into range
    pub fn build(self) -> ConfigSnapshot {
        let ConfigSnapshotBuilder {
            mut global,
            mut groups,
            mut nodes,
            mut default_physics,
        } = self;

        if let Err(err) = global.validate() {
            log::warn!("global physics: {err}");
        }
        let mut clamped = global.sanitize();
        for (name, physics) in groups.iter_mut() {
            if let Err(err) = physics.validate() {
                log::warn!("group {name}: {err}");
            }
            clamped += physics.sanitize();
        }
        clamped += default_physics.sanitize();
        for node in nodes.values_mut() {
            clamped += node.sanitize();
        }
        if clamped > 0 {
            log::info!("configuration snapshot: {clamped} value(s) clamped at ingestion");
        }

        ConfigSnapshot {
            global,
            groups,
            nodes,
            default_physics,
            revision: 0,
        }
    }
}

/// Snapshot plus the armor override of one actor
#[derive(Debug, Clone, Copy)]
pub struct EffectiveConfig<'a> {
    snapshot: &'a ConfigSnapshot,
    armor: Option<&'a ArmorOverride>,
}

impl<'a> EffectiveConfig<'a> {
    /// Underlying snapshot
    pub fn snapshot(&self) -> &'a ConfigSnapshot {
        self.snapshot
    }

    /// Global settings
    pub fn global(&self) -> &'a GlobalPhysics {
        self.snapshot.global()
    }

    /// Node entry for a skeleton node name
    pub fn node(&self, name: &str) -> Option<&'a NodeConfig> {
        self.snapshot.node(name)
    }

    /// Group parameters with the armor override applied
    pub fn physics(&self, group: &GroupName) -> PhysicsConfig {
        let base = *self.snapshot.physics(group);
        match self.armor {
            Some(armor) => armor.apply(group, base),
            None => base,
        }
    }
}

/// Shared, swappable configuration provider
///
/// Cloning the store shares the underlying slot.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    current: Arc<RwLock<Arc<ConfigSnapshot>>>,
}

impl ConfigStore {
    /// Create a store holding `snapshot`
    pub fn new(snapshot: ConfigSnapshot) -> Self {
        ConfigStore {
            current: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    /// Capture the current snapshot
    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        let guard = self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&*guard)
    }

    /// Replace the current snapshot; returns the assigned revision
    pub fn publish(&self, mut snapshot: ConfigSnapshot) -> u64 {
        let mut guard = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        snapshot.revision = guard.revision + 1;
        let revision = snapshot.revision;
        *guard = Arc::new(snapshot);
        revision
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        ConfigStore::new(ConfigSnapshot::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ParamOverride, PhysicsParam};

    fn sample() -> ConfigSnapshot {
        let breast = PhysicsConfig {
            stiffness: 55.0,
            ..PhysicsConfig::default()
        };
        ConfigSnapshot::builder()
            .group("Breast", breast)
            .node("NPC L Breast", NodeConfig::new("Breast"))
            .node("NPC Belly", NodeConfig::new("Belly").with_collision(false))
            .build()
    }

    #[test]
    fn test_group_lookup_is_case_insensitive() {
        let snapshot = sample();
        assert_eq!(snapshot.physics(&GroupName::new("BREAST")).stiffness, 55.0);
        // unknown groups use the default parameters
        assert_eq!(
            snapshot.physics(&GroupName::new("Belly")).stiffness,
            PhysicsConfig::default().stiffness
        );
    }

    #[test]
    fn test_build_sanitizes() {
        let bad = PhysicsConfig {
            mass: 0.0,
            ..PhysicsConfig::default()
        };
        let snapshot = ConfigSnapshot::builder().group("Butt", bad).build();
        assert_eq!(snapshot.physics(&GroupName::new("butt")).mass, 1.0);
    }

    #[test]
    fn test_store_publish_increments_revision() {
        let store = ConfigStore::new(sample());
        let before = store.snapshot();
        assert_eq!(before.revision(), 0);

        let shared = store.clone();
        assert_eq!(shared.publish(sample()), 1);
        assert_eq!(store.snapshot().revision(), 1);
        // a captured snapshot is unaffected by later publishes
        assert_eq!(before.revision(), 0);
    }

    #[test]
    fn test_effective_config_applies_armor() {
        let snapshot = sample();
        let mut armor = ArmorOverride::new();
        armor.insert("Breast", ParamOverride::set(PhysicsParam::Stiffness, 5.0));
        let eff = snapshot.effective(Some(&armor));
        assert_eq!(eff.physics(&GroupName::new("breast")).stiffness, 5.0);
        assert_eq!(snapshot.effective(None).physics(&GroupName::new("breast")).stiffness, 55.0);
        assert!(eff.node("NPC Belly").is_some_and(|n| !n.collision));
    }
}
