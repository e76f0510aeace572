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
//! Equipment-driven parameter overrides
//!
//! While an actor wears a tracked item, the item's override is layered on top
//! of the shared snapshot for that actor only.

use std::collections::BTreeMap;

use super::{GroupName, PhysicsConfig, PhysicsParam};

/// How an override combines with the snapshot value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideMode {
    /// Replace the value
    Set,
    /// Multiply the value
    Multiply,
}

/// One overridden parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamOverride {
    /// Parameter to change
    pub param: PhysicsParam,
    /// Combination rule
    pub mode: OverrideMode,
    /// Operand
    pub value: f32,
}

impl ParamOverride {
    /// Replace `param` with `value`
    pub fn set(param: PhysicsParam, value: f32) -> Self {
        ParamOverride {
            param,
            mode: OverrideMode::Set,
            value,
        }
    }

    /// Multiply `param` by `value`
    pub fn multiply(param: PhysicsParam, value: f32) -> Self {
        ParamOverride {
            param,
            mode: OverrideMode::Multiply,
            value,
        }
    }

    fn apply(&self, conf: &mut PhysicsConfig) {
        let current = conf.get(self.param);
        let next = match self.mode {
            OverrideMode::Set => self.value,
            OverrideMode::Multiply => current * self.value,
        };
        conf.set(self.param, next);
    }
}

/// Group to parameter override mapping for one actor
///
/// # Examples
///
/// ```
/// use bone_physics::config::{ArmorOverride, ParamOverride, PhysicsConfig, PhysicsParam};
///
/// let mut armor = ArmorOverride::new();
/// armor.insert("Breast", ParamOverride::multiply(PhysicsParam::Stiffness, 2.0));
///
/// let conf = armor.apply(&"breast".into(), PhysicsConfig::default());
/// assert_eq!(conf.stiffness, PhysicsConfig::default().stiffness * 2.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArmorOverride {
    groups: BTreeMap<GroupName, Vec<ParamOverride>>,
}

impl ArmorOverride {
    /// Create an empty override
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an override for a group; later entries apply after earlier ones
    pub fn insert(&mut self, group: impl Into<GroupName>, value: ParamOverride) {
        self.groups.entry(group.into()).or_default().push(value);
    }

    /// Append every entry of `other`
    pub fn merge(&mut self, other: &ArmorOverride) {
        for (group, values) in &other.groups {
            self.groups
                .entry(group.clone())
                .or_default()
                .extend(values.iter().copied());
        }
    }

    /// Check if no group is overridden
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Check if `group` has at least one override
    pub fn overrides(&self, group: &GroupName) -> bool {
        self.groups.contains_key(group)
    }

    /// Apply the overrides of `group` to `conf` and re-clamp the result
    pub fn apply(&self, group: &GroupName, mut conf: PhysicsConfig) -> PhysicsConfig {
        if let Some(values) = self.groups.get(group) {
            for value in values {
                value.apply(&mut conf);
            }
            let clamped = conf.sanitize();
            if clamped > 0 {
                log::debug!("armor override for {group} clamped {clamped} value(s)");
            }
        }
        conf
    }
}
