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
//! Debug render data

use glam::Vec3;

use crate::ActorHandle;

/// One active collider sphere
#[derive(Debug, Clone, PartialEq)]
pub struct DebugSphere {
    /// Owning actor
    pub actor: ActorHandle,
    /// Node name
    pub bone: String,
    /// World-space centre
    pub center: Vec3,
    /// Scaled radius
    pub radius: f32,
    /// Whether the bone was in contact during the last sub-step
    pub in_contact: bool,
}

/// Collider spheres and contact flags after a tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebugSnapshot {
    /// Active spheres in actor then bone order
    pub spheres: Vec<DebugSphere>,
    /// Contacts resolved during the tick
    pub contacts: usize,
}

impl DebugSnapshot {
    /// Number of spheres flagged in contact
    pub fn spheres_in_contact(&self) -> usize {
        self.spheres.iter().filter(|s| s.in_contact).count()
    }
}
