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
//! Actor handles
//!
//! Actors are the simulated characters. The simulation never owns the engine
//! object behind an actor; it only keeps an opaque handle that the skeleton
//! provider knows how to resolve.

use std::fmt;

/// Opaque, stable identifier for a simulated character
///
/// The raw value is whatever the host engine uses to reference the object.
/// Handles are ordered so that iteration over the active actor map is
/// deterministic.
///
/// # Examples
///
/// ```
/// use bone_physics::ActorHandle;
///
/// let handle = ActorHandle::new(0x14);
/// assert_eq!(handle.raw(), 0x14);
/// assert_eq!(handle.to_string(), "Actor(00000014)");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActorHandle(u64);

impl ActorHandle {
    /// Create a handle from a raw engine value
    pub const fn new(raw: u64) -> Self {
        ActorHandle(raw)
    }

    /// Get the raw engine value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ActorHandle {
    fn from(raw: u64) -> Self {
        ActorHandle::new(raw)
    }
}

impl fmt::Display for ActorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Actor({:08X})", self.0)
    }
}
