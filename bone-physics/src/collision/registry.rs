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
//! Collider registration

use std::collections::BTreeSet;

use crate::sim::ColliderId;

/// Hands out collider ids and tracks which are live
///
/// Owned by the controller; every collider created by any bone of any actor
/// registers here.
#[derive(Debug, Clone, Default)]
pub struct ColliderRegistry {
    next: u64,
    live: BTreeSet<ColliderId>,
}

impl ColliderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new collider
    pub fn register(&mut self) -> ColliderId {
        self.next += 1;
        let id = ColliderId(self.next);
        self.live.insert(id);
        id
    }

    /// Release a collider; returns `false` if it was not live
    pub fn release(&mut self, id: ColliderId) -> bool {
        self.live.remove(&id)
    }

    /// Check if a collider is live
    pub fn contains(&self, id: ColliderId) -> bool {
        self.live.contains(&id)
    }

    /// Number of live colliders
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Check if no collider is live
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
