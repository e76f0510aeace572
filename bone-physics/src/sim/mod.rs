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
//! Per-bone and per-actor simulation state

mod bone;
mod collider;
mod object;

pub use bone::{PendingForce, SpringBone, MAX_CONTACT_DAMPING, MAX_PENDING_FORCES};
pub(crate) use bone::same_cluster;
pub use collider::{Collider, ColliderId};
pub use object::{create_descriptor_list, ActorInfo, BoneDescriptor, BoneInfo, NodeValidation, SimObject};
