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
//! Simulation configuration
//!
//! The configuration layer is the ingestion boundary: values are validated
//! and clamped here so the integrator can assume sane input.

mod armor;
mod group;
pub(crate) mod physics;
mod snapshot;

pub use armor::{ArmorOverride, OverrideMode, ParamOverride};
pub use group::GroupName;
pub use physics::{Axis, GlobalPhysics, NodeConfig, PhysicsConfig, PhysicsParam};
pub use snapshot::{ConfigSnapshot, ConfigSnapshotBuilder, ConfigStore, EffectiveConfig};
