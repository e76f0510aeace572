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
//! Error types for the simulation core
//!
//! None of these errors abort a frame. Validation errors are reported at the
//! configuration boundary and then clamped away, resolution errors isolate a
//! single actor, and degenerate geometry is handled in place by the collision
//! engine.

use crate::ActorHandle;
use thiserror::Error;

/// Errors produced by the simulation core
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// A configuration value is out of range or not finite
    #[error("Invalid value for {field}: {value}")]
    Validation {
        /// Name of the offending field
        field: &'static str,
        /// The rejected value
        value: f32,
    },

    /// The time step is not positive and finite
    #[error("Invalid timestep: {0} (must be positive and finite)")]
    InvalidTimestep(f32),

    /// The actor is not (or no longer) known to the skeleton provider
    #[error("{0} could not be resolved")]
    ActorNotFound(ActorHandle),

    /// A skeleton node the simulation depends on is gone
    #[error("{actor}: missing skeleton node '{node}'")]
    MissingNode {
        /// Owning actor
        actor: ActorHandle,
        /// Name of the node
        node: String,
    },

    /// None of the configured bone names were found on the skeleton
    #[error("{0} has no simulated bones")]
    NoSimulatedBones(ActorHandle),
}

/// Result type for simulation operations
pub type SimResult<T> = std::result::Result<T, SimError>;
