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
//! # Bone Physics
//!
//! Secondary-motion simulation for articulated character bones: spring-damper
//! jiggle on configured bone chains, with optional sphere collision between
//! simulated bones.
//!
//! ## Features
//!
//! - **Spring bones**: linear and quadratic springs, damping, gravity bias,
//!   per-axis offset limits, timed force injection
//! - **Sphere colliders**: weight-dependent radius and offset, impulse-based
//!   elastic resolution with deterministic pair order
//! - **Fixed sub-steps**: a time accumulator decouples stability from frame rate
//! - **Thread-safe control**: other threads mutate the simulation only through
//!   a FIFO instruction queue drained at the start of each tick
//! - **Parallelization**: optional Rayon integration for per-actor integration
//!
//! ## Example
//!
//! ```rust
//! use bone_physics::config::{ConfigSnapshot, ConfigStore, NodeConfig, PhysicsConfig};
//! use bone_physics::controller::Controller;
//! use bone_physics::math::Transform;
//! use bone_physics::skeleton::MemorySkeleton;
//! use bone_physics::ActorHandle;
//! use glam::Vec3;
//!
//! let store = ConfigStore::new(
//!     ConfigSnapshot::builder()
//!         .group("Breast", PhysicsConfig::default())
//!         .node("NPC L Breast", NodeConfig::new("Breast"))
//!         .build(),
//! );
//!
//! let actor = ActorHandle::new(7);
//! let mut skeleton = MemorySkeleton::new();
//! skeleton.add_bone(actor, "NPC L Breast", Some("NPC Spine2"), Transform::IDENTITY, Transform::IDENTITY);
//!
//! let mut controller = Controller::new(store);
//! let handle = controller.handle();
//! handle.add_actor(actor);
//! handle.apply_force(Some(actor), "breast", 5, Vec3::new(0.0, 0.0, 2.0));
//!
//! for _ in 0..10 {
//!     controller.tick(1.0 / 60.0, &mut skeleton);
//! }
//! assert!(controller.contains(actor));
//! ```

#![warn(missing_docs)]

/// Actor handles
pub mod actor;

/// Sphere collision detection and resolution
pub mod collision;

/// Configuration snapshots and ingestion clamping
pub mod config;

/// Per-frame scheduling and the instruction queue
pub mod controller;

/// Error types
pub mod error;

/// Transform math on top of glam
pub mod math;

/// Rolling tick statistics
pub mod profiler;

/// Spring bones, colliders and simulated objects
pub mod sim;

/// Skeleton access
pub mod skeleton;

pub use actor::ActorHandle;
pub use controller::{Controller, ControllerHandle, Instruction};
pub use error::{SimError, SimResult};
pub use sim::{SimObject, SpringBone};
