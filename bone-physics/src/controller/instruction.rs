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
//! Cross-thread instruction queue
//!
//! Other threads never touch the active actor map. They push [`Instruction`]s
//! here and the simulation thread applies them, in order, at the start of the
//! next tick.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use glam::Vec3;

use crate::config::ArmorOverride;
use crate::ActorHandle;

/// A queued mutation of the simulation state
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Start simulating an actor
    AddActor(ActorHandle),
    /// Stop simulating an actor
    RemoveActor(ActorHandle),
    /// Re-apply the configuration to one actor
    UpdateConfig(ActorHandle),
    /// Re-apply the configuration to every actor
    UpdateConfigAll,
    /// Rebuild one actor from its skeleton
    Reset(ActorHandle),
    /// Snap every bone of every actor to rest
    PhysicsReset,
    /// Re-validate one actor's skeleton nodes
    NodeUpdate(ActorHandle),
    /// Re-validate every actor's skeleton nodes
    NodeUpdateAll,
    /// Re-read one actor's weight
    WeightUpdate(ActorHandle),
    /// Re-read every actor's weight
    WeightUpdateAll,
    /// Install an armor override for an actor
    AddArmorOverride(ActorHandle, ArmorOverride),
    /// Re-apply an actor's armor override
    UpdateArmorOverride(ActorHandle),
    /// Re-apply every armor override
    UpdateArmorOverridesAll,
    /// Drop every armor override
    ClearArmorOverrides,
    /// Queue a timed force on a group, for one actor or all of them
    ApplyForce {
        /// Target actor, `None` for every active actor
        actor: Option<ActorHandle>,
        /// Configuration group name, matched case-insensitively
        group: String,
        /// Number of integration steps the force lasts
        steps: u32,
        /// Force in the parent node's frame
        force: Vec3,
    },
    /// Stop simulating every actor
    ClearActors,
}

impl Instruction {
    /// Actor the instruction targets, if it targets exactly one
    pub fn actor(&self) -> Option<ActorHandle> {
        match self {
            Instruction::AddActor(h)
            | Instruction::RemoveActor(h)
            | Instruction::UpdateConfig(h)
            | Instruction::Reset(h)
            | Instruction::NodeUpdate(h)
            | Instruction::WeightUpdate(h)
            | Instruction::AddArmorOverride(h, _)
            | Instruction::UpdateArmorOverride(h) => Some(*h),
            Instruction::ApplyForce { actor, .. } => *actor,
            _ => None,
        }
    }
}

/// FIFO of pending instructions shared between threads
///
/// The lock is held only to push or to take the pending batch.
#[derive(Debug, Clone, Default)]
pub struct InstructionQueue {
    inner: Arc<Mutex<VecDeque<Instruction>>>,
}

impl InstructionQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Instruction>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append an instruction
    pub fn push(&self, instruction: Instruction) {
        self.lock().push_back(instruction);
    }

    /// Remove the oldest instruction
    pub fn pop(&self) -> Option<Instruction> {
        self.lock().pop_front()
    }

    /// Take every pending instruction, oldest first
    ///
    /// Instructions pushed while the batch is being applied wait for the next
    /// call.
    pub fn take_all(&self) -> VecDeque<Instruction> {
        std::mem::take(&mut *self.lock())
    }

    /// Number of pending instructions
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
