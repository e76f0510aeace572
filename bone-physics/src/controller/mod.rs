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
//! Simulation scheduling
//!
//! The [`Controller`] owns every [`SimObject`] and runs the per-frame tick on
//! the simulation thread. Each tick executes its phases strictly in order:
//!
//! 1. **Drain**: apply every queued [`Instruction`] in FIFO order
//! 2. **Cull**: drop actors whose engine object vanished, suspend detached ones
//! 3. **Accumulate**: turn the frame time into fixed sub-steps
//! 4. **Sub-steps**: integrate all actors, then resolve collisions
//! 5. **Commit**: write simulated transforms back to the skeleton
//!
//! Other threads interact only through a [`ControllerHandle`], which enqueues
//! instructions and reads published statistics.

mod debug;
mod instruction;
mod timing;

pub use debug::{DebugSnapshot, DebugSphere};
pub use instruction::{Instruction, InstructionQueue};
pub use timing::TimeAccumulator;

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use glam::Vec3;

use crate::collision::{CollisionBody, CollisionEngine, ColliderRegistry};
use crate::config::{ArmorOverride, ConfigSnapshot, ConfigStore};
use crate::error::SimError;
use crate::profiler::{Profiler, ProfilerHandle, ProfilerStats};
use crate::sim::{ActorInfo, SimObject};
use crate::skeleton::SkeletonProvider;
use crate::ActorHandle;

/// Outcome of one [`Controller::tick`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Instructions applied during the drain phase
    pub instructions: usize,
    /// Actors removed by the cull phase
    pub culled: usize,
    /// Sub-steps run
    pub steps: u32,
    /// Actors simulated
    pub actors: usize,
    /// Contacts resolved over all sub-steps
    pub contacts: usize,
}

#[derive(Debug, Default)]
struct SharedState {
    actors: Vec<ActorInfo>,
    debug: DebugSnapshot,
}

fn lock_shared(shared: &Mutex<SharedState>) -> MutexGuard<'_, SharedState> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Thread-safe front end of a [`Controller`]
///
/// Every mutating call enqueues an instruction; nothing takes effect until
/// the next tick drains the queue.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    queue: InstructionQueue,
    config: ConfigStore,
    profiler: ProfilerHandle,
    shared: Arc<Mutex<SharedState>>,
    debug_capture: Arc<AtomicBool>,
}

impl ControllerHandle {
    /// Enqueue any instruction
    pub fn enqueue(&self, instruction: Instruction) {
        self.queue.push(instruction);
    }

    /// Start simulating an actor
    pub fn add_actor(&self, actor: ActorHandle) {
        self.enqueue(Instruction::AddActor(actor));
    }

    /// Stop simulating an actor
    pub fn remove_actor(&self, actor: ActorHandle) {
        self.enqueue(Instruction::RemoveActor(actor));
    }

    /// Re-apply the configuration to one actor
    pub fn update_config(&self, actor: ActorHandle) {
        self.enqueue(Instruction::UpdateConfig(actor));
    }

    /// Re-apply the configuration to every actor
    pub fn update_config_all(&self) {
        self.enqueue(Instruction::UpdateConfigAll);
    }

    /// Publish a new configuration snapshot and apply it to every actor
    pub fn publish_config(&self, snapshot: ConfigSnapshot) -> u64 {
        let revision = self.config.publish(snapshot);
        self.update_config_all();
        revision
    }

    /// Rebuild one actor
    pub fn reset(&self, actor: ActorHandle) {
        self.enqueue(Instruction::Reset(actor));
    }

    /// Snap every bone to rest
    pub fn physics_reset(&self) {
        self.enqueue(Instruction::PhysicsReset);
    }

    /// Re-validate one actor's skeleton nodes
    pub fn node_update(&self, actor: ActorHandle) {
        self.enqueue(Instruction::NodeUpdate(actor));
    }

    /// Re-validate every actor's skeleton nodes
    pub fn node_update_all(&self) {
        self.enqueue(Instruction::NodeUpdateAll);
    }

    /// Re-read one actor's weight
    pub fn weight_update(&self, actor: ActorHandle) {
        self.enqueue(Instruction::WeightUpdate(actor));
    }

    /// Re-read every actor's weight
    pub fn weight_update_all(&self) {
        self.enqueue(Instruction::WeightUpdateAll);
    }

    /// Install an armor override for an actor
    pub fn add_armor_override(&self, actor: ActorHandle, armor: ArmorOverride) {
        self.enqueue(Instruction::AddArmorOverride(actor, armor));
    }

    /// Re-apply an actor's armor override
    pub fn update_armor_override(&self, actor: ActorHandle) {
        self.enqueue(Instruction::UpdateArmorOverride(actor));
    }

    /// Re-apply every armor override
    pub fn update_armor_overrides_all(&self) {
        self.enqueue(Instruction::UpdateArmorOverridesAll);
    }

    /// Drop every armor override
    pub fn clear_armor_overrides(&self) {
        self.enqueue(Instruction::ClearArmorOverrides);
    }

    /// Queue a timed force on a group; `None` targets every actor
    pub fn apply_force(&self, actor: Option<ActorHandle>, group: &str, steps: u32, force: Vec3) {
        self.enqueue(Instruction::ApplyForce {
            actor,
            group: group.to_string(),
            steps,
            force,
        });
    }

    /// Stop simulating every actor
    pub fn clear_actors(&self) {
        self.enqueue(Instruction::ClearActors);
    }

    /// Number of instructions waiting for the next tick
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Latest profiler averages
    pub fn profiler_stats(&self) -> ProfilerStats {
        self.profiler.snapshot()
    }

    /// Actors simulated as of the last tick
    pub fn actors(&self) -> Vec<ActorInfo> {
        lock_shared(&self.shared).actors.clone()
    }

    /// Enable or disable capture of debug spheres at the end of each tick
    pub fn set_debug_capture(&self, enabled: bool) {
        self.debug_capture.store(enabled, Ordering::Relaxed);
    }

    /// Debug spheres captured at the end of the last tick
    pub fn debug_snapshot(&self) -> DebugSnapshot {
        lock_shared(&self.shared).debug.clone()
    }
}

/// Owner of the active actor map and driver of the per-frame tick
///
/// # Examples
///
/// ```
/// use bone_physics::config::{ConfigSnapshot, ConfigStore, NodeConfig, PhysicsConfig};
/// use bone_physics::controller::Controller;
/// use bone_physics::math::Transform;
/// use bone_physics::skeleton::MemorySkeleton;
/// use bone_physics::ActorHandle;
///
/// let store = ConfigStore::new(
///     ConfigSnapshot::builder()
///         .group("Belly", PhysicsConfig::default())
///         .node("NPC Belly", NodeConfig::new("Belly"))
///         .build(),
/// );
/// let actor = ActorHandle::new(0x14);
/// let mut skeleton = MemorySkeleton::new();
/// skeleton.add_bone(actor, "NPC Belly", Some("NPC Spine"), Transform::IDENTITY, Transform::IDENTITY);
///
/// let mut controller = Controller::new(store);
/// let handle = controller.handle();
/// handle.add_actor(actor);
///
/// let report = controller.tick(1.0 / 30.0, &mut skeleton);
/// assert_eq!(report.steps, 2);
/// assert!(controller.contains(actor));
/// ```
#[derive(Debug)]
pub struct Controller {
    actors: BTreeMap<ActorHandle, SimObject>,
    armor: HashMap<ActorHandle, ArmorOverride>,
    queue: InstructionQueue,
    store: ConfigStore,
    config: Arc<ConfigSnapshot>,
    registry: ColliderRegistry,
    engine: CollisionEngine,
    timer: TimeAccumulator,
    profiler: Profiler,
    shared: Arc<Mutex<SharedState>>,
    debug_capture: Arc<AtomicBool>,
    bodies: Vec<CollisionBody>,
    actors_dirty: bool,
}

impl Controller {
    /// Create a controller reading configuration from `store`
    pub fn new(store: ConfigStore) -> Self {
        let config = store.snapshot();
        let interval = Duration::from_secs_f32(config.global().profiler_interval);
        Controller {
            actors: BTreeMap::new(),
            armor: HashMap::new(),
            queue: InstructionQueue::new(),
            store,
            config,
            registry: ColliderRegistry::new(),
            engine: CollisionEngine::new(),
            timer: TimeAccumulator::new(),
            profiler: Profiler::new(interval),
            shared: Arc::new(Mutex::new(SharedState::default())),
            debug_capture: Arc::new(AtomicBool::new(false)),
            bodies: Vec::new(),
            actors_dirty: false,
        }
    }

    /// Handle for other threads
    pub fn handle(&self) -> ControllerHandle {
        ControllerHandle {
            queue: self.queue.clone(),
            config: self.store.clone(),
            profiler: self.profiler.handle(),
            shared: Arc::clone(&self.shared),
            debug_capture: Arc::clone(&self.debug_capture),
        }
    }

    /// Run one frame
    ///
    /// Never fails: per-actor problems are logged and confined to that actor.
    pub fn tick(&mut self, elapsed: f32, skeleton: &mut dyn SkeletonProvider) -> TickReport {
        self.profiler.begin();
        self.capture_config();

        let mut report = TickReport {
            instructions: self.drain(skeleton),
            culled: self.cull(skeleton),
            ..TickReport::default()
        };

        let global = *self.config.global();
        let steps = self.timer.advance(elapsed, global.time_tick, global.max_substeps);
        let dropped = self.timer.limit_carry(f64::from(global.max_carry));
        if dropped > 0.0 {
            log::debug!("dropped {dropped:.3}s of simulation backlog");
        }
        if steps > 0 && !self.actors.is_empty() {
            self.read_transforms(skeleton);
            let frame_dt = steps as f32 * global.time_tick;
            for object in self.actors.values_mut() {
                object.update_velocity(frame_dt);
            }
            for _ in 0..steps {
                self.update_movement(global.time_tick);
                report.contacts += self.collide(global.collisions);
            }
            self.commit(skeleton);
        }

        report.steps = steps;
        report.actors = self.actors.len();
        self.publish(report.contacts);

        if let Some(stats) = self.profiler.end(report.actors, steps, elapsed) {
            if global.controller_stats {
                log::info!(
                    "controller: {:.1} actors, {:.2} steps/update, {:.1} steps/s, tick {:?}",
                    stats.avg_actor_count,
                    stats.avg_steps_per_update,
                    stats.avg_step_rate,
                    stats.avg_tick_time
                );
            }
        }
        report
    }

    /// Check if an actor is simulated
    pub fn contains(&self, actor: ActorHandle) -> bool {
        self.actors.contains_key(&actor)
    }

    /// Simulated object of an actor
    pub fn object(&self, actor: ActorHandle) -> Option<&SimObject> {
        self.actors.get(&actor)
    }

    /// Every simulated object in handle order
    pub fn objects(&self) -> impl Iterator<Item = &SimObject> {
        self.actors.values()
    }

    /// Number of simulated actors
    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Armor override of an actor
    pub fn armor_override(&self, actor: ActorHandle) -> Option<&ArmorOverride> {
        self.armor.get(&actor)
    }

    /// Time carried into the next tick
    pub fn leftover_time(&self) -> f64 {
        self.timer.leftover()
    }

    /// Live colliders
    pub fn collider_count(&self) -> usize {
        self.registry.len()
    }

    /// Counters of the last collision pass
    pub fn collision_stats(&self) -> &crate::collision::CollisionStats {
        self.engine.stats()
    }

    /// Debug spheres of the current state
    pub fn debug_snapshot(&self) -> DebugSnapshot {
        let mut snapshot = DebugSnapshot::default();
        for object in self.actors.values().filter(|o| !o.is_suspended()) {
            for bone in object.bones() {
                if let Some(collider) = bone.collider().filter(|c| c.is_active()) {
                    snapshot.spheres.push(DebugSphere {
                        actor: object.actor(),
                        bone: bone.name().to_string(),
                        center: collider.center(),
                        radius: collider.scaled_radius(),
                        in_contact: bone.in_contact(),
                    });
                }
            }
        }
        snapshot
    }

    fn capture_config(&mut self) {
        let config = self.store.snapshot();
        if config.revision() != self.config.revision() {
            log::debug!("captured configuration revision {}", config.revision());
        }
        let global = config.global();
        self.engine
            .set_ignore_same_group(global.ignore_same_group_collisions);
        self.profiler
            .set_interval(Duration::from_secs_f32(global.profiler_interval));
        self.config = config;
    }

    fn drain(&mut self, skeleton: &dyn SkeletonProvider) -> usize {
        let batch = self.queue.take_all();
        let count = batch.len();
        for instruction in batch {
            self.apply(instruction, skeleton);
        }
        count
    }

    fn apply(&mut self, instruction: Instruction, skeleton: &dyn SkeletonProvider) {
        match instruction {
            Instruction::AddActor(actor) => self.add_actor(actor, skeleton),
            Instruction::RemoveActor(actor) => {
                self.armor.remove(&actor);
                if !self.remove_actor(actor) {
                    log::debug!("remove ignored: {actor} is not simulated");
                }
            }
            Instruction::UpdateConfig(actor) | Instruction::UpdateArmorOverride(actor) => {
                self.update_config(actor)
            }
            Instruction::UpdateConfigAll => self.update_config_all(),
            Instruction::Reset(actor) => {
                if self.remove_actor(actor) {
                    self.add_actor(actor, skeleton);
                } else {
                    log::debug!("reset ignored: {actor} is not simulated");
                }
            }
            Instruction::PhysicsReset => {
                for object in self.actors.values_mut() {
                    object.reset();
                }
            }
            Instruction::NodeUpdate(actor) => self.node_update(actor, skeleton),
            Instruction::NodeUpdateAll => {
                let actors: Vec<ActorHandle> = self.actors.keys().copied().collect();
                for actor in actors {
                    self.node_update(actor, skeleton);
                }
            }
            Instruction::WeightUpdate(actor) => match self.actors.get_mut(&actor) {
                Some(object) => object.update_weight(skeleton.weight(actor), &mut self.registry),
                None => log::debug!("weight update ignored: {actor} is not simulated"),
            },
            Instruction::WeightUpdateAll => {
                for (actor, object) in self.actors.iter_mut() {
                    object.update_weight(skeleton.weight(*actor), &mut self.registry);
                }
            }
            Instruction::AddArmorOverride(actor, armor) => {
                self.armor.insert(actor, armor);
                self.update_config(actor);
            }
            Instruction::UpdateArmorOverridesAll => {
                let actors: Vec<ActorHandle> = self.armor.keys().copied().collect();
                for actor in actors {
                    self.update_config(actor);
                }
            }
            Instruction::ClearArmorOverrides => {
                self.armor.clear();
                self.update_config_all();
            }
            Instruction::ApplyForce {
                actor,
                group,
                steps,
                force,
            } => {
                let applied: usize = match actor {
                    Some(actor) => self
                        .actors
                        .get_mut(&actor)
                        .map_or(0, |object| object.apply_force(steps, &group, force)),
                    None => self
                        .actors
                        .values_mut()
                        .map(|object| object.apply_force(steps, &group, force))
                        .sum(),
                };
                log::debug!("force on group {group} accepted by {applied} bone(s)");
            }
            Instruction::ClearActors => {
                for object in self.actors.values_mut() {
                    object.release(&mut self.registry);
                }
                log::info!("cleared {} actor(s)", self.actors.len());
                self.actors.clear();
                self.actors_dirty = true;
            }
        }
    }

    fn add_actor(&mut self, actor: ActorHandle, skeleton: &dyn SkeletonProvider) {
        if self.actors.contains_key(&actor) {
            log::debug!("{actor} is already simulated");
            return;
        }
        let config = self.config.effective(self.armor.get(&actor));
        match SimObject::build(actor, skeleton, config, &mut self.registry) {
            Ok(object) => {
                log::info!("{actor} added with {} bone(s)", object.bones().len());
                self.actors.insert(actor, object);
                self.actors_dirty = true;
            }
            Err(err @ SimError::NoSimulatedBones(_)) => log::debug!("{err}"),
            Err(err) => log::warn!("cannot add {actor}: {err}"),
        }
    }

    fn remove_actor(&mut self, actor: ActorHandle) -> bool {
        match self.actors.remove(&actor) {
            Some(mut object) => {
                object.release(&mut self.registry);
                self.actors_dirty = true;
                log::info!("{actor} removed");
                true
            }
            None => false,
        }
    }

    fn update_config(&mut self, actor: ActorHandle) {
        let config = self.config.effective(self.armor.get(&actor));
        match self.actors.get_mut(&actor) {
            Some(object) => {
                object.update_config(config, &mut self.registry);
                self.actors_dirty = true;
            }
            None => log::debug!("config update ignored: {actor} is not simulated"),
        }
    }

    fn update_config_all(&mut self) {
        for (actor, object) in self.actors.iter_mut() {
            let config = self.config.effective(self.armor.get(actor));
            object.update_config(config, &mut self.registry);
        }
        self.actors_dirty = true;
    }

    fn node_update(&mut self, actor: ActorHandle, skeleton: &dyn SkeletonProvider) {
        let Some(object) = self.actors.get_mut(&actor) else {
            log::debug!("node update ignored: {actor} is not simulated");
            return;
        };
        if object.has_new_nodes(skeleton, &self.config) {
            log::debug!("{actor} gained nodes, rebuilding");
            self.remove_actor(actor);
            self.add_actor(actor, skeleton);
            return;
        }
        object.validate_nodes(skeleton, &mut self.registry);
        if object.is_empty() {
            self.remove_actor(actor);
        } else {
            object.reset();
            self.actors_dirty = true;
        }
    }

    fn cull(&mut self, skeleton: &dyn SkeletonProvider) -> usize {
        let invalid: Vec<ActorHandle> = self
            .actors
            .keys()
            .copied()
            .filter(|actor| !skeleton.is_valid(*actor))
            .collect();
        for actor in &invalid {
            log::info!("culling {actor}: engine object is gone");
            self.armor.remove(actor);
            self.remove_actor(*actor);
        }

        for (actor, object) in self.actors.iter_mut() {
            let attached = skeleton.is_attached(*actor);
            if object.is_suspended() == attached {
                object.set_suspended(!attached);
                self.actors_dirty = true;
                if attached {
                    log::debug!("{actor} resumed");
                } else {
                    log::debug!("{actor} suspended");
                }
            }
        }
        invalid.len()
    }

    fn read_transforms(&mut self, skeleton: &dyn SkeletonProvider) {
        let mut emptied = Vec::new();
        for (actor, object) in self.actors.iter_mut() {
            if object.is_suspended() {
                continue;
            }
            if let Err(err) = object.read_transforms(skeleton) {
                log::warn!("{err}; re-validating nodes");
                object.validate_nodes(skeleton, &mut self.registry);
                self.actors_dirty = true;
                if object.is_empty() {
                    emptied.push(*actor);
                }
            }
        }
        for actor in emptied {
            self.remove_actor(actor);
        }
    }

    #[cfg(feature = "parallel")]
    fn update_movement(&mut self, dt: f32) {
        use rayon::prelude::*;

        self.actors
            .par_iter_mut()
            .for_each(|(_, object)| object.update_movement(dt));
    }

    #[cfg(not(feature = "parallel"))]
    fn update_movement(&mut self, dt: f32) {
        for object in self.actors.values_mut() {
            object.update_movement(dt);
        }
    }

    fn collide(&mut self, enabled: bool) -> usize {
        for object in self.actors.values_mut() {
            object.clear_contacts();
        }
        if !enabled {
            return 0;
        }

        self.bodies.clear();
        for object in self.actors.values() {
            object.collision_bodies(&mut self.bodies);
        }
        if self.bodies.len() < 2 {
            return 0;
        }

        let contacts = self.engine.resolve(&mut self.bodies);
        for body in self.bodies.iter().filter(|b| b.inv_mass > 0.0) {
            if let Some(object) = self.actors.get_mut(&body.owner.actor) {
                object.apply_collision(body.owner.bone, body.center, body.velocity);
            }
        }
        for contact in &contacts {
            for (owner, depth) in [(contact.a, contact.depth), (contact.b, contact.depth)] {
                if let Some(object) = self.actors.get_mut(&owner.actor) {
                    object.mark_contact(owner.bone, depth);
                }
            }
        }
        contacts.len()
    }

    fn commit(&mut self, skeleton: &mut dyn SkeletonProvider) {
        for object in self.actors.values_mut() {
            if let Err(err) = object.commit(skeleton) {
                log::warn!("commit failed: {err}");
            }
        }
    }

    fn publish(&mut self, contacts: usize) {
        let capture = self.debug_capture.load(Ordering::Relaxed);
        if !capture && !self.actors_dirty {
            return;
        }
        let debug = capture.then(|| {
            let mut snapshot = self.debug_snapshot();
            snapshot.contacts = contacts;
            snapshot
        });
        let actors = self
            .actors_dirty
            .then(|| self.actors.values().map(SimObject::info).collect::<Vec<_>>());

        let mut shared = lock_shared(&self.shared);
        if let Some(debug) = debug {
            shared.debug = debug;
        }
        if let Some(actors) = actors {
            shared.actors = actors;
        }
        drop(shared);
        self.actors_dirty = false;
    }
}
