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
//! Controller scenario tests
//!
//! Drives a [`Controller`] through the instruction sequences a host issues
//! over a session: spawning and despawning, resets, skeleton changes, weight
//! changes, armor overrides and live configuration edits.

use std::thread;
use std::time::Duration;

use approx::assert_relative_eq;
use bone_physics::config::{
    ArmorOverride, ConfigSnapshot, ConfigStore, GlobalPhysics, NodeConfig, ParamOverride,
    PhysicsConfig, PhysicsParam,
};
use bone_physics::controller::Controller;
use bone_physics::math::Transform;
use bone_physics::skeleton::MemorySkeleton;
use bone_physics::ActorHandle;
use glam::Vec3;

const DT: f32 = 1.0 / 60.0;

fn belly_config() -> PhysicsConfig {
    PhysicsConfig {
        col_sphere_radius_min: 2.0,
        col_sphere_radius_max: 6.0,
        ..PhysicsConfig::default()
    }
}

fn snapshot(belly: PhysicsConfig) -> ConfigSnapshot {
    ConfigSnapshot::builder()
        .group("Belly", belly)
        .group("Butt", PhysicsConfig::default())
        .node("NPC Belly", NodeConfig::new("Belly"))
        .node("NPC L Butt", NodeConfig::new("Butt"))
        .node("NPC R Butt", NodeConfig::new("Butt"))
        .build()
}

/// Actors spaced far apart so they never collide with each other
fn skeleton_with(actors: &[u64]) -> MemorySkeleton {
    let mut skeleton = MemorySkeleton::new();
    for &raw in actors {
        let actor = ActorHandle::new(raw);
        let parent = Transform::from_translation(Vec3::new(raw as f32 * 500.0, 0.0, 100.0));
        skeleton.add_bone(actor, "NPC Belly", Some("NPC Spine1"), parent, Transform::IDENTITY);
    }
    skeleton
}

fn add_butt(skeleton: &mut MemorySkeleton, actor: ActorHandle) {
    let parent = Transform::from_translation(Vec3::new(actor.raw() as f32 * 500.0, 0.0, 60.0));
    skeleton.add_bone(
        actor,
        "NPC L Butt",
        Some("NPC Pelvis"),
        parent,
        Transform::from_translation(Vec3::new(-20.0, -10.0, 0.0)),
    );
    skeleton.add_bone(
        actor,
        "NPC R Butt",
        Some("NPC Pelvis"),
        parent,
        Transform::from_translation(Vec3::new(20.0, -10.0, 0.0)),
    );
}

fn belly_offset(controller: &Controller, actor: ActorHandle) -> Vec3 {
    controller
        .object(actor)
        .and_then(|o| o.bone("NPC Belly"))
        .map(|b| b.offset())
        .unwrap_or(Vec3::ZERO)
}

#[test]
fn test_spawn_despawn_respawn_in_one_frame() {
    let mut skeleton = skeleton_with(&[1]);
    let mut controller = Controller::new(ConfigStore::new(snapshot(belly_config())));
    let handle = controller.handle();
    let actor = ActorHandle::new(1);

    handle.add_actor(actor);
    handle.remove_actor(actor);
    handle.add_actor(actor);
    let report = controller.tick(DT, &mut skeleton);

    assert_eq!(report.instructions, 3);
    assert_eq!(report.actors, 1);
    assert_eq!(controller.collider_count(), 1);
    let actors = handle.actors();
    assert_eq!(actors.len(), 1);
    assert_eq!(actors[0].bones.len(), 1);
    assert_eq!(actors[0].groups, vec!["Belly".to_string()]);
}

#[test]
fn test_force_moves_bone_and_reset_restores_rest() {
    let mut skeleton = skeleton_with(&[1]);
    let mut controller = Controller::new(ConfigStore::new(snapshot(belly_config())));
    let handle = controller.handle();
    let actor = ActorHandle::new(1);
    handle.add_actor(actor);
    handle.apply_force(Some(actor), "BELLY", 3, Vec3::new(0.0, 2.0, 0.0));

    for _ in 0..3 {
        controller.tick(DT, &mut skeleton);
    }
    assert!(belly_offset(&controller, actor).y > 0.0);
    let written = skeleton.local(actor, "NPC Belly").unwrap_or_default();
    assert!(written.translation.y > 0.0);

    handle.reset(actor);
    controller.tick(0.0, &mut skeleton);
    assert_eq!(belly_offset(&controller, actor), Vec3::ZERO);
    assert_eq!(controller.collider_count(), 1);
}

#[test]
fn test_physics_reset_snaps_every_actor() {
    let mut skeleton = skeleton_with(&[1, 2]);
    let mut controller = Controller::new(ConfigStore::new(snapshot(belly_config())));
    let handle = controller.handle();
    handle.add_actor(ActorHandle::new(1));
    handle.add_actor(ActorHandle::new(2));
    handle.apply_force(None, "Belly", 2, Vec3::new(1.0, 0.0, 0.0));
    controller.tick(DT, &mut skeleton);
    assert!(controller.objects().all(|o| o.bones()[0].velocity().x > 0.0));

    handle.physics_reset();
    controller.tick(0.0, &mut skeleton);
    for object in controller.objects() {
        let bone = &object.bones()[0];
        assert_eq!(bone.velocity(), Vec3::ZERO);
        assert_eq!(bone.offset(), Vec3::ZERO);
        assert_eq!(bone.pending_forces(), 0);
    }
}

#[test]
fn test_zero_step_force_is_ignored() {
    let mut skeleton = skeleton_with(&[1]);
    let mut controller = Controller::new(ConfigStore::new(snapshot(belly_config())));
    let handle = controller.handle();
    let actor = ActorHandle::new(1);
    handle.add_actor(actor);
    handle.apply_force(Some(actor), "Belly", 0, Vec3::new(0.0, 0.0, 50.0));
    controller.tick(DT, &mut skeleton);

    let bone = controller.object(actor).map(|o| o.bones()[0].clone());
    assert!(bone.is_some_and(|b| b.pending_forces() == 0 && b.velocity() == Vec3::ZERO));
}

#[test]
fn test_node_update_picks_up_new_and_vanished_nodes() {
    let mut skeleton = skeleton_with(&[1]);
    let mut controller = Controller::new(ConfigStore::new(snapshot(belly_config())));
    let handle = controller.handle();
    let actor = ActorHandle::new(1);
    handle.add_actor(actor);
    controller.tick(0.0, &mut skeleton);
    assert_eq!(controller.object(actor).map(|o| o.bones().len()), Some(1));

    // equipment change adds the butt nodes
    add_butt(&mut skeleton, actor);
    handle.node_update(actor);
    controller.tick(0.0, &mut skeleton);
    assert_eq!(controller.object(actor).map(|o| o.bones().len()), Some(3));
    assert_eq!(controller.collider_count(), 3);

    skeleton.remove_bone(actor, "NPC L Butt");
    handle.node_update_all();
    controller.tick(0.0, &mut skeleton);
    let object = controller.object(actor);
    assert_eq!(object.map(|o| o.bones().len()), Some(2));
    assert!(object.is_some_and(|o| o.bone("NPC L Butt").is_none()));
    assert_eq!(controller.collider_count(), 2);

    for name in ["NPC Belly", "NPC R Butt"] {
        skeleton.remove_bone(actor, name);
    }
    handle.node_update(actor);
    controller.tick(0.0, &mut skeleton);
    assert!(!controller.contains(actor));
    assert_eq!(controller.collider_count(), 0);
}

#[test]
fn test_missing_node_only_affects_its_actor() {
    let mut skeleton = skeleton_with(&[1, 2]);
    add_butt(&mut skeleton, ActorHandle::new(1));
    let mut controller = Controller::new(ConfigStore::new(snapshot(belly_config())));
    let handle = controller.handle();
    handle.add_actor(ActorHandle::new(1));
    handle.add_actor(ActorHandle::new(2));
    controller.tick(DT, &mut skeleton);

    // nodes disappear without a node update
    skeleton.remove_bone(ActorHandle::new(1), "NPC Belly");
    skeleton.remove_bone(ActorHandle::new(2), "NPC Belly");
    handle.apply_force(None, "butt", 2, Vec3::new(0.0, 1.0, 0.0));
    controller.tick(DT, &mut skeleton);

    assert!(!controller.contains(ActorHandle::new(2)));
    let survivor = controller.object(ActorHandle::new(1));
    assert_eq!(survivor.map(|o| o.bones().len()), Some(2));
    assert!(survivor.is_some_and(|o| o.group("butt").all(|b| b.velocity().y > 0.0)));
}

#[test]
fn test_weight_update_rescales_collider() {
    let mut skeleton = skeleton_with(&[1]);
    let mut controller = Controller::new(ConfigStore::new(snapshot(belly_config())));
    let handle = controller.handle();
    let actor = ActorHandle::new(1);
    handle.add_actor(actor);
    controller.tick(0.0, &mut skeleton);

    let radius = |c: &Controller| {
        c.object(actor)
            .and_then(|o| o.bone("NPC Belly"))
            .and_then(|b| b.collider())
            .map(|col| col.radius())
    };
    assert_eq!(radius(&controller), Some(4.0));
    let id = controller
        .object(actor)
        .and_then(|o| o.bones()[0].collider())
        .and_then(|c| c.id());

    skeleton.set_weight(actor, 100.0);
    handle.weight_update(actor);
    controller.tick(0.0, &mut skeleton);
    assert_eq!(radius(&controller), Some(6.0));

    skeleton.set_weight(actor, 0.0);
    handle.weight_update_all();
    controller.tick(0.0, &mut skeleton);
    assert_eq!(radius(&controller), Some(2.0));

    // the collider is resized, not recreated
    let after = controller
        .object(actor)
        .and_then(|o| o.bones()[0].collider())
        .and_then(|c| c.id());
    assert_eq!(id, after);
}

#[test]
fn test_armor_override_lifecycle() {
    let mut skeleton = skeleton_with(&[1, 2]);
    let store = ConfigStore::new(snapshot(belly_config()));
    let mut controller = Controller::new(store);
    let handle = controller.handle();
    let armored = ActorHandle::new(1);
    let plain = ActorHandle::new(2);
    handle.add_actor(armored);
    handle.add_actor(plain);

    let mut armor = ArmorOverride::new();
    armor.insert("belly", ParamOverride::multiply(PhysicsParam::Stiffness, 2.0));
    armor.insert("Belly", ParamOverride::set(PhysicsParam::Damping, 9.0));
    handle.add_armor_override(armored, armor);
    controller.tick(0.0, &mut skeleton);

    let conf = |c: &Controller, actor| c.object(actor).map(|o| *o.bones()[0].config());
    let armored_conf = conf(&controller, armored).unwrap_or_default();
    assert_relative_eq!(armored_conf.stiffness, 80.0);
    assert_relative_eq!(armored_conf.damping, 9.0);
    assert_relative_eq!(conf(&controller, plain).unwrap_or_default().stiffness, 40.0);

    // overrides survive a reset and follow new base values
    handle.reset(armored);
    handle.publish_config(snapshot(PhysicsConfig {
        stiffness: 10.0,
        ..belly_config()
    }));
    handle.update_armor_overrides_all();
    controller.tick(0.0, &mut skeleton);
    assert_relative_eq!(conf(&controller, armored).unwrap_or_default().stiffness, 20.0);
    assert_relative_eq!(conf(&controller, plain).unwrap_or_default().stiffness, 10.0);

    handle.clear_armor_overrides();
    controller.tick(0.0, &mut skeleton);
    assert!(controller.armor_override(armored).is_none());
    assert_relative_eq!(conf(&controller, armored).unwrap_or_default().stiffness, 10.0);
}

#[test]
fn test_config_update_is_idempotent() {
    let mut skeleton = skeleton_with(&[1]);
    let mut controller = Controller::new(ConfigStore::new(snapshot(belly_config())));
    let handle = controller.handle();
    let actor = ActorHandle::new(1);
    handle.add_actor(actor);
    controller.tick(DT, &mut skeleton);

    let state = |c: &Controller| {
        c.object(actor).map(|o| {
            let bone = &o.bones()[0];
            (*bone.config(), bone.collider().and_then(|col| col.id()), bone.offset())
        })
    };
    let before = state(&controller);
    handle.update_config(actor);
    handle.update_config(actor);
    controller.tick(0.0, &mut skeleton);
    assert_eq!(state(&controller), before);
    assert_eq!(controller.collider_count(), 1);
}

#[test]
fn test_disabling_collision_releases_collider() {
    let mut skeleton = skeleton_with(&[1]);
    let store = ConfigStore::new(snapshot(belly_config()));
    let mut controller = Controller::new(store);
    let handle = controller.handle();
    handle.add_actor(ActorHandle::new(1));
    controller.tick(0.0, &mut skeleton);
    assert_eq!(controller.collider_count(), 1);

    let revision = handle.publish_config(
        ConfigSnapshot::builder()
            .group("Belly", belly_config())
            .node("NPC Belly", NodeConfig::new("Belly").with_collision(false))
            .build(),
    );
    assert!(revision > 0);
    controller.tick(0.0, &mut skeleton);
    assert_eq!(controller.collider_count(), 0);
    let info = handle.actors();
    assert!(!info[0].bones[0].collision);
}

#[test]
fn test_suspended_actor_resumes_where_it_stopped() {
    let mut skeleton = skeleton_with(&[1]);
    let mut controller = Controller::new(ConfigStore::new(snapshot(belly_config())));
    let handle = controller.handle();
    let actor = ActorHandle::new(1);
    handle.add_actor(actor);
    controller.tick(DT, &mut skeleton);

    skeleton.set_attached(actor, false);
    handle.apply_force(Some(actor), "Belly", 1, Vec3::new(0.0, 3.0, 0.0));
    for _ in 0..5 {
        controller.tick(DT, &mut skeleton);
    }
    assert_eq!(belly_offset(&controller, actor), Vec3::ZERO);
    assert!(handle.actors()[0].suspended);

    skeleton.set_attached(actor, true);
    controller.tick(DT, &mut skeleton);
    assert!(belly_offset(&controller, actor).y > 0.0);
    assert!(!handle.actors()[0].suspended);
}

#[test]
fn test_disabling_movement_returns_node_to_rest() {
    let mut skeleton = skeleton_with(&[1]);
    let mut controller = Controller::new(ConfigStore::new(snapshot(belly_config())));
    let handle = controller.handle();
    let actor = ActorHandle::new(1);
    handle.add_actor(actor);
    handle.apply_force(Some(actor), "Belly", 3, Vec3::new(0.0, 0.0, 4.0));
    for _ in 0..3 {
        controller.tick(DT, &mut skeleton);
    }
    let displaced = skeleton.local(actor, "NPC Belly").unwrap_or_default();
    assert_ne!(displaced.translation, Vec3::ZERO);

    handle.publish_config(
        ConfigSnapshot::builder()
            .group("Belly", belly_config())
            .node("NPC Belly", NodeConfig::new("Belly").with_movement(false))
            .build(),
    );
    for _ in 0..30 {
        controller.tick(DT, &mut skeleton);
    }
    let local = skeleton.local(actor, "NPC Belly").unwrap_or_default();
    assert_eq!(local.translation, Vec3::ZERO);
    assert_eq!(belly_offset(&controller, actor), Vec3::ZERO);
}

#[test]
fn test_resumed_anchor_keeps_calm_velocity() {
    let mut skeleton = skeleton_with(&[1]);
    let store = ConfigStore::new(
        ConfigSnapshot::builder()
            .group("Belly", belly_config())
            .node("NPC Belly", NodeConfig::new("Belly").with_movement(false))
            .build(),
    );
    let mut controller = Controller::new(store);
    let handle = controller.handle();
    let actor = ActorHandle::new(1);
    handle.add_actor(actor);
    controller.tick(DT, &mut skeleton);
    controller.tick(DT, &mut skeleton);

    let velocity = |c: &Controller| {
        c.object(actor)
            .and_then(|o| o.bone("NPC Belly"))
            .map(|b| b.velocity())
            .unwrap_or(Vec3::splat(f32::NAN))
    };

    // the actor is carried far away while detached
    skeleton.set_attached(actor, false);
    controller.tick(DT, &mut skeleton);
    skeleton.translate_actor(actor, Vec3::new(300.0, 0.0, 0.0));
    skeleton.set_attached(actor, true);
    controller.tick(DT, &mut skeleton);
    assert_eq!(velocity(&controller), Vec3::ZERO);

    skeleton.translate_actor(actor, Vec3::new(1.0, 0.0, 0.0));
    controller.tick(DT, &mut skeleton);
    assert_relative_eq!(velocity(&controller).x, 60.0, epsilon = 1e-2);
}

#[test]
fn test_concurrent_producers() {
    let mut skeleton = skeleton_with(&[1]);
    let mut controller = Controller::new(ConfigStore::new(snapshot(belly_config())));
    let handle = controller.handle();
    let actor = ActorHandle::new(1);
    handle.add_actor(actor);

    let mut drained = 0;
    thread::scope(|scope| {
        for _ in 0..4 {
            let producer = handle.clone();
            scope.spawn(move || {
                for _ in 0..250 {
                    producer.apply_force(Some(actor), "Belly", 1, Vec3::new(0.0, 0.0, 0.01));
                }
            });
        }
        for _ in 0..20 {
            drained += controller.tick(DT, &mut skeleton).instructions;
        }
    });
    drained += controller.tick(DT, &mut skeleton).instructions;

    assert_eq!(drained, 1001);
    assert_eq!(handle.pending(), 0);
    assert!(controller.contains(actor));
}

#[test]
fn test_profiler_publishes_after_interval() {
    let store = ConfigStore::new(
        ConfigSnapshot::builder()
            .global(GlobalPhysics {
                profiler_interval: 0.1,
                controller_stats: true,
                ..GlobalPhysics::default()
            })
            .group("Belly", belly_config())
            .node("NPC Belly", NodeConfig::new("Belly"))
            .build(),
    );
    let mut skeleton = skeleton_with(&[1]);
    let mut controller = Controller::new(store);
    let handle = controller.handle();
    handle.add_actor(ActorHandle::new(1));
    assert_eq!(handle.profiler_stats().samples, 0);

    controller.tick(DT, &mut skeleton);
    thread::sleep(Duration::from_millis(150));
    controller.tick(DT, &mut skeleton);

    let stats = handle.profiler_stats();
    assert!(stats.samples >= 1);
    assert!(stats.uid >= 1);
    assert_relative_eq!(stats.avg_actor_count, 1.0);
    assert_relative_eq!(stats.avg_steps_per_update, 1.0);
}
