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
//! Jiggle demo
//!
//! Two characters walk towards each other. Their chest bones bounce on every
//! step, and once the characters meet the breast colliders push each other
//! apart. Run with `RUST_LOG=debug` to see the controller's log output.

use bone_physics::config::{
    ArmorOverride, ConfigSnapshot, ConfigStore, GlobalPhysics, NodeConfig, ParamOverride,
    PhysicsConfig, PhysicsParam,
};
use bone_physics::controller::Controller;
use bone_physics::math::Transform;
use bone_physics::skeleton::MemorySkeleton;
use bone_physics::ActorHandle;
use glam::Vec3;

fn main() {
    env_logger::init();

    println!("Bone Physics - Jiggle Demo");
    println!("==========================\n");

    let breast = PhysicsConfig {
        stiffness: 60.0,
        stiffness2: 2.0,
        damping: 4.0,
        max_offset: Vec3::new(6.0, 8.0, 6.0),
        cog_offset: Vec3::new(0.0, 4.0, 0.0),
        gravity_bias: 15.0,
        col_sphere_radius_min: 3.0,
        col_sphere_radius_max: 5.0,
        col_offset_min: Vec3::new(0.0, 3.0, 0.0),
        col_offset_max: Vec3::new(0.0, 5.0, 0.0),
        ..PhysicsConfig::default()
    };
    let store = ConfigStore::new(
        ConfigSnapshot::builder()
            .global(GlobalPhysics {
                controller_stats: true,
                ..GlobalPhysics::default()
            })
            .group("Breast", breast)
            .node("NPC L Breast", NodeConfig::new("Breast").with_collision_group(1))
            .node("NPC R Breast", NodeConfig::new("Breast").with_collision_group(1))
            .build(),
    );

    let alice = ActorHandle::new(0x14);
    let bob = ActorHandle::new(0x2A);
    let mut skeleton = MemorySkeleton::new();
    for (actor, x, facing) in [(alice, -40.0, 1.0), (bob, 40.0, -1.0)] {
        let chest = Transform::from_translation(Vec3::new(x, 0.0, 120.0));
        for (name, side) in [("NPC L Breast", -6.0), ("NPC R Breast", 6.0)] {
            skeleton.add_bone(
                actor,
                name,
                Some("NPC Spine2"),
                chest,
                Transform::from_translation(Vec3::new(facing * 2.0, side, 0.0)),
            );
        }
    }
    skeleton.set_weight(bob, 90.0);

    let mut controller = Controller::new(store);
    let handle = controller.handle();
    handle.set_debug_capture(true);
    handle.add_actor(alice);
    handle.add_actor(bob);

    let mut armor = ArmorOverride::new();
    armor.insert("Breast", ParamOverride::multiply(PhysicsParam::Stiffness, 1.5));
    armor.insert("Breast", ParamOverride::set(PhysicsParam::Damping, 6.0));
    handle.add_armor_override(bob, armor);

    let frame = 1.0 / 60.0;
    for frame_index in 0..240u32 {
        // walk: each actor closes 0.3 units per frame and bobs up and down
        let bob_height = ((frame_index as f32) * 0.35).sin() * 0.8;
        skeleton.translate_actor(alice, Vec3::new(0.3, 0.0, bob_height * 0.1));
        skeleton.translate_actor(bob, Vec3::new(-0.3, 0.0, -bob_height * 0.1));
        if frame_index % 30 == 0 {
            handle.apply_force(None, "breast", 4, Vec3::new(0.0, 0.0, 3.0));
        }

        let report = controller.tick(frame, &mut skeleton);

        if frame_index % 20 == 0 {
            let debug = handle.debug_snapshot();
            println!(
                "frame {:3}: {} step(s), {} contact(s), {} sphere(s) touching",
                frame_index,
                report.steps,
                report.contacts,
                debug.spheres_in_contact()
            );
            for object in controller.objects() {
                for bone in object.bones() {
                    let offset = bone.offset();
                    println!(
                        "    {} {:<13} offset ({:6.2}, {:6.2}, {:6.2})",
                        object.actor(),
                        bone.name(),
                        offset.x,
                        offset.y,
                        offset.z
                    );
                }
            }
        }
    }

    println!("\nRemoving {bob}");
    handle.remove_actor(bob);
    controller.tick(frame, &mut skeleton);
    println!("Simulated actors: {}", controller.actor_count());
    println!("Live colliders: {}", controller.collider_count());

    let stats = handle.profiler_stats();
    println!(
        "Profiler: {:.2} steps/update, {:?} per tick over {} tick(s)",
        stats.avg_steps_per_update, stats.avg_tick_time, stats.samples
    );
}
