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
//! Physics parameters and ingestion clamping
//!
//! Every value that reaches the integrator passes through [`PhysicsConfig::sanitize`]
//! or [`GlobalPhysics::sanitize`] first. The integrator itself never checks
//! ranges, it trusts that scalars are finite and inside the documented bounds.

use crate::error::{SimError, SimResult};
use glam::Vec3;
use std::fmt;

use super::GroupName;

/// Lower bound for the simulated mass
pub const MIN_MASS: f32 = 1.0;
/// Upper bound for the simulated mass
pub const MAX_MASS: f32 = 10_000.0;
/// Upper bound for the gravity bias
pub const MAX_GRAVITY_BIAS: f32 = 20_000.0;
/// Bound for each component of the linear response scale
pub const MAX_LINEAR: f32 = 10.0;
/// Bound for the magnitude of each component of the rotational response
pub const MAX_ROTATIONAL: f32 = 10.0;
/// Upper bound for the speed-dependent damping gain
pub const MAX_RESISTANCE: f32 = 250.0;
/// Lower bound for any velocity clamp
pub const MIN_VELOCITY_LIMIT: f32 = 4.0;
/// Upper bound for any velocity clamp
pub const MAX_VELOCITY_LIMIT: f32 = 20_000.0;
/// Upper bound for the restitution of the motion constraints
pub const MAX_CONSTRAINT_RESTITUTION: f32 = 4.0;

/// Per-group spring and collision parameters
///
/// # Examples
///
/// ```
/// use bone_physics::config::PhysicsConfig;
///
/// let mut conf = PhysicsConfig::default();
/// conf.mass = -5.0;
/// assert_eq!(conf.sanitize(), 1);
/// assert_eq!(conf.mass, 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsConfig {
    /// Linear spring constant
    pub stiffness: f32,
    /// Quadratic spring constant, applied as `diff * |diff|` per axis
    pub stiffness2: f32,
    /// Velocity damping per second
    pub damping: f32,
    /// Per-axis bound on the simulated displacement, in parent space
    pub max_offset: Vec3,
    /// Centre-of-gravity offset of the simulated point, in parent space
    pub cog_offset: Vec3,
    /// Per-axis scale applied to the displacement written to the bone
    pub linear: Vec3,
    /// Per-axis rotation, in degrees per unit of displacement
    pub rotational: Vec3,
    /// Constant downward pull, scaled by mass
    pub gravity_bias: f32,
    /// Constant vertical lift applied to the bone in parent space
    pub gravity_correction: f32,
    /// Simulated mass
    pub mass: f32,
    /// Collider radius at weight 0
    pub col_sphere_radius_min: f32,
    /// Collider radius at weight 100
    pub col_sphere_radius_max: f32,
    /// Collider offset at weight 0, in node space
    pub col_offset_min: Vec3,
    /// Collider offset at weight 100, in node space
    pub col_offset_max: Vec3,
    /// Coefficient of restitution for contacts
    pub col_restitution: f32,
    /// Scales the penetration depth into a damping multiplier while in contact
    pub col_damping_coef: f32,
    /// Scales the mass seen by the collision solver
    pub col_mass_scale: f32,
    /// Displacement length below which the spring exerts no force
    pub spring_slack_offset: f32,
    /// Distance past the slack offset over which the spring ramps to full force
    pub spring_slack_mag: f32,
    /// Extra damping that grows with speed, 0 to disable
    pub resistance: f32,
    /// Velocity clamp for this group; the lower of this and the global clamp applies
    pub max_velocity: f32,
    /// Bound the displacement by the `max_offset` box
    pub box_constraint: bool,
    /// Bound the displacement by a sphere around `max_offset_sphere_offset`
    pub sphere_constraint: bool,
    /// Radius of the constraint sphere
    pub max_offset_sphere_radius: f32,
    /// Centre of the constraint sphere, in parent space
    pub max_offset_sphere_offset: Vec3,
    /// Restitution of the constraint response
    pub max_offset_restitution_coef: f32,
    /// Fraction of the constraint impulse applied to the velocity
    pub max_offset_vel_response_scale: f32,
    /// Cap on the violation that feeds the constraint bias
    pub max_offset_max_bias_mag: f32,
    /// Constant added to the vertical displacement before it drives rotation
    pub rot_gravity_correction: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        PhysicsConfig {
            stiffness: 40.0,
            stiffness2: 0.0,
            damping: 3.0,
            max_offset: Vec3::splat(20.0),
            cog_offset: Vec3::new(0.0, 5.0, 0.0),
            linear: Vec3::ONE,
            rotational: Vec3::ZERO,
            gravity_bias: 0.0,
            gravity_correction: 0.0,
            mass: 1.0,
            col_sphere_radius_min: 4.0,
            col_sphere_radius_max: 4.0,
            col_offset_min: Vec3::ZERO,
            col_offset_max: Vec3::ZERO,
            col_restitution: 1.0,
            col_damping_coef: 1.0,
            col_mass_scale: 1.0,
            spring_slack_offset: 0.0,
            spring_slack_mag: 0.0,
            resistance: 0.0,
            max_velocity: 4000.0,
            box_constraint: true,
            sphere_constraint: false,
            max_offset_sphere_radius: 20.0,
            max_offset_sphere_offset: Vec3::ZERO,
            max_offset_restitution_coef: 0.0,
            max_offset_vel_response_scale: 0.1,
            max_offset_max_bias_mag: 5.0,
            rot_gravity_correction: 0.0,
        }
    }
}

fn clamp_scalar(field: &'static str, value: &mut f32, min: f32, max: f32, fallback: f32) -> bool {
    if !value.is_finite() {
        log::warn!("{field}: non-finite value {value}, using {fallback}");
        *value = fallback;
        return true;
    }
    if *value < min || *value > max {
        let clamped = (*value).clamp(min, max);
        log::warn!("{field}: {value} out of range [{min}, {max}], clamped to {clamped}");
        *value = clamped;
        return true;
    }
    false
}

fn clamp_vector(field: &'static str, value: &mut Vec3, min: f32, max: f32, fallback: Vec3) -> bool {
    let mut changed = false;
    for axis in 0..3 {
        changed |= clamp_scalar(field, &mut value[axis], min, max, fallback[axis]);
    }
    changed
}

fn check(field: &'static str, value: f32, min: f32, max: f32) -> SimResult<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(SimError::Validation { field, value })
    }
}

impl PhysicsConfig {
    /// Create a configuration with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Report the first out-of-range parameter, if any
    pub fn validate(&self) -> SimResult<()> {
        check("stiffness", self.stiffness, 0.0, f32::MAX)?;
        check("stiffness2", self.stiffness2, 0.0, f32::MAX)?;
        check("damping", self.damping, 0.0, f32::MAX)?;
        check("gravity_bias", self.gravity_bias, 0.0, MAX_GRAVITY_BIAS)?;
        check("gravity_correction", self.gravity_correction, f32::MIN, f32::MAX)?;
        check("mass", self.mass, MIN_MASS, MAX_MASS)?;
        for axis in 0..3 {
            check("max_offset", self.max_offset[axis], 0.0, f32::MAX)?;
            check("cog_offset", self.cog_offset[axis], f32::MIN, f32::MAX)?;
            check("linear", self.linear[axis], 0.0, MAX_LINEAR)?;
            check("rotational", self.rotational[axis], -MAX_ROTATIONAL, MAX_ROTATIONAL)?;
            check("col_offset_min", self.col_offset_min[axis], f32::MIN, f32::MAX)?;
            check("col_offset_max", self.col_offset_max[axis], f32::MIN, f32::MAX)?;
        }
        check("col_sphere_radius_min", self.col_sphere_radius_min, 0.0, f32::MAX)?;
        check("col_sphere_radius_max", self.col_sphere_radius_max, 0.0, f32::MAX)?;
        check("col_restitution", self.col_restitution, 0.0, 1.0)?;
        check("col_damping_coef", self.col_damping_coef, 0.0, f32::MAX)?;
        check("col_mass_scale", self.col_mass_scale, 0.01, 100.0)?;
        check("spring_slack_offset", self.spring_slack_offset, 0.0, f32::MAX)?;
        check("spring_slack_mag", self.spring_slack_mag, 0.0, f32::MAX)?;
        check("resistance", self.resistance, 0.0, MAX_RESISTANCE)?;
        check("max_velocity", self.max_velocity, MIN_VELOCITY_LIMIT, MAX_VELOCITY_LIMIT)?;
        check("max_offset_sphere_radius", self.max_offset_sphere_radius, 0.0, f32::MAX)?;
        for axis in 0..3 {
            check("max_offset_sphere_offset", self.max_offset_sphere_offset[axis], f32::MIN, f32::MAX)?;
        }
        check(
            "max_offset_restitution_coef",
            self.max_offset_restitution_coef,
            0.0,
            MAX_CONSTRAINT_RESTITUTION,
        )?;
        check("max_offset_vel_response_scale", self.max_offset_vel_response_scale, 0.0, 1.0)?;
        check("max_offset_max_bias_mag", self.max_offset_max_bias_mag, 0.0, f32::MAX)?;
        check("rot_gravity_correction", self.rot_gravity_correction, f32::MIN, f32::MAX)?;
        Ok(())
    }

    /// Clamp every parameter into its valid range
    ///
    /// Non-finite values fall back to the default. Returns the number of
    /// adjusted fields; each adjustment is logged as a warning.
    pub fn sanitize(&mut self) -> usize {
        let d = PhysicsConfig::default();
        let flags = [
            clamp_scalar("stiffness", &mut self.stiffness, 0.0, f32::MAX, d.stiffness),
            clamp_scalar("stiffness2", &mut self.stiffness2, 0.0, f32::MAX, d.stiffness2),
            clamp_scalar("damping", &mut self.damping, 0.0, f32::MAX, d.damping),
            clamp_vector("max_offset", &mut self.max_offset, 0.0, f32::MAX, d.max_offset),
            clamp_vector("cog_offset", &mut self.cog_offset, f32::MIN, f32::MAX, d.cog_offset),
            clamp_vector("linear", &mut self.linear, 0.0, MAX_LINEAR, d.linear),
            clamp_vector(
                "rotational",
                &mut self.rotational,
                -MAX_ROTATIONAL,
                MAX_ROTATIONAL,
                d.rotational,
            ),
            clamp_scalar("gravity_bias", &mut self.gravity_bias, 0.0, MAX_GRAVITY_BIAS, d.gravity_bias),
            clamp_scalar(
                "gravity_correction",
                &mut self.gravity_correction,
                f32::MIN,
                f32::MAX,
                d.gravity_correction,
            ),
            clamp_scalar("mass", &mut self.mass, MIN_MASS, MAX_MASS, d.mass),
            clamp_scalar(
                "col_sphere_radius_min",
                &mut self.col_sphere_radius_min,
                0.0,
                f32::MAX,
                d.col_sphere_radius_min,
            ),
            clamp_scalar(
                "col_sphere_radius_max",
                &mut self.col_sphere_radius_max,
                0.0,
                f32::MAX,
                d.col_sphere_radius_max,
            ),
            clamp_vector("col_offset_min", &mut self.col_offset_min, f32::MIN, f32::MAX, d.col_offset_min),
            clamp_vector("col_offset_max", &mut self.col_offset_max, f32::MIN, f32::MAX, d.col_offset_max),
            clamp_scalar("col_restitution", &mut self.col_restitution, 0.0, 1.0, d.col_restitution),
            clamp_scalar("col_damping_coef", &mut self.col_damping_coef, 0.0, f32::MAX, d.col_damping_coef),
            clamp_scalar("col_mass_scale", &mut self.col_mass_scale, 0.01, 100.0, d.col_mass_scale),
            clamp_scalar(
                "spring_slack_offset",
                &mut self.spring_slack_offset,
                0.0,
                f32::MAX,
                d.spring_slack_offset,
            ),
            clamp_scalar("spring_slack_mag", &mut self.spring_slack_mag, 0.0, f32::MAX, d.spring_slack_mag),
            clamp_scalar("resistance", &mut self.resistance, 0.0, MAX_RESISTANCE, d.resistance),
            clamp_scalar(
                "max_velocity",
                &mut self.max_velocity,
                MIN_VELOCITY_LIMIT,
                MAX_VELOCITY_LIMIT,
                d.max_velocity,
            ),
            clamp_scalar(
                "max_offset_sphere_radius",
                &mut self.max_offset_sphere_radius,
                0.0,
                f32::MAX,
                d.max_offset_sphere_radius,
            ),
            clamp_vector(
                "max_offset_sphere_offset",
                &mut self.max_offset_sphere_offset,
                f32::MIN,
                f32::MAX,
                d.max_offset_sphere_offset,
            ),
            clamp_scalar(
                "max_offset_restitution_coef",
                &mut self.max_offset_restitution_coef,
                0.0,
                MAX_CONSTRAINT_RESTITUTION,
                d.max_offset_restitution_coef,
            ),
            clamp_scalar(
                "max_offset_vel_response_scale",
                &mut self.max_offset_vel_response_scale,
                0.0,
                1.0,
                d.max_offset_vel_response_scale,
            ),
            clamp_scalar(
                "max_offset_max_bias_mag",
                &mut self.max_offset_max_bias_mag,
                0.0,
                f32::MAX,
                d.max_offset_max_bias_mag,
            ),
            clamp_scalar(
                "rot_gravity_correction",
                &mut self.rot_gravity_correction,
                f32::MIN,
                f32::MAX,
                d.rot_gravity_correction,
            ),
        ];
        flags.iter().filter(|changed| **changed).count()
    }

    /// Read a single parameter
    pub fn get(&self, param: PhysicsParam) -> f32 {
        match param {
            PhysicsParam::Stiffness => self.stiffness,
            PhysicsParam::Stiffness2 => self.stiffness2,
            PhysicsParam::Damping => self.damping,
            PhysicsParam::MaxOffset(a) => self.max_offset[a.index()],
            PhysicsParam::CogOffset(a) => self.cog_offset[a.index()],
            PhysicsParam::Linear(a) => self.linear[a.index()],
            PhysicsParam::Rotational(a) => self.rotational[a.index()],
            PhysicsParam::GravityBias => self.gravity_bias,
            PhysicsParam::GravityCorrection => self.gravity_correction,
            PhysicsParam::Mass => self.mass,
            PhysicsParam::ColSphereRadiusMin => self.col_sphere_radius_min,
            PhysicsParam::ColSphereRadiusMax => self.col_sphere_radius_max,
            PhysicsParam::ColOffsetMin(a) => self.col_offset_min[a.index()],
            PhysicsParam::ColOffsetMax(a) => self.col_offset_max[a.index()],
            PhysicsParam::ColRestitution => self.col_restitution,
            PhysicsParam::ColDampingCoef => self.col_damping_coef,
            PhysicsParam::ColMassScale => self.col_mass_scale,
            PhysicsParam::SpringSlackOffset => self.spring_slack_offset,
            PhysicsParam::SpringSlackMag => self.spring_slack_mag,
            PhysicsParam::Resistance => self.resistance,
            PhysicsParam::MaxVelocity => self.max_velocity,
            PhysicsParam::MaxOffsetSphereRadius => self.max_offset_sphere_radius,
            PhysicsParam::MaxOffsetSphereOffset(a) => self.max_offset_sphere_offset[a.index()],
            PhysicsParam::MaxOffsetRestitutionCoef => self.max_offset_restitution_coef,
            PhysicsParam::MaxOffsetVelResponseScale => self.max_offset_vel_response_scale,
            PhysicsParam::MaxOffsetMaxBiasMag => self.max_offset_max_bias_mag,
            PhysicsParam::RotGravityCorrection => self.rot_gravity_correction,
        }
    }

    /// Overwrite a single parameter without clamping
    pub fn set(&mut self, param: PhysicsParam, value: f32) {
        let slot = match param {
            PhysicsParam::Stiffness => &mut self.stiffness,
            PhysicsParam::Stiffness2 => &mut self.stiffness2,
            PhysicsParam::Damping => &mut self.damping,
            PhysicsParam::MaxOffset(a) => &mut self.max_offset[a.index()],
            PhysicsParam::CogOffset(a) => &mut self.cog_offset[a.index()],
            PhysicsParam::Linear(a) => &mut self.linear[a.index()],
            PhysicsParam::Rotational(a) => &mut self.rotational[a.index()],
            PhysicsParam::GravityBias => &mut self.gravity_bias,
            PhysicsParam::GravityCorrection => &mut self.gravity_correction,
            PhysicsParam::Mass => &mut self.mass,
            PhysicsParam::ColSphereRadiusMin => &mut self.col_sphere_radius_min,
            PhysicsParam::ColSphereRadiusMax => &mut self.col_sphere_radius_max,
            PhysicsParam::ColOffsetMin(a) => &mut self.col_offset_min[a.index()],
            PhysicsParam::ColOffsetMax(a) => &mut self.col_offset_max[a.index()],
            PhysicsParam::ColRestitution => &mut self.col_restitution,
            PhysicsParam::ColDampingCoef => &mut self.col_damping_coef,
            PhysicsParam::ColMassScale => &mut self.col_mass_scale,
            PhysicsParam::SpringSlackOffset => &mut self.spring_slack_offset,
            PhysicsParam::SpringSlackMag => &mut self.spring_slack_mag,
            PhysicsParam::Resistance => &mut self.resistance,
            PhysicsParam::MaxVelocity => &mut self.max_velocity,
            PhysicsParam::MaxOffsetSphereRadius => &mut self.max_offset_sphere_radius,
            PhysicsParam::MaxOffsetSphereOffset(a) => &mut self.max_offset_sphere_offset[a.index()],
            PhysicsParam::MaxOffsetRestitutionCoef => &mut self.max_offset_restitution_coef,
            PhysicsParam::MaxOffsetVelResponseScale => &mut self.max_offset_vel_response_scale,
            PhysicsParam::MaxOffsetMaxBiasMag => &mut self.max_offset_max_bias_mag,
            PhysicsParam::RotGravityCorrection => &mut self.rot_gravity_correction,
        };
        *slot = value;
    }
}

/// Vector component selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// X component
    X,
    /// Y component
    Y,
    /// Z component
    Z,
}

impl Axis {
    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Addressable scalar of a [`PhysicsConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicsParam {
    /// [`PhysicsConfig::stiffness`]
    Stiffness,
    /// [`PhysicsConfig::stiffness2`]
    Stiffness2,
    /// [`PhysicsConfig::damping`]
    Damping,
    /// One axis of [`PhysicsConfig::max_offset`]
    MaxOffset(Axis),
    /// One axis of [`PhysicsConfig::cog_offset`]
    CogOffset(Axis),
    /// One axis of [`PhysicsConfig::linear`]
    Linear(Axis),
    /// One axis of [`PhysicsConfig::rotational`]
    Rotational(Axis),
    /// [`PhysicsConfig::gravity_bias`]
    GravityBias,
    /// [`PhysicsConfig::gravity_correction`]
    GravityCorrection,
    /// [`PhysicsConfig::mass`]
    Mass,
    /// [`PhysicsConfig::col_sphere_radius_min`]
    ColSphereRadiusMin,
    /// [`PhysicsConfig::col_sphere_radius_max`]
    ColSphereRadiusMax,
    /// One axis of [`PhysicsConfig::col_offset_min`]
    ColOffsetMin(Axis),
    /// One axis of [`PhysicsConfig::col_offset_max`]
    ColOffsetMax(Axis),
    /// [`PhysicsConfig::col_restitution`]
    ColRestitution,
    /// [`PhysicsConfig::col_damping_coef`]
    ColDampingCoef,
    /// [`PhysicsConfig::col_mass_scale`]
    ColMassScale,
    /// [`PhysicsConfig::spring_slack_offset`]
    SpringSlackOffset,
    /// [`PhysicsConfig::spring_slack_mag`]
    SpringSlackMag,
    /// [`PhysicsConfig::resistance`]
    Resistance,
    /// [`PhysicsConfig::max_velocity`]
    MaxVelocity,
    /// [`PhysicsConfig::max_offset_sphere_radius`]
    MaxOffsetSphereRadius,
    /// One axis of [`PhysicsConfig::max_offset_sphere_offset`]
    MaxOffsetSphereOffset(Axis),
    /// [`PhysicsConfig::max_offset_restitution_coef`]
    MaxOffsetRestitutionCoef,
    /// [`PhysicsConfig::max_offset_vel_response_scale`]
    MaxOffsetVelResponseScale,
    /// [`PhysicsConfig::max_offset_max_bias_mag`]
    MaxOffsetMaxBiasMag,
    /// [`PhysicsConfig::rot_gravity_correction`]
    RotGravityCorrection,
}

impl fmt::Display for PhysicsParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicsParam::MaxOffset(a) => write!(f, "max_offset.{a:?}"),
            PhysicsParam::CogOffset(a) => write!(f, "cog_offset.{a:?}"),
            PhysicsParam::Linear(a) => write!(f, "linear.{a:?}"),
            PhysicsParam::Rotational(a) => write!(f, "rotational.{a:?}"),
            PhysicsParam::ColOffsetMin(a) => write!(f, "col_offset_min.{a:?}"),
            PhysicsParam::ColOffsetMax(a) => write!(f, "col_offset_max.{a:?}"),
            PhysicsParam::MaxOffsetSphereOffset(a) => write!(f, "max_offset_sphere_offset.{a:?}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Per-node toggles
///
/// Nodes are matched by their exact skeleton name. A node without an entry
/// in the snapshot is not simulated.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
    /// Configuration group supplying the physics parameters
    pub group: GroupName,
    /// Whether the spring integrator drives this node
    pub movement: bool,
    /// Whether this node carries a collider
    pub collision: bool,
    /// Extra collider offset at weight 0, added to the group offset
    pub col_offset_min: Vec3,
    /// Extra collider offset at weight 100, added to the group offset
    pub col_offset_max: Vec3,
    /// Cluster id shared by bones that form one logical body, 0 for none
    pub collision_group: u32,
}

impl NodeConfig {
    /// Create a node entry with movement and collision enabled
    pub fn new(group: impl Into<GroupName>) -> Self {
        NodeConfig {
            group: group.into(),
            movement: true,
            collision: true,
            col_offset_min: Vec3::ZERO,
            col_offset_max: Vec3::ZERO,
            collision_group: 0,
        }
    }

    /// Set the movement toggle
    pub fn with_movement(mut self, movement: bool) -> Self {
        self.movement = movement;
        self
    }

    /// Set the collision toggle
    pub fn with_collision(mut self, collision: bool) -> Self {
        self.collision = collision;
        self
    }

    /// Set the collision cluster id
    pub fn with_collision_group(mut self, group: u32) -> Self {
        self.collision_group = group;
        self
    }

    /// Set the additive collider offsets
    pub fn with_col_offset(mut self, min: Vec3, max: Vec3) -> Self {
        self.col_offset_min = min;
        self.col_offset_max = max;
        self
    }

    pub(crate) fn sanitize(&mut self) -> usize {
        let mut changed = 0;
        changed += clamp_vector("node.col_offset_min", &mut self.col_offset_min, f32::MIN, f32::MAX, Vec3::ZERO) as usize;
        changed += clamp_vector("node.col_offset_max", &mut self.col_offset_max, f32::MIN, f32::MAX, Vec3::ZERO) as usize;
        changed
    }
}

/// Settings shared by every simulated actor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalPhysics {
    /// Length of one sub-step in seconds
    pub time_tick: f32,
    /// Maximum number of sub-steps per frame
    pub max_substeps: u32,
    /// Distance beyond which a bone is considered teleported and reset
    pub max_diff: f32,
    /// Global collision enable
    pub collisions: bool,
    /// Safety clamp for bone velocity magnitude
    pub max_velocity: f32,
    /// Skip contacts between bones of the same cluster
    pub ignore_same_group_collisions: bool,
    /// Log controller statistics at every profiler interval
    pub controller_stats: bool,
    /// Profiler averaging window in seconds
    pub profiler_interval: f32,
    /// Longest backlog of simulated time carried between frames, 0 for unbounded
    pub max_carry: f32,
}

impl Default for GlobalPhysics {
    fn default() -> Self {
        GlobalPhysics {
            time_tick: 1.0 / 60.0,
            max_substeps: 10,
            max_diff: 360.0,
            collisions: true,
            max_velocity: 1000.0,
            ignore_same_group_collisions: false,
            controller_stats: false,
            profiler_interval: 1.0,
            max_carry: 0.0,
        }
    }
}

impl GlobalPhysics {
    /// Smallest accepted sub-step length
    pub const MIN_TIME_TICK: f32 = 0.001;
    /// Largest accepted sub-step length
    pub const MAX_TIME_TICK: f32 = 0.25;

    /// Report the first out-of-range setting, if any
    pub fn validate(&self) -> SimResult<()> {
        if !self.time_tick.is_finite() || self.time_tick <= 0.0 {
            return Err(SimError::InvalidTimestep(self.time_tick));
        }
        check("time_tick", self.time_tick, Self::MIN_TIME_TICK, Self::MAX_TIME_TICK)?;
        check("max_substeps", self.max_substeps as f32, 1.0, 100.0)?;
        check("max_diff", self.max_diff, 1.0, 1.0e6)?;
        check("max_velocity", self.max_velocity, MIN_VELOCITY_LIMIT, MAX_VELOCITY_LIMIT)?;
        check("profiler_interval", self.profiler_interval, 0.1, 60.0)?;
        check("max_carry", self.max_carry, 0.0, f32::MAX)?;
        Ok(())
    }

    /// Clamp every setting into its valid range
    pub fn sanitize(&mut self) -> usize {
        let d = GlobalPhysics::default();
        let mut changed = 0;
        if !self.time_tick.is_finite() || self.time_tick <= 0.0 {
            log::warn!("time_tick: invalid value {}, using {}", self.time_tick, d.time_tick);
            self.time_tick = d.time_tick;
            changed += 1;
        }
        changed += clamp_scalar(
            "time_tick",
            &mut self.time_tick,
            Self::MIN_TIME_TICK,
            Self::MAX_TIME_TICK,
            d.time_tick,
        ) as usize;
        if !(1..=100).contains(&self.max_substeps) {
            let clamped = self.max_substeps.clamp(1, 100);
            log::warn!("max_substeps: {} out of range, clamped to {}", self.max_substeps, clamped);
            self.max_substeps = clamped;
            changed += 1;
        }
        changed += clamp_scalar("max_diff", &mut self.max_diff, 1.0, 1.0e6, d.max_diff) as usize;
        changed += clamp_scalar(
            "max_velocity",
            &mut self.max_velocity,
            MIN_VELOCITY_LIMIT,
            MAX_VELOCITY_LIMIT,
            d.max_velocity,
        ) as usize;
        changed += clamp_scalar(
            "profiler_interval",
            &mut self.profiler_interval,
            0.1,
            60.0,
            d.profiler_interval,
        ) as usize;
        changed += clamp_scalar("max_carry", &mut self.max_carry, 0.0, f32::MAX, d.max_carry) as usize;
        changed
    }
}
