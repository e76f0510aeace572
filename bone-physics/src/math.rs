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
//! Skeleton node transforms
//!
//! Engine skeletons describe every node with a rotation matrix, a translation
//! and a single uniform scale. This module mirrors that layout on top of
//! `glam` so bone data can be exchanged with the host without conversion.

use glam::{Mat3, Vec3};

/// Tolerance used for degenerate-length checks
pub const EPSILON: f32 = 1e-6;

/// Rigid transform with uniform scale
///
/// Points are transformed as `rotation * (point * scale) + translation`.
///
/// # Examples
///
/// ```
/// use bone_physics::math::Transform;
/// use glam::Vec3;
///
/// let parent = Transform::from_translation(Vec3::new(0.0, 0.0, 100.0));
/// let p = parent.transform_point(Vec3::new(1.0, 0.0, 0.0));
/// assert_eq!(p, Vec3::new(1.0, 0.0, 100.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Orthonormal rotation
    pub rotation: Mat3,
    /// Translation in parent space
    pub translation: Vec3,
    /// Uniform scale
    pub scale: f32,
}

impl Transform {
    /// The identity transform
    pub const IDENTITY: Transform = Transform {
        rotation: Mat3::IDENTITY,
        translation: Vec3::ZERO,
        scale: 1.0,
    };

    /// Create a transform from its parts
    pub fn new(rotation: Mat3, translation: Vec3, scale: f32) -> Self {
        Transform {
            rotation,
            translation,
            scale,
        }
    }

    /// Create a pure translation
    pub fn from_translation(translation: Vec3) -> Self {
        Transform {
            translation,
            ..Transform::IDENTITY
        }
    }

    /// Map a point from this transform's local space into its parent space
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * (point * self.scale) + self.translation
    }

    /// Compose `self` (parent) with a child-local transform
    pub fn mul_transform(&self, local: &Transform) -> Transform {
        Transform {
            rotation: self.rotation * local.rotation,
            translation: self.transform_point(local.translation),
            scale: self.scale * local.scale,
        }
    }

    /// Check if every component is finite
    pub fn is_valid(&self) -> bool {
        self.rotation.is_finite() && self.translation.is_finite() && self.scale.is_finite()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::IDENTITY
    }
}

/// Linear interpolation between `min` and `max` by an actor weight in `0..=100`
pub fn lerp_by_weight(weight: f32, min: f32, max: f32) -> f32 {
    let t = (weight / 100.0).clamp(0.0, 1.0);
    min + (max - min) * t
}

/// Component-wise [`lerp_by_weight`]
pub fn lerp_by_weight_vec(weight: f32, min: Vec3, max: Vec3) -> Vec3 {
    let t = (weight / 100.0).clamp(0.0, 1.0);
    min.lerp(max, t)
}
