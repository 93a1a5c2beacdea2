//! World transforms for merge sources

use glam::{Affine3A, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Translation, rotation and scale of a placed primitive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    /// World position
    pub translation: Vec3,
    /// World rotation
    pub rotation: Quat,
    /// World scale
    pub scale: Vec3,
}

impl Transform {
    /// Identity transform
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Create a pure translation
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Create a new transform from all components
    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Get the affine matrix (scale, then rotation, then translation)
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Express this transform in the frame of `origin`.
    ///
    /// Returns `origin⁻¹ · self`, so applying the result to local geometry
    /// gives coordinates relative to `origin`.
    pub fn relative_to(&self, origin: &Transform) -> Affine3A {
        origin.to_affine().inverse() * self.to_affine()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
