//! Model placement transforms.

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Binary angle measurement: `0x10000` is a full turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bams(pub i32);

impl Bams {
    pub fn from_degrees(degrees: f32) -> Self {
        Self((degrees / 360.0 * 65536.0).round() as i32)
    }

    pub fn to_degrees(self) -> f32 {
        self.0 as f32 / 65536.0 * 360.0
    }

    pub fn to_radians(self) -> f32 {
        self.to_degrees().to_radians()
    }
}

/// Placement of a model node. Copied verbatim onto converted entries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelTransform {
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default)]
    pub rotation: [Bams; 3],
    #[serde(default = "default_scale")]
    pub scale: [f32; 3],
}

fn default_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [Bams(0); 3],
            scale: default_scale(),
        }
    }
}

impl ModelTransform {
    /// Check if this is an identity transform.
    pub fn is_identity(&self) -> bool {
        self.position == [0.0; 3] && self.rotation == [Bams(0); 3] && self.scale == [1.0; 3]
    }

    /// Local-to-world matrix (scale, then X/Y/Z rotation, then translation).
    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::ZYX,
            self.rotation[2].to_radians(),
            self.rotation[1].to_radians(),
            self.rotation[0].to_radians(),
        );
        Mat4::from_scale_rotation_translation(
            Vec3::from_array(self.scale),
            rotation,
            Vec3::from_array(self.position),
        )
    }
}
