//! Basic-format materials.

use crate::types::Color;
use serde::{Deserialize, Serialize};

/// Blend factor for alpha blending, as a 3-bit field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlphaInstruction {
    Zero,
    One,
    OtherColor,
    InverseOtherColor,
    #[default]
    SourceAlpha,
    InverseSourceAlpha,
    DestinationAlpha,
    InverseDestinationAlpha,
}

impl AlphaInstruction {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 7 {
            0 => AlphaInstruction::Zero,
            1 => AlphaInstruction::One,
            2 => AlphaInstruction::OtherColor,
            3 => AlphaInstruction::InverseOtherColor,
            4 => AlphaInstruction::SourceAlpha,
            5 => AlphaInstruction::InverseSourceAlpha,
            6 => AlphaInstruction::DestinationAlpha,
            _ => AlphaInstruction::InverseDestinationAlpha,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// Texture filtering mode, as a 2-bit field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    PointSampled,
    #[default]
    Bilinear,
    Trilinear,
    Reserved,
}

impl FilterMode {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 3 {
            0 => FilterMode::PointSampled,
            1 => FilterMode::Bilinear,
            2 => FilterMode::Trilinear,
            _ => FilterMode::Reserved,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// Surface appearance for one Basic mesh.
///
/// Materials are plain values: converters copy them rather than share them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub diffuse: Color,
    pub specular: Color,
    pub exponent: f32,
    pub texture_id: u32,
    pub use_texture: bool,
    pub use_alpha: bool,
    pub double_sided: bool,
    pub flat_shading: bool,
    pub ignore_lighting: bool,
    pub ignore_specular: bool,
    pub environment_map: bool,
    pub clamp_u: bool,
    pub clamp_v: bool,
    pub flip_u: bool,
    pub flip_v: bool,
    pub super_sample: bool,
    pub filter_mode: FilterMode,
    pub source_alpha: AlphaInstruction,
    pub destination_alpha: AlphaInstruction,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: Color::new(0xFF, 0xB2, 0xB2, 0xB2),
            specular: Color::TRANSPARENT,
            exponent: 11.0,
            texture_id: 0,
            use_texture: true,
            use_alpha: true,
            double_sided: false,
            flat_shading: false,
            ignore_lighting: false,
            ignore_specular: false,
            environment_map: false,
            clamp_u: false,
            clamp_v: false,
            flip_u: false,
            flip_v: false,
            super_sample: false,
            filter_mode: FilterMode::Bilinear,
            source_alpha: AlphaInstruction::SourceAlpha,
            destination_alpha: AlphaInstruction::InverseSourceAlpha,
        }
    }
}

impl Material {
    /// Specular exponent as stored in chunk data (0-255).
    pub fn exponent_byte(&self) -> u8 {
        self.exponent.clamp(0.0, 255.0) as u8
    }
}
