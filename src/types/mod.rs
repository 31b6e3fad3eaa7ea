//! Shared types used throughout the library.

mod surface;
mod transform;

pub use surface::SurfaceFlags;
pub use transform::{Bams, ModelTransform};

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A position or normal in model space.
pub type Vector3 = [f32; 3];

/// An 8-bit-per-channel color, stored the way the engines store it (ARGB).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(0xFF, 0xFF, 0xFF, 0xFF);
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);

    pub const fn new(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self { a, r, g, b }
    }

    /// Build from a packed `0xAARRGGBB` value.
    pub fn from_argb(value: u32) -> Self {
        let [a, r, g, b] = value.to_be_bytes();
        Self { a, r, g, b }
    }

    /// Pack into a `0xAARRGGBB` value.
    pub fn to_argb(self) -> u32 {
        u32::from_be_bytes([self.a, self.r, self.g, self.b])
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

/// A texture coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Uv {
    pub u: f32,
    pub v: f32,
}

impl Uv {
    pub fn new(u: f32, v: f32) -> Self {
        Self { u, v }
    }

    /// Quantize to the fixed-point pair used by strip chunks.
    ///
    /// `range` is 255 for normal-range UVs and 1023 for high-range UVs.
    pub fn to_fixed(self, range: f32) -> [i16; 2] {
        let quantize =
            |x: f32| (x * range).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        [quantize(self.u), quantize(self.v)]
    }

    pub fn from_fixed(value: [i16; 2], range: f32) -> Self {
        Self {
            u: value[0] as f32 / range,
            v: value[1] as f32 / range,
        }
    }
}

/// A triangle strip: indices plus the winding parity flag.
///
/// Triangle `k` of the strip is `(s[k], s[k+1], s[k+2])` when `k` is even and
/// `(s[k+1], s[k], s[k+2])` when `k` is odd. `reversed` flips that parity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Strip {
    pub indices: Vec<u16>,
    #[serde(default)]
    pub reversed: bool,
}

impl Strip {
    pub fn new(indices: Vec<u16>, reversed: bool) -> Self {
        Self { indices, reversed }
    }

    /// Number of triangles the strip encodes (degenerates included).
    pub fn triangle_count(&self) -> usize {
        self.indices.len().saturating_sub(2)
    }

    /// Expand the strip into wound triangles, skipping degenerate ones.
    pub fn triangles(&self) -> impl Iterator<Item = [u16; 3]> + '_ {
        self.indices
            .windows(3)
            .enumerate()
            .map(move |(k, w)| {
                if (k % 2 == 0) != self.reversed {
                    [w[0], w[1], w[2]]
                } else {
                    [w[1], w[0], w[2]]
                }
            })
            .filter(|t| t[0] != t[1] && t[1] != t[2] && t[0] != t[2])
    }
}

/// A bounding sphere.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingSphere {
    pub center: Vector3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vector3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Sphere centered on the axis-aligned bounds of `points`, wide enough to hold all of them.
    pub fn from_points(points: &[Vector3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut min = Vec3::from_array(*first);
        let mut max = min;
        for p in rest {
            let p = Vec3::from_array(*p);
            min = min.min(p);
            max = max.max(p);
        }

        let center = (min + max) * 0.5;
        let radius = points
            .iter()
            .map(|p| center.distance(Vec3::from_array(*p)))
            .fold(0.0f32, f32::max);

        Some(Self {
            center: center.to_array(),
            radius,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_argb_packing() {
        let c = Color::from_argb(0x80FF2010);
        assert_eq!(c, Color::new(0x80, 0xFF, 0x20, 0x10));
        assert_eq!(c.to_argb(), 0x80FF2010);
    }

    #[test]
    fn test_uv_fixed_point() {
        let uv = Uv::new(1.0, -0.5);
        assert_eq!(uv.to_fixed(255.0), [255, -128]);
        assert_eq!(uv.to_fixed(1023.0), [1023, -512]);
        assert_eq!(Uv::from_fixed([255, 0], 255.0), Uv::new(1.0, 0.0));
    }

    #[test]
    fn test_strip_triangles_alternate_winding() {
        let strip = Strip::new(vec![0, 1, 2, 3, 4], false);
        let tris: Vec<_> = strip.triangles().collect();
        assert_eq!(tris, vec![[0, 1, 2], [2, 1, 3], [2, 3, 4]]);

        let reversed = Strip::new(vec![0, 1, 2, 3], true);
        let tris: Vec<_> = reversed.triangles().collect();
        assert_eq!(tris, vec![[1, 0, 2], [1, 2, 3]]);
    }

    #[test]
    fn test_strip_skips_degenerates() {
        let strip = Strip::new(vec![0, 1, 2, 2, 3, 4], false);
        assert_eq!(strip.triangle_count(), 4);
        assert_eq!(strip.triangles().count(), 2);
    }

    #[test]
    fn test_bounding_sphere_from_points() {
        let sphere =
            BoundingSphere::from_points(&[[-1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.5, 0.0]])
                .unwrap();
        assert_eq!(sphere.center, [0.0, 0.25, 0.0]);
        assert!((sphere.radius - (1.0f32 + 0.0625).sqrt()).abs() < 1e-6);
        assert!(BoundingSphere::from_points(&[]).is_none());
    }
}
