//! Attach conversion between the Basic and Chunk representations.
//!
//! [`Converter::to_chunk`] deduplicates vertices into a single vertex chunk and
//! turns every basic mesh into texture/material/strip chunks. [`Converter::to_basic`]
//! replays a chunk stream into per-material meshes over the referenced vertex range.

pub mod cache;
pub mod strip;
mod to_basic;
mod to_chunk;

pub use cache::{CachedVertex, VertexCache};
pub use strip::{
    triangulate_quads, MeshoptStripifier, PrimitiveGroup, PrimitiveKind, StripAdapter,
    Stripifier, StripifyError,
};

use crate::basic::BasicAttach;
use crate::chunk::{ChunkAttach, StripKind};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Fixed-point range used for UVs in emitted strip chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UvPrecision {
    /// 1/255 steps.
    #[default]
    Normal,
    /// 1/1023 steps.
    High,
}

impl UvPrecision {
    pub fn strip_kind(self) -> StripKind {
        match self {
            UvPrecision::Normal => StripKind::StripUvn,
            UvPrecision::High => StripKind::StripUvh,
        }
    }
}

/// Converter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Precision of UV strips written for textured meshes.
    pub uv_precision: UvPrecision,
    /// Appended to model and attach names of converted level entries.
    pub name_suffix: String,
    /// Convert each distinct attach name once per scene and reuse the result.
    pub share_converted_attaches: bool,
    /// Recompute bounding spheres from the converted vertices.
    pub recompute_bounds: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            uv_precision: UvPrecision::Normal,
            name_suffix: "_cnk".to_string(),
            share_converted_attaches: true,
            recompute_bounds: false,
        }
    }
}

impl ConverterConfig {
    pub fn with_uv_precision(mut self, precision: UvPrecision) -> Self {
        self.uv_precision = precision;
        self
    }

    pub fn with_name_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.name_suffix = suffix.into();
        self
    }

    pub fn with_shared_attaches(mut self, share: bool) -> Self {
        self.share_converted_attaches = share;
        self
    }

    pub fn with_recompute_bounds(mut self, recompute: bool) -> Self {
        self.recompute_bounds = recompute;
        self
    }
}

/// Converts attaches in either direction.
///
/// Holds only configuration and the strip service, so one converter can be
/// shared across threads whenever the service allows it.
#[derive(Debug, Clone, Default)]
pub struct Converter<S = MeshoptStripifier> {
    config: ConverterConfig,
    stripifier: S,
}

impl Converter<MeshoptStripifier> {
    /// Create a converter with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a converter with custom configuration.
    pub fn with_config(config: ConverterConfig) -> Self {
        Self {
            config,
            stripifier: MeshoptStripifier,
        }
    }
}

impl<S: Stripifier> Converter<S> {
    /// Swap in another strip service.
    pub fn with_stripifier<T: Stripifier>(self, stripifier: T) -> Converter<T> {
        Converter {
            config: self.config,
            stripifier,
        }
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Convert a basic attach into chunk form. The name is kept as-is.
    pub fn to_chunk(&self, attach: &BasicAttach) -> Result<ChunkAttach> {
        to_chunk::ChunkBuilder::new(attach, &self.config, &self.stripifier)
            .build()
            .map_err(|err| err.in_attach(&attach.name))
    }

    /// Convert a chunk attach into basic form. The name is kept as-is.
    pub fn to_basic(&self, attach: &ChunkAttach) -> Result<BasicAttach> {
        to_basic::convert(attach, &self.config).map_err(|err| err.in_attach(&attach.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::{BasicMesh, Material, Polys};
    use crate::error::ConvertError;
    use crate::types::{Color, Strip, Uv, Vector3};

    /// Triangles as position triples, order-insensitive.
    fn position_soup(attach: &BasicAttach) -> Vec<[[u32; 3]; 3]> {
        let position = |i: u16| attach.vertices[i as usize].map(f32::to_bits);
        let mut soup: Vec<_> = attach
            .meshes
            .iter()
            .flat_map(|m| m.polys.triangles())
            .map(|t| {
                // rotate by position so vertex renumbering does not matter
                let p = t.map(position);
                let lead = (0..3).min_by_key(|&i| p[i]).unwrap_or(0);
                [p[lead], p[(lead + 1) % 3], p[(lead + 2) % 3]]
            })
            .collect();
        soup.sort_unstable();
        soup
    }

    fn grid_attach(with_normals: bool) -> BasicAttach {
        let mut attach = BasicAttach::new("grid");
        for z in 0..4 {
            for x in 0..4 {
                attach.vertices.push([x as f32, 0.0, z as f32]);
            }
        }
        if with_normals {
            attach.normals = attach
                .vertices
                .iter()
                .map(|v| [v[0] * 0.1, 1.0, v[2] * 0.1])
                .collect::<Vec<Vector3>>();
        }

        let mut quads = Vec::new();
        for z in 0..3u16 {
            for x in 0..3u16 {
                let i = z * 4 + x;
                quads.push([i, i + 1, i + 4, i + 5]);
            }
        }
        let triangles = vec![[0, 5, 1], [5, 6, 1]];

        attach.materials = vec![Material::default(), Material::default()];
        attach.materials[1].double_sided = true;
        attach.meshes = vec![
            BasicMesh::new(0, Polys::Quads(quads)),
            BasicMesh::new(1, Polys::Triangles(triangles)),
        ];
        attach
    }

    #[test]
    fn test_round_trip_preserves_geometry() {
        let converter = Converter::new();
        let original = grid_attach(true);

        let chunk = converter.to_chunk(&original).unwrap();
        let back = converter.to_basic(&chunk).unwrap();

        assert_eq!(back.name, original.name);
        assert_eq!(position_soup(&back), position_soup(&original));
        assert_eq!(back.vertices.len(), 16);
        assert_eq!(back.normals.len(), back.vertices.len());

        // every position keeps its normal bit for bit
        for (v, n) in back.vertices.iter().zip(&back.normals) {
            let source = original.vertices.iter().position(|o| o == v).unwrap();
            assert_eq!(n.map(f32::to_bits), original.normals[source].map(f32::to_bits));
        }

        assert_eq!(back.materials.len(), 2);
        assert!(back.materials[1].double_sided);
        assert!(!back.materials[0].double_sided);
    }

    #[test]
    fn test_round_trip_indices_stay_in_range() {
        let converter = Converter::new();
        let back = converter
            .to_basic(&converter.to_chunk(&grid_attach(false)).unwrap())
            .unwrap();
        assert!(back.normals.is_empty());
        for mesh in &back.meshes {
            assert!(mesh.polys.indices().all(|i| (i as usize) < back.vertices.len()));
        }
    }

    #[test]
    fn test_round_trip_keeps_uvs_per_corner() {
        let mut attach = BasicAttach::new("strip");
        attach.vertices = vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]];
        attach.materials.push(Material::default());
        let uvs = vec![
            Uv::new(0.0, 0.0),
            Uv::new(1.0, 0.0),
            Uv::new(0.0, 1.0),
            Uv::new(1.0, 1.0),
        ];
        attach.meshes.push(
            BasicMesh::new(0, Polys::Strips(vec![Strip::new(vec![0, 1, 2, 3], false)]))
                .with_uv(uvs.clone()),
        );

        let converter = Converter::new();
        let back = converter
            .to_basic(&converter.to_chunk(&attach).unwrap())
            .unwrap();
        assert_eq!(back.meshes[0].uv.as_ref(), Some(&uvs));
        assert_eq!(back.meshes[0].polys, attach.meshes[0].polys);
    }

    #[test]
    fn test_fan_interns_six_vertices() {
        let mut attach = BasicAttach::new("fan");
        attach.vertices = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 0.0, 1.0],
            [0.0, 0.0, 1.0],
            [-1.0, 0.0, 1.0],
            [-1.0, 0.0, 0.0],
        ];
        attach.meshes.push(BasicMesh::new(
            0,
            Polys::Triangles(vec![[0, 1, 2], [0, 2, 3], [0, 3, 4], [0, 4, 5]]),
        ));

        let chunk = Converter::new().to_chunk(&attach).unwrap();
        assert_eq!(chunk.vertex_count(), 6);
        // stitching may add degenerate triangles to the strips
        let back = Converter::new().to_basic(&chunk).unwrap();
        assert_eq!(back.triangle_count(), 4);
    }

    #[test]
    fn test_vertex_colors_survive() {
        let mut attach = BasicAttach::new("colored");
        attach.vertices = vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        attach.materials.push(Material::default());
        let red = Color::new(0xFF, 0xFF, 0, 0);
        attach
            .meshes
            .push(BasicMesh::new(0, Polys::Triangles(vec![[0, 1, 2]])).with_vcolor(vec![red; 3]));

        let chunk = Converter::new().to_chunk(&attach).unwrap();
        assert_eq!(chunk.vertex[0].diffuse, vec![red; 3]);
    }

    struct Failing;

    impl Stripifier for Failing {
        fn generate(&self, _: &[u16]) -> std::result::Result<Vec<PrimitiveGroup>, StripifyError> {
            Err(StripifyError::Service("out of memory".to_string()))
        }
    }

    #[test]
    fn test_strip_failure_names_attach_and_mesh() {
        let converter = Converter::new().with_stripifier(Failing);
        let err = converter.to_chunk(&grid_attach(false)).unwrap_err();
        match err {
            ConvertError::Attach { name, source } => {
                assert_eq!(name, "grid");
                assert!(matches!(
                    *source,
                    ConvertError::StripGenerationFailed { mesh: 0, .. }
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_config_builders() {
        let config = ConverterConfig::default()
            .with_uv_precision(UvPrecision::High)
            .with_name_suffix("_sa2")
            .with_shared_attaches(false);
        assert_eq!(config.uv_precision.strip_kind(), StripKind::StripUvh);
        assert_eq!(config.name_suffix, "_sa2");
        assert!(!config.share_converted_attaches);
        assert!(!config.recompute_bounds);
        assert_eq!(Converter::with_config(config.clone()).config(), &config);
    }
}
