//! The Chunk attach representation.
//!
//! A [`ChunkAttach`] is two ordered chunk lists. Vertex chunks each place a run of
//! vertices at an index offset in one shared vertex space. Poly chunks are a state
//! machine: bits, texture and material chunks change the current material, and each
//! strip chunk draws strips with whatever state has accumulated so far.

pub mod codec;

use crate::basic::{AlphaInstruction, FilterMode, Material};
use crate::types::{BoundingSphere, Color, Uv, Vector3};
use serde::{Deserialize, Serialize};

/// Chunk type ids.
pub mod ids {
    pub const NULL: u8 = 0;
    pub const BITS_BLEND_ALPHA: u8 = 1;
    pub const BITS_MIPMAP_D_ADJUST: u8 = 2;
    pub const BITS_SPECULAR_EXPONENT: u8 = 3;
    pub const BITS_CACHE_POLYGON_LIST: u8 = 4;
    pub const BITS_DRAW_POLYGON_LIST: u8 = 5;
    pub const TINY_TEXTURE_ID: u8 = 8;
    pub const TINY_TEXTURE_ID2: u8 = 9;
    pub const MATERIAL: u8 = 16;
    pub const MATERIAL2: u8 = 24;
    pub const VERTEX_VERTEX: u8 = 34;
    pub const VERTEX_DIFFUSE8: u8 = 35;
    pub const VERTEX_NORMAL: u8 = 41;
    pub const VERTEX_NORMAL_DIFFUSE8: u8 = 42;
    pub const STRIP: u8 = 64;
    pub const END: u8 = 255;
}

/// Broad class of a chunk type id, which also fixes its header layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkCategory {
    Null,
    Bits,
    Tiny,
    Material,
    Vertex,
    Volume,
    Strip,
    End,
    Reserved,
}

impl ChunkCategory {
    pub fn of(type_id: u8) -> Self {
        match type_id {
            0 => ChunkCategory::Null,
            1..=7 => ChunkCategory::Bits,
            8..=15 => ChunkCategory::Tiny,
            16..=31 => ChunkCategory::Material,
            32..=55 => ChunkCategory::Vertex,
            56..=63 => ChunkCategory::Volume,
            64..=127 => ChunkCategory::Strip,
            255 => ChunkCategory::End,
            _ => ChunkCategory::Reserved,
        }
    }

    /// Whether chunks of this class describe polygons.
    pub fn is_geometry(self) -> bool {
        matches!(self, ChunkCategory::Volume | ChunkCategory::Strip)
    }
}

/// Attribute layout of a vertex chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexChunkKind {
    Vertex,
    VertexDiffuse8,
    VertexNormal,
    VertexNormalDiffuse8,
}

impl VertexChunkKind {
    /// The narrowest layout that carries the requested attributes.
    pub fn for_profile(has_normal: bool, has_color: bool) -> Self {
        match (has_normal, has_color) {
            (true, true) => VertexChunkKind::VertexNormalDiffuse8,
            (false, true) => VertexChunkKind::VertexDiffuse8,
            (true, false) => VertexChunkKind::VertexNormal,
            (false, false) => VertexChunkKind::Vertex,
        }
    }

    pub fn type_id(self) -> u8 {
        match self {
            VertexChunkKind::Vertex => ids::VERTEX_VERTEX,
            VertexChunkKind::VertexDiffuse8 => ids::VERTEX_DIFFUSE8,
            VertexChunkKind::VertexNormal => ids::VERTEX_NORMAL,
            VertexChunkKind::VertexNormalDiffuse8 => ids::VERTEX_NORMAL_DIFFUSE8,
        }
    }

    pub fn from_type_id(type_id: u8) -> Option<Self> {
        match type_id {
            ids::VERTEX_VERTEX => Some(VertexChunkKind::Vertex),
            ids::VERTEX_DIFFUSE8 => Some(VertexChunkKind::VertexDiffuse8),
            ids::VERTEX_NORMAL => Some(VertexChunkKind::VertexNormal),
            ids::VERTEX_NORMAL_DIFFUSE8 => Some(VertexChunkKind::VertexNormalDiffuse8),
            _ => None,
        }
    }

    /// Size of one vertex in 32-bit words.
    pub fn stride_words(self) -> usize {
        match self {
            VertexChunkKind::Vertex => 3,
            VertexChunkKind::VertexDiffuse8 => 4,
            VertexChunkKind::VertexNormal => 6,
            VertexChunkKind::VertexNormalDiffuse8 => 7,
        }
    }

    pub fn has_normal(self) -> bool {
        matches!(
            self,
            VertexChunkKind::VertexNormal | VertexChunkKind::VertexNormalDiffuse8
        )
    }

    pub fn has_diffuse(self) -> bool {
        matches!(
            self,
            VertexChunkKind::VertexDiffuse8 | VertexChunkKind::VertexNormalDiffuse8
        )
    }
}

/// A run of vertices placed at `index_offset` in the attach's vertex space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexChunk {
    pub kind: VertexChunkKind,
    #[serde(default)]
    pub flags: u8,
    #[serde(default)]
    pub index_offset: u16,
    pub vertices: Vec<Vector3>,
    #[serde(default)]
    pub normals: Vec<Vector3>,
    #[serde(default)]
    pub diffuse: Vec<Color>,
}

impl VertexChunk {
    pub fn new(kind: VertexChunkKind) -> Self {
        Self {
            kind,
            flags: 0,
            index_offset: 0,
            vertices: Vec::new(),
            normals: Vec::new(),
            diffuse: Vec::new(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// On-disk body size in 32-bit words: the offset/count word plus the vertices.
    pub fn size_words(&self) -> usize {
        self.vertex_count() * self.kind.stride_words() + 1
    }

    /// One past the last index this chunk writes.
    pub fn end_index(&self) -> usize {
        self.index_offset as usize + self.vertex_count()
    }
}

/// Tiny texture-id chunk.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureChunk {
    /// Selects the second texture slot (type id 9).
    pub second: bool,
    pub texture_id: u16,
    pub mipmap_d_adjust: u8,
    pub clamp_u: bool,
    pub clamp_v: bool,
    pub flip_u: bool,
    pub flip_v: bool,
    pub super_sample: bool,
    pub filter_mode: FilterMode,
}

impl TextureChunk {
    pub fn from_material(material: &Material) -> Self {
        Self {
            second: false,
            texture_id: material.texture_id as u16,
            mipmap_d_adjust: 0,
            clamp_u: material.clamp_u,
            clamp_v: material.clamp_v,
            flip_u: material.flip_u,
            flip_v: material.flip_v,
            super_sample: material.super_sample,
            filter_mode: material.filter_mode,
        }
    }

    pub fn apply(&self, material: &mut Material) {
        material.clamp_u = self.clamp_u;
        material.clamp_v = self.clamp_v;
        material.flip_u = self.flip_u;
        material.flip_v = self.flip_v;
        material.super_sample = self.super_sample;
        material.filter_mode = self.filter_mode;
        material.texture_id = self.texture_id as u32;
    }

    pub fn type_id(&self) -> u8 {
        if self.second {
            ids::TINY_TEXTURE_ID2
        } else {
            ids::TINY_TEXTURE_ID
        }
    }
}

/// Material chunk. Which colors are present selects the type id.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialChunk {
    pub second: bool,
    pub source_alpha: AlphaInstruction,
    pub destination_alpha: AlphaInstruction,
    pub diffuse: Option<Color>,
    pub ambient: Option<Color>,
    pub specular: Option<Color>,
    pub specular_exponent: u8,
}

impl MaterialChunk {
    pub fn from_material(material: &Material) -> Self {
        Self {
            second: false,
            source_alpha: material.source_alpha,
            destination_alpha: material.destination_alpha,
            diffuse: Some(material.diffuse),
            ambient: None,
            specular: Some(material.specular),
            specular_exponent: material.exponent_byte(),
        }
    }

    /// Overwrite the fields this chunk carries.
    pub fn apply(&self, material: &mut Material) {
        material.source_alpha = self.source_alpha;
        material.destination_alpha = self.destination_alpha;
        if let Some(diffuse) = self.diffuse {
            material.diffuse = diffuse;
        }
        if let Some(specular) = self.specular {
            material.specular = specular;
            material.exponent = self.specular_exponent as f32;
        }
    }

    /// Bit 0 diffuse, bit 1 ambient, bit 2 specular.
    pub fn color_mask(&self) -> u8 {
        self.diffuse.is_some() as u8
            | (self.ambient.is_some() as u8) << 1
            | (self.specular.is_some() as u8) << 2
    }

    pub fn type_id(&self) -> u8 {
        let base = if self.second { ids::MATERIAL2 } else { ids::MATERIAL };
        base | self.color_mask()
    }
}

/// Render flags carried in a strip chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StripFlags(pub u8);

impl StripFlags {
    pub const IGNORE_LIGHT: StripFlags = StripFlags(0x01);
    pub const IGNORE_SPECULAR: StripFlags = StripFlags(0x02);
    pub const IGNORE_AMBIENT: StripFlags = StripFlags(0x04);
    pub const USE_ALPHA: StripFlags = StripFlags(0x08);
    pub const DOUBLE_SIDE: StripFlags = StripFlags(0x10);
    pub const FLAT_SHADING: StripFlags = StripFlags(0x20);
    pub const ENVIRONMENT_MAPPING: StripFlags = StripFlags(0x40);

    pub fn contains(self, flag: StripFlags) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn set(&mut self, flag: StripFlags, on: bool) {
        if on {
            self.0 |= flag.0;
        } else {
            self.0 &= !flag.0;
        }
    }

    pub fn from_material(material: &Material) -> Self {
        let mut flags = StripFlags::default();
        flags.set(StripFlags::IGNORE_LIGHT, material.ignore_lighting);
        flags.set(StripFlags::IGNORE_SPECULAR, material.ignore_specular);
        flags.set(StripFlags::USE_ALPHA, material.use_alpha);
        flags.set(StripFlags::DOUBLE_SIDE, material.double_sided);
        flags.set(StripFlags::FLAT_SHADING, material.flat_shading);
        flags.set(StripFlags::ENVIRONMENT_MAPPING, material.environment_map);
        flags
    }

    pub fn apply(self, material: &mut Material) {
        material.ignore_lighting = self.contains(StripFlags::IGNORE_LIGHT);
        material.ignore_specular = self.contains(StripFlags::IGNORE_SPECULAR);
        material.use_alpha = self.contains(StripFlags::USE_ALPHA);
        material.double_sided = self.contains(StripFlags::DOUBLE_SIDE);
        material.flat_shading = self.contains(StripFlags::FLAT_SHADING);
        material.environment_map = self.contains(StripFlags::ENVIRONMENT_MAPPING);
    }
}

/// Per-index payload layout of a strip chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StripKind {
    Strip,
    StripUvn,
    StripUvh,
    StripNormal,
    StripUvnNormal,
    StripUvhNormal,
    StripColor,
    StripUvnColor,
    StripUvhColor,
    Strip2,
    StripUvn2,
    StripUvh2,
}

impl StripKind {
    const ALL: [StripKind; 12] = [
        StripKind::Strip,
        StripKind::StripUvn,
        StripKind::StripUvh,
        StripKind::StripNormal,
        StripKind::StripUvnNormal,
        StripKind::StripUvhNormal,
        StripKind::StripColor,
        StripKind::StripUvnColor,
        StripKind::StripUvhColor,
        StripKind::Strip2,
        StripKind::StripUvn2,
        StripKind::StripUvh2,
    ];

    pub fn type_id(self) -> u8 {
        ids::STRIP + self as u8
    }

    pub fn from_type_id(type_id: u8) -> Option<Self> {
        let index = type_id.checked_sub(ids::STRIP)? as usize;
        StripKind::ALL.get(index).copied()
    }

    /// Fixed-point scale of the UVs, if the kind carries any.
    pub fn uv_range(self) -> Option<f32> {
        match self {
            StripKind::StripUvn
            | StripKind::StripUvnNormal
            | StripKind::StripUvnColor
            | StripKind::StripUvn2 => Some(255.0),
            StripKind::StripUvh
            | StripKind::StripUvhNormal
            | StripKind::StripUvhColor
            | StripKind::StripUvh2 => Some(1023.0),
            _ => None,
        }
    }

    pub fn has_uv(self) -> bool {
        self.uv_range().is_some()
    }

    /// Dual-texture kinds carry a second UV set per index.
    pub fn has_second_uv(self) -> bool {
        matches!(self, StripKind::StripUvn2 | StripKind::StripUvh2)
    }

    pub fn has_normal(self) -> bool {
        matches!(
            self,
            StripKind::StripNormal | StripKind::StripUvnNormal | StripKind::StripUvhNormal
        )
    }

    pub fn has_color(self) -> bool {
        matches!(
            self,
            StripKind::StripColor | StripKind::StripUvnColor | StripKind::StripUvhColor
        )
    }
}

/// One strip inside a strip chunk, with its per-index attributes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChunkStrip {
    #[serde(default)]
    pub reversed: bool,
    pub indices: Vec<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uvs: Option<Vec<Uv>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uvs2: Option<Vec<Uv>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normals: Option<Vec<Vector3>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<Color>>,
    /// `user_flag_count` values for every triangle after the first two indices.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_flags: Vec<u16>,
}

impl ChunkStrip {
    pub fn new(indices: Vec<u16>, reversed: bool) -> Self {
        Self {
            reversed,
            indices,
            ..Default::default()
        }
    }

    pub fn with_uvs(mut self, uvs: Vec<Uv>) -> Self {
        self.uvs = Some(uvs);
        self
    }
}

/// A strip chunk: a group of strips drawn with the accumulated material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StripChunk {
    pub kind: StripKind,
    #[serde(default)]
    pub flags: StripFlags,
    #[serde(default)]
    pub user_flag_count: u8,
    pub strips: Vec<ChunkStrip>,
}

impl StripChunk {
    pub fn new(kind: StripKind) -> Self {
        Self {
            kind,
            flags: StripFlags::default(),
            user_flag_count: 0,
            strips: Vec::new(),
        }
    }

    /// Smallest and largest referenced vertex index.
    pub fn index_range(&self) -> Option<(u16, u16)> {
        let mut indices = self.strips.iter().flat_map(|s| s.indices.iter().copied());
        let first = indices.next()?;
        Some(indices.fold((first, first), |(lo, hi), i| (lo.min(i), hi.max(i))))
    }

    pub fn triangle_count(&self) -> usize {
        self.strips
            .iter()
            .map(|s| s.indices.len().saturating_sub(2))
            .sum()
    }
}

/// A chunk kept as undecoded bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawChunk {
    pub type_id: u8,
    #[serde(default)]
    pub flags: u8,
    #[serde(default)]
    pub body: Vec<u8>,
}

impl RawChunk {
    pub fn category(&self) -> ChunkCategory {
        ChunkCategory::of(self.type_id)
    }
}

/// One entry of the poly chunk list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "chunk", rename_all = "snake_case")]
pub enum PolyChunk {
    BlendAlpha {
        source: AlphaInstruction,
        destination: AlphaInstruction,
    },
    MipmapDAdjust {
        value: u8,
    },
    SpecularExponent {
        exponent: u8,
    },
    CachePolygonList {
        list: u8,
    },
    DrawPolygonList {
        list: u8,
    },
    Texture(TextureChunk),
    Material(MaterialChunk),
    Strip(StripChunk),
    Raw(RawChunk),
}

impl PolyChunk {
    pub fn type_id(&self) -> u8 {
        match self {
            PolyChunk::BlendAlpha { .. } => ids::BITS_BLEND_ALPHA,
            PolyChunk::MipmapDAdjust { .. } => ids::BITS_MIPMAP_D_ADJUST,
            PolyChunk::SpecularExponent { .. } => ids::BITS_SPECULAR_EXPONENT,
            PolyChunk::CachePolygonList { .. } => ids::BITS_CACHE_POLYGON_LIST,
            PolyChunk::DrawPolygonList { .. } => ids::BITS_DRAW_POLYGON_LIST,
            PolyChunk::Texture(t) => t.type_id(),
            PolyChunk::Material(m) => m.type_id(),
            PolyChunk::Strip(s) => s.kind.type_id(),
            PolyChunk::Raw(r) => r.type_id,
        }
    }

    pub fn category(&self) -> ChunkCategory {
        ChunkCategory::of(self.type_id())
    }

    /// Whether the chunk changes the current material.
    pub fn applies_to_material(&self) -> bool {
        matches!(
            self,
            PolyChunk::BlendAlpha { .. }
                | PolyChunk::SpecularExponent { .. }
                | PolyChunk::Texture(_)
                | PolyChunk::Material(_)
                | PolyChunk::Strip(_)
        )
    }

    /// Whether the chunk draws polygons.
    pub fn produces_mesh(&self) -> bool {
        match self {
            PolyChunk::Strip(_) => true,
            PolyChunk::Raw(raw) => raw.category().is_geometry(),
            _ => false,
        }
    }
}

/// Chunk-format geometry payload of a model node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChunkAttach {
    pub name: String,
    #[serde(default)]
    pub vertex: Vec<VertexChunk>,
    #[serde(default)]
    pub poly: Vec<PolyChunk>,
    #[serde(default)]
    pub bounds: BoundingSphere,
}

impl ChunkAttach {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex.iter().map(VertexChunk::vertex_count).sum()
    }

    pub fn strip_chunks(&self) -> impl Iterator<Item = &StripChunk> {
        self.poly.iter().filter_map(|chunk| match chunk {
            PolyChunk::Strip(strip) => Some(strip),
            _ => None,
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.strip_chunks().map(StripChunk::triangle_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_chunk_size_words() {
        for (kind, stride) in [
            (VertexChunkKind::Vertex, 3),
            (VertexChunkKind::VertexDiffuse8, 4),
            (VertexChunkKind::VertexNormal, 6),
            (VertexChunkKind::VertexNormalDiffuse8, 7),
        ] {
            let mut chunk = VertexChunk::new(kind);
            chunk.vertices = vec![[0.0; 3]; 10];
            assert_eq!(chunk.size_words(), 10 * stride + 1);
        }
    }

    #[test]
    fn test_vertex_kind_profile() {
        assert_eq!(
            VertexChunkKind::for_profile(true, true),
            VertexChunkKind::VertexNormalDiffuse8
        );
        assert_eq!(
            VertexChunkKind::for_profile(false, true).type_id(),
            ids::VERTEX_DIFFUSE8
        );
        assert_eq!(VertexChunkKind::from_type_id(41), Some(VertexChunkKind::VertexNormal));
        assert_eq!(VertexChunkKind::from_type_id(36), None);
    }

    #[test]
    fn test_strip_kind_ids() {
        assert_eq!(StripKind::from_type_id(64), Some(StripKind::Strip));
        assert_eq!(StripKind::from_type_id(71), Some(StripKind::StripUvnColor));
        assert_eq!(StripKind::from_type_id(75), Some(StripKind::StripUvh2));
        assert_eq!(StripKind::from_type_id(76), None);
        assert_eq!(StripKind::from_type_id(8), None);
        assert_eq!(StripKind::StripUvh.type_id(), 66);
        assert!(StripKind::StripUvnColor.has_color());
        assert!(!StripKind::Strip2.has_uv());
    }

    #[test]
    fn test_material_chunk_type_id() {
        let chunk = MaterialChunk {
            diffuse: Some(Color::WHITE),
            specular: Some(Color::WHITE),
            ..Default::default()
        };
        assert_eq!(chunk.type_id(), 21);
        let second = MaterialChunk {
            second: true,
            ambient: Some(Color::WHITE),
            ..Default::default()
        };
        assert_eq!(second.type_id(), 26);
    }

    #[test]
    fn test_material_chunk_only_touches_present_fields() {
        let mut material = Material::default();
        let before = material.diffuse;
        MaterialChunk {
            source_alpha: AlphaInstruction::One,
            destination_alpha: AlphaInstruction::Zero,
            specular: Some(Color::new(0xFF, 1, 2, 3)),
            specular_exponent: 8,
            ..Default::default()
        }
        .apply(&mut material);
        assert_eq!(material.diffuse, before);
        assert_eq!(material.specular, Color::new(0xFF, 1, 2, 3));
        assert_eq!(material.exponent, 8.0);
        assert_eq!(material.source_alpha, AlphaInstruction::One);
    }

    #[test]
    fn test_strip_flags_material_mapping() {
        let mut material = Material::default();
        material.double_sided = true;
        material.use_alpha = false;
        material.environment_map = true;
        let flags = StripFlags::from_material(&material);
        assert!(flags.contains(StripFlags::DOUBLE_SIDE));
        assert!(flags.contains(StripFlags::ENVIRONMENT_MAPPING));
        assert!(!flags.contains(StripFlags::USE_ALPHA));

        let mut other = Material::default();
        flags.apply(&mut other);
        assert!(other.double_sided);
        assert!(!other.use_alpha);
    }

    #[test]
    fn test_capabilities() {
        let strip = PolyChunk::Strip(StripChunk::new(StripKind::Strip));
        assert!(strip.produces_mesh());
        assert!(strip.applies_to_material());

        let mipmap = PolyChunk::MipmapDAdjust { value: 3 };
        assert!(!mipmap.applies_to_material());
        assert!(!mipmap.produces_mesh());

        let volume = PolyChunk::Raw(RawChunk { type_id: 56, flags: 0, body: Vec::new() });
        assert!(volume.produces_mesh());
        assert_eq!(volume.category(), ChunkCategory::Volume);
    }

    #[test]
    fn test_strip_chunk_index_range() {
        let mut chunk = StripChunk::new(StripKind::Strip);
        assert_eq!(chunk.index_range(), None);
        chunk.strips.push(ChunkStrip::new(vec![7, 3, 9], false));
        chunk.strips.push(ChunkStrip::new(vec![4, 12, 5, 6], true));
        assert_eq!(chunk.index_range(), Some((3, 12)));
        assert_eq!(chunk.triangle_count(), 3);
    }
}
