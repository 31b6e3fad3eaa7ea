//! Chunk→Basic conversion.
//!
//! Vertex chunks are laid out into one arena by index offset. Poly chunks are
//! replayed in order against a running material; every strip chunk becomes one
//! basic mesh with a snapshot of that material. Finally the referenced index range
//! is cut out of the arena and all indices are rebased onto it.

use super::ConverterConfig;
use crate::basic::{BasicAttach, BasicMesh, Material, Polys};
use crate::chunk::{ChunkAttach, ChunkStrip, PolyChunk, StripChunk, VertexChunk};
use crate::error::{ConvertError, Result};
use crate::types::{BoundingSphere, Color, Strip, Uv, Vector3};

/// Grow-only vertex storage addressed by absolute chunk index.
#[derive(Debug, Default)]
pub(crate) struct VertexArena {
    vertices: Vec<Vector3>,
    normals: Vec<Vector3>,
    has_normals: bool,
}

impl VertexArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy a vertex chunk in at its offset, zero-filling any gap before it.
    pub fn place(&mut self, chunk: &VertexChunk) {
        let start = chunk.index_offset as usize;
        let end = chunk.end_index();
        if self.vertices.len() < end {
            self.vertices.resize(end, [0.0; 3]);
            self.normals.resize(end, [0.0; 3]);
        }

        self.vertices[start..end].copy_from_slice(&chunk.vertices);
        if chunk.kind.has_normal() {
            self.has_normals = true;
            for (slot, normal) in self.normals[start..end].iter_mut().zip(&chunk.normals) {
                *slot = *normal;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Vertices and normals in `min..=max`. Normals are empty when no chunk had any.
    pub fn slice(&self, min: u16, max: u16) -> Result<(Vec<Vector3>, Vec<Vector3>)> {
        let (min, max) = (min as usize, max as usize);
        if max >= self.len() {
            return Err(ConvertError::IndexOutOfRange {
                what: "vertex",
                index: max,
                len: self.len(),
            });
        }

        let vertices = self.vertices[min..=max].to_vec();
        let normals = if self.has_normals {
            self.normals[min..=max].to_vec()
        } else {
            Vec::new()
        };
        Ok((vertices, normals))
    }
}

/// Smallest and largest index referenced so far.
#[derive(Debug, Clone, Copy, Default)]
struct IndexRange(Option<(u16, u16)>);

impl IndexRange {
    fn include(&mut self, (lo, hi): (u16, u16)) {
        self.0 = Some(match self.0 {
            Some((min, max)) => (min.min(lo), max.max(hi)),
            None => (lo, hi),
        });
    }
}

pub(crate) fn convert(attach: &ChunkAttach, config: &ConverterConfig) -> Result<BasicAttach> {
    let mut arena = VertexArena::new();
    for chunk in &attach.vertex {
        arena.place(chunk);
    }

    let mut material = Material {
        use_texture: true,
        ..Material::default()
    };
    let mut meshes = Vec::new();
    let mut materials = Vec::new();
    let mut range = IndexRange::default();

    for (position, chunk) in attach.poly.iter().enumerate() {
        match chunk {
            PolyChunk::BlendAlpha {
                source,
                destination,
            } => {
                material.source_alpha = *source;
                material.destination_alpha = *destination;
            }
            PolyChunk::SpecularExponent { exponent } => material.exponent = *exponent as f32,
            PolyChunk::Texture(texture) => texture.apply(&mut material),
            PolyChunk::Material(chunk) => chunk.apply(&mut material),
            PolyChunk::MipmapDAdjust { .. }
            | PolyChunk::CachePolygonList { .. }
            | PolyChunk::DrawPolygonList { .. } => {}
            PolyChunk::Strip(strip) => {
                strip.flags.apply(&mut material);
                if let Some(indices) = strip.index_range() {
                    range.include(indices);
                }
                let material_id = u16::try_from(materials.len()).map_err(|_| {
                    ConvertError::IndexOutOfRange {
                        what: "material",
                        index: materials.len(),
                        len: u16::MAX as usize + 1,
                    }
                })?;
                meshes.push(strip_mesh(material_id, strip));
                materials.push(material);
            }
            PolyChunk::Raw(raw) if chunk.produces_mesh() => {
                return Err(ConvertError::UnexpectedChunkVariant {
                    type_id: raw.type_id,
                    position,
                });
            }
            PolyChunk::Raw(raw) => {
                log::debug!(
                    "{}: skipping chunk type {} at {}",
                    attach.name,
                    raw.type_id,
                    position
                );
            }
        }
    }

    let (vertices, normals) = match range.0 {
        Some((min, max)) => {
            let slices = arena.slice(min, max)?;
            for mesh in &mut meshes {
                mesh.polys.for_each_index_mut(|i| *i -= min);
            }
            slices
        }
        None => (Vec::new(), Vec::new()),
    };

    let bounds = if config.recompute_bounds {
        BoundingSphere::from_points(&vertices).unwrap_or(attach.bounds)
    } else {
        attach.bounds
    };

    log::debug!(
        "{}: {} poly chunks -> {} meshes over {} vertices",
        attach.name,
        attach.poly.len(),
        meshes.len(),
        vertices.len()
    );

    Ok(BasicAttach {
        name: attach.name.clone(),
        vertices,
        normals,
        meshes,
        materials,
        bounds,
    })
}

fn strip_mesh(material_id: u16, chunk: &StripChunk) -> BasicMesh {
    let strips = chunk
        .strips
        .iter()
        .map(|s| Strip::new(s.indices.clone(), s.reversed))
        .collect();
    let mut mesh = BasicMesh::new(material_id, Polys::Strips(strips));

    if chunk.kind.has_uv() {
        mesh.uv = Some(per_corner(chunk, |s| s.uvs.as_deref(), Uv::default()));
    }
    if chunk.kind.has_color() {
        mesh.vcolor = Some(per_corner(chunk, |s| s.colors.as_deref(), Color::WHITE));
    }
    mesh
}

/// Flatten one per-index attribute across all strips, padding short strips.
fn per_corner<T: Copy>(
    chunk: &StripChunk,
    field: impl Fn(&ChunkStrip) -> Option<&[T]>,
    fill: T,
) -> Vec<T> {
    let mut out = Vec::new();
    for strip in &chunk.strips {
        let values = field(strip).unwrap_or(&[]);
        out.extend(
            (0..strip.indices.len()).map(|i| values.get(i).copied().unwrap_or(fill)),
        );
    }
    out
}
