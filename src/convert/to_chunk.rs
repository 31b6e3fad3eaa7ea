//! Basic→Chunk conversion.

use super::cache::{CachedVertex, VertexCache};
use super::strip::{triangulate_quads, StripAdapter, Stripifier};
use super::ConverterConfig;
use crate::basic::{BasicAttach, BasicMesh, Polys};
use crate::chunk::{
    ChunkAttach, ChunkStrip, MaterialChunk, PolyChunk, StripChunk, StripFlags, StripKind,
    TextureChunk, VertexChunk, VertexChunkKind,
};
use crate::error::{ConvertError, Result};
use crate::types::{BoundingSphere, Color, Strip, Uv};
use std::collections::HashMap;

/// Builds one chunk attach from one basic attach.
pub(crate) struct ChunkBuilder<'a, S: ?Sized> {
    attach: &'a BasicAttach,
    config: &'a ConverterConfig,
    adapter: StripAdapter<'a, S>,
    cache: VertexCache,
    poly: Vec<PolyChunk>,
    has_normal: bool,
    has_color: bool,
}

impl<'a, S: Stripifier + ?Sized> ChunkBuilder<'a, S> {
    pub fn new(attach: &'a BasicAttach, config: &'a ConverterConfig, stripifier: &'a S) -> Self {
        Self {
            attach,
            config,
            adapter: StripAdapter::new(stripifier),
            cache: VertexCache::with_capacity(attach.vertices.len()),
            poly: Vec::new(),
            has_normal: attach.has_normals(),
            has_color: attach.meshes.iter().any(|m| m.vcolor.is_some()),
        }
    }

    pub fn build(mut self) -> Result<ChunkAttach> {
        let attach = self.attach;

        // Normals must cover every vertex a mesh can reference.
        let addressable = if self.has_normal {
            attach.vertices.len().min(attach.normals.len())
        } else {
            attach.vertices.len()
        };
        for (i, mesh) in attach.meshes.iter().enumerate() {
            mesh.validate(i, addressable)?;
        }

        for (i, mesh) in attach.meshes.iter().enumerate() {
            self.add_mesh(i, mesh)?;
        }

        let kind = VertexChunkKind::for_profile(self.has_normal, self.has_color);
        let mut vertex = Vec::new();
        if !self.cache.is_empty() {
            vertex.push(vertex_chunk(kind, &self.cache));
        }

        let bounds = if self.config.recompute_bounds {
            BoundingSphere::from_points(&attach.vertices).unwrap_or(attach.bounds)
        } else {
            attach.bounds
        };

        log::debug!(
            "{}: {} meshes -> {} vertices ({:?}), {} poly chunks",
            attach.name,
            attach.meshes.len(),
            self.cache.len(),
            kind,
            self.poly.len()
        );

        Ok(ChunkAttach {
            name: attach.name.clone(),
            vertex,
            poly: self.poly,
            bounds,
        })
    }

    fn add_mesh(&mut self, index: usize, mesh: &BasicMesh) -> Result<()> {
        if mesh.polys.is_empty() {
            log::debug!("{}: mesh {} has no polygons, skipped", self.attach.name, index);
            return Ok(());
        }

        let strips = match &mesh.polys {
            Polys::Triangles(triangles) => {
                let (indices, uvs) = self.intern_list(mesh, triangles.iter().flatten())?;
                self.strip_list(index, &indices, uvs)?
            }
            Polys::Quads(quads) => {
                let (indices, uvs) = self.intern_list(mesh, quads.iter().flatten())?;
                let quads: Vec<[u16; 4]> = indices
                    .chunks_exact(4)
                    .map(|q| [q[0], q[1], q[2], q[3]])
                    .collect();
                self.strip_list(index, &triangulate_quads(&quads), uvs)?
            }
            Polys::Strips(strips) | Polys::NPoly(strips) => self.intern_strips(mesh, strips)?,
        };

        let mut flags = StripFlags::default();
        match self.attach.material(mesh.material_id) {
            Ok(material) => {
                if material.use_texture {
                    self.poly.push(PolyChunk::Texture(TextureChunk::from_material(material)));
                }
                self.poly.push(PolyChunk::Material(MaterialChunk::from_material(material)));
                flags = StripFlags::from_material(material);
            }
            Err(err) => log::warn!("{}: mesh {}: {}", self.attach.name, index, err),
        }

        let kind = if mesh.uv.is_some() {
            self.config.uv_precision.strip_kind()
        } else {
            StripKind::Strip
        };
        self.poly.push(PolyChunk::Strip(StripChunk {
            kind,
            flags,
            user_flag_count: 0,
            strips,
        }));
        Ok(())
    }

    fn vertex_at(&self, mesh: &BasicMesh, vertex: u16, corner: usize) -> CachedVertex {
        let v = vertex as usize;
        CachedVertex::new(self.attach.vertices[v])
            .with_normal(self.has_normal.then(|| self.attach.normals[v]))
            .with_color(mesh.vcolor.as_ref().map(|c| c[corner]))
    }

    /// Intern triangle or quad corners with their UVs.
    ///
    /// Returns the interned indices and, when the mesh has UVs, the UV of each
    /// interned index. Later corners overwrite earlier ones.
    fn intern_list<'m>(
        &mut self,
        mesh: &BasicMesh,
        corners: impl Iterator<Item = &'m u16>,
    ) -> Result<(Vec<u16>, Option<HashMap<u16, Uv>>)> {
        let mut indices = Vec::with_capacity(mesh.polys.corner_count());
        let mut uvmap = mesh.uv.as_ref().map(|_| HashMap::new());

        for (corner, &vertex) in corners.enumerate() {
            let uv = mesh.uv.as_ref().map(|uv| uv[corner]);
            let cached = self.vertex_at(mesh, vertex, corner).with_uv(uv);
            let index = self.cache.intern(cached)?;
            if let (Some(map), Some(uv)) = (uvmap.as_mut(), uv) {
                map.insert(index, uv);
            }
            indices.push(index);
        }
        Ok((indices, uvmap))
    }

    fn strip_list(
        &self,
        mesh: usize,
        triangles: &[u16],
        uvmap: Option<HashMap<u16, Uv>>,
    ) -> Result<Vec<ChunkStrip>> {
        let strips = self
            .adapter
            .strips_from_triangles(triangles)
            .map_err(|source| ConvertError::StripGenerationFailed { mesh, source })?;

        Ok(strips
            .into_iter()
            .map(|Strip { indices, reversed }| {
                let uvs = uvmap.as_ref().map(|map| {
                    indices
                        .iter()
                        .map(|i| map.get(i).copied().unwrap_or_default())
                        .collect()
                });
                ChunkStrip {
                    uvs,
                    ..ChunkStrip::new(indices, reversed)
                }
            })
            .collect())
    }

    /// Intern explicit strips without UVs; UVs stay per corner.
    fn intern_strips(&mut self, mesh: &BasicMesh, strips: &[Strip]) -> Result<Vec<ChunkStrip>> {
        let mut corner = 0;
        let mut out = Vec::with_capacity(strips.len());
        for strip in strips {
            let start = corner;
            let mut indices = Vec::with_capacity(strip.indices.len());
            for &vertex in &strip.indices {
                let cached = self.vertex_at(mesh, vertex, corner);
                indices.push(self.cache.intern(cached)?);
                corner += 1;
            }
            let uvs = mesh.uv.as_ref().map(|uv| uv[start..corner].to_vec());
            out.push(ChunkStrip {
                uvs,
                ..ChunkStrip::new(indices, strip.reversed)
            });
        }
        Ok(out)
    }
}

fn vertex_chunk(kind: VertexChunkKind, cache: &VertexCache) -> VertexChunk {
    let entries = cache.entries();
    let mut chunk = VertexChunk::new(kind);
    chunk.vertices = entries.iter().map(|v| v.position).collect();
    if kind.has_normal() {
        chunk.normals = entries.iter().map(|v| v.normal.unwrap_or_default()).collect();
    }
    if kind.has_diffuse() {
        chunk.diffuse = entries
            .iter()
            .map(|v| v.color.unwrap_or(Color::WHITE))
            .collect();
    }
    chunk
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::Material;
    use crate::convert::strip::MeshoptStripifier;
    use crate::convert::UvPrecision;

    fn convert(attach: &BasicAttach, config: &ConverterConfig) -> Result<ChunkAttach> {
        ChunkBuilder::new(attach, config, &MeshoptStripifier).build()
    }

    fn quad_attach() -> BasicAttach {
        let mut attach = BasicAttach::new("quad");
        attach.vertices = vec![[0.0; 3]; 10];
        attach.vertices.extend([
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
        ]);
        attach.materials.push(Material::default());
        attach
            .meshes
            .push(BasicMesh::new(0, Polys::Quads(vec![[10, 11, 12, 13]])));
        attach
    }

    #[test]
    fn test_quad_becomes_one_strip() {
        let chunk = convert(&quad_attach(), &ConverterConfig::default()).unwrap();

        assert_eq!(chunk.vertex.len(), 1);
        assert_eq!(chunk.vertex[0].kind, VertexChunkKind::Vertex);
        assert_eq!(chunk.vertex[0].vertex_count(), 4);
        assert_eq!(chunk.vertex[0].size_words(), 4 * 3 + 1);

        let kinds: Vec<u8> = chunk.poly.iter().map(PolyChunk::type_id).collect();
        assert_eq!(kinds, vec![8, 21, 64]);

        let strip = chunk.strip_chunks().next().unwrap();
        assert_eq!(strip.strips, vec![ChunkStrip::new(vec![0, 1, 2, 3], false)]);
        assert!(strip.flags.contains(StripFlags::USE_ALPHA));
    }

    #[test]
    fn test_profile_selects_vertex_kind() {
        let mut attach = quad_attach();
        attach.normals = vec![[0.0, 1.0, 0.0]; attach.vertices.len()];
        let chunk = convert(&attach, &ConverterConfig::default()).unwrap();
        assert_eq!(chunk.vertex[0].kind, VertexChunkKind::VertexNormal);
        assert_eq!(chunk.vertex[0].normals.len(), 4);

        attach.meshes[0].vcolor = Some(vec![Color::new(0xFF, 1, 2, 3); 4]);
        let chunk = convert(&attach, &ConverterConfig::default()).unwrap();
        assert_eq!(chunk.vertex[0].kind, VertexChunkKind::VertexNormalDiffuse8);
        assert_eq!(chunk.vertex[0].diffuse, vec![Color::new(0xFF, 1, 2, 3); 4]);
    }

    #[test]
    fn test_uv_strips_follow_precision() {
        let mut attach = quad_attach();
        let uvs = vec![
            Uv::new(0.0, 0.0),
            Uv::new(1.0, 0.0),
            Uv::new(0.0, 1.0),
            Uv::new(1.0, 1.0),
        ];
        attach.meshes[0].uv = Some(uvs.clone());

        let chunk = convert(&attach, &ConverterConfig::default()).unwrap();
        let strip = chunk.strip_chunks().next().unwrap();
        assert_eq!(strip.kind, StripKind::StripUvn);
        assert_eq!(strip.strips[0].uvs.as_ref(), Some(&uvs));

        let config = ConverterConfig::default().with_uv_precision(UvPrecision::High);
        let chunk = convert(&attach, &config).unwrap();
        assert_eq!(chunk.strip_chunks().next().unwrap().kind, StripKind::StripUvh);
    }

    #[test]
    fn test_strips_keep_corner_uvs_and_winding() {
        let mut attach = quad_attach();
        attach.meshes[0] = BasicMesh::new(
            0,
            Polys::Strips(vec![Strip::new(vec![10, 11, 12, 11, 13], true)]),
        )
        .with_uv((0..5).map(|i| Uv::new(i as f32, 0.0)).collect());

        let chunk = convert(&attach, &ConverterConfig::default()).unwrap();
        assert_eq!(chunk.vertex[0].vertex_count(), 4);

        let strip = &chunk.strip_chunks().next().unwrap().strips[0];
        assert!(strip.reversed);
        assert_eq!(strip.indices, vec![0, 1, 2, 1, 3]);
        assert_eq!(strip.uvs.as_ref().map(Vec::len), Some(5));
        assert_eq!(strip.uvs.as_ref().unwrap()[3], Uv::new(3.0, 0.0));
    }

    #[test]
    fn test_missing_material_emits_strip_only() {
        let mut attach = quad_attach();
        attach.meshes[0].material_id = 4;
        let chunk = convert(&attach, &ConverterConfig::default()).unwrap();
        assert_eq!(chunk.poly.len(), 1);
        assert!(matches!(chunk.poly[0], PolyChunk::Strip(_)));
    }

    #[test]
    fn test_untextured_material_skips_texture_chunk() {
        let mut attach = quad_attach();
        attach.materials[0].use_texture = false;
        let chunk = convert(&attach, &ConverterConfig::default()).unwrap();
        let kinds: Vec<u8> = chunk.poly.iter().map(PolyChunk::type_id).collect();
        assert_eq!(kinds, vec![21, 64]);
    }

    #[test]
    fn test_bad_vertex_index_is_fatal() {
        let mut attach = quad_attach();
        attach.meshes.push(attach.meshes[0].clone());
        attach.meshes[1].polys = Polys::Triangles(vec![[0, 1, 99]]);
        assert!(matches!(
            convert(&attach, &ConverterConfig::default()),
            Err(ConvertError::VertexOutOfRange { mesh: 1, index: 99, .. })
        ));
    }

    #[test]
    fn test_recompute_bounds() {
        let attach = quad_attach();
        let kept = convert(&attach, &ConverterConfig::default()).unwrap();
        assert_eq!(kept.bounds, attach.bounds);

        let config = ConverterConfig::default().with_recompute_bounds(true);
        let recomputed = convert(&attach, &config).unwrap();
        assert_eq!(recomputed.bounds.center, [0.5, 0.0, 0.5]);
    }
}
