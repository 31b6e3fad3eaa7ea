//! The Basic attach representation.
//!
//! A [`BasicAttach`] is a flat indexed mesh: one shared vertex array, one shared
//! normal array, a material table, and a list of [`BasicMesh`]es that each pick one
//! material and reference the shared arrays by absolute index.

mod material;

pub use material::{AlphaInstruction, FilterMode, Material};

use crate::error::{ConvertError, Result};
use crate::types::{BoundingSphere, Color, Strip, Uv, Vector3};
use serde::{Deserialize, Serialize};

/// The polygons of one mesh. A mesh holds exactly one polygon shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "items", rename_all = "lowercase")]
pub enum Polys {
    Triangles(Vec<[u16; 3]>),
    Quads(Vec<[u16; 4]>),
    /// Arbitrary polygons, stored the same way as strips.
    NPoly(Vec<Strip>),
    Strips(Vec<Strip>),
}

impl Default for Polys {
    fn default() -> Self {
        Polys::Triangles(Vec::new())
    }
}

impl Polys {
    /// Number of polygons.
    pub fn len(&self) -> usize {
        match self {
            Polys::Triangles(t) => t.len(),
            Polys::Quads(q) => q.len(),
            Polys::NPoly(s) | Polys::Strips(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of polygon corners, i.e. the length the per-corner UV and
    /// color arrays must have.
    pub fn corner_count(&self) -> usize {
        match self {
            Polys::Triangles(t) => t.len() * 3,
            Polys::Quads(q) => q.len() * 4,
            Polys::NPoly(s) | Polys::Strips(s) => s.iter().map(|s| s.indices.len()).sum(),
        }
    }

    /// Iterate every vertex reference in corner order.
    pub fn indices(&self) -> Box<dyn Iterator<Item = u16> + '_> {
        match self {
            Polys::Triangles(t) => Box::new(t.iter().flatten().copied()),
            Polys::Quads(q) => Box::new(q.iter().flatten().copied()),
            Polys::NPoly(s) | Polys::Strips(s) => {
                Box::new(s.iter().flat_map(|s| s.indices.iter().copied()))
            }
        }
    }

    /// Apply `f` to every vertex reference in place.
    pub fn for_each_index_mut(&mut self, mut f: impl FnMut(&mut u16)) {
        match self {
            Polys::Triangles(t) => t.iter_mut().flatten().for_each(f),
            Polys::Quads(q) => q.iter_mut().flatten().for_each(f),
            Polys::NPoly(s) | Polys::Strips(s) => {
                for strip in s {
                    strip.indices.iter_mut().for_each(&mut f);
                }
            }
        }
    }

    /// Expand into wound triangles. Quads split as `(a,b,c),(c,b,d)`.
    pub fn triangles(&self) -> Vec<[u16; 3]> {
        match self {
            Polys::Triangles(t) => t.clone(),
            Polys::Quads(q) => q
                .iter()
                .flat_map(|&[a, b, c, d]| [[a, b, c], [c, b, d]])
                .collect(),
            Polys::NPoly(s) | Polys::Strips(s) => s.iter().flat_map(|s| s.triangles()).collect(),
        }
    }
}

/// One material's worth of polygons.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BasicMesh {
    #[serde(default)]
    pub material_id: u16,
    pub polys: Polys,
    /// Per-corner texture coordinates, in polygon order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv: Option<Vec<Uv>>,
    /// Per-corner vertex colors, in polygon order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcolor: Option<Vec<Color>>,
}

impl BasicMesh {
    pub fn new(material_id: u16, polys: Polys) -> Self {
        Self {
            material_id,
            polys,
            uv: None,
            vcolor: None,
        }
    }

    pub fn with_uv(mut self, uv: Vec<Uv>) -> Self {
        self.uv = Some(uv);
        self
    }

    pub fn with_vcolor(mut self, vcolor: Vec<Color>) -> Self {
        self.vcolor = Some(vcolor);
        self
    }

    /// Check that every vertex reference fits `vertex_count` and the per-corner
    /// arrays line up with the polygons.
    pub fn validate(&self, mesh: usize, vertex_count: usize) -> Result<()> {
        if let Some(index) = self.polys.indices().find(|&i| i as usize >= vertex_count) {
            return Err(ConvertError::VertexOutOfRange {
                mesh,
                index: index as usize,
                len: vertex_count,
            });
        }

        let corners = self.polys.corner_count();
        if let Some(uv) = &self.uv {
            if uv.len() != corners {
                return Err(ConvertError::MalformedMesh {
                    mesh,
                    reason: format!("{} UVs for {} corners", uv.len(), corners),
                });
            }
        }
        if let Some(vcolor) = &self.vcolor {
            if vcolor.len() != corners {
                return Err(ConvertError::MalformedMesh {
                    mesh,
                    reason: format!("{} colors for {} corners", vcolor.len(), corners),
                });
            }
        }
        Ok(())
    }
}

/// Flat indexed geometry payload of a model node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BasicAttach {
    pub name: String,
    #[serde(default)]
    pub vertices: Vec<Vector3>,
    /// Either empty or one normal per vertex.
    #[serde(default)]
    pub normals: Vec<Vector3>,
    #[serde(default)]
    pub meshes: Vec<BasicMesh>,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub bounds: BoundingSphere,
}

impl BasicAttach {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Look up a material by id.
    pub fn material(&self, id: u16) -> Result<&Material> {
        self.materials
            .get(id as usize)
            .ok_or(ConvertError::IndexOutOfRange {
                what: "material",
                index: id as usize,
                len: self.materials.len(),
            })
    }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.polys.triangles().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_triangulation() {
        let polys = Polys::Quads(vec![[10, 11, 12, 13]]);
        assert_eq!(polys.triangles(), vec![[10, 11, 12], [12, 11, 13]]);
        assert_eq!(polys.corner_count(), 4);
    }

    #[test]
    fn test_for_each_index_mut() {
        let mut polys = Polys::Strips(vec![Strip::new(vec![5, 6, 7], false)]);
        polys.for_each_index_mut(|i| *i -= 5);
        assert_eq!(polys.indices().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_validate_rejects_bad_index() {
        let mesh = BasicMesh::new(0, Polys::Triangles(vec![[0, 1, 3]]));
        let err = mesh.validate(2, 3).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::VertexOutOfRange { mesh: 2, index: 3, len: 3 }
        ));
        assert!(err.to_string().starts_with("mesh 2 "));
    }

    #[test]
    fn test_validate_rejects_short_uv_array() {
        let mesh = BasicMesh::new(0, Polys::Triangles(vec![[0, 1, 2]]))
            .with_uv(vec![Uv::default(); 2]);
        assert!(matches!(
            mesh.validate(4, 3),
            Err(ConvertError::MalformedMesh { mesh: 4, .. })
        ));
    }

    #[test]
    fn test_material_lookup_out_of_range() {
        let mut attach = BasicAttach::new("level");
        attach.materials.push(Material::default());
        assert!(attach.material(0).is_ok());
        assert!(matches!(
            attach.material(1),
            Err(ConvertError::IndexOutOfRange { what: "material", .. })
        ));
    }

    #[test]
    fn test_mesh_json_shape() {
        let json = r#"{
            "material_id": 1,
            "polys": {"type": "quads", "items": [[0, 1, 2, 3]]},
            "uv": [
                {"u": 0.0, "v": 0.0}, {"u": 1.0, "v": 0.0},
                {"u": 0.0, "v": 1.0}, {"u": 1.0, "v": 1.0}
            ]
        }"#;
        let mesh: BasicMesh = serde_json::from_str(json).unwrap();
        assert_eq!(mesh.material_id, 1);
        assert_eq!(mesh.polys, Polys::Quads(vec![[0, 1, 2, 3]]));
        assert_eq!(mesh.uv.as_ref().map(Vec::len), Some(4));
        assert!(mesh.vcolor.is_none());
    }
}
