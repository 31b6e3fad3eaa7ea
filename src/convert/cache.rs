//! Vertex deduplication for Basic→Chunk conversion.
//!
//! Chunk strips index one shared vertex chunk, so every distinct
//! `(position, normal, color, uv)` tuple referenced by any mesh of an attach is
//! interned exactly once. Indices are handed out in first-seen order, which keeps
//! the emitted vertex chunk byte-identical across runs.

use crate::error::{ConvertError, Result};
use crate::types::{Color, Uv, Vector3};
use std::collections::HashMap;

/// A vertex tuple as seen by the cache. Absent attributes only match absence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedVertex {
    pub position: Vector3,
    pub normal: Option<Vector3>,
    pub color: Option<Color>,
    pub uv: Option<Uv>,
}

impl CachedVertex {
    pub fn new(position: Vector3) -> Self {
        Self {
            position,
            normal: None,
            color: None,
            uv: None,
        }
    }

    pub fn with_normal(mut self, normal: Option<Vector3>) -> Self {
        self.normal = normal;
        self
    }

    pub fn with_color(mut self, color: Option<Color>) -> Self {
        self.color = color;
        self
    }

    pub fn with_uv(mut self, uv: Option<Uv>) -> Self {
        self.uv = uv;
        self
    }

    /// Bitwise identity of the tuple.
    fn key(&self) -> VertexKey {
        let bits3 = |v: Vector3| v.map(f32::to_bits);
        VertexKey {
            position: bits3(self.position),
            normal: self.normal.map(bits3),
            color: self.color,
            uv: self.uv.map(|uv| [uv.u.to_bits(), uv.v.to_bits()]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VertexKey {
    position: [u32; 3],
    normal: Option<[u32; 3]>,
    color: Option<Color>,
    uv: Option<[u32; 2]>,
}

/// Append-only interning table of vertex tuples.
#[derive(Debug, Default)]
pub struct VertexCache {
    entries: Vec<CachedVertex>,
    lookup: HashMap<VertexKey, u16>,
}

impl VertexCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            lookup: HashMap::with_capacity(capacity),
        }
    }

    /// Return the index of an identical tuple, or append this one.
    pub fn intern(&mut self, vertex: CachedVertex) -> Result<u16> {
        let key = vertex.key();
        if let Some(&index) = self.lookup.get(&key) {
            return Ok(index);
        }

        let index = u16::try_from(self.entries.len())
            .map_err(|_| ConvertError::TooManyVertices(self.entries.len() + 1))?;
        self.entries.push(vertex);
        self.lookup.insert(key, index);
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Interned tuples in index order.
    pub fn entries(&self) -> &[CachedVertex] {
        &self.entries
    }
}
