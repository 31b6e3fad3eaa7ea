//! Triangle strip generation.
//!
//! The converter talks to strip generation through the [`Stripifier`] trait and
//! only ever consumes triangle strips. [`StripAdapter`] enforces that contract on
//! whatever the service returns, and [`MeshoptStripifier`] is the default service.

use crate::types::Strip;
use std::collections::HashSet;
use thiserror::Error;

/// Failure reported by a strip service or rejected by the adapter.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StripifyError {
    #[error("index count {0} is not a multiple of 3")]
    NotTriangleList(usize),

    #[error("no strips generated for {0} triangles")]
    NoStrips(usize),

    #[error("expected triangle strips, got {0:?}")]
    UnexpectedPrimitive(PrimitiveKind),

    #[error("strip references index {0} which is not in the input")]
    UnknownIndex(u16),

    #[error("strip service failed: {0}")]
    Service(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    TriangleList,
    TriangleStrip,
    TriangleFan,
}

/// One primitive emitted by a strip service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveGroup {
    pub kind: PrimitiveKind,
    pub indices: Vec<u16>,
}

impl PrimitiveGroup {
    pub fn strip(indices: Vec<u16>) -> Self {
        Self {
            kind: PrimitiveKind::TriangleStrip,
            indices,
        }
    }
}

/// A triangle stripification service.
///
/// `indices` is a flat triangle list. Implementations must keep the winding of
/// every input triangle under the strip convention documented on [`Strip`].
pub trait Stripifier {
    fn generate(&self, indices: &[u16]) -> Result<Vec<PrimitiveGroup>, StripifyError>;
}

impl<S: Stripifier + ?Sized> Stripifier for &S {
    fn generate(&self, indices: &[u16]) -> Result<Vec<PrimitiveGroup>, StripifyError> {
        (**self).generate(indices)
    }
}

/// Split quads `[a,b,c,d]` into the triangle pair `(a,b,c),(c,b,d)`.
pub fn triangulate_quads(quads: &[[u16; 4]]) -> Vec<u16> {
    quads
        .iter()
        .flat_map(|&[a, b, c, d]| [a, b, c, c, b, d])
        .collect()
}

/// Normalizes strip-service output into [`Strip`]s.
pub struct StripAdapter<'a, S: ?Sized> {
    service: &'a S,
}

impl<'a, S: Stripifier + ?Sized> StripAdapter<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self { service }
    }

    /// Strip a flat triangle list.
    pub fn strips_from_triangles(&self, indices: &[u16]) -> Result<Vec<Strip>, StripifyError> {
        if indices.len() % 3 != 0 {
            return Err(StripifyError::NotTriangleList(indices.len()));
        }
        if indices.is_empty() {
            return Ok(Vec::new());
        }

        let groups = self.service.generate(indices)?;
        if groups.is_empty() {
            return Err(StripifyError::NoStrips(indices.len() / 3));
        }

        let known: HashSet<u16> = indices.iter().copied().collect();
        groups
            .into_iter()
            .map(|group| {
                if group.kind != PrimitiveKind::TriangleStrip {
                    return Err(StripifyError::UnexpectedPrimitive(group.kind));
                }
                if let Some(&unknown) = group.indices.iter().find(|i| !known.contains(i)) {
                    return Err(StripifyError::UnknownIndex(unknown));
                }
                Ok(Strip::new(group.indices, false))
            })
            .collect()
    }
}

/// Strip service backed by meshoptimizer.
///
/// Strips are separated with a restart marker and split back into one group
/// per strip, so no degenerate stitching crosses strip boundaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshoptStripifier;

impl MeshoptStripifier {
    const RESTART: u32 = u32::MAX;

    pub fn new() -> Self {
        Self
    }
}

impl Stripifier for MeshoptStripifier {
    fn generate(&self, indices: &[u16]) -> Result<Vec<PrimitiveGroup>, StripifyError> {
        if indices.len() % 3 != 0 {
            return Err(StripifyError::NotTriangleList(indices.len()));
        }
        let Some(&max) = indices.iter().max() else {
            return Ok(Vec::new());
        };

        let wide: Vec<u32> = indices.iter().map(|&i| u32::from(i)).collect();
        let stripped = meshopt::stripify(&wide, usize::from(max) + 1, Self::RESTART)
            .map_err(|e| StripifyError::Service(e.to_string()))?;

        stripped
            .split(|&i| i == Self::RESTART)
            .filter(|run| !run.is_empty())
            .map(|run| {
                run.iter()
                    .map(|&i| {
                        u16::try_from(i).map_err(|_| {
                            StripifyError::Service(format!("index {i} out of range"))
                        })
                    })
                    .collect::<Result<Vec<u16>, _>>()
                    .map(PrimitiveGroup::strip)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rotate so the smallest index leads; equal for triangles of the same winding.
    fn canonical(t: [u16; 3]) -> [u16; 3] {
        let lead = (0..3).min_by_key(|&i| t[i]).unwrap_or(0);
        [t[lead], t[(lead + 1) % 3], t[(lead + 2) % 3]]
    }

    fn soup(triangles: impl IntoIterator<Item = [u16; 3]>) -> Vec<[u16; 3]> {
        let mut soup: Vec<_> = triangles.into_iter().map(canonical).collect();
        soup.sort_unstable();
        soup
    }

    fn strip_soup(strips: &[Strip]) -> Vec<[u16; 3]> {
        soup(strips.iter().flat_map(|s| s.triangles().collect::<Vec<_>>()))
    }

    fn grid(width: u16, height: u16) -> Vec<u16> {
        let mut quads = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let i = y * (width + 1) + x;
                quads.push([i, i + 1, i + width + 1, i + width + 2]);
            }
        }
        triangulate_quads(&quads)
    }

    #[test]
    fn test_quad_triangulation() {
        let indices = triangulate_quads(&[[10, 11, 12, 13]]);
        assert_eq!(indices, vec![10, 11, 12, 12, 11, 13]);

        let adapter = StripAdapter::new(&MeshoptStripifier);
        let strips = adapter.strips_from_triangles(&indices).unwrap();
        assert_eq!(strips, vec![Strip::new(vec![10, 11, 12, 13], false)]);
        assert_eq!(
            strip_soup(&strips),
            soup([[10, 11, 12], [12, 11, 13]])
        );
    }

    #[test]
    fn test_grid_keeps_winding() {
        let indices = grid(4, 3);
        let source = soup(indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]));

        let strips = StripAdapter::new(&MeshoptStripifier)
            .strips_from_triangles(&indices)
            .unwrap();
        assert_eq!(strip_soup(&strips), source);
        assert!(strips.len() < source.len());
    }

    #[test]
    fn test_disconnected_triangles() {
        let indices = [0, 1, 2, 3, 4, 5];
        let strips = StripAdapter::new(&MeshoptStripifier)
            .strips_from_triangles(&indices)
            .unwrap();
        assert_eq!(strips.len(), 2);
        assert_eq!(strip_soup(&strips), soup([[0, 1, 2], [3, 4, 5]]));
    }

    #[test]
    fn test_opposite_winding_is_not_joined() {
        // shares edge 1-2 but the second triangle faces the other way
        let indices = [0, 1, 2, 1, 2, 3];
        let strips = StripAdapter::new(&MeshoptStripifier)
            .strips_from_triangles(&indices)
            .unwrap();
        assert_eq!(strips.len(), 2);
        assert_eq!(strip_soup(&strips), soup([[0, 1, 2], [1, 2, 3]]));
    }

    #[test]
    fn test_adapter_rejects_partial_triangle() {
        let adapter = StripAdapter::new(&MeshoptStripifier);
        assert_eq!(
            adapter.strips_from_triangles(&[0, 1, 2, 3]),
            Err(StripifyError::NotTriangleList(4))
        );
        assert_eq!(adapter.strips_from_triangles(&[]), Ok(Vec::new()));
    }

    struct Fixed(Vec<PrimitiveGroup>);

    impl Stripifier for Fixed {
        fn generate(&self, _: &[u16]) -> Result<Vec<PrimitiveGroup>, StripifyError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_adapter_rejects_bad_service_output() {
        let empty = Fixed(Vec::new());
        assert_eq!(
            StripAdapter::new(&empty).strips_from_triangles(&[0, 1, 2]),
            Err(StripifyError::NoStrips(1))
        );

        let list = Fixed(vec![PrimitiveGroup {
            kind: PrimitiveKind::TriangleList,
            indices: vec![0, 1, 2],
        }]);
        assert_eq!(
            StripAdapter::new(&list).strips_from_triangles(&[0, 1, 2]),
            Err(StripifyError::UnexpectedPrimitive(PrimitiveKind::TriangleList))
        );

        let stray = Fixed(vec![PrimitiveGroup::strip(vec![0, 1, 9])]);
        assert_eq!(
            StripAdapter::new(&stray).strips_from_triangles(&[0, 1, 2]),
            Err(StripifyError::UnknownIndex(9))
        );
    }
}
