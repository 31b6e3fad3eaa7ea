//! # Level Converter
//!
//! A Rust library for converting level geometry between the Basic and Chunk
//! model formats.
//!
//! ## Overview
//!
//! A Basic attach is a flat indexed mesh: shared vertex and normal arrays, a
//! material table, and meshes of triangles, quads, strips or polygons. A Chunk
//! attach is a stream of typed chunks: vertex chunks placed at index offsets, and
//! poly chunks that change material state and draw strips. This library converts
//! attaches in both directions and applies the same conversion to whole levels.
//!
//! ## Quick Start
//!
//! ```ignore
//! use level_converter::{load_level, Converter};
//!
//! let level = load_level("path/to/level.sa1lvl")?;
//! let converted = level.convert(&Converter::new())?;
//! converted.save("path/to/level.sa2lvl")?;
//! ```
//!
//! ## Single Attaches
//!
//! ```ignore
//! use level_converter::{BasicAttach, Converter};
//!
//! let converter = Converter::new();
//! let chunk = converter.to_chunk(&basic_attach)?;
//! let bytes = level_converter::chunk::codec::write_poly_chunks(&chunk.poly)?;
//! ```

pub mod error;
pub mod types;
pub mod basic;
pub mod chunk;
pub mod convert;
pub mod scene;

// Re-export main types for convenience
pub use error::{ConvertError, Result};
pub use types::{Bams, BoundingSphere, Color, ModelTransform, Strip, SurfaceFlags, Uv, Vector3};
pub use basic::{BasicAttach, BasicMesh, Material, Polys};
pub use chunk::{ChunkAttach, PolyChunk, StripChunk, VertexChunk};
pub use convert::{Converter, ConverterConfig, MeshoptStripifier, Stripifier, UvPrecision};
pub use scene::{Attach, GeoEntry, LevelFormat, LevelScene, ModelNode};

/// Load a level from a JSON file.
pub fn load_level<P: AsRef<std::path::Path>>(path: P) -> Result<LevelScene> {
    LevelScene::load(path)
}

/// Convert a level to the other format with the given configuration.
pub fn convert_level(level: &LevelScene, config: ConverterConfig) -> Result<LevelScene> {
    level.convert(&Converter::with_config(config))
}

#[cfg(feature = "wasm")]
pub mod wasm;
