//! Error types for level conversion.

use crate::convert::strip::StripifyError;
use thiserror::Error;

/// Result type alias using ConvertError.
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Main error type for level conversion operations.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse or write scene JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The strip generator could not produce strips for a mesh.
    #[error("strip generation failed for mesh {mesh}: {source}")]
    StripGenerationFailed {
        mesh: usize,
        #[source]
        source: StripifyError,
    },

    /// A polygon chunk the converter cannot reconstruct geometry from.
    #[error("unexpected chunk type {type_id} at poly chunk {position}")]
    UnexpectedChunkVariant { type_id: u8, position: usize },

    /// An index referenced a slot that does not exist.
    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// A mesh polygon referenced a vertex the attach does not have.
    #[error("mesh {mesh} references vertex {index} out of range (len {len})")]
    VertexOutOfRange { mesh: usize, index: usize, len: usize },

    /// A mesh whose parallel arrays do not line up with its polygons.
    #[error("malformed mesh {mesh}: {reason}")]
    MalformedMesh { mesh: usize, reason: String },

    /// More distinct vertices than a 16-bit strip index can address.
    #[error("too many distinct vertices: {0}")]
    TooManyVertices(usize),

    /// Binary chunk stream could not be decoded.
    #[error("chunk codec error at byte {offset}: {reason}")]
    Codec { offset: usize, reason: String },

    /// Wraps a failure with the name of the attach being converted.
    #[error("failed to convert attach '{name}': {source}")]
    Attach {
        name: String,
        #[source]
        source: Box<ConvertError>,
    },
}

impl ConvertError {
    /// Attach the name of the attach that was being converted.
    pub fn in_attach(self, name: &str) -> Self {
        ConvertError::Attach {
            name: name.to_string(),
            source: Box::new(self),
        }
    }
}
