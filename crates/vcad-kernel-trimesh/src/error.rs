//! Error types for triangle mesh construction.

use thiserror::Error;

/// Errors that can occur while building or configuring a [`TriangleMesh`](crate::TriangleMesh).
///
/// Queries never fail; only `set` and configuration loading do.
#[derive(Error, Debug)]
pub enum TriMeshError {
    /// The vertex buffer could not be allocated.
    #[error("failed to allocate vertex buffer for {triangles} triangles ({bytes} bytes)")]
    Allocation {
        /// Requested triangle count.
        triangles: usize,
        /// Requested size in bytes (saturated on overflow).
        bytes: usize,
    },

    /// Flat vertex input is not a whole number of triangles.
    #[error("vertex data has {0} floats, expected a multiple of 9")]
    VertexCount(usize),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for triangle mesh operations.
pub type Result<T> = std::result::Result<T, TriMeshError>;
