//! Error types for dtsmesh.
//!
//! This module defines all error types used throughout the library.
//! Degenerate geometry found while computing curvature is *not* an error:
//! it is logged per vertex and recorded in the curvature state.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur while validating input, building topology or loading files.
#[derive(Error, Debug)]
pub enum MeshError {
    /// An input table has the wrong dimensions.
    #[error("invalid shape for {array}: expected {expected}, got {found}")]
    InvalidShape {
        /// Name of the offending input.
        array: &'static str,
        /// The expected shape.
        expected: String,
        /// The shape that was supplied.
        found: String,
    },

    /// A triangle references a vertex index outside `[0, count)`.
    #[error("triangle {triangle} references vertex index {vertex} out of range [0, {count})")]
    InvalidVertexIndex {
        /// The triangle row.
        triangle: usize,
        /// The invalid vertex index.
        vertex: i64,
        /// Number of vertices.
        count: usize,
    },

    /// A triangle repeats a vertex.
    #[error("triangle {triangle} is degenerate (has duplicate vertices)")]
    DegenerateTriangle {
        /// The triangle row.
        triangle: usize,
    },

    /// An inclusion references a vertex index outside `[0, count)`.
    #[error("inclusion {inclusion} references vertex index {vertex} out of range [0, {count})")]
    InvalidInclusionVertex {
        /// The inclusion row.
        inclusion: usize,
        /// The invalid vertex index.
        vertex: i64,
        /// Number of vertices.
        count: usize,
    },

    /// A record id does not match its position.
    #[error("{entity} record at position {position} has id {id}")]
    NonSequentialId {
        /// Kind of record.
        entity: &'static str,
        /// Position of the record.
        position: usize,
        /// The id it carries.
        id: usize,
    },

    /// The blueprint has no active triangles.
    #[error("mesh has no active triangles")]
    EmptyMesh,

    /// An edge has more than two incident triangles.
    #[error("edge ({v0}, {v1}) has more than two incident triangles")]
    NonManifoldEdge {
        /// First vertex of the edge.
        v0: usize,
        /// Second vertex of the edge.
        v1: usize,
    },

    /// Two triangles traverse a shared edge in the same direction.
    #[error("edge ({v0}, {v1}) is traversed in the same direction by two triangles")]
    InconsistentOrientation {
        /// Origin of the directed edge.
        v0: usize,
        /// Destination of the directed edge.
        v1: usize,
    },

    /// The triangles around a vertex do not form a single fan.
    #[error("vertex {vertex} is non-manifold ({reason})")]
    NonManifoldVertex {
        /// The vertex id.
        vertex: usize,
        /// Description of the condition.
        reason: &'static str,
    },

    /// The mesh has more entities than the index type can address.
    #[error("{count} {entity} exceed the index capacity {max}")]
    IndexOverflow {
        /// Kind of entity.
        entity: &'static str,
        /// Number of entities required.
        count: usize,
        /// Largest count the index type supports.
        max: usize,
    },

    /// Building a mesh from a file failed after the file was read.
    #[error("failed to build mesh from {path}: {source}")]
    MeshBuild {
        /// The file path.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        source: Box<MeshError>,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing a mesh file.
    #[error("failed to load mesh from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// An inclusion type id has no definition in the supplied table.
    #[error("inclusion type {type_id} is not defined")]
    UnresolvedInclusionType {
        /// The missing type id.
        type_id: i64,
    },
}

/// Coarse classification of a [`MeshError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input dimensionality or shape mismatch.
    InvalidShape,
    /// Out-of-range or repeated index references.
    InvalidTopology,
    /// The connectivity does not describe a valid surface.
    TopologyBuildFailure,
    /// Mesh construction from a file failed.
    MeshBuild,
    /// Operating system I/O failure.
    Io,
    /// Malformed file content.
    Load,
    /// Unknown file extension.
    UnsupportedFormat,
    /// Missing inclusion type definition.
    UnresolvedInclusion,
}

impl MeshError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MeshError::InvalidShape { .. } => ErrorKind::InvalidShape,
            MeshError::InvalidVertexIndex { .. }
            | MeshError::DegenerateTriangle { .. }
            | MeshError::InvalidInclusionVertex { .. }
            | MeshError::NonSequentialId { .. } => ErrorKind::InvalidTopology,
            MeshError::EmptyMesh
            | MeshError::NonManifoldEdge { .. }
            | MeshError::InconsistentOrientation { .. }
            | MeshError::NonManifoldVertex { .. }
            | MeshError::IndexOverflow { .. } => ErrorKind::TopologyBuildFailure,
            MeshError::MeshBuild { .. } => ErrorKind::MeshBuild,
            MeshError::Io(_) => ErrorKind::Io,
            MeshError::LoadError { .. } => ErrorKind::Load,
            MeshError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            MeshError::UnresolvedInclusionType { .. } => ErrorKind::UnresolvedInclusion,
        }
    }

    /// Create an invalid shape error.
    pub(crate) fn shape(array: &'static str, expected: impl Into<String>, found: impl Into<String>) -> Self {
        MeshError::InvalidShape {
            array,
            expected: expected.into(),
            found: found.into(),
        }
    }
}
