//! Core mesh data structures.
//!
//! This module covers everything up to (but not including) curvature:
//! validating raw input into a [`Blueprint`] and deriving the [`Mesh`]
//! topology from it.
//!
//! # Index Types
//!
//! Mesh entities are identified by type-safe handles:
//! - [`VertexId`] - a vertex (equal to its blueprint id)
//! - [`TriangleId`] - a triangle (equal to its blueprint row)
//! - [`LinkId`] - a directed triangle side
//!
//! Handles are generic over the underlying integer type ([`MeshIndex`]).
//!
//! # Construction
//!
//! ```
//! use dtsmesh::mesh::{build_blueprint, generate, Mesh, MeshArrays};
//!
//! let arrays = MeshArrays::from_rows(
//!     &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 1.0, 0.0]],
//!     &[[0, 1, 2]],
//! );
//! let blueprint = build_blueprint(&arrays).unwrap();
//! let mesh: Mesh = generate(&blueprint).unwrap();
//! assert_eq!(mesh.num_links(), 3);
//! ```

mod blueprint;
mod builder;
mod index;
mod topology;

pub use blueprint::{
    build_blueprint, build_blueprint_from_file, normalize_direction, Blueprint, BlueprintInclusion,
    BlueprintTriangle, BlueprintVertex, MeshArrays, MIN_DIRECTION_NORM,
};
pub use builder::generate;
pub use index::{LinkId, MeshIndex, TriangleId, VertexId};
pub use topology::{Link, LinkKind, Mesh, Triangle, Vertex, VertexClass};
