//! # dtsmesh
//!
//! Triangulated membrane meshes for dynamically triangulated surface
//! simulations.
//!
//! dtsmesh turns raw vertex/triangle tables or FreeDTS topology files into a
//! surface with full link topology, classifies vertices as surface or
//! boundary, and estimates per-vertex principal curvatures with a discrete
//! shape operator.
//!
//! ## Features
//!
//! - **Validated input**: shape and index checks before any topology exists
//! - **Link topology**: directed links with mirrors, type-safe indices
//! - **Shape-operator curvature**: principal curvatures and directions,
//!   boundary corrections, optional periodic boxes
//! - **File formats**: FreeDTS `.tsi` and `.q`, PLY
//! - **Inclusions**: typed vertex markers with deferred type resolution
//!
//! ## Quick Start
//!
//! ```no_run
//! use dtsmesh::prelude::*;
//!
//! let surface = load_mesh("vesicle.tsi").unwrap();
//!
//! println!("Vertices: {}", surface.vertices().nrows());
//! println!("Triangles: {}", surface.triangles().nrows());
//!
//! let curvatures = surface.vertex_curvatures();
//! let areas = surface.vertex_areas();
//! for r in 0..areas.len() {
//!     println!("p1={} p2={} area={}", curvatures[(r, 0)], curvatures[(r, 1)], areas[r]);
//! }
//! ```
//!
//! ## Building Meshes Programmatically
//!
//! ```
//! use dtsmesh::prelude::*;
//!
//! // A tetrahedron
//! let arrays = MeshArrays::from_rows(
//!     &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 1.0, 0.0], [0.5, 0.5, 1.0]],
//!     &[[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]],
//! );
//!
//! let surface = build_mesh(&arrays).unwrap();
//! assert_eq!(surface.vertices().nrows(), 4);
//! assert!(surface.mesh().edge_vertices().is_empty());
//! assert!(surface.mean_curvatures().iter().all(|&h| h > 0.0));
//! ```
//!
//! ## Topology Traversal
//!
//! ```
//! use dtsmesh::prelude::*;
//!
//! # let arrays = MeshArrays::from_rows(
//! #     &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
//! #     &[[0, 1, 2], [0, 2, 3]],
//! # );
//! let surface = build_mesh(&arrays).unwrap();
//! let mesh = surface.mesh();
//!
//! // Outgoing links of a vertex
//! let v = VertexId::new(0);
//! for &l in mesh.vertex_links(v) {
//!     let link = mesh.link(l);
//!     println!("{:?} -> {:?} ({:?})", link.v1, link.v2, link.kind);
//! }
//!
//! // Interior edges
//! for &l in mesh.right_links() {
//!     let (a, b) = mesh.opposite_vertices(l).unwrap();
//!     println!("edge {:?} between apexes {:?} and {:?}", l, a, b);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod inclusion;
pub mod io;
pub mod mesh;
pub mod surface;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use dtsmesh::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::curvature::{BoxBoundary, CurvatureEngine, CurvatureOptions, CurvatureResult};
    pub use crate::error::{ErrorKind, MeshError, Result};
    pub use crate::inclusion::{Inclusion, InclusionMap};
    pub use crate::mesh::{
        build_blueprint, build_blueprint_from_file, generate, Blueprint, Link, LinkId, LinkKind,
        Mesh, MeshArrays, MeshIndex, Triangle, TriangleId, Vertex, VertexClass, VertexId,
    };
    pub use crate::surface::{build_mesh, load_mesh, SurfaceMesh};
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_tetrahedron() {
        let arrays = MeshArrays::from_rows(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 1.0, 0.0], [0.5, 0.5, 1.0]],
            &[
                [0, 2, 1], // bottom
                [0, 1, 3], // front
                [1, 2, 3], // right
                [2, 0, 3], // left
            ],
        );

        let surface = build_mesh(&arrays).unwrap();
        let mesh = surface.mesh();

        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_triangles(), 4);
        // 4 triangles * 3 links, 6 mirror pairs
        assert_eq!(mesh.num_links(), 12);
        assert_eq!(mesh.right_links().len(), 6);
        assert!(mesh.is_valid());

        for v in mesh.vertex_ids() {
            assert!(!mesh.is_boundary_vertex(v), "vertex {:?} should not be on boundary", v);
            assert_eq!(mesh.vertex(v).class, VertexClass::Surface);
        }

        let areas = surface.vertex_areas();
        let total: f64 = (0..mesh.num_triangles())
            .map(|t| surface.curvature().triangle_area(TriangleId::new(t)))
            .sum();
        assert!((areas.sum() - total).abs() < 1e-12);
    }
}
