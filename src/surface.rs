//! The assembled membrane surface: topology, curvature and inclusions.
//!
//! [`SurfaceMesh`] is the usual entry point. It runs the whole pipeline
//! (validation, topology, curvature) on construction and exposes read-only
//! snapshots of the active vertices and triangles.
//!
//! ```
//! use dtsmesh::prelude::*;
//!
//! let arrays = MeshArrays::from_rows(
//!     &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
//!     &[[0, 1, 2], [0, 2, 3]],
//! );
//! let surface = SurfaceMesh::from_arrays(&arrays).unwrap();
//!
//! assert_eq!(surface.vertices().shape(), (4, 3));
//! assert_eq!(surface.triangles().shape(), (2, 3));
//! assert_eq!(surface.vertex_curvatures()[(0, 0)], 0.0);
//! ```

use std::path::Path;

use log::debug;
use nalgebra::{DMatrix, DVector, Vector3};

use crate::algo::curvature::{CurvatureEngine, CurvatureOptions, CurvatureResult};
use crate::algo::progress::Progress;
use crate::error::{ErrorKind, MeshError, Result};
use crate::inclusion::InclusionMap;
use crate::io;
use crate::mesh::{build_blueprint, generate, Blueprint, Mesh, MeshArrays, VertexId};

/// A membrane mesh with its curvature and inclusions.
#[derive(Debug, Clone)]
pub struct SurfaceMesh {
    mesh: Mesh,
    curvature: CurvatureResult,
    inclusions: InclusionMap,
    options: CurvatureOptions,
}

impl SurfaceMesh {
    /// Load a topology file and build the surface.
    ///
    /// Topology failures are reported as [`MeshError::MeshBuild`] carrying
    /// the file path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_options(path, CurvatureOptions::default())
    }

    /// Load a topology file with explicit curvature options.
    pub fn load_with_options<P: AsRef<Path>>(path: P, options: CurvatureOptions) -> Result<Self> {
        Self::load_internal(path.as_ref(), options, None)
    }

    /// Load a topology file, reporting curvature passes.
    pub fn load_with_progress<P: AsRef<Path>>(
        path: P,
        options: CurvatureOptions,
        progress: &Progress,
    ) -> Result<Self> {
        Self::load_internal(path.as_ref(), options, Some(progress))
    }

    fn load_internal(path: &Path, options: CurvatureOptions, progress: Option<&Progress>) -> Result<Self> {
        let blueprint = io::load_blueprint(path)?;
        Self::from_blueprint_internal(blueprint, options, progress).map_err(|e| match e.kind() {
            ErrorKind::TopologyBuildFailure => MeshError::MeshBuild {
                path: path.to_path_buf(),
                source: Box::new(e),
            },
            _ => e,
        })
    }

    /// Build the surface from raw arrays.
    ///
    /// All validation finishes before any topology is allocated.
    pub fn from_arrays(arrays: &MeshArrays) -> Result<Self> {
        let blueprint = build_blueprint(arrays)?;
        Self::from_blueprint(blueprint, CurvatureOptions::default())
    }

    /// Build the surface from a validated blueprint.
    pub fn from_blueprint(blueprint: Blueprint, options: CurvatureOptions) -> Result<Self> {
        Self::from_blueprint_internal(blueprint, options, None)
    }

    /// Build the surface from a validated blueprint, reporting curvature passes.
    pub fn from_blueprint_with_progress(
        blueprint: Blueprint,
        options: CurvatureOptions,
        progress: &Progress,
    ) -> Result<Self> {
        Self::from_blueprint_internal(blueprint, options, Some(progress))
    }

    fn from_blueprint_internal(
        blueprint: Blueprint,
        options: CurvatureOptions,
        progress: Option<&Progress>,
    ) -> Result<Self> {
        let mesh: Mesh = generate(&blueprint)?;
        let inclusions = InclusionMap::from_blueprint(blueprint.inclusions());

        let engine = CurvatureEngine::new(options);
        let curvature = match progress {
            Some(p) => engine.initialize_with_progress(&mesh, p),
            None => engine.initialize(&mesh),
        };
        debug!(
            "surface ready: {} active vertices, {} active triangles, {} inclusions",
            mesh.active_vertices().len(),
            mesh.active_triangles().len(),
            inclusions.len()
        );

        Ok(Self {
            mesh,
            curvature,
            inclusions,
            options,
        })
    }

    /// Re-run the curvature engine from scratch.
    pub fn recompute_curvature(&mut self) {
        self.curvature = CurvatureEngine::new(self.options).initialize(&self.mesh);
    }

    /// Re-run the curvature engine with new options.
    pub fn recompute_curvature_with(&mut self, options: CurvatureOptions) {
        self.options = options;
        self.recompute_curvature();
    }

    /// The underlying topology.
    #[inline]
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// The full curvature tables.
    #[inline]
    pub fn curvature(&self) -> &CurvatureResult {
        &self.curvature
    }

    /// The inclusion records.
    #[inline]
    pub fn inclusions(&self) -> &InclusionMap {
        &self.inclusions
    }

    /// The options the curvature was computed with.
    #[inline]
    pub fn options(&self) -> &CurvatureOptions {
        &self.options
    }

    // ==================== Snapshots ====================

    /// Positions of the active vertices, N×3.
    pub fn vertices(&self) -> DMatrix<f64> {
        self.vertex_rows(|v| self.mesh.position(v).coords)
    }

    /// Vertex ids of the active triangles, M×3.
    pub fn triangles(&self) -> DMatrix<i64> {
        let active = self.mesh.active_triangles();
        DMatrix::from_fn(active.len(), 3, |r, c| {
            self.mesh.triangle(active[r]).vertices[c].index() as i64
        })
    }

    /// Principal curvatures `(p1, p2)` of the active vertices, N×2.
    pub fn vertex_curvatures(&self) -> DMatrix<f64> {
        let active = self.mesh.active_vertices();
        DMatrix::from_fn(active.len(), 2, |r, c| {
            let (p1, p2) = self.curvature.principal(active[r]);
            if c == 0 {
                p1
            } else {
                p2
            }
        })
    }

    /// Normals of the active vertices, N×3.
    pub fn vertex_normals(&self) -> DMatrix<f64> {
        self.vertex_rows(|v| self.curvature.normal(v))
    }

    /// Areas of the active vertices.
    pub fn vertex_areas(&self) -> DVector<f64> {
        self.vertex_values(|v| self.curvature.area(v))
    }

    /// Mean curvature `(p1 + p2) / 2` of the active vertices.
    pub fn mean_curvatures(&self) -> DVector<f64> {
        self.vertex_values(|v| self.curvature.mean(v))
    }

    /// Gaussian curvature `p1 · p2` of the active vertices.
    pub fn gaussian_curvatures(&self) -> DVector<f64> {
        self.vertex_values(|v| self.curvature.gaussian(v))
    }

    /// Principal directions `(t1, t2)` of the active vertices, each N×3.
    pub fn principal_directions(&self) -> (DMatrix<f64>, DMatrix<f64>) {
        (
            self.vertex_rows(|v| self.curvature.directions(v)[0]),
            self.vertex_rows(|v| self.curvature.directions(v)[1]),
        )
    }

    /// Domain ids of the active vertices.
    pub fn vertex_domains(&self) -> Vec<i64> {
        self.mesh
            .active_vertices()
            .iter()
            .map(|&v| self.mesh.vertex(v).domain)
            .collect()
    }

    /// Ids of the active vertices, in export row order.
    pub fn active_vertex_ids(&self) -> Vec<i64> {
        self.mesh
            .active_vertices()
            .iter()
            .map(|v| v.index() as i64)
            .collect()
    }

    /// Vertices whose curvature could not be estimated.
    pub fn degenerate_vertices(&self) -> Vec<VertexId> {
        self.curvature.degenerate_vertices()
    }

    /// Parallel `(vertex id, type id)` lists of the inclusions.
    pub fn vertex_inclusion_mapping(&self) -> (Vec<i64>, Vec<i64>) {
        self.inclusions.vertex_type_pairs()
    }

    fn vertex_rows<F>(&self, f: F) -> DMatrix<f64>
    where
        F: Fn(VertexId) -> Vector3<f64>,
    {
        let rows: Vec<Vector3<f64>> = self.mesh.active_vertices().iter().map(|&v| f(v)).collect();
        DMatrix::from_fn(rows.len(), 3, |r, c| rows[r][c])
    }

    fn vertex_values<F>(&self, f: F) -> DVector<f64>
    where
        F: Fn(VertexId) -> f64,
    {
        DVector::from_iterator(
            self.mesh.active_vertices().len(),
            self.mesh.active_vertices().iter().map(|&v| f(v)),
        )
    }
}

/// Load a topology file and build the surface.
pub fn load_mesh<P: AsRef<Path>>(path: P) -> Result<SurfaceMesh> {
    SurfaceMesh::load(path)
}

/// Build the surface from raw arrays.
pub fn build_mesh(arrays: &MeshArrays) -> Result<SurfaceMesh> {
    SurfaceMesh::from_arrays(arrays)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::curvature::BoxBoundary;
    use crate::mesh::{BlueprintTriangle, BlueprintVertex};
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector2};
    use std::fs;

    fn unit_square() -> MeshArrays {
        MeshArrays::from_rows(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            &[[0, 1, 2], [0, 2, 3]],
        )
    }

    fn octahedron() -> MeshArrays {
        MeshArrays::from_rows(
            &[
                [1.0, 0.0, 0.0],
                [-1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, -1.0, 0.0],
                [0.0, 0.0, 1.0],
                [0.0, 0.0, -1.0],
            ],
            &[
                [0, 2, 4],
                [2, 1, 4],
                [1, 3, 4],
                [3, 0, 4],
                [2, 0, 5],
                [1, 2, 5],
                [3, 1, 5],
                [0, 3, 5],
            ],
        )
    }

    #[test]
    fn test_unit_square_exports() {
        let surface = build_mesh(&unit_square()).unwrap();

        assert_eq!(surface.vertices(), unit_square().vertices);
        assert_eq!(surface.triangles(), unit_square().triangles);

        let areas = surface.vertex_areas();
        assert_relative_eq!(areas[0], 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(areas[1], 1.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(areas.sum(), 1.0, epsilon = 1e-12);

        let normals = surface.vertex_normals();
        for r in 0..4 {
            assert_relative_eq!(normals[(r, 2)], 1.0, epsilon = 1e-12);
        }
        assert!(surface.vertex_curvatures().iter().all(|p| p.abs() < 1e-12));
        assert!(surface.degenerate_vertices().is_empty());
        assert_eq!(surface.vertex_inclusion_mapping(), (vec![], vec![]));
    }

    #[test]
    fn test_closed_surface_curvature() {
        let surface = build_mesh(&octahedron()).unwrap();
        assert!(surface.mesh().edge_vertices().is_empty());

        let curvatures = surface.vertex_curvatures();
        let first = curvatures[(0, 0)];
        assert!(first > 0.0);
        for r in 0..6 {
            // All vertices are equivalent by symmetry
            assert_relative_eq!(curvatures[(r, 0)], first, epsilon = 1e-10);
            assert_relative_eq!(curvatures[(r, 1)], curvatures[(r, 0)], epsilon = 1e-10);
        }
        let mean = surface.mean_curvatures();
        let gaussian = surface.gaussian_curvatures();
        assert_relative_eq!(mean[0], first, epsilon = 1e-10);
        assert_relative_eq!(gaussian[0], first * first, epsilon = 1e-10);

        let (t1, t2) = surface.principal_directions();
        let normals = surface.vertex_normals();
        for r in 0..6 {
            let n = Vector3::new(normals[(r, 0)], normals[(r, 1)], normals[(r, 2)]);
            let a = Vector3::new(t1[(r, 0)], t1[(r, 1)], t1[(r, 2)]);
            let b = Vector3::new(t2[(r, 0)], t2[(r, 1)], t2[(r, 2)]);
            assert_relative_eq!(a.dot(&n), 0.0, epsilon = 1e-12);
            assert_relative_eq!(b.dot(&a), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_inactive_vertices_excluded() {
        let vertices = vec![
            BlueprintVertex {
                position: Point3::new(0.0, 0.0, 0.0),
                id: 0,
                domain: 0,
                active: true,
            },
            BlueprintVertex {
                position: Point3::new(1.0, 0.0, 0.0),
                id: 1,
                domain: 2,
                active: true,
            },
            BlueprintVertex {
                position: Point3::new(1.0, 1.0, 0.0),
                id: 2,
                domain: 0,
                active: true,
            },
            BlueprintVertex {
                position: Point3::new(0.0, 1.0, 0.0),
                id: 3,
                domain: 1,
                active: false,
            },
        ];
        let triangles = vec![
            BlueprintTriangle {
                id: 0,
                vertices: [0, 1, 2],
            },
            BlueprintTriangle {
                id: 1,
                vertices: [0, 2, 3],
            },
        ];
        let blueprint =
            Blueprint::from_parts(Vector3::new(1.0, 1.0, 1.0), vertices, triangles, vec![]).unwrap();
        let surface = SurfaceMesh::from_blueprint(blueprint, CurvatureOptions::default()).unwrap();

        assert_eq!(surface.vertices().nrows(), 3);
        assert_eq!(surface.triangles().nrows(), 1);
        assert_eq!(surface.active_vertex_ids(), vec![0, 1, 2]);
        assert_eq!(surface.vertex_domains(), vec![0, 2, 0]);
        assert_relative_eq!(surface.vertex_areas().sum(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_inclusion_mapping_order() {
        let arrays = octahedron().with_inclusions(
            DMatrix::from_row_slice(3, 2, &[1, 5, 2, 0, 1, 3]),
            DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 0.0, 3.0, 4.0]),
        );
        let surface = build_mesh(&arrays).unwrap();
        let (vertices, types) = surface.vertex_inclusion_mapping();
        assert_eq!(vertices, vec![5, 0, 3]);
        assert_eq!(types, vec![1, 2, 1]);

        let directions: Vec<Vector2<f64>> = surface.inclusions().iter().map(|i| i.direction).collect();
        assert_relative_eq!(directions[1], Vector2::new(1.0, 0.0));
        assert_relative_eq!(directions[2], Vector2::new(0.6, 0.8));
    }

    #[test]
    fn test_validation_before_topology() {
        // Triangle 1 is out of range and the mesh would also be non-manifold;
        // the range error wins.
        let arrays = MeshArrays::from_rows(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            &[[0, 1, 2], [0, 1, 9]],
        );
        let err = build_mesh(&arrays).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTopology);
    }

    #[test]
    fn test_recompute_is_identical() {
        let mut surface = build_mesh(&octahedron()).unwrap();
        let before = surface.vertex_curvatures();
        surface.recompute_curvature();
        assert_eq!(surface.vertex_curvatures(), before);

        surface.recompute_curvature_with(CurvatureOptions::sequential());
        assert_eq!(surface.vertex_curvatures(), before);
        assert!(!surface.options().parallel);
    }

    #[test]
    fn test_periodic_options() {
        let arrays = MeshArrays::from_rows(
            &[[3.5, 0.0, 0.0], [0.5, 0.0, 0.0], [0.5, 1.0, 0.0], [3.5, 1.0, 0.0]],
            &[[0, 1, 2], [0, 2, 3]],
        )
        .with_box_size(vec![4.0, 4.0, 4.0]);
        let blueprint = build_blueprint(&arrays).unwrap();
        let options = CurvatureOptions::default().with_boundary(BoxBoundary::Periodic);
        let surface = SurfaceMesh::from_blueprint(blueprint, options).unwrap();
        assert_relative_eq!(surface.vertex_areas().sum(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_load_wraps_topology_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fan.q");
        // Three triangles on one edge
        fs::write(
            &path,
            "1 1 1\n5\n0 0 0 0\n1 1 0 0\n2 0 1 0\n3 0 -1 0\n4 0 0 1\n3\n0 0 1 2\n1 1 0 3\n2 0 1 4\n",
        )
        .unwrap();

        let err = load_mesh(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MeshBuild);
        match err {
            MeshError::MeshBuild { path: p, source } => {
                assert_eq!(p, path);
                assert_eq!(source.kind(), ErrorKind::TopologyBuildFailure);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("square.tsi");
        fs::write(
            &path,
            "version 1.1\nbox 10 10 10\nvertex 4\n0 0 0 0\n1 1 0 0\n2 1 1 0\n3 0 1 0\n\
             triangle 2\n0 0 1 2 1\n1 0 2 3 1\ninclusion 1\n0 4 2 1 0\n",
        )
        .unwrap();

        let surface = SurfaceMesh::load(&path).unwrap();
        assert_eq!(surface.vertices(), unit_square().vertices);
        assert_eq!(surface.triangles(), unit_square().triangles);
        assert_eq!(surface.vertex_inclusion_mapping(), (vec![2], vec![4]));
        assert_relative_eq!(surface.mesh().simbox(), Vector3::new(10.0, 10.0, 10.0));
    }

    #[test]
    fn test_surface_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SurfaceMesh>();
    }
}
