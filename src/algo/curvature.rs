//! Discrete curvature of membrane meshes.
//!
//! [`CurvatureEngine`] derives all per-entity geometry of a [`Mesh`] in five
//! passes, each of which only reads the output of earlier passes:
//!
//! 1. **Triangles**: area, area vector and unit normal
//! 2. **Right links**: edge normal and shape-operator contribution of every
//!    interior edge (the mirror link shares the result)
//! 3. **Edge links**: edge vector and length of boundary links
//! 4. **Surface vertices**: area, normal and principal curvatures
//! 5. **Edge vertices**: as pass 4, plus the boundary correction
//!
//! Within a pass entities are independent, so passes run in parallel by
//! default. Results are collected in entity order and are identical to a
//! sequential run.
//!
//! # Example
//!
//! ```
//! use dtsmesh::algo::curvature::compute_curvature;
//! use dtsmesh::mesh::{build_blueprint, generate, Mesh, MeshArrays, VertexId};
//!
//! let arrays = MeshArrays::from_rows(
//!     &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
//!     &[[0, 1, 2], [0, 2, 3]],
//! );
//! let mesh: Mesh = generate(&build_blueprint(&arrays).unwrap()).unwrap();
//! let result = compute_curvature(&mesh);
//!
//! let v = VertexId::new(0);
//! assert_eq!(result.principal(v), (0.0, 0.0));
//! assert!((result.area(v) - 1.0 / 3.0).abs() < 1e-12);
//! ```

use std::marker::PhantomData;

use log::{debug, warn};
use nalgebra::Vector3;
use rayon::prelude::*;

use super::progress::Progress;
use super::shape_operator::{
    BoundaryCurvature, BoundaryGeometry, CurvatureEstimator, EdgeOperator, IncidentEdge,
    LinkGeometry, ShapeOperatorEstimator, VertexNeighborhood, GEOMETRY_EPSILON,
};
use crate::mesh::{LinkId, LinkKind, Mesh, MeshIndex, TriangleId, VertexId};

/// Number of passes reported through [`Progress`].
pub const CURVATURE_PASSES: usize = 5;

/// How displacements between vertices are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoxBoundary {
    /// Plain coordinate differences.
    #[default]
    Open,
    /// Minimum-image differences in the mesh's simulation box.
    Periodic,
}

/// Options for curvature computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurvatureOptions {
    /// Run each pass on the rayon thread pool.
    pub parallel: bool,

    /// Displacement convention.
    pub boundary: BoxBoundary,
}

impl Default for CurvatureOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            boundary: BoxBoundary::Open,
        }
    }
}

impl CurvatureOptions {
    /// Single-threaded options.
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    /// Set whether passes run in parallel.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the displacement convention.
    pub fn with_boundary(mut self, boundary: BoxBoundary) -> Self {
        self.boundary = boundary;
        self
    }
}

/// Curvature and geometry tables of a mesh.
///
/// Tables are indexed by raw entity id. Entries of inactive entities hold
/// zeros.
#[derive(Debug, Clone)]
pub struct CurvatureResult<I: MeshIndex = u32> {
    triangle_areas: Vec<f64>,
    triangle_area_vectors: Vec<Vector3<f64>>,
    triangle_normals: Vec<Vector3<f64>>,

    edge_vectors: Vec<Vector3<f64>>,
    edge_lengths: Vec<f64>,
    edge_operators: Vec<EdgeOperator>,

    vertex_areas: Vec<f64>,
    vertex_normals: Vec<Vector3<f64>>,
    principal_max: Vec<f64>,
    principal_min: Vec<f64>,
    directions: Vec<[Vector3<f64>; 2]>,
    boundary_curvatures: Vec<Option<BoundaryCurvature>>,
    degenerate: Vec<bool>,

    _marker: PhantomData<I>,
}

impl<I: MeshIndex> CurvatureResult<I> {
    /// Area of a triangle.
    #[inline]
    pub fn triangle_area(&self, t: TriangleId<I>) -> f64 {
        self.triangle_areas[t.index()]
    }

    /// Area vector (half the edge cross product) of a triangle.
    #[inline]
    pub fn triangle_area_vector(&self, t: TriangleId<I>) -> Vector3<f64> {
        self.triangle_area_vectors[t.index()]
    }

    /// Unit normal of a triangle, or zero if it has no area.
    #[inline]
    pub fn triangle_normal(&self, t: TriangleId<I>) -> Vector3<f64> {
        self.triangle_normals[t.index()]
    }

    /// Edge vector `v2 − v1` of a link.
    #[inline]
    pub fn edge_vector(&self, l: LinkId<I>) -> Vector3<f64> {
        self.edge_vectors[l.index()]
    }

    /// Length of a link.
    #[inline]
    pub fn edge_length(&self, l: LinkId<I>) -> f64 {
        self.edge_lengths[l.index()]
    }

    /// Shape-operator contribution of an interior link.
    ///
    /// Both links of a mirror pair report the same value. Boundary and
    /// degenerate links report [`EdgeOperator::zero`].
    #[inline]
    pub fn edge_operator(&self, l: LinkId<I>) -> &EdgeOperator {
        &self.edge_operators[l.index()]
    }

    /// Area of a vertex.
    #[inline]
    pub fn area(&self, v: VertexId<I>) -> f64 {
        self.vertex_areas[v.index()]
    }

    /// Normal of a vertex.
    ///
    /// Unit length unless the vertex is [degenerate](Self::is_degenerate).
    #[inline]
    pub fn normal(&self, v: VertexId<I>) -> Vector3<f64> {
        self.vertex_normals[v.index()]
    }

    /// Principal curvatures `(p1, p2)` with `p1 >= p2`.
    #[inline]
    pub fn principal(&self, v: VertexId<I>) -> (f64, f64) {
        (self.principal_max[v.index()], self.principal_min[v.index()])
    }

    /// Principal directions `[t1, t2]`.
    #[inline]
    pub fn directions(&self, v: VertexId<I>) -> [Vector3<f64>; 2] {
        self.directions[v.index()]
    }

    /// Mean curvature `(p1 + p2) / 2`.
    #[inline]
    pub fn mean(&self, v: VertexId<I>) -> f64 {
        0.5 * (self.principal_max[v.index()] + self.principal_min[v.index()])
    }

    /// Gaussian curvature `p1 · p2`.
    #[inline]
    pub fn gaussian(&self, v: VertexId<I>) -> f64 {
        self.principal_max[v.index()] * self.principal_min[v.index()]
    }

    /// Curvature of the boundary curve at an edge vertex.
    #[inline]
    pub fn boundary_curvature(&self, v: VertexId<I>) -> Option<BoundaryCurvature> {
        self.boundary_curvatures[v.index()]
    }

    /// Whether the vertex had too little area or no normal.
    #[inline]
    pub fn is_degenerate(&self, v: VertexId<I>) -> bool {
        self.degenerate[v.index()]
    }

    /// All degenerate vertices, in id order.
    pub fn degenerate_vertices(&self) -> Vec<VertexId<I>> {
        self.degenerate
            .iter()
            .enumerate()
            .filter_map(|(i, &d)| d.then(|| VertexId::new(i)))
            .collect()
    }

    /// Vertex areas as a slice.
    #[inline]
    pub fn area_values(&self) -> &[f64] {
        &self.vertex_areas
    }

    /// Vertex normals as a slice.
    #[inline]
    pub fn normal_values(&self) -> &[Vector3<f64>] {
        &self.vertex_normals
    }

    /// Get the number of vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.vertex_areas.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertex_areas.is_empty()
    }
}

/// Runs the five curvature passes with a given estimator.
#[derive(Debug, Clone, Default)]
pub struct CurvatureEngine<E: CurvatureEstimator = ShapeOperatorEstimator> {
    estimator: E,
    options: CurvatureOptions,
}

impl CurvatureEngine {
    /// An engine using the shape-operator estimator.
    pub fn new(options: CurvatureOptions) -> Self {
        Self {
            estimator: ShapeOperatorEstimator,
            options,
        }
    }
}

impl<E: CurvatureEstimator> CurvatureEngine<E> {
    /// An engine using a custom estimator.
    pub fn with_estimator(estimator: E, options: CurvatureOptions) -> Self {
        Self { estimator, options }
    }

    /// The engine's options.
    pub fn options(&self) -> &CurvatureOptions {
        &self.options
    }

    /// The engine's estimator.
    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    /// Compute all curvature tables of a mesh.
    ///
    /// Never fails: degenerate entities are logged and receive zero
    /// curvature.
    pub fn initialize<I: MeshIndex>(&self, mesh: &Mesh<I>) -> CurvatureResult<I> {
        self.initialize_internal(mesh, None)
    }

    /// Compute all curvature tables of a mesh, reporting each pass.
    pub fn initialize_with_progress<I: MeshIndex>(
        &self,
        mesh: &Mesh<I>,
        progress: &Progress,
    ) -> CurvatureResult<I> {
        self.initialize_internal(mesh, Some(progress))
    }

    fn initialize_internal<I: MeshIndex>(
        &self,
        mesh: &Mesh<I>,
        progress: Option<&Progress>,
    ) -> CurvatureResult<I> {
        let geometry = Geometry {
            mesh,
            simbox: mesh.simbox(),
            periodic: self.options.boundary == BoxBoundary::Periodic,
        };
        let parallel = self.options.parallel;

        // Pass 1: triangles
        if let Some(p) = progress {
            p.report(0, CURVATURE_PASSES, "Triangle geometry");
        }
        let triangles = map_indexed(mesh.num_triangles(), parallel, |i| {
            let t = TriangleId::<I>::new(i);
            if !mesh.triangle(t).active {
                return TriangleGeometry::default();
            }
            geometry.triangle(t)
        });

        // Pass 2: right links
        if let Some(p) = progress {
            p.report(1, CURVATURE_PASSES, "Interior edges");
        }
        let interior = map_indexed(mesh.num_links(), parallel, |i| {
            let l = LinkId::<I>::new(i);
            let link = mesh.link(l);
            if link.kind != LinkKind::Right {
                return None;
            }
            let mirror = mesh.link(link.mirror);
            let link_geometry = LinkGeometry {
                edge: geometry.displacement(link.v1, link.v2),
                normal: triangles[link.triangle.index()].normal,
                mirror_normal: triangles[mirror.triangle.index()].normal,
                apex_offset: geometry.displacement(link.v1, mirror.v3),
            };
            let operator = self.estimator.link_operator(&link_geometry);
            if operator.is_none() {
                warn!(
                    "degenerate edge {:?} between vertices {} and {}: curvature contribution set to zero",
                    l,
                    link.v1.index(),
                    link.v2.index()
                );
            }
            Some((link_geometry.edge, operator.unwrap_or_else(EdgeOperator::zero)))
        });

        // Pass 3: edge links
        if let Some(p) = progress {
            p.report(2, CURVATURE_PASSES, "Boundary edges");
        }
        let boundary = map_indexed(mesh.num_links(), parallel, |i| {
            let link = mesh.link(LinkId::<I>::new(i));
            (link.kind == LinkKind::Edge).then(|| geometry.displacement(link.v1, link.v2))
        });

        let mut edge_vectors = vec![Vector3::zeros(); mesh.num_links()];
        let mut edge_operators = vec![EdgeOperator::zero(); mesh.num_links()];
        for (i, link) in (0..mesh.num_links()).map(|i| (i, mesh.link(LinkId::<I>::new(i)))) {
            match link.kind {
                LinkKind::Right => {
                    if let Some((edge, operator)) = interior[i] {
                        edge_vectors[i] = edge;
                        edge_operators[i] = operator;
                        edge_vectors[link.mirror.index()] = -edge;
                        edge_operators[link.mirror.index()] = operator;
                    }
                }
                LinkKind::Edge => {
                    if let Some(edge) = boundary[i] {
                        edge_vectors[i] = edge;
                    }
                }
                LinkKind::Mirror => {}
            }
        }
        let edge_lengths: Vec<f64> = edge_vectors.iter().map(|e| e.norm()).collect();

        let links = LinkTables {
            vectors: &edge_vectors,
            operators: &edge_operators,
        };

        // Pass 4: surface vertices
        if let Some(p) = progress {
            p.report(3, CURVATURE_PASSES, "Surface vertices");
        }
        let surface = map_slice(mesh.surface_vertices(), parallel, |v| {
            self.vertex(mesh, v, &triangles, &links, false)
        });

        // Pass 5: edge vertices
        if let Some(p) = progress {
            p.report(4, CURVATURE_PASSES, "Edge vertices");
        }
        let edge = map_slice(mesh.edge_vertices(), parallel, |v| {
            self.vertex(mesh, v, &triangles, &links, true)
        });

        let n = mesh.num_vertices();
        let mut result = CurvatureResult {
            triangle_areas: triangles.iter().map(|t| t.area).collect(),
            triangle_area_vectors: triangles.iter().map(|t| t.area_vector).collect(),
            triangle_normals: triangles.iter().map(|t| t.normal).collect(),
            edge_vectors,
            edge_lengths,
            edge_operators,
            vertex_areas: vec![0.0; n],
            vertex_normals: vec![Vector3::zeros(); n],
            principal_max: vec![0.0; n],
            principal_min: vec![0.0; n],
            directions: vec![[Vector3::zeros(); 2]; n],
            boundary_curvatures: vec![None; n],
            degenerate: vec![false; n],
            _marker: PhantomData,
        };

        let vertices = mesh.surface_vertices().iter().zip(surface).chain(mesh.edge_vertices().iter().zip(edge));
        for (&v, vc) in vertices {
            let i = v.index();
            result.vertex_areas[i] = vc.area;
            result.vertex_normals[i] = vc.normal;
            result.principal_max[i] = vc.p1;
            result.principal_min[i] = vc.p2;
            result.directions[i] = vc.directions;
            result.boundary_curvatures[i] = vc.boundary;
            result.degenerate[i] = vc.degenerate;
        }

        if let Some(p) = progress {
            p.report(CURVATURE_PASSES, CURVATURE_PASSES, "Curvature complete");
        }
        debug!(
            "curvature computed for {} vertices ({} degenerate)",
            mesh.active_vertices().len(),
            result.degenerate.iter().filter(|&&d| d).count()
        );

        result
    }

    /// Area, normal and curvature of one vertex.
    fn vertex<I: MeshIndex>(
        &self,
        mesh: &Mesh<I>,
        v: VertexId<I>,
        triangles: &[TriangleGeometry],
        links: &LinkTables<'_>,
        on_boundary: bool,
    ) -> VertexCurvature {
        let mut area = 0.0;
        let mut raw_normal = Vector3::zeros();
        for &t in mesh.vertex_triangles(v) {
            area += triangles[t.index()].area;
            raw_normal += triangles[t.index()].area_vector;
        }
        area /= 3.0;

        let normal_norm = raw_normal.norm();
        if area < GEOMETRY_EPSILON || normal_norm <= GEOMETRY_EPSILON {
            warn!(
                "degenerate vertex {}: area {:e}, normal length {:e}; curvature set to zero",
                v.index(),
                area,
                normal_norm
            );
            return VertexCurvature {
                area,
                normal: raw_normal,
                degenerate: true,
                ..VertexCurvature::default()
            };
        }
        let normal = raw_normal / normal_norm;

        let edges: Vec<IncidentEdge> = mesh
            .vertex_links(v)
            .iter()
            .filter(|&&l| mesh.link(l).mirror.is_valid())
            .map(|&l| {
                let op = links.operators[l.index()];
                IncidentEdge {
                    normal: op.normal,
                    operator: op.operator,
                }
            })
            .collect();

        let boundary = if on_boundary {
            mesh.boundary_links(v).map(|(incoming, outgoing)| BoundaryGeometry {
                incoming: links.vectors[incoming.index()],
                outgoing: links.vectors[outgoing.index()],
            })
        } else {
            None
        };

        let pc = self.estimator.estimate(&VertexNeighborhood {
            normal,
            area,
            edges: &edges,
            boundary,
        });

        VertexCurvature {
            area,
            normal,
            p1: pc.p1,
            p2: pc.p2,
            directions: [pc.t1, pc.t2],
            boundary: pc.boundary,
            degenerate: false,
        }
    }
}

/// Compute curvature with default options.
///
/// This function uses parallel computation by default. Use
/// [`compute_curvature_sequential`] for single-threaded execution.
pub fn compute_curvature<I: MeshIndex>(mesh: &Mesh<I>) -> CurvatureResult<I> {
    CurvatureEngine::new(CurvatureOptions::default()).initialize(mesh)
}

/// Compute curvature (sequential version).
///
/// Uses single-threaded execution. Useful for benchmarking.
pub fn compute_curvature_sequential<I: MeshIndex>(mesh: &Mesh<I>) -> CurvatureResult<I> {
    CurvatureEngine::new(CurvatureOptions::sequential()).initialize(mesh)
}

#[derive(Debug, Clone, Copy, Default)]
struct TriangleGeometry {
    area: f64,
    area_vector: Vector3<f64>,
    normal: Vector3<f64>,
}

#[derive(Debug, Clone, Copy)]
struct VertexCurvature {
    area: f64,
    normal: Vector3<f64>,
    p1: f64,
    p2: f64,
    directions: [Vector3<f64>; 2],
    boundary: Option<BoundaryCurvature>,
    degenerate: bool,
}

impl Default for VertexCurvature {
    fn default() -> Self {
        Self {
            area: 0.0,
            normal: Vector3::zeros(),
            p1: 0.0,
            p2: 0.0,
            directions: [Vector3::zeros(); 2],
            boundary: None,
            degenerate: false,
        }
    }
}

struct LinkTables<'a> {
    vectors: &'a [Vector3<f64>],
    operators: &'a [EdgeOperator],
}

/// Displacement rules shared by all passes.
struct Geometry<'a, I: MeshIndex> {
    mesh: &'a Mesh<I>,
    simbox: Vector3<f64>,
    periodic: bool,
}

impl<I: MeshIndex> Geometry<'_, I> {
    fn displacement(&self, from: VertexId<I>, to: VertexId<I>) -> Vector3<f64> {
        let d = self.mesh.position(to) - self.mesh.position(from);
        if self.periodic {
            minimum_image(d, &self.simbox)
        } else {
            d
        }
    }

    fn triangle(&self, t: TriangleId<I>) -> TriangleGeometry {
        let [a, b, c] = self.mesh.triangle(t).vertices;
        let cross = self.displacement(a, b).cross(&self.displacement(a, c));
        let norm = cross.norm();
        let normal = if norm > 0.0 { cross / norm } else { Vector3::zeros() };
        TriangleGeometry {
            area: 0.5 * norm,
            area_vector: 0.5 * cross,
            normal,
        }
    }
}

/// Wrap a displacement into `[-L/2, L/2]` along each axis with `L > 0`.
pub fn minimum_image(mut d: Vector3<f64>, simbox: &Vector3<f64>) -> Vector3<f64> {
    for i in 0..3 {
        let l = simbox[i];
        if l > 0.0 {
            d[i] -= l * (d[i] / l).round();
        }
    }
    d
}

fn map_indexed<T, F>(n: usize, parallel: bool, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    if parallel {
        (0..n).into_par_iter().map(f).collect()
    } else {
        (0..n).map(f).collect()
    }
}

fn map_slice<I, T, F>(ids: &[VertexId<I>], parallel: bool, f: F) -> Vec<T>
where
    I: MeshIndex,
    T: Send,
    F: Fn(VertexId<I>) -> T + Sync + Send,
{
    if parallel {
        ids.par_iter().map(|&v| f(v)).collect()
    } else {
        ids.iter().map(|&v| f(v)).collect()
    }
}
