//! Shape-operator curvature estimation.
//!
//! Curvature is estimated from the dihedral geometry of interior edges. Each
//! interior edge `e` between triangles with unit normals `N1`, `N2` carries
//!
//! ```text
//! Ne  = (N1 + N2) / |N1 + N2|          edge normal
//! b   = ê × Ne                         in-surface direction across the edge
//! h_e = ±|e| · sqrt(2 (1 − N1·N2))     = ±2|e| sin(θ/2)
//! S_e = ½ h_e · b bᵀ                   half goes to each endpoint
//! ```
//!
//! and a vertex with unit normal `n`, tangent projector `P = I − n nᵀ` and
//! area `A` accumulates
//!
//! ```text
//! S_v = (1/A) Σ_e (n·Ne) · P S_e P
//! ```
//!
//! whose eigenvalues in the tangent plane are the principal curvatures.
//! Curvature is positive where the surface bends away from its normal, so a
//! sphere with outward normals has `p1 ≈ p2 ≈ 1/R`.
//!
//! Boundary vertices miss the edges outside the surface. Their operator is
//! corrected along the boundary tangent with the normal curvature of the
//! boundary polyline.
//!
//! # References
//!
//! - Ramakrishnan, N., Sunil Kumar, P. B., Ipsen, J. H. (2010). "Monte Carlo
//!   simulations of fluid vesicles with in-plane orientational ordering."
//!   Physical Review E 81.

use std::fmt::Debug;

use nalgebra::{Matrix2, Matrix3, Vector3};

/// Norms at or below this value are treated as zero.
pub const GEOMETRY_EPSILON: f64 = 1e-8;

/// Geometry of one interior edge and its two triangles.
#[derive(Debug, Clone, Copy)]
pub struct LinkGeometry {
    /// Edge vector from `v1` to `v2`.
    pub edge: Vector3<f64>,
    /// Unit normal of the triangle owning the link.
    pub normal: Vector3<f64>,
    /// Unit normal of the triangle owning the mirror link.
    pub mirror_normal: Vector3<f64>,
    /// Mirror apex relative to `v1`.
    pub apex_offset: Vector3<f64>,
}

/// Per-edge result of the link pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeOperator {
    /// Unit edge normal.
    pub normal: Vector3<f64>,
    /// Signed integrated edge curvature `h_e`.
    pub curvature: f64,
    /// Contribution handed to each endpoint.
    pub operator: Matrix3<f64>,
}

impl EdgeOperator {
    /// A contribution that changes nothing.
    pub fn zero() -> Self {
        Self {
            normal: Vector3::zeros(),
            curvature: 0.0,
            operator: Matrix3::zeros(),
        }
    }
}

/// An interior edge as seen from one of its endpoints.
#[derive(Debug, Clone, Copy)]
pub struct IncidentEdge {
    /// Unit edge normal.
    pub normal: Vector3<f64>,
    /// The edge's shape-operator contribution.
    pub operator: Matrix3<f64>,
}

/// The two boundary links meeting at an edge vertex.
#[derive(Debug, Clone, Copy)]
pub struct BoundaryGeometry {
    /// Edge vector of the boundary link arriving at the vertex.
    pub incoming: Vector3<f64>,
    /// Edge vector of the boundary link leaving the vertex.
    pub outgoing: Vector3<f64>,
}

/// Everything an estimator sees of one vertex.
#[derive(Debug, Clone, Copy)]
pub struct VertexNeighborhood<'a> {
    /// Unit vertex normal.
    pub normal: Vector3<f64>,
    /// Vertex area (one third of the incident triangle areas).
    pub area: f64,
    /// Incident interior edges.
    pub edges: &'a [IncidentEdge],
    /// Boundary links, for edge vertices.
    pub boundary: Option<BoundaryGeometry>,
}

/// Curvature of the boundary polyline at an edge vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryCurvature {
    /// In-surface (geodesic) curvature.
    pub geodesic: f64,
    /// Curvature along the surface normal.
    pub normal: f64,
}

/// Output of an estimator for one vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrincipalCurvatures {
    /// Larger principal curvature.
    pub p1: f64,
    /// Smaller principal curvature.
    pub p2: f64,
    /// Unit tangent direction of `p1`.
    pub t1: Vector3<f64>,
    /// Unit tangent direction of `p2`.
    pub t2: Vector3<f64>,
    /// Boundary curve curvature, for edge vertices.
    pub boundary: Option<BoundaryCurvature>,
}

/// A discrete curvature estimator.
///
/// The engine calls [`link_operator`](Self::link_operator) once per interior
/// edge and [`estimate`](Self::estimate) once per vertex with non-degenerate
/// area and normal.
pub trait CurvatureEstimator: Send + Sync + Debug {
    /// Per-edge contribution, or `None` if the edge geometry is degenerate.
    fn link_operator(&self, geometry: &LinkGeometry) -> Option<EdgeOperator>;

    /// Principal curvatures of a vertex.
    fn estimate(&self, neighborhood: &VertexNeighborhood<'_>) -> PrincipalCurvatures;
}

/// Dihedral-angle shape-operator estimator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeOperatorEstimator;

impl CurvatureEstimator for ShapeOperatorEstimator {
    fn link_operator(&self, g: &LinkGeometry) -> Option<EdgeOperator> {
        if g.normal.norm() <= GEOMETRY_EPSILON || g.mirror_normal.norm() <= GEOMETRY_EPSILON {
            return None;
        }
        let length = g.edge.norm();
        let normal_sum = g.normal + g.mirror_normal;
        let normal_norm = normal_sum.norm();
        if length <= GEOMETRY_EPSILON || normal_norm <= GEOMETRY_EPSILON {
            return None;
        }
        let normal = normal_sum / normal_norm;

        let across = (g.edge / length).cross(&normal);
        let across_norm = across.norm();
        if across_norm <= GEOMETRY_EPSILON {
            return None;
        }
        let b = across / across_norm;

        let cos_theta = g.normal.dot(&g.mirror_normal).clamp(-1.0, 1.0);
        let magnitude = length * (2.0 * (1.0 - cos_theta)).sqrt();
        // Convex when the far apex lies behind the near triangle
        let curvature = if g.normal.dot(&g.apex_offset) < 0.0 {
            magnitude
        } else {
            -magnitude
        };

        Some(EdgeOperator {
            normal,
            curvature,
            operator: (b * b.transpose()) * (0.5 * curvature),
        })
    }

    fn estimate(&self, hood: &VertexNeighborhood<'_>) -> PrincipalCurvatures {
        let n = hood.normal;
        let projector = Matrix3::identity() - n * n.transpose();

        let mut shape = Matrix3::zeros();
        for edge in hood.edges {
            let weight = n.dot(&edge.normal);
            shape += (projector * edge.operator * projector) * weight;
        }
        shape /= hood.area;

        let boundary = hood.boundary.and_then(|b| boundary_curvature(&n, &projector, &b));
        if let Some((tangent, curve)) = boundary {
            let current = tangent.dot(&(shape * tangent));
            shape += (tangent * tangent.transpose()) * (curve.normal - current);
        }

        let (u, w) = tangent_frame(&n);
        let restricted = Matrix2::new(
            u.dot(&(shape * u)),
            u.dot(&(shape * w)),
            w.dot(&(shape * u)),
            w.dot(&(shape * w)),
        );
        let (p1, p2, angle) = symmetric_eigen_2x2(&restricted);
        let t1 = u * angle.cos() + w * angle.sin();
        let t2 = n.cross(&t1);

        PrincipalCurvatures {
            p1,
            p2,
            t1,
            t2,
            boundary: boundary.map(|(_, curve)| curve),
        }
    }
}

/// Boundary tangent and curve curvature at an edge vertex.
fn boundary_curvature(
    n: &Vector3<f64>,
    projector: &Matrix3<f64>,
    b: &BoundaryGeometry,
) -> Option<(Vector3<f64>, BoundaryCurvature)> {
    let len_in = b.incoming.norm();
    let len_out = b.outgoing.norm();
    if len_in <= GEOMETRY_EPSILON || len_out <= GEOMETRY_EPSILON {
        return None;
    }
    let dir_in = b.incoming / len_in;
    let dir_out = b.outgoing / len_out;

    let mut tangent = projector * (dir_in + dir_out);
    if tangent.norm() <= GEOMETRY_EPSILON {
        tangent = projector * dir_out;
    }
    let tangent_norm = tangent.norm();
    if tangent_norm <= GEOMETRY_EPSILON {
        return None;
    }
    let tangent = tangent / tangent_norm;

    let turning = (dir_out - dir_in) / (0.5 * (len_in + len_out));
    let curve = BoundaryCurvature {
        geodesic: turning.dot(&n.cross(&tangent)),
        normal: -turning.dot(n),
    };
    Some((tangent, curve))
}

/// An orthonormal basis `(u, w)` of the plane perpendicular to `n`,
/// with `u × w = n`.
pub fn tangent_frame(n: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let axis = if n.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let u = (axis - n * n.dot(&axis)).normalize();
    let w = n.cross(&u);
    (u, w)
}

/// Eigenvalues `(max, min)` of a symmetric 2×2 matrix and the angle of the
/// eigenvector belonging to `max`.
fn symmetric_eigen_2x2(m: &Matrix2<f64>) -> (f64, f64, f64) {
    let a = m[(0, 0)];
    let d = m[(1, 1)];
    let b = 0.5 * (m[(0, 1)] + m[(1, 0)]);

    let mean = 0.5 * (a + d);
    let half_diff = 0.5 * (a - d);
    let radius = (half_diff * half_diff + b * b).sqrt();
    let angle = 0.5 * b.atan2(half_diff);

    (mean + radius, mean - radius, angle)
}
