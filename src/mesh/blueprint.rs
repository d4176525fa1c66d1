//! Input validation: raw tables to a [`Blueprint`].
//!
//! A blueprint is the immutable, validated description of a mesh before any
//! topology exists. It is produced either from in-memory tables
//! ([`build_blueprint`]) or from a topology file
//! ([`build_blueprint_from_file`]); both paths run the same checks.
//!
//! Validation is complete before anything is allocated for topology: a bad
//! shape or index is reported with the offending row and no mesh is built.

use std::path::Path;

use nalgebra::{DMatrix, Point3, Vector2, Vector3};

use crate::error::{MeshError, Result};

/// Direction vectors at or below this norm are replaced by the default direction.
pub const MIN_DIRECTION_NORM: f64 = 1e-8;

/// A vertex record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlueprintVertex {
    /// Position.
    pub position: Point3<f64>,
    /// Sequential id, equal to the record's position.
    pub id: usize,
    /// Domain the vertex belongs to.
    pub domain: i64,
    /// Inactive vertices are excluded from topology, curvature and export.
    pub active: bool,
}

/// A triangle record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlueprintTriangle {
    /// Sequential id, equal to the record's position.
    pub id: usize,
    /// Vertex ids in winding order.
    pub vertices: [usize; 3],
}

/// An inclusion record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlueprintInclusion {
    /// Unit direction in the local tangent frame of the host vertex.
    pub direction: Vector2<f64>,
    /// Sequential id, equal to the record's position.
    pub id: usize,
    /// Host vertex id.
    pub vertex: usize,
    /// Inclusion type id, resolved after the mesh is built.
    pub type_id: i64,
}

/// Validated description of a mesh and its decorations.
#[derive(Debug, Clone, PartialEq)]
pub struct Blueprint {
    simbox: Vector3<f64>,
    vertices: Vec<BlueprintVertex>,
    triangles: Vec<BlueprintTriangle>,
    inclusions: Vec<BlueprintInclusion>,
}

impl Blueprint {
    /// Assemble a blueprint from records, validating them.
    ///
    /// Ids must be sequential from zero, triangle vertices distinct and in
    /// range, inclusion vertices in range. Inclusion directions are
    /// normalized, with near-zero directions replaced by `(1, 0)`.
    pub fn from_parts(
        simbox: Vector3<f64>,
        vertices: Vec<BlueprintVertex>,
        triangles: Vec<BlueprintTriangle>,
        mut inclusions: Vec<BlueprintInclusion>,
    ) -> Result<Self> {
        let n = vertices.len();

        for (position, v) in vertices.iter().enumerate() {
            if v.id != position {
                return Err(MeshError::NonSequentialId { entity: "vertex", position, id: v.id });
            }
        }

        for (position, t) in triangles.iter().enumerate() {
            if t.id != position {
                return Err(MeshError::NonSequentialId { entity: "triangle", position, id: t.id });
            }
            check_triangle(position, t.vertices.map(|v| v as i64), n)?;
        }

        for (position, inc) in inclusions.iter_mut().enumerate() {
            if inc.id != position {
                return Err(MeshError::NonSequentialId { entity: "inclusion", position, id: inc.id });
            }
            if inc.vertex >= n {
                return Err(MeshError::InvalidInclusionVertex {
                    inclusion: position,
                    vertex: inc.vertex as i64,
                    count: n,
                });
            }
            inc.direction = normalize_direction(inc.direction);
        }

        Ok(Self {
            simbox,
            vertices,
            triangles,
            inclusions,
        })
    }

    /// Simulation box extents.
    #[inline]
    pub fn simbox(&self) -> Vector3<f64> {
        self.simbox
    }

    /// Vertex records.
    #[inline]
    pub fn vertices(&self) -> &[BlueprintVertex] {
        &self.vertices
    }

    /// Triangle records.
    #[inline]
    pub fn triangles(&self) -> &[BlueprintTriangle] {
        &self.triangles
    }

    /// Inclusion records.
    #[inline]
    pub fn inclusions(&self) -> &[BlueprintInclusion] {
        &self.inclusions
    }
}

/// Raw tables describing a mesh, as handed over by a caller.
///
/// Only `vertices` (N×3) and `triangles` (M×3) are required.
#[derive(Debug, Clone)]
pub struct MeshArrays {
    /// Vertex positions, N×3.
    pub vertices: DMatrix<f64>,
    /// Triangle vertex indices, M×3.
    pub triangles: DMatrix<i64>,
    /// Inclusion rows `(type_id, vertex_id)`, K×2.
    pub inclusions: Option<DMatrix<i64>>,
    /// Inclusion directions, K×2.
    pub inclusion_directions: Option<DMatrix<f64>>,
    /// Simulation box extents (exactly three values).
    pub box_size: Option<Vec<f64>>,
    /// Per-vertex domain ids (length N).
    pub vertex_domains: Option<Vec<i64>>,
}

impl MeshArrays {
    /// Create input from vertex and triangle tables.
    pub fn new(vertices: DMatrix<f64>, triangles: DMatrix<i64>) -> Self {
        Self {
            vertices,
            triangles,
            inclusions: None,
            inclusion_directions: None,
            box_size: None,
            vertex_domains: None,
        }
    }

    /// Create input from row slices.
    pub fn from_rows(vertices: &[[f64; 3]], triangles: &[[i64; 3]]) -> Self {
        let v = DMatrix::from_fn(vertices.len(), 3, |r, c| vertices[r][c]);
        let t = DMatrix::from_fn(triangles.len(), 3, |r, c| triangles[r][c]);
        Self::new(v, t)
    }

    /// Attach inclusions and their directions.
    pub fn with_inclusions(mut self, inclusions: DMatrix<i64>, directions: DMatrix<f64>) -> Self {
        self.inclusions = Some(inclusions);
        self.inclusion_directions = Some(directions);
        self
    }

    /// Set the simulation box.
    pub fn with_box_size(mut self, box_size: Vec<f64>) -> Self {
        self.box_size = Some(box_size);
        self
    }

    /// Set per-vertex domain ids.
    pub fn with_vertex_domains(mut self, domains: Vec<i64>) -> Self {
        self.vertex_domains = Some(domains);
        self
    }
}

/// Validate raw tables into a blueprint.
///
/// Shapes are checked first (vertices, triangles, box, domains, inclusions),
/// then index ranges. The first failure is returned.
///
/// # Example
/// ```
/// use dtsmesh::mesh::{build_blueprint, MeshArrays};
///
/// let arrays = MeshArrays::from_rows(
///     &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
///     &[[0, 1, 2]],
/// );
/// let blueprint = build_blueprint(&arrays).unwrap();
/// assert_eq!(blueprint.vertices().len(), 3);
/// assert_eq!(blueprint.simbox().x, 1.0);
/// ```
pub fn build_blueprint(arrays: &MeshArrays) -> Result<Blueprint> {
    let verts = &arrays.vertices;
    if verts.ncols() != 3 {
        return Err(MeshError::shape("vertices", "(N, 3)", dims(verts.nrows(), verts.ncols())));
    }
    let tris = &arrays.triangles;
    if tris.ncols() != 3 {
        return Err(MeshError::shape("triangles", "(M, 3)", dims(tris.nrows(), tris.ncols())));
    }
    let n = verts.nrows();

    let simbox = match &arrays.box_size {
        Some(b) if b.len() != 3 => {
            return Err(MeshError::shape("box_size", "(3,)", format!("({},)", b.len())));
        }
        Some(b) => Vector3::new(b[0], b[1], b[2]),
        None => Vector3::new(1.0, 1.0, 1.0),
    };

    if let Some(domains) = &arrays.vertex_domains {
        if domains.len() != n {
            return Err(MeshError::shape(
                "vertex_domains",
                format!("({},)", n),
                format!("({},)", domains.len()),
            ));
        }
    }

    let inclusion_tables = match &arrays.inclusions {
        Some(inc) if !inc.is_empty() => {
            let dirs = arrays.inclusion_directions.as_ref();
            let shapes_match = inc.ncols() == 2
                && dirs.is_some_and(|d| d.ncols() == 2 && d.nrows() == inc.nrows());
            if !shapes_match {
                let found = match dirs {
                    Some(d) => format!(
                        "{} and {}",
                        dims(inc.nrows(), inc.ncols()),
                        dims(d.nrows(), d.ncols())
                    ),
                    None => format!("{} and no directions", dims(inc.nrows(), inc.ncols())),
                };
                return Err(MeshError::shape(
                    "inclusions",
                    "(K, 2) with (K, 2) directions",
                    found,
                ));
            }
            dirs.map(|d| (inc, d))
        }
        _ => None,
    };

    for r in 0..tris.nrows() {
        check_triangle(r, [tris[(r, 0)], tris[(r, 1)], tris[(r, 2)]], n)?;
    }

    let vertices = (0..n)
        .map(|r| BlueprintVertex {
            position: Point3::new(verts[(r, 0)], verts[(r, 1)], verts[(r, 2)]),
            id: r,
            domain: arrays.vertex_domains.as_ref().map_or(0, |d| d[r]),
            active: true,
        })
        .collect();

    let triangles = (0..tris.nrows())
        .map(|r| BlueprintTriangle {
            id: r,
            vertices: [tris[(r, 0)] as usize, tris[(r, 1)] as usize, tris[(r, 2)] as usize],
        })
        .collect();

    let mut inclusions = Vec::new();
    if let Some((inc, dirs)) = inclusion_tables {
        inclusions.reserve(inc.nrows());
        for r in 0..inc.nrows() {
            let vertex = inc[(r, 1)];
            if vertex < 0 || vertex as usize >= n {
                return Err(MeshError::InvalidInclusionVertex { inclusion: r, vertex, count: n });
            }
            inclusions.push(BlueprintInclusion {
                direction: Vector2::new(dirs[(r, 0)], dirs[(r, 1)]),
                id: r,
                vertex: vertex as usize,
                type_id: inc[(r, 0)],
            });
        }
    }

    Blueprint::from_parts(simbox, vertices, triangles, inclusions)
}

/// Read a topology file and validate it into a blueprint.
///
/// The format is chosen from the file extension; see [`crate::io`].
pub fn build_blueprint_from_file<P: AsRef<Path>>(path: P) -> Result<Blueprint> {
    crate::io::load_blueprint(path)
}

/// Normalize an inclusion direction, falling back to `(1, 0)`.
pub fn normalize_direction(direction: Vector2<f64>) -> Vector2<f64> {
    let norm = direction.norm();
    if norm <= MIN_DIRECTION_NORM || !norm.is_finite() {
        Vector2::new(1.0, 0.0)
    } else {
        direction / norm
    }
}

fn check_triangle(row: usize, vertices: [i64; 3], count: usize) -> Result<()> {
    for &v in &vertices {
        if v < 0 || v as usize >= count {
            return Err(MeshError::InvalidVertexIndex { triangle: row, vertex: v, count });
        }
    }
    let [a, b, c] = vertices;
    if a == b || b == c || a == c {
        return Err(MeshError::DegenerateTriangle { triangle: row });
    }
    Ok(())
}

fn dims(rows: usize, cols: usize) -> String {
    format!("({}, {})", rows, cols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use approx::assert_relative_eq;

    fn unit_square() -> MeshArrays {
        MeshArrays::from_rows(
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            &[[0, 1, 2], [0, 2, 3]],
        )
    }

    #[test]
    fn test_defaults() {
        let bp = build_blueprint(&unit_square()).unwrap();
        assert_eq!(bp.simbox(), Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(bp.vertices().len(), 4);
        assert_eq!(bp.triangles().len(), 2);
        assert!(bp.inclusions().is_empty());
        for (i, v) in bp.vertices().iter().enumerate() {
            assert_eq!(v.id, i);
            assert_eq!(v.domain, 0);
            assert!(v.active);
        }
        assert_eq!(bp.triangles()[1].vertices, [0, 2, 3]);
    }

    #[test]
    fn test_vertices_wrong_width() {
        let arrays = MeshArrays::new(DMatrix::zeros(4, 2), DMatrix::from_element(1, 3, 7));
        let err = build_blueprint(&arrays).unwrap_err();
        // Reported before the out-of-range triangle is looked at.
        assert_eq!(err.kind(), ErrorKind::InvalidShape);
    }

    #[test]
    fn test_triangles_wrong_width() {
        let arrays = MeshArrays::new(DMatrix::zeros(4, 3), DMatrix::zeros(2, 4));
        assert_eq!(build_blueprint(&arrays).unwrap_err().kind(), ErrorKind::InvalidShape);
    }

    #[test]
    fn test_degenerate_triangle_row() {
        let verts: Vec<[f64; 3]> = (0..6).map(|i| [i as f64, 0.0, 0.0]).collect();
        let arrays = MeshArrays::from_rows(&verts, &[[0, 1, 2], [2, 2, 5]]);
        let err = build_blueprint(&arrays).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTopology);
        assert!(matches!(err, MeshError::DegenerateTriangle { triangle: 1 }));
    }

    #[test]
    fn test_index_one_past_end() {
        let mut arrays = unit_square();
        arrays.triangles[(1, 2)] = 4;
        let err = build_blueprint(&arrays).unwrap_err();
        assert!(matches!(
            err,
            MeshError::InvalidVertexIndex { triangle: 1, vertex: 4, count: 4 }
        ));
    }

    #[test]
    fn test_negative_index() {
        let mut arrays = unit_square();
        arrays.triangles[(0, 0)] = -1;
        assert_eq!(build_blueprint(&arrays).unwrap_err().kind(), ErrorKind::InvalidTopology);
    }

    #[test]
    fn test_box_size() {
        let bp = build_blueprint(&unit_square().with_box_size(vec![10.0, 20.0, 30.0])).unwrap();
        assert_eq!(bp.simbox(), Vector3::new(10.0, 20.0, 30.0));

        let err = build_blueprint(&unit_square().with_box_size(vec![10.0, 20.0])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidShape);
    }

    #[test]
    fn test_vertex_domains() {
        let bp = build_blueprint(&unit_square().with_vertex_domains(vec![0, 1, 1, 2])).unwrap();
        let domains: Vec<i64> = bp.vertices().iter().map(|v| v.domain).collect();
        assert_eq!(domains, vec![0, 1, 1, 2]);

        let err = build_blueprint(&unit_square().with_vertex_domains(vec![0, 1])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidShape);
    }

    #[test]
    fn test_inclusion_directions_normalized() {
        let inclusions = DMatrix::from_row_slice(3, 2, &[1, 0, 2, 3, 1, 2]);
        let directions = DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 3.0, 4.0, 0.0, -2.0]);
        let bp = build_blueprint(&unit_square().with_inclusions(inclusions, directions)).unwrap();

        let inc = bp.inclusions();
        assert_eq!(inc.len(), 3);
        assert_eq!(inc[0].direction, Vector2::new(1.0, 0.0));
        assert_relative_eq!(inc[1].direction.x, 0.6);
        assert_relative_eq!(inc[1].direction.y, 0.8);
        assert_relative_eq!(inc[2].direction.y, -1.0);
        assert_eq!((inc[1].type_id, inc[1].vertex), (2, 3));
    }

    #[test]
    fn test_inclusion_shape_mismatch() {
        let inclusions = DMatrix::from_row_slice(2, 2, &[1, 0, 1, 1]);
        let directions = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);
        let err = build_blueprint(&unit_square().with_inclusions(inclusions.clone(), directions))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidShape);

        let mut arrays = unit_square();
        arrays.inclusions = Some(inclusions);
        assert_eq!(build_blueprint(&arrays).unwrap_err().kind(), ErrorKind::InvalidShape);
    }

    #[test]
    fn test_shape_errors_precede_index_errors() {
        let arrays = MeshArrays::from_rows(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 1.0, 0.0]],
            &[[0, 1, 9]],
        )
        .with_inclusions(
            DMatrix::from_row_slice(1, 2, &[1, 0]),
            DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1.0]),
        );
        assert_eq!(build_blueprint(&arrays).unwrap_err().kind(), ErrorKind::InvalidShape);
    }

    #[test]
    fn test_inclusion_vertex_out_of_range() {
        let inclusions = DMatrix::from_row_slice(1, 2, &[1, 4]);
        let directions = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);
        let err = build_blueprint(&unit_square().with_inclusions(inclusions, directions)).unwrap_err();
        assert!(matches!(err, MeshError::InvalidInclusionVertex { inclusion: 0, vertex: 4, .. }));
    }

    #[test]
    fn test_from_parts_rejects_gapped_ids() {
        let vertices = vec![
            BlueprintVertex { position: Point3::origin(), id: 0, domain: 0, active: true },
            BlueprintVertex { position: Point3::new(1.0, 0.0, 0.0), id: 2, domain: 0, active: true },
        ];
        let err = Blueprint::from_parts(Vector3::repeat(1.0), vertices, vec![], vec![]).unwrap_err();
        assert!(matches!(err, MeshError::NonSequentialId { entity: "vertex", position: 1, id: 2 }));
    }
}
