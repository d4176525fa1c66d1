//! Topology construction.
//!
//! This module turns a validated [`Blueprint`] into a [`Mesh`]: it allocates
//! the entity arenas, creates one directed link per triangle side, pairs
//! links into mirrors and classifies links and vertices.

use std::collections::HashMap;

use log::debug;

use super::blueprint::Blueprint;
use super::index::{LinkId, MeshIndex, TriangleId, VertexId};
use super::topology::{Link, LinkKind, Mesh, Triangle, Vertex, VertexClass};
use crate::error::{MeshError, Result};

/// Build the mesh topology described by a blueprint.
///
/// Fails when the active triangles do not form an orientable 2-manifold
/// (with or without boundary): an edge shared by more than two triangles,
/// two triangles winding the same way over a shared edge, or a vertex whose
/// triangles form more than one fan.
///
/// # Example
/// ```
/// use dtsmesh::mesh::{build_blueprint, generate, Mesh, MeshArrays};
///
/// let arrays = MeshArrays::from_rows(
///     &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
///     &[[0, 1, 2], [0, 2, 3]],
/// );
/// let mesh: Mesh = generate(&build_blueprint(&arrays).unwrap()).unwrap();
/// assert_eq!(mesh.right_links().len(), 1);
/// assert_eq!(mesh.edge_links().len(), 4);
/// assert_eq!(mesh.edge_vertices().len(), 4);
/// ```
pub fn generate<I: MeshIndex>(blueprint: &Blueprint) -> Result<Mesh<I>> {
    let num_triangles = blueprint.triangles().len();
    check_capacity::<I>("vertices", blueprint.vertices().len())?;
    check_capacity::<I>("triangles", num_triangles)?;
    check_capacity::<I>("links", num_triangles.saturating_mul(3))?;

    let mut mesh = Mesh::with_capacity(
        blueprint.simbox(),
        blueprint.vertices().len(),
        blueprint.triangles().len(),
    );

    for bv in blueprint.vertices() {
        let mut vertex = Vertex::new(bv.position);
        vertex.domain = bv.domain;
        vertex.active = bv.active;
        mesh.vertices.push(vertex);
    }

    // Map from directed edge (v1, v2) to link, and undirected edge to use count
    let mut directed: HashMap<(usize, usize), LinkId<I>> = HashMap::new();
    let mut undirected: HashMap<(usize, usize), u8> = HashMap::new();

    // First pass: triangles and their links
    for bt in blueprint.triangles() {
        let [a, b, c] = bt.vertices;
        let vertex_ids = [VertexId::<I>::new(a), VertexId::new(b), VertexId::new(c)];
        let triangle_id = TriangleId::<I>::new(mesh.triangles.len());
        let active = bt.vertices.iter().all(|&v| mesh.vertices[v].active);

        if !active {
            mesh.triangles.push(Triangle {
                vertices: vertex_ids,
                links: [LinkId::invalid(); 3],
                active: false,
            });
            continue;
        }

        let base = mesh.links.len();
        let link_ids = [LinkId::<I>::new(base), LinkId::new(base + 1), LinkId::new(base + 2)];

        for k in 0..3 {
            let (v1, v2, v3) = (bt.vertices[k], bt.vertices[(k + 1) % 3], bt.vertices[(k + 2) % 3]);

            let count = undirected.entry(edge_key(v1, v2)).or_insert(0);
            *count += 1;
            if *count > 2 {
                return Err(MeshError::NonManifoldEdge {
                    v0: v1.min(v2),
                    v1: v1.max(v2),
                });
            }
            if directed.insert((v1, v2), link_ids[k]).is_some() {
                return Err(MeshError::InconsistentOrientation { v0: v1, v1: v2 });
            }

            mesh.links.push(Link {
                v1: vertex_ids[k],
                v2: vertex_ids[(k + 1) % 3],
                v3: VertexId::new(v3),
                triangle: triangle_id,
                next: link_ids[(k + 1) % 3],
                prev: link_ids[(k + 2) % 3],
                mirror: LinkId::invalid(),
                kind: LinkKind::Edge,
            });
            mesh.vertices[v1].links.push(link_ids[k]);
            mesh.vertices[v1].triangles.push(triangle_id);
        }

        mesh.triangles.push(Triangle {
            vertices: vertex_ids,
            links: link_ids,
            active: true,
        });
        mesh.active_triangles.push(triangle_id);
    }

    if mesh.active_triangles.is_empty() {
        return Err(MeshError::EmptyMesh);
    }

    // Second pass: pair mirrors and classify links
    for i in 0..mesh.links.len() {
        let id = LinkId::<I>::new(i);
        let (v1, v2) = (mesh.links[i].v1.index(), mesh.links[i].v2.index());

        match directed.get(&(v2, v1)) {
            Some(&mirror) => {
                let link = &mut mesh.links[i];
                link.mirror = mirror;
                if id < mirror {
                    link.kind = LinkKind::Right;
                    mesh.right_links.push(id);
                } else {
                    link.kind = LinkKind::Mirror;
                }
            }
            None => {
                mesh.edge_links.push(id);
                mesh.vertices[v1].edge_links.push(id);
                mesh.vertices[v2].edge_links.push(id);
            }
        }
    }

    // Third pass: classify vertices and reject pinched fans
    for i in 0..mesh.vertices.len() {
        let id = VertexId::<I>::new(i);
        if !mesh.vertices[i].active {
            continue;
        }
        mesh.active_vertices.push(id);

        let boundary = !mesh.vertices[i].edge_links.is_empty();
        if boundary {
            if mesh.vertices[i].edge_links.len() != 2 {
                return Err(MeshError::NonManifoldVertex {
                    vertex: i,
                    reason: "more than one boundary loop passes through it",
                });
            }
            mesh.vertices[i].class = VertexClass::Edge;
            mesh.edge_vertices.push(id);
        } else {
            mesh.surface_vertices.push(id);
        }

        let incident = mesh.vertices[i].triangles.len();
        if incident > 0 && fan_size(&mesh, id) != incident {
            return Err(MeshError::NonManifoldVertex {
                vertex: i,
                reason: "incident triangles form more than one fan",
            });
        }
    }

    debug!(
        "generated mesh: {} vertices ({} surface, {} edge), {} triangles, {} right links, {} edge links",
        mesh.active_vertices.len(),
        mesh.surface_vertices.len(),
        mesh.edge_vertices.len(),
        mesh.active_triangles.len(),
        mesh.right_links.len(),
        mesh.edge_links.len()
    );

    Ok(mesh)
}

/// Count the triangles reachable by rotating around a vertex.
///
/// Rotation goes from an outgoing link `v → w` to the mirror of the previous
/// link of the same triangle, which again leaves `v`. On the boundary the
/// walk starts at the outgoing boundary link and stops at the incoming one.
fn fan_size<I: MeshIndex>(mesh: &Mesh<I>, v: VertexId<I>) -> usize {
    let outgoing = mesh.vertex_links(v);
    let start = outgoing
        .iter()
        .copied()
        .find(|&l| !mesh.link(l).mirror.is_valid())
        .unwrap_or(outgoing[0]);

    let mut count = 1;
    let mut current = start;
    while count <= outgoing.len() {
        let prev = mesh.link(current).prev;
        match mesh.mirror(prev) {
            Some(next) if next != start => {
                current = next;
                count += 1;
            }
            _ => break,
        }
    }
    count
}

/// Handles run from 0 to `I::MAX`; `I::MAX + 1` is the invalid sentinel.
fn check_capacity<I: MeshIndex>(entity: &'static str, count: usize) -> Result<()> {
    let max = I::MAX.to_usize().saturating_add(1);
    if count > max {
        return Err(MeshError::IndexOverflow { entity, count, max });
    }
    Ok(())
}

/// Normalize edge direction so the smaller id comes first.
#[inline]
fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::mesh::blueprint::{build_blueprint, BlueprintTriangle, BlueprintVertex, MeshArrays};
    use nalgebra::{Point3, Vector3};

    fn build(vertices: &[[f64; 3]], triangles: &[[i64; 3]]) -> Result<Mesh> {
        generate(&build_blueprint(&MeshArrays::from_rows(vertices, triangles))?)
    }

    fn tetrahedron() -> (Vec<[f64; 3]>, Vec<[i64; 3]>) {
        (
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.5, 1.0, 0.0],
                [0.5, 0.5, 1.0],
            ],
            vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]],
        )
    }

    #[test]
    fn test_single_triangle() {
        let mesh = build(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 1.0, 0.0]], &[[0, 1, 2]]).unwrap();

        assert_eq!(mesh.num_links(), 3);
        assert!(mesh.right_links().is_empty());
        assert_eq!(mesh.edge_links().len(), 3);
        assert_eq!(mesh.edge_vertices().len(), 3);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_unit_square() {
        let mesh = build(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            &[[0, 1, 2], [0, 2, 3]],
        )
        .unwrap();

        assert!(mesh.surface_vertices().is_empty());
        assert_eq!(mesh.edge_vertices().len(), 4);

        // The diagonal is the only interior edge
        let right = mesh.right_links()[0];
        let link = mesh.link(right);
        assert_eq!((link.v1.index(), link.v2.index()), (2, 0));
        let (own, other) = mesh.opposite_vertices(right).unwrap();
        assert_eq!((own.index(), other.index()), (1, 3));

        let mirror = mesh.mirror(right).unwrap();
        assert_eq!(mesh.link(mirror).kind, LinkKind::Mirror);
        assert_eq!(mesh.representative(mirror), right);

        for v in mesh.edge_vertices() {
            let (incoming, outgoing) = mesh.boundary_links(*v).unwrap();
            assert_eq!(mesh.link(incoming).v2, *v);
            assert_eq!(mesh.link(outgoing).v1, *v);
        }
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_closed_tetrahedron() {
        let (v, t) = tetrahedron();
        let mesh = build(&v, &t).unwrap();

        assert_eq!(mesh.num_links(), 12);
        assert_eq!(mesh.right_links().len(), 6);
        assert!(mesh.edge_links().is_empty());
        assert_eq!(mesh.surface_vertices().len(), 4);
        for vid in mesh.vertex_ids() {
            assert!(!mesh.is_boundary_vertex(vid));
            assert_eq!(mesh.vertex_triangles(vid).len(), 3);
            assert_eq!(mesh.vertex_links(vid).len(), 3);
        }
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_non_manifold_edge() {
        let err = build(
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.5, 1.0, 0.0],
                [0.5, -1.0, 0.0],
                [0.5, 0.0, 1.0],
            ],
            &[[0, 1, 2], [1, 0, 3], [0, 1, 4]],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TopologyBuildFailure);
    }

    #[test]
    fn test_inconsistent_orientation() {
        let err = build(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 1.0, 0.0], [0.5, -1.0, 0.0]],
            &[[0, 1, 2], [0, 1, 3]],
        )
        .unwrap_err();
        assert!(matches!(err, MeshError::InconsistentOrientation { v0: 0, v1: 1 }));
    }

    #[test]
    fn test_bowtie_vertex() {
        // Two triangles touching only at vertex 0
        let err = build(
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [-1.0, 0.0, 0.0],
                [-1.0, -1.0, 0.0],
            ],
            &[[0, 1, 2], [0, 3, 4]],
        )
        .unwrap_err();
        assert!(matches!(err, MeshError::NonManifoldVertex { vertex: 0, .. }));
    }

    #[test]
    fn test_double_cone_vertex() {
        // Two closed fans glued at the apex 0
        let vertices = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 1.0],
            [-0.5, 0.8, 1.0],
            [-0.5, -0.8, 1.0],
            [1.0, 0.0, -1.0],
            [-0.5, 0.8, -1.0],
            [-0.5, -0.8, -1.0],
        ];
        let triangles = [
            [0, 1, 2], [0, 2, 3], [0, 3, 1], [1, 3, 2],
            [0, 5, 4], [0, 6, 5], [0, 4, 6], [4, 5, 6],
        ];
        let err = build(&vertices, &triangles).unwrap_err();
        assert!(matches!(err, MeshError::NonManifoldVertex { vertex: 0, .. }));
    }

    fn grid(n: usize) -> MeshArrays {
        let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
        for j in 0..=n {
            for i in 0..=n {
                vertices.push([i as f64, j as f64, 0.0]);
            }
        }
        let mut triangles = Vec::with_capacity(2 * n * n);
        for j in 0..n {
            for i in 0..n {
                let v00 = (j * (n + 1) + i) as i64;
                let v01 = v00 + (n + 1) as i64;
                triangles.push([v00, v00 + 1, v01 + 1]);
                triangles.push([v00, v01 + 1, v01]);
            }
        }
        MeshArrays::from_rows(&vertices, &triangles)
    }

    #[test]
    fn test_index_overflow_is_reported() {
        // 22,050 triangles need 66,150 links, beyond u16 handles
        let bp = build_blueprint(&grid(105)).unwrap();
        let err = generate::<u16>(&bp).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TopologyBuildFailure);
        match err {
            MeshError::IndexOverflow { entity, count, max } => {
                assert_eq!(entity, "links");
                assert_eq!(count, 66_150);
                assert_eq!(max, u16::MAX as usize);
            }
            other => panic!("unexpected error: {other}"),
        }

        let mesh = generate::<u32>(&bp).unwrap();
        assert_eq!(mesh.num_links(), 66_150);
    }

    #[test]
    fn test_small_grid_fits_u16() {
        let mesh = generate::<u16>(&build_blueprint(&grid(10)).unwrap()).unwrap();
        assert_eq!(mesh.num_triangles(), 200);
        assert_eq!(mesh.surface_vertices().len(), 81);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_empty_triangles() {
        let err = build(&[[0.0, 0.0, 0.0]], &[]).unwrap_err();
        assert!(matches!(err, MeshError::EmptyMesh));
    }

    #[test]
    fn test_inactive_vertex_drops_triangles() {
        let positions = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let vertices = positions
            .iter()
            .enumerate()
            .map(|(id, &position)| BlueprintVertex { position, id, domain: 0, active: id != 3 })
            .collect();
        let triangles = vec![
            BlueprintTriangle { id: 0, vertices: [0, 1, 2] },
            BlueprintTriangle { id: 1, vertices: [0, 2, 3] },
        ];
        let bp = Blueprint::from_parts(Vector3::repeat(1.0), vertices, triangles, vec![]).unwrap();
        let mesh: Mesh = generate(&bp).unwrap();

        assert_eq!(mesh.num_triangles(), 2);
        assert_eq!(mesh.active_triangles().len(), 1);
        assert!(!mesh.triangle(TriangleId::new(1)).active);
        assert_eq!(mesh.active_vertices().len(), 3);
        assert_eq!(mesh.edge_links().len(), 3);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_isolated_vertex_is_surface() {
        let mesh = build(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 1.0, 0.0], [5.0, 5.0, 5.0]],
            &[[0, 1, 2]],
        )
        .unwrap();
        assert_eq!(mesh.surface_vertices(), &[VertexId::new(3)]);
        assert!(mesh.vertex_triangles(VertexId::new(3)).is_empty());
    }
}
