//! Mesh topology arena.
//!
//! Vertices, triangles and links live in flat vectors and refer to each other
//! through integer handles. Every triangle side is a directed **link**
//! `v1 → v2` that knows its owning triangle, the apex `v3` opposite to it,
//! the next/previous link of the same triangle, and its **mirror** — the
//! reverse link in the neighbouring triangle, if there is one.
//!
//! # Classification
//!
//! - A link with a mirror is interior. Of each mirror pair, the link with the
//!   lower id is the **right** link (the one carrying the shape operator);
//!   the other is its **mirror**.
//! - A link without a mirror is a boundary **edge** link.
//! - A vertex touched by at least one edge link is an **edge** vertex;
//!   every other vertex is a **surface** vertex.

use nalgebra::{Point3, Vector3};

use super::index::{LinkId, MeshIndex, TriangleId, VertexId};

/// Position of a vertex relative to the mesh boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexClass {
    /// Interior vertex, fully surrounded by triangles.
    Surface,
    /// Boundary vertex.
    Edge,
}

/// Role of a directed link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Interior link that represents its mirror pair.
    Right,
    /// Interior link whose pair is represented by its mirror.
    Mirror,
    /// Boundary link.
    Edge,
}

/// A vertex in the mesh.
#[derive(Debug, Clone)]
pub struct Vertex<I: MeshIndex = u32> {
    /// The 3D position of this vertex.
    pub position: Point3<f64>,

    /// Domain id carried over from the blueprint.
    pub domain: i64,

    /// Whether the vertex takes part in curvature and export.
    pub active: bool,

    /// Interior or boundary.
    pub class: VertexClass,

    /// Incident active triangles.
    pub(crate) triangles: Vec<TriangleId<I>>,

    /// Outgoing links (`v1 == self`), one per incident triangle.
    pub(crate) links: Vec<LinkId<I>>,

    /// Boundary links touching this vertex in either direction.
    pub(crate) edge_links: Vec<LinkId<I>>,
}

impl<I: MeshIndex> Vertex<I> {
    /// Create an isolated vertex at the given position.
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            domain: 0,
            active: true,
            class: VertexClass::Surface,
            triangles: Vec::new(),
            links: Vec::new(),
            edge_links: Vec::new(),
        }
    }
}

/// A triangle in the mesh.
#[derive(Debug, Clone, Copy)]
pub struct Triangle<I: MeshIndex = u32> {
    /// Vertices in winding order; the winding defines the normal.
    pub vertices: [VertexId<I>; 3],

    /// Links `v0 → v1`, `v1 → v2`, `v2 → v0`. Invalid for inactive triangles.
    pub links: [LinkId<I>; 3],

    /// A triangle is active iff its three vertices are.
    pub active: bool,
}

/// A directed link (one side of one triangle).
#[derive(Debug, Clone, Copy)]
pub struct Link<I: MeshIndex = u32> {
    /// Start vertex.
    pub v1: VertexId<I>,

    /// End vertex.
    pub v2: VertexId<I>,

    /// Apex of the owning triangle opposite to this link.
    pub v3: VertexId<I>,

    /// Owning triangle.
    pub triangle: TriangleId<I>,

    /// Next link around the owning triangle.
    pub next: LinkId<I>,

    /// Previous link around the owning triangle.
    pub prev: LinkId<I>,

    /// Reverse link in the neighbouring triangle. Invalid on the boundary.
    pub mirror: LinkId<I>,

    /// Role of the link.
    pub kind: LinkKind,
}

/// Triangulated surface topology.
///
/// Built by [`generate`](super::generate); read-only afterwards.
#[derive(Debug, Clone)]
pub struct Mesh<I: MeshIndex = u32> {
    pub(crate) simbox: Vector3<f64>,
    pub(crate) vertices: Vec<Vertex<I>>,
    pub(crate) triangles: Vec<Triangle<I>>,
    pub(crate) links: Vec<Link<I>>,

    pub(crate) active_vertices: Vec<VertexId<I>>,
    pub(crate) active_triangles: Vec<TriangleId<I>>,
    pub(crate) surface_vertices: Vec<VertexId<I>>,
    pub(crate) edge_vertices: Vec<VertexId<I>>,
    pub(crate) right_links: Vec<LinkId<I>>,
    pub(crate) edge_links: Vec<LinkId<I>>,
}

impl<I: MeshIndex> Mesh<I> {
    /// Create an empty mesh inside the given box, with pre-allocated capacity.
    pub(crate) fn with_capacity(simbox: Vector3<f64>, num_vertices: usize, num_triangles: usize) -> Self {
        Self {
            simbox,
            vertices: Vec::with_capacity(num_vertices),
            triangles: Vec::with_capacity(num_triangles),
            links: Vec::with_capacity(num_triangles * 3),
            active_vertices: Vec::new(),
            active_triangles: Vec::new(),
            surface_vertices: Vec::new(),
            edge_vertices: Vec::new(),
            right_links: Vec::new(),
            edge_links: Vec::new(),
        }
    }

    // ==================== Accessors ====================

    /// Simulation box extents.
    #[inline]
    pub fn simbox(&self) -> Vector3<f64> {
        self.simbox
    }

    /// Number of vertices, active or not.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles, active or not.
    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Number of directed links.
    #[inline]
    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    /// Get a vertex by ID.
    #[inline]
    pub fn vertex(&self, id: VertexId<I>) -> &Vertex<I> {
        &self.vertices[id.index()]
    }

    /// Get a triangle by ID.
    #[inline]
    pub fn triangle(&self, id: TriangleId<I>) -> &Triangle<I> {
        &self.triangles[id.index()]
    }

    /// Get a link by ID.
    #[inline]
    pub fn link(&self, id: LinkId<I>) -> &Link<I> {
        &self.links[id.index()]
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId<I>) -> &Point3<f64> {
        &self.vertex(v).position
    }

    /// Positions of the three vertices of a triangle.
    pub fn triangle_positions(&self, t: TriangleId<I>) -> [Point3<f64>; 3] {
        let [v0, v1, v2] = self.triangle(t).vertices;
        [*self.position(v0), *self.position(v1), *self.position(v2)]
    }

    // ==================== Entity sets ====================

    /// Active vertices in id order.
    #[inline]
    pub fn active_vertices(&self) -> &[VertexId<I>] {
        &self.active_vertices
    }

    /// Active triangles in id order.
    #[inline]
    pub fn active_triangles(&self) -> &[TriangleId<I>] {
        &self.active_triangles
    }

    /// Active interior vertices.
    #[inline]
    pub fn surface_vertices(&self) -> &[VertexId<I>] {
        &self.surface_vertices
    }

    /// Active boundary vertices.
    #[inline]
    pub fn edge_vertices(&self) -> &[VertexId<I>] {
        &self.edge_vertices
    }

    /// Interior links, one per mirror pair.
    #[inline]
    pub fn right_links(&self) -> &[LinkId<I>] {
        &self.right_links
    }

    /// Boundary links.
    #[inline]
    pub fn edge_links(&self) -> &[LinkId<I>] {
        &self.edge_links
    }

    /// Iterate over all vertex IDs.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId<I>> + '_ {
        (0..self.vertices.len()).map(VertexId::new)
    }

    /// Iterate over all link IDs.
    pub fn link_ids(&self) -> impl Iterator<Item = LinkId<I>> + '_ {
        (0..self.links.len()).map(LinkId::new)
    }

    // ==================== Topology Queries ====================

    /// Triangles incident to a vertex.
    #[inline]
    pub fn vertex_triangles(&self, v: VertexId<I>) -> &[TriangleId<I>] {
        &self.vertex(v).triangles
    }

    /// Links leaving a vertex.
    #[inline]
    pub fn vertex_links(&self, v: VertexId<I>) -> &[LinkId<I>] {
        &self.vertex(v).links
    }

    /// Boundary links touching a vertex.
    #[inline]
    pub fn vertex_edge_links(&self, v: VertexId<I>) -> &[LinkId<I>] {
        &self.vertex(v).edge_links
    }

    /// The mirror of a link, if it is interior.
    #[inline]
    pub fn mirror(&self, l: LinkId<I>) -> Option<LinkId<I>> {
        let m = self.link(l).mirror;
        m.is_valid().then_some(m)
    }

    /// The right link representing the pair `l` belongs to.
    ///
    /// Boundary links represent themselves.
    #[inline]
    pub fn representative(&self, l: LinkId<I>) -> LinkId<I> {
        match self.link(l).kind {
            LinkKind::Mirror => self.link(l).mirror,
            LinkKind::Right | LinkKind::Edge => l,
        }
    }

    /// The two apexes opposite an interior link: its own and its mirror's.
    pub fn opposite_vertices(&self, l: LinkId<I>) -> Option<(VertexId<I>, VertexId<I>)> {
        self.mirror(l).map(|m| (self.link(l).v3, self.link(m).v3))
    }

    /// Check if a vertex is on the boundary.
    #[inline]
    pub fn is_boundary_vertex(&self, v: VertexId<I>) -> bool {
        self.vertex(v).class == VertexClass::Edge
    }

    /// The incoming and outgoing boundary links of an edge vertex.
    pub fn boundary_links(&self, v: VertexId<I>) -> Option<(LinkId<I>, LinkId<I>)> {
        let links = self.vertex_edge_links(v);
        let incoming = links.iter().copied().find(|&l| self.link(l).v2 == v)?;
        let outgoing = links.iter().copied().find(|&l| self.link(l).v1 == v)?;
        Some((incoming, outgoing))
    }

    // ==================== Geometry ====================

    /// Compute the bounding box of the active vertices.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.active_vertices.first()?;
        let mut min = *self.position(first);
        let mut max = min;

        for &v in &self.active_vertices {
            let p = self.position(v);
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }

        Some((min, max))
    }

    // ==================== Validation ====================

    /// Check if all cross references are consistent.
    pub fn is_valid(&self) -> bool {
        for (i, link) in self.links.iter().enumerate() {
            let id = LinkId::<I>::new(i);
            if self.link(link.next).prev != id || self.link(link.prev).next != id {
                return false;
            }
            if self.link(link.next).v1 != link.v2 {
                return false;
            }
            if link.mirror.is_valid() {
                let m = self.link(link.mirror);
                if m.mirror != id || m.v1 != link.v2 || m.v2 != link.v1 {
                    return false;
                }
            }
            if !self.triangle(link.triangle).links.contains(&id) {
                return false;
            }
        }

        for (i, v) in self.vertices.iter().enumerate() {
            let id = VertexId::<I>::new(i);
            if v.links.iter().any(|&l| self.link(l).v1 != id) {
                return false;
            }
            if v.triangles.iter().any(|&t| !self.triangle(t).vertices.contains(&id)) {
                return false;
            }
        }

        true
    }
}
