//! Inclusions: typed markers attached to vertices.
//!
//! Placement and typing happen in two phases. Building a mesh records each
//! inclusion's vertex, type id and in-plane direction in an [`InclusionMap`].
//! Type definitions are supplied later through [`InclusionMap::resolve`],
//! which pairs every record with its definition without storing a reference
//! to it.

use std::collections::HashMap;

use nalgebra::Vector2;

use crate::error::{MeshError, Result};
use crate::mesh::{BlueprintInclusion, VertexId};

/// A placed inclusion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inclusion {
    /// Inclusion id (its position in the map).
    pub id: usize,
    /// Vertex the inclusion sits on.
    pub vertex: VertexId,
    /// Type id, resolved against a type table later.
    pub type_id: i64,
    /// Unit direction in the vertex's local tangent frame.
    pub direction: Vector2<f64>,
}

/// An inclusion paired with its type definition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedInclusion<'a, T> {
    /// The placement record.
    pub inclusion: Inclusion,
    /// The type definition for `inclusion.type_id`.
    pub definition: &'a T,
}

/// Ordered inclusion records of a mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InclusionMap {
    inclusions: Vec<Inclusion>,
}

impl InclusionMap {
    /// Retain the inclusions of a blueprint, in input order.
    pub fn from_blueprint(inclusions: &[BlueprintInclusion]) -> Self {
        let inclusions = inclusions
            .iter()
            .map(|bi| Inclusion {
                id: bi.id,
                vertex: VertexId::new(bi.vertex),
                type_id: bi.type_id,
                direction: bi.direction,
            })
            .collect();
        Self { inclusions }
    }

    /// Number of inclusions.
    #[inline]
    pub fn len(&self) -> usize {
        self.inclusions.len()
    }

    /// Check if there are no inclusions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inclusions.is_empty()
    }

    /// Iterate over the inclusions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Inclusion> + '_ {
        self.inclusions.iter()
    }

    /// Get an inclusion by id.
    pub fn get(&self, id: usize) -> Option<&Inclusion> {
        self.inclusions.get(id)
    }

    /// Inclusions sitting on a vertex.
    pub fn on_vertex(&self, v: VertexId) -> impl Iterator<Item = &Inclusion> + '_ {
        self.inclusions.iter().filter(move |inc| inc.vertex == v)
    }

    /// Parallel `(vertex id, type id)` lists in insertion order.
    pub fn vertex_type_pairs(&self) -> (Vec<i64>, Vec<i64>) {
        self.inclusions
            .iter()
            .map(|inc| (inc.vertex.index() as i64, inc.type_id))
            .unzip()
    }

    /// Pair every inclusion with its type definition.
    ///
    /// Fails with [`MeshError::UnresolvedInclusionType`] on the first type id
    /// missing from `types`.
    ///
    /// # Example
    /// ```
    /// use std::collections::HashMap;
    /// use dtsmesh::inclusion::InclusionMap;
    /// use dtsmesh::mesh::{build_blueprint, MeshArrays};
    /// use dtsmesh::nalgebra::DMatrix;
    ///
    /// let arrays = MeshArrays::from_rows(
    ///     &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 1.0, 0.0]],
    ///     &[[0, 1, 2]],
    /// )
    /// .with_inclusions(
    ///     DMatrix::from_row_slice(1, 2, &[7, 2]),
    ///     DMatrix::from_row_slice(1, 2, &[0.0, 1.0]),
    /// );
    /// let blueprint = build_blueprint(&arrays).unwrap();
    /// let map = InclusionMap::from_blueprint(blueprint.inclusions());
    ///
    /// let types = HashMap::from([(7, "protein")]);
    /// let resolved = map.resolve(&types).unwrap();
    /// assert_eq!(*resolved[0].definition, "protein");
    /// ```
    pub fn resolve<'a, T>(&self, types: &'a HashMap<i64, T>) -> Result<Vec<ResolvedInclusion<'a, T>>> {
        self.inclusions
            .iter()
            .map(|&inclusion| {
                types
                    .get(&inclusion.type_id)
                    .map(|definition| ResolvedInclusion {
                        inclusion,
                        definition,
                    })
                    .ok_or(MeshError::UnresolvedInclusionType {
                        type_id: inclusion.type_id,
                    })
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a InclusionMap {
    type Item = &'a Inclusion;
    type IntoIter = std::slice::Iter<'a, Inclusion>;

    fn into_iter(self) -> Self::IntoIter {
        self.inclusions.iter()
    }
}
