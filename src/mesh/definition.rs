//! The narrow mesh interface the coloring engine consumes.
//!
//! The engine never stores mesh topology itself; it asks an external mesh
//! library entity-count and adjacency questions through this trait. Any type
//! that can answer them (a file-backed reader, an in-memory topology, a
//! generated grid) can be colored.

use std::collections::BTreeSet;

/// Read-only topological queries over an unstructured mesh.
///
/// Entity ids are global, dense, and zero-based within each topological
/// dimension. `entities(from, to, id)` returns the `to`-dimensional
/// sub-entities of entity `id` at dimension `from`, in the mesh's canonical
/// order (e.g. the vertex ring of a cell).
pub trait MeshDefinition {
    /// Spatial dimension of the mesh (2 or 3).
    fn dimension(&self) -> usize;

    /// Number of entities of topological dimension `dim`.
    fn num_entities(&self, dim: usize) -> usize;

    /// Sub-entities of dimension `to_dim` defining entity `id` of
    /// dimension `from_dim`, in canonical order.
    fn entities(&self, from_dim: usize, to_dim: usize, id: usize) -> Vec<usize>;

    /// Same query as [`entities`](Self::entities), as a sorted set.
    fn entities_set(&self, from_dim: usize, to_dim: usize, id: usize) -> BTreeSet<usize> {
        self.entities(from_dim, to_dim, id).into_iter().collect()
    }

    /// Coordinates of vertex `id`. Meshes with dimension < 3 report zero
    /// for the unused components.
    fn vertex(&self, id: usize) -> [f64; 3];
}
