//! Pure, communication-free dependency-closure queries over a mesh.
//!
//! Everything here operates on a [`MeshDefinition`] alone and returns sorted
//! sets. Ordered iteration matters: downstream ownership tie-breaks fold
//! over these sets in ascending id order, and the coloring is only
//! reproducible because that order is fixed.
//!
//! Set algebra uses `BTreeSet`'s operators directly: `&a | &b` (union),
//! `&a - &b` (difference), `&a & &b` (intersection).

use std::collections::BTreeSet;

use hashbrown::HashMap;

use crate::mesh::MeshDefinition;

/// Neighbors of `entity_id` among the entities of `to_dim`.
///
/// Entity `e` is a neighbor iff it shares strictly more than `thru_dim`
/// vertices with `entity_id` (0 = shared vertex, 1 = shared edge,
/// 2 = shared face). When `from_dim == to_dim` the entity itself is
/// excluded.
pub fn entity_neighbors<M>(
    md: &M,
    from_dim: usize,
    to_dim: usize,
    thru_dim: usize,
    entity_id: usize,
) -> BTreeSet<usize>
where
    M: MeshDefinition,
{
    let vertices = md.entities_set(from_dim, 0, entity_id);
    let mut neighbors = BTreeSet::new();

    for e in 0..md.num_entities(to_dim) {
        if from_dim == to_dim && e == entity_id {
            continue;
        }
        let other = md.entities_set(to_dim, 0, e);
        if (&vertices & &other).len() > thru_dim {
            neighbors.insert(e);
        }
    }

    neighbors
}

/// One-ring neighborhood of a set: every neighbor of every member, plus the
/// seed set itself.
///
/// The shared-vertex adjacency is built once for the whole mesh with an
/// incrementally grown vertex-to-entity map, then probed per seed, the
/// same counting scheme the dCRS builder uses.
pub fn neighborhood<M>(
    md: &M,
    dim: usize,
    thru_dim: usize,
    indices: &BTreeSet<usize>,
) -> BTreeSet<usize>
where
    M: MeshDefinition,
{
    let total = md.num_entities(dim);
    let mut vertex_to_entities: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); total];

    for entity in 0..total {
        let mut shared_counts: HashMap<usize, usize> = HashMap::new();
        for vertex in md.entities(dim, 0, entity) {
            let seen = vertex_to_entities.entry(vertex).or_default();
            for &other in seen.iter() {
                if other != entity {
                    *shared_counts.entry(other).or_insert(0) += 1;
                }
            }
            seen.push(entity);
        }
        for (other, count) in shared_counts {
            if count > thru_dim {
                neighbors[entity].push(other);
                neighbors[other].push(entity);
            }
        }
    }

    let mut closure: BTreeSet<usize> = indices.clone();
    for &i in indices {
        closure.extend(neighbors[i].iter().copied());
    }
    closure
}

/// Entities of `from_dim` whose `to_dim` sub-entity list contains `id`.
///
/// Linear scan over the whole dimension; only ever run on closure
/// frontiers, never on the full mesh per call site.
pub fn entity_referencers<M>(md: &M, from_dim: usize, to_dim: usize, id: usize) -> BTreeSet<usize>
where
    M: MeshDefinition,
{
    let mut referencers = BTreeSet::new();
    for e in 0..md.num_entities(from_dim) {
        if md.entities(from_dim, to_dim, e).contains(&id) {
            referencers.insert(e);
        }
    }
    referencers
}

/// Union of the `to_dim` sub-entities referenced by every entity in
/// `indices`.
pub fn entity_closure<M, I>(md: &M, from_dim: usize, to_dim: usize, indices: I) -> BTreeSet<usize>
where
    M: MeshDefinition,
    I: IntoIterator<Item = usize>,
{
    let mut closure = BTreeSet::new();
    for i in indices {
        closure.extend(md.entities(from_dim, to_dim, i));
    }
    closure
}
