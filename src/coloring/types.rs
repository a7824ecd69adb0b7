//! Metadata types produced by a coloring pass.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

/// One entity's placement: global id, owning color, local offset within the
/// owner's primary list, and the colors it is shared with.
///
/// Ordering, equality, and hashing use the `id` alone. Two `EntityInfo`
/// values with equal ids occupy the same slot in a sorted set even when
/// their rank/offset/shared differ; lookups by id depend on this.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct EntityInfo {
    pub id: usize,
    pub rank: usize,
    pub offset: usize,
    pub shared: BTreeSet<usize>,
}

impl EntityInfo {
    pub fn new(id: usize, rank: usize, offset: usize, shared: BTreeSet<usize>) -> Self {
        Self {
            id,
            rank,
            offset,
            shared,
        }
    }

    /// An entry with no sharing colors recorded.
    pub fn unshared(id: usize, rank: usize, offset: usize) -> Self {
        Self::new(id, rank, offset, BTreeSet::new())
    }
}

impl PartialEq for EntityInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EntityInfo {}

impl PartialOrd for EntityInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EntityInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Hash for EntityInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// One color's view of one index space: who it owns, what it must expose,
/// and what it must mirror.
///
/// Invariants: `exclusive` and `shared` are disjoint by id and their ids
/// union to `primary`; every `ghost` id is owned by some other color.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IndexColoring {
    /// Global ids owned by this color after the partition exchange.
    pub primary: BTreeSet<usize>,
    /// Owned, referenced by no other color.
    pub exclusive: BTreeSet<EntityInfo>,
    /// Owned, referenced by at least one other color.
    pub shared: BTreeSet<EntityInfo>,
    /// Owned elsewhere, read locally.
    pub ghost: BTreeSet<EntityInfo>,
    /// Primary count of every color, keyed by color id.
    pub entities_per_rank: BTreeMap<usize, usize>,
}

impl IndexColoring {
    /// Check the exclusive/shared/primary partition invariant.
    pub fn is_consistent(&self) -> bool {
        let exclusive_ids: BTreeSet<usize> = self.exclusive.iter().map(|e| e.id).collect();
        let shared_ids: BTreeSet<usize> = self.shared.iter().map(|e| e.id).collect();
        (&exclusive_ids & &shared_ids).is_empty() && (&exclusive_ids | &shared_ids) == self.primary
    }
}

/// Aggregate per-color counts and communication partners, all-gathered so
/// every color holds the same map.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ColoringInfo {
    pub exclusive: usize,
    pub shared: usize,
    pub ghost: usize,
    /// Colors that read this color's shared entities.
    pub shared_users: BTreeSet<usize>,
    /// Colors that own this color's ghost entities.
    pub ghost_owners: BTreeSet<usize>,
}

/// Metadata describing a derived connectivity between two index spaces,
/// consumed by the storage layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AdjacencyInfo {
    /// Index space holding the connectivity itself.
    pub index_space: usize,
    /// Index space of the source entities.
    pub from_index_space: usize,
    /// Index space of the target entities.
    pub to_index_space: usize,
    /// Connectivity entry counts per color.
    pub color_sizes: Vec<usize>,
}
