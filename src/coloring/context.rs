//! Process-wide registry for finished colorings.
//!
//! The context is constructed explicitly by the host program and passed by
//! reference to whoever needs it: typically created once at startup,
//! populated by the engine, and read-only for the rest of the run. Index
//! spaces are caller-chosen ids; the context never invents them.

use std::collections::{BTreeMap, HashMap};

use crate::error::MeshColoringError;

use super::types::{AdjacencyInfo, ColoringInfo, IndexColoring};

/// Registry of colorings, aggregate info, adjacencies, and id translations,
/// keyed by index-space id.
#[derive(Debug, Default)]
pub struct ColoringContext {
    colorings: HashMap<usize, IndexColoring>,
    coloring_info: HashMap<usize, HashMap<usize, ColoringInfo>>,
    adjacencies: Vec<AdjacencyInfo>,
    index_maps: HashMap<usize, BTreeMap<usize, usize>>,
    reverse_index_maps: HashMap<usize, BTreeMap<usize, usize>>,
}

impl ColoringContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a finished coloring and its per-color aggregate map.
    pub fn add_coloring(
        &mut self,
        index_space: usize,
        coloring: IndexColoring,
        info: HashMap<usize, ColoringInfo>,
    ) {
        self.colorings.insert(index_space, coloring);
        self.coloring_info.insert(index_space, info);
    }

    pub fn coloring(&self, index_space: usize) -> Result<&IndexColoring, MeshColoringError> {
        self.colorings
            .get(&index_space)
            .ok_or(MeshColoringError::UnknownIndexSpace(index_space))
    }

    pub fn coloring_info(
        &self,
        index_space: usize,
    ) -> Result<&HashMap<usize, ColoringInfo>, MeshColoringError> {
        self.coloring_info
            .get(&index_space)
            .ok_or(MeshColoringError::UnknownIndexSpace(index_space))
    }

    pub fn add_adjacency(&mut self, adjacency: AdjacencyInfo) {
        self.adjacencies.push(adjacency);
    }

    pub fn adjacencies(&self) -> &[AdjacencyInfo] {
        &self.adjacencies
    }

    /// Record the local numbering for an index space from its global ids in
    /// local order; builds both translation directions.
    pub fn set_index_map<I>(&mut self, index_space: usize, ordered_globals: I)
    where
        I: IntoIterator<Item = usize>,
    {
        let mut forward = BTreeMap::new();
        let mut reverse = BTreeMap::new();
        for (local, global) in ordered_globals.into_iter().enumerate() {
            forward.insert(global, local);
            reverse.insert(local, global);
        }
        self.index_maps.insert(index_space, forward);
        self.reverse_index_maps.insert(index_space, reverse);
    }

    /// Global-to-local id translation for an index space.
    pub fn index_map(
        &self,
        index_space: usize,
    ) -> Result<&BTreeMap<usize, usize>, MeshColoringError> {
        self.index_maps
            .get(&index_space)
            .ok_or(MeshColoringError::UnknownIndexSpace(index_space))
    }

    /// Local-to-global id translation for an index space.
    pub fn reverse_index_map(
        &self,
        index_space: usize,
    ) -> Result<&BTreeMap<usize, usize>, MeshColoringError> {
        self.reverse_index_maps
            .get(&index_space)
            .ok_or(MeshColoringError::UnknownIndexSpace(index_space))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_space_is_an_error() {
        let ctx = ColoringContext::new();
        assert!(matches!(
            ctx.coloring(7),
            Err(MeshColoringError::UnknownIndexSpace(7))
        ));
        assert!(ctx.index_map(7).is_err());
    }

    #[test]
    fn index_maps_translate_both_ways() {
        let mut ctx = ColoringContext::new();
        ctx.set_index_map(0, [30, 10, 20]);
        let forward = ctx.index_map(0).unwrap();
        let reverse = ctx.reverse_index_map(0).unwrap();
        assert_eq!(forward[&30], 0);
        assert_eq!(forward[&20], 2);
        assert_eq!(reverse[&0], 30);
        assert_eq!(reverse[&1], 10);
    }

    #[test]
    fn adjacency_records_accumulate() {
        let mut ctx = ColoringContext::new();
        ctx.add_adjacency(AdjacencyInfo {
            index_space: 2,
            from_index_space: 0,
            to_index_space: 1,
            color_sizes: vec![4, 4],
        });
        assert_eq!(ctx.adjacencies().len(), 1);
        assert_eq!(ctx.adjacencies()[0].color_sizes, vec![4, 4]);
    }
}
