//! The coloring orchestrator.
//!
//! One call to [`ColoringEngine::color`] runs the whole pass for the
//! primary entity kind (cells) and the dependent kind (vertices): build the
//! dual graph, partition it, grow the halo closures, resolve ownership and
//! offsets across colors, classify everything as exclusive / shared /
//! ghost, and register the results. There is no incremental update; if
//! the mesh or the color count changes, re-run the pass.
//!
//! Dependent-entity ownership is derived, not partitioned: a vertex belongs
//! to the minimum color among the cells that reference it. The reduction
//! folds over sorted sets, so the tie-break is identical on every color and
//! across repeated runs.

use std::collections::BTreeSet;

use hashbrown::HashMap;
use itertools::Itertools;
use log::debug;

use crate::closure;
use crate::coloring::context::ColoringContext;
use crate::coloring::types::{AdjacencyInfo, ColoringInfo, EntityInfo, IndexColoring};
use crate::comm::Communicator;
use crate::error::MeshColoringError;
use crate::graph::make_dcrs;
use crate::mesh::MeshDefinition;
use crate::partition::Partitioner;

/// Index-space ids under which the colorings and the cell-to-vertex
/// connectivity are registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColoringSpaces {
    pub cells: usize,
    pub vertices: usize,
    pub cells_to_vertices: usize,
}

/// Orchestrates one full coloring pass over a mesh.
pub struct ColoringEngine<'a, M, C, P> {
    md: &'a M,
    comm: &'a C,
    partitioner: &'a P,
    /// Shared sub-entities required for dual-graph adjacency; defaults to
    /// facet adjacency (`dimension - 1`).
    pub graph_thru_dim: usize,
    /// Shared sub-entities required for halo closures; defaults to vertex
    /// adjacency (0), which guarantees every referencer of the vertex
    /// closure is covered by the neighbor information.
    pub closure_thru_dim: usize,
}

impl<'a, M, C, P> ColoringEngine<'a, M, C, P>
where
    M: MeshDefinition,
    C: Communicator,
    P: Partitioner,
{
    pub fn new(md: &'a M, comm: &'a C, partitioner: &'a P) -> Self {
        let dim = md.dimension();
        Self {
            md,
            comm,
            partitioner,
            graph_thru_dim: dim.saturating_sub(1),
            closure_thru_dim: 0,
        }
    }

    /// Run the pass and register cell and vertex colorings into `context`.
    pub fn color(
        &self,
        context: &mut ColoringContext,
        spaces: ColoringSpaces,
    ) -> Result<(), MeshColoringError> {
        let colors = self.comm.size();
        let color = self.comm.rank();
        let cell_dim = self.md.dimension();

        // Primary coloring of the cell dual graph.
        let dcrs = make_dcrs(self.md, cell_dim, cell_dim, self.graph_thru_dim, colors, color);
        let mut cells = IndexColoring::default();
        let mut cell_info = ColoringInfo::default();
        cells.primary = self.partitioner.partition(&dcrs, self.comm)?;
        debug!("color {color}: {} primary cells", cells.primary.len());

        // Halo closures. Subtracting the primary set from its closure
        // leaves the nearest neighbors: the image of the adjacency graph
        // over the primary set.
        let closure = closure::neighborhood(self.md, cell_dim, self.closure_thru_dim, &cells.primary);
        let nearest = &closure - &cells.primary;

        // Which other colors' halos overlap ours, for indirect sharing.
        let closure_intersection_map = self.comm.get_intersection_info(&nearest)?;

        // A second halo ring: ownership of these cells decides vertex
        // ownership along the halo boundary.
        let nn_closure = closure::neighborhood(self.md, cell_dim, self.closure_thru_dim, &nearest);
        let next_nearest = &nn_closure - &closure;
        let all_neighbors = &nearest | &next_nearest;

        let (nearest_local, nearest_remote) =
            self.comm.get_primary_info(&cells.primary, &nearest)?;
        let (_, all_remote) = self.comm.get_primary_info(&cells.primary, &all_neighbors)?;

        // Classify the primary cells. A cell some other color requested is
        // shared with exactly the colors recorded in its slot.
        let primary_vec: Vec<usize> = cells.primary.iter().copied().collect();
        for (offset, users) in nearest_local.iter().enumerate() {
            let id = primary_vec[offset];
            if users.is_empty() {
                cells.exclusive.insert(EntityInfo::unshared(id, color, offset));
            } else {
                cells
                    .shared
                    .insert(EntityInfo::new(id, color, offset, users.clone()));
                cell_info.shared_users.extend(users.iter().copied());
            }
        }
        for info in &nearest_remote {
            cell_info.ghost_owners.insert(info.rank);
            cells.ghost.insert(info.clone());
        }
        cell_info.exclusive = cells.exclusive.len();
        cell_info.shared = cells.shared.len();
        cell_info.ghost = cells.ghost.len();

        for (r, n) in self.comm.gather_sizes(cells.primary.len()).into_iter().enumerate() {
            cells.entities_per_rank.insert(r, n);
        }

        // Lookup maps for the dependent-entity pass.
        let remote_info_map: HashMap<usize, EntityInfo> = all_remote
            .iter()
            .map(|info| (info.id, info.clone()))
            .collect();
        let shared_cells_map: HashMap<usize, EntityInfo> = cells
            .shared
            .iter()
            .map(|info| (info.id, info.clone()))
            .collect();

        let (mut vertices, mut vertex_info) = self.color_dependent(
            0,
            &closure,
            &remote_info_map,
            &shared_cells_map,
            &closure_intersection_map,
        )?;
        vertex_info.exclusive = vertices.exclusive.len();
        vertex_info.shared = vertices.shared.len();
        vertex_info.ghost = vertices.ghost.len();
        for (r, n) in self
            .comm
            .gather_sizes(vertices.primary.len())
            .into_iter()
            .enumerate()
        {
            vertices.entities_per_rank.insert(r, n);
        }

        // Make every color's aggregate view globally consistent, then
        // register.
        let cell_coloring_info = self.comm.gather_coloring_info(&cell_info)?;
        let vertex_coloring_info = self.comm.gather_coloring_info(&vertex_info)?;

        // Connectivity footprint for the storage layer: every locally held
        // cell (owned or ghost) stores its vertex ring.
        let local_connectivity: usize = cells
            .exclusive
            .iter()
            .chain(cells.shared.iter())
            .chain(cells.ghost.iter())
            .map(|e| self.md.entities(cell_dim, 0, e.id).len())
            .sum();
        context.add_adjacency(AdjacencyInfo {
            index_space: spaces.cells_to_vertices,
            from_index_space: spaces.cells,
            to_index_space: spaces.vertices,
            color_sizes: self.comm.gather_sizes(local_connectivity),
        });

        context.set_index_map(spaces.cells, local_order(&cells));
        context.set_index_map(spaces.vertices, local_order(&vertices));
        context.add_coloring(spaces.cells, cells, cell_coloring_info);
        context.add_coloring(spaces.vertices, vertices, vertex_coloring_info);
        Ok(())
    }

    /// Color a dependent entity kind by deriving ownership from the cells
    /// that reference each entity.
    fn color_dependent(
        &self,
        entity_dim: usize,
        closure: &BTreeSet<usize>,
        remote_info_map: &HashMap<usize, EntityInfo>,
        shared_cells_map: &HashMap<usize, EntityInfo>,
        closure_intersection_map: &std::collections::HashMap<usize, BTreeSet<usize>>,
    ) -> Result<(IndexColoring, ColoringInfo), MeshColoringError> {
        let colors = self.comm.size();
        let color = self.comm.rank();
        let cell_dim = self.md.dimension();

        let entity_closure =
            closure::entity_closure(self.md, cell_dim, entity_dim, closure.iter().copied());

        let mut entity_info: BTreeSet<EntityInfo> = BTreeSet::new();
        let mut requests: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); colors];
        let mut offset = 0usize;

        for &id in &entity_closure {
            let referencers = closure::entity_referencers(self.md, cell_dim, entity_dim, id);

            let mut min_rank = usize::MAX;
            let mut shared_with: BTreeSet<usize> = BTreeSet::new();

            // Fold min over referencers in ascending cell order, the
            // ownership tie-break every color must agree on.
            for &cell in &referencers {
                if let Some(info) = remote_info_map.get(&cell) {
                    min_rank = min_rank.min(info.rank);
                    shared_with.insert(info.rank);
                } else {
                    // Not in the remote map: a local cell. If it is shared,
                    // every color reading it also reads this entity.
                    min_rank = min_rank.min(color);
                    if let Some(info) = shared_cells_map.get(&cell) {
                        shared_with.extend(info.shared.iter().copied());
                    }
                }

                // Indirect dependency: the cell sits in another color's
                // halo even though no primary info names that color.
                for (&r, ids) in closure_intersection_map {
                    if ids.contains(&cell) {
                        shared_with.insert(r);
                    }
                }
            }

            if min_rank == color {
                entity_info.insert(EntityInfo::new(id, color, offset, shared_with));
                offset += 1;
            } else {
                requests[min_rank].insert(id);
            }
        }

        let offset_info = self.comm.get_entity_info(&entity_info, &requests)?;

        let mut entities = IndexColoring::default();
        let mut info = ColoringInfo::default();
        for e in &entity_info {
            entities.primary.insert(e.id);
            if e.shared.is_empty() {
                entities.exclusive.insert(e.clone());
            } else {
                info.shared_users.extend(e.shared.iter().copied());
                entities.shared.insert(e.clone());
            }
        }
        for (r, (asked, offsets)) in requests.iter().zip(&offset_info).enumerate() {
            for (&id, &off) in asked.iter().zip_eq(offsets) {
                entities.ghost.insert(EntityInfo::unshared(id, r, off));
                info.ghost_owners.insert(r);
            }
        }

        Ok((entities, info))
    }
}

/// Local numbering for an index space: exclusive, then shared, then ghost,
/// each block ascending by global id.
fn local_order(coloring: &IndexColoring) -> Vec<usize> {
    coloring
        .exclusive
        .iter()
        .chain(coloring.shared.iter())
        .chain(coloring.ghost.iter())
        .map(|e| e.id)
        .collect()
}
