//! Naive pre-partitioning and dCRS dual-graph assembly.
//!
//! The naive distribution is a pure function of the global entity count and
//! the number of colors, so every color computes the identical array with no
//! communication. The remainder goes to the *highest*-numbered colors: with
//! `quot = total / colors` and `rem = total % colors`, color `r` receives
//! `quot + 1` entities iff `r >= colors - rem`. Downstream protocols depend
//! on every color agreeing on this tie-break.

use std::collections::BTreeSet;

use hashbrown::HashMap;
use log::debug;

use crate::closure;
use crate::graph::crs::{Crs, Dcrs};
use crate::mesh::MeshDefinition;

/// Per-color prefix sums of the naive contiguous distribution.
///
/// The returned array has `colors + 1` entries; color `r` pre-owns global
/// ids `result[r]..result[r+1]`.
pub fn naive_distribution(total: usize, colors: usize) -> Vec<usize> {
    assert!(colors > 0, "at least one color required");
    let quot = total / colors;
    let rem = total % colors;
    let mut distribution = Vec::with_capacity(colors + 1);
    distribution.push(0);
    for r in 0..colors {
        let indices = quot + usize::from(r >= colors - rem);
        distribution.push(distribution[r] + indices);
    }
    distribution
}

/// The contiguous id set pre-assigned to `color` for entities of `dim`.
pub fn naive_coloring<M>(md: &M, dim: usize, colors: usize, color: usize) -> BTreeSet<usize>
where
    M: MeshDefinition,
{
    let distribution = naive_distribution(md.num_entities(dim), colors);
    (distribution[color]..distribution[color + 1]).collect()
}

/// Build the distributed CRS dual graph for `color` of `colors`.
///
/// Graph vertices are the entities of `from_dim`; two entities are adjacent
/// when they share strictly more than `thru_dim` vertices (0 = shared
/// vertex, 1 = shared edge, 2 = shared face). Only the rows for `color`'s
/// naive range are assembled; no communication occurs. Per-row neighbor
/// lists are ascending by global id.
pub fn make_dcrs<M>(
    md: &M,
    from_dim: usize,
    to_dim: usize,
    thru_dim: usize,
    colors: usize,
    color: usize,
) -> Dcrs
where
    M: MeshDefinition,
{
    let total = md.num_entities(from_dim);
    let distribution = naive_distribution(total, colors);
    debug!(
        "make_dcrs: {total} entities over {colors} colors, quot {} rem {}",
        total / colors,
        total % colors
    );

    let mut graph = Crs::default();
    graph.offsets.push(0);

    if from_dim == to_dim {
        // Dual graph: count shared vertices via an incrementally built
        // vertex-to-entity map, then keep pairs above the threshold.
        let neighbors = shared_vertex_adjacency(md, from_dim, thru_dim);
        for id in distribution[color]..distribution[color + 1] {
            graph.push_row(neighbors[id].iter().copied());
        }
    } else {
        for id in distribution[color]..distribution[color + 1] {
            let row = closure::entity_neighbors(md, from_dim, to_dim, thru_dim, id);
            graph.push_row(row);
        }
    }

    Dcrs {
        graph,
        distribution,
    }
}

/// Global entity-to-entity adjacency of `dim` through shared vertices.
///
/// Both directions of each edge are recorded, so row `i` holds every
/// neighbor regardless of discovery order.
fn shared_vertex_adjacency<M>(md: &M, dim: usize, thru_dim: usize) -> Vec<BTreeSet<usize>>
where
    M: MeshDefinition,
{
    let total = md.num_entities(dim);
    let mut vertex_to_entities: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut neighbors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); total];

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
                neighbors[entity].insert(other);
                neighbors[other].insert(entity);
            }
        }
    }

    neighbors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::CartesianDefinition;

    #[test]
    fn distribution_pushes_remainder_to_high_colors() {
        // 64 entities over 5 colors: quot 12, rem 4; colors 1..=4 get 13.
        assert_eq!(naive_distribution(64, 5), vec![0, 12, 25, 38, 51, 64]);
    }

    #[test]
    fn distribution_exact_division() {
        assert_eq!(naive_distribution(64, 4), vec![0, 16, 32, 48, 64]);
        assert_eq!(naive_distribution(3, 1), vec![0, 3]);
    }

    #[test]
    fn naive_coloring_is_contiguous() {
        let md = CartesianDefinition::new(8, 8);
        let c0 = naive_coloring(&md, 2, 5, 0);
        let c4 = naive_coloring(&md, 2, 5, 4);
        assert_eq!(c0, (0..12).collect());
        assert_eq!(c4, (51..64).collect());
    }

    #[test]
    fn dcrs_rank_zero_fixture() {
        // 8x8 grid, 5 colors, edge adjacency: the canonical fixture.
        let md = CartesianDefinition::new(8, 8);
        let dcrs = make_dcrs(&md, 2, 2, 1, 5, 0);
        assert_eq!(dcrs.distribution, vec![0, 12, 25, 38, 51, 64]);
        assert_eq!(
            dcrs.graph.offsets,
            vec![0, 2, 5, 8, 11, 14, 17, 20, 22, 25, 29, 33, 37]
        );
        // Spot-check rows: corner cell 0, edge cell 1, interior cell 9.
        assert_eq!(dcrs.graph.row(0), &[1, 8]);
        assert_eq!(dcrs.graph.row(1), &[0, 2, 9]);
        assert_eq!(dcrs.graph.row(9), &[1, 8, 10, 17]);
    }

    #[test]
    fn dcrs_vertex_adjacency_widens_rows() {
        // Through shared vertices (thru 0) the interior stencil grows to 8.
        let md = CartesianDefinition::new(8, 8);
        let dcrs = make_dcrs(&md, 2, 2, 0, 5, 1);
        // Local row 0 is global cell 12 at grid (1, 4): full 8-neighborhood.
        assert_eq!(dcrs.graph.row(0), &[3, 4, 5, 11, 13, 19, 20, 21]);
    }

    #[test]
    fn dcrs_rows_cover_all_colors() {
        let md = CartesianDefinition::new(8, 8);
        let mut seen = 0;
        for color in 0..5 {
            let dcrs = make_dcrs(&md, 2, 2, 1, 5, color);
            assert_eq!(dcrs.len(), dcrs.range_of(color).len());
            seen += dcrs.len();
        }
        assert_eq!(seen, 64);
    }
}
