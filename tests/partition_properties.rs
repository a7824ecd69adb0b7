//! Property tests for the distribution rule, the closure algebra, and the
//! ownership exchange.

use std::collections::BTreeSet;

use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use mesh_coloring::closure::{entity_closure, neighborhood};
use mesh_coloring::comm::local::LocalCluster;
use mesh_coloring::comm::{Collectives, Communicator};
use mesh_coloring::error::MeshColoringError;
use mesh_coloring::graph::{Dcrs, make_dcrs, naive_distribution};
use mesh_coloring::mesh::{CartesianDefinition, MeshDefinition};
use mesh_coloring::partition::Partitioner;

proptest! {
    #[test]
    fn distribution_is_monotone_and_exact(total in 1usize..500, colors in 1usize..17) {
        let distribution = naive_distribution(total, colors);
        prop_assert_eq!(distribution.len(), colors + 1);
        prop_assert_eq!(distribution[0], 0);
        prop_assert_eq!(*distribution.last().unwrap(), total);

        let quot = total / colors;
        let rem = total % colors;
        for r in 0..colors {
            let share = distribution[r + 1] - distribution[r];
            // Remainder entities land on the highest-numbered colors only.
            let expected = quot + usize::from(r >= colors - rem);
            prop_assert_eq!(share, expected, "color {}", r);
        }
    }

    #[test]
    fn neighborhood_contains_seed_and_grows_monotonically(
        rows in 1usize..6,
        cols in 1usize..6,
        picks in proptest::collection::btree_set(0usize..25, 0..6),
    ) {
        let md = CartesianDefinition::new(rows, cols);
        let cells = md.num_entities(2);
        let seed: BTreeSet<usize> = picks.into_iter().filter(|&c| c < cells).collect();

        let ring = neighborhood(&md, 2, 0, &seed);
        prop_assert!(ring.is_superset(&seed));

        // A larger seed never yields a smaller closure.
        let ring2 = neighborhood(&md, 2, 0, &ring);
        prop_assert!(ring2.is_superset(&ring));
    }

    #[test]
    fn vertex_closure_of_all_cells_is_all_vertices(rows in 1usize..6, cols in 1usize..6) {
        let md = CartesianDefinition::new(rows, cols);
        let all_cells = 0..md.num_entities(2);
        let verts = entity_closure(&md, 2, 0, all_cells);
        prop_assert_eq!(verts, (0..md.num_entities(0)).collect::<BTreeSet<_>>());
    }

    #[test]
    fn dcrs_rows_join_up_across_colors(colors in 1usize..7) {
        let md = CartesianDefinition::new(6, 6);
        let mut degrees = Vec::new();
        for color in 0..colors {
            let dcrs = make_dcrs(&md, 2, 2, 1, colors, color);
            prop_assert_eq!(dcrs.len(), dcrs.range_of(color).len());
            degrees.extend(dcrs.graph.rows().map(|row| row.len()));
        }
        // Edge adjacency on a grid: total degree is twice the interior
        // edge count, independent of how rows are split across colors.
        prop_assert_eq!(degrees.iter().sum::<usize>(), 2 * (5 * 6 + 6 * 5));
    }
}

/// Assigns each local row the color drawn from a seeded generator; every
/// color derives the identical global assignment, as a real optimizer
/// would.
struct ScrambledPartitioner {
    seed: u64,
}

impl Partitioner for ScrambledPartitioner {
    fn assign<C>(&self, dcrs: &Dcrs, comm: &C) -> Result<Vec<usize>, MeshColoringError>
    where
        C: Communicator,
    {
        let colors = comm.size();
        let mut rng = SmallRng::seed_from_u64(self.seed);
        let global: Vec<usize> = (0..dcrs.global_len())
            .map(|_| rng.gen_range(0..colors))
            .collect();
        Ok(dcrs.range_of(comm.rank()).map(|id| global[id]).collect())
    }
}

#[test]
fn ownership_exchange_partitions_the_id_space() {
    let md = CartesianDefinition::new(6, 6);
    for seed in 0..8u64 {
        let primaries = LocalCluster::run(3, |comm| {
            let dcrs = make_dcrs(&md, 2, 2, 1, comm.size(), comm.rank());
            ScrambledPartitioner { seed }.partition(&dcrs, &comm)
        });

        let mut union = BTreeSet::new();
        let mut count = 0;
        for primary in primaries {
            // A scrambled assignment may starve a color entirely; that is
            // the documented failure, not a protocol violation.
            match primary {
                Ok(owned) => {
                    count += owned.len();
                    union.extend(owned);
                }
                Err(MeshColoringError::EmptyColoring { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(union, (0..36).collect::<BTreeSet<_>>());
        assert_eq!(count, 36, "seed {seed}: ids assigned twice");
    }
}
