//! Graph partitioning backends and the primary-ownership exchange.
//!
//! A backend implements [`Partitioner::assign`]: given the local rows of a
//! dCRS graph it chooses a target color for each. The provided
//! [`Partitioner::partition`] then runs the ownership exchange: ids whose
//! target is another color are sent there, ids targeted here (locally or by
//! any other color) are unioned into the primary set. After the exchange
//! every global id belongs to exactly one color's primary set; that
//! exactness is the contract the rest of the engine builds on, regardless
//! of backend.

pub mod block;
#[cfg(feature = "metis-support")]
pub mod metis;

pub use block::BlockPartitioner;
#[cfg(feature = "metis-support")]
pub use metis::MetisPartitioner;

use std::collections::BTreeSet;

use log::debug;

use crate::comm::{Communicator, encode_id};
use crate::error::MeshColoringError;
use crate::graph::Dcrs;

/// A k-way graph partitioning backend.
pub trait Partitioner {
    /// Choose a target color in `0..comm.size()` for each local row of
    /// `dcrs`. Backend failure is fatal; there is no retry path.
    fn assign<C>(&self, dcrs: &Dcrs, comm: &C) -> Result<Vec<usize>, MeshColoringError>
    where
        C: Communicator;

    /// Run [`assign`](Self::assign) and exchange ownership so the caller
    /// ends up with the global ids it owns.
    ///
    /// An empty result is an error: every color must own at least one
    /// entity for the coloring to proceed.
    fn partition<C>(&self, dcrs: &Dcrs, comm: &C) -> Result<BTreeSet<usize>, MeshColoringError>
    where
        C: Communicator,
    {
        let colors = comm.size();
        let color = comm.rank();
        let part = self.assign(dcrs, comm)?;
        assert_eq!(part.len(), dcrs.len(), "one target per local row");

        let base = dcrs.distribution[color];
        let mut primary = BTreeSet::new();
        let mut outgoing: Vec<Vec<u64>> = vec![Vec::new(); colors];
        for (i, &target) in part.iter().enumerate() {
            let id = base + i;
            if target == color {
                primary.insert(id);
            } else {
                outgoing[target].push(encode_id(id));
            }
        }

        for row in comm.all_to_all_v(&outgoing) {
            primary.extend(row.into_iter().map(|slot| slot as usize));
        }

        if primary.is_empty() {
            return Err(MeshColoringError::EmptyColoring { color });
        }
        debug!(
            "partition: color {color} owns {} of {} entities",
            primary.len(),
            dcrs.global_len()
        );
        Ok(primary)
    }
}
