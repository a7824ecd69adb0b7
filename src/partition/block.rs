//! Contiguous block partitioner.

use crate::comm::Communicator;
use crate::error::MeshColoringError;
use crate::graph::Dcrs;

use super::Partitioner;

/// Keeps the naive contiguous pre-partition: every local row stays on its
/// pre-assigned color.
///
/// Always available, fully deterministic, and ignores the graph structure
/// entirely. It is the baseline backend for tests and for meshes whose id order
/// already tracks locality.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockPartitioner;

impl Partitioner for BlockPartitioner {
    fn assign<C>(&self, dcrs: &Dcrs, comm: &C) -> Result<Vec<usize>, MeshColoringError>
    where
        C: Communicator,
    {
        Ok(vec![comm.rank(); dcrs.len()])
    }
}
