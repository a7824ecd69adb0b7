//! MPI collective backend (feature `mpi-support`).
//!
//! Thin [`Collectives`] adapter over an rsmpi communicator. The
//! variable-length exchange sends per-destination counts with a fixed
//! all-to-all, then moves the payloads with a single varcount all-to-all
//! over partitioned buffers: the counts-first protocol, without
//! hand-managed request objects.

use mpi::collective::SystemOperation;
use mpi::datatype::{Partition, PartitionMut};
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

use super::Collectives;

/// [`Collectives`] over an MPI communicator.
pub struct MpiComm {
    comm: SimpleCommunicator,
}

impl MpiComm {
    /// Wrap an already-initialized communicator, e.g. `universe.world()`.
    pub fn new(comm: SimpleCommunicator) -> Self {
        Self { comm }
    }

    pub fn communicator(&self) -> &SimpleCommunicator {
        &self.comm
    }
}

impl Collectives for MpiComm {
    fn size(&self) -> usize {
        self.comm.size() as usize
    }

    fn rank(&self) -> usize {
        self.comm.rank() as usize
    }

    fn all_reduce_max(&self, value: usize) -> usize {
        let mut max = 0u64;
        self.comm
            .all_reduce_into(&(value as u64), &mut max, SystemOperation::max());
        max as usize
    }

    fn all_to_all(&self, send: &[u64], stride: usize) -> Vec<u64> {
        assert_eq!(send.len(), self.size() * stride, "send buffer shape");
        let mut recv = vec![0u64; send.len()];
        self.comm.all_to_all_into(send, &mut recv[..]);
        recv
    }

    fn all_to_all_v(&self, send: &[Vec<u64>]) -> Vec<Vec<u64>> {
        let size = self.size();
        assert_eq!(send.len(), size, "one payload per color");

        let send_counts: Vec<i32> = send.iter().map(|v| v.len() as i32).collect();
        let mut recv_counts = vec![0i32; size];
        self.comm.all_to_all_into(&send_counts, &mut recv_counts[..]);

        let displacements = |counts: &[i32]| -> Vec<i32> {
            counts
                .iter()
                .scan(0i32, |acc, &n| {
                    let at = *acc;
                    *acc += n;
                    Some(at)
                })
                .collect()
        };

        let flat_send: Vec<u64> = send.iter().flatten().copied().collect();
        let send_displs = displacements(&send_counts);
        let recv_displs = displacements(&recv_counts);
        let total_recv: i32 = recv_counts.iter().sum();
        let mut flat_recv = vec![0u64; total_recv as usize];

        let outgoing = Partition::new(&flat_send[..], &send_counts[..], &send_displs[..]);
        let mut incoming =
            PartitionMut::new(&mut flat_recv[..], &recv_counts[..], &recv_displs[..]);
        self.comm.all_to_all_varcount_into(&outgoing, &mut incoming);

        recv_counts
            .iter()
            .zip(&recv_displs)
            .map(|(&n, &at)| flat_recv[at as usize..(at + n) as usize].to_vec())
            .collect()
    }

    fn all_gather(&self, send: &[u64]) -> Vec<u64> {
        let mut recv = vec![0u64; send.len() * self.size()];
        self.comm.all_gather_into(send, &mut recv[..]);
        recv
    }

    fn all_gather_v(&self, send: &[u64]) -> Vec<Vec<u64>> {
        let size = self.size();
        let mut counts = vec![0i32; size];
        self.comm
            .all_gather_into(&(send.len() as i32), &mut counts[..]);

        let displs: Vec<i32> = counts
            .iter()
            .scan(0i32, |acc, &n| {
                let at = *acc;
                *acc += n;
                Some(at)
            })
            .collect();
        let total: i32 = counts.iter().sum();
        let mut flat = vec![0u64; total as usize];
        let mut incoming = PartitionMut::new(&mut flat[..], &counts[..], &displs[..]);
        self.comm.all_gather_varcount_into(send, &mut incoming);

        counts
            .iter()
            .zip(&displs)
            .map(|(&n, &at)| flat[at as usize..(at + n) as usize].to_vec())
            .collect()
    }
}
