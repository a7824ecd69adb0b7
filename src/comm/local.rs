//! In-process collective backend: one thread per color, rendezvous
//! collectives.
//!
//! [`LocalCluster`] simulates `n` colors inside a single process so the
//! full distributed pipeline runs in unit tests. Every collective reduces
//! to one rendezvous round: each color deposits its contribution, blocks
//! until all colors have deposited, then reads the full table. A color that
//! never calls blocks the cluster forever, the same deadlock semantics as
//! a real transport, intentionally without timeout.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use super::Collectives;

/// Shared state for a fixed-size group of in-process colors.
pub struct LocalCluster {
    state: Arc<ClusterState>,
}

struct ClusterState {
    size: usize,
    round: Mutex<Round>,
    progress: Condvar,
}

struct Round {
    deposits: Vec<Option<Vec<u64>>>,
    collected: usize,
    collecting: bool,
}

impl LocalCluster {
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "cluster needs at least one color");
        Self {
            state: Arc::new(ClusterState {
                size,
                round: Mutex::new(Round {
                    deposits: vec![None; size],
                    collected: 0,
                    collecting: false,
                }),
                progress: Condvar::new(),
            }),
        }
    }

    pub fn size(&self) -> usize {
        self.state.size
    }

    /// Handle for one color. Each rank must be driven from its own thread.
    pub fn comm(&self, rank: usize) -> LocalComm {
        assert!(rank < self.state.size, "rank out of range");
        LocalComm {
            rank,
            state: Arc::clone(&self.state),
        }
    }

    /// Run `f` once per color on its own thread and collect the results in
    /// rank order. Panics in any rank propagate.
    pub fn run<F, T>(size: usize, f: F) -> Vec<T>
    where
        F: Fn(LocalComm) -> T + Send + Sync,
        T: Send,
    {
        let cluster = LocalCluster::new(size);
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..size)
                .map(|rank| {
                    let comm = cluster.comm(rank);
                    let f = &f;
                    scope.spawn(move || f(comm))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("rank thread panicked"))
                .collect()
        })
    }
}

/// One color's endpoint into a [`LocalCluster`].
pub struct LocalComm {
    rank: usize,
    state: Arc<ClusterState>,
}

impl LocalComm {
    /// One rendezvous: deposit `payload`, wait for all colors, return every
    /// color's payload in rank order.
    fn exchange(&self, payload: Vec<u64>) -> Vec<Vec<u64>> {
        let state = &*self.state;
        let mut round = state.round.lock();

        // A previous round may still be draining its readers.
        while round.collecting {
            state.progress.wait(&mut round);
        }

        assert!(
            round.deposits[self.rank].is_none(),
            "rank {} deposited twice in one round",
            self.rank
        );
        round.deposits[self.rank] = Some(payload);

        if round.deposits.iter().all(Option::is_some) {
            round.collecting = true;
            state.progress.notify_all();
        } else {
            while !round.collecting {
                state.progress.wait(&mut round);
            }
        }

        let table: Vec<Vec<u64>> = round
            .deposits
            .iter()
            .map(|slot| slot.clone().expect("all deposits present"))
            .collect();

        round.collected += 1;
        if round.collected == state.size {
            round.deposits = vec![None; state.size];
            round.collected = 0;
            round.collecting = false;
            state.progress.notify_all();
        }
        table
    }
}

impl Collectives for LocalComm {
    fn size(&self) -> usize {
        self.state.size
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn all_reduce_max(&self, value: usize) -> usize {
        self.exchange(vec![value as u64])
            .into_iter()
            .map(|row| row[0] as usize)
            .max()
            .unwrap_or(0)
    }

    fn all_to_all(&self, send: &[u64], stride: usize) -> Vec<u64> {
        assert_eq!(send.len(), self.size() * stride, "send buffer shape");
        let table = self.exchange(send.to_vec());
        let mut recv = Vec::with_capacity(send.len());
        for row in &table {
            recv.extend_from_slice(&row[self.rank * stride..(self.rank + 1) * stride]);
        }
        recv
    }

    fn all_to_all_v(&self, send: &[Vec<u64>]) -> Vec<Vec<u64>> {
        let size = self.size();
        assert_eq!(send.len(), size, "one payload per color");

        // Header of per-destination counts, then the concatenated payloads.
        let mut flat = Vec::with_capacity(size + send.iter().map(Vec::len).sum::<usize>());
        flat.extend(send.iter().map(|v| v.len() as u64));
        for v in send {
            flat.extend_from_slice(v);
        }

        let table = self.exchange(flat);
        let mut recv = Vec::with_capacity(size);
        for row in &table {
            let counts = &row[..size];
            let skip: usize = counts[..self.rank].iter().map(|&n| n as usize).sum();
            let mine = counts[self.rank] as usize;
            let start = size + skip;
            recv.push(row[start..start + mine].to_vec());
        }
        recv
    }

    fn all_gather(&self, send: &[u64]) -> Vec<u64> {
        let table = self.exchange(send.to_vec());
        let mut recv = Vec::with_capacity(send.len() * self.size());
        for row in table {
            recv.extend(row);
        }
        recv
    }

    fn all_gather_v(&self, send: &[u64]) -> Vec<Vec<u64>> {
        self.exchange(send.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduce_max_across_ranks() {
        let maxes = LocalCluster::run(3, |comm| comm.all_reduce_max(comm.rank() * 10));
        assert_eq!(maxes, vec![20, 20, 20]);
    }

    #[test]
    fn all_to_all_transposes() {
        // Rank r sends value 10*r + dest to dest.
        let rows = LocalCluster::run(3, |comm| {
            let send: Vec<u64> = (0..3).map(|dest| (comm.rank() * 10 + dest) as u64).collect();
            comm.all_to_all(&send, 1)
        });
        assert_eq!(rows[0], vec![0, 10, 20]);
        assert_eq!(rows[1], vec![1, 11, 21]);
        assert_eq!(rows[2], vec![2, 12, 22]);
    }

    #[test]
    fn all_to_all_v_varies_lengths() {
        // Rank r sends r copies of its rank to each destination.
        let rows = LocalCluster::run(3, |comm| {
            let send: Vec<Vec<u64>> = (0..3)
                .map(|_| vec![comm.rank() as u64; comm.rank()])
                .collect();
            comm.all_to_all_v(&send)
        });
        for row in &rows {
            assert_eq!(row[0], Vec::<u64>::new());
            assert_eq!(row[1], vec![1]);
            assert_eq!(row[2], vec![2, 2]);
        }
    }

    #[test]
    fn all_gather_concatenates_in_rank_order() {
        let rows = LocalCluster::run(4, |comm| comm.all_gather(&[comm.rank() as u64]));
        for row in rows {
            assert_eq!(row, vec![0, 1, 2, 3]);
        }
    }

    #[test]
    fn all_gather_v_keeps_rank_lengths() {
        let rows = LocalCluster::run(3, |comm| {
            let send: Vec<u64> = vec![comm.rank() as u64; comm.rank() + 1];
            comm.all_gather_v(&send)
        });
        for row in rows {
            assert_eq!(row, vec![vec![0], vec![1, 1], vec![2, 2, 2]]);
        }
    }

    #[test]
    fn consecutive_rounds_do_not_bleed() {
        let sums = LocalCluster::run(2, |comm| {
            let first = comm.all_reduce_max(comm.rank());
            let second = comm.all_reduce_max(10 - comm.rank());
            (first, second)
        });
        assert_eq!(sums, vec![(1, 10), (1, 10)]);
    }
}
