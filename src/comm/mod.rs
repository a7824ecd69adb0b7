//! Collective-communication abstraction and the coloring exchange
//! protocols.
//!
//! The transport seam is [`Collectives`]: size/rank plus a handful of
//! collective primitives. Everything protocol-shaped lives in [`Communicator`] as
//! provided methods, implemented once over any transport: the in-process
//! [`LocalCluster`](local::LocalCluster) backend or the MPI backend behind
//! the `mpi-support` feature.
//!
//! Every operation is a blocking, synchronous collective: a call returns
//! only after every color has reached the matching call. A color that skips
//! or reorders a collective deadlocks the job (or corrupts the exchange);
//! that is prevented by construction (each provided method executes an
//! identical primitive sequence on every color), not detected at runtime.
//!
//! The padded request pattern broadcasts each color's request set in a
//! fixed-stride `P x width` buffer, padding unused slots with the reserved
//! [`ABSENT`] sentinel so a single regular all-to-all suffices. The
//! sentinel never collides with a real id: mesh sizes nowhere near
//! `u64::MAX` are a standing assumption.

pub mod local;
#[cfg(feature = "mpi-support")]
pub mod mpi;

use std::collections::{BTreeSet, HashMap};

use bytemuck::{Pod, Zeroable};
use log::trace;

use crate::coloring::types::{ColoringInfo, EntityInfo};
use crate::error::MeshColoringError;

/// Reserved wire value meaning "no id / no answer in this slot".
pub const ABSENT: u64 = u64::MAX;

/// Encode an id for the wire.
#[inline]
pub fn encode_id(id: usize) -> u64 {
    debug_assert!((id as u64) != ABSENT, "id collides with the absent sentinel");
    id as u64
}

/// Decode a wire slot; `None` for the absent sentinel.
#[inline]
pub fn decode_id(slot: u64) -> Option<usize> {
    (slot != ABSENT).then_some(slot as usize)
}

/// Fixed wire record for the aggregate-counts all-gather.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireColorCounts {
    pub exclusive: u64,
    pub shared: u64,
    pub ghost: u64,
}

static_assertions::const_assert_eq!(std::mem::size_of::<WireColorCounts>(), 24);

impl WireColorCounts {
    pub const LANES: usize = 3;

    fn of(info: &ColoringInfo) -> Self {
        Self {
            exclusive: info.exclusive as u64,
            shared: info.shared as u64,
            ghost: info.ghost as u64,
        }
    }

    fn lanes(&self) -> [u64; Self::LANES] {
        bytemuck::cast(*self)
    }

    fn from_lanes(lanes: [u64; Self::LANES]) -> Self {
        bytemuck::cast(lanes)
    }
}

/// Minimal collective transport: the only thing a backend implements.
///
/// Backend failures (a transport that cannot complete a collective) abort
/// the job; there is no soft-failure path at this level.
pub trait Collectives {
    /// Number of participating colors.
    fn size(&self) -> usize;

    /// This process's color.
    fn rank(&self) -> usize;

    /// Global maximum of a per-color value.
    fn all_reduce_max(&self, value: usize) -> usize;

    /// Fixed-stride all-to-all: `send` holds `size() * stride` items,
    /// `stride` of them destined to each color in order. Returns the
    /// same-shaped buffer of received rows, laid out by source color.
    fn all_to_all(&self, send: &[u64], stride: usize) -> Vec<u64>;

    /// Variable-length all-to-all: `send[r]` goes to color `r`; the result
    /// holds what each color sent here. Counts are exchanged first so the
    /// payload round uses exact-sized buffers.
    fn all_to_all_v(&self, send: &[Vec<u64>]) -> Vec<Vec<u64>>;

    /// Concatenation of every color's `send`, which must have the same
    /// length on every color.
    fn all_gather(&self, send: &[u64]) -> Vec<u64>;

    /// Every color's `send`, lengths free to differ, indexed by color.
    fn all_gather_v(&self, send: &[u64]) -> Vec<Vec<u64>>;
}

/// The coloring exchange protocols, provided over any [`Collectives`].
pub trait Communicator: Collectives {
    /// Global maximum request-set size, used to pad fixed-stride rounds.
    fn max_request_size(&self, request_len: usize) -> usize {
        self.all_reduce_max(request_len)
    }

    /// Broadcast `request` to every color (padded to `width` with
    /// [`ABSENT`]) and return the incoming rows, laid out by source color.
    fn exchange_requests(&self, request: &BTreeSet<usize>, width: usize) -> Vec<u64> {
        let colors = self.size();
        let mut input = vec![ABSENT; colors * width];
        for c in 0..colors {
            let row = &mut input[c * width..(c + 1) * width];
            for (slot, &id) in row.iter_mut().zip(request.iter()) {
                *slot = encode_id(id);
            }
        }
        self.all_to_all(&input, width)
    }

    /// Resolve ownership and offsets for `request` against every color's
    /// `primary` set.
    ///
    /// Returns `(local, remote)`:
    /// - `local[offset]` is the set of colors that requested the primary
    ///   entity at `offset`; non-empty means that entity is shared,
    /// - `remote` holds one [`EntityInfo`] per request id some other color
    ///   owns, carrying the owner and the id's offset in the owner's
    ///   primary list.
    ///
    /// Primary sets partition the id space, so at most one color answers
    /// any slot and ownership is never ambiguous.
    fn get_primary_info(
        &self,
        primary: &BTreeSet<usize>,
        request: &BTreeSet<usize>,
    ) -> Result<(Vec<BTreeSet<usize>>, BTreeSet<EntityInfo>), MeshColoringError> {
        let colors = self.size();
        let color = self.rank();
        let request_vec: Vec<usize> = request.iter().copied().collect();

        let width = self.max_request_size(request.len());
        let info_indices = self.exchange_requests(request, width);

        let primary_offsets: hashbrown::HashMap<usize, usize> = primary
            .iter()
            .enumerate()
            .map(|(offset, &id)| (id, offset))
            .collect();

        // Answer phase: mark the slots we own with our color and the
        // entity's offset, leaving the sentinel everywhere else.
        let mut answer_ranks = vec![ABSENT; colors * width];
        let mut answer_offsets = vec![0u64; colors * width];
        let mut local: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); primary.len()];

        for r in 0..colors {
            if r == color {
                continue;
            }
            for i in 0..width {
                let Some(id) = decode_id(info_indices[r * width + i]) else {
                    continue;
                };
                if let Some(&offset) = primary_offsets.get(&id) {
                    answer_ranks[r * width + i] = color as u64;
                    answer_offsets[r * width + i] = offset as u64;
                    local[offset].insert(r);
                }
            }
        }

        // Ranks and offsets travel as two symmetric rounds rather than one
        // packed record; both rounds run on every color in the same order.
        let info_ranks = self.all_to_all(&answer_ranks, width);
        let info_offsets = self.all_to_all(&answer_offsets, width);

        let mut remote = BTreeSet::new();
        for r in 0..colors {
            if r == color {
                continue;
            }
            for i in 0..width {
                if let Some(owner) = decode_id(info_ranks[r * width + i]) {
                    remote.insert(EntityInfo::unshared(
                        request_vec[i],
                        owner,
                        info_offsets[r * width + i] as usize,
                    ));
                }
            }
        }

        trace!(
            "get_primary_info: {} requests, {} remote answers",
            request.len(),
            remote.len()
        );
        Ok((local, remote))
    }

    /// Pairwise non-empty intersections between this color's `request` set
    /// and every other color's, keyed by color.
    fn get_intersection_info(
        &self,
        request: &BTreeSet<usize>,
    ) -> Result<HashMap<usize, BTreeSet<usize>>, MeshColoringError> {
        let colors = self.size();
        let color = self.rank();

        let width = self.max_request_size(request.len());
        let info_indices = self.exchange_requests(request, width);

        let mut intersection_map = HashMap::new();
        for r in 0..colors {
            if r == color {
                continue;
            }
            let theirs: BTreeSet<usize> = info_indices[r * width..(r + 1) * width]
                .iter()
                .filter_map(|&slot| decode_id(slot))
                .collect();
            let intersection = &theirs & request;
            if !intersection.is_empty() {
                intersection_map.insert(r, intersection);
            }
        }
        Ok(intersection_map)
    }

    /// Every color's view of its `local` id set, keyed by color. Unlike
    /// [`get_intersection_info`](Self::get_intersection_info) this reports
    /// all colors, own color and empty sets included.
    fn get_entity_reduction(
        &self,
        local: &BTreeSet<usize>,
    ) -> Result<HashMap<usize, BTreeSet<usize>>, MeshColoringError> {
        let colors = self.size();
        let width = self.max_request_size(local.len());
        let info_indices = self.exchange_requests(local, width);

        let mut reduction = HashMap::new();
        for c in 0..colors {
            let ids: BTreeSet<usize> = info_indices[c * width..(c + 1) * width]
                .iter()
                .filter_map(|&slot| decode_id(slot))
                .collect();
            reduction.insert(c, ids);
        }
        Ok(reduction)
    }

    /// Resolve offsets for entities owned elsewhere.
    ///
    /// `requests[r]` names the ids whose offsets color `r` must supply;
    /// `entity_info` holds this color's own entries to answer foreign
    /// requests from. Returns the answered offsets per color, aligned with
    /// each request set's ascending order. Requesting an id from a color
    /// that does not own it violates partition completeness and is an
    /// error.
    fn get_entity_info(
        &self,
        entity_info: &BTreeSet<EntityInfo>,
        requests: &[BTreeSet<usize>],
    ) -> Result<Vec<Vec<usize>>, MeshColoringError> {
        let colors = self.size();
        let color = self.rank();
        assert_eq!(requests.len(), colors, "one request set per color");

        let send: Vec<Vec<u64>> = requests
            .iter()
            .map(|set| set.iter().map(|&id| encode_id(id)).collect())
            .collect();
        let incoming = self.all_to_all_v(&send);

        let offsets_by_id: hashbrown::HashMap<usize, usize> = entity_info
            .iter()
            .map(|info| (info.id, info.offset))
            .collect();

        let mut replies = Vec::with_capacity(colors);
        for asked in incoming.iter() {
            let mut reply = Vec::with_capacity(asked.len());
            for &slot in asked {
                debug_assert_ne!(slot, ABSENT, "pattern C carries no padding");
                let id = slot as usize;
                let offset =
                    offsets_by_id
                        .get(&id)
                        .copied()
                        .ok_or(MeshColoringError::MissingOwner { id, color })?;
                reply.push(offset as u64);
            }
            replies.push(reply);
        }

        let answers = self.all_to_all_v(&replies);
        let mut resolved = Vec::with_capacity(colors);
        for (r, answer) in answers.into_iter().enumerate() {
            if answer.len() != requests[r].len() {
                return Err(MeshColoringError::ExchangeMismatch {
                    color: r,
                    expected: requests[r].len(),
                    got: answer.len(),
                });
            }
            resolved.push(answer.into_iter().map(|o| o as usize).collect());
        }
        Ok(resolved)
    }

    /// Every color's value of a per-color size, indexed by color.
    fn gather_sizes(&self, size: usize) -> Vec<usize> {
        self.all_gather(&[size as u64])
            .into_iter()
            .map(|n| n as usize)
            .collect()
    }

    /// All-gather every color's aggregate counts, then exchange the
    /// `shared_users`/`ghost_owners` color sets so each color holds the
    /// identical global map.
    fn gather_coloring_info(
        &self,
        info: &ColoringInfo,
    ) -> Result<HashMap<usize, ColoringInfo>, MeshColoringError> {
        let counts = self.all_gather(&WireColorCounts::of(info).lanes());

        let mut coloring_info: HashMap<usize, ColoringInfo> = HashMap::new();
        for (c, lanes) in counts.chunks_exact(WireColorCounts::LANES).enumerate() {
            let record = WireColorCounts::from_lanes([lanes[0], lanes[1], lanes[2]]);
            coloring_info.insert(
                c,
                ColoringInfo {
                    exclusive: record.exclusive as usize,
                    shared: record.shared as usize,
                    ghost: record.ghost as usize,
                    ..ColoringInfo::default()
                },
            );
        }

        for (c, users) in self.get_entity_reduction(&info.shared_users)? {
            coloring_info.entry(c).or_default().shared_users = users;
        }
        for (c, owners) in self.get_entity_reduction(&info.ghost_owners)? {
            coloring_info.entry(c).or_default().ghost_owners = owners;
        }
        Ok(coloring_info)
    }
}

impl<T: Collectives> Communicator for T {}
