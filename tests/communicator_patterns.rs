//! Multi-rank exercises of the four exchange protocols over the in-process
//! backend.

use std::collections::BTreeSet;

use mesh_coloring::coloring::{ColoringInfo, EntityInfo};
use mesh_coloring::comm::local::LocalCluster;
use mesh_coloring::comm::{Collectives, Communicator};

fn set(ids: &[usize]) -> BTreeSet<usize> {
    ids.iter().copied().collect()
}

#[test]
fn primary_info_resolves_ownership_and_offsets() {
    // Rank 0 owns {0,1,2}, rank 1 owns {3,4,5}. Each requests one entity
    // of the other.
    let results = LocalCluster::run(2, |comm| {
        let (primary, request) = match comm.rank() {
            0 => (set(&[0, 1, 2]), set(&[4])),
            _ => (set(&[3, 4, 5]), set(&[2])),
        };
        comm.get_primary_info(&primary, &request).unwrap()
    });

    let (local0, remote0) = &results[0];
    // Rank 1 requested id 2, the third entry of rank 0's primary list.
    assert_eq!(local0[0], set(&[]));
    assert_eq!(local0[1], set(&[]));
    assert_eq!(local0[2], set(&[1]));
    // Rank 0's request for id 4 resolved to rank 1, offset 1.
    let ghost: Vec<_> = remote0.iter().collect();
    assert_eq!(ghost.len(), 1);
    assert_eq!((ghost[0].id, ghost[0].rank, ghost[0].offset), (4, 1, 1));

    let (local1, remote1) = &results[1];
    assert_eq!(local1[1], set(&[0]));
    let ghost: Vec<_> = remote1.iter().collect();
    assert_eq!((ghost[0].id, ghost[0].rank, ghost[0].offset), (2, 0, 2));
}

#[test]
fn primary_info_unowned_request_goes_unanswered() {
    // Id 99 lives in nobody's primary set: the requester simply gets no
    // remote entry for it.
    let results = LocalCluster::run(2, |comm| {
        let (primary, request) = match comm.rank() {
            0 => (set(&[0]), set(&[99])),
            _ => (set(&[1]), set(&[])),
        };
        comm.get_primary_info(&primary, &request).unwrap()
    });
    assert!(results[0].1.is_empty());
}

#[test]
fn primary_info_requests_of_unequal_width_pad_cleanly() {
    // Widths differ per rank; the padded round must not invent answers.
    let results = LocalCluster::run(3, |comm| {
        let primary = set(&[comm.rank() * 10, comm.rank() * 10 + 1]);
        let request = match comm.rank() {
            0 => set(&[10, 11, 20, 21]),
            1 => set(&[0]),
            _ => set(&[]),
        };
        comm.get_primary_info(&primary, &request).unwrap()
    });

    let remote0: Vec<_> = results[0].1.iter().map(|e| (e.id, e.rank, e.offset)).collect();
    assert_eq!(remote0, vec![(10, 1, 0), (11, 1, 1), (20, 2, 0), (21, 2, 1)]);
    let remote1: Vec<_> = results[1].1.iter().map(|e| (e.id, e.rank, e.offset)).collect();
    assert_eq!(remote1, vec![(0, 0, 0)]);
    assert!(results[2].1.is_empty());
}

#[test]
fn intersection_info_finds_overlapping_halos() {
    // Ranks 0 and 2 both want {5,6}; rank 1 wants something disjoint.
    let results = LocalCluster::run(3, |comm| {
        let request = match comm.rank() {
            0 => set(&[5, 6, 7]),
            1 => set(&[40]),
            _ => set(&[5, 6]),
        };
        comm.get_intersection_info(&request).unwrap()
    });

    assert_eq!(results[0].len(), 1);
    assert_eq!(results[0][&2], set(&[5, 6]));
    assert!(results[1].is_empty());
    assert_eq!(results[2][&0], set(&[5, 6]));
}

#[test]
fn entity_reduction_reports_every_color() {
    let results = LocalCluster::run(3, |comm| {
        let local = set(&[comm.rank(), 100 + comm.rank()]);
        comm.get_entity_reduction(&local).unwrap()
    });
    for reduction in &results {
        assert_eq!(reduction.len(), 3);
        for c in 0..3 {
            assert_eq!(reduction[&c], set(&[c, 100 + c]));
        }
    }
}

#[test]
fn entity_info_answers_offsets_in_request_order() {
    // Rank 0 owns vertices {7 -> offset 0, 9 -> offset 1}; rank 1 asks for
    // both. Rank 1 owns {20 -> 0}; rank 0 asks for it.
    let results = LocalCluster::run(2, |comm| {
        let mut owned = BTreeSet::new();
        let mut requests = vec![BTreeSet::new(); comm.size()];
        match comm.rank() {
            0 => {
                owned.insert(EntityInfo::unshared(7, 0, 0));
                owned.insert(EntityInfo::unshared(9, 0, 1));
                requests[1].insert(20);
            }
            _ => {
                owned.insert(EntityInfo::unshared(20, 1, 0));
                requests[0].insert(7);
                requests[0].insert(9);
            }
        }
        comm.get_entity_info(&owned, &requests).unwrap()
    });

    assert_eq!(results[0][1], vec![0]);
    assert_eq!(results[1][0], vec![0, 1]);
}

#[test]
fn gather_sizes_is_indexed_by_color() {
    let results = LocalCluster::run(4, |comm| comm.gather_sizes(comm.rank() * 3));
    for sizes in results {
        assert_eq!(sizes, vec![0, 3, 6, 9]);
    }
}

#[test]
fn coloring_info_gather_is_globally_consistent() {
    let results = LocalCluster::run(3, |comm| {
        let info = ColoringInfo {
            exclusive: 10 + comm.rank(),
            shared: comm.rank(),
            ghost: 2,
            shared_users: set(&[(comm.rank() + 1) % 3]),
            ghost_owners: set(&[(comm.rank() + 2) % 3]),
        };
        comm.gather_coloring_info(&info).unwrap()
    });

    // Every rank observes the identical aggregate map.
    for map in &results {
        assert_eq!(map.len(), 3);
        for c in 0..3 {
            assert_eq!(map[&c].exclusive, 10 + c);
            assert_eq!(map[&c].shared, c);
            assert_eq!(map[&c].ghost, 2);
            assert_eq!(map[&c].shared_users, set(&[(c + 1) % 3]));
            assert_eq!(map[&c].ghost_owners, set(&[(c + 2) % 3]));
        }
    }
}
