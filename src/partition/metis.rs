//! METIS k-way partitioner backend (feature `metis-support`).
//!
//! Each color gathers the full dual graph from the dCRS rows of every
//! color, so all colors run `METIS_PartGraphKway` on the identical
//! replicated input and compute the identical assignment. The local rows'
//! targets then flow through the standard ownership exchange. Coloring is a
//! one-shot setup phase, so the replicated-graph cost is accepted; a
//! distributed backend only has to reimplement [`Partitioner::assign`].

use log::debug;
use metis_sys::{idx_t, real_t};

use crate::comm::{Collectives, Communicator};
use crate::error::MeshColoringError;
use crate::graph::Dcrs;

use super::Partitioner;

/// Balanced k-way graph partitioning via METIS.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetisPartitioner;

impl Partitioner for MetisPartitioner {
    fn assign<C>(&self, dcrs: &Dcrs, comm: &C) -> Result<Vec<usize>, MeshColoringError>
    where
        C: Communicator,
    {
        let colors = comm.size();
        let color = comm.rank();
        if colors == 1 {
            return Ok(vec![0; dcrs.len()]);
        }

        let (mut xadj, mut adjncy) = replicate_graph(dcrs, comm);
        let mut nvtxs = dcrs.global_len() as idx_t;
        let mut ncon: idx_t = 1;
        let mut nparts = colors as idx_t;

        // Balanced target weights: 1/P everywhere, with the last color
        // absorbing the floating-point slack so the weights sum to exactly
        // one.
        let mut tpwgts = vec![0.0 as real_t; colors];
        let mut sum: real_t = 0.0;
        for (i, w) in tpwgts.iter_mut().enumerate() {
            if i == colors - 1 {
                *w = 1.0 - sum;
            } else {
                *w = 1.0 / colors as real_t;
                sum += *w;
            }
        }
        let mut ubvec: real_t = 1.05;

        let mut edgecut: idx_t = 0;
        let mut part = vec![0 as idx_t; dcrs.global_len()];

        let status = unsafe {
            metis_sys::METIS_PartGraphKway(
                &mut nvtxs,
                &mut ncon,
                xadj.as_mut_ptr(),
                adjncy.as_mut_ptr(),
                std::ptr::null_mut(), // vwgt
                std::ptr::null_mut(), // vsize
                std::ptr::null_mut(), // adjwgt
                &mut nparts,
                tpwgts.as_mut_ptr(),
                &mut ubvec,
                std::ptr::null_mut(), // options: defaults
                &mut edgecut,
                part.as_mut_ptr(),
            )
        };
        if status != metis_sys::rstatus_et_METIS_OK {
            return Err(MeshColoringError::PartitionerFailure(format!(
                "METIS_PartGraphKway returned {status}"
            )));
        }
        debug!("metis: {nvtxs} vertices into {nparts} parts, edgecut {edgecut}");

        Ok(dcrs
            .range_of(color)
            .map(|id| part[id] as usize)
            .collect())
    }
}

/// Gather every color's dCRS rows into the global CSR arrays, identically
/// on all colors. The payload is `[degrees..., indices...]`; row counts
/// come from the shared distribution, so no extra header is needed.
fn replicate_graph<C>(dcrs: &Dcrs, comm: &C) -> (Vec<idx_t>, Vec<idx_t>)
where
    C: Collectives,
{
    let mut payload: Vec<u64> =
        Vec::with_capacity(dcrs.len() + dcrs.graph.indices.len());
    payload.extend(dcrs.graph.rows().map(|row| row.len() as u64));
    payload.extend(dcrs.graph.indices.iter().map(|&n| n as u64));

    let gathered = comm.all_gather_v(&payload);

    let mut xadj: Vec<idx_t> = Vec::with_capacity(dcrs.global_len() + 1);
    let mut adjncy: Vec<idx_t> = Vec::new();
    xadj.push(0);
    for (r, rows) in gathered.iter().enumerate() {
        let local = dcrs.range_of(r).len();
        let (degrees, indices) = rows.split_at(local);
        debug_assert_eq!(
            degrees.iter().sum::<u64>() as usize,
            indices.len(),
            "inconsistent row payload from color {r}"
        );
        let mut at = 0usize;
        for &degree in degrees {
            let next = at + degree as usize;
            adjncy.extend(indices[at..next].iter().map(|&n| n as idx_t));
            xadj.push(adjncy.len() as idx_t);
            at = next;
        }
    }
    (xadj, adjncy)
}
