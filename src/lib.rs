//! # mesh-coloring
//!
//! mesh-coloring is a distributed mesh-partitioning and index-coloring
//! engine for unstructured-mesh parallel codes. Given a mesh definition and
//! a target number of colors (ranks), it computes a balanced partition of
//! the primary entities, grows the ghost-cell dependency closures, derives
//! consistent ownership for dependent entities such as vertices, and
//! classifies every entity instance as exclusive, shared, or ghost.
//!
//! ## Features
//! - Distributed CRS dual-graph construction with a deterministic naive
//!   pre-partition
//! - Pluggable partitioning backends (contiguous blocks, METIS) behind one
//!   trait
//! - Collective exchange protocols (padded all-to-all, variable-length
//!   offset exchange, aggregate gathers) implemented once over any
//!   transport
//! - In-process multi-rank backend for testing, MPI backend behind
//!   `mpi-support`
//!
//! ## Determinism
//!
//! Every tie-break is fixed: the naive remainder placement, the minimum-rank
//! ownership rule, sorted-set iteration. A coloring pass over
//! a given mesh and color count reproduces identical results on every run
//! and every color.
//!
//! ## Usage
//! Add `mesh-coloring` as a dependency in your `Cargo.toml` and enable
//! features as needed:
//!
//! ```toml
//! [dependencies]
//! mesh-coloring = "0.3"
//! # Optional features:
//! # features = ["mpi-support", "metis-support"]
//! ```

pub mod closure;
pub mod coloring;
pub mod comm;
pub mod error;
pub mod graph;
pub mod mesh;
pub mod partition;

pub use error::MeshColoringError;

/// A convenient prelude importing the most-used traits and types.
pub mod prelude {
    pub use crate::closure::{entity_closure, entity_neighbors, entity_referencers, neighborhood};
    pub use crate::coloring::{
        AdjacencyInfo, ColoringContext, ColoringEngine, ColoringInfo, ColoringSpaces, EntityInfo,
        IndexColoring,
    };
    pub use crate::comm::local::{LocalCluster, LocalComm};
    #[cfg(feature = "mpi-support")]
    pub use crate::comm::mpi::MpiComm;
    pub use crate::comm::{Collectives, Communicator};
    pub use crate::error::MeshColoringError;
    pub use crate::graph::{Crs, Dcrs, make_dcrs, naive_coloring, naive_distribution};
    pub use crate::mesh::{CartesianDefinition, MeshDefinition};
    #[cfg(feature = "metis-support")]
    pub use crate::partition::MetisPartitioner;
    pub use crate::partition::{BlockPartitioner, Partitioner};
}
