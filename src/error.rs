//! MeshColoringError: unified error type for mesh-coloring public APIs
//!
//! This error type is used throughout the mesh-coloring library to provide
//! robust, non-panicking error handling for all public APIs.

use thiserror::Error;

/// Unified error type for mesh-coloring operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshColoringError {
    /// A coloring pass left some color with no primary entities.
    #[error(
        "color {color} received an empty primary coloring; \
         increase the problem size or use fewer colors"
    )]
    EmptyColoring { color: usize },
    /// A graph-partitioner backend reported failure.
    #[error("partitioner backend failed: {0}")]
    PartitionerFailure(String),
    /// A collective exchange returned a buffer of unexpected shape.
    #[error("malformed exchange with color {color}: expected {expected} items, got {got}")]
    ExchangeMismatch {
        color: usize,
        expected: usize,
        got: usize,
    },
    /// An entity offset was requested from a color that does not own it.
    #[error("color {color} does not own entity {id}")]
    MissingOwner { id: usize, color: usize },
    /// A query named a topological dimension the mesh does not have.
    #[error("dimension {dim} out of range for a {mesh_dim}-dimensional mesh")]
    InvalidDimension { dim: usize, mesh_dim: usize },
    /// A coloring was requested for an index space that was never registered.
    #[error("no coloring registered for index space {0}")]
    UnknownIndexSpace(usize),
}
