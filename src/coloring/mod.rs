//! Index-coloring data model, engine, and registration context.

pub mod context;
pub mod engine;
pub mod types;

pub use context::ColoringContext;
pub use engine::{ColoringEngine, ColoringSpaces};
pub use types::{AdjacencyInfo, ColoringInfo, EntityInfo, IndexColoring};
