//! Mesh-definition interface and generated fixture meshes.

pub mod definition;
pub mod grid;

pub use definition::MeshDefinition;
pub use grid::CartesianDefinition;
