//! Dual-graph construction in (distributed) compressed-row storage.

pub mod builder;
pub mod crs;

pub use builder::{make_dcrs, naive_coloring, naive_distribution};
pub use crs::{Crs, Dcrs};
