//! Cost-ordered searches over a category graph
//!
//! - [`bfs`]: single-source frontier expansion collecting page distances
//! - [`distance`]: bidirectional minimum-cost path between two category sets

pub mod bfs;
pub mod distance;

pub use bfs::{CategoryBfs, Settled};
pub use distance::{shortest_distance, PathDistance};
