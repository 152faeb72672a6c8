//! Category graph construction
//!
//! - [`builder`]: counting/fill passes over a category store
//! - [`category`]: the immutable [`CategoryGraph`]
//! - [`cost`]: rank propagation and the rank-to-cost transform
//! - [`registry`]: per-language graph ownership with an optional blob cache

pub mod builder;
pub mod category;
pub mod cost;
pub mod registry;

pub use builder::CategoryGraphBuilder;
pub use category::{distance_to_score, CategoryGraph, CategoryGraphStats};
pub use cost::{PropagationResult, RankPropagation};
pub use registry::CategoryGraphRegistry;
