//! Map graphs: plain adjacency and the ownership-aware wrapper.

pub mod adjacency;
pub mod ownership;

pub use adjacency::{AdjacencyGraph, GraphError};
pub use ownership::OwnershipGraph;
