mod graph;
mod memory;
pub mod snapshot;

pub use graph::{GraphStore, NodeFilter};
pub use memory::{GraphSnapshot, InMemoryGraphStore};
