//! Core building blocks of the Hindsight agent memory: the graph data model,
//! the loop detector, the graph store interface with an in-memory
//! implementation, and the embedding/generation provider seams.

pub mod config;
pub mod error;
pub mod loops;
pub mod model;
pub mod providers;
pub mod signals;
pub mod storage;

pub use config::MemoryConfig;
pub use error::CoreError;
