//! Batch consolidation of the memory graph.
//!
//! Four passes run in order: abstraction of methodologies from successful
//! fragments, merging of near-duplicate fragments, statistics refresh, and
//! cleanup of orphaned or low-value nodes. Every pass is idempotent and a
//! failing pass never stops the ones after it.

mod abstraction;
mod cleanup;
pub mod consolidator;
pub mod error;
mod merge;
pub mod report;
mod statistics;

pub use consolidator::Consolidator;
pub use error::ConsolidateError;
pub use report::{ConsolidationReport, Pass};
