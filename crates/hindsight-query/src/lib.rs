//! Recall of past experience for a running agent.

pub mod error;
pub mod recall;
pub mod retriever;
pub mod warnings;

pub use error::QueryError;
pub use recall::{Dimension, Recall};
pub use retriever::Retriever;
