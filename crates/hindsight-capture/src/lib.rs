//! Trajectory ingestion: segmentation into fragments, loop labeling, error
//! pattern extraction, importers for on-disk formats and the memory writer.

pub mod error;
pub mod import;
pub mod labeling;
pub mod patterns;
pub mod segment;
pub mod summary;
pub mod trajectory;
pub mod writer;

pub use error::CaptureError;
pub use segment::Segmenter;
pub use trajectory::{RawStep, RawTrajectory};
pub use writer::{MemoryWriter, WriteReport};
