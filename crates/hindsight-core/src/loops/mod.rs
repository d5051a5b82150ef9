mod detector;
mod signature;

pub use detector::{LoopDetector, LoopInfo};
pub use signature::LoopSignature;
