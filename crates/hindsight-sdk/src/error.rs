use hindsight_capture::CaptureError;
use hindsight_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("Methodology not found: {0}")]
    UnknownMethodology(String),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),
}
