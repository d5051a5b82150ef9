use hindsight_core::error::CoreError;
use hindsight_core::model::NodeId;

#[derive(Debug, thiserror::Error)]
pub enum ConsolidateError {
    #[error("Store call timed out: {0}")]
    Timeout(&'static str),

    #[error("Node not found: {0}")]
    MissingNode(NodeId),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}
