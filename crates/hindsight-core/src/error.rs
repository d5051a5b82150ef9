use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid fragment kind: {0}")]
    InvalidFragmentKind(String),

    #[error("Invalid phase: {0} (expected understanding, locating, fixing or testing)")]
    InvalidPhase(String),

    #[error("Invalid step range: start {start} is after end {end}")]
    InvalidStepRange { start: usize, end: usize },

    #[error("Invalid node ID: {0}")]
    InvalidId(String),

    #[error("Node not found: {id}")]
    NotFound { id: String },

    #[error("Relation not found: {id}")]
    RelationNotFound { id: u64 },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
