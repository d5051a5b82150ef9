use hindsight_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}
