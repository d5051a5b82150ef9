mod embedding;
mod generation;
mod guard;

pub use embedding::{cosine_similarity, EmbeddingProvider, HashingEmbedder};
pub use generation::{StrategyGenerator, TemplateGenerator};
pub use guard::guarded;
