use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Tunables for the memory engine. Every field has a default, so a config
/// file only needs to name the values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Run consolidation after every N learned trajectories.
    pub consolidate_every: u64,
    /// Items returned per category after fusion.
    pub top_k: usize,
    /// Items fetched by each retrieval dimension before fusion.
    pub dimension_limit: usize,
    pub min_repeat: usize,
    /// How many recent states the loop detector inspects.
    pub loop_window: usize,
    pub signature_keywords: usize,
    pub pattern_keywords: usize,
    pub description_actions: usize,
    pub merge_threshold: f64,
    /// Minimum cosine similarity for the writer to link two fragments.
    pub similarity_link_threshold: f64,
    pub min_group_size: usize,
    pub initial_confidence: f64,
    pub cleanup_min_confidence: f64,
    pub cleanup_min_sources: usize,
    pub escape_suggestions: usize,
    pub embedding_dim: usize,
    pub store_timeout_ms: u64,
    pub embed_timeout_ms: u64,
    pub generate_timeout_ms: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            consolidate_every: 16,
            top_k: 5,
            dimension_limit: 5,
            min_repeat: 3,
            loop_window: 10,
            signature_keywords: 5,
            pattern_keywords: 10,
            description_actions: 5,
            merge_threshold: 0.9,
            similarity_link_threshold: 0.85,
            min_group_size: 2,
            initial_confidence: 0.5,
            cleanup_min_confidence: 0.3,
            cleanup_min_sources: 3,
            escape_suggestions: 3,
            embedding_dim: 256,
            store_timeout_ms: 500,
            embed_timeout_ms: 2000,
            generate_timeout_ms: 5000,
        }
    }
}

impl MemoryConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let positive = [
            ("consolidate_every", self.consolidate_every as usize),
            ("top_k", self.top_k),
            ("dimension_limit", self.dimension_limit),
            ("min_repeat", self.min_repeat),
            ("embedding_dim", self.embedding_dim),
            ("min_group_size", self.min_group_size),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(CoreError::Config(format!("{name} must be greater than 0")));
            }
        }

        let unit = [
            ("merge_threshold", self.merge_threshold),
            ("similarity_link_threshold", self.similarity_link_threshold),
            ("initial_confidence", self.initial_confidence),
            ("cleanup_min_confidence", self.cleanup_min_confidence),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(CoreError::Config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn embed_timeout(&self) -> Duration {
        Duration::from_millis(self.embed_timeout_ms)
    }

    pub fn generate_timeout(&self) -> Duration {
        Duration::from_millis(self.generate_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = MemoryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.consolidate_every, 16);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.min_repeat, 3);
    }

    #[test]
    fn test_load_partial_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hindsight.json");
        std::fs::write(&path, r#"{"top_k": 8, "consolidate_every": 4}"#).unwrap();

        let config = MemoryConfig::load(&path).unwrap();
        assert_eq!(config.top_k, 8);
        assert_eq!(config.consolidate_every, 4);
        assert_eq!(config.merge_threshold, 0.9);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.json");
        std::fs::write(&path, r#"{"min_repeat": 0}"#).unwrap();
        assert!(matches!(
            MemoryConfig::load(&path),
            Err(CoreError::Config(msg)) if msg.contains("min_repeat")
        ));

        std::fs::write(&path, r#"{"merge_threshold": 1.5}"#).unwrap();
        assert!(MemoryConfig::load(&path).is_err());
    }
}
