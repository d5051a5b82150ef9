use serde::{Deserialize, Serialize};
use tracing::debug;

use super::signature::LoopSignature;
use crate::config::MemoryConfig;
use crate::model::State;
use crate::signals::{NO_ERROR, UNKNOWN_ERROR};

/// A detected run of repeated signatures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopInfo {
    /// How many times the pattern repeats contiguously at the end of the window.
    pub repeat_count: usize,
    /// Index (into the inspected history) where the first repetition starts.
    pub start_index: usize,
    pub pattern: Vec<LoopSignature>,
    pub description: String,
}

impl LoopInfo {
    pub fn pattern_length(&self) -> usize {
        self.pattern.len()
    }

    /// The first concrete error category in the pattern, if any.
    pub fn error_category(&self) -> Option<&str> {
        self.pattern
            .iter()
            .map(|s| s.error_category.as_str())
            .find(|c| *c != NO_ERROR && *c != UNKNOWN_ERROR)
    }
}

/// Signature-based detector for unproductive repetition.
#[derive(Debug, Clone)]
pub struct LoopDetector {
    min_repeat: usize,
    window: usize,
    keyword_limit: usize,
}

impl Default for LoopDetector {
    fn default() -> Self {
        Self {
            min_repeat: 3,
            window: 10,
            keyword_limit: 5,
        }
    }
}

impl LoopDetector {
    pub fn new(min_repeat: usize) -> Self {
        Self {
            min_repeat: min_repeat.max(1),
            ..Self::default()
        }
    }

    pub fn from_config(config: &MemoryConfig) -> Self {
        Self {
            min_repeat: config.min_repeat.max(1),
            window: config.loop_window.max(config.min_repeat),
            keyword_limit: config.signature_keywords,
        }
    }

    pub fn min_repeat(&self) -> usize {
        self.min_repeat
    }

    pub fn keyword_limit(&self) -> usize {
        self.keyword_limit
    }

    /// Whether two states represent the same predicament.
    pub fn same_predicament(&self, a: &State, b: &State) -> bool {
        LoopSignature::from_state(a, self.keyword_limit)
            .matches(&LoopSignature::from_state(b, self.keyword_limit))
    }

    /// Inspect the most recent states (up to the configured window) for a loop.
    pub fn detect(&self, history: &[State]) -> Option<LoopInfo> {
        let offset = history.len().saturating_sub(self.window);
        let signatures: Vec<LoopSignature> = history[offset..]
            .iter()
            .map(|s| LoopSignature::from_state(s, self.keyword_limit))
            .collect();

        let mut info = self.detect_signatures(&signatures)?;
        info.start_index += offset;
        debug!(
            repeat_count = info.repeat_count,
            start_index = info.start_index,
            "Loop detected"
        );
        Some(info)
    }

    /// Search suffix patterns from length 1 upward; the first length whose
    /// pattern repeats at least `min_repeat` times contiguously wins.
    /// A multi-step pattern only counts when every step hit the same error
    /// category, so an agent cycling through different errors is not stuck.
    pub fn detect_signatures(&self, signatures: &[LoopSignature]) -> Option<LoopInfo> {
        let n = signatures.len();
        if n < self.min_repeat {
            return None;
        }

        for len in 1..=(n / self.min_repeat) {
            let pattern = &signatures[n - len..];
            if !single_category(pattern) {
                continue;
            }
            let mut count = 1;
            let mut pos = n - len;
            while pos >= len && window_matches(&signatures[pos - len..pos], pattern) {
                count += 1;
                pos -= len;
            }

            if count >= self.min_repeat {
                return Some(LoopInfo {
                    repeat_count: count,
                    start_index: n - count * len,
                    pattern: pattern.to_vec(),
                    description: describe(pattern, count),
                });
            }
        }
        None
    }

    /// Largest number of steps sharing one signature anywhere in the slice
    /// (not necessarily contiguous). Used for offline fragment labeling.
    pub fn max_repeats(&self, signatures: &[LoopSignature]) -> usize {
        signatures
            .iter()
            .map(|a| signatures.iter().filter(|b| a.matches(b)).count())
            .max()
            .unwrap_or(0)
    }

    /// Whether the slice contains a signature repeated at least `min_repeat` times.
    pub fn has_repeats(&self, signatures: &[LoopSignature]) -> bool {
        self.max_repeats(signatures) >= self.min_repeat
    }
}

fn single_category(pattern: &[LoopSignature]) -> bool {
    pattern
        .windows(2)
        .all(|w| w[0].error_category == w[1].error_category)
}

fn window_matches(window: &[LoopSignature], pattern: &[LoopSignature]) -> bool {
    window.len() == pattern.len() && window.iter().zip(pattern).all(|(a, b)| a.matches(b))
}

fn describe(pattern: &[LoopSignature], count: usize) -> String {
    let actions: Vec<&str> = pattern.iter().map(|s| s.action.as_str()).collect();
    let errors: Vec<&str> = pattern.iter().map(|s| s.error_category.as_str()).collect();
    format!(
        "Loop detected: pattern of {} step(s) repeated {count} times (actions=[{}], errors=[{}])",
        pattern.len(),
        actions.join(", "),
        errors.join(", ")
    )
}
