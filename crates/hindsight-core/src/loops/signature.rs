use serde::{Deserialize, Serialize};

use crate::model::State;
use crate::signals;

/// The (action, error category, keywords) triple compared between steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopSignature {
    pub action: String,
    pub error_category: String,
    pub keywords: Vec<String>,
}

impl LoopSignature {
    pub fn new(action: impl Into<String>, error_text: &str, keyword_limit: usize) -> Self {
        Self {
            action: action.into(),
            error_category: signals::signature_category(error_text),
            keywords: signals::error_keywords(error_text, keyword_limit),
        }
    }

    pub fn from_state(state: &State, keyword_limit: usize) -> Self {
        Self::new(state.last_action.clone(), &state.current_error, keyword_limit)
    }

    /// Same action, same error category, and at least one shared keyword.
    pub fn matches(&self, other: &LoopSignature) -> bool {
        self.action == other.action
            && self.error_category == other.error_category
            && self.keywords.iter().any(|k| other.keywords.contains(k))
    }
}

impl std::fmt::Display for LoopSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> {} [{}]",
            self.action,
            self.error_category,
            self.keywords.join(", ")
        )
    }
}
