use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Processing phase an agent reports for its current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Understanding,
    Locating,
    Fixing,
    Testing,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Understanding => "understanding",
            Self::Locating => "locating",
            Self::Fixing => "fixing",
            Self::Testing => "testing",
        }
    }
}

impl FromStr for Phase {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "understanding" => Ok(Self::Understanding),
            "locating" => Ok(Self::Locating),
            "fixing" => Ok(Self::Fixing),
            "testing" => Ok(Self::Testing),
            other => Err(CoreError::InvalidPhase(other.to_string())),
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime snapshot of the agent, used as retrieval and loop-detection input.
/// Never persisted as a graph record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct State {
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub repo_summary: String,
    #[serde(default)]
    pub task_description: String,
    /// Empty when the last step produced no error.
    #[serde(default)]
    pub current_error: String,
    pub phase: Phase,
    #[serde(default = "default_action")]
    pub last_action: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

fn default_action() -> String {
    "unknown".to_string()
}

impl State {
    /// Create a state for a task in the given phase. Fails on an unknown phase name.
    pub fn new(task_description: impl Into<String>, phase: &str) -> Result<Self, CoreError> {
        Ok(Self::with_phase(task_description, phase.parse()?))
    }

    pub fn with_phase(task_description: impl Into<String>, phase: Phase) -> Self {
        Self {
            tools: Vec::new(),
            repo_summary: String::new(),
            task_description: task_description.into(),
            current_error: String::new(),
            phase,
            last_action: default_action(),
            embedding: Vec::new(),
        }
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.current_error = error.into();
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.last_action = action.into();
        self
    }

    pub fn repo_summary(mut self, summary: impl Into<String>) -> Self {
        self.repo_summary = summary.into();
        self
    }

    pub fn tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_error(&self) -> bool {
        !self.current_error.trim().is_empty()
    }

    /// Text rendering embedded for semantic retrieval.
    pub fn situation(&self) -> String {
        let mut parts = vec![
            format!("Phase: {}", self.phase),
            format!("Task: {}", self.task_description),
        ];
        if !self.repo_summary.is_empty() {
            parts.push(format!("Repo: {}", self.repo_summary));
        }
        if self.has_error() {
            parts.push(format!("Error: {}", self.current_error));
        }
        if !self.tools.is_empty() {
            parts.push(format!("Tools: {}", self.tools.join(", ")));
        }
        parts.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_rejects_unknown_phase() {
        let err = State::new("fix the bug", "deploying").unwrap_err();
        assert!(matches!(err, CoreError::InvalidPhase(p) if p == "deploying"));
    }

    #[test]
    fn test_state_builder() {
        let state = State::new("fix import", "fixing")
            .unwrap()
            .error("ImportError: cannot import name 'x'")
            .action("edit")
            .tools(["edit", "bash"]);
        assert_eq!(state.phase, Phase::Fixing);
        assert_eq!(state.last_action, "edit");
        assert!(state.has_error());
        let situation = state.situation();
        assert!(situation.contains("Phase: fixing"));
        assert!(situation.contains("Error: ImportError"));
        assert!(situation.contains("Tools: edit, bash"));
    }

    #[test]
    fn test_state_serde_rejects_unknown_phase() {
        let json = r#"{"task_description":"x","phase":"napping"}"#;
        assert!(serde_json::from_str::<State>(json).is_err());

        let json = r#"{"task_description":"x","phase":"testing"}"#;
        let state: State = serde_json::from_str(json).unwrap();
        assert_eq!(state.last_action, "unknown");
        assert!(!state.has_error());
    }
}
