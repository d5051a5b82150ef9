use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

/// One step of an agent run as produced by a trajectory source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStep {
    pub action: String,
    #[serde(default)]
    pub observation: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub thought: String,
}

impl RawStep {
    pub fn new(action: impl Into<String>, observation: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            observation: observation.into(),
            thought: String::new(),
        }
    }
}

/// A finished agent run before segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTrajectory {
    pub instance_id: String,
    #[serde(default)]
    pub repo: String,
    pub success: bool,
    #[serde(default)]
    pub problem_statement: String,
    pub steps: Vec<RawStep>,
    /// SHA-256 of the file this trajectory was imported from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_hash: Option<String>,
}

impl RawTrajectory {
    pub fn new(instance_id: impl Into<String>, repo: impl Into<String>, success: bool) -> Self {
        Self {
            instance_id: instance_id.into(),
            repo: repo.into(),
            success,
            problem_statement: String::new(),
            steps: Vec::new(),
            source_hash: None,
        }
    }

    pub fn problem(mut self, statement: impl Into<String>) -> Self {
        self.problem_statement = statement.into();
        self
    }

    pub fn step(mut self, action: impl Into<String>, observation: impl Into<String>) -> Self {
        self.steps.push(RawStep::new(action, observation));
        self
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.instance_id.trim().is_empty() {
            return Err(CaptureError::InvalidTrajectory(
                "instance_id must not be empty".into(),
            ));
        }
        if let Some(i) = self.steps.iter().position(|s| s.action.trim().is_empty()) {
            return Err(CaptureError::InvalidTrajectory(format!(
                "step {i} has an empty action label"
            )));
        }
        Ok(())
    }
}
