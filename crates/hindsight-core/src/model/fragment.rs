use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{NodeId, NodeLabel};
use crate::error::CoreError;

/// Closed set of fragment kinds produced by segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    ErrorRecovery,
    Exploration,
    SuccessfulFix,
    FailedAttempt,
    Loop,
}

impl FragmentKind {
    pub const ALL: [FragmentKind; 5] = [
        Self::ErrorRecovery,
        Self::Exploration,
        Self::SuccessfulFix,
        Self::FailedAttempt,
        Self::Loop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ErrorRecovery => "error_recovery",
            Self::Exploration => "exploration",
            Self::SuccessfulFix => "successful_fix",
            Self::FailedAttempt => "failed_attempt",
            Self::Loop => "loop",
        }
    }

    /// Human-readable title, e.g. "Error Recovery".
    pub fn title(&self) -> &'static str {
        match self {
            Self::ErrorRecovery => "Error Recovery",
            Self::Exploration => "Exploration",
            Self::SuccessfulFix => "Successful Fix",
            Self::FailedAttempt => "Failed Attempt",
            Self::Loop => "Loop",
        }
    }

    /// Outcome assigned to a fragment closed with this kind.
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::SuccessfulFix => Outcome::Success,
            Self::ErrorRecovery => Outcome::Recovered,
            Self::FailedAttempt | Self::Loop => Outcome::Failed,
            Self::Exploration => Outcome::Completed,
        }
    }
}

impl FromStr for FragmentKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CoreError::InvalidFragmentKind(s.to_string()))
    }
}

impl std::fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Recovered,
    Failed,
    Completed,
}

impl Outcome {
    /// Success-oriented rank: higher is better.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Success => 3,
            Self::Recovered => 2,
            Self::Completed => 1,
            Self::Failed => 0,
        }
    }

    /// Whether a fragment with this outcome can seed a methodology.
    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Success | Self::Recovered)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Recovered => "recovered",
            Self::Failed => "failed",
            Self::Completed => "completed",
        }
    }
}

/// Inclusive range of step indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawStepRange")]
pub struct StepRange {
    pub start: usize,
    pub end: usize,
}

#[derive(Deserialize)]
struct RawStepRange {
    start: usize,
    end: usize,
}

impl TryFrom<RawStepRange> for StepRange {
    type Error = CoreError;

    fn try_from(raw: RawStepRange) -> Result<Self, Self::Error> {
        StepRange::new(raw.start, raw.end)
    }
}

impl StepRange {
    pub fn new(start: usize, end: usize) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::InvalidStepRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn step_count(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, step: usize) -> bool {
        (self.start..=self.end).contains(&step)
    }
}

impl std::fmt::Display for StepRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A contiguous, typed sub-sequence of steps within one trajectory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fragment {
    pub id: NodeId,
    pub step_range: StepRange,
    pub kind: FragmentKind,
    pub description: String,
    pub actions: Vec<String>,
    pub outcome: Outcome,
    /// First error category observed inside the step range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// Set once the fragment has been linked into a methodology.
    #[serde(default)]
    pub abstracted: bool,
    pub created_at: DateTime<Utc>,
}

impl Fragment {
    pub fn new(step_range: StepRange, kind: FragmentKind, actions: Vec<String>) -> Self {
        Self {
            id: NodeId::new(NodeLabel::Fragment),
            step_range,
            kind,
            description: String::new(),
            actions,
            outcome: kind.outcome(),
            error_category: None,
            embedding: Vec::new(),
            abstracted: false,
            created_at: Utc::now(),
        }
    }

    /// Relabel the fragment. The outcome is kept.
    pub fn relabel(&mut self, kind: FragmentKind) {
        self.kind = kind;
    }

    /// Score used to pick which of two duplicates survives a merge.
    pub fn richness(&self) -> (usize, usize) {
        (self.actions.len(), self.description.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_kind_roundtrip() {
        for kind in FragmentKind::ALL {
            assert_eq!(kind.as_str().parse::<FragmentKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_fragment_kind_rejects_unknown() {
        let err = "recovery".parse::<FragmentKind>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidFragmentKind(s) if s == "recovery"));
    }

    #[test]
    fn test_fragment_kind_serde_rejects_unknown() {
        assert!(serde_json::from_str::<FragmentKind>("\"giving_up\"").is_err());
        assert_eq!(
            serde_json::from_str::<FragmentKind>("\"failed_attempt\"").unwrap(),
            FragmentKind::FailedAttempt
        );
    }

    #[test]
    fn test_step_range_validation() {
        assert!(StepRange::new(3, 2).is_err());
        let r = StepRange::new(3, 5).unwrap();
        assert_eq!(r.step_count(), 3);
        assert!(r.contains(4));
        assert!(!r.contains(6));
        assert!(serde_json::from_str::<StepRange>(r#"{"start":4,"end":1}"#).is_err());
    }

    #[test]
    fn test_outcome_rank_order() {
        assert!(Outcome::Success.rank() > Outcome::Recovered.rank());
        assert!(Outcome::Recovered.rank() > Outcome::Completed.rank());
        assert!(Outcome::Completed.rank() > Outcome::Failed.rank());
    }

    #[test]
    fn test_relabel_keeps_outcome() {
        let mut f = Fragment::new(
            StepRange::new(0, 2).unwrap(),
            FragmentKind::ErrorRecovery,
            vec!["edit".into()],
        );
        f.relabel(FragmentKind::Loop);
        assert_eq!(f.kind, FragmentKind::Loop);
        assert_eq!(f.outcome, Outcome::Recovered);
    }
}
