pub mod error_pattern;
pub mod fragment;
pub mod id;
pub mod methodology;
pub mod relation;
pub mod state;
pub mod trajectory;

use serde::{Deserialize, Serialize};

pub use error_pattern::ErrorPattern;
pub use fragment::{Fragment, FragmentKind, Outcome, StepRange};
pub use id::{NodeId, NodeLabel};
pub use methodology::{success_rate, Methodology};
pub use relation::{Relation, RelationId, RelationKind};
pub use state::{Phase, State};
pub use trajectory::{TaskCategory, Trajectory};

/// Any record stored as a node in the memory graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "label", rename_all = "snake_case")]
pub enum MemoryNode {
    Trajectory(Trajectory),
    Fragment(Fragment),
    ErrorPattern(ErrorPattern),
    Methodology(Methodology),
}

impl MemoryNode {
    pub fn id(&self) -> &NodeId {
        match self {
            Self::Trajectory(t) => &t.id,
            Self::Fragment(f) => &f.id,
            Self::ErrorPattern(e) => &e.id,
            Self::Methodology(m) => &m.id,
        }
    }

    pub fn label(&self) -> NodeLabel {
        match self {
            Self::Trajectory(_) => NodeLabel::Trajectory,
            Self::Fragment(_) => NodeLabel::Fragment,
            Self::ErrorPattern(_) => NodeLabel::ErrorPattern,
            Self::Methodology(_) => NodeLabel::Methodology,
        }
    }

    pub fn as_trajectory(&self) -> Option<&Trajectory> {
        match self {
            Self::Trajectory(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_fragment(&self) -> Option<&Fragment> {
        match self {
            Self::Fragment(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_error_pattern(&self) -> Option<&ErrorPattern> {
        match self {
            Self::ErrorPattern(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_methodology(&self) -> Option<&Methodology> {
        match self {
            Self::Methodology(m) => Some(m),
            _ => None,
        }
    }

    pub fn into_fragment(self) -> Option<Fragment> {
        match self {
            Self::Fragment(f) => Some(f),
            _ => None,
        }
    }

    pub fn into_methodology(self) -> Option<Methodology> {
        match self {
            Self::Methodology(m) => Some(m),
            _ => None,
        }
    }

    pub fn into_error_pattern(self) -> Option<ErrorPattern> {
        match self {
            Self::ErrorPattern(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_trajectory(self) -> Option<Trajectory> {
        match self {
            Self::Trajectory(t) => Some(t),
            _ => None,
        }
    }

    /// Stored embedding, empty when none was computed.
    pub fn embedding(&self) -> &[f32] {
        match self {
            Self::Trajectory(t) => &t.embedding,
            Self::Fragment(f) => &f.embedding,
            Self::ErrorPattern(_) => &[],
            Self::Methodology(m) => &m.embedding,
        }
    }
}

impl From<Trajectory> for MemoryNode {
    fn from(t: Trajectory) -> Self {
        Self::Trajectory(t)
    }
}

impl From<Fragment> for MemoryNode {
    fn from(f: Fragment) -> Self {
        Self::Fragment(f)
    }
}

impl From<ErrorPattern> for MemoryNode {
    fn from(e: ErrorPattern) -> Self {
        Self::ErrorPattern(e)
    }
}

impl From<Methodology> for MemoryNode {
    fn from(m: Methodology) -> Self {
        Self::Methodology(m)
    }
}
