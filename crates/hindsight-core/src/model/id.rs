use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Kind of record stored in the memory graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeLabel {
    Trajectory,
    Fragment,
    ErrorPattern,
    Methodology,
}

impl NodeLabel {
    /// Prefix used for generated identifiers of this label.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Trajectory => "traj",
            Self::Fragment => "frag",
            Self::ErrorPattern => "err",
            Self::Methodology => "meth",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trajectory => "trajectory",
            Self::Fragment => "fragment",
            Self::ErrorPattern => "error_pattern",
            Self::Methodology => "methodology",
        }
    }
}

impl std::fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stable identifier for a node in the memory graph.
/// Generated as `<prefix>_<12 hex chars>` from a UUID v4.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(label: NodeLabel) -> Self {
        let hex = Uuid::new_v4().as_simple().to_string();
        Self(format!("{}_{}", label.prefix(), &hex[..12]))
    }

    /// Parse and validate an ID string. The prefix must name a known label.
    pub fn parse(s: impl Into<String>) -> Result<Self, CoreError> {
        let s = s.into();
        let Some((prefix, rest)) = s.split_once('_') else {
            return Err(CoreError::InvalidId(format!("missing label prefix in '{s}'")));
        };
        if rest.is_empty() {
            return Err(CoreError::InvalidId(format!("empty identifier body in '{s}'")));
        }
        match prefix {
            "traj" | "frag" | "err" | "meth" => Ok(Self(s)),
            other => Err(CoreError::InvalidId(format!("unknown prefix '{other}'"))),
        }
    }

    /// The label encoded in the identifier prefix, if recognizable.
    pub fn label(&self) -> Option<NodeLabel> {
        match self.0.split_once('_').map(|(p, _)| p) {
            Some("traj") => Some(NodeLabel::Trajectory),
            Some("frag") => Some(NodeLabel::Fragment),
            Some("err") => Some(NodeLabel::ErrorPattern),
            Some("meth") => Some(NodeLabel::Methodology),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_generation() {
        let id = NodeId::new(NodeLabel::Fragment);
        assert!(id.as_str().starts_with("frag_"));
        assert_eq!(id.as_str().len(), "frag_".len() + 12);
        assert_eq!(id.label(), Some(NodeLabel::Fragment));
    }

    #[test]
    fn test_node_id_parse() {
        assert!(NodeId::parse("meth_0123456789ab").is_ok());
        assert!(NodeId::parse("meth_").is_err());
        assert!(NodeId::parse("nolabel").is_err());
        assert!(NodeId::parse("user_abc").is_err());
    }
}
