use serde::{Deserialize, Serialize};

use super::id::{NodeId, NodeLabel};

/// Aggregated recognizer for one recurring error category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorPattern {
    pub id: NodeId,
    pub category: String,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub context: String,
    pub frequency: u64,
}

impl ErrorPattern {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(NodeLabel::ErrorPattern),
            category: category.into(),
            keywords: Vec::new(),
            context: String::new(),
            frequency: 0,
        }
    }

    /// Merge newly observed keywords (deduplicated, first-seen order, capped)
    /// and bump the frequency counter.
    pub fn absorb<I, S>(&mut self, keywords: I, occurrences: u64, cap: usize)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for kw in keywords {
            if self.keywords.len() >= cap {
                break;
            }
            let kw = kw.into();
            if !self.keywords.contains(&kw) {
                self.keywords.push(kw);
            }
        }
        self.frequency += occurrences;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_dedupes_and_caps() {
        let mut p = ErrorPattern::new("TypeError");
        p.absorb(["argument", "none", "argument"], 2, 3);
        assert_eq!(p.keywords, vec!["argument", "none"]);
        assert_eq!(p.frequency, 2);

        p.absorb(["int", "str", "float"], 1, 3);
        assert_eq!(p.keywords, vec!["argument", "none", "int"]);
        assert_eq!(p.frequency, 3);
    }
}
