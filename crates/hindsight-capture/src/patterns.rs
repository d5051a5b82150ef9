use hindsight_core::model::StepRange;
use hindsight_core::signals;

use crate::trajectory::RawStep;

/// Error-pattern evidence gathered from one trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternCandidate {
    pub category: String,
    pub keywords: Vec<String>,
    pub occurrences: u64,
}

/// Scan error observations for categories, collecting up to `keyword_limit`
/// deduplicated keywords per category. Categories keep first-seen order.
pub fn extract_error_patterns(steps: &[RawStep], keyword_limit: usize) -> Vec<PatternCandidate> {
    let mut candidates: Vec<PatternCandidate> = Vec::new();

    for step in steps {
        if !signals::is_error(&step.observation) {
            continue;
        }
        let Some(category) = signals::error_category(&step.observation) else {
            continue;
        };
        let keywords = signals::error_keywords(&step.observation, keyword_limit);

        let idx = match candidates.iter().position(|c| c.category == category) {
            Some(idx) => idx,
            None => {
                candidates.push(PatternCandidate {
                    category,
                    keywords: Vec::new(),
                    occurrences: 0,
                });
                candidates.len() - 1
            }
        };
        let candidate = &mut candidates[idx];
        candidate.occurrences += 1;
        for kw in keywords {
            if candidate.keywords.len() >= keyword_limit {
                break;
            }
            if !candidate.keywords.contains(&kw) {
                candidate.keywords.push(kw);
            }
        }
    }
    candidates
}

/// Distinct error categories observed inside a step range.
pub fn categories_in(steps: &[RawStep], range: StepRange) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let end = range.end.min(steps.len().saturating_sub(1));
    for step in steps.iter().take(end + 1).skip(range.start) {
        if !signals::is_error(&step.observation) {
            continue;
        }
        if let Some(category) = signals::error_category(&step.observation) {
            if !out.contains(&category) {
                out.push(category);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_counts_and_keywords() {
        let steps = vec![
            RawStep::new("run", "ImportError: cannot import name 'foo'"),
            RawStep::new("edit", "File updated."),
            RawStep::new("run", "ImportError: cannot import name 'bar'"),
            RawStep::new("test", "Traceback (most recent call last):\nKeyError: 'missing'"),
        ];
        let found = extract_error_patterns(&steps, 10);
        assert_eq!(found.len(), 2);

        assert_eq!(found[0].category, "ImportError");
        assert_eq!(found[0].occurrences, 2);
        assert_eq!(found[0].keywords, vec!["cannot", "import", "name", "foo", "bar"]);

        assert_eq!(found[1].category, "KeyError");
        assert_eq!(found[1].occurrences, 1);
        assert!(found[1].keywords.contains(&"missing".to_string()));
    }

    #[test]
    fn test_keyword_cap_per_category() {
        let steps = vec![
            RawStep::new("run", "ValueError: alpha beta gamma"),
            RawStep::new("run", "ValueError: delta epsilon zeta"),
        ];
        let found = extract_error_patterns(&steps, 4);
        assert_eq!(found[0].keywords, vec!["alpha", "beta", "gamma", "delta"]);
    }

    #[test]
    fn test_categories_in_range() {
        let steps = vec![
            RawStep::new("run", "TypeError: x"),
            RawStep::new("run", "ok"),
            RawStep::new("run", "KeyError: y"),
            RawStep::new("run", "TypeError: z"),
        ];
        let range = StepRange::new(1, 3).unwrap();
        assert_eq!(categories_in(&steps, range), vec!["KeyError", "TypeError"]);
    }
}
