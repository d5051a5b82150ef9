//! Heuristic text signals extracted from step observations and error messages.
//!
//! Everything here is pure and deterministic: error detection, error-category
//! extraction and keyword extraction feed both the segmenter and the loop
//! detector, so both sides must agree on what an error looks like.

use once_cell::sync::Lazy;
use regex::Regex;

/// Category reported for a state whose error text is empty.
pub const NO_ERROR: &str = "None";

/// Category reported when error text is present but no known token matches.
pub const UNKNOWN_ERROR: &str = "Unknown";

const ERROR_SIGNATURE_PATTERNS: [&str; 5] = [
    r"\b[A-Za-z_][A-Za-z0-9_]*(?:Error|Exception)\b",
    r"\b(?:Error|Exception):",
    r"(?m)^\s*(?:ERROR|FAIL|FAILED)\b",
    r"\bTraceback \(most recent call last\)",
    r"\b[Ff]ailed\b",
];

static ERROR_SIGNATURES: Lazy<Vec<Regex>> = Lazy::new(|| {
    ERROR_SIGNATURE_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("valid error signature regex"))
        .collect()
});

static CATEGORY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*(?:Error|Exception)|FAILED|FAIL|ERROR)\b")
        .expect("valid error category regex")
});

static TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("valid token regex"));

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "in", "on", "at", "to", "for", "of", "is", "are", "was", "were", "and",
    "with", "this", "that", "has", "have", "been", "be",
];

/// Whether an observation looks like an error.
pub fn is_error(observation: &str) -> bool {
    ERROR_SIGNATURES.iter().any(|re| re.is_match(observation))
}

/// Extract the error category (e.g. "ImportError") from error text, if any.
/// `FAILED` is normalized to `FAIL`.
pub fn error_category(text: &str) -> Option<String> {
    let m = CATEGORY.captures(text)?.get(1)?.as_str();
    if m == "FAILED" {
        Some("FAIL".to_string())
    } else {
        Some(m.to_string())
    }
}

/// Category used in loop signatures: [`NO_ERROR`] for empty text,
/// [`UNKNOWN_ERROR`] when nothing recognizable is present.
pub fn signature_category(text: &str) -> String {
    if text.trim().is_empty() {
        return NO_ERROR.to_string();
    }
    error_category(text).unwrap_or_else(|| UNKNOWN_ERROR.to_string())
}

/// Lowercased identifier-like tokens, stop-words and short tokens removed,
/// deduplicated in first-occurrence order, at most `limit` of them.
pub fn keywords(text: &str, limit: usize) -> Vec<String> {
    collect_keywords(text, limit, None)
}

/// Like [`keywords`], but drops the error category token itself so that two
/// errors only share keywords through their actual message.
pub fn error_keywords(text: &str, limit: usize) -> Vec<String> {
    let category = error_category(text).map(|c| c.to_lowercase());
    collect_keywords(text, limit, category.as_deref())
}

fn collect_keywords(text: &str, limit: usize, exclude: Option<&str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for m in TOKEN.find_iter(text) {
        if out.len() >= limit {
            break;
        }
        let token = m.as_str().to_lowercase();
        if token.len() <= 2 || STOP_WORDS.contains(&token.as_str()) {
            continue;
        }
        if exclude == Some(token.as_str()) || out.contains(&token) {
            continue;
        }
        out.push(token);
    }
    out
}

/// Distinct values in first-seen order, at most `limit`.
pub fn first_distinct<'a, I>(items: I, limit: usize) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out: Vec<&str> = Vec::new();
    for item in items {
        if out.len() >= limit {
            break;
        }
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_pattern_compiles() {
        assert_eq!(ERROR_SIGNATURES.len(), ERROR_SIGNATURE_PATTERNS.len());
        assert!(CATEGORY.is_match("KeyError"));
        assert!(TOKEN.is_match("name"));
    }

    #[test]
    fn test_is_error_signatures() {
        assert!(is_error("ImportError: No module named 'foo'"));
        assert!(is_error("raise ValueError('bad')"));
        assert!(is_error("java.lang.NullPointerException at Foo.bar"));
        assert!(is_error("Traceback (most recent call last):\n  File x"));
        assert!(is_error("ERROR: could not build wheel"));
        assert!(is_error("collected 3 items\nFAILED tests/test_a.py::test_x"));
        assert!(is_error("Build failed with 2 errors"));
        assert!(is_error("Error: file not found"));
    }

    #[test]
    fn test_is_error_negatives() {
        assert!(!is_error("File updated successfully."));
        assert!(!is_error("3 passed in 0.12s"));
        assert!(!is_error("class ErrorRecoveryHandler:"));
        assert!(!is_error("no errors found"));
        assert!(!is_error(""));
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            error_category("Traceback...\nTypeError: unsupported operand").as_deref(),
            Some("TypeError")
        );
        assert_eq!(
            error_category("FAILED tests/test_a.py").as_deref(),
            Some("FAIL")
        );
        assert_eq!(error_category("ERROR in build").as_deref(), Some("ERROR"));
        assert_eq!(error_category("something odd happened"), None);
    }

    #[test]
    fn test_signature_category_sentinels() {
        assert_eq!(signature_category(""), NO_ERROR);
        assert_eq!(signature_category("   "), NO_ERROR);
        assert_eq!(signature_category("it broke"), UNKNOWN_ERROR);
        assert_eq!(signature_category("KeyError: 'x'"), "KeyError");
    }

    #[test]
    fn test_keywords_order_and_filtering() {
        let kws = keywords("The module is missing in the path of the module loader", 5);
        assert_eq!(kws, vec!["module", "missing", "path", "loader"]);

        let kws = keywords("alpha beta gamma delta epsilon zeta", 3);
        assert_eq!(kws, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_error_keywords_drop_category() {
        let kws = error_keywords("ImportError: cannot import name 'foo' from 'pkg'", 5);
        assert_eq!(kws, vec!["cannot", "import", "name", "foo", "from"]);
    }

    #[test]
    fn test_first_distinct() {
        let items = ["open", "edit", "open", "run", "edit", "submit"];
        assert_eq!(
            first_distinct(items.iter().copied(), 3),
            vec!["open", "edit", "run"]
        );
    }
}
