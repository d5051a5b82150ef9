/// Minimum stored frequency before a category gets a "seen before" note.
pub const FREQUENT_ERROR_THRESHOLD: u64 = 3;

/// Advisory hint for an error category.
pub fn category_hint(category: &str) -> String {
    let hint = match category {
        "ImportError" | "ModuleNotFoundError" => {
            "check the module path and installed packages before editing imports again"
        }
        "TypeError" => "check argument types and None values at the failing call site",
        "AttributeError" => "confirm the object's type; the attribute may be misspelled or live elsewhere",
        "KeyError" | "IndexError" => "verify the key or index exists where the collection is populated",
        "NameError" => "look for a missing import or a typo in the name",
        "SyntaxError" | "IndentationError" => "re-read the edited lines for syntax or indentation slips",
        "AssertionError" | "FAIL" => "compare expected and actual values before changing code again",
        _ => {
            return format!(
                "{category}: common mistake pattern; read the full error before repeating the last action"
            )
        }
    };
    format!("{category}: {hint}")
}

/// Note added when a category has recurred across past runs.
pub fn frequency_note(category: &str, frequency: u64) -> Option<String> {
    (frequency >= FREQUENT_ERROR_THRESHOLD)
        .then(|| format!("{category} has been seen {frequency} times in past runs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_hints() {
        assert!(category_hint("TypeError").starts_with("TypeError: check argument types"));
        assert!(category_hint("FooError").contains("common mistake pattern"));
    }

    #[test]
    fn test_frequency_note_threshold() {
        assert!(frequency_note("KeyError", 2).is_none());
        assert_eq!(
            frequency_note("KeyError", 3).as_deref(),
            Some("KeyError has been seen 3 times in past runs")
        );
    }
}
