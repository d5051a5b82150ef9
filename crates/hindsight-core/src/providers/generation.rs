use async_trait::async_trait;

use crate::error::CoreError;

/// Optional natural-language synthesis of a strategy from example fragments.
#[async_trait]
pub trait StrategyGenerator: Send + Sync {
    /// `situation` describes when the strategy applies; `examples` are the
    /// action sequences or descriptions it was distilled from.
    async fn summarize(&self, situation: &str, examples: &[String]) -> Result<String, CoreError>;
}

/// Deterministic fallback: lists the distinct steps seen across examples.
#[derive(Debug, Clone, Default)]
pub struct TemplateGenerator;

impl TemplateGenerator {
    pub fn render(&self, situation: &str, examples: &[String]) -> String {
        let mut steps: Vec<&str> = Vec::new();
        for example in examples {
            for step in example.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                if !steps.contains(&step) {
                    steps.push(step);
                }
            }
        }
        if steps.is_empty() {
            return format!("No concrete steps recorded {situation}.");
        }
        format!(
            "Apply the steps that resolved it before: {}",
            steps.join(" -> ")
        )
    }
}

#[async_trait]
impl StrategyGenerator for TemplateGenerator {
    async fn summarize(&self, situation: &str, examples: &[String]) -> Result<String, CoreError> {
        Ok(self.render(situation, examples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_template_lists_distinct_steps() {
        let g = TemplateGenerator;
        let text = g
            .summarize(
                "when encountering TypeError",
                &["open, edit, run_tests".into(), "edit, run_tests, submit".into()],
            )
            .await
            .unwrap();
        assert_eq!(
            text,
            "Apply the steps that resolved it before: open -> edit -> run_tests -> submit"
        );
    }

    #[test]
    fn test_template_without_steps() {
        let text = TemplateGenerator.render("when encountering KeyError", &[]);
        assert_eq!(text, "No concrete steps recorded when encountering KeyError.");
    }
}
