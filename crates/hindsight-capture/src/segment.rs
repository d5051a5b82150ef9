use hindsight_core::model::{Fragment, FragmentKind, StepRange};
use hindsight_core::signals;

use crate::trajectory::RawStep;

/// Greedy single-pass segmentation of a step sequence into typed fragments.
///
/// A fragment closes when an error first appears (the preceding run keeps its
/// kind) and when an error clears (the error run becomes `error_recovery`,
/// including the recovering step). The trailing run becomes `successful_fix`
/// if the whole trajectory succeeded and no error is still open.
#[derive(Debug, Clone)]
pub struct Segmenter {
    description_actions: usize,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self {
            description_actions: 5,
        }
    }
}

impl Segmenter {
    pub fn new(description_actions: usize) -> Self {
        Self {
            description_actions: description_actions.max(1),
        }
    }

    pub fn segment(&self, steps: &[RawStep], success: bool) -> Vec<Fragment> {
        let mut fragments = Vec::new();
        let mut start = 0;
        let mut kind = FragmentKind::Exploration;
        let mut in_error = false;

        for (i, step) in steps.iter().enumerate() {
            let is_error = signals::is_error(&step.observation);
            if is_error && !in_error {
                if i > start {
                    fragments.push(self.close(steps, start, i - 1, kind));
                }
                start = i;
                kind = FragmentKind::FailedAttempt;
                in_error = true;
            } else if !is_error && in_error {
                fragments.push(self.close(steps, start, i, FragmentKind::ErrorRecovery));
                start = i + 1;
                kind = FragmentKind::Exploration;
                in_error = false;
            }
        }

        if start < steps.len() {
            let last = if success && !in_error {
                FragmentKind::SuccessfulFix
            } else {
                kind
            };
            fragments.push(self.close(steps, start, steps.len() - 1, last));
        }
        fragments
    }

    /// "Kind Title: first, distinct, actions".
    pub fn describe(&self, kind: FragmentKind, actions: &[String]) -> String {
        let distinct = signals::first_distinct(
            actions.iter().map(String::as_str),
            self.description_actions,
        );
        format!("{}: {}", kind.title(), distinct.join(", "))
    }

    fn close(&self, steps: &[RawStep], start: usize, end: usize, kind: FragmentKind) -> Fragment {
        let slice = &steps[start..=end];
        let actions: Vec<String> = slice.iter().map(|s| s.action.clone()).collect();
        let mut fragment = Fragment::new(StepRange { start, end }, kind, actions);
        fragment.description = self.describe(kind, &fragment.actions);
        fragment.error_category = slice
            .iter()
            .filter(|s| signals::is_error(&s.observation))
            .find_map(|s| signals::error_category(&s.observation));
        fragment
    }
}
