use hindsight_core::signals;

use crate::trajectory::RawTrajectory;

const TASK_EXCERPT_CHARS: usize = 100;

/// One-line natural-language summary of a trajectory.
pub fn summarize(raw: &RawTrajectory, action_limit: usize) -> String {
    let outcome = if raw.success { "succeeded" } else { "failed" };
    let actions = signals::first_distinct(raw.steps.iter().map(|s| s.action.as_str()), action_limit);
    let task: String = raw.problem_statement.chars().take(TASK_EXCERPT_CHARS).collect();

    let mut summary = format!(
        "Trajectory {outcome} after {} steps. Actions: {}.",
        raw.total_steps(),
        actions.join(", ")
    );
    if !task.trim().is_empty() {
        summary.push_str(&format!(" Task: {}", task.trim()));
    }
    summary
}
