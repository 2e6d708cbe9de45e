//! Structured observability hooks for orchestrator runs.
//!
//! Provides:
//! - a run-scoped tracing span via the `RunSpan` RAII guard
//! - emission functions for lifecycle events: synthesis, script write and
//!   removal, state transitions, command failures, run completion

use std::path::Path;

use tracing::{info, warn};

use crate::error::CommandFailure;

/// RAII guard that enters a run-scoped tracing span.
///
/// ```ignore
/// let _span = RunSpan::enter("3f1c...");
/// // every event below is tagged with run_id
/// ```
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    pub fn enter(run_id: &str) -> Self {
        let span = tracing::info_span!("backfill.run", run_id = %run_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: commit events synthesized for a date range.
pub fn emit_history_synthesized(count: usize, first: Option<&str>, last: Option<&str>) {
    info!(
        event = "history.synthesized",
        count = count,
        first = first.unwrap_or("-"),
        last = last.unwrap_or("-"),
    );
}

pub fn emit_script_materialized(path: &Path, commit_count: usize) {
    info!(
        event = "script.materialized",
        path = %path.display(),
        commit_count = commit_count,
    );
}

pub fn emit_script_removed(path: &Path) {
    info!(event = "script.removed", path = %path.display());
}

pub fn emit_script_remove_failed(path: &Path, error: &dyn std::fmt::Display) {
    warn!(event = "script.remove_failed", path = %path.display(), error = %error);
}

/// Emit event: the repository moved between orchestrator states.
pub fn emit_transition(from: &str, to: &str) {
    info!(event = "repo.transition", from = from, to = to);
}

/// Emit event: a step was skipped because the repository was already in the target state.
pub fn emit_transition_skipped(state: &str, reason: &str) {
    info!(event = "repo.transition_skipped", state = state, reason = reason);
}

/// Emit event: an external command failed (warning level).
pub fn emit_command_failed(step: &str, failure: &CommandFailure) {
    warn!(
        event = "command.failed",
        step = step,
        command = %failure.command_line(),
        exit_code = failure.exit_code.unwrap_or(-1),
        stderr = %failure.stderr.trim(),
    );
}

pub fn emit_orchestrator_finished(final_state: &str, commits: usize, failures: usize) {
    info!(
        event = "orchestrator.finished",
        final_state = final_state,
        commits = commits,
        failures = failures,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_enter_and_drop() {
        let span = RunSpan::enter("run-1");
        drop(span);
    }

    #[test]
    fn test_emitters_do_not_panic_without_subscriber() {
        emit_history_synthesized(0, None, None);
        emit_script_materialized(Path::new("/tmp/x.sh"), 3);
        emit_script_removed(Path::new("/tmp/x.sh"));
        emit_transition("absent", "initialized");
        emit_transition_skipped("initialized", "marker present");
        emit_command_failed(
            "push",
            &CommandFailure {
                program: "git".to_string(),
                args: vec!["push".to_string()],
                exit_code: Some(1),
                stdout: String::new(),
                stderr: "rejected".to_string(),
            },
        );
        emit_orchestrator_finished("published", 10, 0);
    }
}
