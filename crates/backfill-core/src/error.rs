//! Error taxonomy for Backfill.
//!
//! Configuration problems are fatal and surface before anything touches a
//! repository. External command failures are operational: the orchestrator
//! records them as [`CommandFailure`] values and keeps going to cleanup.

use std::fmt;

/// A non-zero exit (or spawn failure) of an external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    /// Program that was invoked (`git`, `sh`, ...).
    pub program: String,

    /// Arguments, with credentials redacted.
    pub args: Vec<String>,

    /// Exit code, `None` if the process could not be spawned or was killed.
    pub exit_code: Option<i32>,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr (or the spawn error).
    pub stderr: String,
}

impl CommandFailure {
    /// The command line as it would be typed, for diagnostics.
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "`{}` exited with {code}", self.command_line())?,
            None => write!(f, "`{}` did not run to completion", self.command_line())?,
        }
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            write!(f, ": {stderr}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CommandFailure {}

/// Backfill errors.
#[derive(Debug, thiserror::Error)]
pub enum BackfillError {
    #[error("undefined vocabulary slot `{slot}` in template {template:?}")]
    UndefinedSlot { template: String, slot: String },

    #[error("malformed template {template:?}: {reason}")]
    MalformedTemplate { template: String, reason: String },

    #[error("empty vocabulary: {0}")]
    EmptyVocabulary(String),

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("invalid {name} interval {min}..={max}")]
    InvalidInterval { name: String, min: u32, max: u32 },

    #[error("missing required credential: {0} is not set")]
    MissingCredential(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("external command failed: {0}")]
    ExternalCommand(#[from] CommandFailure),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackfillError {
    /// Whether this error belongs to the configuration class (fatal, raised
    /// before any mutating action).
    pub fn is_configuration(&self) -> bool {
        !matches!(self, BackfillError::ExternalCommand(_) | BackfillError::Io(_))
    }
}

/// Result type for Backfill operations.
pub type Result<T> = std::result::Result<T, BackfillError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(exit_code: Option<i32>, stderr: &str) -> CommandFailure {
        CommandFailure {
            program: "git".to_string(),
            args: vec!["push".to_string(), "origin".to_string()],
            exit_code,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn test_command_failure_display_includes_exit_code_and_stderr() {
        let msg = failure(Some(128), "fatal: no remote\n").to_string();
        assert!(msg.contains("git push origin"));
        assert!(msg.contains("128"));
        assert!(msg.contains("fatal: no remote"));
        assert!(!msg.ends_with('\n'));
    }

    #[test]
    fn test_command_failure_without_exit_code() {
        let msg = failure(None, "").to_string();
        assert!(msg.contains("did not run to completion"));
    }

    #[test]
    fn test_undefined_slot_error() {
        let err = BackfillError::UndefinedSlot {
            template: "fix: {bogus}".to_string(),
            slot: "bogus".to_string(),
        };
        assert!(err.to_string().contains("undefined vocabulary slot"));
        assert!(err.to_string().contains("bogus"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_external_command_is_not_configuration() {
        let err = BackfillError::from(failure(Some(1), "boom"));
        assert!(!err.is_configuration());
        assert!(err.to_string().contains("external command failed"));
    }
}
