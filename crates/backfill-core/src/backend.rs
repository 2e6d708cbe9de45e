//! Repository backends.
//!
//! The orchestrator never inspects a repository directly. It asks a
//! [`RepositoryBackend`] for the local and remote state and issues commands
//! through it, so the state machine can run against real `git` or against the
//! in-memory fake in [`crate::fakes`].

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::CommandFailure;
use crate::script::{GeneratedScript, Identity, ScriptFormat};

/// Whether a local repository marker exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalState {
    Absent,
    Initialized,
}

/// Whether the named remote is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteState {
    Missing,
    /// Configured, with the current URL (credentials redacted).
    Configured { url: String },
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

pub type CommandResult = std::result::Result<CommandOutput, CommandFailure>;

/// External repository operations used by the orchestrator.
pub trait RepositoryBackend {
    /// Directory the repository lives in; scripts are written here.
    fn root(&self) -> &Path;

    fn probe_local(&self) -> LocalState;

    fn probe_remote(&self, remote: &str) -> RemoteState;

    /// Number of commits reachable from HEAD, if it can be determined.
    fn history_length(&self) -> Option<usize>;

    /// Create the repository, set identity and branch, and make the initial commit.
    fn initialize(&mut self, identity: &Identity, branch: &str, message: &str) -> CommandResult;

    /// Run a generated script inside the repository.
    fn execute_script(&mut self, script: &GeneratedScript) -> CommandResult;

    fn add_remote(&mut self, remote: &str, url: &str) -> CommandResult;

    fn set_remote_url(&mut self, remote: &str, url: &str) -> CommandResult;

    /// Push `branch` to `remote`, overwriting remote history.
    fn force_push(&mut self, remote: &str, branch: &str) -> CommandResult;
}

/// Hide any `user:password@` / `token@` part of a URL.
pub fn redact_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let authority_start = scheme_end + 3;
    let authority_end = url[authority_start..]
        .find('/')
        .map(|i| authority_start + i)
        .unwrap_or(url.len());

    match url[authority_start..authority_end].rfind('@') {
        Some(at) => format!(
            "{}***{}",
            &url[..authority_start],
            &url[authority_start + at..]
        ),
        None => url.to_string(),
    }
}

/// Backend driving the `git` executable in a working directory.
#[derive(Debug, Clone)]
pub struct GitBackend {
    root: PathBuf,
}

impl GitBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn run(&self, program: &str, args: &[&str]) -> CommandResult {
        let shown: Vec<String> = args.iter().map(|a| redact_url(a)).collect();
        debug!(command = %format!("{program} {}", shown.join(" ")), "running");

        let output = Command::new(program)
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| CommandFailure {
                program: program.to_string(),
                args: shown.clone(),
                exit_code: None,
                stdout: String::new(),
                stderr: format!("failed to run {program}: {e}"),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(CommandFailure {
                program: program.to_string(),
                args: shown,
                exit_code: output.status.code(),
                stdout,
                stderr,
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }

    fn git(&self, args: &[&str]) -> CommandResult {
        self.run("git", args)
    }
}

impl RepositoryBackend for GitBackend {
    fn root(&self) -> &Path {
        &self.root
    }

    fn probe_local(&self) -> LocalState {
        if self.root.join(".git").exists() {
            LocalState::Initialized
        } else {
            LocalState::Absent
        }
    }

    fn probe_remote(&self, remote: &str) -> RemoteState {
        match self.git(&["remote", "get-url", remote]) {
            Ok(out) => RemoteState::Configured {
                url: redact_url(out.stdout.trim()),
            },
            Err(_) => RemoteState::Missing,
        }
    }

    fn history_length(&self) -> Option<usize> {
        self.git(&["rev-list", "--count", "HEAD"])
            .ok()
            .and_then(|out| out.stdout.trim().parse().ok())
    }

    fn initialize(&mut self, identity: &Identity, branch: &str, message: &str) -> CommandResult {
        let head = format!("refs/heads/{branch}");
        self.git(&["init"])?;
        self.git(&["config", "user.name", &identity.name])?;
        self.git(&["config", "user.email", &identity.email])?;
        self.git(&["symbolic-ref", "HEAD", &head])?;
        self.git(&["add", "."])?;
        self.git(&["commit", "--allow-empty", "-m", message])
    }

    fn execute_script(&mut self, script: &GeneratedScript) -> CommandResult {
        // Commands run inside `root`, so a relative root must not be applied twice.
        let path = script
            .path()
            .strip_prefix(&self.root)
            .unwrap_or(script.path())
            .to_string_lossy()
            .to_string();
        match script.format() {
            ScriptFormat::Sh => self.run("sh", &[&path]),
            ScriptFormat::Cmd => self.run("cmd", &["/C", "call", &path]),
        }
    }

    fn add_remote(&mut self, remote: &str, url: &str) -> CommandResult {
        self.git(&["remote", "add", remote, url])
    }

    fn set_remote_url(&mut self, remote: &str, url: &str) -> CommandResult {
        self.git(&["remote", "set-url", remote, url])
    }

    fn force_push(&mut self, remote: &str, branch: &str) -> CommandResult {
        self.git(&["push", "-u", remote, branch, "--force"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::CommitEvent;
    use crate::script::ScriptMaterializer;
    use chrono::NaiveDate;

    fn identity() -> Identity {
        Identity::new("test-user", "test@example.com")
    }

    fn events(messages: &[&str]) -> Vec<CommitEvent> {
        let day = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        messages
            .iter()
            .enumerate()
            .map(|(i, m)| CommitEvent::new(day.and_hms_opt(9 + i as u32, 0, 0).unwrap(), *m))
            .collect()
    }

    fn materializer() -> ScriptMaterializer {
        ScriptMaterializer::new(ScriptFormat::Sh, "batch_commits.sh")
    }

    #[test]
    fn redact_url_hides_token() {
        assert_eq!(
            redact_url("https://ghp_secret@github.com/owner/repo.git"),
            "https://***@github.com/owner/repo.git"
        );
        assert_eq!(
            redact_url("https://user:pw@example.com"),
            "https://***@example.com"
        );
    }

    #[test]
    fn redact_url_leaves_plain_urls() {
        assert_eq!(
            redact_url("https://github.com/owner/repo.git"),
            "https://github.com/owner/repo.git"
        );
        assert_eq!(redact_url("/tmp/remote.git"), "/tmp/remote.git");
        assert_eq!(
            redact_url("https://github.com/a@b/repo"),
            "https://github.com/a@b/repo"
        );
    }

    #[test]
    fn probe_local_absent_for_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let backend = GitBackend::new(dir.path());
        assert_eq!(backend.probe_local(), LocalState::Absent);
        assert_eq!(backend.history_length(), None);
    }

    #[test]
    fn initialize_creates_one_commit_on_branch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.md"), "hello\n").unwrap();
        let mut backend = GitBackend::new(dir.path());

        backend
            .initialize(&identity(), "main", "Initial commit")
            .unwrap();

        assert_eq!(backend.probe_local(), LocalState::Initialized);
        assert_eq!(backend.history_length(), Some(1));
        let head = backend.git(&["rev-parse", "--abbrev-ref", "HEAD"]).unwrap();
        assert_eq!(head.stdout.trim(), "main");
    }

    #[test]
    fn remote_add_then_set_url() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = GitBackend::new(dir.path());
        backend.initialize(&identity(), "main", "init").unwrap();

        assert_eq!(backend.probe_remote("origin"), RemoteState::Missing);
        backend
            .add_remote("origin", "https://tok@example.com/a.git")
            .unwrap();
        assert_eq!(
            backend.probe_remote("origin"),
            RemoteState::Configured {
                url: "https://***@example.com/a.git".to_string()
            }
        );
        backend
            .set_remote_url("origin", "https://example.com/b.git")
            .unwrap();
        assert_eq!(
            backend.probe_remote("origin"),
            RemoteState::Configured {
                url: "https://example.com/b.git".to_string()
            }
        );
    }

    #[test]
    fn execute_script_replays_commits() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = GitBackend::new(dir.path());
        backend.initialize(&identity(), "main", "init").unwrap();

        let script = materializer()
            .materialize(backend.root(), &events(&["one", "two"]), &identity())
            .unwrap();
        backend.execute_script(&script).unwrap();

        assert_eq!(backend.history_length(), Some(3));
    }

    #[test]
    fn execute_script_with_relative_root() {
        let dir = tempfile::tempdir_in(".").unwrap();
        let relative = PathBuf::from(dir.path().file_name().unwrap());
        assert!(relative.is_relative());

        let mut backend = GitBackend::new(&relative);
        backend.initialize(&identity(), "main", "init").unwrap();
        let script = materializer()
            .materialize(backend.root(), &events(&["one", "two"]), &identity())
            .unwrap();

        backend
            .execute_script(&script)
            .expect("script under a relative root should run");
        assert_eq!(backend.history_length(), Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn rejected_commit_fails_the_script() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let mut backend = GitBackend::new(dir.path());
        backend.initialize(&identity(), "main", "init").unwrap();

        let hook = dir.path().join(".git/hooks/commit-msg");
        std::fs::create_dir_all(hook.parent().unwrap()).unwrap();
        std::fs::write(&hook, "#!/bin/sh\nif grep -q BAD \"$1\"; then exit 1; fi\n").unwrap();
        std::fs::set_permissions(&hook, std::fs::Permissions::from_mode(0o755)).unwrap();

        let script = materializer()
            .materialize(backend.root(), &events(&["ok1", "BAD", "ok3"]), &identity())
            .unwrap();
        let err = backend
            .execute_script(&script)
            .expect_err("rejected commit should fail the script");

        assert_eq!(err.program, "sh");
        assert!(err.exit_code.is_some());
        assert_ne!(err.exit_code, Some(0));
        // init + ok1; the script stops before ok3
        assert_eq!(backend.history_length(), Some(2));
    }

    #[test]
    fn failing_command_captures_exit_code_and_redacts() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = GitBackend::new(dir.path());
        backend.initialize(&identity(), "main", "init").unwrap();

        let err = backend
            .force_push("nowhere", "main")
            .expect_err("push to unknown remote should fail");
        assert_eq!(err.program, "git");
        assert!(err.exit_code.is_some());
        assert_ne!(err.exit_code, Some(0));

        let err = backend
            .add_remote("bad name with spaces", "https://tok@example.com/x.git")
            .expect_err("invalid remote name should fail");
        assert!(err.args.iter().all(|a| !a.contains("tok@")));
    }
}
