//! In-memory repository backend (testing only)
//!
//! `MemoryBackend` models the repository as a handful of fields and lets tests
//! force any operation to fail. Generated scripts are still real files: the
//! fake reads the script from disk when asked to execute it, so tests can
//! check both its contents and its removal.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::backend::{
    redact_url, CommandOutput, CommandResult, LocalState, RemoteState, RepositoryBackend,
};
use crate::error::CommandFailure;
use crate::script::{GeneratedScript, Identity};

/// Backend operations that mutate the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Initialize,
    ExecuteScript,
    AddRemote,
    SetRemoteUrl,
    ForcePush,
}

impl Operation {
    fn name(&self) -> &'static str {
        match self {
            Operation::Initialize => "initialize",
            Operation::ExecuteScript => "execute-script",
            Operation::AddRemote => "add-remote",
            Operation::SetRemoteUrl => "set-remote-url",
            Operation::ForcePush => "force-push",
        }
    }
}

/// What was last pushed, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushRecord {
    pub remote: String,
    pub branch: String,
    pub commits: usize,
}

#[derive(Debug)]
pub struct MemoryBackend {
    root: PathBuf,
    initialized: bool,
    branch: Option<String>,
    identity: Option<Identity>,
    remotes: BTreeMap<String, String>,
    commits: Vec<String>,
    pushed: Option<PushRecord>,
    failing: HashSet<Operation>,
    log: Vec<Operation>,
    scripts: Vec<String>,
}

impl MemoryBackend {
    /// An absent repository rooted at `root`. Scripts are written there.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            initialized: false,
            branch: None,
            identity: None,
            remotes: BTreeMap::new(),
            commits: Vec::new(),
            pushed: None,
            failing: HashSet::new(),
            log: Vec::new(),
            scripts: Vec::new(),
        }
    }

    /// Start from an already-initialized repository holding one commit.
    pub fn initialized(mut self, branch: &str) -> Self {
        self.initialized = true;
        self.branch = Some(branch.to_string());
        self.commits.push("pre-existing commit".to_string());
        self
    }

    pub fn with_remote(mut self, name: &str, url: &str) -> Self {
        self.remotes.insert(name.to_string(), url.to_string());
        self
    }

    /// Make `op` fail with exit code 1 every time it is attempted.
    pub fn fail_on(mut self, op: Operation) -> Self {
        self.failing.insert(op);
        self
    }

    /// Operations attempted, in order (including failed ones).
    pub fn operations(&self) -> &[Operation] {
        &self.log
    }

    pub fn count(&self, op: Operation) -> usize {
        self.log.iter().filter(|o| **o == op).count()
    }

    pub fn commits(&self) -> &[String] {
        &self.commits
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Unredacted URL of a remote.
    pub fn remote_url(&self, name: &str) -> Option<&str> {
        self.remotes.get(name).map(String::as_str)
    }

    pub fn pushed(&self) -> Option<&PushRecord> {
        self.pushed.as_ref()
    }

    /// Contents of every script executed so far.
    pub fn executed_scripts(&self) -> &[String] {
        &self.scripts
    }

    fn attempt(&mut self, op: Operation) -> Result<(), CommandFailure> {
        self.log.push(op);
        if self.failing.contains(&op) {
            return Err(failure(op, "injected failure"));
        }
        Ok(())
    }
}

fn failure(op: Operation, stderr: &str) -> CommandFailure {
    CommandFailure {
        program: "memory".to_string(),
        args: vec![op.name().to_string()],
        exit_code: Some(1),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

impl RepositoryBackend for MemoryBackend {
    fn root(&self) -> &Path {
        &self.root
    }

    fn probe_local(&self) -> LocalState {
        if self.initialized {
            LocalState::Initialized
        } else {
            LocalState::Absent
        }
    }

    fn probe_remote(&self, remote: &str) -> RemoteState {
        match self.remotes.get(remote) {
            Some(url) => RemoteState::Configured {
                url: redact_url(url),
            },
            None => RemoteState::Missing,
        }
    }

    fn history_length(&self) -> Option<usize> {
        self.initialized.then_some(self.commits.len())
    }

    fn initialize(&mut self, identity: &Identity, branch: &str, message: &str) -> CommandResult {
        self.attempt(Operation::Initialize)?;
        self.initialized = true;
        self.identity = Some(identity.clone());
        self.branch = Some(branch.to_string());
        self.commits.push(message.to_string());
        Ok(CommandOutput::default())
    }

    fn execute_script(&mut self, script: &GeneratedScript) -> CommandResult {
        self.attempt(Operation::ExecuteScript)?;
        if !self.initialized {
            return Err(failure(Operation::ExecuteScript, "not a git repository"));
        }
        let text = std::fs::read_to_string(script.path())
            .map_err(|e| failure(Operation::ExecuteScript, &e.to_string()))?;

        self.commits.extend(
            text.lines()
                .filter(|l| l.starts_with("git commit"))
                .map(str::to_string),
        );
        self.scripts.push(text);
        Ok(CommandOutput::default())
    }

    fn add_remote(&mut self, remote: &str, url: &str) -> CommandResult {
        self.attempt(Operation::AddRemote)?;
        if self.remotes.contains_key(remote) {
            return Err(failure(Operation::AddRemote, "remote already exists"));
        }
        self.remotes.insert(remote.to_string(), url.to_string());
        Ok(CommandOutput::default())
    }

    fn set_remote_url(&mut self, remote: &str, url: &str) -> CommandResult {
        self.attempt(Operation::SetRemoteUrl)?;
        match self.remotes.get_mut(remote) {
            Some(existing) => {
                *existing = url.to_string();
                Ok(CommandOutput::default())
            }
            None => Err(failure(Operation::SetRemoteUrl, "no such remote")),
        }
    }

    fn force_push(&mut self, remote: &str, branch: &str) -> CommandResult {
        self.attempt(Operation::ForcePush)?;
        if !self.remotes.contains_key(remote) {
            return Err(failure(Operation::ForcePush, "no such remote"));
        }
        self.pushed = Some(PushRecord {
            remote: remote.to_string(),
            branch: branch.to_string(),
            commits: self.commits.len(),
        });
        Ok(CommandOutput::default())
    }
}
