//! Repository orchestrator.
//!
//! Drives a repository through `Absent -> Initialized -> RemoteConfigured ->
//! Published`. The starting state is probed, never assumed. History is
//! synthesized in memory first, so configuration errors surface before the
//! repository is touched. External command failures are recorded in the
//! [`RunReport`] instead of aborting, and the generated script is removed on
//! every path once it has been written.
//!
//! Re-running against the same repository skips initialization but appends a
//! fresh synthesized history on top of the existing one.

use std::fmt;
use std::path::PathBuf;

use tracing::debug;

use crate::backend::{LocalState, RemoteState, RepositoryBackend};
use crate::error::{CommandFailure, Result};
use crate::event::{synthesize_history, CommitEvent};
use crate::obs::{self, RunSpan};
use crate::script::{Identity, ScriptMaterializer};
use crate::source::IntervalSource;
use crate::temporal::{DateRange, DistributionParams};
use crate::vocabulary::MessageSynthesizer;

/// Orchestrator view of the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RepoState {
    Absent,
    Initialized,
    RemoteConfigured,
    Published,
}

impl RepoState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepoState::Absent => "absent",
            RepoState::Initialized => "initialized",
            RepoState::RemoteConfigured => "remote_configured",
            RepoState::Published => "published",
        }
    }
}

impl fmt::Display for RepoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The step an external command belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Initialize,
    ExecuteScript,
    ConfigureRemote,
    Push,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Initialize => "initialize",
            Step::ExecuteScript => "execute_script",
            Step::ConfigureRemote => "configure_remote",
            Step::Push => "push",
        }
    }
}

/// A failed external command and the step it was part of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub step: Step,
    pub failure: CommandFailure,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step.as_str(), self.failure)
    }
}

/// Outcome of one orchestrator run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub final_state: RepoState,
    /// True if this run created the repository.
    pub initialized_now: bool,
    /// Commit events synthesized (and scripted) by this run.
    pub commit_events: usize,
    /// Where the script was written, if the run got that far.
    pub script_path: Option<PathBuf>,
    /// Commits reachable from HEAD after the run.
    pub history_length: Option<usize>,
    pub failures: Vec<StepFailure>,
}

impl RunReport {
    fn new(run_id: String, commit_events: usize) -> Self {
        Self {
            run_id,
            final_state: RepoState::Absent,
            initialized_now: false,
            commit_events,
            script_path: None,
            history_length: None,
            failures: Vec::new(),
        }
    }

    /// Published with no failed commands along the way.
    pub fn succeeded(&self) -> bool {
        self.final_state == RepoState::Published && self.failures.is_empty()
    }
}

/// Fixed inputs of an orchestrator run.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub identity: Identity,
    pub branch: String,
    pub remote_name: String,
    /// Push URL; may embed a credential, never logged unredacted.
    pub remote_url: String,
    pub initial_message: String,
    pub range: DateRange,
    pub params: DistributionParams,
}

pub struct Orchestrator<B: RepositoryBackend> {
    backend: B,
    settings: OrchestratorSettings,
    synthesizer: MessageSynthesizer,
    materializer: ScriptMaterializer,
}

impl<B: RepositoryBackend> Orchestrator<B> {
    pub fn new(
        backend: B,
        settings: OrchestratorSettings,
        synthesizer: MessageSynthesizer,
        materializer: ScriptMaterializer,
    ) -> Self {
        Self {
            backend,
            settings,
            synthesizer,
            materializer,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Synthesize the commit events this run would script, without side effects.
    pub fn plan(&self, source: &mut dyn IntervalSource) -> Result<Vec<CommitEvent>> {
        synthesize_history(
            self.settings.range,
            self.settings.params,
            &self.synthesizer,
            source,
        )
    }

    /// Run the full state machine once.
    ///
    /// Returns `Err` only for configuration and filesystem problems; failed
    /// external commands end up in [`RunReport::failures`].
    pub fn run(&mut self, source: &mut dyn IntervalSource) -> Result<RunReport> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let _span = RunSpan::enter(&run_id);

        let events = self.plan(source)?;
        let first = events.first().map(CommitEvent::git_date);
        let last = events.last().map(CommitEvent::git_date);
        obs::emit_history_synthesized(events.len(), first.as_deref(), last.as_deref());

        let mut report = RunReport::new(run_id, events.len());

        let state = self.ensure_initialized(&mut report);
        if state == RepoState::Absent {
            return Ok(self.finish(report, state));
        }

        let state = self.execute_and_publish(&events, &mut report)?;
        Ok(self.finish(report, state))
    }

    fn ensure_initialized(&mut self, report: &mut RunReport) -> RepoState {
        if self.backend.probe_local() == LocalState::Initialized {
            obs::emit_transition_skipped(
                RepoState::Initialized.as_str(),
                "repository marker present",
            );
            return RepoState::Initialized;
        }

        let s = &self.settings;
        match self
            .backend
            .initialize(&s.identity, &s.branch, &s.initial_message)
        {
            Ok(_) => {
                report.initialized_now = true;
                transition(RepoState::Absent, RepoState::Initialized)
            }
            Err(failure) => {
                record(report, Step::Initialize, failure);
                RepoState::Absent
            }
        }
    }

    fn execute_and_publish(
        &mut self,
        events: &[CommitEvent],
        report: &mut RunReport,
    ) -> Result<RepoState> {
        // Dropping `script` removes it from disk, whichever way this returns.
        let script = self.materializer.materialize(
            self.backend.root(),
            events,
            &self.settings.identity,
        )?;
        report.script_path = Some(script.path().to_path_buf());

        if let Err(failure) = self.backend.execute_script(&script) {
            record(report, Step::ExecuteScript, failure);
        }

        let remote = self.settings.remote_name.as_str();
        let url = self.settings.remote_url.as_str();
        let configured = match self.backend.probe_remote(remote) {
            RemoteState::Missing => self.backend.add_remote(remote, url),
            RemoteState::Configured { url: current } => {
                debug!(remote = remote, current = %current, "updating existing remote");
                self.backend.set_remote_url(remote, url)
            }
        };
        if let Err(failure) = configured {
            record(report, Step::ConfigureRemote, failure);
            return Ok(RepoState::Initialized);
        }
        let state = transition(RepoState::Initialized, RepoState::RemoteConfigured);

        match self.backend.force_push(remote, &self.settings.branch) {
            Ok(_) => Ok(transition(state, RepoState::Published)),
            Err(failure) => {
                record(report, Step::Push, failure);
                Ok(state)
            }
        }
    }

    fn finish(&self, mut report: RunReport, state: RepoState) -> RunReport {
        report.final_state = state;
        report.history_length = self.backend.history_length();
        obs::emit_orchestrator_finished(
            state.as_str(),
            report.commit_events,
            report.failures.len(),
        );
        report
    }
}

fn transition(from: RepoState, to: RepoState) -> RepoState {
    obs::emit_transition(from.as_str(), to.as_str());
    to
}

fn record(report: &mut RunReport, step: Step, failure: CommandFailure) {
    obs::emit_command_failed(step.as_str(), &failure);
    report.failures.push(StepFailure { step, failure });
}
