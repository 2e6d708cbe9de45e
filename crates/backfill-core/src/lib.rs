//! Backfill Core Library
//!
//! Synthesizes a plausible commit history over a date range, materializes it
//! as a shell script, and drives a repository from nothing to a force-pushed
//! remote.
//!
//! ## Pipeline
//!
//! - [`temporal`]: irregular walk over the date range producing commit instants
//! - [`vocabulary`]: template-based commit message synthesis
//! - [`script`]: script materialization with a self-deleting artifact guard
//! - [`orchestrator`]: the repository state machine over a [`RepositoryBackend`]

pub mod backend;
pub mod config;
pub mod error;
pub mod event;
pub mod fakes;
pub mod obs;
pub mod orchestrator;
pub mod script;
pub mod source;
pub mod telemetry;
pub mod temporal;
pub mod vocabulary;

pub use backend::{
    redact_url, CommandOutput, CommandResult, GitBackend, LocalState, RemoteState,
    RepositoryBackend,
};
pub use config::{BackfillConfig, TOKEN_ENV};
pub use error::{BackfillError, CommandFailure, Result};
pub use event::{synthesize_history, CommitEvent, TIMESTAMP_FORMAT};
pub use orchestrator::{
    Orchestrator, OrchestratorSettings, RepoState, RunReport, Step, StepFailure,
};
pub use script::{GeneratedScript, Identity, ScriptFormat, ScriptMaterializer};
pub use source::{Draw, Interval, IntervalSource, RandomSource, ScriptedSource};
pub use telemetry::init_tracing;
pub use temporal::{generate, DateRange, DistributionParams, TemporalDistribution};
pub use vocabulary::{CommitVocabulary, MessageSynthesizer};

/// Backfill version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
