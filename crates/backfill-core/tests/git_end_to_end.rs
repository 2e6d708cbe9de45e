//! End-to-end runs against real `git`, pushing to a local bare repository.

use backfill_core::{
    DateRange, DistributionParams, GitBackend, Identity, MessageSynthesizer, Orchestrator,
    OrchestratorSettings, RandomSource, RepoState, ScriptFormat, ScriptMaterializer, Step,
};
use chrono::NaiveDate;
use std::path::Path;
use std::process::Command;

fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn settings(remote_url: &str) -> OrchestratorSettings {
    OrchestratorSettings {
        identity: Identity::new("test-user", "test@example.com"),
        branch: "main".to_string(),
        remote_name: "origin".to_string(),
        remote_url: remote_url.to_string(),
        initial_message: "Initial commit".to_string(),
        range: DateRange::new(
            NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2022, 1, 20).unwrap(),
        )
        .unwrap(),
        params: DistributionParams::default(),
    }
}

fn orchestrator(work: &Path, remote_url: &str) -> Orchestrator<GitBackend> {
    Orchestrator::new(
        GitBackend::new(work),
        settings(remote_url),
        MessageSynthesizer::with_defaults().unwrap(),
        ScriptMaterializer::new(ScriptFormat::Sh, "batch_commits.sh"),
    )
}

fn bare_remote() -> tempfile::TempDir {
    let remote = tempfile::tempdir().unwrap();
    run_git(remote.path(), &["init", "--bare"]);
    remote
}

#[test]
fn publishes_backdated_history_to_bare_remote() {
    let work = tempfile::tempdir().unwrap();
    std::fs::write(work.path().join("README.md"), "# project\n").unwrap();
    let remote = bare_remote();
    let remote_url = remote.path().to_string_lossy().to_string();

    let mut orch = orchestrator(work.path(), &remote_url);
    let report = orch.run(&mut RandomSource::seeded(21)).unwrap();

    assert!(report.succeeded(), "failures: {:?}", report.failures);
    assert_eq!(report.final_state, RepoState::Published);
    assert!(!work.path().join("batch_commits.sh").exists());

    let count: usize = run_git(remote.path(), &["rev-list", "--count", "main"])
        .parse()
        .unwrap();
    assert_eq!(count, 1 + report.commit_events);
    assert_eq!(report.history_length, Some(count));

    // author and committer dates are the synthesized ones
    let dates = run_git(work.path(), &["log", "--format=%ad|%cd", "--date=short", "-n", "1"]);
    let (author, committer) = dates.split_once('|').unwrap();
    assert_eq!(author, committer);
    assert!(author.starts_with("2022-01-"), "unexpected date {author}");

    let author = run_git(work.path(), &["log", "--format=%an <%ae>", "-n", "1"]);
    assert_eq!(author, "test-user <test@example.com>");
}

#[test]
fn second_run_appends_without_new_initial_commit() {
    let work = tempfile::tempdir().unwrap();
    let remote = bare_remote();
    let remote_url = remote.path().to_string_lossy().to_string();

    let first = orchestrator(work.path(), &remote_url)
        .run(&mut RandomSource::seeded(1))
        .unwrap();
    let second = orchestrator(work.path(), &remote_url)
        .run(&mut RandomSource::seeded(2))
        .unwrap();

    assert!(first.initialized_now);
    assert!(!second.initialized_now);
    assert!(second.succeeded(), "failures: {:?}", second.failures);

    let subjects = run_git(work.path(), &["log", "--format=%s", "main"]);
    let initial = subjects.lines().filter(|s| *s == "Initial commit").count();
    assert_eq!(initial, 1);
    assert_eq!(
        subjects.lines().count(),
        1 + first.commit_events + second.commit_events
    );
}

#[test]
fn unreachable_remote_reports_push_failure_and_cleans_up() {
    let work = tempfile::tempdir().unwrap();
    let missing = work.path().join("no-such-remote.git");
    let remote_url = missing.to_string_lossy().to_string();

    let report = orchestrator(work.path(), &remote_url)
        .run(&mut RandomSource::seeded(4))
        .unwrap();

    assert_eq!(report.final_state, RepoState::RemoteConfigured);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].step, Step::Push);
    assert!(report.failures[0].failure.exit_code.is_some());
    assert!(!work.path().join("batch_commits.sh").exists());
}
