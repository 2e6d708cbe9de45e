//! Run configuration.
//!
//! Defaults reproduce the stock behaviour (2022-01-01 to today, gaps of 1-3
//! days, 1-2 commits per active day between 09:00 and 21:59). A TOML file can
//! override any field; the CLI layers flags and environment variables on top.
//!
//! ```toml
//! repo_path = "."
//! branch = "main"
//! owner = "octocat"
//! repo_name = "hello-world"
//! start = "2022-01-01"
//! end = "2024-06-30"
//!
//! [identity]
//! name = "Octo Cat"
//! email = "octocat@example.com"
//!
//! [distribution]
//! gap_days = { min = 1, max = 3 }
//! commits_per_day = { min = 1, max = 2 }
//! working_hours = { min = 9, max = 21 }
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{BackfillError, Result};
use crate::orchestrator::OrchestratorSettings;
use crate::script::{Identity, ScriptFormat, ScriptMaterializer};
use crate::temporal::{DateRange, DistributionParams};
use crate::vocabulary::{CommitVocabulary, MessageSynthesizer};

/// Environment variable holding the hosting provider token.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Base name of the generated script; the extension follows the format.
pub const DEFAULT_SCRIPT_STEM: &str = "batch_commits";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackfillConfig {
    /// Repository working directory.
    pub repo_path: PathBuf,
    pub identity: Identity,
    pub branch: String,
    pub remote_name: String,
    /// Explicit push URL. When absent, one is derived from `remote_host`,
    /// `owner` and `repo_name`, which requires a token.
    pub remote_url: Option<String>,
    pub remote_host: String,
    pub owner: Option<String>,
    pub repo_name: Option<String>,
    /// Description used when creating the remote repository.
    pub description: String,
    pub private: bool,
    pub start: NaiveDate,
    /// Last day of the range; today when absent.
    pub end: Option<NaiveDate>,
    pub distribution: DistributionParams,
    pub script_format: ScriptFormat,
    pub script_name: Option<String>,
    pub initial_message: String,
    /// Replaces the built-in vocabulary when present.
    pub vocabulary: Option<CommitVocabulary>,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            repo_path: PathBuf::from("."),
            identity: Identity::new("Backfill", "backfill@users.noreply.github.com"),
            branch: "main".to_string(),
            remote_name: "origin".to_string(),
            remote_url: None,
            remote_host: "github.com".to_string(),
            owner: None,
            repo_name: None,
            description: String::new(),
            private: false,
            start: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap_or_default(),
            end: None,
            distribution: DistributionParams::default(),
            script_format: ScriptFormat::default(),
            script_name: None,
            initial_message: "Initial commit".to_string(),
            vocabulary: None,
        }
    }
}

impl BackfillConfig {
    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            BackfillError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Ok(toml::from_str(&text)?)
    }

    /// Load `path` if given, otherwise the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    /// Check everything that can be checked without touching the repository.
    pub fn validate(&self, today: NaiveDate) -> Result<()> {
        self.date_range(today)?;
        self.distribution.validate()?;
        self.synthesizer()?;

        if self.identity.name.trim().is_empty() || self.identity.email.trim().is_empty() {
            return Err(BackfillError::Configuration(
                "identity name and email must not be empty".to_string(),
            ));
        }
        if self.branch.trim().is_empty() || self.remote_name.trim().is_empty() {
            return Err(BackfillError::Configuration(
                "branch and remote_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn date_range(&self, today: NaiveDate) -> Result<DateRange> {
        DateRange::new(self.start, self.end.unwrap_or(today))
    }

    pub fn script_file_name(&self) -> String {
        self.script_name.clone().unwrap_or_else(|| {
            format!("{DEFAULT_SCRIPT_STEM}.{}", self.script_format.extension())
        })
    }

    pub fn materializer(&self) -> ScriptMaterializer {
        ScriptMaterializer::new(self.script_format, self.script_file_name())
    }

    pub fn synthesizer(&self) -> Result<MessageSynthesizer> {
        match &self.vocabulary {
            Some(vocabulary) => MessageSynthesizer::new(vocabulary),
            None => MessageSynthesizer::with_defaults(),
        }
    }

    /// `owner/repo_name`, if both are configured.
    pub fn repository_slug(&self) -> Option<String> {
        match (&self.owner, &self.repo_name) {
            (Some(owner), Some(repo)) => Some(format!("{owner}/{repo}")),
            _ => None,
        }
    }

    /// Web URL of the remote repository (no credentials).
    pub fn repository_web_url(&self) -> Option<String> {
        self.repository_slug()
            .map(|slug| format!("https://{}/{slug}", self.remote_host))
    }

    /// The URL to push to.
    ///
    /// An explicit `remote_url` wins and needs no token. Otherwise the URL is
    /// derived from `owner`/`repo_name` and embeds `token`, whose absence is
    /// a [`BackfillError::MissingCredential`].
    pub fn resolve_remote_url(&self, token: Option<&str>) -> Result<String> {
        if let Some(url) = &self.remote_url {
            return Ok(url.clone());
        }

        let slug = self.repository_slug().ok_or_else(|| {
            BackfillError::Configuration(
                "either remote_url or both owner and repo_name must be set".to_string(),
            )
        })?;

        match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => Ok(format!("https://{token}@{}/{slug}.git", self.remote_host)),
            None => Err(BackfillError::MissingCredential(TOKEN_ENV.to_string())),
        }
    }

    /// Everything the orchestrator needs, validated.
    pub fn orchestrator_settings(
        &self,
        today: NaiveDate,
        remote_url: String,
    ) -> Result<OrchestratorSettings> {
        self.validate(today)?;
        Ok(OrchestratorSettings {
            identity: self.identity.clone(),
            branch: self.branch.clone(),
            remote_name: self.remote_name.clone(),
            remote_url,
            initial_message: self.initial_message.clone(),
            range: self.date_range(today)?,
            params: self.distribution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Interval;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    #[test]
    fn test_defaults_validate() {
        let cfg = BackfillConfig::default();
        cfg.validate(today()).unwrap();
        assert_eq!(cfg.script_file_name(), "batch_commits.sh");
        let range = cfg.date_range(today()).unwrap();
        assert_eq!(range.start(), NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
        assert_eq!(range.end(), today());
    }

    #[test]
    fn test_parse_toml() {
        let text = r#"
            owner = "octocat"
            repo_name = "hello"
            start = "2023-02-01"
            end = "2023-03-01"
            script_format = "cmd"

            [identity]
            name = "Octo"
            email = "octo@example.com"

            [distribution]
            gap_days = { min = 2, max = 4 }
        "#;
        let cfg: BackfillConfig = toml::from_str(text).unwrap();
        assert_eq!(cfg.owner.as_deref(), Some("octocat"));
        assert_eq!(cfg.identity.name, "Octo");
        assert_eq!(cfg.distribution.gap_days, Interval { min: 2, max: 4 });
        // unspecified nested fields keep their defaults
        assert_eq!(cfg.distribution.commits_per_day, Interval { min: 1, max: 2 });
        assert_eq!(cfg.script_file_name(), "batch_commits.bat");
        assert_eq!(cfg.branch, "main");
        cfg.validate(today()).unwrap();
    }

    #[test]
    fn test_vocabulary_override_is_checked() {
        let text = r#"
            [vocabulary]
            templates = ["fix: {nope}"]
            [vocabulary.slots]
            component = ["Queue"]
        "#;
        let cfg: BackfillConfig = toml::from_str(text).unwrap();
        assert!(matches!(
            cfg.validate(today()),
            Err(BackfillError::UndefinedSlot { .. })
        ));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let cfg = BackfillConfig {
            start: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(today()),
            Err(BackfillError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_remote_url_explicit_needs_no_token() {
        let cfg = BackfillConfig {
            remote_url: Some("/srv/git/remote.git".to_string()),
            ..Default::default()
        };
        assert_eq!(cfg.resolve_remote_url(None).unwrap(), "/srv/git/remote.git");
    }

    #[test]
    fn test_remote_url_derived_requires_token() {
        let cfg = BackfillConfig {
            owner: Some("octocat".to_string()),
            repo_name: Some("hello".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            cfg.resolve_remote_url(None),
            Err(BackfillError::MissingCredential(ref v)) if v == TOKEN_ENV
        ));
        assert!(cfg.resolve_remote_url(Some("  ")).is_err());
        assert_eq!(
            cfg.resolve_remote_url(Some("tok")).unwrap(),
            "https://tok@github.com/octocat/hello.git"
        );
        assert_eq!(
            cfg.repository_web_url().as_deref(),
            Some("https://github.com/octocat/hello")
        );
    }

    #[test]
    fn test_remote_url_without_target_is_configuration_error() {
        let cfg = BackfillConfig::default();
        assert!(matches!(
            cfg.resolve_remote_url(Some("tok")),
            Err(BackfillError::Configuration(_))
        ));
    }

    #[test]
    fn test_from_file_missing_is_configuration_error() {
        let err = BackfillConfig::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.is_configuration());
    }
}
