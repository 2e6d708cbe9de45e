//! Repository creation over the provider REST API.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ForgeError;
use crate::Result;

/// Public API endpoint used when none is configured.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

const API_VERSION: &str = "2022-11-28";

/// Provider client configuration
#[derive(Clone)]
pub struct ForgeConfig {
    /// API base URL, without trailing slash
    pub api_base: String,
    /// Bearer token
    pub token: String,
}

impl fmt::Debug for ForgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForgeConfig")
            .field("api_base", &self.api_base)
            .field("token", &"***")
            .finish()
    }
}

impl ForgeConfig {
    pub fn new(api_base: &str, token: &str) -> Self {
        ForgeConfig {
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// Read `GITHUB_TOKEN` (and optional `GITHUB_API_URL`) from the environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`ForgeConfig::from_env`] with a custom variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let token = lookup(TOKEN_ENV)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ForgeError::MissingToken(TOKEN_ENV.to_string()))?;
        let api_base = lookup("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        Ok(Self::new(&api_base, token.trim()))
    }
}

/// Body of a create-repository request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRepository {
    pub name: String,
    pub description: String,
    pub private: bool,
    /// Always false: the pushed history must be the only history.
    pub auto_init: bool,
}

impl NewRepository {
    pub fn new(name: &str, description: &str, private: bool) -> Self {
        NewRepository {
            name: name.to_string(),
            description: description.to_string(),
            private,
            auto_init: false,
        }
    }
}

/// Successful outcome of a create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Creation {
    Created,
    /// The provider reported 422; the message it gave, if any.
    AlreadyExists { message: String },
}

/// Something that can create remote repositories.
#[async_trait]
pub trait RepositoryProvider: Send + Sync {
    async fn create_repository(&self, repo: &NewRepository) -> Result<Creation>;
}

#[derive(Deserialize)]
struct ApiMessage {
    message: Option<String>,
}

/// Map a create-repository response to an outcome.
///
/// 201 is created, 422 is treated as "already exists", anything else is an
/// [`ForgeError::Api`] carrying the body.
pub fn classify_response(status: u16, body: &str) -> Result<Creation> {
    match status {
        201 => Ok(Creation::Created),
        422 => {
            let message = serde_json::from_str::<ApiMessage>(body)
                .ok()
                .and_then(|m| m.message)
                .unwrap_or_else(|| body.trim().to_string());
            Ok(Creation::AlreadyExists { message })
        }
        _ => Err(ForgeError::Api {
            status,
            body: body.to_string(),
        }),
    }
}

/// REST client for the hosting provider
pub struct ForgeClient {
    config: ForgeConfig,
    http_client: reqwest::Client,
}

impl ForgeClient {
    pub fn new(config: ForgeConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("backfill-forge-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(ForgeClient {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ForgeConfig::from_env()?)
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }
}

#[async_trait]
impl RepositoryProvider for ForgeClient {
    async fn create_repository(&self, repo: &NewRepository) -> Result<Creation> {
        let url = format!("{}/user/repos", self.config.api_base);
        info!(name = %repo.name, private = repo.private, "creating repository");

        let response = self
            .http_client
            .post(&url)
            .header("Accept", "application/vnd.github+json")
            .bearer_auth(&self.config.token)
            .header("X-GitHub-Api-Version", API_VERSION)
            .json(repo)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        let outcome = classify_response(status, &body);
        match &outcome {
            Ok(Creation::Created) => info!(name = %repo.name, "repository created"),
            Ok(Creation::AlreadyExists { message }) => {
                info!(name = %repo.name, message = %message, "repository already exists")
            }
            Err(e) => warn!(name = %repo.name, error = %e, "repository creation failed"),
        }
        outcome
    }
}
