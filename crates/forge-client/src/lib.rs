//! Forge-Client: hosting provider integration for Backfill
//!
//! Creates the remote repository that a synthesized history is pushed to.
//! Creation is idempotent from the caller's point of view: "already exists"
//! counts as success.

pub mod client;
pub mod error;

pub use client::{
    classify_response, Creation, ForgeClient, ForgeConfig, NewRepository, RepositoryProvider,
    DEFAULT_API_BASE, TOKEN_ENV,
};
pub use error::ForgeError;

/// Result type for forge-client operations
pub type Result<T> = std::result::Result<T, ForgeError>;
