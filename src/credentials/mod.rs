//! Credential lookup for provider adapters.
//!
//! Adapters ask for logical keys (`api_key`, `api_secret`, `key_name`,
//! `private_key`); the configured backend decides where they live.
//!
//! ```toml
//! [providers.gemini.credentials]
//! backend = "pass"
//! path = "finance/gemini"
//!
//! [providers.gemini.credentials.fields]
//! api_secret = "secret"
//! ```

mod config;
mod env;
mod pass;

pub use config::CredentialConfig;
pub use env::{EnvCredentialStore, StaticCredentialStore};
pub use pass::{PassConfig, PassCredentialStore};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use secrecy::SecretString;

/// Read-only key-value store for provider secrets.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Retrieve a credential by key.
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    /// Returns `Err` if there was an error accessing the backend.
    async fn get(&self, key: &str) -> Result<Option<SecretString>>;

    /// Like [`CredentialStore::get`] but a missing key is an error.
    async fn require(&self, key: &str) -> Result<SecretString> {
        self.get(key)
            .await?
            .ok_or_else(|| anyhow!("missing credential {key:?}"))
    }
}
