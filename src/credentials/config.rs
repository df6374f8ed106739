//! Credential backend selection.

use serde::{Deserialize, Serialize};

use super::{CredentialStore, EnvCredentialStore, PassConfig, PassCredentialStore};

/// Which backend holds a provider's secrets.
///
/// ```toml
/// credentials = { backend = "env", prefix = "COINBASE" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum CredentialConfig {
    /// Environment variables named `<PREFIX>_<KEY>`.
    Env { prefix: String },
    /// Password-store (pass) backend.
    Pass {
        #[serde(flatten)]
        config: PassConfig,
    },
}

impl CredentialConfig {
    pub fn env(prefix: impl Into<String>) -> Self {
        CredentialConfig::Env {
            prefix: prefix.into(),
        }
    }

    /// Build a credential store from this configuration.
    pub fn build(&self) -> Box<dyn CredentialStore> {
        match self {
            CredentialConfig::Env { prefix } => Box::new(EnvCredentialStore::new(prefix.clone())),
            CredentialConfig::Pass { config } => {
                Box::new(PassCredentialStore::new(config.clone()))
            }
        }
    }
}
