use serde::Serialize;

use crate::models::Category;

/// Failures surfaced by the valuation engine.
///
/// `Configuration` is fatal and raised before any network access.
/// `ProviderUnavailable` is scoped to a single source or asset.
/// `PriceNotResolved` means a batched price fetch did not cover an
/// identifier. It applies to the whole category: every holding priced by
/// that batch carries it, naming the identifier that was skipped.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum NetworthError {
    #[error("Invalid inventory: {0}")]
    Configuration(String),

    #[error("Provider {provider} unavailable: {message}")]
    ProviderUnavailable { provider: String, message: String },

    #[error("No {category} price resolved for {identifier:?}")]
    PriceNotResolved {
        category: Category,
        identifier: String,
    },
}

impl NetworthError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Wrap an adapter failure, keeping the whole `anyhow` context chain.
    pub fn provider(provider: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
            message: format!("{err:#}"),
        }
    }
}

pub type Result<T, E = NetworthError> = std::result::Result<T, E>;
