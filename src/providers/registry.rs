use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use super::{
    BalanceSource, BlockstreamBalanceSource, CoinGeckoPriceSource, CoinbaseBalanceSource,
    CryptoOrgBalanceSource, EtherscanBalanceSource, GeminiBalanceSource, MetalsLivePriceSource,
    PriceSource, RateGate, TwelveDataPriceSource,
};
use crate::config::{ProviderSettings, ProvidersConfig};
use crate::credentials::CredentialStore;
use crate::duration::format_duration;
use crate::models::Category;

/// The adapters available to one valuation run.
///
/// Price sources are keyed by the category whose batch they serve; balance
/// sources by provider name (`coinbase`, `etherscan`, ...).
#[derive(Default, Clone)]
pub struct ProviderSet {
    prices: HashMap<Category, Arc<dyn PriceSource>>,
    balances: HashMap<String, Arc<dyn BalanceSource>>,
}

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price_source(mut self, category: Category, source: Arc<dyn PriceSource>) -> Self {
        self.prices.insert(category, source);
        self
    }

    /// Register a balance source under its own name.
    pub fn with_balance_source(mut self, source: Arc<dyn BalanceSource>) -> Self {
        self.balances.insert(source.name().to_string(), source);
        self
    }

    pub fn price_source(&self, category: Category) -> Option<&Arc<dyn PriceSource>> {
        self.prices.get(&category)
    }

    pub fn balance_source(&self, provider: &str) -> Option<&Arc<dyn BalanceSource>> {
        self.balances.get(provider)
    }

    pub fn balance_providers(&self) -> impl Iterator<Item = &str> {
        self.balances.keys().map(String::as_str)
    }

    /// Build every enabled adapter from configuration.
    ///
    /// Adapters whose credentials are missing are skipped with a warning;
    /// holdings that need them later fail as unavailable.
    pub async fn from_config(config: &ProvidersConfig, quote_currency: &str) -> Self {
        let mut set = ProviderSet::new();

        if config.coingecko.enabled {
            let mut source = CoinGeckoPriceSource::new()
                .with_quote_currency(quote_currency)
                .with_gate(gate(&config.coingecko, RateGate::unlimited()));
            if let Some(url) = &config.coingecko.base_url {
                source = source.with_base_url(url);
            }
            set = set.with_price_source(Category::CryptoCurrency, Arc::new(source));
        }

        if config.metals.enabled {
            let mut source =
                MetalsLivePriceSource::new().with_gate(gate(&config.metals, RateGate::unlimited()));
            if let Some(url) = &config.metals.base_url {
                source = source.with_base_url(url);
            }
            set = set.with_price_source(Category::Metal, Arc::new(source));
        }

        if let Some(source) = build_with_credentials(
            "twelve_data",
            &config.twelve_data,
            "TWELVE_DATA",
            |store| async move { TwelveDataPriceSource::from_credentials(store.as_ref()).await },
        )
        .await
        {
            let mut source = source.with_gate(gate(&config.twelve_data, RateGate::unlimited()));
            if let Some(url) = &config.twelve_data.base_url {
                source = source.with_base_url(url);
            }
            set = set.with_price_source(Category::Equity, Arc::new(source));
        }

        if let Some(source) = build_with_credentials(
            "coinbase",
            &config.coinbase,
            "COINBASE",
            |store| async move { CoinbaseBalanceSource::from_credentials(store.as_ref()).await },
        )
        .await
        {
            let mut source = source.with_gate(gate(&config.coinbase, RateGate::unlimited()));
            if let Some(url) = &config.coinbase.base_url {
                source = source.with_base_url(url);
            }
            set = set.with_balance_source(Arc::new(source));
        }

        if let Some(source) = build_with_credentials(
            "gemini",
            &config.gemini,
            "GEMINI",
            |store| async move { GeminiBalanceSource::from_credentials(store.as_ref()).await },
        )
        .await
        {
            let mut source = source.with_gate(gate(&config.gemini, RateGate::unlimited()));
            if let Some(url) = &config.gemini.base_url {
                source = source.with_base_url(url);
            }
            set = set.with_balance_source(Arc::new(source));
        }

        if let Some(source) = build_with_credentials(
            "etherscan",
            &config.etherscan,
            "ETHERSCAN",
            |store| async move { EtherscanBalanceSource::from_credentials(store.as_ref()).await },
        )
        .await
        {
            let mut source = source.with_gate(gate(
                &config.etherscan,
                RateGate::new(super::etherscan::DEFAULT_MIN_INTERVAL),
            ));
            if let Some(url) = &config.etherscan.base_url {
                source = source.with_base_url(url);
            }
            set = set.with_balance_source(Arc::new(source));
        }

        if config.blockstream.enabled {
            let mut source = BlockstreamBalanceSource::new()
                .with_gate(gate(&config.blockstream, RateGate::unlimited()));
            if let Some(url) = &config.blockstream.base_url {
                source = source.with_base_url(url);
            }
            set = set.with_balance_source(Arc::new(source));
        }

        if config.crypto_org.enabled {
            let mut source = CryptoOrgBalanceSource::new()
                .with_gate(gate(&config.crypto_org, RateGate::unlimited()));
            if let Some(url) = &config.crypto_org.base_url {
                source = source.with_base_url(url);
            }
            set = set.with_balance_source(Arc::new(source));
        }

        set
    }
}

impl std::fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prices: HashMap<_, _> = self.prices.iter().map(|(c, s)| (c, s.name())).collect();
        let balances: Vec<_> = self.balances.keys().collect();
        f.debug_struct("ProviderSet")
            .field("prices", &prices)
            .field("balances", &balances)
            .finish()
    }
}

/// Configured pacing, falling back to the adapter's own default.
fn gate(settings: &ProviderSettings, default: RateGate) -> RateGate {
    match settings.min_interval {
        Some(interval) => {
            debug!(interval = %format_duration(interval), "configured provider pacing");
            RateGate::new(interval)
        }
        None => default,
    }
}

async fn build_with_credentials<T, F, Fut>(
    name: &str,
    settings: &ProviderSettings,
    env_prefix: &str,
    build: F,
) -> Option<T>
where
    F: FnOnce(Arc<dyn CredentialStore>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if !settings.enabled {
        debug!(provider = name, "provider disabled");
        return None;
    }

    let store: Arc<dyn CredentialStore> = Arc::from(settings.credentials_or_env(env_prefix).build());
    match build(store).await {
        Ok(source) => Some(source),
        Err(e) => {
            warn!(
                provider = name,
                error = %format!("{e:#}"),
                "provider not configured; holdings that need it will be unavailable"
            );
            None
        }
    }
}
