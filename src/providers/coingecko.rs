//! CoinGecko crypto price provider.
//!
//! Uses the free `/simple/price` endpoint, which prices any number of coin ids
//! in one request.

use std::collections::{BTreeSet, HashMap};

use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::{PriceSource, RateGate};

const COINGECKO_API_BASE: &str = "https://api.coingecko.com/api/v3";

/// `/simple/price` response: coin id -> quote currency -> price.
type SimplePriceResponse = HashMap<String, HashMap<String, Decimal>>;

/// CoinGecko crypto price provider.
///
/// Identifiers are CoinGecko coin ids (`bitcoin`, `usd-coin`). No API key is
/// required for basic usage, though rate limits apply.
pub struct CoinGeckoPriceSource {
    client: reqwest::Client,
    base_url: String,
    /// Quote currency for prices (e.g., "usd", "eur")
    quote_currency: String,
    gate: RateGate,
}

impl CoinGeckoPriceSource {
    /// Creates a new CoinGecko provider with USD as the default quote currency.
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Creates a new CoinGecko provider with a custom reqwest client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: COINGECKO_API_BASE.to_string(),
            quote_currency: "usd".to_string(),
            gate: RateGate::unlimited(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the quote currency for price lookups.
    pub fn with_quote_currency(mut self, currency: impl Into<String>) -> Self {
        self.quote_currency = currency.into().to_lowercase();
        self
    }

    pub fn with_gate(mut self, gate: RateGate) -> Self {
        self.gate = gate;
        self
    }
}

impl Default for CoinGeckoPriceSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PriceSource for CoinGeckoPriceSource {
    async fn fetch_prices(
        &self,
        identifiers: &BTreeSet<String>,
    ) -> Result<HashMap<String, Decimal>> {
        if identifiers.is_empty() {
            return Ok(HashMap::new());
        }

        let ids = identifiers.iter().cloned().collect::<Vec<_>>().join(",");
        let url = format!("{}/simple/price", self.base_url);

        self.gate.wait().await;
        debug!(count = identifiers.len(), url = %url, "fetching CoinGecko prices");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("ids", ids.as_str()),
                ("vs_currencies", self.quote_currency.as_str()),
            ])
            .header("Accept", "application/json")
            .header("User-Agent", concat!("networth/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .context("Failed to send request to CoinGecko")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("CoinGecko API error: {} - {}", status, body));
        }

        let data: SimplePriceResponse = response
            .json()
            .await
            .context("Failed to parse CoinGecko response")?;

        let mut prices = HashMap::with_capacity(data.len());
        for (id, quotes) in data {
            match quotes.get(&self.quote_currency) {
                Some(price) => {
                    prices.insert(id, *price);
                }
                None => warn!(id = %id, currency = %self.quote_currency, "CoinGecko returned no quote"),
            }
        }

        Ok(prices)
    }

    fn name(&self) -> &str {
        "coingecko"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_simple_price_response() {
        let json = r#"{"bitcoin":{"usd":50000.5},"usd-coin":{"usd":"1.0001"}}"#;
        let data: SimplePriceResponse = serde_json::from_str(json).unwrap();
        assert_eq!(data["bitcoin"]["usd"], dec!(50000.5));
        assert_eq!(data["usd-coin"]["usd"], dec!(1.0001));
    }

    #[test]
    fn test_quote_currency_is_lowercased() {
        let source = CoinGeckoPriceSource::new()
            .with_quote_currency("EUR")
            .with_base_url("http://localhost:1234/");
        assert_eq!(source.quote_currency, "eur");
        assert_eq!(source.base_url, "http://localhost:1234");
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let source = CoinGeckoPriceSource::new().with_base_url("http://127.0.0.1:9");
        let prices = source.fetch_prices(&BTreeSet::new()).await.unwrap();
        assert!(prices.is_empty());
    }
}
