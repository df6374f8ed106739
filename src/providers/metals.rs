//! metals.live spot price provider.
//!
//! `/v1/spot` returns every metal at once as a list of single-entry maps,
//! e.g. `[{"gold": 1931.2}, {"silver": 23.1}, {"timestamp": 1690000000}]`.

use std::collections::{BTreeSet, HashMap};

use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use super::{PriceSource, RateGate};

const METALS_API_BASE: &str = "https://api.metals.live";

pub struct MetalsLivePriceSource {
    client: reqwest::Client,
    base_url: String,
    gate: RateGate,
}

impl MetalsLivePriceSource {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: METALS_API_BASE.to_string(),
            gate: RateGate::unlimited(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_gate(mut self, gate: RateGate) -> Self {
        self.gate = gate;
        self
    }
}

impl Default for MetalsLivePriceSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge the single-entry maps, keeping numeric entries only.
fn merge_spot(entries: Vec<HashMap<String, Value>>) -> HashMap<String, Decimal> {
    let mut merged = HashMap::new();
    for (label, value) in entries.into_iter().flatten() {
        let price = match &value {
            Value::Number(n) => n.to_string().parse::<Decimal>().ok(),
            Value::String(s) => s.parse::<Decimal>().ok(),
            _ => None,
        };
        if let Some(price) = price {
            merged.insert(label.to_lowercase(), price);
        }
    }
    merged
}

#[async_trait::async_trait]
impl PriceSource for MetalsLivePriceSource {
    async fn fetch_prices(
        &self,
        identifiers: &BTreeSet<String>,
    ) -> Result<HashMap<String, Decimal>> {
        if identifiers.is_empty() {
            return Ok(HashMap::new());
        }

        let url = format!("{}/v1/spot", self.base_url);
        self.gate.wait().await;
        debug!(url = %url, "fetching metal spot prices");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send request to metals.live")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("metals.live API error: {} - {}", status, body));
        }

        let entries: Vec<HashMap<String, Value>> = response
            .json()
            .await
            .context("Failed to parse metals.live response")?;
        let spot = merge_spot(entries);

        Ok(identifiers
            .iter()
            .filter_map(|id| spot.get(&id.to_lowercase()).map(|p| (id.clone(), *p)))
            .collect())
    }

    fn name(&self) -> &str {
        "metals"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_merge_spot_ignores_non_prices() {
        let entries: Vec<HashMap<String, Value>> = serde_json::from_str(
            r#"[{"gold": 1931.25}, {"silver": "23.10"}, {"timestamp": 1690000000}, {"note": "closed"}]"#,
        )
        .unwrap();
        let spot = merge_spot(entries);
        assert_eq!(spot["gold"], dec!(1931.25));
        assert_eq!(spot["silver"], dec!(23.10));
        assert!(!spot.contains_key("note"));
    }
}
