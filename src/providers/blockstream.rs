//! Blockstream Esplora explorer for Bitcoin address balances.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use super::{BalanceQuery, BalanceSource, RateGate};

const BLOCKSTREAM_API_BASE: &str = "https://blockstream.info";

const SATOSHI_DECIMALS: u32 = 8;

pub struct BlockstreamBalanceSource {
    client: Client,
    base_url: String,
    gate: RateGate,
}

#[derive(Debug, Deserialize)]
struct AddressInfo {
    chain_stats: ChainStats,
}

#[derive(Debug, Deserialize)]
struct ChainStats {
    funded_txo_sum: i64,
    spent_txo_sum: i64,
}

impl ChainStats {
    fn unspent(&self) -> Decimal {
        Decimal::new(self.funded_txo_sum - self.spent_txo_sum, SATOSHI_DECIMALS)
    }
}

impl BlockstreamBalanceSource {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: BLOCKSTREAM_API_BASE.to_string(),
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

impl Default for BlockstreamBalanceSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BalanceSource for BlockstreamBalanceSource {
    async fn fetch_balance(&self, query: &BalanceQuery) -> Result<Decimal> {
        let BalanceQuery::Address {
            address,
            contract: None,
            ..
        } = query
        else {
            anyhow::bail!("Blockstream only resolves native address balances, got {query}");
        };

        // The API has no multi-address lookup.
        let url = format!("{}/api/address/{}", self.base_url, address);
        self.gate.wait().await;
        debug!(url = %url, "fetching Bitcoin address");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send request to Blockstream")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Blockstream API error: {} - {}", status, body));
        }

        let info: AddressInfo = response
            .json()
            .await
            .context("Failed to parse Blockstream address response")?;
        Ok(info.chain_stats.unspent().normalize())
    }

    fn name(&self) -> &str {
        "blockstream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_unspent_is_funded_minus_spent() {
        let info: AddressInfo = serde_json::from_str(
            r#"{"address":"bc1q","chain_stats":{"funded_txo_sum":30000000,"spent_txo_sum":10000000,"tx_count":3}}"#,
        )
        .unwrap();
        assert_eq!(info.chain_stats.unspent(), dec!(0.2));
    }
}
