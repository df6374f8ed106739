//! crypto.org chain explorer for CRO address balances.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use super::{BalanceQuery, BalanceSource, RateGate};

const CRYPTO_ORG_API_BASE: &str = "https://crypto.org/explorer";

/// basecro per CRO.
const BASECRO_DECIMALS: u32 = 8;

pub struct CryptoOrgBalanceSource {
    client: Client,
    base_url: String,
    gate: RateGate,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    result: AccountResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResult {
    #[serde(default)]
    total_balance: Vec<Coin>,
}

#[derive(Debug, Deserialize)]
struct Coin {
    amount: Decimal,
}

impl AccountResult {
    fn total_cro(&self) -> Decimal {
        let base: Decimal = self.total_balance.iter().map(|c| c.amount).sum();
        base / Decimal::from(10u64.pow(BASECRO_DECIMALS))
    }
}

impl CryptoOrgBalanceSource {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: CRYPTO_ORG_API_BASE.to_string(),
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

impl Default for CryptoOrgBalanceSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BalanceSource for CryptoOrgBalanceSource {
    async fn fetch_balance(&self, query: &BalanceQuery) -> Result<Decimal> {
        let BalanceQuery::Address {
            address,
            contract: None,
            ..
        } = query
        else {
            anyhow::bail!("crypto.org only resolves native address balances, got {query}");
        };

        let url = format!("{}/api/v1/accounts/{}", self.base_url, address);
        self.gate.wait().await;
        debug!(url = %url, "fetching crypto.org account");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send request to crypto.org explorer")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("crypto.org API error: {} - {}", status, body));
        }

        let data: AccountResponse = response
            .json()
            .await
            .context("Failed to parse crypto.org account response")?;
        Ok(data.result.total_cro().normalize())
    }

    fn name(&self) -> &str {
        "crypto_org"
    }
}
