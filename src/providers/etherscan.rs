//! Etherscan on-chain balances for Ethereum addresses and ERC-20 tokens.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use super::sources::scale_raw_amount;
use super::{BalanceQuery, BalanceSource, RateGate};
use crate::credentials::CredentialStore;

const ETHERSCAN_API_BASE: &str = "https://api.etherscan.io";

/// Free-tier keys allow five calls per second.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(200);

const WEI_DECIMALS: u32 = 18;

pub struct EtherscanBalanceSource {
    api_key: SecretString,
    client: Client,
    base_url: String,
    gate: RateGate,
}

/// Etherscan wraps every answer in `{status, message, result}`; on failure
/// `result` carries the error text.
#[derive(Debug, Deserialize)]
struct EtherscanResponse {
    status: String,
    message: String,
    result: String,
}

impl EtherscanBalanceSource {
    pub fn new(api_key: impl Into<String>) -> Self {
        let api_key: String = api_key.into();
        Self {
            api_key: SecretString::new(api_key.into()),
            client: Client::new(),
            base_url: ETHERSCAN_API_BASE.to_string(),
            gate: RateGate::new(DEFAULT_MIN_INTERVAL),
        }
    }

    /// Expects an "api_key" field (or "password" for simple pass entries).
    pub async fn from_credentials(store: &dyn CredentialStore) -> Result<Self> {
        let api_key = match store.get("api_key").await? {
            Some(key) => key,
            None => store.require("password").await?,
        };
        Ok(Self::new(api_key.expose_secret()))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_gate(mut self, gate: RateGate) -> Self {
        self.gate = gate;
        self
    }

    async fn query_raw(&self, params: &[(&str, &str)]) -> Result<String> {
        let url = format!("{}/api", self.base_url);

        self.gate.wait().await;
        debug!(params = ?params, "querying Etherscan");

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("tag", "latest"), ("apikey", self.api_key.expose_secret())])
            .send()
            .await
            .context("Failed to send request to Etherscan")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Etherscan API error: {} - {}", status, body));
        }

        let data: EtherscanResponse = response
            .json()
            .await
            .context("Failed to parse Etherscan response")?;

        if data.status != "1" {
            anyhow::bail!("Etherscan error: {} ({})", data.message, data.result);
        }
        Ok(data.result)
    }
}

#[async_trait::async_trait]
impl BalanceSource for EtherscanBalanceSource {
    async fn fetch_balance(&self, query: &BalanceQuery) -> Result<Decimal> {
        let BalanceQuery::Address {
            address,
            contract,
            decimals,
        } = query
        else {
            anyhow::bail!("Etherscan only resolves address balances, got {query}");
        };

        match contract {
            Some(contract) => {
                let raw = self
                    .query_raw(&[
                        ("module", "account"),
                        ("action", "tokenbalance"),
                        ("address", address.as_str()),
                        ("contractaddress", contract.as_str()),
                    ])
                    .await?;
                scale_raw_amount(&raw, *decimals)
            }
            None => {
                let raw = self
                    .query_raw(&[
                        ("module", "account"),
                        ("action", "balance"),
                        ("address", address.as_str()),
                    ])
                    .await?;
                scale_raw_amount(&raw, WEI_DECIMALS)
            }
        }
    }

    fn name(&self) -> &str {
        "etherscan"
    }
}
