//! Coinbase exchange balances via the CDP (Advanced Trade) API.
//!
//! Coinbase only offers a paginated list of every account, so the first lookup
//! walks all pages and later lookups are served from that list.

use std::collections::HashMap;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use p256::ecdsa::{signature::Signer, Signature, SigningKey};
use p256::SecretKey;
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{BalanceQuery, BalanceSource, RateGate};
use crate::credentials::CredentialStore;

const CDP_API_BASE: &str = "https://api.coinbase.com";
const TOKEN_LIFETIME_SECS: i64 = 120;
const ACCOUNTS_PATH: &str = "/api/v3/brokerage/accounts";

pub struct CoinbaseBalanceSource {
    key_name: String,
    private_key_pem: SecretString,
    client: Client,
    base_url: String,
    gate: RateGate,
    balances: OnceCell<HashMap<String, Decimal>>,
}

#[derive(Debug, Serialize)]
struct JwtClaims {
    sub: String,
    iss: String,
    nbf: i64,
    exp: i64,
    uri: String,
}

impl CoinbaseBalanceSource {
    pub fn new(key_name: impl Into<String>, private_key_pem: impl Into<String>) -> Self {
        let private_key_pem: String = private_key_pem.into();
        Self {
            key_name: key_name.into(),
            private_key_pem: SecretString::new(private_key_pem.into()),
            client: Client::new(),
            base_url: CDP_API_BASE.to_string(),
            gate: RateGate::unlimited(),
            balances: OnceCell::new(),
        }
    }

    /// Expects "key_name" and "private_key" (SEC1 PEM) in the store.
    pub async fn from_credentials(store: &dyn CredentialStore) -> Result<Self> {
        let key_name = store.require("key_name").await?;
        let private_key = store.require("private_key").await?;
        Ok(Self::new(
            key_name.expose_secret(),
            private_key.expose_secret(),
        ))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_gate(mut self, gate: RateGate) -> Self {
        self.gate = gate;
        self
    }

    /// Short-lived ES256 token bound to one request line.
    fn request_token(&self, method: &str, path: &str) -> Result<String> {
        let now = Utc::now().timestamp();
        let host = self
            .base_url
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        let uri = format!("{method} {host}{path}");

        let claims = JwtClaims {
            sub: self.key_name.clone(),
            iss: "cdp".to_string(),
            nbf: now,
            exp: now + TOKEN_LIFETIME_SECS,
            uri,
        };

        let header = serde_json::json!({
            "alg": "ES256",
            "typ": "JWT",
            "kid": self.key_name,
            "nonce": format!("{:016x}", rand::random::<u64>()),
        });

        let signing_input = [
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?),
        ]
        .join(".");

        let key = SecretKey::from_sec1_pem(self.private_key_pem.expose_secret())
            .context("Coinbase private_key is not a SEC1 PEM EC key")?;
        let signature: Signature = SigningKey::from(&key).sign(signing_input.as_bytes());

        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }

    async fn get_page(&self, cursor: Option<&str>) -> Result<AccountsPage> {
        let jwt = self.request_token("GET", ACCOUNTS_PATH)?;
        let url = format!("{}{}", self.base_url, ACCOUNTS_PATH);

        let mut request = self
            .client
            .get(&url)
            .query(&[("limit", "250")])
            .header("Authorization", format!("Bearer {jwt}"))
            .header("Content-Type", "application/json");
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }

        self.gate.wait().await;
        debug!(url = %url, cursor = ?cursor, "fetching Coinbase accounts page");
        let response = request.send().await.context("HTTP request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            anyhow::bail!("Coinbase API request failed ({}): {}", status, body);
        }

        serde_json::from_str(&body).context("Failed to parse Coinbase accounts response")
    }

    /// Walk every accounts page and total available plus held funds per currency.
    async fn load_balances(&self) -> Result<HashMap<String, Decimal>> {
        let mut balances: HashMap<String, Decimal> = HashMap::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.get_page(cursor.as_deref()).await?;
            pages += 1;
            for account in page.accounts {
                let held = account.hold.map(|h| h.value).unwrap_or_default();
                *balances.entry(account.currency).or_default() +=
                    account.available_balance.value + held;
            }
            match page.cursor {
                Some(next) if page.has_next && !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        info!(pages, currencies = balances.len(), "loaded Coinbase balances");
        Ok(balances)
    }
}

#[derive(Debug, Deserialize)]
struct AccountsPage {
    accounts: Vec<CoinbaseAccount>,
    #[serde(default)]
    has_next: bool,
    #[serde(default)]
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoinbaseAccount {
    currency: String,
    available_balance: CoinbaseBalance,
    #[serde(default)]
    hold: Option<CoinbaseBalance>,
}

#[derive(Debug, Deserialize)]
struct CoinbaseBalance {
    value: Decimal,
}

#[async_trait::async_trait]
impl BalanceSource for CoinbaseBalanceSource {
    async fn fetch_balance(&self, query: &BalanceQuery) -> Result<Decimal> {
        let BalanceQuery::Account { symbol } = query else {
            anyhow::bail!("Coinbase only resolves account balances, got {query}");
        };
        let balances = self
            .balances
            .get_or_try_init(|| self.load_balances())
            .await?;
        Ok(balances.get(symbol).copied().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "coinbase"
    }
}
