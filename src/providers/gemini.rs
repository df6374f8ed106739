//! Gemini exchange balances.
//!
//! Trading and earn balances come from two list endpoints; each list is
//! fetched once and a symbol's quantity is the sum across both.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha384;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{BalanceQuery, BalanceSource, RateGate};
use crate::credentials::CredentialStore;

type HmacSha384 = Hmac<Sha384>;

const GEMINI_API_BASE: &str = "https://api.gemini.com";
const BALANCES_PATH: &str = "/v1/balances";
const EARN_BALANCES_PATH: &str = "/v1/balances/earn";

pub struct GeminiBalanceSource {
    api_key: String,
    api_secret: SecretString,
    client: Client,
    base_url: String,
    gate: RateGate,
    nonce: AtomicU64,
    trading: OnceCell<HashMap<String, Decimal>>,
    earn: OnceCell<HashMap<String, Decimal>>,
}

#[derive(Debug, Deserialize)]
struct TradingBalance {
    currency: String,
    amount: Decimal,
}

#[derive(Debug, Deserialize)]
struct EarnBalance {
    currency: String,
    balance: Decimal,
}

impl GeminiBalanceSource {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        let api_secret: String = api_secret.into();
        Self {
            api_key: api_key.into(),
            api_secret: SecretString::new(api_secret.into()),
            client: Client::new(),
            base_url: GEMINI_API_BASE.to_string(),
            gate: RateGate::unlimited(),
            nonce: AtomicU64::new(0),
            trading: OnceCell::new(),
            earn: OnceCell::new(),
        }
    }

    /// Expects "api_key" and "api_secret" in the store.
    pub async fn from_credentials(store: &dyn CredentialStore) -> Result<Self> {
        let api_key = store.require("api_key").await?;
        let api_secret = store.require("api_secret").await?;
        Ok(Self::new(api_key.expose_secret(), api_secret.expose_secret()))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_gate(mut self, gate: RateGate) -> Self {
        self.gate = gate;
        self
    }

    /// Millisecond timestamp, bumped so nonces stay strictly increasing.
    fn next_nonce(&self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let mut current = self.nonce.load(Ordering::Relaxed);
        loop {
            let next = now.max(current + 1);
            match self
                .nonce
                .compare_exchange(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }

    /// Base64 payload and its hex HMAC-SHA384 signature.
    fn sign(&self, request_path: &str, nonce: u64) -> Result<(String, String)> {
        let payload = serde_json::json!({
            "request": request_path,
            "nonce": nonce.to_string(),
        });
        let encoded = STANDARD.encode(serde_json::to_string(&payload)?);

        let mut mac = HmacSha384::new_from_slice(self.api_secret.expose_secret().as_bytes())
            .map_err(|e| anyhow!("Invalid Gemini API secret: {e}"))?;
        mac.update(encoded.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok((encoded, signature))
    }

    async fn private_post<T: DeserializeOwned>(&self, request_path: &str) -> Result<T> {
        let (payload, signature) = self.sign(request_path, self.next_nonce())?;
        let url = format!("{}{}", self.base_url, request_path);

        self.gate.wait().await;
        debug!(url = %url, "sending Gemini private request");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "text/plain")
            .header("Content-Length", "0")
            .header("X-GEMINI-APIKEY", &self.api_key)
            .header("X-GEMINI-PAYLOAD", payload)
            .header("X-GEMINI-SIGNATURE", signature)
            .header("Cache-Control", "no-cache")
            .send()
            .await
            .with_context(|| format!("Failed to send request to Gemini {request_path}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error: {} - {}", status, body));
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse Gemini {request_path} response"))
    }

    async fn load_trading(&self) -> Result<HashMap<String, Decimal>> {
        let rows: Vec<TradingBalance> = self.private_post(BALANCES_PATH).await?;
        info!(currencies = rows.len(), "loaded Gemini trading balances");
        Ok(sum_by_currency(rows.into_iter().map(|r| (r.currency, r.amount))))
    }

    async fn load_earn(&self) -> Result<HashMap<String, Decimal>> {
        let rows: Vec<EarnBalance> = self.private_post(EARN_BALANCES_PATH).await?;
        info!(currencies = rows.len(), "loaded Gemini earn balances");
        Ok(sum_by_currency(rows.into_iter().map(|r| (r.currency, r.balance))))
    }
}

fn sum_by_currency(rows: impl Iterator<Item = (String, Decimal)>) -> HashMap<String, Decimal> {
    let mut totals: HashMap<String, Decimal> = HashMap::new();
    for (currency, amount) in rows {
        *totals.entry(currency.to_uppercase()).or_default() += amount;
    }
    totals
}

#[async_trait::async_trait]
impl BalanceSource for GeminiBalanceSource {
    async fn fetch_balance(&self, query: &BalanceQuery) -> Result<Decimal> {
        let BalanceQuery::Account { symbol } = query else {
            anyhow::bail!("Gemini only resolves account balances, got {query}");
        };
        let symbol = symbol.to_uppercase();

        let trading = self.trading.get_or_try_init(|| self.load_trading()).await?;
        let earn = self.earn.get_or_try_init(|| self.load_earn()).await?;

        Ok(trading.get(&symbol).copied().unwrap_or_default()
            + earn.get(&symbol).copied().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
