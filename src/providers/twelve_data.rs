//! Equity quotes from twelvedata.com.
//!
//! Uses the `/price` endpoint, which accepts a comma-separated symbol list and
//! answers every ticker in one request.

use std::collections::{BTreeSet, HashMap};

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{PriceSource, RateGate};
use crate::credentials::CredentialStore;

const BASE_URL: &str = "https://api.twelvedata.com";

pub struct TwelveDataPriceSource {
    api_key: SecretString,
    client: Client,
    base_url: String,
    gate: RateGate,
}

impl TwelveDataPriceSource {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_client(api_key, Client::new())
    }

    pub fn with_client(api_key: impl Into<String>, client: Client) -> Self {
        let api_key: String = api_key.into();
        Self {
            api_key: SecretString::new(api_key.into()),
            client,
            base_url: BASE_URL.to_string(),
            gate: RateGate::unlimited(),
        }
    }

    /// Reads `api_key`, falling back to the entry password.
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

    fn parse_body(body: &str, tickers: &[String]) -> Result<HashMap<String, Decimal>> {
        // Try to parse as error response first
        if let Ok(error) = serde_json::from_str::<ErrorResponse>(body) {
            if error.status == "error" {
                anyhow::bail!(
                    "Twelve Data API error: code={:?}, message={}",
                    error.code,
                    error.message
                );
            }
        }

        // A single symbol is answered with a bare quote instead of a map.
        if let [ticker] = tickers {
            let data: PriceResponse =
                serde_json::from_str(body).context("Failed to parse Twelve Data price response")?;
            return Ok(HashMap::from([(ticker.clone(), data.price)]));
        }

        let data: HashMap<String, QuoteEntry> =
            serde_json::from_str(body).context("Failed to parse Twelve Data price response")?;

        let mut prices = HashMap::with_capacity(data.len());
        for (ticker, entry) in data {
            match entry {
                QuoteEntry::Price(quote) => {
                    prices.insert(ticker, quote.price);
                }
                QuoteEntry::Error(error) => {
                    warn!(ticker = %ticker, message = %error.message, "Twelve Data skipped symbol");
                }
            }
        }
        Ok(prices)
    }
}

#[async_trait::async_trait]
impl PriceSource for TwelveDataPriceSource {
    async fn fetch_prices(
        &self,
        identifiers: &BTreeSet<String>,
    ) -> Result<HashMap<String, Decimal>> {
        if identifiers.is_empty() {
            return Ok(HashMap::new());
        }

        // Twelve Data uses plain upper-case ticker symbols for US equities.
        let by_ticker: HashMap<String, &String> = identifiers
            .iter()
            .map(|id| (id.to_uppercase(), id))
            .collect();
        let tickers: Vec<String> = identifiers.iter().map(|id| id.to_uppercase()).collect();

        let url = format!("{}/price", self.base_url);
        self.gate.wait().await;
        debug!(symbols = %tickers.join(","), "fetching Twelve Data quotes");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", tickers.join(",").as_str()),
                ("apikey", self.api_key.expose_secret()),
            ])
            .send()
            .await
            .context("Failed to send quote request to Twelve Data")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Twelve Data quote API error: status={status}, body={body}"));
        }

        let body = response
            .text()
            .await
            .context("Failed to read quote response body")?;

        let prices = Self::parse_body(&body, &tickers)?;
        Ok(prices
            .into_iter()
            .filter_map(|(ticker, price)| {
                by_ticker
                    .get(&ticker)
                    .map(|identifier| ((*identifier).clone(), price))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "twelve_data"
    }
}

/// Body returned for a failed request, or per symbol inside a batch.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    status: String,
    code: Option<i32>,
    message: String,
}

/// One quote from `/price`.
#[derive(Debug, Deserialize)]
struct PriceResponse {
    price: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QuoteEntry {
    Price(PriceResponse),
    Error(ErrorResponse),
}
