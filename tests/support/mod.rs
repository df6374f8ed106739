#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use networth::providers::{BalanceQuery, BalanceSource, PriceSource};
use rust_decimal::Decimal;

/// Price source answering from a fixed table and counting calls.
#[derive(Debug, Default)]
pub struct MockPriceSource {
    prices: HashMap<String, Decimal>,
    failures_left: AtomicUsize,
    calls: AtomicUsize,
    requests: Mutex<Vec<BTreeSet<String>>>,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, identifier: &str, price: Decimal) -> Self {
        self.prices.insert(identifier.to_string(), price);
        self
    }

    /// Fail the first `times` calls, then answer normally.
    pub fn failing(self, times: usize) -> Self {
        self.failures_left.store(times, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<BTreeSet<String>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    async fn fetch_prices(
        &self,
        identifiers: &BTreeSet<String>,
    ) -> Result<HashMap<String, Decimal>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(identifiers.clone());
        tokio::time::sleep(Duration::from_millis(5)).await;

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            anyhow::bail!("mock price feed down");
        }

        Ok(identifiers
            .iter()
            .filter_map(|id| self.prices.get(id).map(|p| (id.clone(), *p)))
            .collect())
    }

    fn name(&self) -> &str {
        "mock-prices"
    }
}

/// Balance source answering from a fixed table and counting calls.
/// Unknown queries resolve to zero.
#[derive(Debug)]
pub struct MockBalanceSource {
    name: String,
    balances: HashMap<BalanceQuery, Decimal>,
    fail: bool,
    calls: AtomicUsize,
}

impl MockBalanceSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            balances: HashMap::new(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_balance(mut self, query: BalanceQuery, amount: Decimal) -> Self {
        self.balances.insert(query, amount);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BalanceSource for MockBalanceSource {
    async fn fetch_balance(&self, query: &BalanceQuery) -> Result<Decimal> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        if self.fail {
            anyhow::bail!("{} rejected the API key", self.name);
        }
        Ok(self.balances.get(query).copied().unwrap_or_default())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
