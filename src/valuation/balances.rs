use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use crate::providers::{BalanceQuery, BalanceSource};

/// Identity of one balance lookup: provider plus account-or-address, and
/// the token contract when the lookup is contract-scoped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BalanceKey {
    pub provider: String,
    pub locator: String,
    pub contract: Option<String>,
}

impl BalanceKey {
    pub fn new(provider: &str, query: &BalanceQuery) -> Self {
        let (locator, contract) = match query {
            BalanceQuery::Account { symbol } => (symbol.to_uppercase(), None),
            BalanceQuery::Address {
                address, contract, ..
            } => (address.clone(), contract.as_ref().map(|c| c.to_lowercase())),
        };
        Self {
            provider: provider.to_string(),
            locator,
            contract,
        }
    }
}

/// Run-wide memo of balance lookups.
///
/// The same account or address is queried at most once per run, no matter
/// how many holdings reference it. Concurrent lookups for one key wait on
/// the first caller. Failures are not memoized.
#[derive(Debug, Default)]
pub struct BalanceCache {
    entries: Mutex<HashMap<BalanceKey, Arc<OnceCell<Decimal>>>>,
}

impl BalanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_fetch(
        &self,
        query: &BalanceQuery,
        source: &dyn BalanceSource,
    ) -> anyhow::Result<Decimal> {
        let key = BalanceKey::new(source.name(), query);
        let cell = {
            let mut entries = self.entries.lock().await;
            entries.entry(key).or_default().clone()
        };

        if let Some(balance) = cell.get() {
            debug!(provider = source.name(), %query, "balance cache hit");
            return Ok(*balance);
        }

        let balance = cell
            .get_or_try_init(|| async {
                debug!(provider = source.name(), %query, "fetching balance");
                source.fetch_balance(query).await
            })
            .await?;
        Ok(*balance)
    }

    pub async fn cached(&self, key: &BalanceKey) -> Option<Decimal> {
        let entries = self.entries.lock().await;
        entries.get(key).and_then(|cell| cell.get().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rust_decimal_macros::dec;

    struct CountingBalances {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl BalanceSource for CountingBalances {
        async fn fetch_balance(&self, _query: &BalanceQuery) -> anyhow::Result<Decimal> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(dec!(1.25))
        }

        fn name(&self) -> &str {
            "etherscan"
        }
    }

    #[tokio::test]
    async fn same_address_is_fetched_once() {
        let cache = BalanceCache::new();
        let source = CountingBalances {
            calls: AtomicUsize::new(0),
        };
        let query = BalanceQuery::native("0xabc");

        let lookups = (0..4).map(|_| cache.get_or_fetch(&query, &source));
        for balance in futures::future::join_all(lookups).await {
            assert_eq!(balance.unwrap(), dec!(1.25));
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        let key = BalanceKey::new("etherscan", &query);
        assert_eq!(cache.cached(&key).await, Some(dec!(1.25)));
    }

    #[tokio::test]
    async fn contract_scope_is_a_separate_key() {
        let cache = BalanceCache::new();
        let source = CountingBalances {
            calls: AtomicUsize::new(0),
        };

        cache
            .get_or_fetch(&BalanceQuery::native("0xabc"), &source)
            .await
            .unwrap();
        cache
            .get_or_fetch(&BalanceQuery::token("0xabc", "0xA0B8", 6), &source)
            .await
            .unwrap();
        cache
            .get_or_fetch(&BalanceQuery::token("0xabc", "0xa0b8", 6), &source)
            .await
            .unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn account_keys_ignore_symbol_case() {
        assert_eq!(
            BalanceKey::new("gemini", &BalanceQuery::account("btc")),
            BalanceKey::new("gemini", &BalanceQuery::account("BTC"))
        );
    }
}
