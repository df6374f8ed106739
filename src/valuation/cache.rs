use std::collections::{BTreeSet, HashMap};

use rust_decimal::Decimal;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::error::{NetworthError, Result};
use crate::models::Category;
use crate::providers::PriceSource;

/// Batch requests one category may issue per run: the upfront fetch and a
/// single retry.
pub const MAX_BATCH_ATTEMPTS: usize = 2;

/// What one successful batch returned.
#[derive(Debug)]
struct PriceTable {
    prices: HashMap<String, Decimal>,
    /// Requested identifiers the feed did not answer. Any entry here leaves
    /// the whole category unpriced.
    missing: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct Attempts {
    made: usize,
    last_error: Option<NetworthError>,
}

#[derive(Debug, Default)]
struct CategoryPrices {
    table: OnceCell<PriceTable>,
    attempts: Mutex<Attempts>,
}

/// Per-category price table for one valuation run.
///
/// Each batched category is filled by one successful fetch covering every
/// identifier the run needs, then only read. Fetches for a category are
/// serialized: callers queued behind a failed attempt reuse its error once
/// [`MAX_BATCH_ATTEMPTS`] is spent instead of issuing their own request.
#[derive(Debug)]
pub struct PricingCache {
    categories: HashMap<Category, CategoryPrices>,
}

impl PricingCache {
    pub fn new() -> Self {
        let categories = Category::ALL
            .iter()
            .filter_map(|c| c.pricing_key())
            .map(|key| (key, CategoryPrices::default()))
            .collect();
        Self { categories }
    }

    fn slot(&self, category: Category) -> Result<&CategoryPrices> {
        category
            .pricing_key()
            .and_then(|key| self.categories.get(&key))
            .ok_or_else(|| {
                NetworthError::configuration(format!("{category} holdings have no market price"))
            })
    }

    /// Populate `category` with one batched request, unless already populated
    /// or out of attempts.
    pub async fn fetch_category_prices(
        &self,
        category: Category,
        identifiers: &BTreeSet<String>,
        source: &dyn PriceSource,
    ) -> Result<()> {
        let slot = self.slot(category)?;
        if slot.table.initialized() {
            debug!(%category, "price cache hit");
            return Ok(());
        }

        let mut attempts = slot.attempts.lock().await;
        if slot.table.initialized() {
            debug!(%category, "price cache filled while waiting");
            return Ok(());
        }
        if attempts.made >= MAX_BATCH_ATTEMPTS {
            if let Some(error) = &attempts.last_error {
                debug!(%category, attempts = attempts.made, "price batch attempts exhausted");
                return Err(error.clone());
            }
        }

        attempts.made += 1;
        let prices = match source.fetch_prices(identifiers).await {
            Ok(prices) => prices,
            Err(e) => {
                let error = NetworthError::provider(source.name(), &e);
                attempts.last_error = Some(error.clone());
                return Err(error);
            }
        };

        let missing: BTreeSet<String> = identifiers
            .iter()
            .filter(|id| !prices.contains_key(*id))
            .cloned()
            .collect();
        if missing.is_empty() {
            info!(
                %category,
                provider = source.name(),
                requested = identifiers.len(),
                "populated price cache"
            );
        } else {
            warn!(
                %category,
                provider = source.name(),
                missing = ?missing,
                "price feed skipped identifiers; category left unpriced"
            );
        }
        slot.table
            .get_or_init(|| async move { PriceTable { prices, missing } })
            .await;
        Ok(())
    }

    /// Read a price. Never touches the network.
    ///
    /// Fails for every identifier of a category whose batch came back
    /// incomplete, naming the identifier that was skipped.
    pub fn get_price(&self, category: Category, identifier: &str) -> Result<Decimal> {
        let not_resolved = |identifier: &str| NetworthError::PriceNotResolved {
            category,
            identifier: identifier.to_string(),
        };
        let table = self
            .slot(category)?
            .table
            .get()
            .ok_or_else(|| not_resolved(identifier))?;

        if let Some(skipped) = table
            .missing
            .get(identifier)
            .or_else(|| table.missing.first())
        {
            return Err(not_resolved(skipped.as_str()));
        }
        table
            .prices
            .get(identifier)
            .copied()
            .ok_or_else(|| not_resolved(identifier))
    }

    pub fn is_populated(&self, category: Category) -> bool {
        self.slot(category)
            .map(|slot| slot.table.initialized())
            .unwrap_or(false)
    }
}

impl Default for PricingCache {
    fn default() -> Self {
        Self::new()
    }
}
