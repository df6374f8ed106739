use std::collections::{BTreeMap, BTreeSet};

use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{BalanceCache, PricingCache};
use crate::error::{NetworthError, Result};
use crate::models::{Asset, Category, ResolvedQuantity, SourceRef};
use crate::providers::{BalanceQuery, ProviderSet};

/// Default number of holdings whose quantities resolve at once.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// A holding with its price, quantity and value resolved.
#[derive(Debug, Serialize)]
pub struct ValuedAsset {
    #[serde(flatten)]
    pub asset: Asset,
    pub price: Decimal,
    pub quantity: ResolvedQuantity,
    pub value: Decimal,
}

impl ValuedAsset {
    /// Sources that failed and contributed nothing.
    pub fn degraded_sources(&self) -> impl Iterator<Item = (&SourceRef, &NetworthError)> {
        self.quantity
            .contributions
            .iter()
            .filter_map(|c| c.error.as_ref().map(|e| (&c.source, e)))
    }
}

/// A holding whose price could not be resolved. It is left out of the total.
#[derive(Debug, Serialize)]
pub struct UnvaluedAsset {
    #[serde(flatten)]
    pub asset: Asset,
    pub error: NetworthError,
}

#[derive(Debug, Default, Serialize)]
pub struct ValuationRun {
    pub valued: Vec<ValuedAsset>,
    pub unvalued: Vec<UnvaluedAsset>,
}

/// Resolves price, quantity and value for holdings.
///
/// Owns the run's price and balance caches; build one per report.
pub struct Valuator {
    providers: ProviderSet,
    prices: PricingCache,
    balances: BalanceCache,
    batches: RwLock<BTreeMap<Category, BTreeSet<String>>>,
    concurrency: usize,
}

impl Valuator {
    pub fn new(providers: ProviderSet) -> Self {
        Self {
            providers,
            prices: PricingCache::new(),
            balances: BalanceCache::new(),
            batches: RwLock::new(BTreeMap::new()),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn pricing_cache(&self) -> &PricingCache {
        &self.prices
    }

    pub fn balance_cache(&self) -> &BalanceCache {
        &self.balances
    }

    /// Identifiers each batched category must price, keyed by batch.
    ///
    /// Pinned and stable-valued identifiers never reach a price feed.
    pub fn batch_identifiers(assets: &[Asset]) -> BTreeMap<Category, BTreeSet<String>> {
        let mut batches: BTreeMap<Category, BTreeSet<String>> = BTreeMap::new();
        for asset in assets {
            if asset.fixed_price.is_some() || asset.profile.as_ref().is_some_and(|p| p.stable) {
                continue;
            }
            if let Some(key) = asset.category.pricing_key() {
                batches
                    .entry(key)
                    .or_default()
                    .insert(asset.identifier.clone());
            }
        }
        batches
    }

    /// Fetch every batched category once, before any holding is resolved.
    ///
    /// A failed batch is logged and left empty. The first holding that then
    /// needs it retries once; the rest share that outcome.
    pub async fn prepare(&self, assets: &[Asset]) {
        let batches = Self::batch_identifiers(assets);
        {
            let mut known = self.batches.write().await;
            for (category, ids) in &batches {
                known.entry(*category).or_default().extend(ids.iter().cloned());
            }
        }

        for category in batches.keys() {
            if let Err(e) = self.populate(*category).await {
                warn!(%category, error = %e, "price batch failed");
            }
        }
    }

    async fn populate(&self, category: Category) -> Result<()> {
        let identifiers = {
            let known = self.batches.read().await;
            match known.get(&category) {
                Some(ids) => ids.clone(),
                None => return Ok(()),
            }
        };
        let source = self.providers.price_source(category).ok_or_else(|| {
            NetworthError::ProviderUnavailable {
                provider: category.label().to_string(),
                message: "no price source configured".to_string(),
            }
        })?;
        self.prices
            .fetch_category_prices(category, &identifiers, source.as_ref())
            .await
    }

    /// Price per unit, memoized on the holding.
    pub async fn price(&self, asset: &Asset) -> Result<Decimal> {
        asset
            .price
            .get_or_try_init(|| self.resolve_price(asset))
            .await
            .copied()
    }

    async fn resolve_price(&self, asset: &Asset) -> Result<Decimal> {
        if let Some(price) = asset.fixed_price {
            return Ok(price);
        }
        if asset.profile.as_ref().is_some_and(|p| p.stable) {
            return Ok(Decimal::ONE);
        }
        let Some(key) = asset.category.pricing_key() else {
            // Cash, vehicles and institution accounts are quantity-as-value.
            return Ok(Decimal::ONE);
        };

        if !self.prices.is_populated(key) {
            self.batches
                .write()
                .await
                .entry(key)
                .or_default()
                .insert(asset.identifier.clone());
            self.populate(key).await?;
        }
        self.prices.get_price(asset.category, &asset.identifier)
    }

    /// Total quantity over every declared source, memoized on the holding.
    ///
    /// A failing source contributes zero and is recorded on the result.
    pub async fn quantity<'a>(&self, asset: &'a Asset) -> &'a ResolvedQuantity {
        asset
            .quantity
            .get_or_init(|| self.resolve_quantity(asset))
            .await
    }

    async fn resolve_quantity(&self, asset: &Asset) -> ResolvedQuantity {
        let mut resolved = ResolvedQuantity::default();
        for amount in &asset.declared_quantities {
            resolved.push(SourceRef::Declared, *amount);
        }

        if !asset.category.accumulates_balances() {
            return resolved;
        }

        let lookups = balance_lookups(asset);
        let results = futures::future::join_all(
            lookups
                .into_iter()
                .map(|(source, query)| self.fetch_balance(source, query)),
        )
        .await;

        for (source, result) in results {
            match result {
                Ok(amount) => resolved.push(source, amount),
                Err(e) => {
                    warn!(
                        identifier = %asset.identifier,
                        %source,
                        error = %e,
                        "balance source unavailable; counting it as zero"
                    );
                    resolved.push_failure(source, e);
                }
            }
        }
        resolved
    }

    async fn fetch_balance(
        &self,
        source: SourceRef,
        query: BalanceQuery,
    ) -> (SourceRef, Result<Decimal>) {
        let provider = match &source {
            SourceRef::Exchange { provider, .. } | SourceRef::Address { provider, .. } => {
                provider.clone()
            }
            SourceRef::Declared => return (source, Ok(Decimal::ZERO)),
        };

        let result = match self.providers.balance_source(&provider) {
            Some(adapter) => self
                .balances
                .get_or_fetch(&query, adapter.as_ref())
                .await
                .map_err(|e| NetworthError::provider(&provider, &e)),
            None => Err(NetworthError::ProviderUnavailable {
                provider: provider.clone(),
                message: "not configured".to_string(),
            }),
        };
        (source, result)
    }

    /// `price × quantity`, computed once per holding.
    pub async fn value(&self, asset: &Asset) -> Result<Decimal> {
        asset
            .value
            .get_or_try_init(|| async {
                let price = self.price(asset).await?;
                let quantity = self.quantity(asset).await.total;
                let value = price * quantity;
                if value.is_sign_negative() && !value.is_zero() {
                    return Err(NetworthError::configuration(format!(
                        "{} resolved to a negative value",
                        asset.identifier
                    )));
                }
                debug!(identifier = %asset.identifier, %price, %quantity, %value, "valued holding");
                Ok(value)
            })
            .await
            .copied()
    }

    /// Value every holding: batch prices upfront, then resolve quantities
    /// concurrently, keeping input order.
    pub async fn value_all(&self, assets: Vec<Asset>) -> ValuationRun {
        self.prepare(&assets).await;

        let outcomes: Vec<(Asset, Result<Decimal>)> = stream::iter(assets)
            .map(|asset| async move {
                let value = self.value(&asset).await;
                (asset, value)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut run = ValuationRun::default();
        for (asset, outcome) in outcomes {
            match outcome {
                Ok(value) => {
                    let price = asset.resolved_price().unwrap_or_default();
                    let quantity = asset.resolved_quantity().cloned().unwrap_or_default();
                    run.valued.push(ValuedAsset {
                        asset,
                        price,
                        quantity,
                        value,
                    });
                }
                Err(error) => {
                    warn!(identifier = %asset.identifier, %error, "holding left unvalued");
                    run.unvalued.push(UnvaluedAsset { asset, error });
                }
            }
        }
        run
    }
}

/// Every exchange-account and on-chain lookup a holding needs.
fn balance_lookups(asset: &Asset) -> Vec<(SourceRef, BalanceQuery)> {
    let mut lookups = Vec::new();

    let symbols: Vec<String> = match &asset.profile {
        Some(profile) => profile.exchange_symbols().map(str::to_string).collect(),
        None => vec![asset.display_symbol.to_uppercase()],
    };
    for exchange in &asset.exchanges {
        for symbol in &symbols {
            lookups.push((
                SourceRef::Exchange {
                    provider: exchange.clone(),
                    symbol: symbol.clone(),
                },
                BalanceQuery::account(symbol.clone()),
            ));
        }
    }

    for address in &asset.addresses {
        let Some(profile) = &asset.profile else {
            continue;
        };
        let (provider, query) = match (&profile.contract, profile.chain) {
            (Some(contract), _) => (
                "etherscan",
                BalanceQuery::token(address.clone(), contract.clone(), profile.decimals),
            ),
            (None, Some(chain)) => (chain.provider(), BalanceQuery::native(address.clone())),
            (None, None) => continue,
        };
        lookups.push((
            SourceRef::Address {
                provider: provider.to_string(),
                address: address.clone(),
                contract: profile.contract.clone(),
            },
            query,
        ));
    }

    lookups
}
