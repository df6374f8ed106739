use std::collections::{BTreeSet, HashMap};
use std::fmt;

use anyhow::Result;
use rust_decimal::Decimal;

/// Batched spot-price lookup for one asset category.
///
/// One call covers every identifier the run needs. Identifiers missing from
/// the returned map are simply unknown to the source.
#[async_trait::async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_prices(&self, identifiers: &BTreeSet<String>)
        -> Result<HashMap<String, Decimal>>;

    fn name(&self) -> &str;
}

/// Single-balance lookup against an exchange account or a chain explorer.
///
/// Adapters that can only list every balance at once may cache that list
/// internally and answer later queries from it.
#[async_trait::async_trait]
pub trait BalanceSource: Send + Sync {
    async fn fetch_balance(&self, query: &BalanceQuery) -> Result<Decimal>;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BalanceQuery {
    /// Custodial account balance for an exchange ticker.
    Account { symbol: String },
    /// On-chain balance. With a contract the balance is scoped to that token
    /// and scaled by `decimals`.
    Address {
        address: String,
        contract: Option<String>,
        decimals: u32,
    },
}

impl BalanceQuery {
    pub fn account(symbol: impl Into<String>) -> Self {
        BalanceQuery::Account {
            symbol: symbol.into(),
        }
    }

    pub fn native(address: impl Into<String>) -> Self {
        BalanceQuery::Address {
            address: address.into(),
            contract: None,
            decimals: 18,
        }
    }

    pub fn token(address: impl Into<String>, contract: impl Into<String>, decimals: u32) -> Self {
        BalanceQuery::Address {
            address: address.into(),
            contract: Some(contract.into()),
            decimals,
        }
    }
}

impl fmt::Display for BalanceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BalanceQuery::Account { symbol } => write!(f, "account {symbol}"),
            BalanceQuery::Address {
                address,
                contract: Some(contract),
                ..
            } => write!(f, "address {address} token {contract}"),
            BalanceQuery::Address { address, .. } => write!(f, "address {address}"),
        }
    }
}

/// Raw integer amount in the smallest unit, scaled down by `decimals`.
pub(crate) fn scale_raw_amount(raw: &str, decimals: u32) -> Result<Decimal> {
    let raw = raw.trim();
    let units: i128 = raw
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid raw amount {raw:?}: {e}"))?;
    Decimal::try_from_i128_with_scale(units, decimals)
        .map(|d| d.normalize())
        .map_err(|e| anyhow::anyhow!("raw amount {raw} with {decimals} decimals out of range: {e}"))
}
