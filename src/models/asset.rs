use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::OnceCell;

use super::{Category, CryptoProfile};
use crate::error::NetworthError;

/// One declared holding line: a single named source of one identifier.
///
/// Price, quantity and value are resolved lazily by the
/// [`Valuator`](crate::valuation::Valuator) and memoized on the instance, so
/// each is computed at most once per run.
#[derive(Debug, Serialize)]
pub struct Asset {
    pub identifier: String,
    pub display_symbol: String,
    pub category: Category,
    pub group: String,
    /// Name of the inventory source this line came from (e.g. `wallet`).
    pub source: String,
    pub declared_quantities: Vec<Decimal>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exchanges: Vec<String>,
    /// Price pinned by configuration; bypasses the shared price batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<CryptoProfile>,

    #[serde(skip)]
    pub(crate) price: OnceCell<Decimal>,
    #[serde(skip)]
    pub(crate) quantity: OnceCell<ResolvedQuantity>,
    #[serde(skip)]
    pub(crate) value: OnceCell<Decimal>,
}

impl Asset {
    pub fn new(
        identifier: impl Into<String>,
        category: Category,
        group: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        let identifier = identifier.into();
        Self {
            display_symbol: identifier.clone(),
            identifier,
            category,
            group: group.into(),
            source: source.into(),
            declared_quantities: Vec::new(),
            addresses: Vec::new(),
            exchanges: Vec::new(),
            fixed_price: None,
            profile: None,
            price: OnceCell::new(),
            quantity: OnceCell::new(),
            value: OnceCell::new(),
        }
    }

    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.declared_quantities.push(quantity);
        self
    }

    pub fn with_quantities(mut self, quantities: impl IntoIterator<Item = Decimal>) -> Self {
        self.declared_quantities.extend(quantities);
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.addresses.push(address.into());
        self
    }

    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchanges.push(exchange.into());
        self
    }

    pub fn with_fixed_price(mut self, price: Decimal) -> Self {
        self.fixed_price = Some(price);
        self
    }

    pub fn with_display_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.display_symbol = symbol.into();
        self
    }

    /// Attach a crypto profile. The display symbol follows the profile's ticker.
    pub fn with_profile(mut self, profile: CryptoProfile) -> Self {
        self.display_symbol = profile.symbol.clone();
        self.profile = Some(profile);
        self
    }

    /// Sum of literal amounts supplied directly by configuration.
    pub fn declared_total(&self) -> Decimal {
        self.declared_quantities.iter().copied().sum()
    }

    /// Already-resolved price, without triggering resolution.
    pub fn resolved_price(&self) -> Option<Decimal> {
        self.price.get().copied()
    }

    pub fn resolved_quantity(&self) -> Option<&ResolvedQuantity> {
        self.quantity.get()
    }

    pub fn resolved_value(&self) -> Option<Decimal> {
        self.value.get().copied()
    }
}

/// Where one piece of an asset's quantity came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceRef {
    Declared,
    Exchange { provider: String, symbol: String },
    Address {
        provider: String,
        address: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        contract: Option<String>,
    },
}

impl std::fmt::Display for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceRef::Declared => f.write_str("declared"),
            SourceRef::Exchange { provider, symbol } => write!(f, "{provider}:{symbol}"),
            SourceRef::Address {
                provider,
                address,
                contract,
            } => {
                let short: String = address.chars().take(10).collect();
                match contract {
                    Some(_) => write!(f, "{provider}:{short}.. (token)"),
                    None => write!(f, "{provider}:{short}.."),
                }
            }
        }
    }
}

/// One term of the quantity sum. A failed source contributes zero and
/// carries the failure so the report can show it.
#[derive(Debug, Clone, Serialize)]
pub struct Contribution {
    pub source: SourceRef,
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<NetworthError>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolvedQuantity {
    pub total: Decimal,
    pub contributions: Vec<Contribution>,
}

impl ResolvedQuantity {
    pub fn push(&mut self, source: SourceRef, amount: Decimal) {
        self.total += amount;
        self.contributions.push(Contribution {
            source,
            amount,
            error: None,
        });
    }

    pub fn push_failure(&mut self, source: SourceRef, error: NetworthError) {
        self.contributions.push(Contribution {
            source,
            amount: Decimal::ZERO,
            error: Some(error),
        });
    }

    pub fn failures(&self) -> impl Iterator<Item = &Contribution> {
        self.contributions.iter().filter(|c| c.error.is_some())
    }
}
