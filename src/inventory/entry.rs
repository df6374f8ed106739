use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{NetworthError, Result};
use crate::models::{Asset, Category, Chain, CryptoProfile};

/// One generic inventory entry, keyed by identifier.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct EntrySpec {
    category: CategorySpec,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    sources: BTreeMap<String, SourceSpec>,

    // Crypto metadata for identifiers outside the built-in table.
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    contract: Option<String>,
    #[serde(default)]
    decimals: Option<u32>,
    #[serde(default)]
    chain: Option<Chain>,
    #[serde(default)]
    stable: Option<bool>,
}

/// `category = "stock"` or `category = { name = "constant", price = 250000 }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CategorySpec {
    Name(String),
    Pinned {
        name: String,
        #[serde(default, alias = "fixed_price", alias = "fixedPrice")]
        price: Option<Decimal>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum QuantitySpec {
    One(Decimal),
    Many(Vec<Decimal>),
}

impl QuantitySpec {
    pub(super) fn into_vec(self) -> Vec<Decimal> {
        match self {
            QuantitySpec::One(q) => vec![q],
            QuantitySpec::Many(qs) => qs,
        }
    }
}

/// What a named source contributes to a holding.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SourceSpec {
    Literal(Decimal),
    Quantities {
        quantity: QuantitySpec,
    },
    Exchange {
        exchange: String,
    },
    Address {
        address: String,
        #[serde(default)]
        contract: Option<String>,
    },
    Locator(String),
}

pub(super) fn check_quantities(identifier: &str, quantities: &[Decimal]) -> Result<()> {
    match quantities.iter().find(|q| q.is_sign_negative() && !q.is_zero()) {
        Some(q) => Err(NetworthError::configuration(format!(
            "{identifier}: negative quantity {q}"
        ))),
        None => Ok(()),
    }
}

impl EntrySpec {
    fn profile(&self, identifier: &str) -> Option<CryptoProfile> {
        let has_overrides = self.symbol.is_some()
            || !self.aliases.is_empty()
            || self.contract.is_some()
            || self.decimals.is_some()
            || self.chain.is_some()
            || self.stable.is_some();

        let mut profile = match (CryptoProfile::lookup(identifier), &self.symbol) {
            (Some(profile), _) => profile,
            (None, Some(symbol)) => CryptoProfile::new(symbol.to_uppercase()),
            (None, None) if has_overrides => CryptoProfile::new(identifier.to_uppercase()),
            (None, None) => return None,
        };

        if let Some(symbol) = &self.symbol {
            profile.symbol = symbol.to_uppercase();
        }
        if !self.aliases.is_empty() {
            profile.aliases = self.aliases.iter().map(|a| a.to_uppercase()).collect();
        }
        if let Some(contract) = &self.contract {
            profile.contract = Some(contract.clone());
            profile.chain = Some(Chain::Ethereum);
        }
        if let Some(decimals) = self.decimals {
            profile.decimals = decimals;
        }
        if let Some(chain) = self.chain {
            profile.chain = Some(chain);
        }
        if let Some(stable) = self.stable {
            profile.stable = stable;
        }
        Some(profile)
    }

    /// Expand the entry into one holding per declared source.
    pub(super) fn into_assets(self, identifier: &str) -> Result<Vec<Asset>> {
        let (name, fixed_price) = match &self.category {
            CategorySpec::Name(name) => (name.as_str(), None),
            CategorySpec::Pinned { name, price } => (name.as_str(), *price),
        };
        let mut category = Category::parse(name).map_err(|_| {
            NetworthError::configuration(format!("{identifier}: unknown asset category {name:?}"))
        })?;

        if let Some(price) = fixed_price {
            if price.is_sign_negative() && !price.is_zero() {
                return Err(NetworthError::configuration(format!(
                    "{identifier}: negative price {price}"
                )));
            }
        }

        let profile = if category.accumulates_balances() {
            self.profile(identifier)
        } else {
            None
        };
        match (&profile, category) {
            (Some(p), Category::CryptoCurrency) if p.is_token() => {
                category = Category::EthereumToken;
            }
            (None, Category::EthereumToken) => {
                return Err(NetworthError::configuration(format!(
                    "{identifier}: token holdings need a `contract`"
                )));
            }
            (Some(p), Category::EthereumToken) if !p.is_token() => {
                return Err(NetworthError::configuration(format!(
                    "{identifier}: token holdings need a `contract`"
                )));
            }
            _ => {}
        }

        if self.sources.is_empty() {
            return Err(NetworthError::configuration(format!(
                "{identifier}: no sources declared"
            )));
        }

        let group = self
            .group
            .clone()
            .unwrap_or_else(|| category.section().to_string());

        let mut assets = Vec::with_capacity(self.sources.len());
        for (source_name, source) in self.sources {
            let mut asset = Asset::new(identifier, category, group.clone(), source_name.clone());
            if let Some(profile) = &profile {
                asset = asset.with_profile(profile.clone());
            }
            if let Some(price) = fixed_price {
                asset = asset.with_fixed_price(price);
            }

            let needs_balances = |what: &str| -> Result<()> {
                if category.accumulates_balances() {
                    Ok(())
                } else {
                    Err(NetworthError::configuration(format!(
                        "{identifier}.{source_name}: {category} holdings cannot use {what}"
                    )))
                }
            };

            asset = match source {
                SourceSpec::Literal(quantity) => {
                    check_quantities(identifier, &[quantity])?;
                    asset.with_quantity(quantity)
                }
                SourceSpec::Quantities { quantity } => {
                    let quantities = quantity.into_vec();
                    check_quantities(identifier, &quantities)?;
                    asset.with_quantities(quantities)
                }
                SourceSpec::Exchange { exchange } => {
                    needs_balances("exchange accounts")?;
                    asset.with_exchange(exchange.to_lowercase())
                }
                SourceSpec::Address {
                    address,
                    contract: Some(contract),
                } => {
                    needs_balances("addresses")?;
                    let mut scoped = profile
                        .clone()
                        .unwrap_or_else(|| CryptoProfile::new(identifier.to_uppercase()));
                    scoped.contract = Some(contract);
                    scoped.chain = Some(Chain::Ethereum);
                    asset.category = Category::EthereumToken;
                    asset.with_profile(scoped).with_address(address)
                }
                SourceSpec::Address {
                    address,
                    contract: None,
                }
                | SourceSpec::Locator(address) => {
                    needs_balances("addresses")?;
                    match &profile {
                        Some(p) if p.is_token() || p.chain.is_some() => {}
                        _ => {
                            return Err(NetworthError::configuration(format!(
                                "{identifier}.{source_name}: no chain known for address {address}; set `chain` or `contract`"
                            )))
                        }
                    }
                    asset.with_address(address)
                }
            };
            assets.push(asset);
        }
        Ok(assets)
    }
}
