//! Declarative inventory of holdings.
//!
//! The inventory is a TOML or JSON document. Top-level keys are holding
//! identifiers, except the reserved class sections (`bullion`,
//! `institutions`, `vehicles`, `stocks`, `fiat`):
//!
//! ```toml
//! [bitcoin]
//! category = "cryptocurrency"
//! group = "crypto"
//! sources = { wallet = "bc1q...", exchange = 0.5, gemini = { exchange = "gemini" } }
//!
//! [bullion.gold]
//! quantity = [1.0, 0.5]
//! ```
//!
//! A key may also be a ticker from the built-in crypto table (`BTC`,
//! `usdc`); the key stays the price identifier and the ticker's profile
//! supplies the chain and exchange symbols.
//!
//! YAML inventories are not read. Convert an `assets.yaml` to TOML or JSON
//! first; the entry shapes are the same.
//!
//! Every problem is reported as a configuration error before any provider is
//! contacted.

mod entry;
mod sections;

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::NetworthError;
use crate::models::Asset;

use entry::EntrySpec;
use sections::{parse_section, Section};

/// Holdings declared by one inventory document, one per source.
#[derive(Debug, Default)]
pub struct Inventory {
    assets: Vec<Asset>,
}

impl Inventory {
    /// Load an inventory file. `.json` files are read as JSON, anything else
    /// as TOML. `.yaml`/`.yml` files are rejected.
    pub fn load(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
        if matches!(extension.as_deref(), Some("yaml" | "yml")) {
            return Err(NetworthError::configuration(format!(
                "{}: YAML inventories are not supported; convert it to TOML or JSON",
                path.display()
            ))
            .into());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read inventory file: {}", path.display()))?;

        let inventory = if extension.as_deref() == Some("json") {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
        .with_context(|| format!("Failed to load inventory: {}", path.display()))?;

        info!(
            path = %path.display(),
            holdings = inventory.assets.len(),
            "loaded inventory"
        );
        Ok(inventory)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, NetworthError> {
        let value: Value = toml::from_str(content)
            .map_err(|e| NetworthError::configuration(format!("malformed TOML: {e}")))?;
        Self::from_value(value)
    }

    pub fn from_json_str(content: &str) -> Result<Self, NetworthError> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| NetworthError::configuration(format!("malformed JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, NetworthError> {
        let Value::Object(entries) = value else {
            return Err(NetworthError::configuration(
                "inventory must be a table of holdings",
            ));
        };

        let mut assets = Vec::new();
        for (key, value) in entries {
            if let Some(section) = Section::from_key(&key) {
                assets.extend(parse_section(section, value)?);
                continue;
            }

            let spec: EntrySpec = serde_json::from_value(value)
                .map_err(|e| NetworthError::configuration(format!("{key}: {e}")))?;
            let expanded = spec.into_assets(&key)?;
            debug!(identifier = %key, sources = expanded.len(), "parsed inventory entry");
            assets.extend(expanded);
        }

        Ok(Self { assets })
    }

    /// Drop every holding in one of `groups`. Returns how many were dropped.
    pub fn exclude_groups<S: AsRef<str>>(&mut self, groups: &[S]) -> usize {
        if groups.is_empty() {
            return 0;
        }
        let excluded: BTreeSet<&str> = groups.iter().map(|g| g.as_ref()).collect();
        let before = self.assets.len();
        self.assets
            .retain(|asset| !excluded.contains(asset.group.as_str()));
        let dropped = before - self.assets.len();
        if dropped > 0 {
            info!(dropped, groups = ?excluded, "excluded holdings by group");
        }
        dropped
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn into_assets(self) -> Vec<Asset> {
        self.assets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Chain};
    use rust_decimal_macros::dec;

    fn find<'a>(inventory: &'a Inventory, identifier: &str, source: &str) -> &'a Asset {
        inventory
            .assets()
            .iter()
            .find(|a| a.identifier == identifier && a.source == source)
            .unwrap_or_else(|| panic!("no holding {identifier}.{source}"))
    }

    #[test]
    fn one_holding_per_source() {
        let inventory = Inventory::from_toml_str(
            r#"
[bitcoin]
category = "cryptocurrency"
group = "crypto"

[bitcoin.sources]
wallet = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"
exchange = 0.5
cold = { quantity = [0.1, 0.2] }
gemini = { exchange = "Gemini" }
"#,
        )
        .unwrap();

        assert_eq!(inventory.len(), 4);
        let wallet = find(&inventory, "bitcoin", "wallet");
        assert_eq!(wallet.addresses, vec!["1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"]);
        assert_eq!(wallet.display_symbol, "BTC");
        assert_eq!(wallet.profile.as_ref().unwrap().chain, Some(Chain::Bitcoin));

        assert_eq!(find(&inventory, "bitcoin", "exchange").declared_total(), dec!(0.5));
        assert_eq!(find(&inventory, "bitcoin", "cold").declared_total(), dec!(0.3));
        assert_eq!(find(&inventory, "bitcoin", "gemini").exchanges, vec!["gemini"]);
    }

    #[test]
    fn ticker_keys_use_the_builtin_profile() {
        let inventory = Inventory::from_toml_str(
            r#"
[BTC]
category = "cryptocurrency"
group = "crypto"
sources = { wallet = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa", exchange = 0.5 }
"#,
        )
        .unwrap();

        assert_eq!(inventory.len(), 2);
        let wallet = find(&inventory, "BTC", "wallet");
        assert_eq!(wallet.category, Category::CryptoCurrency);
        assert_eq!(wallet.display_symbol, "BTC");
        assert_eq!(wallet.profile.as_ref().unwrap().chain, Some(Chain::Bitcoin));
        assert_eq!(find(&inventory, "BTC", "exchange").declared_total(), dec!(0.5));
    }

    #[test]
    fn yaml_files_are_rejected_before_reading() {
        let err = Inventory::load(Path::new("/nonexistent/assets.yaml")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<NetworthError>(),
            Some(NetworthError::Configuration(message)) if message.contains("TOML or JSON")
        ));
    }

    #[test]
    fn pinned_price_and_constant() {
        let inventory = Inventory::from_toml_str(
            r#"
[house]
category = { name = "constant", price = 250000 }
group = "real-estate"
sources = { deed = 1 }

[checking]
category = "constant"
group = "liquid"
sources = { bank = 1520.35 }
"#,
        )
        .unwrap();

        let house = find(&inventory, "house", "deed");
        assert_eq!(house.category, Category::Cash);
        assert_eq!(house.fixed_price, Some(dec!(250000)));
        assert_eq!(find(&inventory, "checking", "bank").fixed_price, None);
    }

    #[test]
    fn contract_profiles_become_tokens() {
        let inventory = Inventory::from_json_str(
            r#"{
                "chainlink": {"category": "cryptocurrency", "group": "crypto", "sources": {"ledger": "0xabc"}},
                "mystery": {"category": "crypto", "symbol": "mys", "contract": "0xdef", "decimals": 9,
                            "sources": {"ledger": "0xabc"}}
            }"#,
        )
        .unwrap();

        let link = find(&inventory, "chainlink", "ledger");
        assert_eq!(link.category, Category::EthereumToken);
        let mystery = find(&inventory, "mystery", "ledger");
        assert_eq!(mystery.category, Category::EthereumToken);
        assert_eq!(mystery.display_symbol, "MYS");
        assert_eq!(mystery.profile.as_ref().unwrap().decimals, 9);
        assert_eq!(mystery.group, "crypto");
    }

    #[test]
    fn structured_sections() {
        let inventory = Inventory::from_toml_str(
            r#"
[bullion.gold]
quantity = [1.0, 0.5]

[institutions.401k]
quantity = 120000

[vehicles.truck]
quantity = 18000
group = "garage"

[stocks.aapl]
quantity = 10

[fiat.usd]
quantity = 250
"#,
        )
        .unwrap();

        assert_eq!(inventory.len(), 5);
        let gold = find(&inventory, "gold", "bullion");
        assert_eq!(gold.category, Category::Metal);
        assert_eq!(gold.declared_total(), dec!(1.5));
        assert_eq!(find(&inventory, "401k", "institutions").group, "retirement");
        assert_eq!(find(&inventory, "truck", "vehicles").group, "garage");
        assert_eq!(find(&inventory, "AAPL", "stocks").category, Category::Equity);
        assert_eq!(find(&inventory, "usd", "fiat").category, Category::Cash);
    }

    #[test]
    fn configuration_errors() {
        let cases = [
            r#"[x]
category = "beanie-babies"
sources = { a = 1 }"#,
            r#"[x]
category = "stock"
sources = { a = -1 }"#,
            r#"[x]
category = "stock"
sources = { a = "0xabc" }"#,
            r#"[x]
category = "constant"
sources = { a = { exchange = "gemini" } }"#,
            r#"[unknown-coin]
category = "cryptocurrency"
sources = { a = "0xabc" }"#,
            r#"[x]
category = "token"
sources = { a = 1 }"#,
            r#"[x]
category = "stock""#,
            r#"[bullion.unobtainium]
quantity = 1"#,
            r#"[x]
category = "stock"
sources = { a = 1 }
colour = "blue""#,
        ];

        for case in cases {
            let err = Inventory::from_toml_str(case).unwrap_err();
            assert!(
                matches!(err, NetworthError::Configuration(_)),
                "expected configuration error for {case}"
            );
        }
    }

    #[test]
    fn exclude_groups_drops_holdings() {
        let mut inventory = Inventory::from_toml_str(
            r#"
[vehicles.truck]
quantity = 18000

[fiat.usd]
quantity = 250
"#,
        )
        .unwrap();

        assert_eq!(inventory.exclude_groups(&["vehicles"]), 1);
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.assets()[0].identifier, "usd");
    }
}
