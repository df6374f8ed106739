//! Structured per-class sections: `[bullion.gold]`, `[stocks.AAPL]`, ...

use std::collections::BTreeMap;

use serde::Deserialize;

use super::entry::{check_quantities, QuantitySpec};
use crate::error::{NetworthError, Result};
use crate::models::{Asset, Category};

const METAL_LABELS: [&str; 4] = ["gold", "silver", "platinum", "palladium"];

/// A reserved top-level section and the class it declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Section {
    Bullion,
    Institutions,
    Vehicles,
    Stocks,
    Fiat,
}

impl Section {
    pub(super) fn from_key(key: &str) -> Option<Self> {
        match key {
            "bullion" => Some(Section::Bullion),
            "institutions" => Some(Section::Institutions),
            "vehicles" => Some(Section::Vehicles),
            "stocks" => Some(Section::Stocks),
            "fiat" => Some(Section::Fiat),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Section::Bullion => "bullion",
            Section::Institutions => "institutions",
            Section::Vehicles => "vehicles",
            Section::Stocks => "stocks",
            Section::Fiat => "fiat",
        }
    }

    fn category(&self) -> Category {
        match self {
            Section::Bullion => Category::Metal,
            Section::Institutions => Category::Institution,
            Section::Vehicles => Category::Vehicle,
            Section::Stocks => Category::Equity,
            Section::Fiat => Category::Cash,
        }
    }

    fn default_group(&self) -> &'static str {
        match self {
            Section::Bullion => "bullion",
            Section::Institutions => "retirement",
            Section::Vehicles => "vehicles",
            Section::Stocks => "stocks",
            Section::Fiat => "fiat",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SectionEntry {
    quantity: QuantitySpec,
    #[serde(default)]
    group: Option<String>,
}

pub(super) fn parse_section(section: Section, value: serde_json::Value) -> Result<Vec<Asset>> {
    let entries: BTreeMap<String, SectionEntry> = serde_json::from_value(value).map_err(|e| {
        NetworthError::configuration(format!("[{}]: {e}", section.name()))
    })?;

    let mut assets = Vec::with_capacity(entries.len());
    for (label, entry) in entries {
        let identifier = match section {
            Section::Bullion => {
                let label = label.to_lowercase();
                if !METAL_LABELS.contains(&label.as_str()) {
                    return Err(NetworthError::configuration(format!(
                        "[bullion.{label}]: unknown metal; expected one of {}",
                        METAL_LABELS.join(", ")
                    )));
                }
                label
            }
            Section::Stocks => label.to_uppercase(),
            _ => label,
        };

        let quantities = entry.quantity.into_vec();
        check_quantities(&identifier, &quantities)?;

        let group = entry
            .group
            .unwrap_or_else(|| section.default_group().to_string());
        assets.push(
            Asset::new(identifier, section.category(), group, section.name())
                .with_quantities(quantities),
        );
    }
    Ok(assets)
}
