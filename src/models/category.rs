use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::NetworthError;

/// Closed set of holding kinds. The variant decides how a holding's price
/// and quantity are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Cash,
    Metal,
    Equity,
    Vehicle,
    Institution,
    CryptoCurrency,
    EthereumToken,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Cash,
        Category::Metal,
        Category::Equity,
        Category::Vehicle,
        Category::Institution,
        Category::CryptoCurrency,
        Category::EthereumToken,
    ];

    /// Parse an inventory category name.
    ///
    /// Case-insensitive; `-` and `_` are interchangeable.
    pub fn parse(name: &str) -> Result<Self, NetworthError> {
        let normalized = name.trim().to_lowercase().replace('-', "_");
        let category = match normalized.as_str() {
            "constant" | "cash" | "fiat" => Category::Cash,
            "metal" | "bullion" => Category::Metal,
            "stock" | "equity" => Category::Equity,
            "vehicle" => Category::Vehicle,
            "institution" => Category::Institution,
            "cryptocurrency" | "crypto" => Category::CryptoCurrency,
            "token" | "ethereum_token" | "erc20" => Category::EthereumToken,
            _ => {
                return Err(NetworthError::configuration(format!(
                    "unknown asset category {name:?}"
                )))
            }
        };
        Ok(category)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Cash => "cash",
            Category::Metal => "metal",
            Category::Equity => "equity",
            Category::Vehicle => "vehicle",
            Category::Institution => "institution",
            Category::CryptoCurrency => "cryptocurrency",
            Category::EthereumToken => "ethereum_token",
        }
    }

    /// Top-level report section used when grouping by category.
    pub fn section(&self) -> &'static str {
        match self {
            Category::Cash => "fiat",
            Category::Metal => "bullion",
            Category::Equity => "equity",
            Category::Vehicle => "vehicle",
            Category::Institution => "institution",
            Category::CryptoCurrency | Category::EthereumToken => "crypto",
        }
    }

    /// Key of the shared price batch this category reads from.
    ///
    /// Tokens are priced by the same market feed as every other crypto
    /// identifier, so both variants share one batch.
    pub fn pricing_key(&self) -> Option<Category> {
        match self {
            Category::Metal => Some(Category::Metal),
            Category::Equity => Some(Category::Equity),
            Category::CryptoCurrency | Category::EthereumToken => Some(Category::CryptoCurrency),
            Category::Cash | Category::Vehicle | Category::Institution => None,
        }
    }

    /// Whether quantity includes exchange and on-chain balances.
    pub fn accumulates_balances(&self) -> bool {
        matches!(self, Category::CryptoCurrency | Category::EthereumToken)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
