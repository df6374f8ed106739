use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::GroupBy;
use crate::clock::Clock;
use crate::error::NetworthError;
use crate::models::{Category, SourceRef};
use crate::valuation::{UnvaluedAsset, ValuationRun, ValuedAsset};

/// Every holding sharing one identifier within a section, merged into a row.
#[derive(Debug, Serialize)]
pub struct AssetDetail<'a> {
    pub name: String,
    pub symbol: String,
    pub category: Category,
    /// Shared by every constituent; taken from the first.
    pub price: Decimal,
    pub quantity: Decimal,
    pub value: Decimal,
    /// Percentage of the whole portfolio, before any row is hidden.
    pub allocation: Decimal,
    pub constituents: Vec<&'a ValuedAsset>,
}

impl<'a> AssetDetail<'a> {
    fn from_constituents(constituents: Vec<&'a ValuedAsset>, total: Decimal) -> Option<Self> {
        let first: &'a ValuedAsset = constituents.first().copied()?;
        let quantity: Decimal = constituents.iter().map(|c| c.quantity.total).sum();
        let value: Decimal = constituents.iter().map(|c| c.value).sum();
        Some(Self {
            name: first.asset.identifier.clone(),
            symbol: first.asset.display_symbol.clone(),
            category: first.asset.category,
            price: first.price,
            quantity,
            value,
            allocation: allocation(value, total),
            constituents,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ReportSection<'a> {
    pub name: String,
    /// Ascending by value; equal values ordered by name.
    pub rows: Vec<AssetDetail<'a>>,
    pub subtotal: Decimal,
    pub allocation: Decimal,
}

/// A source that failed and was counted as zero.
#[derive(Debug, Serialize)]
pub struct DegradedSource<'a> {
    pub identifier: &'a str,
    pub source: &'a SourceRef,
    pub error: &'a NetworthError,
}

#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub generated_at: DateTime<Utc>,
    pub currency: String,
    pub group_by: GroupBy,
    pub min_balance: Decimal,
    /// Only sections with at least one row survive.
    pub sections: Vec<ReportSection<'a>>,
    /// Net worth: every valued holding, including hidden rows.
    pub total: Decimal,
    pub degraded: Vec<DegradedSource<'a>>,
    pub unvalued: Vec<&'a UnvaluedAsset>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub group_by: GroupBy,
    pub min_balance: Decimal,
    pub currency: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            group_by: GroupBy::default(),
            min_balance: Decimal::ZERO,
            currency: "USD".to_string(),
        }
    }
}

/// Share of `total`, in percent. A zero total gives 0% everywhere.
fn allocation(value: Decimal, total: Decimal) -> Decimal {
    if total.is_zero() {
        Decimal::ZERO
    } else {
        value / total * Decimal::ONE_HUNDRED
    }
}

fn section_key(asset: &ValuedAsset, group_by: GroupBy) -> String {
    match group_by {
        GroupBy::Group => asset.asset.group.clone(),
        GroupBy::Category => asset.asset.category.section().to_string(),
    }
}

/// Turn a valuation run into ordered report sections, stamped by `clock`.
pub fn aggregate<'a>(
    run: &'a ValuationRun,
    options: &ReportOptions,
    clock: &dyn Clock,
) -> Report<'a> {
    let total: Decimal = run.valued.iter().map(|v| v.value).sum();

    let mut partitions: BTreeMap<String, BTreeMap<&str, Vec<&ValuedAsset>>> = BTreeMap::new();
    for valued in &run.valued {
        partitions
            .entry(section_key(valued, options.group_by))
            .or_default()
            .entry(valued.asset.identifier.as_str())
            .or_default()
            .push(valued);
    }

    let mut sections = Vec::new();
    for (name, by_identifier) in partitions {
        let mut rows: Vec<AssetDetail<'a>> = by_identifier
            .into_values()
            .filter_map(|constituents| AssetDetail::from_constituents(constituents, total))
            .filter(|detail| detail.value >= options.min_balance)
            .collect();
        if rows.is_empty() {
            continue;
        }
        rows.sort_by(|a, b| a.value.cmp(&b.value).then_with(|| a.name.cmp(&b.name)));

        let subtotal: Decimal = rows.iter().map(|r| r.value).sum();
        let allocation: Decimal = rows.iter().map(|r| r.allocation).sum();
        sections.push(ReportSection {
            name,
            rows,
            subtotal,
            allocation,
        });
    }

    let degraded = run
        .valued
        .iter()
        .flat_map(|valued| {
            valued
                .degraded_sources()
                .map(move |(source, error)| DegradedSource {
                    identifier: valued.asset.identifier.as_str(),
                    source,
                    error,
                })
        })
        .collect();

    Report {
        generated_at: clock.now(),
        currency: options.currency.clone(),
        group_by: options.group_by,
        min_balance: options.min_balance,
        sections,
        total,
        degraded,
        unvalued: run.unvalued.iter().collect(),
    }
}
