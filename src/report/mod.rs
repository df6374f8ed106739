//! Grouping valued holdings into sections and rendering them.

mod aggregate;
mod render;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use aggregate::{aggregate, AssetDetail, DegradedSource, Report, ReportOptions, ReportSection};
pub use render::{render_json, render_text};

/// Partition key for report sections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    /// The holding's configured group.
    #[default]
    Group,
    /// The holding's asset class.
    Category,
}

impl FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "group" => Ok(GroupBy::Group),
            "category" => Ok(GroupBy::Category),
            other => Err(format!("Invalid group-by: {other:?} (expected group or category)")),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupBy::Group => f.write_str("group"),
            GroupBy::Category => f.write_str("category"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_by_parses_either_key() {
        assert_eq!("group".parse::<GroupBy>().unwrap(), GroupBy::Group);
        assert_eq!("Category".parse::<GroupBy>().unwrap(), GroupBy::Category);
        assert!("owner".parse::<GroupBy>().is_err());
        assert_eq!(GroupBy::Category.to_string(), "category");
    }
}
