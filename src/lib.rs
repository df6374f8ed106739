//! Net worth reporting across fiat, metals, equities, crypto and fixed-value
//! holdings.
//!
//! An [`inventory::Inventory`] declares holdings; a [`valuation::Valuator`]
//! resolves each one's price and quantity through the configured
//! [`providers`]; [`report`] groups the results into sections with allocation
//! percentages.

pub mod clock;
pub mod config;
pub mod credentials;
pub mod duration;
pub mod error;
pub mod format;
pub mod inventory;
pub mod models;
pub mod providers;
pub mod report;
pub mod valuation;
