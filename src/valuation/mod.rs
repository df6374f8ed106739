//! Price and quantity resolution for declared holdings.

mod balances;
mod cache;
mod valuator;

pub use balances::{BalanceCache, BalanceKey};
pub use cache::PricingCache;
pub use valuator::{UnvaluedAsset, ValuationRun, ValuedAsset, Valuator, DEFAULT_CONCURRENCY};
