//! Price and balance provider adapters.
//!
//! Each adapter exposes one capability to the valuation engine: a batched
//! price lookup ([`PriceSource`]) or a single balance lookup
//! ([`BalanceSource`]). Authentication and pacing stay inside the adapter.

mod blockstream;
mod coinbase;
mod coingecko;
mod crypto_org;
mod etherscan;
mod gemini;
mod metals;
mod rate_gate;
mod registry;
mod sources;
mod twelve_data;

pub use blockstream::BlockstreamBalanceSource;
pub use coinbase::CoinbaseBalanceSource;
pub use coingecko::CoinGeckoPriceSource;
pub use crypto_org::CryptoOrgBalanceSource;
pub use etherscan::EtherscanBalanceSource;
pub use gemini::GeminiBalanceSource;
pub use metals::MetalsLivePriceSource;
pub use rate_gate::RateGate;
pub use registry::ProviderSet;
pub use sources::{BalanceQuery, BalanceSource, PriceSource};
pub use twelve_data::TwelveDataPriceSource;
