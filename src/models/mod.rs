mod asset;
mod category;
mod profile;

pub use asset::{Asset, Contribution, ResolvedQuantity, SourceRef};
pub use category::Category;
pub use profile::{Chain, CryptoProfile};
