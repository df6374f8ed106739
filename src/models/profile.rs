use serde::{Deserialize, Serialize};

/// Chain whose explorer resolves native address balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Chain {
    Bitcoin,
    Ethereum,
    CryptoOrg,
}

impl Chain {
    /// Name of the balance provider that serves this chain.
    pub fn provider(&self) -> &'static str {
        match self {
            Chain::Bitcoin => "blockstream",
            Chain::Ethereum => "etherscan",
            Chain::CryptoOrg => "crypto_org",
        }
    }
}

/// Market-data identifiers with a built-in profile.
pub const BUILTIN_IDENTIFIERS: &[&str] = &[
    "aave",
    "adventure-gold",
    "algorand",
    "axie-infinity",
    "bitcoin",
    "cardano",
    "chainlink",
    "crypto-com-chain",
    "decentraland",
    "dydx",
    "ergo",
    "ethereum",
    "fantom",
    "gemini-dollar",
    "havven",
    "illuvium",
    "loopring",
    "matic-network",
    "rari-governance-token",
    "rocket-pool",
    "smooth-love-potion",
    "tether",
    "the-graph",
    "the-sandbox",
    "uniswap",
    "usd-coin",
];

/// How a crypto identifier maps onto exchanges and chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoProfile {
    /// Exchange ticker, e.g. `ETH`.
    pub symbol: String,
    /// Extra exchange tickers that hold the same asset (e.g. `ETH2`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// ERC-20 contract; when set, address balances are contract-scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
    pub decimals: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<Chain>,
    /// Pegged to the display currency; priced at 1.0 without a fetch.
    #[serde(default)]
    pub stable: bool,
}

impl CryptoProfile {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            aliases: Vec::new(),
            contract: None,
            decimals: 18,
            chain: None,
            stable: false,
        }
    }

    fn token(symbol: &str, contract: &str) -> Self {
        Self {
            contract: Some(contract.to_string()),
            chain: Some(Chain::Ethereum),
            ..Self::new(symbol)
        }
    }

    fn native(symbol: &str, chain: Chain) -> Self {
        Self {
            chain: Some(chain),
            ..Self::new(symbol)
        }
    }

    fn with_decimals(mut self, decimals: u32) -> Self {
        self.decimals = decimals;
        self
    }

    fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    fn stable(mut self) -> Self {
        self.stable = true;
        self
    }

    /// Symbol followed by aliases, in lookup order.
    pub fn exchange_symbols(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.symbol.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn is_token(&self) -> bool {
        self.contract.is_some()
    }

    /// Built-in profile for a market-data identifier (CoinGecko id).
    pub fn builtin(identifier: &str) -> Option<Self> {
        let profile = match identifier {
            "aave" => Self::token("AAVE", "0x7fc66500c84a76ad7e9c93437bfc5ac33e2ddae9"),
            "adventure-gold" => Self::token("AGLD", "0x32353a6c91143bfd6c7d363b546e62a9a2489a20"),
            "algorand" => Self::new("ALGO"),
            "axie-infinity" => Self::token("AXS", "0xbb0e17ef65f82ab018d8edd776e8dd940327b28b"),
            "bitcoin" => Self::native("BTC", Chain::Bitcoin),
            "cardano" => Self::new("ADA"),
            "chainlink" => Self::token("LINK", "0x514910771af9ca656af840dff83e8264ecf986ca"),
            "crypto-com-chain" => Self::native("CRO", Chain::CryptoOrg),
            "decentraland" => Self::token("MANA", "0x0f5d2fb29fb7d3cfee444a200298f468908cc942"),
            "dydx" => Self::token("DYDX", "0x92d6c1e31e14520e676a687f0a93788b716beff5"),
            "ergo" => Self::new("ERG"),
            "ethereum" => Self::native("ETH", Chain::Ethereum).with_alias("ETH2"),
            "fantom" => Self::token("FTM", "0x4e15361fd6b4bb609fa63c81a2be19d873717870"),
            "gemini-dollar" => {
                Self::token("GUSD", "0x056fd409e1d7a124bd7017459dfea2f387b6d5cd").with_decimals(2)
            }
            "havven" => Self::token("SNX", "0xc011a73ee8576fb46f5e1c5751ca3b9fe0af2a6f"),
            "illuvium" => Self::token("ILV", "0x767fe9edc9e0df98e07454847909b5e959d7ca0e"),
            "loopring" => Self::token("LRC", "0xbbbbca6a901c926f240b89eacb641d8aec7aeafd"),
            "matic-network" => Self::token("MATIC", "0x7d1afa7b718fb893db30a3abc0cfc608aacfebb0"),
            "rari-governance-token" => {
                Self::token("RGT", "0xd291e7a03283640fdc51b121ac401383a46cc623")
            }
            "rocket-pool" => Self::token("RPL", "0xb4efd85c19999d84251304bda99e90b92300bd93"),
            "smooth-love-potion" => {
                Self::token("SLP", "0xcc8fa225d80b9c7d42f96e9570156c65d6caaa25").with_decimals(0)
            }
            "tether" => Self::token("USDT", "0xdac17f958d2ee523a2206206994597c13d831ec7")
                .with_decimals(6)
                .stable(),
            "the-graph" => Self::token("GRT", "0xc944e90c64b2c07662a292be6244bdf05cda44a7"),
            "the-sandbox" => Self::token("SAND", "0x3845badade8e6dff049820680d1f14bd3903a5d0"),
            "uniswap" => Self::token("UNI", "0x1f9840a85d5af5bf1d1762f925bdaddc4201f984"),
            "usd-coin" => Self::token("USDC", "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48")
                .with_decimals(6)
                .stable(),
            _ => return None,
        };
        Some(profile)
    }

    /// Built-in profile whose ticker or alias is `symbol`, ignoring case.
    pub fn builtin_by_symbol(symbol: &str) -> Option<Self> {
        BUILTIN_IDENTIFIERS
            .iter()
            .filter_map(|id| Self::builtin(id))
            .find(|profile| {
                profile
                    .exchange_symbols()
                    .any(|s| s.eq_ignore_ascii_case(symbol))
            })
    }

    /// Profile for an inventory key: a market-data identifier or a ticker.
    pub fn lookup(key: &str) -> Option<Self> {
        Self::builtin(key).or_else(|| Self::builtin_by_symbol(key))
    }
}
