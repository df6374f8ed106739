use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::credentials::CredentialConfig;
use crate::duration::deserialize_duration_opt;
use crate::report::GroupBy;

fn default_reporting_currency() -> String {
    "USD".to_string()
}

/// Default inventory file name, next to the config file.
const DEFAULT_INVENTORY: &str = "assets.toml";

/// How amounts are printed in the text report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Fixed number of decimals for currency amounts; `None` prints them raw.
    pub currency_decimals: Option<u32>,

    /// Insert thousands separators into currency amounts.
    pub currency_grouping: bool,

    /// Prefix for currency amounts, e.g. `$`.
    pub currency_symbol: Option<String>,

    /// Report width in columns; the name column absorbs the slack.
    pub width: usize,

    /// Shown in place of amounts when values are hidden.
    pub placeholder: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency_decimals: Some(2),
            currency_grouping: true,
            currency_symbol: Some("$".to_string()),
            width: 80,
            placeholder: "****".to_string(),
        }
    }
}

/// Report shaping defaults; each can be overridden on the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub group_by: GroupBy,

    /// Rows worth less than this are hidden.
    pub min_balance: Decimal,

    /// Groups dropped from the inventory before anything is valued.
    pub exclude_groups: Vec<String>,

    /// Maximum number of holdings resolving quantities at once.
    pub concurrency: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            group_by: GroupBy::default(),
            min_balance: Decimal::ZERO,
            exclude_groups: Vec::new(),
            concurrency: 8,
        }
    }
}

/// Settings shared by every provider adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub enabled: bool,

    /// Override the API endpoint (mirrors, local test servers).
    pub base_url: Option<String>,

    /// Minimum delay between two requests to this provider.
    #[serde(deserialize_with = "deserialize_duration_opt")]
    pub min_interval: Option<Duration>,

    /// Where the provider's secrets live. Defaults to environment variables
    /// prefixed with the provider name.
    pub credentials: Option<CredentialConfig>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            min_interval: None,
            credentials: None,
        }
    }
}

impl ProviderSettings {
    /// Configured credential backend, or `<PREFIX>_*` environment variables.
    pub fn credentials_or_env(&self, prefix: &str) -> CredentialConfig {
        self.credentials
            .clone()
            .unwrap_or_else(|| CredentialConfig::env(prefix))
    }
}

/// Per-provider settings, one table per adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub coingecko: ProviderSettings,
    pub twelve_data: ProviderSettings,
    pub metals: ProviderSettings,
    pub coinbase: ProviderSettings,
    pub gemini: ProviderSettings,
    pub etherscan: ProviderSettings,
    pub blockstream: ProviderSettings,
    pub crypto_org: ProviderSettings,
}

/// Contents of `networth.toml`. Every table is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inventory file; relative paths are taken from the config file's directory.
    pub inventory: Option<PathBuf>,

    /// Currency every price is quoted in.
    #[serde(default = "default_reporting_currency")]
    pub reporting_currency: String,

    pub display: DisplayConfig,

    pub report: ReportConfig,

    pub providers: ProvidersConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inventory: None,
            reporting_currency: default_reporting_currency(),
            display: DisplayConfig::default(),
            report: ReportConfig::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Malformed config {}", path.display()))
    }

    pub fn resolve_inventory(&self, config_dir: &Path) -> PathBuf {
        match &self.inventory {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => config_dir.join(path),
            None => config_dir.join(DEFAULT_INVENTORY),
        }
    }
}

/// A [`Config`] whose inventory path has been made absolute.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub inventory: PathBuf,

    pub reporting_currency: String,
    pub display: DisplayConfig,
    pub report: ReportConfig,
    pub providers: ProvidersConfig,
}

impl ResolvedConfig {
    fn from_config(config: Config, config_dir: &Path) -> Self {
        Self {
            inventory: config.resolve_inventory(config_dir),
            reporting_currency: config.reporting_currency,
            display: config.display,
            report: config.report,
            providers: config.providers,
        }
    }

    /// Read `config_path` and anchor the inventory path at its directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        Ok(Self::from_config(config, config_dir))
    }

    /// Like [`ResolvedConfig::load`], but a missing file yields the defaults
    /// with the inventory expected where the config would have been.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };

        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        Ok(Self::from_config(Config::default(), config_dir))
    }
}

/// `./networth.toml` when present, else `networth/networth.toml` in the
/// platform config directory.
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("networth.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("networth").join("networth.toml");
    }

    local_config
}
