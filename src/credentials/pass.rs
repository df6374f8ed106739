//! Reads provider secrets out of a `pass` entry.
//!
//! An entry holds the password on its first line and any number of
//! `name: value` lines below it.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use super::CredentialStore;

/// Which entry to read, and how provider keys map onto its lines.
///
/// ```toml
/// credentials = { backend = "pass", path = "finance/gemini", fields = { api_secret = "secret" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassConfig {
    pub path: String,

    /// Provider key to entry line name. Unmapped keys are looked up verbatim.
    #[serde(default)]
    pub fields: HashMap<String, String>,
}

/// Runs `pass show` on every lookup; nothing is cached in process.
pub struct PassCredentialStore {
    config: PassConfig,
}

impl PassCredentialStore {
    pub fn new(config: PassConfig) -> Self {
        Self { config }
    }

    fn field_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.config.fields.get(key).map_or(key, String::as_str)
    }

    async fn read_entry(&self) -> Result<HashMap<String, String>> {
        let path = &self.config.path;
        let output = tokio::process::Command::new("pass")
            .args(["show", path.as_str()])
            .output()
            .await
            .with_context(|| format!("could not launch pass for {path}"))?;

        if !output.status.success() {
            anyhow::bail!(
                "pass show {path} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let content = String::from_utf8(output.stdout)
            .with_context(|| format!("pass entry {path} is not UTF-8"))?;
        Ok(parse_entry(&content))
    }
}

#[async_trait]
impl CredentialStore for PassCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<SecretString>> {
        let field = self.field_name(key);
        let mut entry = self.read_entry().await?;
        Ok(entry.remove(field).map(|value| SecretString::new(value.into())))
    }
}

/// Parse `name: value` lines; the first line doubles as `password`.
fn parse_entry(content: &str) -> HashMap<String, String> {
    let mut lines = content.lines();
    let mut fields = HashMap::new();

    if let Some(first) = lines.next() {
        fields.insert("password".to_string(), first.to_string());
    }

    for line in lines {
        if let Some((key, value)) = line.split_once(": ") {
            // single-line PEM with escaped newlines
            fields.insert(key.to_string(), value.replace("\\n", "\n"));
        }
    }

    fields
}
