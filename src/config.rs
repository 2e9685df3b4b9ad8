//! TOML configuration.
//!
//! One file describes the provider endpoint, the HTTP client's polling
//! behavior, blob storage, the SQLite database, the HTTP server, and the
//! ordered list of document categories:
//!
//! ```toml
//! [azure]
//! endpoint = "https://my-resource.services.ai.azure.com"
//! router_analyzer_id = "doc-router"
//!
//! [client]
//! poll_interval_ms = 2000
//! max_poll_attempts = 300
//!
//! [storage]
//! root = "./data/blobs"
//! public_url = "https://docs.example.com"
//!
//! [db]
//! path = "./data/docorch.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [[categories]]
//! id = "invoice"
//! display_name = "Invoice"
//! analyzer_id = "invoice-extractor"
//! classification_prompt = "Vendor invoices with line items and totals"
//!
//! [categories.extraction_schema.total]
//! type = "number"
//! ```
//!
//! Secrets are never read from this file. The provider key and the blob
//! signing key come from the environment variables named by
//! `client.api_key_env` and `storage.signing_key_env`.

use anyhow::{bail, Context, Result};
use doc_orchestrator_core::{AzureSettings, Category, PipelineConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub azure: AzureSettings,
    #[serde(default)]
    pub client: ClientConfig,
    pub storage: StorageConfig,
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Config {
    /// The routing settings and categories, as consumed by the pipeline.
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            azure: self.azure.clone(),
            categories: self.categories.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
        }
    }
}

impl ClientConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_api_key_env() -> String {
    "AZURE_CU_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_poll_interval_ms() -> u64 {
    2000
}
fn default_max_poll_attempts() -> u32 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub public_url: String,
    #[serde(default = "default_access_ttl_secs")]
    pub access_ttl_secs: u64,
    #[serde(default = "default_signing_key_env")]
    pub signing_key_env: String,
}

impl StorageConfig {
    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_secs)
    }

    /// The signing key from the environment, if one is set and non-empty.
    pub fn signing_key(&self) -> Option<Vec<u8>> {
        std::env::var(&self.signing_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .map(String::into_bytes)
    }
}

fn default_access_ttl_secs() -> u64 {
    86_400
}
fn default_signing_key_env() -> String {
    "DOCORCH_SIGNING_KEY".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and check a configuration document.
///
/// Only structural problems are rejected here. Pipeline issues such as
/// duplicate analyzer ids are reported by [`PipelineConfig::validate`] and
/// enforced when analyzers are provisioned.
pub fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.client.poll_interval_ms == 0 {
        bail!("client.poll_interval_ms must be > 0");
    }
    if config.client.max_poll_attempts == 0 {
        bail!("client.max_poll_attempts must be >= 1");
    }
    if config.storage.access_ttl_secs == 0 {
        bail!("storage.access_ttl_secs must be > 0");
    }

    for category in &mut config.categories {
        category.classification_prompt = category.classification_prompt.trim().to_string();
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[storage]
root = "/tmp/blobs"
public_url = "http://localhost:8080"

[db]
path = "/tmp/docorch.sqlite"
"#;

    #[test]
    fn test_defaults_apply() {
        let cfg = parse_config(MINIMAL).unwrap();
        assert_eq!(cfg.client.api_key_env, "AZURE_CU_API_KEY");
        assert_eq!(cfg.client.poll_interval(), Duration::from_secs(2));
        assert_eq!(cfg.client.max_poll_attempts, 300);
        assert_eq!(cfg.storage.access_ttl(), Duration::from_secs(86_400));
        assert_eq!(cfg.server.bind, "127.0.0.1:8080");
        assert_eq!(cfg.azure.router_analyzer_id, "doc-router");
        assert!(cfg.categories.is_empty());
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let content = format!("{}\n[client]\npoll_interval_ms = 0\n", MINIMAL);
        let err = parse_config(&content).unwrap_err();
        assert!(err.to_string().contains("poll_interval_ms"));
    }

    #[test]
    fn test_zero_attempts_is_rejected() {
        let content = format!("{}\n[client]\nmax_poll_attempts = 0\n", MINIMAL);
        assert!(parse_config(&content).is_err());
    }

    #[test]
    fn test_categories_and_prompt_trimming() {
        let content = format!(
            r#"{}
[azure]
endpoint = "https://cu.example.com"

[[categories]]
id = "invoice"
display_name = "Invoice"
analyzer_id = "invoice-extractor"
classification_prompt = "  Vendor invoices  "

[categories.extraction_schema.total]
type = "number"

[categories.extraction_schema.vendor]
description = "Vendor name"
"#,
            MINIMAL
        );
        let cfg = parse_config(&content).unwrap();
        let pipeline = cfg.pipeline();
        assert_eq!(pipeline.categories.len(), 1);
        let invoice = &pipeline.categories[0];
        assert_eq!(invoice.classification_prompt, "Vendor invoices");
        assert_eq!(
            invoice.extraction_schema.keys().collect::<Vec<_>>(),
            vec!["total", "vendor"]
        );
        assert!(pipeline.validate().is_empty());
    }

    #[test]
    fn test_example_config_parses() {
        let cfg = parse_config(include_str!("../config/docorch.example.toml")).unwrap();
        let pipeline = cfg.pipeline();
        assert!(pipeline.validate().is_empty());
        assert_eq!(pipeline.categories.len(), 2);

        let claim = pipeline.get_category("health_claim").unwrap();
        assert!(claim.classification_prompt.starts_with("Medical insurance"));
        assert!(claim.classification_prompt.ends_with("amounts claimed."));
        assert_eq!(
            claim.extraction_schema.keys().collect::<Vec<_>>(),
            vec!["memberName", "serviceDate", "totalClaimed", "lineItems"]
        );
        assert_eq!(
            pipeline
                .get_category_by_analyzer("invoice-extractor")
                .map(|c| c.id.as_str()),
            Some("invoice")
        );
    }
}
