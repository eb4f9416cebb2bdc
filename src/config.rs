// Client configuration, layered the usual way:
// defaults -> optional config.toml -> CARMARKET_* environment variables.

use anyhow::{bail, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    // UI-level cap on how many listings can be compared at once
    pub compare_limit: usize,
    pub auth_token: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_base_url: "http://127.0.0.1:5001".to_string(),
            request_timeout_secs: 15,
            compare_limit: 4,
            auth_token: None,
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let defaults = Settings::default();
        let builder = Config::builder()
            .set_default("api_base_url", defaults.api_base_url)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs)?
            .set_default("compare_limit", defaults.compare_limit as u64)?
            // Load from a configuration file (e.g., config.toml)
            .add_source(File::with_name("config").required(false))
            // Load from environment variables (e.g., CARMARKET_API_BASE_URL)
            .add_source(
                Environment::with_prefix("CARMARKET")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.api_base_url.trim();
        if url.is_empty() {
            bail!("api_base_url must not be empty");
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("api_base_url must be an http(s) URL, got '{}'", url);
        }
        if self.compare_limit < 2 {
            bail!("compare_limit must allow at least two listings, got {}", self.compare_limit);
        }
        Ok(())
    }
}
