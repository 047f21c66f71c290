//! Layered application configuration
//!
//! Credentials come from a TOML file under the platform config directory,
//! overridable through `IDSYNC_`-prefixed environment variables
//! (`IDSYNC_API__KEY_ID`, `IDSYNC_API__KEY_SECRET`, `IDSYNC_API__BASE_URL`).

use anyhow::{Result, bail};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Key-id prefix that selects the EU API instance
pub const EU_KEY_PREFIX: &str = "vera01";

const API_BASE_EU: &str = "https://api.veracode.eu/";
const API_BASE_COM: &str = "https://api.veracode.com/";

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct ApiConfig {
    #[serde(default)]
    pub key_id: String,
    #[serde(default)]
    pub key_secret: String,
    /// Overrides the region-derived base URL when set
    #[serde(default)]
    pub base_url: Option<String>,
}

impl AppConfig {
    /// Loads defaults, then the config file, then environment overrides
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(Self::default_config_path()))
            .merge(Env::prefixed("IDSYNC_").split("__"))
            .extract()
    }

    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("idsync").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".idsync.toml"))
    }

    /// API base URL, with a trailing slash. Falls back to the regional
    /// instance implied by the key-id prefix.
    pub fn api_base(&self) -> String {
        if let Some(base) = &self.api.base_url {
            if base.ends_with('/') {
                return base.clone();
            }
            return format!("{base}/");
        }
        if self.api.key_id.starts_with(EU_KEY_PREFIX) {
            API_BASE_EU.to_string()
        } else {
            API_BASE_COM.to_string()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.key_id.trim().is_empty() || self.api.key_secret.trim().is_empty() {
            bail!(
                "API credentials are not configured; set IDSYNC_API__KEY_ID and \
                 IDSYNC_API__KEY_SECRET or add them to {}",
                Self::default_config_path().display()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(key_id: &str) -> AppConfig {
        AppConfig {
            api: ApiConfig {
                key_id: key_id.to_string(),
                key_secret: "cafe".to_string(),
                base_url: None,
            },
        }
    }

    #[test]
    fn eu_key_prefix_selects_the_eu_instance() {
        assert_eq!(config("vera01-abc").api_base(), "https://api.veracode.eu/");
        assert_eq!(config("other-abc").api_base(), "https://api.veracode.com/");
    }

    #[test]
    fn explicit_base_url_wins_and_gains_a_trailing_slash() {
        let mut cfg = config("vera01-abc");
        cfg.api.base_url = Some("https://api.example.test".to_string());
        assert_eq!(cfg.api_base(), "https://api.example.test/");

        cfg.api.base_url = Some("https://api.example.test/".to_string());
        assert_eq!(cfg.api_base(), "https://api.example.test/");
    }

    #[test]
    fn validation_requires_both_credential_halves() {
        assert!(config("vera01-abc").validate().is_ok());

        let mut cfg = config("vera01-abc");
        cfg.api.key_secret = String::new();
        assert!(cfg.validate().is_err());

        assert!(AppConfig::default().validate().is_err());
    }
}
