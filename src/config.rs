use serde::Deserialize;
use std::{env, time::Duration};
use url::Url;

use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_IPFS_GATEWAY_URL, DEFAULT_METADATA_TIMEOUT_MS,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Storage
    pub ipfs_gateway_url: String,
    pub storage_client_id: Option<String>,
    pub fetch_connect_timeout_secs: u64,

    // Resolution
    pub metadata_timeout_ms: u64,

    // CORS
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Config {
            host: or_default("HOST", "0.0.0.0"),
            port: or_default("PORT", "3000").parse()?,
            environment: or_default("ENVIRONMENT", "development"),

            ipfs_gateway_url: or_default("IPFS_GATEWAY_URL", DEFAULT_IPFS_GATEWAY_URL),
            storage_client_id: lookup("STORAGE_CLIENT_ID").filter(|v| !v.trim().is_empty()),
            fetch_connect_timeout_secs: or_default(
                "FETCH_CONNECT_TIMEOUT_SECS",
                &DEFAULT_CONNECT_TIMEOUT_SECS.to_string(),
            )
            .parse()?,

            metadata_timeout_ms: or_default(
                "METADATA_TIMEOUT_MS",
                &DEFAULT_METADATA_TIMEOUT_MS.to_string(),
            )
            .parse()?,

            cors_allowed_origins: or_default("CORS_ALLOWED_ORIGINS", "*"),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ipfs_gateway_url.trim().is_empty() {
            anyhow::bail!("IPFS_GATEWAY_URL is empty");
        }
        let gateway = Url::parse(self.ipfs_gateway_url.trim())
            .map_err(|e| anyhow::anyhow!("IPFS_GATEWAY_URL is invalid: {}", e))?;
        if gateway.scheme() != "http" && gateway.scheme() != "https" {
            anyhow::bail!("IPFS_GATEWAY_URL must be an http(s) URL");
        }
        if self.metadata_timeout_ms == 0 {
            anyhow::bail!("METADATA_TIMEOUT_MS must be > 0");
        }

        if self.fetch_connect_timeout_secs == 0 {
            tracing::warn!("FETCH_CONNECT_TIMEOUT_SECS is 0; connections will fail immediately");
        }
        if self.storage_client_id.is_none() && gateway.host_str().is_some_and(|h| h.ends_with("ipfscdn.io")) {
            tracing::warn!("Gateway {} usually requires STORAGE_CLIENT_ID", gateway);
        }
        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; requests may be blocked");
        }

        Ok(())
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.metadata_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_connect_timeout_secs)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).expect("defaults should parse");
        assert_eq!(config.port, 3000);
        assert_eq!(config.ipfs_gateway_url, DEFAULT_IPFS_GATEWAY_URL);
        assert_eq!(config.metadata_timeout(), Duration::from_millis(2000));
        assert_eq!(config.connect_timeout(), Duration::from_secs(4));
        assert!(config.storage_client_id.is_none());
        assert!(!config.is_production());
        config.validate().expect("defaults should validate");
    }

    #[test]
    fn overrides_are_read_from_environment() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("METADATA_TIMEOUT_MS", "500"),
            ("STORAGE_CLIENT_ID", "abc123"),
            ("ENVIRONMENT", "production"),
        ])
        .expect("overrides should parse");
        assert_eq!(config.port, 8080);
        assert_eq!(config.metadata_timeout(), Duration::from_millis(500));
        assert_eq!(config.storage_client_id.as_deref(), Some("abc123"));
        assert!(config.is_production());
    }

    #[test]
    fn blank_client_id_is_ignored() {
        let config = config_from(&[("STORAGE_CLIENT_ID", "  ")]).expect("should parse");
        assert!(config.storage_client_id.is_none());
    }

    #[test]
    fn unparsable_timeout_is_rejected() {
        assert!(config_from(&[("METADATA_TIMEOUT_MS", "soon")]).is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout_and_bad_gateway() {
        let zero = config_from(&[("METADATA_TIMEOUT_MS", "0")]).expect("should parse");
        assert!(zero.validate().is_err());

        let bad_gateway = config_from(&[("IPFS_GATEWAY_URL", "ftp://gateway")]).expect("should parse");
        assert!(bad_gateway.validate().is_err());
    }
}
