use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::{
    config::Config,
    constants::{CLIENT_ID_HEADER, IPFS_SCHEME_PREFIX},
    error::FetchError,
};

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub timeout: Option<Duration>,
}

impl FetchOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Fully buffered response body.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    uri: String,
    body: Vec<u8>,
}

impl FetchResponse {
    pub fn new(uri: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            uri: uri.into(),
            body: body.into(),
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        serde_json::from_slice(&self.body).map_err(|e| FetchError::Decode {
            uri: self.uri.clone(),
            message: e.to_string(),
        })
    }

    pub fn json_value(&self) -> Result<Value, FetchError> {
        self.json()
    }

    pub fn text(&self) -> Result<String, FetchError> {
        String::from_utf8(self.body.clone()).map_err(|e| FetchError::Decode {
            uri: self.uri.clone(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, uri: &str, options: &FetchOptions) -> Result<FetchResponse, FetchError>;
}

/// Fetches `http(s)://` URIs directly and `ipfs://` URIs through an HTTP gateway.
#[derive(Debug, Clone)]
pub struct GatewayFetcher {
    gateway_url: Url,
    client_id: Option<String>,
    client: Client,
}

impl GatewayFetcher {
    pub fn new(
        gateway_url: &str,
        client_id: Option<String>,
        connect_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let gateway_url = Url::parse(gateway_url.trim())
            .map_err(|e| anyhow::anyhow!("Invalid gateway URL {}: {}", gateway_url, e))?;
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Storage HTTP client init failed: {}", e))?;

        Ok(Self {
            gateway_url,
            client_id: client_id.filter(|id| !id.trim().is_empty()),
            client,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            &config.ipfs_gateway_url,
            config.storage_client_id.clone(),
            config.connect_timeout(),
        )
    }

    /// Maps a content URI onto the URL that is actually requested.
    pub fn resolve_uri(&self, uri: &str) -> Result<Url, FetchError> {
        let trimmed = uri.trim();
        let target = if let Some(rest) = trimmed.strip_prefix(IPFS_SCHEME_PREFIX) {
            let path = rest.trim_start_matches('/');
            let path = path.strip_prefix("ipfs/").unwrap_or(path);
            if path.is_empty() {
                return Err(FetchError::InvalidUri {
                    uri: uri.to_string(),
                    message: "missing content identifier".to_string(),
                });
            }
            format!("{}/{}", self.gateway_url.as_str().trim_end_matches('/'), path)
        } else if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            return Err(FetchError::UnsupportedScheme(uri.to_string()));
        };

        Url::parse(&target).map_err(|e| FetchError::InvalidUri {
            uri: uri.to_string(),
            message: e.to_string(),
        })
    }

    fn transport_error(uri: &str, options: &FetchOptions, err: reqwest::Error) -> FetchError {
        match options.timeout {
            Some(timeout) if err.is_timeout() => FetchError::Timeout {
                uri: uri.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            },
            _ => FetchError::Request {
                uri: uri.to_string(),
                message: err.to_string(),
            },
        }
    }
}

#[async_trait]
impl ContentFetcher for GatewayFetcher {
    async fn fetch(&self, uri: &str, options: &FetchOptions) -> Result<FetchResponse, FetchError> {
        let url = self.resolve_uri(uri)?;
        let via_gateway = uri.trim().starts_with(IPFS_SCHEME_PREFIX);
        tracing::debug!("Fetching {} (resolved to {})", uri, url);

        let mut request = self.client.get(url);
        if via_gateway {
            if let Some(client_id) = self.client_id.as_deref() {
                request = request.header(CLIENT_ID_HEADER, client_id.trim());
            }
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Self::transport_error(uri, options, e))?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                uri: uri.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Self::transport_error(uri, options, e))?;

        Ok(FetchResponse::new(uri, body.to_vec()))
    }
}
