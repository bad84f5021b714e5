use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Transport-level failures raised by a content fetcher.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid URI scheme for {0}: expected ipfs:// or http(s)://")]
    UnsupportedScheme(String),

    #[error("Invalid URI {uri}: {message}")]
    InvalidUri { uri: String, message: String },

    #[error("Request to {uri} failed: {message}")]
    Request { uri: String, message: String },

    #[error("Request to {uri} returned status {status}")]
    Status { uri: String, status: u16 },

    #[error("Could not decode response from {uri}: {message}")]
    Decode { uri: String, message: String },

    #[error("Request to {uri} timed out after {timeout_ms}ms")]
    Timeout { uri: String, timeout_ms: u64 },
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Malformed compiler metadata: {0}")]
    Malformed(String),

    #[error("Compiler metadata has an empty compilation target")]
    EmptyCompilationTarget,
}

#[derive(Error, Debug)]
#[error("Unknown compiler type `{0}`: expected solc or zksolc")]
pub struct UnknownCompilerType(pub String);

/// Every way a single resolution step can fail.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Invalid compiler type")]
    InvalidCompilerType,

    #[error("Invalid deployment descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Could not resolve metadata for contract at {0}")]
    MetadataUnresolvable(String),

    #[error(transparent)]
    Transport(#[from] FetchError),

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// The one error callers of deploy-metadata resolution see. The failing step
/// is kept as the source so diagnostics can walk the chain.
#[derive(Error, Debug)]
#[error("Failed to fetch deploy metadata from {uri}")]
pub struct FetchFailed {
    pub uri: String,
    #[source]
    pub source: ResolveError,
}

impl FetchFailed {
    pub fn is_timeout(&self) -> bool {
        matches!(&self.source, ResolveError::Transport(err) if err.is_timeout())
    }

    pub fn cause_chain(&self) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current: Option<&(dyn std::error::Error + 'static)> = Some(self);
        while let Some(err) = current {
            chain.push(err.to_string());
            current = err.source();
        }
        chain
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    DeployMetadata(#[from] FetchFailed),

    #[error(transparent)]
    Format(#[from] FormatError),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, Option<serde_json::Value>) {
        match self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", None),
            AppError::Format(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_COMPILER_METADATA",
                None,
            ),
            AppError::DeployMetadata(err) => (
                StatusCode::BAD_GATEWAY,
                "FETCH_FAILED",
                Some(json!({
                    "uri": err.uri,
                    "timeout": err.is_timeout(),
                    "causes": err.cause_chain(),
                })),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, details) = self.parts();
        if status.is_server_error() {
            tracing::warn!("Request failed: {}", self);
        }

        let body = Json(ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details,
            },
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cause_chain_keeps_original_error() {
        let err = FetchFailed {
            uri: "ipfs://descriptor".to_string(),
            source: ResolveError::Transport(FetchError::Timeout {
                uri: "ipfs://metadata".to_string(),
                timeout_ms: 2000,
            }),
        };

        assert!(err.is_timeout());
        assert_eq!(
            err.cause_chain(),
            vec![
                "Failed to fetch deploy metadata from ipfs://descriptor".to_string(),
                "Request to ipfs://metadata timed out after 2000ms".to_string(),
            ]
        );
    }

    #[test]
    fn non_timeout_transport_errors_are_not_timeouts() {
        let err = FetchFailed {
            uri: "ipfs://descriptor".to_string(),
            source: ResolveError::Transport(FetchError::Status {
                uri: "ipfs://descriptor".to_string(),
                status: 504,
            }),
        };
        assert!(!err.is_timeout());
    }

    #[test]
    fn fetch_failed_maps_to_bad_gateway() {
        let err = AppError::from(FetchFailed {
            uri: "ipfs://descriptor".to_string(),
            source: ResolveError::InvalidCompilerType,
        });
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn format_error_maps_to_unprocessable_entity() {
        let err = AppError::from(FormatError::EmptyCompilationTarget);
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
