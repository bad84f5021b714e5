// src/api/mod.rs
pub mod deploy_metadata;
pub mod health;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::CompilerType;
use crate::services::DeployMetadataResolver;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub resolver: DeployMetadataResolver,
}

/// Reads an optional `compiler_type` parameter; blank means the default dialect.
pub fn parse_compiler_type(raw: Option<&str>) -> Result<Option<CompilerType>> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|e: crate::error::UnknownCompilerType| AppError::BadRequest(e.to_string())),
    }
}
