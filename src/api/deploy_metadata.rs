use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use super::{parse_compiler_type, AppState};
use crate::{
    error::{AppError, Result},
    models::{ApiResponse, CompilerMetadata, DeployMetadata},
    services::format_compiler_metadata,
};

#[derive(Debug, Deserialize)]
pub struct DeployMetadataQuery {
    pub uri: String,
    pub compiler_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FormatCompilerMetadataRequest {
    pub metadata: Value,
    pub compiler_type: Option<String>,
}

/// GET /api/v1/deploy-metadata
pub async fn get_deploy_metadata(
    State(state): State<AppState>,
    Query(query): Query<DeployMetadataQuery>,
) -> Result<Json<ApiResponse<DeployMetadata>>> {
    let uri = query.uri.trim();
    if uri.is_empty() {
        return Err(AppError::BadRequest("uri is required".to_string()));
    }
    let compiler_type = parse_compiler_type(query.compiler_type.as_deref())?;

    let metadata = state.resolver.resolve(uri, compiler_type).await?;
    tracing::debug!("Resolved {} as contract {}", uri, metadata.name());
    Ok(Json(ApiResponse::success(metadata)))
}

/// POST /api/v1/compiler-metadata/format
pub async fn format_metadata(
    Json(req): Json<FormatCompilerMetadataRequest>,
) -> Result<Json<ApiResponse<CompilerMetadata>>> {
    let compiler_type = parse_compiler_type(req.compiler_type.as_deref())?;
    let formatted = format_compiler_metadata(req.metadata, compiler_type)?;
    Ok(Json(ApiResponse::success(formatted)))
}
