//! Resolution of published contract deploy metadata: fetches a deployment
//! descriptor from IPFS or HTTP, pulls the compiler metadata and bytecode it
//! points at, and normalizes them into one document.

pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod integrations;
pub mod models;
pub mod services;

pub use error::{FetchError, FetchFailed, FormatError, ResolveError};
pub use integrations::storage::{ContentFetcher, FetchOptions, FetchResponse, GatewayFetcher};
pub use models::{CompilerMetadata, CompilerType, DeployMetadata};
pub use services::{
    fetch_deploy_metadata, format_compiler_metadata, DeployMetadataResolver,
    FetchDeployMetadataOptions,
};
