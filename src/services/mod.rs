// All service modules
pub mod compiler_metadata;
pub mod deploy_metadata;

// Re-export for convenience
pub use compiler_metadata::format_compiler_metadata;
pub use deploy_metadata::{fetch_deploy_metadata, DeployMetadataResolver, FetchDeployMetadataOptions};
