// src/models/mod.rs
pub mod api;
pub mod compiler_metadata;
pub mod deploy_metadata;

pub use api::ApiResponse;
pub use compiler_metadata::{
    CompilerInfo,
    CompilerMetadata,
    CompilerType,
    RawCompilerOutput,
    SolcMetadata,
    SourceEntry,
    ZksolcMetadata,
};
pub use deploy_metadata::{
    ArtifactUris,
    DeployMetadata,
    DeployType,
    DeploymentDescriptor,
    ExtendedMetadata,
    RouterType,
};
