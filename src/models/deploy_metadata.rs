use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use super::compiler_metadata::{CompilerMetadata, CompilerType};
use crate::error::ResolveError;

/// Published deployment descriptor. The JSON object is kept verbatim so every
/// field reaches the merged result; artifact locations are read on demand for
/// the requested compiler only.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentDescriptor {
    fields: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompilerArtifact {
    #[serde(default)]
    metadata_uri: Option<String>,
    #[serde(default)]
    bytecode_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactUris {
    pub metadata_uri: String,
    pub bytecode_uri: String,
}

impl DeploymentDescriptor {
    pub fn from_value(value: Value) -> Result<Self, ResolveError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(ResolveError::InvalidDescriptor(
                "expected a JSON object".to_string(),
            )),
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Typed view of the publisher fields. A descriptor that does not match
    /// the expected shape yields the default view.
    pub fn extended(&self) -> ExtendedMetadata {
        ExtendedMetadata::deserialize(Value::Object(self.fields.clone())).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed extended metadata: {}", e);
            ExtendedMetadata::default()
        })
    }

    /// Picks the metadata and bytecode URIs for the requested compiler.
    ///
    /// `zksolc` always reads the first entry of `compilers.zksolc`; a missing,
    /// null or empty list means the contract was never published for that
    /// compiler. `solc` never looks at `compilers`.
    pub fn artifact_uris(&self, compiler_type: CompilerType) -> Result<ArtifactUris, ResolveError> {
        match compiler_type {
            CompilerType::Solc => Ok(ArtifactUris {
                metadata_uri: required(self.string_field("metadataUri"), "metadataUri")?,
                bytecode_uri: required(self.string_field("bytecodeUri"), "bytecodeUri")?,
            }),
            CompilerType::Zksolc => {
                let artifacts = self.zksolc_artifacts()?;
                let artifact = artifacts.first().ok_or(ResolveError::InvalidCompilerType)?;
                Ok(ArtifactUris {
                    metadata_uri: required(
                        artifact.metadata_uri.as_deref(),
                        "compilers.zksolc[0].metadataUri",
                    )?,
                    bytecode_uri: required(
                        artifact.bytecode_uri.as_deref(),
                        "compilers.zksolc[0].bytecodeUri",
                    )?,
                })
            }
        }
    }

    fn string_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    fn zksolc_artifacts(&self) -> Result<Vec<CompilerArtifact>, ResolveError> {
        match self.fields.get("compilers").and_then(|c| c.get("zksolc")) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(entries) => Vec::<CompilerArtifact>::deserialize(entries).map_err(|e| {
                ResolveError::InvalidDescriptor(format!("compilers.zksolc: {}", e))
            }),
        }
    }
}

fn required(value: Option<&str>, field: &str) -> Result<String, ResolveError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ResolveError::InvalidDescriptor(format!("missing {}", field)))
}

// ==================== EXTENDED METADATA ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeployType {
    Standard,
    AutoFactory,
    CustomFactory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouterType {
    None,
    Plugin,
    Dynamic,
    Modular,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefaultExtension {
    pub extension_name: String,
    pub extension_version: String,
    pub publisher_address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefaultModule {
    pub module_name: String,
    pub module_version: String,
    pub publisher_address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryParam {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomFactoryInput {
    pub factory_function: String,
    pub params: Vec<FactoryParam>,
    pub custom_factory_addresses: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModularFactoryInput {
    pub hooks_param_name: String,
}

/// Addresses are keyed by chain id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FactoryDeploymentData {
    pub implementation_addresses: IndexMap<String, String>,
    pub implementation_initializer_function: String,
    pub custom_factory_input: Option<CustomFactoryInput>,
    pub modular_factory_input: Option<ModularFactoryInput>,
    pub factory_addresses: Option<IndexMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworksForDeployment {
    pub all_networks: Option<bool>,
    pub networks_enabled: Option<Vec<u64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConstructorParam {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub default_value: Option<String>,
    pub hidden: Option<bool>,
}

/// Publisher-facing fields commonly found on a descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtendedMetadata {
    pub version: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub audit: Option<String>,
    pub logo: Option<String>,
    pub readme: Option<String>,
    pub changelog: Option<String>,
    pub tags: Option<Vec<String>>,
    pub default_extensions: Option<Vec<DefaultExtension>>,
    pub default_modules: Option<Vec<DefaultModule>>,
    pub deploy_type: Option<DeployType>,
    pub router_type: Option<RouterType>,
    pub is_deployable_via_factory: Option<bool>,
    pub is_deployable_via_proxy: Option<bool>,
    pub factory_deployment_data: Option<FactoryDeploymentData>,
    pub networks_for_deployment: Option<NetworksForDeployment>,
    pub constructor_params: Option<IndexMap<String, ConstructorParam>>,
    pub composite_abi: Option<Vec<Value>>,
}

// ==================== RESULT ====================

// Every key `CompilerMetadata` may serialize.
const NORMALIZED_KEYS: [&str; 7] = [
    "name",
    "abi",
    "metadata",
    "info",
    "licenses",
    "isPartialAbi",
    "zk_version",
];

/// Resolved deployment: descriptor, normalized compiler metadata and bytecode.
///
/// Serializes as one flat object: descriptor fields first, then the
/// normalized fields (which win on key collision), then `bytecode`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployMetadata {
    pub descriptor: DeploymentDescriptor,
    pub compiler: CompilerMetadata,
    pub bytecode: String,
}

impl DeployMetadata {
    pub fn name(&self) -> &str {
        &self.compiler.name
    }

    pub fn bytecode_bytes(&self) -> Result<Vec<u8>, hex::FromHexError> {
        let trimmed = self.bytecode.trim();
        hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed))
    }

    pub fn to_json(&self) -> serde_json::Result<Value> {
        let mut merged = self.descriptor.fields().clone();
        // Absent optional fields still shadow the descriptor's values.
        for key in NORMALIZED_KEYS {
            merged.shift_remove(key);
        }
        if let Value::Object(normalized) = serde_json::to_value(&self.compiler)? {
            merged.extend(normalized);
        }
        merged.insert("bytecode".to_string(), Value::String(self.bytecode.clone()));
        Ok(Value::Object(merged))
    }
}

impl Serialize for DeployMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json()
            .map_err(<S::Error as serde::ser::Error>::custom)?
            .serialize(serializer)
    }
}
