use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};

use crate::error::{FormatError, UnknownCompilerType};

/// Compiler toolchain that produced a metadata document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerType {
    #[default]
    Solc,
    Zksolc,
}

impl CompilerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompilerType::Solc => "solc",
            CompilerType::Zksolc => "zksolc",
        }
    }
}

impl fmt::Display for CompilerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompilerType {
    type Err = UnknownCompilerType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "solc" => Ok(CompilerType::Solc),
            "zksolc" => Ok(CompilerType::Zksolc),
            other => Err(UnknownCompilerType(other.to_string())),
        }
    }
}

// ==================== RAW DOCUMENTS ====================

/// Solidity metadata as emitted by `solc` (also the nested part of a `zksolc` document).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolcMetadata {
    pub settings: CompilationSettings,
    #[serde(default)]
    pub output: Option<CompilationOutput>,
    #[serde(default)]
    pub sources: Option<IndexMap<String, SourceEntry>>,
    #[serde(default)]
    pub is_partial_abi: Option<bool>,
    #[serde(default, rename = "zk_version")]
    pub zk_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilationSettings {
    /// Source path -> contract name, in document order.
    #[serde(default)]
    pub compilation_target: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompilationOutput {
    #[serde(default)]
    pub abi: Option<Vec<Value>>,
    #[serde(default)]
    pub devdoc: Option<DevDoc>,
    #[serde(default)]
    pub userdoc: Option<UserDoc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DevDoc {
    pub title: Option<String>,
    pub author: Option<String>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserDoc {
    pub notice: Option<String>,
}

/// One `sources` entry: either inline `content` or a list of `urls`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceEntry {
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub urls: Option<Vec<String>>,
}

/// `zksolc` output wraps the solc metadata under `source_metadata`.
#[derive(Debug, Clone, Deserialize)]
pub struct ZksolcMetadata {
    pub source_metadata: SolcMetadata,
    #[serde(default)]
    pub sources: Option<IndexMap<String, SourceEntry>>,
    #[serde(default)]
    pub zk_version: Option<String>,
}

#[derive(Debug, Clone)]
pub enum RawCompilerOutput {
    Solc(SolcMetadata),
    Zksolc(ZksolcMetadata),
}

impl RawCompilerOutput {
    pub fn parse(raw: &Value, compiler_type: CompilerType) -> Result<Self, FormatError> {
        let parsed = match compiler_type {
            CompilerType::Solc => SolcMetadata::deserialize(raw).map(RawCompilerOutput::Solc),
            CompilerType::Zksolc => ZksolcMetadata::deserialize(raw).map(RawCompilerOutput::Zksolc),
        };
        parsed.map_err(|e| FormatError::Malformed(format!("{} document: {}", compiler_type, e)))
    }

    /// The document the compiler actually describes the contract in.
    pub fn compilation(&self) -> &SolcMetadata {
        match self {
            RawCompilerOutput::Solc(meta) => meta,
            RawCompilerOutput::Zksolc(meta) => &meta.source_metadata,
        }
    }

    /// `sources` of the outer document, never the unwrapped one.
    pub fn root_sources(&self) -> Option<&IndexMap<String, SourceEntry>> {
        match self {
            RawCompilerOutput::Solc(meta) => meta.sources.as_ref(),
            RawCompilerOutput::Zksolc(meta) => meta.sources.as_ref(),
        }
    }

    pub fn root_zk_version(&self) -> Option<&str> {
        match self {
            RawCompilerOutput::Solc(meta) => meta.zk_version.as_deref(),
            RawCompilerOutput::Zksolc(meta) => meta.zk_version.as_deref(),
        }
    }
}

// ==================== NORMALIZED ====================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompilerInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerMetadata {
    pub name: String,
    pub abi: Vec<Value>,
    pub metadata: Value,
    pub info: CompilerInfo,
    pub licenses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_partial_abi: Option<bool>,
    #[serde(rename = "zk_version", skip_serializing_if = "Option::is_none")]
    pub zk_version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compiler_type_parses_case_insensitively() {
        assert_eq!("ZKSOLC".parse::<CompilerType>().ok(), Some(CompilerType::Zksolc));
        assert_eq!(" solc ".parse::<CompilerType>().ok(), Some(CompilerType::Solc));
        assert!("vyper".parse::<CompilerType>().is_err());
    }

    #[test]
    fn zksolc_document_keeps_root_and_nested_parts_apart() {
        let raw = json!({
            "zk_version": "1.5.0",
            "sources": { "Root.sol": { "license": "MIT" } },
            "source_metadata": {
                "settings": { "compilationTarget": { "A.sol": "A" } },
                "sources": { "A.sol": { "license": "GPL-3.0" } }
            }
        });
        let parsed = RawCompilerOutput::parse(&raw, CompilerType::Zksolc).expect("should parse");

        assert_eq!(parsed.root_zk_version(), Some("1.5.0"));
        let root_sources = parsed.root_sources().expect("root sources");
        assert!(root_sources.contains_key("Root.sol"));
        assert_eq!(
            parsed.compilation().settings.compilation_target.get("A.sol").map(String::as_str),
            Some("A")
        );
    }

    #[test]
    fn solc_document_without_settings_is_malformed() {
        let err = RawCompilerOutput::parse(&json!({ "output": {} }), CompilerType::Solc)
            .expect_err("settings are required");
        assert!(matches!(err, FormatError::Malformed(_)));
    }
}
