use serde_json::Value;
use std::collections::HashSet;

use crate::{
    error::FormatError,
    models::{CompilerInfo, CompilerMetadata, CompilerType, RawCompilerOutput},
};

/// Normalizes a raw compiler metadata document.
///
/// For `zksolc` documents the contract description (name, ABI, docs,
/// `isPartialAbi`) comes from the nested `source_metadata`, while `licenses`
/// and `zk_version` are read from the outer document. `metadata` is always the
/// outer document, untouched.
///
/// When several compilation targets are present only the first one (in
/// document order) names the contract.
pub fn format_compiler_metadata(
    raw: Value,
    compiler_type: Option<CompilerType>,
) -> Result<CompilerMetadata, FormatError> {
    let document = RawCompilerOutput::parse(&raw, compiler_type.unwrap_or_default())?;
    let compilation = document.compilation();

    let name = compilation
        .settings
        .compilation_target
        .first()
        .map(|(_, contract)| contract.clone())
        .ok_or(FormatError::EmptyCompilationTarget)?;

    let output = compilation.output.clone().unwrap_or_default();
    let devdoc = output.devdoc.unwrap_or_default();
    let info = CompilerInfo {
        title: devdoc.title,
        author: devdoc.author,
        details: devdoc.detail,
        notice: output.userdoc.and_then(|doc| doc.notice),
    };

    let licenses = collect_licenses(&document);
    let is_partial_abi = compilation.is_partial_abi;
    let zk_version = document.root_zk_version().map(str::to_string);

    Ok(CompilerMetadata {
        name,
        abi: output.abi.unwrap_or_default(),
        metadata: raw,
        info,
        licenses,
        is_partial_abi,
        zk_version,
    })
}

// Unique licenses across the outer document's sources, first-seen order.
fn collect_licenses(document: &RawCompilerOutput) -> Vec<String> {
    let mut seen = HashSet::new();
    document
        .root_sources()
        .into_iter()
        .flat_map(|sources| sources.values())
        .filter_map(|source| source.license.clone())
        .filter(|license| seen.insert(license.clone()))
        .collect()
}
