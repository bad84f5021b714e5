use serde_json::Value;
use std::{sync::Arc, time::Duration};

use crate::{
    constants::DEFAULT_METADATA_TIMEOUT_MS,
    error::{FetchError, FetchFailed, ResolveError},
    integrations::storage::{ContentFetcher, FetchOptions},
    models::{CompilerMetadata, CompilerType, DeployMetadata, DeploymentDescriptor},
    services::compiler_metadata::format_compiler_metadata,
};

pub struct FetchDeployMetadataOptions {
    pub uri: String,
    pub fetcher: Arc<dyn ContentFetcher>,
    pub compiler_type: Option<CompilerType>,
}

/// One-shot resolution with the default metadata timeout.
pub async fn fetch_deploy_metadata(
    options: FetchDeployMetadataOptions,
) -> Result<DeployMetadata, FetchFailed> {
    DeployMetadataResolver::new(options.fetcher)
        .resolve(&options.uri, options.compiler_type)
        .await
}

#[derive(Clone)]
pub struct DeployMetadataResolver {
    fetcher: Arc<dyn ContentFetcher>,
    metadata_timeout: Duration,
}

impl DeployMetadataResolver {
    pub fn new(fetcher: Arc<dyn ContentFetcher>) -> Self {
        Self {
            fetcher,
            metadata_timeout: Duration::from_millis(DEFAULT_METADATA_TIMEOUT_MS),
        }
    }

    pub fn with_metadata_timeout(mut self, timeout: Duration) -> Self {
        self.metadata_timeout = timeout;
        self
    }

    pub fn metadata_timeout(&self) -> Duration {
        self.metadata_timeout
    }

    /// Resolves the descriptor at `uri` into merged deploy metadata.
    ///
    /// Bytecode and compiler metadata are fetched concurrently; the first
    /// failure drops the other leg. Only the metadata leg is time-bounded.
    pub async fn resolve(
        &self,
        uri: &str,
        compiler_type: Option<CompilerType>,
    ) -> Result<DeployMetadata, FetchFailed> {
        self.try_resolve(uri, compiler_type.unwrap_or_default())
            .await
            .map_err(|source| {
                tracing::warn!("Deploy metadata resolution for {} failed: {}", uri, source);
                FetchFailed {
                    uri: uri.to_string(),
                    source,
                }
            })
    }

    async fn try_resolve(
        &self,
        uri: &str,
        compiler_type: CompilerType,
    ) -> Result<DeployMetadata, ResolveError> {
        let raw = self
            .fetcher
            .fetch(uri, &FetchOptions::default())
            .await?
            .json_value()?;
        let descriptor = DeploymentDescriptor::from_value(raw)?;
        let uris = descriptor.artifact_uris(compiler_type)?;

        tracing::debug!(
            "Resolving {} ({}): metadata={} bytecode={}",
            uri,
            compiler_type,
            uris.metadata_uri,
            uris.bytecode_uri
        );

        let (bytecode, compiler) = tokio::try_join!(
            self.fetch_bytecode(&uris.bytecode_uri),
            self.fetch_compiler_metadata(&uris.metadata_uri, compiler_type)
        )?;

        Ok(DeployMetadata {
            descriptor,
            compiler,
            bytecode,
        })
    }

    async fn fetch_bytecode(&self, uri: &str) -> Result<String, ResolveError> {
        let response = self.fetcher.fetch(uri, &FetchOptions::default()).await?;
        Ok(response.text()?)
    }

    async fn fetch_compiler_metadata(
        &self,
        uri: &str,
        compiler_type: CompilerType,
    ) -> Result<CompilerMetadata, ResolveError> {
        let options = FetchOptions::with_timeout(self.metadata_timeout);
        let response = tokio::time::timeout(self.metadata_timeout, self.fetcher.fetch(uri, &options))
            .await
            .map_err(|_| FetchError::Timeout {
                uri: uri.to_string(),
                timeout_ms: self.metadata_timeout.as_millis() as u64,
            })??;

        let raw = response.json_value()?;
        if !has_compiler_output(&raw) {
            return Err(ResolveError::MetadataUnresolvable(uri.to_string()));
        }

        Ok(format_compiler_metadata(raw, Some(compiler_type))?)
    }
}

// Either a direct `output` or one wrapped in `source_metadata`.
fn has_compiler_output(raw: &Value) -> bool {
    is_present(raw.get("output")) || is_present(raw.pointer("/source_metadata/output"))
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::storage::FetchResponse;
    use async_trait::async_trait;
    use serde_json::json;
    use std::{collections::HashMap, sync::Mutex};

    enum FakeBody {
        Ready(String),
        Delayed(Duration, String),
        Status(u16),
    }

    #[derive(Default)]
    struct FakeFetcher {
        bodies: HashMap<String, FakeBody>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn with(mut self, uri: &str, body: FakeBody) -> Self {
            self.bodies.insert(uri.to_string(), body);
            self
        }

        fn json(self, uri: &str, value: Value) -> Self {
            self.with(uri, FakeBody::Ready(value.to_string()))
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    #[async_trait]
    impl ContentFetcher for FakeFetcher {
        async fn fetch(&self, uri: &str, _options: &FetchOptions) -> Result<FetchResponse, FetchError> {
            self.calls.lock().expect("calls lock").push(uri.to_string());
            match self.bodies.get(uri) {
                Some(FakeBody::Ready(body)) => Ok(FetchResponse::new(uri, body.clone())),
                Some(FakeBody::Delayed(delay, body)) => {
                    tokio::time::sleep(*delay).await;
                    Ok(FetchResponse::new(uri, body.clone()))
                }
                Some(FakeBody::Status(status)) => Err(FetchError::Status {
                    uri: uri.to_string(),
                    status: *status,
                }),
                None => Err(FetchError::Status {
                    uri: uri.to_string(),
                    status: 404,
                }),
            }
        }
    }

    fn solc_metadata() -> Value {
        json!({
            "settings": { "compilationTarget": { "A.sol": "Foo" } },
            "output": {
                "abi": [],
                "devdoc": { "title": "T" },
                "userdoc": { "notice": "N" }
            },
            "sources": { "A.sol": { "license": "MIT" } }
        })
    }

    fn resolver(fetcher: FakeFetcher) -> (DeployMetadataResolver, Arc<FakeFetcher>) {
        let fetcher = Arc::new(fetcher);
        (DeployMetadataResolver::new(fetcher.clone()), fetcher)
    }

    #[tokio::test]
    async fn resolves_and_merges_solc_deployment() {
        let (resolver, fetcher) = resolver(
            FakeFetcher::default()
                .json("ipfs://descriptor", json!({ "metadataUri": "m1", "bytecodeUri": "b1" }))
                .json("m1", solc_metadata())
                .with("b1", FakeBody::Ready("0xabc".to_string())),
        );

        let result = resolver
            .resolve("ipfs://descriptor", None)
            .await
            .expect("resolve should succeed");
        let value = serde_json::to_value(&result).expect("serialize");

        assert_eq!(value["name"], json!("Foo"));
        assert_eq!(value["abi"], json!([]));
        assert_eq!(value["info"], json!({ "title": "T", "notice": "N" }));
        assert_eq!(value["licenses"], json!(["MIT"]));
        assert_eq!(value["bytecode"], json!("0xabc"));
        assert_eq!(value["metadataUri"], json!("m1"));
        assert_eq!(value["bytecodeUri"], json!("b1"));
        assert_eq!(value["metadata"], solc_metadata());
        assert!(value.get("isPartialAbi").is_none());
        assert!(value.get("zk_version").is_none());
        assert_eq!(fetcher.calls().len(), 3);
    }

    #[tokio::test]
    async fn zksolc_resolves_through_compiler_entry() {
        let (resolver, fetcher) = resolver(
            FakeFetcher::default()
                .json(
                    "ipfs://descriptor",
                    json!({
                        "name": "Foo",
                        "metadataUri": "m1",
                        "bytecodeUri": "b1",
                        "compilers": { "zksolc": [{ "metadataUri": "zk-m1", "bytecodeUri": "zk-b1" }] }
                    }),
                )
                .json(
                    "zk-m1",
                    json!({ "zk_version": "1.5.7", "source_metadata": solc_metadata() }),
                )
                .with("zk-b1", FakeBody::Ready("0x00".to_string())),
        );

        let result = resolver
            .resolve("ipfs://descriptor", Some(CompilerType::Zksolc))
            .await
            .expect("resolve should succeed");

        assert_eq!(result.name(), "Foo");
        assert_eq!(result.bytecode, "0x00");
        assert_eq!(result.compiler.zk_version.as_deref(), Some("1.5.7"));
        assert_eq!(result.compiler.info.title.as_deref(), Some("T"));
        // root document has no `sources`
        assert!(result.compiler.licenses.is_empty());

        let mut calls = fetcher.calls();
        calls.sort();
        assert_eq!(calls, vec!["ipfs://descriptor", "zk-b1", "zk-m1"]);
    }

    #[tokio::test]
    async fn zksolc_without_entries_fails_before_other_fetches() {
        let (resolver, fetcher) = resolver(
            FakeFetcher::default()
                .json(
                    "ipfs://descriptor",
                    json!({ "metadataUri": "m1", "bytecodeUri": "b1", "compilers": { "zksolc": [] } }),
                )
                .json("m1", solc_metadata())
                .with("b1", FakeBody::Ready("0xabc".to_string())),
        );

        let err = resolver
            .resolve("ipfs://descriptor", Some(CompilerType::Zksolc))
            .await
            .expect_err("no zksolc entries");

        assert!(matches!(err.source, ResolveError::InvalidCompilerType));
        assert_eq!(err.uri, "ipfs://descriptor");
        assert_eq!(fetcher.calls(), vec!["ipfs://descriptor".to_string()]);
    }

    #[tokio::test]
    async fn slow_metadata_fails_with_timeout() {
        let (resolver, _) = resolver(
            FakeFetcher::default()
                .json("ipfs://descriptor", json!({ "metadataUri": "m1", "bytecodeUri": "b1" }))
                .with(
                    "m1",
                    FakeBody::Delayed(Duration::from_millis(500), solc_metadata().to_string()),
                )
                .with("b1", FakeBody::Ready("0xabc".to_string())),
        );
        let resolver = resolver.with_metadata_timeout(Duration::from_millis(50));

        let err = resolver
            .resolve("ipfs://descriptor", None)
            .await
            .expect_err("metadata should time out");

        assert!(err.is_timeout());
        assert!(matches!(
            err.source,
            ResolveError::Transport(FetchError::Timeout { ref uri, timeout_ms: 50 }) if uri == "m1"
        ));
    }

    #[tokio::test]
    async fn slow_bytecode_is_not_bounded_by_metadata_timeout() {
        let (resolver, _) = resolver(
            FakeFetcher::default()
                .json("ipfs://descriptor", json!({ "metadataUri": "m1", "bytecodeUri": "b1" }))
                .json("m1", solc_metadata())
                .with(
                    "b1",
                    FakeBody::Delayed(Duration::from_millis(200), "0xabc".to_string()),
                ),
        );
        let resolver = resolver.with_metadata_timeout(Duration::from_millis(50));

        let result = resolver
            .resolve("ipfs://descriptor", None)
            .await
            .expect("bytecode leg has no timeout");
        assert_eq!(result.bytecode, "0xabc");
    }

    #[tokio::test]
    async fn failing_leg_cancels_the_other() {
        let (resolver, _) = resolver(
            FakeFetcher::default()
                .json("ipfs://descriptor", json!({ "metadataUri": "m1", "bytecodeUri": "b1" }))
                .with(
                    "m1",
                    FakeBody::Delayed(Duration::from_secs(30), solc_metadata().to_string()),
                )
                .with("b1", FakeBody::Status(502)),
        );
        let resolver = resolver.with_metadata_timeout(Duration::from_secs(60));

        let err = tokio::time::timeout(
            Duration::from_secs(5),
            resolver.resolve("ipfs://descriptor", None),
        )
        .await
        .expect("resolve should not wait for the slow leg")
        .expect_err("bytecode failed");

        assert!(matches!(
            err.source,
            ResolveError::Transport(FetchError::Status { status: 502, .. })
        ));
    }

    #[tokio::test]
    async fn metadata_without_output_is_unresolvable() {
        let (resolver, _) = resolver(
            FakeFetcher::default()
                .json("ipfs://descriptor", json!({ "metadataUri": "m1", "bytecodeUri": "b1" }))
                .json(
                    "m1",
                    json!({
                        "settings": { "compilationTarget": { "A.sol": "Foo" } },
                        "source_metadata": { "settings": {} }
                    }),
                )
                .with("b1", FakeBody::Ready("0xabc".to_string())),
        );

        let err = resolver
            .resolve("ipfs://descriptor", None)
            .await
            .expect_err("no output");

        assert!(matches!(err.source, ResolveError::MetadataUnresolvable(ref uri) if uri == "m1"));
        assert!(err.source.to_string().contains("m1"));
        assert!(!err.is_timeout());
    }

    #[tokio::test]
    async fn descriptor_fetch_failure_is_wrapped() {
        let (resolver, _) = resolver(FakeFetcher::default());

        let err = fetch_deploy_metadata(FetchDeployMetadataOptions {
            uri: "ipfs://missing".to_string(),
            fetcher: Arc::new(FakeFetcher::default()),
            compiler_type: None,
        })
        .await
        .expect_err("descriptor missing");
        assert!(matches!(
            err.source,
            ResolveError::Transport(FetchError::Status { status: 404, .. })
        ));
        assert_eq!(err.to_string(), "Failed to fetch deploy metadata from ipfs://missing");

        let err = resolver
            .resolve("ipfs://missing", None)
            .await
            .expect_err("descriptor missing");
        assert_eq!(err.cause_chain().len(), 2);
    }

    #[tokio::test]
    async fn invalid_json_descriptor_is_a_transport_error() {
        let (resolver, _) = resolver(
            FakeFetcher::default().with("ipfs://descriptor", FakeBody::Ready("<html>".to_string())),
        );

        let err = resolver
            .resolve("ipfs://descriptor", None)
            .await
            .expect_err("not json");
        assert!(matches!(
            err.source,
            ResolveError::Transport(FetchError::Decode { .. })
        ));
    }

    #[test]
    fn compiler_output_detection_follows_truthiness() {
        assert!(has_compiler_output(&json!({ "output": {} })));
        assert!(has_compiler_output(&json!({ "source_metadata": { "output": { "abi": [] } } })));
        assert!(!has_compiler_output(&json!({ "output": null })));
        assert!(!has_compiler_output(&json!({ "output": "" })));
        assert!(!has_compiler_output(&json!(null)));
        assert!(!has_compiler_output(&json!({ "source_metadata": { "output": false } })));
    }
}
