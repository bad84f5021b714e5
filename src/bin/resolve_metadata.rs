//! Resolves one deploy-metadata URI and prints the merged document as JSON.
//!
//! Usage: `resolve-metadata <uri> [solc|zksolc]`

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use deploy_metadata_service::{config::Config, CompilerType, DeployMetadataResolver, GatewayFetcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deploy_metadata_service=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = std::env::args().skip(1);
    let uri = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: resolve-metadata <uri> [solc|zksolc]"))?;
    let compiler_type = args.next().map(|raw| raw.parse::<CompilerType>()).transpose()?;

    let config = Config::from_env()?;
    config.validate()?;
    let fetcher = GatewayFetcher::from_config(&config)?;

    let resolver =
        DeployMetadataResolver::new(Arc::new(fetcher)).with_metadata_timeout(config.metadata_timeout());

    let metadata = match resolver.resolve(&uri, compiler_type).await {
        Ok(metadata) => metadata,
        Err(err) => {
            for cause in err.cause_chain().iter().skip(1) {
                tracing::error!("caused by: {}", cause);
            }
            return Err(err.into());
        }
    };

    let extended = metadata.descriptor.extended();
    tracing::info!(
        "Resolved {} (version {}, licenses {:?})",
        metadata.name(),
        extended.version.as_deref().unwrap_or("unknown"),
        metadata.compiler.licenses
    );
    match metadata.bytecode_bytes() {
        Ok(bytes) => tracing::info!("Bytecode: {} bytes", bytes.len()),
        Err(e) => tracing::warn!("Bytecode is not valid hex: {}", e),
    }

    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}
