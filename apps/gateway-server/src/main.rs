mod config;
mod format;
mod handlers;
mod logging;
mod router;
mod security;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cursor_codec::{KmsClient, LocalAesKms, NullKms};
use gateway_core::{GenericHandler, HeaderIdentityProvider};
use spec_model::SpecDocument;
use storage_collectionstore::CollectionStoreAdapter;
use storage_core::StorageAdapter;
use storage_keystore::KeyStoreAdapter;

use config::{AppConfig, CliOverrides, StorageBackend};
use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "gateway-server", about = "Schema-driven generic data API gateway")]
struct Cli {
    /// Path to a YAML configuration file layered over the built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides `server.port`.
    #[arg(long)]
    port: Option<u16>,

    /// Overrides `spec.path`.
    #[arg(long)]
    spec: Option<String>,

    /// Raise the logging verbosity; repeat for more (`-v`, `-vv`).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut app_config = AppConfig::load(cli.config.as_deref())?;
    app_config.apply_cli_overrides(&CliOverrides {
        port: cli.port,
        spec_path: cli.spec.clone(),
        verbose: cli.verbose,
    });

    logging::init(&app_config.logging);

    let spec = Arc::new(SpecDocument::from_file(app_config.spec_path())?);

    let kms: Arc<dyn KmsClient> = if let Some(key_info) = &app_config.cursor.kms {
        tracing::info!(
            keyring = %key_info.keyring,
            key = %key_info.key,
            location = %key_info.location,
            project = %key_info.project,
            "cursor encryption enabled"
        );
        let (kms, _key) = LocalAesKms::generate();
        Arc::new(kms)
    } else {
        Arc::new(NullKms)
    };

    let audit_enabled = app_config.audit.is_enabled();
    let adapter: Arc<dyn StorageAdapter> = match app_config.storage.backend {
        StorageBackend::KeyStore => Arc::new(KeyStoreAdapter::with_audit(kms, audit_enabled)),
        StorageBackend::CollectionStore => Arc::new(CollectionStoreAdapter::with_audit(kms, audit_enabled)),
    };

    let state = AppState {
        spec,
        handler: Arc::new(GenericHandler::new(adapter)),
        identity: Arc::new(HeaderIdentityProvider),
        cors_origins: app_config.server.origins.clone(),
        base_url: app_config.server.base_url.clone(),
    };

    let router = router::build(state);

    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    tracing::info!(%addr, "gateway-server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
