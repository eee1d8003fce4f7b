//! docdrop-import - Import Dispatcher service
//!
//! Serves conversation-scoped import sessions over HTTP. Uploaded documents
//! are staged in batches under the root folder (or attached directly), run
//! through the remote automation engine, and the client is pointed at the
//! folder they landed in.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;

use docdrop_common::config::{
    load_toml_config, resolve_config_path, RootFolderInitializer, RootFolderResolver,
};
use docdrop_common::logging::init_logging;
use docdrop_import::backends::{
    ConfigActionRegistry, FsBatchStore, HttpAutomationClient, HttpRepositoryClient,
};
use docdrop_import::{spawn_session_sweeper, AppState, DispatcherConfig, Services};

/// Command-line arguments for docdrop-import
#[derive(Parser, Debug)]
#[command(name = "docdrop-import")]
#[command(about = "Import dispatcher for drag-and-drop document import")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "DOCDROP_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding batches and staging directories
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Address to listen on (overrides `bind_address`)
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Step 1: Configuration, then logging at the configured level
    let config_path = resolve_config_path(args.config.as_deref());
    let config = load_toml_config(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    init_logging(&config.logging).context("Failed to initialize logging")?;

    info!("Starting docdrop-import (Import Dispatcher)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Config: {}", config_path.display());

    // Step 2: Resolve and create the root folder
    let root_folder = RootFolderResolver::new(args.root_folder).resolve(&config);
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    // Step 3: Backends
    let runner = Arc::new(
        HttpAutomationClient::new(&config.automation).context("Failed to create automation client")?,
    );
    let repository = Arc::new(
        HttpRepositoryClient::new(&config.repository).context("Failed to create repository client")?,
    );
    let batch_store = Arc::new(FsBatchStore::new(initializer.batches_dir(), runner.clone()));
    let registry = Arc::new(ConfigActionRegistry::new(config.import_options.clone()));
    info!(
        automation = %config.automation.base_url,
        repository = %config.repository.base_url,
        import_options = registry.len(),
        "Backends initialized"
    );
    if registry.is_empty() {
        tracing::warn!("No import options configured, imports will be refused");
    }

    let services = Services {
        batch_store,
        runner,
        registry,
        repository,
    };
    let dispatcher_config = DispatcherConfig {
        upload_mode: config.upload.default_mode,
        drop_context: config.upload.drop_context.clone(),
        staging_root: initializer.staging_dir(),
    };
    let state = AppState::new(services, dispatcher_config, config.upload.max_upload_bytes);

    // Zero keeps sessions until they are deleted
    if config.upload.session_ttl_secs > 0 {
        spawn_session_sweeper(state.clone(), Duration::from_secs(config.upload.session_ttl_secs));
        info!(ttl_secs = config.upload.session_ttl_secs, "Idle session expiry enabled");
    }

    // Step 4: Serve
    let app = docdrop_import::build_router(state);
    let bind_address = args.bind.unwrap_or(config.bind_address);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
