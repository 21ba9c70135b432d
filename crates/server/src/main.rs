use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imagedrop_core::{
    create_permission_gate, load_config, validate_config, CompletionBroadcast, DisplayOrchestrator,
    DownloadService, FileProvider, FileResolver, HttpDownloadService, Permission,
    PermissionStatus, PresentationSurface, SnapshotStore, SqliteSnapshotStore, DENIED_NOTICE,
};
use imagedrop_server::api::create_router;
use imagedrop_server::state::{AppState, SURFACE_KEY};
use imagedrop_server::surface::HttpSurface;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("IMAGEDROP_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Pictures directory: {:?}", config.storage.pictures_dir);
    info!("State path: {:?}", config.storage.state_path);

    // Storage permission gates everything that touches the pictures area
    let gate = create_permission_gate(&config.permission, &config.storage.pictures_dir);
    info!("Using permission gate: {}", gate.method_name());
    let permission = match gate.request(Permission::WriteStorage).await {
        Ok(status) => status,
        Err(e) => PermissionStatus::Denied {
            reason: e.to_string(),
        },
    };
    if let PermissionStatus::Denied { ref reason } = permission {
        warn!("{} ({})", DENIED_NOTICE, reason);
    }

    let completion = CompletionBroadcast::new(config.download.completion_buffer);

    let snapshot_store: Arc<dyn SnapshotStore> = Arc::new(
        SqliteSnapshotStore::new(&config.storage.state_path)
            .context("Failed to create snapshot store")?,
    );
    info!("Snapshot store initialized");

    // Continue numbering after the last persisted ticket
    let first_ticket = match snapshot_store.load(SURFACE_KEY) {
        Ok(Some(snapshot)) => snapshot.ticket.id() + 1,
        Ok(None) => 1,
        Err(e) => {
            warn!("Failed to read display snapshot: {}", e);
            1
        }
    };

    let http_service = Arc::new(
        HttpDownloadService::new(&config.download, &config.storage.pictures_dir, completion.clone())
            .context("Failed to create download service")?
            .with_first_ticket(first_ticket),
    );
    let provider = FileProvider::new(&config.provider.authority)
        .with_root(&config.provider.root_name, http_service.pictures_dir());
    let download_service: Arc<dyn DownloadService> = http_service;
    info!("Using download service: {}", download_service.name());

    let surface = Arc::new(HttpSurface::new());

    let orchestrator = if permission.is_granted() {
        let resolver = FileResolver::new(Arc::clone(&download_service), provider.clone());
        Some(Arc::new(DisplayOrchestrator::new(
            config.orchestrator.clone(),
            Arc::clone(&download_service),
            completion,
            resolver,
            Arc::clone(&surface) as Arc<dyn PresentationSurface>,
        )))
    } else {
        None
    };

    let state = Arc::new(AppState::new(
        config.clone(),
        permission,
        download_service,
        provider,
        surface,
        snapshot_store,
        orchestrator,
    ));

    if state.orchestrator().is_some() {
        // Not yet attached at startup, so this cannot conflict.
        if let Err(e) = state.attach().await {
            warn!("Failed to attach display: {:?}", e);
        }
    }

    // Create router
    let app = create_router(Arc::clone(&state));

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    state.shutdown().await;

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
