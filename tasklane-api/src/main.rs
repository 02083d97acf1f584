//! # Tasklane API Server
//!
//! HTTP server for the Tasklane task manager: per-user task CRUD behind JWT
//! authentication, plus an admin tier for statistics and cross-user
//! management. State lives in memory and is persisted to a JSON snapshot
//! file after every mutation.
//!
//! ## Usage
//!
//! ```bash
//! JWT_SECRET=$(openssl rand -hex 32) ADMIN_ACCOUNTS=admin:changeme cargo run -p tasklane-api
//! ```

use std::sync::Arc;

use anyhow::Context;
use tasklane_api::{
    app::{build_router, AppState},
    config::{Config, LogFormat},
};
use tasklane_shared::{
    auth::admin::AdminDirectory,
    store::{backend::FileBackend, Store},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    init_tracing(config.log_format);

    tracing::info!(
        "Tasklane API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let store = Store::open(Arc::new(FileBackend::new(&config.storage.data_file))).await;

    let admins = AdminDirectory::from_credentials(
        config
            .auth
            .admin_accounts
            .iter()
            .map(|admin| (admin.username.clone(), admin.secret.as_str())),
    )
    .context("Failed to prepare admin accounts")?;
    if admins.is_empty() {
        tracing::warn!("No ADMIN_ACCOUNTS configured; admin endpoints are unreachable");
    } else {
        tracing::info!(admins = admins.len(), "Admin accounts loaded");
    }

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(store, admins, config));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "tasklane_api=debug,tasklane_shared=debug,tower_http=debug".into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
