//! # larder-server
//!
//! HTTP front-end for the larder recipe service.
//!
//! This binary provides:
//! - **Account endpoints** (signup, bearer-token issuance, profile)
//! - **Recipe CRUD** with tag/ingredient id filtering
//! - **Tag / ingredient management**, scoped per user
//! - **Image upload** stored on the local filesystem and served under
//!   `/media`
//!
//! All persistence goes through [`larder_store`]; this crate only translates
//! HTTP requests into store calls and store errors into status codes.

mod api;
mod auth;
mod config;
mod error;
mod image_store;

use std::sync::{Arc, Mutex};

use tracing::info;
use tracing_subscriber::EnvFilter;

use larder_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::image_store::ImageStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,larder_server=debug")),
        )
        .init();

    info!("Starting larder server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    // Database (runs migrations on open)
    let db = Database::open_at(&config.database_path)?;

    // Optional superuser provisioning
    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        if db.get_user_by_email(email)?.is_none() {
            let admin = db.create_superuser(email, password)?;
            info!(user = admin.id, "provisioned superuser");
        }
    }

    // Image store (creates the media directory if missing)
    let image_store = Arc::new(
        ImageStore::new(config.media_root.clone(), config.max_image_size).await?,
    );

    let http_addr = config.http_addr;
    let state = AppState {
        db: Arc::new(Mutex::new(db)),
        image_store,
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
