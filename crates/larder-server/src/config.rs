//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Filesystem path of the SQLite database.
    /// Env: `DATABASE_PATH`
    /// Default: `./larder.db`
    pub database_path: PathBuf,

    /// Directory where uploaded recipe images are stored.
    /// Env: `MEDIA_ROOT`
    /// Default: `./media`
    pub media_root: PathBuf,

    /// Maximum accepted image upload size in bytes (10 MiB).
    /// Env: `MAX_IMAGE_SIZE`
    pub max_image_size: usize,

    /// Optional superuser provisioned at startup if the email is not yet
    /// registered.
    /// Env: `ADMIN_EMAIL` / `ADMIN_PASSWORD`
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            database_path: PathBuf::from("./larder.db"),
            media_root: PathBuf::from("./media"),
            max_image_size: 10 * 1024 * 1024, // 10 MiB
            admin_email: None,
            admin_password: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(
                    value = %addr,
                    "Invalid HTTP_ADDR, using default"
                );
            }
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("MEDIA_ROOT") {
            config.media_root = PathBuf::from(path);
        }

        if let Ok(val) = std::env::var("MAX_IMAGE_SIZE") {
            if let Ok(n) = val.parse::<usize>() {
                config.max_image_size = n;
            } else {
                tracing::warn!(
                    value = %val,
                    "Invalid MAX_IMAGE_SIZE, using default"
                );
            }
        }

        if let Ok(email) = std::env::var("ADMIN_EMAIL") {
            if !email.is_empty() {
                config.admin_email = Some(email);
            }
        }
        if let Ok(password) = std::env::var("ADMIN_PASSWORD") {
            if !password.is_empty() {
                config.admin_password = Some(password);
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}
