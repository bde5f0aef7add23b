use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected exactly one row but found none, or the row belongs
    /// to another user. The two cases are indistinguishable to callers.
    #[error("Record not found")]
    NotFound,

    /// Input failed validation (empty email, short password, blank name).
    #[error("{0}")]
    Validation(String),

    /// Credential or token check failed. Carries no detail about which
    /// check failed.
    #[error("Unable to authenticate with provided credentials")]
    Auth,

    /// Reserved for uniqueness races surfaced to callers; currently unused.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Password hashing backend failure.
    #[error("Password hash error: {0}")]
    PasswordHash(String),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
