//! Vault error types for `trousseau-vault`.

use thiserror::Error;
use trousseau_crypto_core::CryptoError;

/// Errors produced by vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Cryptographic operation failed (delegated from crypto-core).
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Input rejected before touching storage (bad name, bad range, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// The requester is not allowed to perform this operation on this
    /// resource.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Record not found by id, or a secret that was never set.
    #[error("not found: {0}")]
    NotFound(String),

    /// A grant for this (resource, grantee) pair already exists.
    #[error("already shared: {0}")]
    DuplicateGrant(String),

    /// A resource cannot be shared with its own owner.
    #[error("cannot share a resource with its owner")]
    SelfShareNotAllowed,

    /// Startup configuration is missing or malformed. Fatal at boot, never
    /// produced per-request.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// `SQLite` database error.
    #[error("database error: {0}")]
    Database(String),

    /// Migration error during schema upgrade.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error from the filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for VaultError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}
