//! Cryptographic error types for `trousseau-crypto-core`.

use thiserror::Error;

/// Errors produced by cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Symmetric encryption failure (AES-256-GCM) or malformed sealed data.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Authentication tag verification failed — ciphertext tampered, wrong
    /// key, or wrong AAD. Callers treat this as "secret unavailable", not
    /// as a fatal condition.
    #[error("decryption failed: authentication tag mismatch")]
    Decryption,

    /// Invalid key material (wrong length, bad hex, corrupted bytes).
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// Password generation policy rejected (empty charset selection,
    /// length out of range).
    #[error("invalid generator policy: {0}")]
    InvalidPolicy(String),

    /// Secure memory failure (mlock, CSPRNG, rlimit).
    #[error("secure memory error: {0}")]
    SecureMemory(String),
}
