//! Startup configuration.
//!
//! The vault is configured entirely from the environment and fails fast at
//! boot: a missing or malformed master key is a [`VaultError::Configuration`]
//! before any request is served, never a per-request surprise.

use std::fmt;
use std::path::PathBuf;

use data_encoding::HEXLOWER;
use trousseau_crypto_core::{SecretBytes, SecretCipher, KEY_LEN};
use zeroize::Zeroize;

use crate::db::VaultDb;
use crate::error::VaultError;

/// Environment variable holding the master key as 64 hex characters.
pub const MASTER_KEY_ENV: &str = "TROUSSEAU_MASTER_KEY";

/// Environment variable holding the database path.
pub const DATABASE_ENV: &str = "TROUSSEAU_DATABASE";

/// Database path used when [`DATABASE_ENV`] is unset.
pub const DEFAULT_DATABASE: &str = "trousseau.db";

/// Resolved startup configuration: where the database lives and the master
/// key that seals secret columns.
pub struct VaultConfig {
    /// Path of the `SQLite` database file.
    pub database_path: PathBuf,
    master_key: SecretBytes<KEY_LEN>,
}

impl VaultConfig {
    /// Load configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Configuration`] if [`MASTER_KEY_ENV`] is unset,
    /// not valid hex, or not exactly 32 bytes once decoded.
    pub fn from_env() -> Result<Self, VaultError> {
        let mut hex = std::env::var(MASTER_KEY_ENV).map_err(|_| {
            VaultError::Configuration(format!(
                "{MASTER_KEY_ENV} is not set; generate one with generate_master_key()"
            ))
        })?;
        let key = parse_master_key(&hex);
        hex.zeroize();
        let master_key = key?;

        let database_path = std::env::var(DATABASE_ENV)
            .unwrap_or_else(|_| DEFAULT_DATABASE.to_string())
            .into();

        Ok(Self {
            database_path,
            master_key,
        })
    }

    /// Build a configuration from explicit parts. Intended for tests and
    /// embedders that manage their own key storage.
    #[must_use]
    pub fn from_parts(database_path: impl Into<PathBuf>, master_key: SecretBytes<KEY_LEN>) -> Self {
        Self {
            database_path: database_path.into(),
            master_key,
        }
    }

    /// Open (or create) the configured database.
    ///
    /// # Errors
    ///
    /// Propagates [`VaultError::Database`] / [`VaultError::Migration`] from
    /// [`VaultDb::open`].
    pub fn open_database(&self) -> Result<VaultDb, VaultError> {
        VaultDb::open(&self.database_path)
    }

    /// Consume the configuration, moving the master key into a
    /// [`SecretCipher`].
    #[must_use]
    pub fn into_cipher(self) -> SecretCipher {
        SecretCipher::new(self.master_key)
    }
}

impl fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultConfig")
            .field("database_path", &self.database_path)
            .field("master_key", &"***")
            .finish()
    }
}

/// Decode a 64-hex-character master key.
fn parse_master_key(hex: &str) -> Result<SecretBytes<KEY_LEN>, VaultError> {
    let mut decoded = HEXLOWER
        .decode(hex.trim().to_ascii_lowercase().as_bytes())
        .map_err(|_| {
            VaultError::Configuration(format!("{MASTER_KEY_ENV} is not valid hex"))
        })?;

    if decoded.len() != KEY_LEN {
        let got = decoded.len();
        decoded.zeroize();
        return Err(VaultError::Configuration(format!(
            "{MASTER_KEY_ENV} must decode to {KEY_LEN} bytes, got {got}"
        )));
    }

    let mut arr = [0u8; KEY_LEN];
    arr.copy_from_slice(&decoded);
    decoded.zeroize();
    Ok(SecretBytes::new(arr))
}

/// Mint a fresh random master key and return it hex-encoded, for initial
/// deployment (`export TROUSSEAU_MASTER_KEY=$(...)`).
///
/// # Errors
///
/// Returns [`VaultError::Crypto`] if the CSPRNG fails.
pub fn generate_master_key() -> Result<String, VaultError> {
    let key = SecretBytes::<KEY_LEN>::random()?;
    Ok(HEXLOWER.encode(key.expose()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_master_key_accepts_64_hex_chars() {
        let hex = "ab".repeat(32);
        let key = parse_master_key(&hex).unwrap();
        assert_eq!(key.expose(), &[0xAB; 32]);
    }

    #[test]
    fn parse_master_key_accepts_uppercase_and_whitespace() {
        let hex = format!("  {}\n", "AB".repeat(32));
        let key = parse_master_key(&hex).unwrap();
        assert_eq!(key.expose(), &[0xAB; 32]);
    }

    #[test]
    fn parse_master_key_rejects_short_keys() {
        let err = parse_master_key("abcd").unwrap_err();
        assert!(matches!(err, VaultError::Configuration(_)));
        assert!(err.to_string().contains("32 bytes"));
    }

    #[test]
    fn parse_master_key_rejects_non_hex() {
        let err = parse_master_key(&"zz".repeat(32)).unwrap_err();
        assert!(matches!(err, VaultError::Configuration(_)));
    }

    #[test]
    fn generated_key_parses_back() {
        let hex = generate_master_key().unwrap();
        assert_eq!(hex.len(), 64);
        assert!(parse_master_key(&hex).is_ok());
    }

    #[test]
    fn generated_keys_are_distinct() {
        assert_ne!(generate_master_key().unwrap(), generate_master_key().unwrap());
    }

    #[test]
    fn debug_masks_the_key() {
        let config = VaultConfig::from_parts("vault.db", SecretBytes::new([0x42; KEY_LEN]));
        let debug = format!("{config:?}");
        assert!(debug.contains("***"));
        assert!(!debug.contains("42424242"));
    }

    #[test]
    fn into_cipher_seals_and_opens() {
        let config = VaultConfig::from_parts("vault.db", SecretBytes::new([0x42; KEY_LEN]));
        let cipher = config.into_cipher();
        let sealed = cipher.seal_str("probe", b"aad").unwrap();
        assert_eq!(cipher.open_str(&sealed, b"aad").unwrap(), "probe");
    }
}
