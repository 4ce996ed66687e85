//! Authenticated encryption for credential secrets.
//!
//! AES-256-GCM via *ring*. Every sealed blob is self-contained:
//!
//! ```text
//! [ nonce (12 bytes) | ciphertext | tag (16 bytes) ]
//! ```
//!
//! A fresh random nonce is drawn per encryption, so re-sealing the same
//! plaintext yields a different blob. The associated data (AAD) binds a blob
//! to its owning record: decrypting with different AAD fails authentication,
//! which stops ciphertexts from being swapped between rows in storage.

use crate::error::CryptoError;
use crate::memory::{SecretBuffer, SecretBytes};
use rand::rngs::OsRng;
use rand::RngCore;
use ring::aead;
use std::fmt;

/// AES-256-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// AES-256-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// Smallest well-formed sealed blob: nonce plus tag around an empty
/// ciphertext.
pub const MIN_SEALED_LEN: usize = NONCE_LEN + TAG_LEN;

// ---------------------------------------------------------------------------
// SecretCipher
// ---------------------------------------------------------------------------

/// AEAD cipher bound to one master key.
///
/// Holding the key inside the cipher keeps key handling in one place and
/// gives key rotation a seam: build a second `SecretCipher` from the new
/// key and re-seal record by record.
pub struct SecretCipher {
    key: SecretBytes<KEY_LEN>,
}

impl SecretCipher {
    /// Build a cipher around an existing master key.
    #[must_use]
    pub const fn new(key: SecretBytes<KEY_LEN>) -> Self {
        Self { key }
    }

    /// Encrypt `plaintext` under this cipher's key, binding it to `aad`.
    ///
    /// Returns the sealed blob in wire format (`nonce || ciphertext || tag`).
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Encryption` if nonce generation or the AEAD
    /// seal operation fails.
    pub fn seal(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng
            .try_fill_bytes(&mut nonce_bytes)
            .map_err(|e| CryptoError::Encryption(format!("nonce generation failed: {e}")))?;

        let unbound = aead::UnboundKey::new(&aead::AES_256_GCM, self.key.expose())
            .map_err(|_| CryptoError::Encryption("invalid AES-256-GCM key".into()))?;
        let sealing_key = aead::LessSafeKey::new(unbound);
        let nonce = aead::Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = plaintext.to_vec();
        let tag = sealing_key
            .seal_in_place_separate_tag(nonce, aead::Aad::from(aad), &mut in_out)
            .map_err(|_| CryptoError::Encryption("AEAD seal failed".into()))?;

        let mut sealed = Vec::with_capacity(
            NONCE_LEN
                .saturating_add(in_out.len())
                .saturating_add(TAG_LEN),
        );
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);
        sealed.extend_from_slice(tag.as_ref());
        Ok(sealed)
    }

    /// Decrypt a sealed blob produced by [`seal`](Self::seal).
    ///
    /// The same `aad` used at seal time must be supplied; any mismatch in
    /// key, AAD, nonce, ciphertext, or tag fails authentication.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Decryption` if the blob is malformed or fails
    /// authentication. The variant carries no detail; callers treat it as
    /// "secret unavailable".
    pub fn open(&self, sealed: &[u8], aad: &[u8]) -> Result<SecretBuffer, CryptoError> {
        if sealed.len() < MIN_SEALED_LEN {
            return Err(CryptoError::Decryption);
        }
        let (nonce_bytes, ct_and_tag) = sealed.split_at(NONCE_LEN);
        let nonce_arr: [u8; NONCE_LEN] =
            nonce_bytes.try_into().map_err(|_| CryptoError::Decryption)?;

        let unbound = aead::UnboundKey::new(&aead::AES_256_GCM, self.key.expose())
            .map_err(|_| CryptoError::Decryption)?;
        let opening_key = aead::LessSafeKey::new(unbound);
        let nonce = aead::Nonce::assume_unique_for_key(nonce_arr);

        let mut buffer = ct_and_tag.to_vec();
        let plaintext = opening_key
            .open_in_place(nonce, aead::Aad::from(aad), &mut buffer)
            .map_err(|_| CryptoError::Decryption)?;

        let result = SecretBuffer::new(plaintext);
        // buffer still holds plaintext bytes followed by the tag
        zeroize::Zeroize::zeroize(&mut buffer);
        result
    }

    /// Encrypt a UTF-8 string. Convenience wrapper over [`seal`](Self::seal)
    /// for password and notes fields, which are text at the API surface.
    ///
    /// # Errors
    ///
    /// Same as [`seal`](Self::seal).
    pub fn seal_str(&self, plaintext: &str, aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.seal(plaintext.as_bytes(), aad)
    }

    /// Decrypt a sealed blob into an owned `String`.
    ///
    /// This is the reveal boundary: the returned `String` is handed to the
    /// caller and is no longer tracked by the secure-memory layer.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Decryption` if authentication fails or the
    /// plaintext is not valid UTF-8.
    pub fn open_str(&self, sealed: &[u8], aad: &[u8]) -> Result<String, CryptoError> {
        let buffer = self.open(sealed, aad)?;
        std::str::from_utf8(buffer.expose())
            .map(str::to_owned)
            .map_err(|_| CryptoError::Decryption)
    }
}

impl fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretCipher(***)")
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> SecretCipher {
        SecretCipher::new(SecretBytes::new([0x42; KEY_LEN]))
    }

    #[test]
    fn seal_open_roundtrip() {
        let cipher = test_cipher();
        let plaintext = b"correct horse battery staple";
        let aad = b"credential:42:password";

        let sealed = cipher.seal(plaintext, aad).unwrap();
        assert_eq!(sealed.len(), plaintext.len() + NONCE_LEN + TAG_LEN);

        let opened = cipher.open(&sealed, aad).unwrap();
        assert_eq!(opened.expose(), plaintext);
    }

    #[test]
    fn seal_open_str_roundtrip() {
        let cipher = test_cipher();
        let sealed = cipher.seal_str("p@ssw0rd·with·unicode", b"aad").unwrap();
        let opened = cipher.open_str(&sealed, b"aad").unwrap();
        assert_eq!(opened, "p@ssw0rd·with·unicode");
    }

    #[test]
    fn nonces_are_unique_per_seal() {
        let cipher = test_cipher();
        let a = cipher.seal(b"same input", b"").unwrap();
        let b = cipher.seal(b"same input", b"").unwrap();
        assert_ne!(a, b);
        assert_ne!(&a[..NONCE_LEN], &b[..NONCE_LEN]);
    }

    #[test]
    fn empty_plaintext_roundtrip() {
        let cipher = test_cipher();
        let sealed = cipher.seal(b"", b"aad").unwrap();
        assert_eq!(sealed.len(), MIN_SEALED_LEN);
        let opened = cipher.open(&sealed, b"aad").unwrap();
        assert!(opened.is_empty());
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let cipher = test_cipher();
        let mut sealed = cipher.seal(b"secret", b"aad").unwrap();
        sealed[NONCE_LEN] ^= 0x01;
        assert!(matches!(
            cipher.open(&sealed, b"aad"),
            Err(CryptoError::Decryption)
        ));
    }

    #[test]
    fn tampered_tag_fails() {
        let cipher = test_cipher();
        let mut sealed = cipher.seal(b"secret", b"aad").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x80;
        assert!(matches!(
            cipher.open(&sealed, b"aad"),
            Err(CryptoError::Decryption)
        ));
    }

    #[test]
    fn wrong_aad_fails() {
        let cipher = test_cipher();
        let sealed = cipher.seal(b"secret", b"credential:1:password").unwrap();
        assert!(matches!(
            cipher.open(&sealed, b"credential:2:password"),
            Err(CryptoError::Decryption)
        ));
    }

    #[test]
    fn wrong_key_fails() {
        let cipher_a = test_cipher();
        let cipher_b = SecretCipher::new(SecretBytes::new([0x43; KEY_LEN]));
        let sealed = cipher_a.seal(b"secret", b"aad").unwrap();
        assert!(matches!(
            cipher_b.open(&sealed, b"aad"),
            Err(CryptoError::Decryption)
        ));
    }

    #[test]
    fn truncated_blob_fails() {
        let cipher = test_cipher();
        let sealed = cipher.seal(b"secret", b"aad").unwrap();
        assert!(matches!(
            cipher.open(&sealed[..MIN_SEALED_LEN - 1], b"aad"),
            Err(CryptoError::Decryption)
        ));
        assert!(matches!(cipher.open(b"", b"aad"), Err(CryptoError::Decryption)));
    }

    #[test]
    fn non_utf8_plaintext_fails_open_str() {
        let cipher = test_cipher();
        let sealed = cipher.seal(&[0xFF, 0xFE, 0x00, 0x80], b"aad").unwrap();
        assert!(matches!(
            cipher.open_str(&sealed, b"aad"),
            Err(CryptoError::Decryption)
        ));
    }

    #[test]
    fn debug_is_masked() {
        let cipher = test_cipher();
        assert_eq!(format!("{cipher:?}"), "SecretCipher(***)");
    }
}
