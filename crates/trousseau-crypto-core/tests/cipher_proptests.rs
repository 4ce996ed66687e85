#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Property-based tests for AES-256-GCM sealing.

use proptest::prelude::*;
use trousseau_crypto_core::{SecretBytes, SecretCipher, KEY_LEN, NONCE_LEN, TAG_LEN};

/// Fixed key for property tests.
const PROP_KEY: [u8; KEY_LEN] = [0xCC; KEY_LEN];

fn prop_cipher() -> SecretCipher {
    SecretCipher::new(SecretBytes::new(PROP_KEY))
}

proptest! {
    /// Seal→open roundtrip always recovers the original plaintext (empty AAD).
    #[test]
    fn seal_open_roundtrip(
        plaintext in proptest::collection::vec(any::<u8>(), 0..4096),
    ) {
        let cipher = prop_cipher();
        let sealed = cipher.seal(&plaintext, &[]).expect("seal should succeed");
        prop_assert_eq!(sealed.len(), plaintext.len() + NONCE_LEN + TAG_LEN);
        let opened = cipher.open(&sealed, &[]).expect("open should succeed");
        prop_assert_eq!(opened.expose(), plaintext.as_slice());
    }

    /// Seal→open roundtrip with arbitrary AAD.
    #[test]
    fn seal_open_roundtrip_with_aad(
        plaintext in proptest::collection::vec(any::<u8>(), 0..2048),
        aad in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        let cipher = prop_cipher();
        let sealed = cipher.seal(&plaintext, &aad).expect("seal should succeed");
        let opened = cipher.open(&sealed, &aad).expect("open should succeed");
        prop_assert_eq!(opened.expose(), plaintext.as_slice());
    }

    /// Flipping any single bit of a sealed blob breaks authentication.
    #[test]
    fn any_bitflip_fails_authentication(
        plaintext in proptest::collection::vec(any::<u8>(), 1..512),
        byte_index in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let cipher = prop_cipher();
        let mut sealed = cipher.seal(&plaintext, b"aad").expect("seal should succeed");
        let index = byte_index.index(sealed.len());
        sealed[index] ^= 1 << bit;
        prop_assert!(cipher.open(&sealed, b"aad").is_err());
    }

    /// A sealed string roundtrips through the UTF-8 convenience methods.
    #[test]
    fn string_roundtrip(text in "\\PC{0,256}") {
        let cipher = prop_cipher();
        let sealed = cipher.seal_str(&text, b"field").expect("seal should succeed");
        let opened = cipher.open_str(&sealed, b"field").expect("open should succeed");
        prop_assert_eq!(opened, text);
    }
}
