//! `trousseau-crypto-core` — Pure cryptographic and scoring primitives for Trousseau.
//!
//! This crate is the audit target: zero storage, zero network, zero logging.
//! Everything here is deterministic or CSPRNG-driven and safe to review in
//! isolation from the vault's business logic.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod memory;

pub mod cipher;

pub mod password;

pub use cipher::{SecretCipher, KEY_LEN, MIN_SEALED_LEN, NONCE_LEN, TAG_LEN};
pub use error::CryptoError;
pub use memory::{disable_core_dumps, LockedRegion, SecretBuffer, SecretBytes};
pub use password::cache::AnalysisCache;
pub use password::strength::{
    analyze_password, AnalysisDetails, CrackTimeEstimate, ScoreBreakdown, StrengthLevel,
    StrengthReport,
};
pub use password::{
    generate_password, generate_random_password, GeneratedPassword, GeneratorPolicy,
    DEFAULT_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH,
};
