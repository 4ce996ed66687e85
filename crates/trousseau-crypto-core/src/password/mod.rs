//! Password generation and strength analysis.
//!
//! - [`generate_random_password`] — character-based generation driven by a
//!   [`GeneratorPolicy`]
//! - [`generate_password`] — generation plus an immediate strength report,
//!   so callers can show the score of what they just received
//! - [`strength`] — the scoring engine itself
//! - [`cache`] — memoization for repeated strength analyses
//!
//! All randomness comes from `OsRng` (OS-level CSPRNG).

pub mod cache;
pub mod strength;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::CryptoError;
use strength::StrengthReport;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Minimum allowed password length.
///
/// Low enough to allow one character from each of the four classes.
pub const MIN_PASSWORD_LENGTH: usize = 4;

/// Maximum allowed password length.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Default password length.
pub const DEFAULT_PASSWORD_LENGTH: usize = 16;

// Character sets
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*()_+-=[]{}|;:,.<>?";

// Characters dropped under `exclude_ambiguous`. Symbols have no
// look-alikes, so only letters and digits are filtered.
const AMBIGUOUS_LOWERCASE: &[u8] = b"lo";
const AMBIGUOUS_UPPERCASE: &[u8] = b"IO";
const AMBIGUOUS_DIGITS: &[u8] = b"01";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Rules for generating a random password.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorPolicy {
    /// Password length in characters.
    pub length: usize,
    /// Include lowercase letters (a-z).
    pub lowercase: bool,
    /// Include uppercase letters (A-Z).
    pub uppercase: bool,
    /// Include digits (0-9).
    pub digits: bool,
    /// Include symbols (!@#$%^&*...).
    pub symbols: bool,
    /// Drop characters that are easy to confuse when read aloud or
    /// transcribed: `l`, `o`, `I`, `O`, `0`, `1`.
    pub exclude_ambiguous: bool,
}

impl Default for GeneratorPolicy {
    fn default() -> Self {
        Self {
            length: DEFAULT_PASSWORD_LENGTH,
            lowercase: true,
            uppercase: true,
            digits: true,
            symbols: true,
            exclude_ambiguous: false,
        }
    }
}

/// A freshly generated password together with its strength report.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GeneratedPassword {
    /// The generated password.
    pub password: String,
    /// Strength analysis of the generated password.
    pub strength: StrengthReport,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Generate a random password according to `policy`.
///
/// At least one character from each enabled class is guaranteed. The
/// remaining positions are filled from the union of enabled classes, then
/// the whole password is Fisher-Yates shuffled to avoid positional bias.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidPolicy`] if:
/// - `policy.length` is outside [`MIN_PASSWORD_LENGTH`]..=[`MAX_PASSWORD_LENGTH`]
/// - No character class is enabled
///
/// # Panics
///
/// Panics if the generated password bytes are not valid UTF-8 (should never
/// happen since all character sets are ASCII).
pub fn generate_random_password(policy: &GeneratorPolicy) -> Result<String, CryptoError> {
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&policy.length) {
        return Err(CryptoError::InvalidPolicy(format!(
            "length must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH}, got {}",
            policy.length
        )));
    }

    // Build the character pool and collect mandatory characters.
    let mut pool: Vec<u8> = Vec::new();
    let mut mandatory: Vec<u8> = Vec::new();
    let mut rng = rand::rngs::OsRng;

    let enabled: [(bool, &[u8], &[u8]); 4] = [
        (policy.lowercase, LOWERCASE, AMBIGUOUS_LOWERCASE),
        (policy.uppercase, UPPERCASE, AMBIGUOUS_UPPERCASE),
        (policy.digits, DIGITS, AMBIGUOUS_DIGITS),
        (policy.symbols, SYMBOLS, &[]),
    ];
    for (on, charset, ambiguous) in enabled {
        if !on {
            continue;
        }
        let chars: Vec<u8> = if policy.exclude_ambiguous {
            charset
                .iter()
                .copied()
                .filter(|c| !ambiguous.contains(c))
                .collect()
        } else {
            charset.to_vec()
        };
        mandatory.push(chars[rng.gen_range(0..chars.len())]);
        pool.extend_from_slice(&chars);
    }

    if pool.is_empty() {
        return Err(CryptoError::InvalidPolicy(
            "at least one character class must be enabled".to_string(),
        ));
    }

    // MIN_PASSWORD_LENGTH covers one mandatory character per class, so no
    // extra length-vs-classes check is needed.
    let mut chars: Vec<u8> = mandatory;
    for _ in chars.len()..policy.length {
        chars.push(pool[rng.gen_range(0..pool.len())]);
    }

    // Fisher-Yates shuffle to eliminate positional bias.
    chars.shuffle(&mut rng);

    // Safety: all chars are ASCII.
    Ok(String::from_utf8(chars).expect("password chars are ASCII"))
}

/// Generate a password and analyze it in one call.
///
/// # Errors
///
/// Same as [`generate_random_password`].
pub fn generate_password(policy: &GeneratorPolicy) -> Result<GeneratedPassword, CryptoError> {
    let password = generate_random_password(policy)?;
    let strength = strength::analyze_password(&password);
    Ok(GeneratedPassword { password, strength })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn policy_with(
        lowercase: bool,
        uppercase: bool,
        digits: bool,
        symbols: bool,
    ) -> GeneratorPolicy {
        GeneratorPolicy {
            length: 20,
            lowercase,
            uppercase,
            digits,
            symbols,
            exclude_ambiguous: false,
        }
    }

    #[test]
    fn default_policy_password() {
        let pw = generate_random_password(&GeneratorPolicy::default()).unwrap();
        assert_eq!(pw.len(), DEFAULT_PASSWORD_LENGTH);
    }

    #[test]
    fn min_length_password() {
        let policy = GeneratorPolicy {
            length: MIN_PASSWORD_LENGTH,
            ..GeneratorPolicy::default()
        };
        let pw = generate_random_password(&policy).unwrap();
        assert_eq!(pw.len(), MIN_PASSWORD_LENGTH);
    }

    #[test]
    fn max_length_password() {
        let policy = GeneratorPolicy {
            length: MAX_PASSWORD_LENGTH,
            ..GeneratorPolicy::default()
        };
        let pw = generate_random_password(&policy).unwrap();
        assert_eq!(pw.len(), MAX_PASSWORD_LENGTH);
    }

    #[test]
    fn below_min_rejected() {
        let policy = GeneratorPolicy {
            length: MIN_PASSWORD_LENGTH - 1,
            ..GeneratorPolicy::default()
        };
        let result = generate_random_password(&policy);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("length must be between"));
    }

    #[test]
    fn above_max_rejected() {
        let policy = GeneratorPolicy {
            length: MAX_PASSWORD_LENGTH + 1,
            ..GeneratorPolicy::default()
        };
        assert!(generate_random_password(&policy).is_err());
    }

    #[test]
    fn no_class_error() {
        let policy = policy_with(false, false, false, false);
        let result = generate_random_password(&policy);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("at least one character class"));
    }

    #[test]
    fn contains_all_enabled_classes() {
        // Generate 50 passwords and verify each contains at least one from each class.
        for _ in 0..50 {
            let pw = generate_random_password(&policy_with(true, true, true, true)).unwrap();
            assert!(
                pw.chars().any(|c| c.is_ascii_lowercase()),
                "missing lowercase in: {pw}"
            );
            assert!(
                pw.chars().any(|c| c.is_ascii_uppercase()),
                "missing uppercase in: {pw}"
            );
            assert!(
                pw.chars().any(|c| c.is_ascii_digit()),
                "missing digit in: {pw}"
            );
            assert!(
                pw.chars().any(|c| !c.is_ascii_alphanumeric()),
                "missing symbol in: {pw}"
            );
        }
    }

    #[test]
    fn min_length_still_covers_all_classes() {
        let policy = GeneratorPolicy {
            length: MIN_PASSWORD_LENGTH,
            ..GeneratorPolicy::default()
        };
        for _ in 0..50 {
            let pw = generate_random_password(&policy).unwrap();
            assert!(pw.chars().any(|c| c.is_ascii_lowercase()));
            assert!(pw.chars().any(|c| c.is_ascii_uppercase()));
            assert!(pw.chars().any(|c| c.is_ascii_digit()));
            assert!(pw.chars().any(|c| !c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn lowercase_only() {
        let pw = generate_random_password(&policy_with(true, false, false, false)).unwrap();
        assert!(
            pw.chars().all(|c| c.is_ascii_lowercase()),
            "not all lowercase: {pw}"
        );
    }

    #[test]
    fn uppercase_only() {
        let pw = generate_random_password(&policy_with(false, true, false, false)).unwrap();
        assert!(
            pw.chars().all(|c| c.is_ascii_uppercase()),
            "not all uppercase: {pw}"
        );
    }

    #[test]
    fn digits_only() {
        let pw = generate_random_password(&policy_with(false, false, true, false)).unwrap();
        assert!(
            pw.chars().all(|c| c.is_ascii_digit()),
            "not all digits: {pw}"
        );
    }

    #[test]
    fn symbols_only() {
        let pw = generate_random_password(&policy_with(false, false, false, true)).unwrap();
        let symbol_set: HashSet<u8> = SYMBOLS.iter().copied().collect();
        assert!(
            pw.bytes().all(|b| symbol_set.contains(&b)),
            "not all symbols: {pw}"
        );
    }

    #[test]
    fn exclude_ambiguous_filters_lookalikes() {
        let policy = GeneratorPolicy {
            length: 64,
            exclude_ambiguous: true,
            ..GeneratorPolicy::default()
        };
        for _ in 0..50 {
            let pw = generate_random_password(&policy).unwrap();
            for forbidden in ['l', 'o', 'I', 'O', '0', '1'] {
                assert!(
                    !pw.contains(forbidden),
                    "ambiguous char '{forbidden}' in: {pw}"
                );
            }
        }
    }

    #[test]
    fn exclude_ambiguous_keeps_symbols_intact() {
        let policy = GeneratorPolicy {
            length: 64,
            lowercase: false,
            uppercase: false,
            digits: false,
            symbols: true,
            exclude_ambiguous: true,
        };
        let pw = generate_random_password(&policy).unwrap();
        let symbol_set: HashSet<u8> = SYMBOLS.iter().copied().collect();
        assert!(pw.bytes().all(|b| symbol_set.contains(&b)));
    }

    #[test]
    fn uniqueness_random() {
        let passwords: HashSet<String> = (0..100)
            .map(|_| generate_random_password(&GeneratorPolicy::default()).unwrap())
            .collect();
        assert_eq!(passwords.len(), 100, "generated duplicate passwords");
    }

    #[test]
    fn generate_password_attaches_strength() {
        let generated = generate_password(&GeneratorPolicy::default()).unwrap();
        assert_eq!(generated.password.len(), DEFAULT_PASSWORD_LENGTH);
        // 16 random chars across four classes always score well above zero.
        assert!(generated.strength.score > 0);
        assert!(generated.strength.level.is_some());
    }

    #[test]
    fn generate_password_propagates_policy_errors() {
        let policy = GeneratorPolicy {
            length: 2,
            ..GeneratorPolicy::default()
        };
        assert!(generate_password(&policy).is_err());
    }
}
