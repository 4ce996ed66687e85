#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Property-based tests for the strength analyzer.

use proptest::prelude::*;
use trousseau_crypto_core::analyze_password;

proptest! {
    /// The final score never leaves 0..=100 and the recommendation cap holds.
    #[test]
    fn report_invariants(password in "\\PC{0,128}") {
        let report = analyze_password(&password);
        prop_assert!(report.score <= 100);
        prop_assert!(report.recommendations.len() <= 5);
        prop_assert_eq!(report.level.is_none(), password.is_empty());
        prop_assert_eq!(report.analysis.length, password.chars().count());
    }

    /// Analysis is a pure function of its input.
    #[test]
    fn analysis_is_deterministic(password in "\\PC{0,64}") {
        let first = analyze_password(&password);
        let second = analyze_password(&password);
        prop_assert_eq!(first.score, second.score);
        prop_assert_eq!(first.level, second.level);
        prop_assert_eq!(first.recommendations, second.recommendations);
        prop_assert_eq!(first.crack_time.combinations, second.crack_time.combinations);
    }

    /// Entropy and uniqueness stay within their mathematical bounds.
    #[test]
    fn metric_bounds(password in "\\PC{1,64}") {
        let report = analyze_password(&password);
        prop_assert!(report.analysis.entropy >= 0.0);
        prop_assert!(report.analysis.uniqueness > 0.0);
        prop_assert!(report.analysis.uniqueness <= 1.0);
        prop_assert!(report.analysis.repeated_chars >= 1);
    }
}
