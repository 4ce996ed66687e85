//! Password strength analysis.
//!
//! [`analyze_password`] produces a deterministic [`StrengthReport`]: an
//! additive base score (length, character classes, Shannon entropy,
//! character uniqueness) minus penalties for recognizable structure (common
//! patterns, dictionary words, repeated runs, ordinal sequences, keyboard
//! walks), clamped to 0–100, plus ordered improvement recommendations and
//! humanized crack-time estimates.
//!
//! The submitted password is read, scored, and dropped. Nothing in this
//! module logs or stores it.

use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Symbols recognized when classifying characters for scoring.
///
/// Deliberately broader than the generation set so pasted passwords with
/// unusual punctuation still receive symbol credit.
const ANALYSIS_SYMBOLS: &str = "!@#$%^&*(),.?\":{}|<>[]\\/_+=~`-;'§";

/// Charset-size contribution of the symbol class in crack-time estimates.
const SYMBOL_CHARSET_SIZE: u32 = 32;

/// Substrings that mark a password as following a well-known pattern.
/// Matched case-insensitively.
const COMMON_PATTERNS: &[&str] = &[
    // numeric runs
    "123", "234", "345", "456", "567", "678", "789", "987", "876", "765", "654", "543", "432",
    "321",
    // alphabetic runs
    "abc", "bcd", "cde", "def", "efg", "fgh", "zyx", "yxw", "xwv", "wvu", "vut", "uts",
    // keyboard fragments
    "qwer", "asdf", "zxcv", "qwerty", "azerty", "uiop", "hjkl", "nm,", "./;",
    // common words
    "password", "motdepasse", "admin", "user", "login", "welcome", "bonjour", "salut", "test",
    "demo",
];

/// Year prefixes flagged as date patterns when followed by a digit.
const DATE_PREFIXES: &[&str] = &["202", "199", "198"];

/// French and English words checked as case-insensitive substrings.
/// Only words of 4+ characters count as matches.
const DICTIONARY_WORDS: &[&str] = &[
    "password",
    "motdepasse",
    "admin",
    "user",
    "login",
    "welcome",
    "bonjour",
    "salut",
    "hello",
    "world",
    "test",
    "demo",
    "azerty",
    "qwerty",
    "secret",
    "passe",
    "code",
    "clef",
    "key",
    "open",
    "ouvrir",
    "fermer",
    "close",
    "start",
    "stop",
    "begin",
    "end",
    "premier",
    "dernier",
    "first",
    "last",
    "nouveau",
    "new",
    "old",
    "ancien",
    "facile",
    "easy",
    "simple",
    "basic",
    "master",
    "maitre",
];

/// Physical keyboard rows scanned for 3-character walks (QWERTY and AZERTY).
const KEYBOARD_ROWS: &[&str] = &[
    "qwertyuiop",
    "asdfghjkl",
    "zxcvbnm",
    "azertyuiop",
    "qsdfghjklm",
    "wxcvbn",
];

/// Recommendations are capped at this many entries, most impactful first.
const MAX_RECOMMENDATIONS: usize = 5;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Strength classification derived from the final score.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StrengthLevel {
    /// Score below 20.
    Critical,
    /// Score 20–39.
    VeryWeak,
    /// Score 40–59.
    Weak,
    /// Score 60–69.
    Medium,
    /// Score 70–79.
    Strong,
    /// Score 80–89.
    VeryStrong,
    /// Score 90 and above.
    Excellent,
}

impl StrengthLevel {
    /// Map a 0–100 score to its level.
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        match score {
            90.. => Self::Excellent,
            80..=89 => Self::VeryStrong,
            70..=79 => Self::Strong,
            60..=69 => Self::Medium,
            40..=59 => Self::Weak,
            20..=39 => Self::VeryWeak,
            0..=19 => Self::Critical,
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::VeryStrong => "Very strong",
            Self::Strong => "Strong",
            Self::Medium => "Medium",
            Self::Weak => "Weak",
            Self::VeryWeak => "Very weak",
            Self::Critical => "Critical",
        }
    }

    /// Display color as a hex code, for strength meters.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Excellent => "#22c55e",  // green-500
            Self::VeryStrong => "#16a34a", // green-600
            Self::Strong => "#65a30d",     // lime-600
            Self::Medium => "#eab308",     // yellow-500
            Self::Weak => "#f97316",       // orange-500
            Self::VeryWeak => "#ef4444",   // red-500
            Self::Critical => "#dc2626",   // red-600
        }
    }
}

/// Raw characteristics observed in the password.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct AnalysisDetails {
    /// Length in characters (not bytes).
    pub length: usize,
    /// Contains `a-z`.
    pub has_lowercase: bool,
    /// Contains `A-Z`.
    pub has_uppercase: bool,
    /// Contains `0-9`.
    pub has_digits: bool,
    /// Contains a character from the analysis symbol set.
    pub has_symbols: bool,
    /// Matches a well-known pattern (runs, keyboard fragments, dates, ...).
    pub has_common_patterns: bool,
    /// Shannon entropy in bits per character.
    pub entropy: f64,
    /// Distinct characters divided by length.
    pub uniqueness: f64,
    /// Dictionary words found as substrings, in list order.
    pub dictionary_words: Vec<String>,
    /// Longest run of one repeated character.
    pub repeated_chars: usize,
    /// Contains a 3-character ascending or descending ordinal sequence.
    pub sequential_chars: bool,
    /// Contains a 3-character keyboard-row walk (either direction).
    pub keyboard_patterns: bool,
}

/// How the final score was assembled.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct ScoreBreakdown {
    /// Number of character classes present (0–4).
    pub character_types: u8,
    /// Additive score before penalties.
    pub base_score: i32,
    /// Total penalty deducted.
    pub penalties: i32,
    /// `entropy × length`, rounded to one decimal.
    pub entropy_bits: f64,
}

/// Humanized brute-force estimates.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrackTimeEstimate {
    /// Rate-limited online attack at 10³ guesses/second.
    pub online: String,
    /// Offline GPU attack at 10⁹ guesses/second.
    pub offline: String,
    /// Size of the search space: exact integer below 10¹⁵, scientific
    /// notation above.
    pub combinations: String,
}

impl CrackTimeEstimate {
    fn instant() -> Self {
        Self {
            online: "instant".to_string(),
            offline: "instant".to_string(),
            combinations: "0".to_string(),
        }
    }
}

/// Complete result of a strength analysis.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StrengthReport {
    /// Final score, 0–100.
    pub score: u8,
    /// Level derived from the score; `None` only for an empty password.
    pub level: Option<StrengthLevel>,
    /// Observed characteristics.
    pub analysis: AnalysisDetails,
    /// Up to five improvement suggestions, most impactful first.
    pub recommendations: Vec<String>,
    /// Brute-force estimates.
    pub crack_time: CrackTimeEstimate,
    /// Score assembly breakdown.
    pub details: ScoreBreakdown,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Analyze a password and produce its full [`StrengthReport`].
///
/// Deterministic: the same input always yields the same report. An empty
/// password is a valid input and reports score 0 with no level.
#[must_use]
#[allow(
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn analyze_password(password: &str) -> StrengthReport {
    if password.is_empty() {
        return StrengthReport {
            score: 0,
            level: None,
            analysis: AnalysisDetails::default(),
            recommendations: vec!["Set a password".to_string()],
            crack_time: CrackTimeEstimate::instant(),
            details: ScoreBreakdown::default(),
        };
    }

    let chars: Vec<char> = password.chars().collect();
    let lower = password.to_lowercase();

    let analysis = AnalysisDetails {
        length: chars.len(),
        has_lowercase: chars.iter().any(char::is_ascii_lowercase),
        has_uppercase: chars.iter().any(char::is_ascii_uppercase),
        has_digits: chars.iter().any(char::is_ascii_digit),
        has_symbols: chars.iter().any(|&c| ANALYSIS_SYMBOLS.contains(c)),
        has_common_patterns: has_common_pattern(&lower),
        entropy: shannon_entropy(&chars),
        uniqueness: uniqueness_ratio(&chars),
        dictionary_words: find_dictionary_words(&lower),
        repeated_chars: max_repeat_run(&chars),
        sequential_chars: has_sequential_run(&chars),
        keyboard_patterns: has_keyboard_walk(&lower),
    };

    let mut score: i32 = 0;
    let mut recommendations: Vec<String> = Vec::new();

    // Length.
    let length = analysis.length;
    if length >= 8 {
        score += 15;
    } else {
        recommendations.push(format!("Use at least 8 characters (currently {length})"));
    }
    if length >= 12 {
        score += 10;
    } else if length >= 8 {
        recommendations.push("Use at least 12 characters for better security".to_string());
    }
    if length >= 16 {
        score += 10;
    } else if length >= 12 {
        recommendations.push("Use 16+ characters for maximum security".to_string());
    }

    // Character classes.
    let mut character_types: u8 = 0;
    if analysis.has_lowercase {
        score += 5;
        character_types += 1;
    } else {
        recommendations.push("Add lowercase letters".to_string());
    }
    if analysis.has_uppercase {
        score += 5;
        character_types += 1;
    } else {
        recommendations.push("Add uppercase letters".to_string());
    }
    if analysis.has_digits {
        score += 10;
        character_types += 1;
    } else {
        recommendations.push("Add digits".to_string());
    }
    if analysis.has_symbols {
        score += 15;
        character_types += 1;
    } else {
        recommendations.push("Add special characters (!@#$...)".to_string());
    }

    // Class diversity bonus.
    if character_types >= 3 {
        score += 10;
    }
    if character_types == 4 {
        score += 5;
    }

    // Entropy.
    if analysis.entropy >= 4.0 {
        score += 15;
    } else if analysis.entropy >= 3.5 {
        score += 10;
    } else if analysis.entropy >= 3.0 {
        score += 5;
    } else {
        recommendations.push("Use a wider variety of characters".to_string());
    }

    // Uniqueness.
    if analysis.uniqueness >= 0.8 {
        score += 10;
    } else if analysis.uniqueness >= 0.6 {
        score += 5;
    } else {
        recommendations.push("Avoid repeated characters".to_string());
    }

    // Penalties.
    let mut penalties: i32 = 0;
    if analysis.has_common_patterns {
        penalties += 25;
        recommendations.push("Avoid common patterns (123, abc, qwerty, etc.)".to_string());
    }
    if !analysis.dictionary_words.is_empty() {
        penalties += 15;
        let shown: Vec<&str> = analysis
            .dictionary_words
            .iter()
            .take(3)
            .map(String::as_str)
            .collect();
        recommendations.push(format!("Avoid dictionary words: {}", shown.join(", ")));
    }
    if analysis.repeated_chars > 2 {
        penalties += 10;
        recommendations.push("Reduce consecutive repeated characters".to_string());
    }
    if analysis.sequential_chars {
        penalties += 15;
        recommendations.push("Avoid character sequences (abc, 123, etc.)".to_string());
    }
    if analysis.keyboard_patterns {
        penalties += 20;
        recommendations.push("Avoid keyboard patterns (qwerty, azerty, etc.)".to_string());
    }

    let final_score = (score - penalties).clamp(0, 100) as u8;
    recommendations.truncate(MAX_RECOMMENDATIONS);

    let entropy_bits = if analysis.entropy > 0.0 {
        (analysis.entropy * length as f64 * 10.0).round() / 10.0
    } else {
        0.0
    };

    let crack_time = estimate_crack_time(&analysis);

    StrengthReport {
        score: final_score,
        level: Some(StrengthLevel::from_score(final_score)),
        recommendations,
        crack_time,
        details: ScoreBreakdown {
            character_types,
            base_score: score,
            penalties,
            entropy_bits,
        },
        analysis,
    }
}

// ---------------------------------------------------------------------------
// Pattern checks
// ---------------------------------------------------------------------------

fn has_common_pattern(lower: &str) -> bool {
    if COMMON_PATTERNS.iter().any(|p| lower.contains(p)) {
        return true;
    }
    // Year patterns: a known prefix followed by any digit.
    let chars: Vec<char> = lower.chars().collect();
    for window in chars.windows(4) {
        let prefix: String = window[..3].iter().collect();
        if DATE_PREFIXES.contains(&prefix.as_str()) && window[3].is_ascii_digit() {
            return true;
        }
    }
    // Three or more identical consecutive characters.
    max_repeat_run(&chars) >= 3
}

fn find_dictionary_words(lower: &str) -> Vec<String> {
    DICTIONARY_WORDS
        .iter()
        .filter(|word| word.len() >= 4 && lower.contains(*word))
        .map(|word| (*word).to_string())
        .collect()
}

#[allow(clippy::arithmetic_side_effects)]
fn max_repeat_run(chars: &[char]) -> usize {
    if chars.is_empty() {
        return 0;
    }
    let mut max_run = 1;
    let mut current = 1;
    for pair in chars.windows(2) {
        if pair[0] == pair[1] {
            current += 1;
            max_run = max_run.max(current);
        } else {
            current = 1;
        }
    }
    max_run
}

#[allow(clippy::arithmetic_side_effects)]
fn has_sequential_run(chars: &[char]) -> bool {
    chars.windows(3).any(|w| {
        let (a, b, c) = (w[0] as u32, w[1] as u32, w[2] as u32);
        (b == a + 1 && c == a + 2) || (a == b + 1 && b == c + 1)
    })
}

fn has_keyboard_walk(lower: &str) -> bool {
    for row in KEYBOARD_ROWS {
        let row_chars: Vec<char> = row.chars().collect();
        for window in row_chars.windows(3) {
            let pattern: String = window.iter().collect();
            let reversed: String = window.iter().rev().collect();
            if lower.contains(&pattern) || lower.contains(&reversed) {
                return true;
            }
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Shannon entropy over the character frequency distribution, in bits per
/// character.
#[allow(clippy::arithmetic_side_effects, clippy::cast_precision_loss)]
fn shannon_entropy(chars: &[char]) -> f64 {
    if chars.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<char, usize> = HashMap::new();
    for &c in chars {
        *counts.entry(c).or_insert(0) += 1;
    }
    let length = chars.len() as f64;
    let mut entropy = 0.0;
    for &count in counts.values() {
        let probability = count as f64 / length;
        entropy -= probability * probability.log2();
    }
    entropy
}

#[allow(clippy::cast_precision_loss)]
fn uniqueness_ratio(chars: &[char]) -> f64 {
    if chars.is_empty() {
        return 0.0;
    }
    let distinct: std::collections::HashSet<char> = chars.iter().copied().collect();
    distinct.len() as f64 / chars.len() as f64
}

// ---------------------------------------------------------------------------
// Crack-time estimation
// ---------------------------------------------------------------------------

#[allow(
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap
)]
fn estimate_crack_time(analysis: &AnalysisDetails) -> CrackTimeEstimate {
    let mut charset_size: u32 = 0;
    if analysis.has_lowercase {
        charset_size += 26;
    }
    if analysis.has_uppercase {
        charset_size += 26;
    }
    if analysis.has_digits {
        charset_size += 10;
    }
    if analysis.has_symbols {
        charset_size += SYMBOL_CHARSET_SIZE;
    }

    if charset_size == 0 || analysis.length == 0 {
        return CrackTimeEstimate::instant();
    }

    let combinations = f64::from(charset_size).powi(analysis.length as i32);
    let average = combinations / 2.0;
    let online_seconds = average / 1_000.0;
    let offline_seconds = average / 1e9;

    let combinations_display = if combinations < 1e15 {
        format!("{combinations:.0}")
    } else {
        format!("{combinations:.2e}")
    };

    CrackTimeEstimate {
        online: humanize_duration(online_seconds),
        offline: humanize_duration(offline_seconds),
        combinations: combinations_display,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn humanize_duration(seconds: f64) -> String {
    if seconds < 1.0 {
        "instant".to_string()
    } else if seconds < 60.0 {
        format!("{} seconds", seconds as u64)
    } else if seconds < 3_600.0 {
        format!("{} minutes", (seconds / 60.0) as u64)
    } else if seconds < 86_400.0 {
        format!("{} hours", (seconds / 3_600.0) as u64)
    } else if seconds < 31_536_000.0 {
        format!("{} days", (seconds / 86_400.0) as u64)
    } else {
        format!("{} years", (seconds / 31_536_000.0) as u64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
