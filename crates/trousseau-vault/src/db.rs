//! `SQLite` connection handling, migration runner, and shared id/time helpers.
//!
//! Secrets reach this layer already sealed by `trousseau-crypto-core`; the
//! database file itself holds only ciphertext in its secret columns, so a
//! plain (non-encrypted) `SQLite` database is used.

use std::path::Path;

use rand::rngs::OsRng;
use rand::RngCore;
use rusqlite::Connection;

use crate::error::VaultError;

// ---------------------------------------------------------------------------
// Embedded migrations
// ---------------------------------------------------------------------------

/// Forward-only SQL migrations, embedded at compile time.
/// Index 0 → version 1, index 1 → version 2, etc.
const MIGRATIONS: &[&str] = &[
    include_str!("../migrations/001_initial_schema.sql"),
    include_str!("../migrations/002_add_dashboard_indexes.sql"),
];

// ---------------------------------------------------------------------------
// VaultDb
// ---------------------------------------------------------------------------

/// Handle to an open, migrated vault database.
///
/// All vault I/O flows through the [`rusqlite::Connection`] this struct
/// hands out.
pub struct VaultDb {
    conn: Connection,
}

impl VaultDb {
    /// Open (or create) a vault database at `path`.
    ///
    /// Enables WAL journal mode and foreign-key enforcement, then runs any
    /// pending migrations.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Database`] for `SQLite` errors.
    /// - [`VaultError::Migration`] if a migration fails.
    pub fn open(path: &Path) -> Result<Self, VaultError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let mut db = Self { conn };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open a fresh in-memory database with the full schema applied.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Database`] or [`VaultError::Migration`] on
    /// failure.
    pub fn open_in_memory() -> Result<Self, VaultError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let mut db = Self { conn };
        db.run_migrations()?;
        Ok(db)
    }

    /// Returns a reference to the underlying [`rusqlite::Connection`].
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Returns a mutable reference to the connection, for operations that
    /// open their own (immediate) transaction.
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Returns the current schema version (`PRAGMA user_version`).
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Database`] if the pragma query fails.
    pub fn schema_version(&self) -> Result<i32, VaultError> {
        let v: i32 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;
        Ok(v)
    }

    // -----------------------------------------------------------------------
    // Migration runner
    // -----------------------------------------------------------------------

    /// Apply all pending migrations sequentially.
    ///
    /// Each migration is wrapped in a transaction. The `user_version` pragma
    /// is bumped atomically on commit.
    fn run_migrations(&mut self) -> Result<(), VaultError> {
        let current = self.schema_version()?;

        for (idx, sql) in MIGRATIONS.iter().enumerate() {
            // Migration versions are 1-indexed: index 0 → version 1.
            let version = idx
                .checked_add(1)
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(|| VaultError::Migration("migration index overflow".into()))?;

            if version <= current {
                continue; // already applied
            }

            let tx = self.conn.transaction().map_err(|e| {
                VaultError::Migration(format!(
                    "failed to start transaction for migration {version}: {e}"
                ))
            })?;

            tx.execute_batch(sql)
                .map_err(|e| VaultError::Migration(format!("migration {version} failed: {e}")))?;

            tx.pragma_update(None, "user_version", version)
                .map_err(|e| {
                    VaultError::Migration(format!(
                        "failed to update user_version to {version}: {e}"
                    ))
                })?;

            tx.commit().map_err(|e| {
                VaultError::Migration(format!("failed to commit migration {version}: {e}"))
            })?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Id and time helpers
// ---------------------------------------------------------------------------

/// Generate a UUIDv4-like string using `OsRng`.
///
/// Format: `xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx` where x is random hex
/// and y is one of `{8, 9, a, b}`.
#[must_use]
pub fn generate_uuid() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);

    // Set version (4) and variant (RFC 4122).
    bytes[6] = (bytes[6] & 0x0F) | 0x40; // version 4
    bytes[8] = (bytes[8] & 0x3F) | 0x80; // variant 1

    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        bytes[6], bytes[7],
        bytes[8], bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15],
    )
}

/// Get the current time as seconds since Unix epoch.
#[must_use]
pub fn current_epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Return the current UTC time as an ISO 8601 string.
///
/// Uses `std::time::SystemTime` to avoid pulling in `chrono`. The shared
/// `YYYY-MM-DDTHH:MM:SSZ` format keeps lexicographic comparison of stored
/// timestamps equivalent to chronological comparison.
#[must_use]
pub fn now_iso8601() -> String {
    iso8601_from_epoch(current_epoch_secs())
}

/// Format epoch seconds as an ISO 8601 UTC string.
#[must_use]
pub fn iso8601_from_epoch(epoch_secs: u64) -> String {
    let (year, month, day, hour, minute, second) = epoch_to_utc(epoch_secs);
    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}Z")
}

/// Convert epoch seconds to (year, month, day, hour, minute, second) in UTC.
///
/// This is a simplified civil calendar computation (valid for years 1970–9999).
#[allow(clippy::arithmetic_side_effects)]
const fn epoch_to_utc(epoch_secs: u64) -> (u64, u64, u64, u64, u64, u64) {
    // Algorithm adapted from Howard Hinnant's `civil_from_days`.
    let secs_per_day: u64 = 86_400;
    let total_days = epoch_secs / secs_per_day;
    let remaining_secs = epoch_secs % secs_per_day;

    let hour = remaining_secs / 3600;
    let minute = (remaining_secs % 3600) / 60;
    let second = remaining_secs % 60;

    // Days since 0000-03-01 (shifted epoch for leap year handling).
    let z = total_days + 719_468;
    let era = z / 146_097;
    let doe = z - era * 146_097; // day of era [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = if m <= 2 { y + 1 } else { y };

    (year, m, d, hour, minute, second)
}

/// Parse an ISO 8601 string back to epoch seconds.
/// Supports `YYYY-MM-DDTHH:MM:SSZ` and bare `YYYY-MM-DD` (midnight UTC).
#[allow(clippy::arithmetic_side_effects, clippy::cast_sign_loss)]
#[must_use]
pub fn parse_iso8601_to_epoch_secs(s: &str) -> Option<u64> {
    let (date_part, time_part) = match s.split_once('T') {
        Some((date, time)) => (date, time.trim_end_matches('Z')),
        None => (s, "00:00:00"),
    };

    let mut date_fields = date_part.split('-');
    let year: i64 = date_fields.next()?.parse().ok()?;
    let month: i64 = date_fields.next()?.parse().ok()?;
    let day: i64 = date_fields.next()?.parse().ok()?;
    if date_fields.next().is_some() {
        return None;
    }

    let mut time_fields = time_part.split(':');
    let hour: i64 = time_fields.next()?.parse().ok()?;
    let minute: i64 = time_fields.next()?.parse().ok()?;
    let second: i64 = time_fields.next()?.parse().ok()?;
    if time_fields.next().is_some() {
        return None;
    }

    // Days from year/month/day using a simplified civil-date algorithm
    // (Jean Meeus, valid for dates 1970+).
    let y = if month <= 2 { year - 1 } else { year };
    let m = if month <= 2 { month + 12 } else { month };
    let era_days = 365 * y + y / 4 - y / 100 + y / 400 + (153 * (m - 3) + 2) / 5 + day - 719_469;
    if era_days < 0 {
        return None;
    }

    let total = era_days * 86_400 + hour * 3600 + minute * 60 + second;
    if total < 0 {
        None
    } else {
        Some(total as u64)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory_applies_all_migrations() {
        let db = VaultDb::open_in_memory().unwrap();
        assert_eq!(db.schema_version().unwrap(), 2);

        let table_count: i64 = db
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
                 ('categories', 'folders', 'credentials', 'password_history', \
                  'shared_credentials', 'shared_folders')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(table_count, 6);
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let db = VaultDb::open_in_memory().unwrap();
        let result = db.connection().execute(
            "INSERT INTO password_history (id, credential_id, password_hash, created_at) \
             VALUES ('h1', 'missing-credential', 'deadbeef', '2026-01-01T00:00:00Z')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn generate_uuid_format() {
        let uuid = generate_uuid();
        assert_eq!(uuid.len(), 36);
        let chars: Vec<char> = uuid.chars().collect();
        assert_eq!(chars[8], '-');
        assert_eq!(chars[13], '-');
        assert_eq!(chars[18], '-');
        assert_eq!(chars[23], '-');
        assert_eq!(chars[14], '4'); // version nibble
        assert!(matches!(chars[19], '8' | '9' | 'a' | 'b')); // variant
    }

    #[test]
    fn generate_uuid_unique() {
        let uuids: std::collections::HashSet<String> = (0..100).map(|_| generate_uuid()).collect();
        assert_eq!(uuids.len(), 100);
    }

    #[test]
    fn now_iso8601_format() {
        let now = now_iso8601();
        assert_eq!(now.len(), 20);
        assert_eq!(now.as_bytes()[10], b'T');
        assert!(now.ends_with('Z'));
    }

    #[test]
    fn epoch_to_utc_unix_epoch() {
        assert_eq!(epoch_to_utc(0), (1970, 1, 1, 0, 0, 0));
    }

    #[test]
    fn epoch_to_utc_known_date() {
        // 2026-02-09 00:00:00 UTC
        assert_eq!(epoch_to_utc(1_770_595_200), (2026, 2, 9, 0, 0, 0));
    }

    #[test]
    fn iso8601_from_epoch_formats_epoch_zero() {
        assert_eq!(iso8601_from_epoch(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn parse_iso8601_roundtrip() {
        for epoch in [0, 951_782_400, 1_770_595_200, 4_102_444_799] {
            let formatted = iso8601_from_epoch(epoch);
            assert_eq!(parse_iso8601_to_epoch_secs(&formatted), Some(epoch));
        }
    }

    #[test]
    fn parse_iso8601_date_only() {
        assert_eq!(
            parse_iso8601_to_epoch_secs("2026-02-09"),
            Some(1_770_595_200)
        );
    }

    #[test]
    fn parse_iso8601_rejects_garbage() {
        assert_eq!(parse_iso8601_to_epoch_secs(""), None);
        assert_eq!(parse_iso8601_to_epoch_secs("not-a-date"), None);
        assert_eq!(parse_iso8601_to_epoch_secs("2026-02"), None);
        assert_eq!(parse_iso8601_to_epoch_secs("1950-01-01"), None);
    }

    /// Verify `VaultDb` is `Send` (handles move across service worker threads).
    #[allow(dead_code)]
    const fn assert_send<T: Send>() {}

    #[allow(dead_code)]
    const _: () = assert_send::<VaultDb>();
}

#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::{iso8601_from_epoch, parse_iso8601_to_epoch_secs};

    proptest! {
        /// Format→parse is the identity for any epoch in the supported range.
        #[test]
        fn iso8601_roundtrip(epoch in 0u64..253_402_300_800) {
            let formatted = iso8601_from_epoch(epoch);
            prop_assert_eq!(parse_iso8601_to_epoch_secs(&formatted), Some(epoch));
        }

        /// Formatting is monotonic: later epochs sort lexicographically later.
        #[test]
        fn iso8601_is_lexicographically_monotonic(
            a in 0u64..4_102_444_800,
            b in 0u64..4_102_444_800,
        ) {
            let fa = iso8601_from_epoch(a);
            let fb = iso8601_from_epoch(b);
            prop_assert_eq!(a.cmp(&b), fa.cmp(&fb));
        }
    }
}
