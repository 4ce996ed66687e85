//! Per-owner dashboard statistics.
//!
//! Aggregates over stored metadata only: counts of weak, stale, and unused
//! credentials, category distribution, and an overall security score. No
//! secret is ever decrypted here — strength scores were computed at write
//! time by the analyzer.

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::db::{current_epoch_secs, iso8601_from_epoch};
use crate::error::VaultError;

/// Strength below this counts as weak.
pub const WEAK_THRESHOLD: u8 = 60;

/// A password older than this many days counts as old.
pub const OLD_PASSWORD_DAYS: u64 = 90;

/// Usage within this many days counts as recent activity.
pub const RECENT_ACTIVITY_DAYS: u64 = 30;

const SECS_PER_DAY: u64 = 86_400;

/// One slice of the per-category distribution.
#[derive(Debug, Clone, Serialize)]
pub struct CategorySlice {
    /// Category name; `None` groups uncategorized credentials.
    pub name: Option<String>,
    /// Icon of the category, when categorized.
    pub icon: Option<String>,
    /// Color of the category, when categorized.
    pub color: Option<String>,
    /// Credentials in this slice.
    pub count: u32,
}

/// Aggregate statistics for one owner's vault.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    /// All credentials.
    pub total_credentials: usize,
    /// Credentials with `password_strength` below [`WEAK_THRESHOLD`].
    pub weak_passwords: usize,
    /// Credentials whose password last changed more than
    /// [`OLD_PASSWORD_DAYS`] ago.
    pub old_passwords: usize,
    /// Credentials never marked used.
    pub unused_credentials: usize,
    /// Favorites.
    pub favorites: usize,
    /// Credentials used within [`RECENT_ACTIVITY_DAYS`].
    pub recent_activity: usize,
    /// Category distribution, largest slice first.
    pub categories_distribution: Vec<CategorySlice>,
    /// Overall security score, 0–100.
    pub security_score: u8,
}

/// Compute the dashboard statistics for `owner_id`.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if a query fails.
pub fn dashboard_stats(conn: &Connection, owner_id: &str) -> Result<DashboardStats, VaultError> {
    let now = current_epoch_secs();
    let old_cutoff = iso8601_from_epoch(
        now.saturating_sub(OLD_PASSWORD_DAYS.saturating_mul(SECS_PER_DAY)),
    );
    let recent_cutoff = iso8601_from_epoch(
        now.saturating_sub(RECENT_ACTIVITY_DAYS.saturating_mul(SECS_PER_DAY)),
    );

    let (total, weak, old, unused, favorites, recent) = conn
        .query_row(
            "SELECT \
               COUNT(*), \
               COUNT(*) FILTER (WHERE password_strength < ?2), \
               COUNT(*) FILTER (WHERE password_changed_at < ?3), \
               COUNT(*) FILTER (WHERE last_used_at IS NULL), \
               COUNT(*) FILTER (WHERE is_favorite = 1), \
               COUNT(*) FILTER (WHERE last_used_at >= ?4) \
             FROM credentials WHERE owner_id = ?1",
            params![owner_id, WEAK_THRESHOLD, old_cutoff, recent_cutoff],
            |row| {
                Ok((
                    row.get::<_, usize>(0)?,
                    row.get::<_, usize>(1)?,
                    row.get::<_, usize>(2)?,
                    row.get::<_, usize>(3)?,
                    row.get::<_, usize>(4)?,
                    row.get::<_, usize>(5)?,
                ))
            },
        )
        .map_err(|e| VaultError::Database(format!("failed to aggregate dashboard stats: {e}")))?;

    let mut stmt = conn
        .prepare(
            "SELECT cat.name, cat.icon, cat.color, COUNT(c.id) AS n \
             FROM credentials c \
             LEFT JOIN categories cat ON cat.id = c.category_id \
             WHERE c.owner_id = ?1 \
             GROUP BY c.category_id ORDER BY n DESC",
        )
        .map_err(|e| VaultError::Database(format!("failed to prepare distribution query: {e}")))?;

    let rows = stmt
        .query_map(params![owner_id], |row| {
            Ok(CategorySlice {
                name: row.get(0)?,
                icon: row.get(1)?,
                color: row.get(2)?,
                count: row.get(3)?,
            })
        })
        .map_err(|e| VaultError::Database(format!("failed to query distribution: {e}")))?;

    let mut categories_distribution = Vec::new();
    for row in rows {
        categories_distribution
            .push(row.map_err(|e| VaultError::Database(format!("distribution row error: {e}")))?);
    }

    Ok(DashboardStats {
        total_credentials: total,
        weak_passwords: weak,
        old_passwords: old,
        unused_credentials: unused,
        favorites,
        recent_activity: recent,
        categories_distribution,
        security_score: security_score(total, weak, old, unused),
    })
}

/// Overall security score: start from 100 and deduct proportionally for
/// weak (up to 40), old (up to 30), and unused (up to 20) credentials.
/// An empty vault scores 100.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn security_score(total: usize, weak: usize, old: usize, unused: usize) -> u8 {
    if total == 0 {
        return 100;
    }

    let total = total as f64;
    let score = 100.0
        - (weak as f64 / total) * 40.0
        - (old as f64 / total) * 30.0
        - (unused as f64 / total) * 20.0;

    score.clamp(0.0, 100.0) as u8
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
