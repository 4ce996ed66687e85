//! Sharing engine: time-limited grants on credentials and folders.
//!
//! One generic implementation covers both resource types. A grant gives a
//! grantee a permission level (`read < write < share < admin`) on a resource
//! owned by someone else, optionally until an expiry timestamp. Expiry is
//! evaluated live on every permission check; the periodic sweep only tidies
//! the `is_active` flag, it is never the source of truth.

use rusqlite::{params, Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::db::{generate_uuid, iso8601_from_epoch, now_iso8601, parse_iso8601_to_epoch_secs};
use crate::error::VaultError;

/// Inclusive bounds for `extend_expiration` in days.
pub const MIN_EXTEND_DAYS: u32 = 1;
/// Upper bound for `extend_expiration`.
pub const MAX_EXTEND_DAYS: u32 = 365;

const SECS_PER_DAY: u64 = 86_400;

// ---------------------------------------------------------------------------
// Permission levels
// ---------------------------------------------------------------------------

/// Grant permission level. The derived order is the permission hierarchy:
/// a higher level implies every lower one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// View and reveal.
    Read,
    /// Read plus modify.
    Write,
    /// Write plus re-share.
    Share,
    /// Full control.
    Admin,
}

impl Permission {
    /// Convert to the `TEXT` value stored in the grant tables.
    #[must_use]
    pub const fn as_db_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Share => "share",
            Self::Admin => "admin",
        }
    }

    /// Parse from the database `TEXT` value.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Database`] for unknown permission strings.
    pub fn from_db_str(s: &str) -> Result<Self, VaultError> {
        match s {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "share" => Ok(Self::Share),
            "admin" => Ok(Self::Admin),
            other => Err(VaultError::Database(format!("unknown permission: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Shareable resources
// ---------------------------------------------------------------------------

/// Capability a resource type must provide to be shareable.
///
/// The engine stays generic: it only needs to know which grant table to
/// touch, how to find the resource's owner, and how to maintain the
/// resource's denormalized `is_shared` flag.
pub trait ShareableResource {
    /// Grant table name (`shared_credentials` / `shared_folders`).
    const GRANT_TABLE: &'static str;
    /// Grant table column referencing the resource.
    const RESOURCE_COLUMN: &'static str;
    /// Resource table name, which carries `owner_id` and `is_shared`.
    const RESOURCE_TABLE: &'static str;
    /// Human-readable resource kind for error messages.
    const KIND: &'static str;
}

/// Sharing of individual credentials.
pub struct CredentialResource;

impl ShareableResource for CredentialResource {
    const GRANT_TABLE: &'static str = "shared_credentials";
    const RESOURCE_COLUMN: &'static str = "credential_id";
    const RESOURCE_TABLE: &'static str = "credentials";
    const KIND: &'static str = "credential";
}

/// Sharing of whole folders.
pub struct FolderResource;

impl ShareableResource for FolderResource {
    const GRANT_TABLE: &'static str = "shared_folders";
    const RESOURCE_COLUMN: &'static str = "folder_id";
    const RESOURCE_TABLE: &'static str = "folders";
    const KIND: &'static str = "folder";
}

/// Look up a resource's owner.
///
/// # Errors
///
/// Returns [`VaultError::NotFound`] if no row matches the id.
pub(crate) fn owner_of<R: ShareableResource>(
    conn: &Connection,
    resource_id: &str,
) -> Result<String, VaultError> {
    let sql = format!(
        "SELECT owner_id FROM {} WHERE id = ?1",
        R::RESOURCE_TABLE
    );
    conn.query_row(&sql, params![resource_id], |row| row.get::<_, String>(0))
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                VaultError::NotFound(format!("{} {resource_id}", R::KIND))
            }
            other => VaultError::Database(format!("failed to query {} owner: {other}", R::KIND)),
        })
}

/// Recompute the resource's `is_shared` flag from its remaining grants.
///
/// The flag stays true while deactivated grants still exist; it only drops
/// back to false once every grant on the resource is gone.
fn refresh_shared_flag<R: ShareableResource>(
    conn: &Connection,
    resource_id: &str,
) -> Result<(), VaultError> {
    let sql = format!(
        "UPDATE {res} SET is_shared = EXISTS (\
         SELECT 1 FROM {grants} WHERE {col} = ?1) WHERE id = ?1",
        res = R::RESOURCE_TABLE,
        grants = R::GRANT_TABLE,
        col = R::RESOURCE_COLUMN,
    );
    conn.execute(&sql, params![resource_id])
        .map_err(|e| VaultError::Database(format!("failed to refresh shared flag: {e}")))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Grants
// ---------------------------------------------------------------------------

/// A sharing grant row.
#[derive(Debug, Clone, Serialize)]
pub struct ShareGrant {
    /// Unique identifier (UUID v4).
    pub id: String,
    /// Shared resource id.
    pub resource_id: String,
    /// Grantee user id.
    pub user_id: String,
    /// User who created the grant (the resource owner).
    pub granted_by: String,
    /// Permission level.
    pub permission: Permission,
    /// ISO 8601 creation timestamp.
    pub granted_at: String,
    /// Optional ISO 8601 expiry; `None` means the grant never expires.
    pub expires_at: Option<String>,
    /// Manual activation toggle.
    pub is_active: bool,
}

impl ShareGrant {
    /// Whether the grant's expiry has passed, evaluated against the
    /// current time. Derived, never stored.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        // ISO 8601 UTC strings compare lexicographically in time order.
        self.expires_at
            .as_deref()
            .is_some_and(|expiry| expiry < now_iso8601().as_str())
    }

    /// Whether this grant currently confers `required`.
    ///
    /// True iff the grant is active, not expired, and its level ranks at
    /// least as high as `required`.
    #[must_use]
    pub fn has_permission(&self, required: Permission) -> bool {
        self.is_active && !self.is_expired() && self.permission >= required
    }
}

/// Parameters for creating a grant.
pub struct ShareParams {
    /// Grantee user id (resolved from email by the identity layer).
    pub grantee_id: String,
    /// Permission level to confer.
    pub permission: Permission,
    /// Days until expiry; `None` means no expiry.
    pub expires_in_days: Option<u32>,
}

/// Per-type counts from the expired-grant sweep.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CleanupReport {
    /// Credential grants deactivated.
    pub expired_credentials: usize,
    /// Folder grants deactivated.
    pub expired_folders: usize,
}

/// Aggregates over the grants on resources one user owns.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SharingStatistics {
    /// All grants.
    pub total_shared: usize,
    /// Grants with `is_active` set.
    pub active_shares: usize,
    /// Grants past expiry but still flagged active (sweep candidates).
    pub expired_shares: usize,
    /// `total − active`.
    pub inactive_shares: usize,
    /// Grants at `read`.
    pub read_count: usize,
    /// Grants at `write`.
    pub write_count: usize,
    /// Grants at `share`.
    pub share_count: usize,
    /// Grants at `admin`.
    pub admin_count: usize,
}

// ---------------------------------------------------------------------------
// Row extraction
// ---------------------------------------------------------------------------

const GRANT_COLUMNS: &str = "id, {col}, user_id, granted_by, permission, \
                             granted_at, expires_at, is_active";

fn grant_select<R: ShareableResource>(where_clause: &str, order: &str) -> String {
    format!(
        "SELECT {cols} FROM {table} {where_clause} {order}",
        cols = GRANT_COLUMNS.replace("{col}", R::RESOURCE_COLUMN),
        table = R::GRANT_TABLE,
    )
}

#[allow(clippy::type_complexity)]
fn grant_from_row(
    row: &rusqlite::Row<'_>,
) -> rusqlite::Result<(
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    i32,
)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn build_grant(
    row: (
        String,
        String,
        String,
        String,
        String,
        String,
        Option<String>,
        i32,
    ),
) -> Result<ShareGrant, VaultError> {
    Ok(ShareGrant {
        id: row.0,
        resource_id: row.1,
        user_id: row.2,
        granted_by: row.3,
        permission: Permission::from_db_str(&row.4)?,
        granted_at: row.5,
        expires_at: row.6,
        is_active: row.7 != 0,
    })
}

/// Fetch a grant by id.
fn get_grant<R: ShareableResource>(
    conn: &Connection,
    grant_id: &str,
) -> Result<ShareGrant, VaultError> {
    let sql = grant_select::<R>("WHERE id = ?1", "");
    let row = conn
        .query_row(&sql, params![grant_id], grant_from_row)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                VaultError::NotFound(format!("{} grant {grant_id}", R::KIND))
            }
            other => VaultError::Database(format!("failed to query grant: {other}")),
        })?;
    build_grant(row)
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Share a resource with another user.
///
/// The insert runs inside an immediate transaction and relies on the
/// `UNIQUE (resource, user_id)` constraint — there is no check-then-insert
/// window for a duplicate grant to slip through. The resource's `is_shared`
/// flag is set in the same transaction.
///
/// # Errors
///
/// - [`VaultError::NotFound`] if the resource does not exist.
/// - [`VaultError::PermissionDenied`] if `requester_id` is not the owner.
/// - [`VaultError::SelfShareNotAllowed`] if the grantee is the owner.
/// - [`VaultError::DuplicateGrant`] if a grant for this pair already exists.
pub fn share<R: ShareableResource>(
    conn: &mut Connection,
    resource_id: &str,
    requester_id: &str,
    params: &ShareParams,
) -> Result<ShareGrant, VaultError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let owner = owner_of::<R>(&tx, resource_id)?;
    if owner != requester_id {
        return Err(VaultError::PermissionDenied(format!(
            "only the owner can share this {}",
            R::KIND
        )));
    }
    if params.grantee_id == owner {
        return Err(VaultError::SelfShareNotAllowed);
    }

    let id = generate_uuid();
    let now = now_iso8601();
    let expires_at = match params.expires_in_days {
        Some(days) => Some(expiry_from_now(&now, days)?),
        None => None,
    };

    let sql = format!(
        "INSERT INTO {table} (id, {col}, user_id, granted_by, permission, \
         granted_at, expires_at, is_active) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
        table = R::GRANT_TABLE,
        col = R::RESOURCE_COLUMN,
    );
    tx.execute(
        &sql,
        params![
            id,
            resource_id,
            params.grantee_id,
            requester_id,
            params.permission.as_db_str(),
            now,
            expires_at,
        ],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            VaultError::DuplicateGrant(format!(
                "{} {resource_id} is already shared with {}",
                R::KIND,
                params.grantee_id
            ))
        }
        other => VaultError::Database(format!("failed to insert grant: {other}")),
    })?;

    refresh_shared_flag::<R>(&tx, resource_id)?;
    tx.commit()?;

    Ok(ShareGrant {
        id,
        resource_id: resource_id.to_string(),
        user_id: params.grantee_id.clone(),
        granted_by: requester_id.to_string(),
        permission: params.permission,
        granted_at: now,
        expires_at,
        is_active: true,
    })
}

/// Revoke a grant, identified by (resource, grantee).
///
/// Recomputes the resource's `is_shared` flag from the remaining grants.
///
/// # Errors
///
/// - [`VaultError::NotFound`] if the resource or the grant is absent.
/// - [`VaultError::PermissionDenied`] if `requester_id` is not the owner.
pub fn revoke<R: ShareableResource>(
    conn: &mut Connection,
    resource_id: &str,
    requester_id: &str,
    grantee_id: &str,
) -> Result<(), VaultError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let owner = owner_of::<R>(&tx, resource_id)?;
    if owner != requester_id {
        return Err(VaultError::PermissionDenied(format!(
            "only the owner can revoke sharing of this {}",
            R::KIND
        )));
    }

    let sql = format!(
        "DELETE FROM {table} WHERE {col} = ?1 AND user_id = ?2",
        table = R::GRANT_TABLE,
        col = R::RESOURCE_COLUMN,
    );
    let deleted = tx
        .execute(&sql, params![resource_id, grantee_id])
        .map_err(|e| VaultError::Database(format!("failed to delete grant: {e}")))?;
    if deleted == 0 {
        return Err(VaultError::NotFound(format!(
            "no grant on {} {resource_id} for {grantee_id}",
            R::KIND
        )));
    }

    refresh_shared_flag::<R>(&tx, resource_id)?;
    tx.commit()?;
    Ok(())
}

/// Extend a grant's expiry by `days` (1–365).
///
/// Adds to the existing expiry, or starts the clock from now when the grant
/// previously had none.
///
/// # Errors
///
/// - [`VaultError::Validation`] if `days` is out of range.
/// - [`VaultError::NotFound`] if the grant is absent.
/// - [`VaultError::PermissionDenied`] if `requester_id` does not own the
///   underlying resource.
pub fn extend_expiration<R: ShareableResource>(
    conn: &mut Connection,
    grant_id: &str,
    requester_id: &str,
    days: u32,
) -> Result<ShareGrant, VaultError> {
    if !(MIN_EXTEND_DAYS..=MAX_EXTEND_DAYS).contains(&days) {
        return Err(VaultError::Validation(format!(
            "days must be between {MIN_EXTEND_DAYS} and {MAX_EXTEND_DAYS}, got {days}"
        )));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut grant = get_grant::<R>(&tx, grant_id)?;
    let owner = owner_of::<R>(&tx, &grant.resource_id)?;
    if owner != requester_id {
        return Err(VaultError::PermissionDenied(format!(
            "only the owner can extend sharing of this {}",
            R::KIND
        )));
    }

    let new_expiry = match grant.expires_at.as_deref() {
        Some(current) => {
            let epoch = parse_iso8601_to_epoch_secs(current).ok_or_else(|| {
                VaultError::Database(format!("grant {grant_id} has a malformed expiry"))
            })?;
            iso8601_from_epoch(epoch.saturating_add(u64::from(days).saturating_mul(SECS_PER_DAY)))
        }
        None => expiry_from_now(&now_iso8601(), days)?,
    };

    let sql = format!(
        "UPDATE {table} SET expires_at = ?1 WHERE id = ?2",
        table = R::GRANT_TABLE,
    );
    tx.execute(&sql, params![new_expiry, grant_id])
        .map_err(|e| VaultError::Database(format!("failed to extend grant: {e}")))?;
    tx.commit()?;

    grant.expires_at = Some(new_expiry);
    Ok(grant)
}

/// Flip a grant's `is_active` flag.
///
/// # Errors
///
/// - [`VaultError::NotFound`] if the grant is absent.
/// - [`VaultError::PermissionDenied`] if `requester_id` does not own the
///   underlying resource.
pub fn toggle_active<R: ShareableResource>(
    conn: &mut Connection,
    grant_id: &str,
    requester_id: &str,
) -> Result<ShareGrant, VaultError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut grant = get_grant::<R>(&tx, grant_id)?;
    let owner = owner_of::<R>(&tx, &grant.resource_id)?;
    if owner != requester_id {
        return Err(VaultError::PermissionDenied(format!(
            "only the owner can toggle sharing of this {}",
            R::KIND
        )));
    }

    let sql = format!(
        "UPDATE {table} SET is_active = NOT is_active WHERE id = ?1",
        table = R::GRANT_TABLE,
    );
    tx.execute(&sql, params![grant_id])
        .map_err(|e| VaultError::Database(format!("failed to toggle grant: {e}")))?;
    tx.commit()?;

    grant.is_active = !grant.is_active;
    Ok(grant)
}

/// Decide whether `requester_id` may act on a resource at `required` level.
///
/// The owner is always authorized. Anyone else needs an active,
/// non-expired grant ranking at least `required`. Expiry is evaluated
/// against the current time — a stale `is_active` flag never grants
/// access past expiry.
///
/// # Errors
///
/// Returns [`VaultError::NotFound`] if the resource does not exist, or
/// [`VaultError::Database`] on query failure. An absent grant is `Ok(false)`,
/// not an error.
pub fn authorize<R: ShareableResource>(
    conn: &Connection,
    resource_id: &str,
    requester_id: &str,
    required: Permission,
) -> Result<bool, VaultError> {
    let owner = owner_of::<R>(conn, resource_id)?;
    if owner == requester_id {
        return Ok(true);
    }

    let sql = grant_select::<R>("WHERE {col} = ?1 AND user_id = ?2", "");
    let sql = sql.replace("{col}", R::RESOURCE_COLUMN);
    let row = match conn.query_row(&sql, params![resource_id, requester_id], grant_from_row) {
        Ok(row) => row,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(false),
        Err(e) => {
            return Err(VaultError::Database(format!(
                "failed to query grant: {e}"
            )))
        }
    };

    Ok(build_grant(row)?.has_permission(required))
}

/// Deactivate every grant whose expiry has passed.
///
/// One conditional UPDATE per grant table: idempotent, safe to run
/// concurrently with normal traffic, and a no-op the second time around.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if an UPDATE fails.
pub fn cleanup_expired(conn: &Connection) -> Result<CleanupReport, VaultError> {
    let now = now_iso8601();

    let expired_credentials = conn
        .execute(
            "UPDATE shared_credentials SET is_active = 0 \
             WHERE is_active = 1 AND expires_at IS NOT NULL AND expires_at < ?1",
            params![now],
        )
        .map_err(|e| VaultError::Database(format!("credential grant sweep failed: {e}")))?;

    let expired_folders = conn
        .execute(
            "UPDATE shared_folders SET is_active = 0 \
             WHERE is_active = 1 AND expires_at IS NOT NULL AND expires_at < ?1",
            params![now],
        )
        .map_err(|e| VaultError::Database(format!("folder grant sweep failed: {e}")))?;

    if expired_credentials > 0 || expired_folders > 0 {
        tracing::info!(
            expired_credentials,
            expired_folders,
            "deactivated expired grants"
        );
    }

    Ok(CleanupReport {
        expired_credentials,
        expired_folders,
    })
}

/// List the grants on one owned resource, newest first.
///
/// # Errors
///
/// - [`VaultError::NotFound`] if the resource does not exist.
/// - [`VaultError::PermissionDenied`] if `requester_id` is not the owner.
pub fn list_grants<R: ShareableResource>(
    conn: &Connection,
    resource_id: &str,
    requester_id: &str,
) -> Result<Vec<ShareGrant>, VaultError> {
    let owner = owner_of::<R>(conn, resource_id)?;
    if owner != requester_id {
        return Err(VaultError::PermissionDenied(format!(
            "only the owner can list grants on this {}",
            R::KIND
        )));
    }

    let sql = grant_select::<R>("WHERE {col} = ?1", "ORDER BY granted_at DESC, rowid DESC")
        .replace("{col}", R::RESOURCE_COLUMN);
    collect_grants(conn, &sql, params![resource_id])
}

/// List the active, non-expired grants where `user_id` is the grantee,
/// newest first.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the query fails.
pub fn list_shared_with<R: ShareableResource>(
    conn: &Connection,
    user_id: &str,
) -> Result<Vec<ShareGrant>, VaultError> {
    let sql = grant_select::<R>(
        "WHERE user_id = ?1 AND is_active = 1 \
         AND (expires_at IS NULL OR expires_at >= ?2)",
        "ORDER BY granted_at DESC, rowid DESC",
    );
    collect_grants(conn, &sql, params![user_id, now_iso8601()])
}

fn collect_grants(
    conn: &Connection,
    sql: &str,
    query_params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<ShareGrant>, VaultError> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| VaultError::Database(format!("failed to prepare grant query: {e}")))?;
    let rows = stmt
        .query_map(query_params, grant_from_row)
        .map_err(|e| VaultError::Database(format!("failed to query grants: {e}")))?;

    let mut grants = Vec::new();
    for row in rows {
        let row = row.map_err(|e| VaultError::Database(format!("grant row read error: {e}")))?;
        grants.push(build_grant(row)?);
    }
    Ok(grants)
}

/// Aggregate statistics over the grants on resources `owner_id` owns.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the query fails.
pub fn sharing_statistics<R: ShareableResource>(
    conn: &Connection,
    owner_id: &str,
) -> Result<SharingStatistics, VaultError> {
    let sql = format!(
        "SELECT \
           COUNT(*), \
           COUNT(*) FILTER (WHERE g.is_active = 1), \
           COUNT(*) FILTER (WHERE g.is_active = 1 \
                            AND g.expires_at IS NOT NULL AND g.expires_at < ?2), \
           COUNT(*) FILTER (WHERE g.permission = 'read'), \
           COUNT(*) FILTER (WHERE g.permission = 'write'), \
           COUNT(*) FILTER (WHERE g.permission = 'share'), \
           COUNT(*) FILTER (WHERE g.permission = 'admin') \
         FROM {grants} g \
         JOIN {res} r ON r.id = g.{col} \
         WHERE r.owner_id = ?1",
        grants = R::GRANT_TABLE,
        res = R::RESOURCE_TABLE,
        col = R::RESOURCE_COLUMN,
    );

    let (total, active, expired, read, write, share, admin) = conn
        .query_row(&sql, params![owner_id, now_iso8601()], |row| {
            Ok((
                row.get::<_, usize>(0)?,
                row.get::<_, usize>(1)?,
                row.get::<_, usize>(2)?,
                row.get::<_, usize>(3)?,
                row.get::<_, usize>(4)?,
                row.get::<_, usize>(5)?,
                row.get::<_, usize>(6)?,
            ))
        })
        .map_err(|e| VaultError::Database(format!("failed to aggregate sharing stats: {e}")))?;

    Ok(SharingStatistics {
        total_shared: total,
        active_shares: active,
        expired_shares: expired,
        inactive_shares: total.saturating_sub(active),
        read_count: read,
        write_count: write,
        share_count: share,
        admin_count: admin,
    })
}

/// Compute `now + days` as an ISO 8601 expiry.
fn expiry_from_now(now: &str, days: u32) -> Result<String, VaultError> {
    let epoch = parse_iso8601_to_epoch_secs(now)
        .ok_or_else(|| VaultError::Database("malformed current timestamp".into()))?;
    Ok(iso8601_from_epoch(
        epoch.saturating_add(u64::from(days).saturating_mul(SECS_PER_DAY)),
    ))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
