//! Credential CRUD with encryption-at-write and password history.
//!
//! A credential's plaintext metadata (name, username, url) is searchable;
//! the password and notes columns only ever hold blobs produced by
//! [`SecretCipher`]. Every password write recomputes the stored strength
//! score and refreshes `password_changed_at`; the previous plaintext's
//! SHA-256 lands in `password_history`, capped at the ten newest entries.
//!
//! Every operation takes the requester's user id explicitly. Non-owners
//! reach a credential only through a sharing grant, checked via
//! [`crate::sharing::authorize`].

use data_encoding::HEXLOWER;
use rusqlite::{params, Connection, TransactionBehavior};
use serde::Serialize;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use trousseau_crypto_core::{
    analyze_password, generate_random_password, GeneratorPolicy, SecretCipher,
};

use crate::db::{generate_uuid, now_iso8601};
use crate::error::VaultError;
use crate::sharing::{self, CredentialResource, Permission};

/// History entries retained per credential, newest first.
pub const HISTORY_LIMIT: usize = 10;

/// Domain separation tag binding password blobs to this vault.
pub(crate) const PASSWORD_AAD: &[u8] = b"trousseau-credential-password-v1";

/// Domain separation tag for notes blobs.
pub(crate) const NOTES_AAD: &[u8] = b"trousseau-credential-notes-v1";

// ---------------------------------------------------------------------------
// Domain model
// ---------------------------------------------------------------------------

/// Metadata view of a credential. Secrets never appear here: the password
/// and notes columns surface only as presence flags.
#[derive(Debug, Clone, Serialize)]
pub struct Credential {
    /// Unique identifier (UUID v4).
    pub id: String,
    /// Owning user id.
    pub owner_id: String,
    /// Display name (e.g., "GitHub").
    pub name: String,
    /// Username or email.
    pub username: String,
    /// Associated URL.
    pub url: String,
    /// Whether an encrypted password is stored.
    pub has_password: bool,
    /// Whether encrypted notes are stored.
    pub has_notes: bool,
    /// Stored strength score, 0–100 (0 when no password).
    pub password_strength: u8,
    /// When the plaintext password last changed.
    pub password_changed_at: Option<String>,
    /// When the credential was last used, if ever.
    pub last_used_at: Option<String>,
    /// Favorite flag.
    pub is_favorite: bool,
    /// Denormalized sharing flag, maintained by the sharing engine.
    pub is_shared: bool,
    /// Whether the password came from the generator.
    pub auto_generated: bool,
    /// Optional category reference.
    pub category_id: Option<String>,
    /// Optional folder reference.
    pub folder_id: Option<String>,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 last-update timestamp.
    pub updated_at: String,
}

/// One password-history row: the hash, never the password.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    /// Unique identifier.
    pub id: String,
    /// SHA-256 hex of a previously used password.
    pub password_hash: String,
    /// When the entry was recorded.
    pub created_at: String,
}

/// Parameters for creating a credential.
#[derive(Debug, Default)]
pub struct CreateCredentialParams {
    /// Display name.
    pub name: String,
    /// Username or email.
    pub username: String,
    /// Associated URL.
    pub url: String,
    /// Initial password. Ignored when `generator` is set.
    pub password: Option<String>,
    /// Initial notes.
    pub notes: Option<String>,
    /// Optional category reference (opaque FK).
    pub category_id: Option<String>,
    /// Optional folder reference (opaque FK).
    pub folder_id: Option<String>,
    /// When set, the password is generated under this policy instead of
    /// taken from `password`, and `auto_generated` is recorded.
    pub generator: Option<GeneratorPolicy>,
}

/// Result of a create: the stored metadata, plus the generated password
/// when a generator policy was used (returned once, never re-revealable
/// without a `reveal` call).
#[derive(Debug)]
pub struct CreatedCredential {
    /// Stored metadata view.
    pub credential: Credential,
    /// The generated password, when `generator` was set.
    pub generated_password: Option<String>,
}

/// Parameters for updating a credential. `None` leaves a field untouched;
/// the nested options distinguish "clear" from "keep".
#[derive(Debug, Default)]
pub struct UpdateCredentialParams {
    /// New display name.
    pub name: Option<String>,
    /// New username.
    pub username: Option<String>,
    /// New URL.
    pub url: Option<String>,
    /// `Some(Some(p))` sets a new password, `Some(None)` clears it.
    pub password: Option<Option<String>>,
    /// New notes (re-encrypted unconditionally when present).
    pub notes: Option<String>,
    /// `Some(Some(id))` moves to a category, `Some(None)` detaches.
    pub category_id: Option<Option<String>>,
    /// `Some(Some(id))` moves to a folder, `Some(None)` detaches.
    pub folder_id: Option<Option<String>>,
}

/// One credential in a vault export. There is no password field: the export
/// shape structurally cannot carry one.
#[derive(Debug, Clone, Serialize)]
pub struct ExportedCredential {
    /// Display name.
    pub name: String,
    /// Username or email.
    pub username: String,
    /// Associated URL.
    pub url: String,
    /// Category name, if categorized.
    pub category: Option<String>,
    /// Decrypted notes (empty when never set or undecryptable).
    pub notes: String,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// When last used, if ever.
    pub last_used_at: Option<String>,
}

/// A full vault export for one owner.
#[derive(Debug, Clone, Serialize)]
pub struct VaultExport {
    /// When the export was produced.
    pub export_date: String,
    /// Number of exported credentials.
    pub total_credentials: usize,
    /// The credentials, passwords excluded.
    pub credentials: Vec<ExportedCredential>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// SHA-256 hex digest of a password, for history rows.
fn hash_password(plaintext: &str) -> String {
    HEXLOWER.encode(&Sha256::digest(plaintext.as_bytes()))
}

const CREDENTIAL_COLUMNS: &str = "id, owner_id, name, username, url, \
     encrypted_password IS NOT NULL, encrypted_notes IS NOT NULL, \
     password_strength, password_changed_at, last_used_at, \
     is_favorite, is_shared, auto_generated, category_id, folder_id, \
     created_at, updated_at";

fn credential_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Credential> {
    Ok(Credential {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        username: row.get(3)?,
        url: row.get(4)?,
        has_password: row.get::<_, i32>(5)? != 0,
        has_notes: row.get::<_, i32>(6)? != 0,
        password_strength: row.get(7)?,
        password_changed_at: row.get(8)?,
        last_used_at: row.get(9)?,
        is_favorite: row.get::<_, i32>(10)? != 0,
        is_shared: row.get::<_, i32>(11)? != 0,
        auto_generated: row.get::<_, i32>(12)? != 0,
        category_id: row.get(13)?,
        folder_id: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

/// Fetch the metadata view of one credential, by id.
fn fetch_credential(conn: &Connection, id: &str) -> Result<Credential, VaultError> {
    conn.query_row(
        &format!("SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE id = ?1"),
        params![id],
        credential_from_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => VaultError::NotFound(format!("credential {id}")),
        other => VaultError::Database(format!("failed to query credential: {other}")),
    })
}

/// Decrypt the stored password, if any. `Ok(None)` means no password is
/// set; a decrypt failure is logged and also surfaces as `None` so read
/// paths render "no password set" instead of crashing.
fn decrypt_stored_password(
    conn: &Connection,
    cipher: &SecretCipher,
    id: &str,
) -> Result<Option<String>, VaultError> {
    let blob: Option<Vec<u8>> = conn
        .query_row(
            "SELECT encrypted_password FROM credentials WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                VaultError::NotFound(format!("credential {id}"))
            }
            other => VaultError::Database(format!("failed to query password: {other}")),
        })?;

    let Some(blob) = blob else {
        return Ok(None);
    };
    match cipher.open_str(&blob, PASSWORD_AAD) {
        Ok(plaintext) => Ok(Some(plaintext)),
        Err(e) => {
            tracing::warn!(credential_id = %id, error = %e, "undecryptable password blob");
            Ok(None)
        }
    }
}

/// Check that `requester_id` may act on the credential at `required` level.
///
/// The owner always passes. A non-owner additionally needs the credential's
/// `is_shared` flag and a satisfying grant.
fn check_access(
    conn: &Connection,
    credential: &Credential,
    requester_id: &str,
    required: Permission,
) -> Result<(), VaultError> {
    if credential.owner_id == requester_id {
        return Ok(());
    }
    if credential.is_shared
        && sharing::authorize::<CredentialResource>(conn, &credential.id, requester_id, required)?
    {
        return Ok(());
    }
    Err(VaultError::PermissionDenied(format!(
        "no {} access to credential {}",
        required.as_db_str(),
        credential.id
    )))
}

/// Record the old password's hash and trim history to the newest
/// [`HISTORY_LIMIT`] rows. Duplicate hashes are ignored via the table's
/// UNIQUE constraint.
fn push_history(conn: &Connection, credential_id: &str, old_plaintext: &str) -> Result<(), VaultError> {
    conn.execute(
        "INSERT OR IGNORE INTO password_history (id, credential_id, password_hash, created_at) \
         VALUES (?1, ?2, ?3, ?4)",
        params![
            generate_uuid(),
            credential_id,
            hash_password(old_plaintext),
            now_iso8601(),
        ],
    )
    .map_err(|e| VaultError::Database(format!("failed to insert history: {e}")))?;

    // rowid breaks created_at ties in insertion order.
    conn.execute(
        "DELETE FROM password_history WHERE credential_id = ?1 AND id NOT IN (\
         SELECT id FROM password_history WHERE credential_id = ?1 \
         ORDER BY created_at DESC, rowid DESC LIMIT ?2)",
        params![credential_id, HISTORY_LIMIT],
    )
    .map_err(|e| VaultError::Database(format!("failed to trim history: {e}")))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// CRUD operations
// ---------------------------------------------------------------------------

/// Create a credential.
///
/// When a password is supplied (or generated), it is sealed by the cipher
/// and its strength stored; `password_changed_at` starts at creation time
/// either way. Notes are sealed when provided.
///
/// # Errors
///
/// - [`VaultError::Validation`] if the name is empty.
/// - [`VaultError::Crypto`] if sealing or generation fails.
/// - [`VaultError::Database`] if the insert fails (including bad FKs).
pub fn create_credential(
    conn: &Connection,
    cipher: &SecretCipher,
    owner_id: &str,
    params: &CreateCredentialParams,
) -> Result<CreatedCredential, VaultError> {
    if params.name.trim().is_empty() {
        return Err(VaultError::Validation("credential name is required".into()));
    }

    let mut generated = None;
    let mut password = match &params.generator {
        Some(policy) => {
            let fresh = generate_random_password(policy)?;
            generated = Some(fresh.clone());
            Some(fresh)
        }
        None => params.password.clone(),
    };
    // An empty initial password means "no password", as with an absent one.
    if password.as_deref() == Some("") {
        password = None;
    }

    let encrypted_password = password
        .as_deref()
        .map(|p| cipher.seal_str(p, PASSWORD_AAD))
        .transpose()?;
    let strength = password.as_deref().map_or(0, |p| analyze_password(p).score);
    let encrypted_notes = params
        .notes
        .as_deref()
        .map(|n| cipher.seal_str(n, NOTES_AAD))
        .transpose()?;

    if let Some(mut p) = password {
        p.zeroize();
    }

    let id = generate_uuid();
    let now = now_iso8601();
    conn.execute(
        "INSERT INTO credentials (id, owner_id, name, username, url, \
         encrypted_password, encrypted_notes, password_strength, \
         password_changed_at, auto_generated, category_id, folder_id, \
         created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            id,
            owner_id,
            params.name,
            params.username,
            params.url,
            encrypted_password,
            encrypted_notes,
            strength,
            now,
            i32::from(generated.is_some()),
            params.category_id,
            params.folder_id,
            now,
            now,
        ],
    )
    .map_err(|e| VaultError::Database(format!("failed to insert credential: {e}")))?;

    Ok(CreatedCredential {
        credential: fetch_credential(conn, &id)?,
        generated_password: generated,
    })
}

/// Update a credential.
///
/// Runs the whole read-compare-history-write sequence inside one immediate
/// transaction, so two concurrent password changes cannot interleave. When
/// the password field is present and the new plaintext differs from the
/// current one, the old plaintext's hash is pushed to history, the blob is
/// re-sealed, strength is recomputed, and `password_changed_at` is
/// refreshed. `Some(None)` clears the password.
///
/// # Errors
///
/// - [`VaultError::NotFound`] if the credential is absent.
/// - [`VaultError::PermissionDenied`] unless the requester is the owner or
///   holds an active non-expired grant of at least `write`.
/// - [`VaultError::Crypto`] if re-sealing fails.
pub fn update_credential(
    conn: &mut Connection,
    cipher: &SecretCipher,
    id: &str,
    requester_id: &str,
    updates: &UpdateCredentialParams,
) -> Result<Credential, VaultError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let existing = fetch_credential(&tx, id)?;
    check_access(&tx, &existing, requester_id, Permission::Write)?;

    let now = now_iso8601();
    let name = updates.name.as_deref().unwrap_or(&existing.name);
    let username = updates.username.as_deref().unwrap_or(&existing.username);
    let url = updates.url.as_deref().unwrap_or(&existing.url);
    let category_id = updates
        .category_id
        .as_ref()
        .map_or(&existing.category_id, |v| v);
    let folder_id = updates
        .folder_id
        .as_ref()
        .map_or(&existing.folder_id, |v| v);

    tx.execute(
        "UPDATE credentials SET name = ?1, username = ?2, url = ?3, \
         category_id = ?4, folder_id = ?5, updated_at = ?6 WHERE id = ?7",
        params![name, username, url, category_id, folder_id, now, id],
    )
    .map_err(|e| VaultError::Database(format!("failed to update credential: {e}")))?;

    if let Some(new_password) = &updates.password {
        let mut old = decrypt_stored_password(&tx, cipher, id)?.unwrap_or_default();
        let new_plaintext = new_password.as_deref().unwrap_or("");

        if new_plaintext != old {
            if !old.is_empty() {
                push_history(&tx, id, &old)?;
            }

            let (blob, strength) = if new_plaintext.is_empty() {
                (None, 0)
            } else {
                (
                    Some(cipher.seal_str(new_plaintext, PASSWORD_AAD)?),
                    analyze_password(new_plaintext).score,
                )
            };
            tx.execute(
                "UPDATE credentials SET encrypted_password = ?1, \
                 password_strength = ?2, password_changed_at = ?3, \
                 auto_generated = 0 WHERE id = ?4",
                params![blob, strength, now, id],
            )
            .map_err(|e| VaultError::Database(format!("failed to update password: {e}")))?;
        }
        old.zeroize();
    }

    if let Some(notes) = &updates.notes {
        let blob = cipher.seal_str(notes, NOTES_AAD)?;
        tx.execute(
            "UPDATE credentials SET encrypted_notes = ?1 WHERE id = ?2",
            params![blob, id],
        )
        .map_err(|e| VaultError::Database(format!("failed to update notes: {e}")))?;
    }

    let updated = fetch_credential(&tx, id)?;
    tx.commit()?;
    Ok(updated)
}

/// Reveal a credential's plaintext password.
///
/// # Errors
///
/// - [`VaultError::PermissionDenied`] unless the requester is the owner or
///   holds at least a `read` grant.
/// - [`VaultError::NotFound`] when no password is set — which includes an
///   undecryptable blob (logged as a warning; the caller sees the same
///   "no password set" outcome).
pub fn reveal_password(
    conn: &Connection,
    cipher: &SecretCipher,
    id: &str,
    requester_id: &str,
) -> Result<String, VaultError> {
    let credential = fetch_credential(conn, id)?;
    check_access(conn, &credential, requester_id, Permission::Read)?;

    match decrypt_stored_password(conn, cipher, id)? {
        Some(password) if !password.is_empty() => Ok(password),
        _ => Err(VaultError::NotFound(format!(
            "no password set on credential {id}"
        ))),
    }
}

/// Decrypt a credential's notes. Never-set or cleared notes come back as
/// an empty string; so does an undecryptable blob (logged).
///
/// # Errors
///
/// - [`VaultError::NotFound`] if the credential is absent.
/// - [`VaultError::PermissionDenied`] unless owner or `read` grant.
pub fn reveal_notes(
    conn: &Connection,
    cipher: &SecretCipher,
    id: &str,
    requester_id: &str,
) -> Result<String, VaultError> {
    let credential = fetch_credential(conn, id)?;
    check_access(conn, &credential, requester_id, Permission::Read)?;

    let blob: Option<Vec<u8>> = conn.query_row(
        "SELECT encrypted_notes FROM credentials WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    let Some(blob) = blob else {
        return Ok(String::new());
    };
    match cipher.open_str(&blob, NOTES_AAD) {
        Ok(notes) => Ok(notes),
        Err(e) => {
            tracing::warn!(credential_id = %id, error = %e, "undecryptable notes blob");
            Ok(String::new())
        }
    }
}

/// Record that a credential was just used. Idempotent: only the
/// `last_used_at` timestamp moves.
///
/// # Errors
///
/// - [`VaultError::NotFound`] if the credential is absent.
/// - [`VaultError::PermissionDenied`] unless owner or `read` grant.
pub fn mark_used(conn: &Connection, id: &str, requester_id: &str) -> Result<(), VaultError> {
    let credential = fetch_credential(conn, id)?;
    check_access(conn, &credential, requester_id, Permission::Read)?;

    conn.execute(
        "UPDATE credentials SET last_used_at = ?1 WHERE id = ?2",
        params![now_iso8601(), id],
    )
    .map_err(|e| VaultError::Database(format!("failed to mark credential used: {e}")))?;
    Ok(())
}

/// Flip the favorite flag; returns the new state. Owner only.
///
/// # Errors
///
/// - [`VaultError::NotFound`] if the credential is absent.
/// - [`VaultError::PermissionDenied`] unless the requester is the owner.
pub fn toggle_favorite(
    conn: &Connection,
    id: &str,
    requester_id: &str,
) -> Result<bool, VaultError> {
    let credential = fetch_credential(conn, id)?;
    if credential.owner_id != requester_id {
        return Err(VaultError::PermissionDenied(
            "only the owner can change favorites".into(),
        ));
    }

    conn.execute(
        "UPDATE credentials SET is_favorite = NOT is_favorite, updated_at = ?1 \
         WHERE id = ?2",
        params![now_iso8601(), id],
    )
    .map_err(|e| VaultError::Database(format!("failed to toggle favorite: {e}")))?;
    Ok(!credential.is_favorite)
}

/// Delete a credential. History rows and sharing grants go with it via
/// foreign-key cascade. Owner only.
///
/// # Errors
///
/// - [`VaultError::NotFound`] if the credential is absent.
/// - [`VaultError::PermissionDenied`] unless the requester is the owner.
pub fn delete_credential(
    conn: &Connection,
    id: &str,
    requester_id: &str,
) -> Result<(), VaultError> {
    let credential = fetch_credential(conn, id)?;
    if credential.owner_id != requester_id {
        return Err(VaultError::PermissionDenied(
            "only the owner can delete a credential".into(),
        ));
    }

    conn.execute("DELETE FROM credentials WHERE id = ?1", params![id])
        .map_err(|e| VaultError::Database(format!("failed to delete credential: {e}")))?;
    Ok(())
}

/// Metadata view of one credential; owner or any active non-expired grant.
///
/// # Errors
///
/// - [`VaultError::NotFound`] if the credential is absent.
/// - [`VaultError::PermissionDenied`] without owner or `read` access.
pub fn get_credential(
    conn: &Connection,
    id: &str,
    requester_id: &str,
) -> Result<Credential, VaultError> {
    let credential = fetch_credential(conn, id)?;
    check_access(conn, &credential, requester_id, Permission::Read)?;
    Ok(credential)
}

/// List an owner's credentials, newest first. Metadata only, never blobs.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the query fails.
pub fn list_credentials(conn: &Connection, owner_id: &str) -> Result<Vec<Credential>, VaultError> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE owner_id = ?1 \
             ORDER BY created_at DESC, rowid DESC"
        ))
        .map_err(|e| VaultError::Database(format!("failed to prepare list query: {e}")))?;

    let rows = stmt
        .query_map(params![owner_id], credential_from_row)
        .map_err(|e| VaultError::Database(format!("failed to list credentials: {e}")))?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row.map_err(|e| VaultError::Database(format!("row read error: {e}")))?);
    }
    Ok(items)
}

/// List a credential's password history, newest first. Owner only.
///
/// # Errors
///
/// - [`VaultError::NotFound`] if the credential is absent.
/// - [`VaultError::PermissionDenied`] unless the requester is the owner.
pub fn list_history(
    conn: &Connection,
    id: &str,
    requester_id: &str,
) -> Result<Vec<HistoryEntry>, VaultError> {
    let credential = fetch_credential(conn, id)?;
    if credential.owner_id != requester_id {
        return Err(VaultError::PermissionDenied(
            "only the owner can view password history".into(),
        ));
    }

    let mut stmt = conn
        .prepare(
            "SELECT id, password_hash, created_at FROM password_history \
             WHERE credential_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )
        .map_err(|e| VaultError::Database(format!("failed to prepare history query: {e}")))?;

    let rows = stmt
        .query_map(params![id], |row| {
            Ok(HistoryEntry {
                id: row.get(0)?,
                password_hash: row.get(1)?,
                created_at: row.get(2)?,
            })
        })
        .map_err(|e| VaultError::Database(format!("failed to list history: {e}")))?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row.map_err(|e| VaultError::Database(format!("row read error: {e}")))?);
    }
    Ok(entries)
}

/// Export an owner's vault: metadata plus decrypted notes, never passwords
/// (the export shape has no password field). Undecryptable notes export as
/// empty strings and are logged.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the query fails.
pub fn export_vault_data(
    conn: &Connection,
    cipher: &SecretCipher,
    owner_id: &str,
) -> Result<VaultExport, VaultError> {
    let mut stmt = conn
        .prepare(
            "SELECT c.id, c.name, c.username, c.url, cat.name, \
             c.encrypted_notes, c.created_at, c.last_used_at \
             FROM credentials c \
             LEFT JOIN categories cat ON cat.id = c.category_id \
             WHERE c.owner_id = ?1 ORDER BY c.created_at DESC, c.rowid DESC",
        )
        .map_err(|e| VaultError::Database(format!("failed to prepare export query: {e}")))?;

    let rows = stmt
        .query_map(params![owner_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<Vec<u8>>>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, Option<String>>(7)?,
            ))
        })
        .map_err(|e| VaultError::Database(format!("failed to run export query: {e}")))?;

    let mut credentials = Vec::new();
    for row in rows {
        let (id, name, username, url, category, notes_blob, created_at, last_used_at) =
            row.map_err(|e| VaultError::Database(format!("row read error: {e}")))?;

        let notes = match notes_blob {
            Some(blob) => cipher.open_str(&blob, NOTES_AAD).unwrap_or_else(|e| {
                tracing::warn!(credential_id = %id, error = %e, "undecryptable notes in export");
                String::new()
            }),
            None => String::new(),
        };

        credentials.push(ExportedCredential {
            name,
            username,
            url,
            category,
            notes,
            created_at,
            last_used_at,
        });
    }

    tracing::info!(owner_id = %owner_id, count = credentials.len(), "vault data exported");
    Ok(VaultExport {
        export_date: now_iso8601(),
        total_credentials: credentials.len(),
        credentials,
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
