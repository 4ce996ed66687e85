//! Folder management for credential organization.
//!
//! Folders are owner-scoped, optionally nested, and carry one of a fixed
//! color palette. Deleting a folder cascades to its child folders and the
//! credentials inside it. Folders are shareable resources; their
//! `is_shared` flag is maintained by the sharing engine.

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::db::{generate_uuid, now_iso8601};
use crate::error::VaultError;

/// The fixed folder color palette.
pub const FOLDER_COLORS: [&str; 8] = [
    "#FF6B6B", // red
    "#4ECDC4", // turquoise
    "#45B7D1", // blue
    "#96CEB4", // green
    "#FFEAA7", // yellow
    "#DDA0DD", // violet
    "#FFB347", // orange
    "#87CEEB", // sky blue
];

/// Color used when none is requested.
pub const DEFAULT_FOLDER_COLOR: &str = "#45B7D1";

/// Maximum folder name length.
pub const MAX_FOLDER_NAME_LEN: usize = 100;

/// A folder row.
#[derive(Debug, Clone, Serialize)]
pub struct Folder {
    /// Unique identifier (UUID v4).
    pub id: String,
    /// Owning user id.
    pub owner_id: String,
    /// Display name, unique per (owner, parent).
    pub name: String,
    /// Optional parent folder.
    pub parent_id: Option<String>,
    /// Palette color.
    pub color: String,
    /// Denormalized sharing flag.
    pub is_shared: bool,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 last-update timestamp.
    pub updated_at: String,
}

/// A folder with its credential count for list display.
#[derive(Debug, Clone, Serialize)]
pub struct FolderListItem {
    /// The folder.
    #[serde(flatten)]
    pub folder: Folder,
    /// Credentials directly inside this folder.
    pub credential_count: u32,
}

/// Parameters for creating a folder.
#[derive(Debug, Default)]
pub struct CreateFolderParams {
    /// Display name.
    pub name: String,
    /// Optional parent folder id; must belong to the same owner.
    pub parent_id: Option<String>,
    /// Palette color; defaults to [`DEFAULT_FOLDER_COLOR`].
    pub color: Option<String>,
}

fn validate_name(name: &str) -> Result<(), VaultError> {
    if name.trim().is_empty() {
        return Err(VaultError::Validation("folder name is required".into()));
    }
    if name.chars().count() > MAX_FOLDER_NAME_LEN {
        return Err(VaultError::Validation(format!(
            "folder name exceeds {MAX_FOLDER_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_color(color: &str) -> Result<(), VaultError> {
    if FOLDER_COLORS.contains(&color) {
        Ok(())
    } else {
        Err(VaultError::Validation(format!(
            "unknown folder color: {color}"
        )))
    }
}

fn folder_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Folder> {
    Ok(Folder {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        parent_id: row.get(3)?,
        color: row.get(4)?,
        is_shared: row.get::<_, i32>(5)? != 0,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn fetch_folder(conn: &Connection, id: &str) -> Result<Folder, VaultError> {
    conn.query_row(
        "SELECT id, owner_id, name, parent_id, color, is_shared, created_at, updated_at \
         FROM folders WHERE id = ?1",
        params![id],
        folder_from_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => VaultError::NotFound(format!("folder {id}")),
        other => VaultError::Database(format!("failed to query folder: {other}")),
    })
}

/// Create a folder.
///
/// # Errors
///
/// - [`VaultError::Validation`] on a bad name, unknown color, a parent
///   owned by someone else, or a name already taken under the same parent.
/// - [`VaultError::NotFound`] if the parent folder does not exist.
pub fn create_folder(
    conn: &Connection,
    owner_id: &str,
    params: &CreateFolderParams,
) -> Result<Folder, VaultError> {
    validate_name(&params.name)?;
    let color = params.color.as_deref().unwrap_or(DEFAULT_FOLDER_COLOR);
    validate_color(color)?;

    if let Some(parent_id) = &params.parent_id {
        let parent = fetch_folder(conn, parent_id)?;
        if parent.owner_id != owner_id {
            return Err(VaultError::Validation(
                "parent folder belongs to another user".into(),
            ));
        }
    }

    let id = generate_uuid();
    let now = now_iso8601();
    conn.execute(
        "INSERT INTO folders (id, owner_id, name, parent_id, color, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![id, owner_id, params.name, params.parent_id, color, now, now],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            VaultError::Validation(format!(
                "a folder named '{}' already exists here",
                params.name
            ))
        }
        other => VaultError::Database(format!("failed to create folder: {other}")),
    })?;

    fetch_folder(conn, &id)
}

/// List an owner's folders with credential counts, by name.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the query fails.
pub fn list_folders(conn: &Connection, owner_id: &str) -> Result<Vec<FolderListItem>, VaultError> {
    let mut stmt = conn
        .prepare(
            "SELECT f.id, f.owner_id, f.name, f.parent_id, f.color, f.is_shared, \
             f.created_at, f.updated_at, COUNT(c.id) \
             FROM folders f \
             LEFT JOIN credentials c ON c.folder_id = f.id \
             WHERE f.owner_id = ?1 \
             GROUP BY f.id ORDER BY f.name ASC",
        )
        .map_err(|e| VaultError::Database(format!("failed to prepare folder query: {e}")))?;

    let rows = stmt
        .query_map(params![owner_id], |row| {
            Ok(FolderListItem {
                folder: folder_from_row(row)?,
                credential_count: row.get(8)?,
            })
        })
        .map_err(|e| VaultError::Database(format!("failed to query folders: {e}")))?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row.map_err(|e| VaultError::Database(format!("folder row error: {e}")))?);
    }
    Ok(items)
}

/// Rename a folder. Owner only.
///
/// # Errors
///
/// - [`VaultError::NotFound`] if the folder is absent.
/// - [`VaultError::PermissionDenied`] unless the requester is the owner.
/// - [`VaultError::Validation`] on a bad or colliding name.
pub fn rename_folder(
    conn: &Connection,
    folder_id: &str,
    requester_id: &str,
    new_name: &str,
) -> Result<Folder, VaultError> {
    validate_name(new_name)?;
    let folder = fetch_folder(conn, folder_id)?;
    if folder.owner_id != requester_id {
        return Err(VaultError::PermissionDenied(
            "only the owner can rename a folder".into(),
        ));
    }

    conn.execute(
        "UPDATE folders SET name = ?1, updated_at = ?2 WHERE id = ?3",
        params![new_name, now_iso8601(), folder_id],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            VaultError::Validation(format!("a folder named '{new_name}' already exists here"))
        }
        other => VaultError::Database(format!("failed to rename folder: {other}")),
    })?;

    fetch_folder(conn, folder_id)
}

/// Delete a folder. Child folders and the credentials inside cascade away
/// via foreign keys, as do any grants on the folder. Owner only.
///
/// # Errors
///
/// - [`VaultError::NotFound`] if the folder is absent.
/// - [`VaultError::PermissionDenied`] unless the requester is the owner.
pub fn delete_folder(
    conn: &Connection,
    folder_id: &str,
    requester_id: &str,
) -> Result<(), VaultError> {
    let folder = fetch_folder(conn, folder_id)?;
    if folder.owner_id != requester_id {
        return Err(VaultError::PermissionDenied(
            "only the owner can delete a folder".into(),
        ));
    }

    conn.execute("DELETE FROM folders WHERE id = ?1", params![folder_id])
        .map_err(|e| VaultError::Database(format!("failed to delete folder: {e}")))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::VaultDb;

    const OWNER: &str = "user-owner";

    fn named(name: &str) -> CreateFolderParams {
        CreateFolderParams {
            name: name.to_string(),
            ..CreateFolderParams::default()
        }
    }

    #[test]
    fn create_uses_default_color() {
        let db = VaultDb::open_in_memory().unwrap();
        let folder = create_folder(db.connection(), OWNER, &named("Work")).unwrap();
        assert_eq!(folder.color, DEFAULT_FOLDER_COLOR);
        assert!(folder.parent_id.is_none());
        assert!(!folder.is_shared);
    }

    #[test]
    fn create_rejects_bad_input() {
        let db = VaultDb::open_in_memory().unwrap();
        assert!(matches!(
            create_folder(db.connection(), OWNER, &named("")).unwrap_err(),
            VaultError::Validation(_)
        ));
        assert!(matches!(
            create_folder(db.connection(), OWNER, &named(&"x".repeat(101))).unwrap_err(),
            VaultError::Validation(_)
        ));
        assert!(matches!(
            create_folder(
                db.connection(),
                OWNER,
                &CreateFolderParams {
                    name: "Work".to_string(),
                    color: Some("#000000".to_string()),
                    ..CreateFolderParams::default()
                }
            )
            .unwrap_err(),
            VaultError::Validation(_)
        ));
    }

    #[test]
    fn duplicate_name_under_same_parent_is_rejected() {
        let db = VaultDb::open_in_memory().unwrap();
        create_folder(db.connection(), OWNER, &named("Work")).unwrap();
        let err = create_folder(db.connection(), OWNER, &named("Work")).unwrap_err();
        assert!(matches!(err, VaultError::Validation(_)));

        // Same name under a different parent is fine.
        let parent = create_folder(db.connection(), OWNER, &named("Archive")).unwrap();
        create_folder(
            db.connection(),
            OWNER,
            &CreateFolderParams {
                name: "Work".to_string(),
                parent_id: Some(parent.id),
                ..CreateFolderParams::default()
            },
        )
        .unwrap();

        // Root-level uniqueness is per owner.
        create_folder(db.connection(), "user-other", &named("Work")).unwrap();
    }

    #[test]
    fn rename_into_existing_root_name_is_rejected() {
        let db = VaultDb::open_in_memory().unwrap();
        create_folder(db.connection(), OWNER, &named("Work")).unwrap();
        let other = create_folder(db.connection(), OWNER, &named("Personal")).unwrap();

        let err = rename_folder(db.connection(), &other.id, OWNER, "Work").unwrap_err();
        assert!(matches!(err, VaultError::Validation(_)));
    }

    #[test]
    fn parent_must_belong_to_same_owner() {
        let db = VaultDb::open_in_memory().unwrap();
        let theirs = create_folder(db.connection(), "user-other", &named("Theirs")).unwrap();
        let err = create_folder(
            db.connection(),
            OWNER,
            &CreateFolderParams {
                name: "Nested".to_string(),
                parent_id: Some(theirs.id),
                ..CreateFolderParams::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, VaultError::Validation(_)));
    }

    #[test]
    fn list_includes_credential_counts() {
        let db = VaultDb::open_in_memory().unwrap();
        let folder = create_folder(db.connection(), OWNER, &named("Work")).unwrap();
        create_folder(db.connection(), OWNER, &named("Empty")).unwrap();
        create_folder(db.connection(), "user-other", &named("Invisible")).unwrap();

        db.connection()
            .execute(
                "INSERT INTO credentials (id, owner_id, name, folder_id, created_at, updated_at) \
                 VALUES ('c1', ?1, 'A', ?2, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
                params![OWNER, folder.id],
            )
            .unwrap();

        let items = list_folders(db.connection(), OWNER).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].folder.name, "Empty");
        assert_eq!(items[0].credential_count, 0);
        assert_eq!(items[1].credential_count, 1);
    }

    #[test]
    fn rename_checks_owner() {
        let db = VaultDb::open_in_memory().unwrap();
        let folder = create_folder(db.connection(), OWNER, &named("Work")).unwrap();

        let err = rename_folder(db.connection(), &folder.id, "user-other", "Stolen").unwrap_err();
        assert!(matches!(err, VaultError::PermissionDenied(_)));

        let renamed = rename_folder(db.connection(), &folder.id, OWNER, "Projects").unwrap();
        assert_eq!(renamed.name, "Projects");
    }

    #[test]
    fn delete_cascades_children_and_credentials() {
        let db = VaultDb::open_in_memory().unwrap();
        let parent = create_folder(db.connection(), OWNER, &named("Parent")).unwrap();
        create_folder(
            db.connection(),
            OWNER,
            &CreateFolderParams {
                name: "Child".to_string(),
                parent_id: Some(parent.id.clone()),
                ..CreateFolderParams::default()
            },
        )
        .unwrap();
        db.connection()
            .execute(
                "INSERT INTO credentials (id, owner_id, name, folder_id, created_at, updated_at) \
                 VALUES ('c1', ?1, 'A', ?2, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
                params![OWNER, parent.id],
            )
            .unwrap();

        delete_folder(db.connection(), &parent.id, OWNER).unwrap();

        let folders: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM folders", [], |row| row.get(0))
            .unwrap();
        let credentials: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM credentials", [], |row| row.get(0))
            .unwrap();
        assert_eq!(folders, 0);
        assert_eq!(credentials, 0);
    }

    #[test]
    fn delete_missing_folder_is_not_found() {
        let db = VaultDb::open_in_memory().unwrap();
        let err = delete_folder(db.connection(), "missing", OWNER).unwrap_err();
        assert!(matches!(err, VaultError::NotFound(_)));
    }
}
