//! Category management.
//!
//! Categories are global (not owner-scoped): a fixed icon vocabulary, a
//! display color, and a system flag protecting the built-in set from
//! deletion. Credentials reference categories weakly; deleting a category
//! detaches its credentials instead of cascading.

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::db::{generate_uuid, now_iso8601};
use crate::error::VaultError;

/// Maximum category name length.
pub const MAX_CATEGORY_NAME_LEN: usize = 50;

/// Color used when none is requested.
pub const DEFAULT_CATEGORY_COLOR: &str = "#6C757D";

/// Category icon vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryIcon {
    /// Websites.
    Web,
    /// Email accounts.
    Email,
    /// Social networks.
    Social,
    /// Banking.
    Bank,
    /// Work accounts.
    Work,
    /// Personal accounts.
    Personal,
    /// Shopping.
    Shopping,
    /// Entertainment.
    Entertainment,
    /// Utilities.
    Utilities,
    /// Anything else.
    Other,
}

impl CategoryIcon {
    /// Convert to the `TEXT` value stored in the categories table.
    #[must_use]
    pub const fn as_db_str(self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Email => "email",
            Self::Social => "social",
            Self::Bank => "bank",
            Self::Work => "work",
            Self::Personal => "personal",
            Self::Shopping => "shopping",
            Self::Entertainment => "entertainment",
            Self::Utilities => "utilities",
            Self::Other => "other",
        }
    }

    /// Parse from the database `TEXT` value.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Database`] for unknown icon strings.
    pub fn from_db_str(s: &str) -> Result<Self, VaultError> {
        match s {
            "web" => Ok(Self::Web),
            "email" => Ok(Self::Email),
            "social" => Ok(Self::Social),
            "bank" => Ok(Self::Bank),
            "work" => Ok(Self::Work),
            "personal" => Ok(Self::Personal),
            "shopping" => Ok(Self::Shopping),
            "entertainment" => Ok(Self::Entertainment),
            "utilities" => Ok(Self::Utilities),
            "other" => Ok(Self::Other),
            other => Err(VaultError::Database(format!("unknown icon: {other}"))),
        }
    }
}

/// A category row.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    /// Unique identifier (UUID v4).
    pub id: String,
    /// Globally unique display name.
    pub name: String,
    /// Icon.
    pub icon: CategoryIcon,
    /// Display color.
    pub color: String,
    /// Built-in categories cannot be deleted.
    pub is_system: bool,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
}

/// A category with the requesting user's credential count.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryListItem {
    /// The category.
    #[serde(flatten)]
    pub category: Category,
    /// How many of the requester's credentials use it.
    pub credential_count: u32,
}

/// Parameters for creating a category.
#[derive(Debug)]
pub struct CreateCategoryParams {
    /// Globally unique display name.
    pub name: String,
    /// Icon; defaults to [`CategoryIcon::Other`].
    pub icon: Option<CategoryIcon>,
    /// Display color; defaults to [`DEFAULT_CATEGORY_COLOR`].
    pub color: Option<String>,
    /// Whether the category is part of the built-in set.
    pub is_system: bool,
}

type CategoryRow = (String, String, String, String, i32, String);

fn category_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CategoryRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn build_category(row: CategoryRow) -> Result<Category, VaultError> {
    Ok(Category {
        id: row.0,
        name: row.1,
        icon: CategoryIcon::from_db_str(&row.2)?,
        color: row.3,
        is_system: row.4 != 0,
        created_at: row.5,
    })
}

fn fetch_category(conn: &Connection, id: &str) -> Result<Category, VaultError> {
    let row = conn
        .query_row(
            "SELECT id, name, icon, color, is_system, created_at FROM categories WHERE id = ?1",
            params![id],
            category_from_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => VaultError::NotFound(format!("category {id}")),
            other => VaultError::Database(format!("failed to query category: {other}")),
        })?;
    build_category(row)
}

/// Create a category.
///
/// # Errors
///
/// Returns [`VaultError::Validation`] on an empty or over-long name, or a
/// name that is already taken.
pub fn create_category(
    conn: &Connection,
    params: &CreateCategoryParams,
) -> Result<Category, VaultError> {
    if params.name.trim().is_empty() {
        return Err(VaultError::Validation("category name is required".into()));
    }
    if params.name.chars().count() > MAX_CATEGORY_NAME_LEN {
        return Err(VaultError::Validation(format!(
            "category name exceeds {MAX_CATEGORY_NAME_LEN} characters"
        )));
    }

    let id = generate_uuid();
    let icon = params.icon.unwrap_or(CategoryIcon::Other);
    let color = params.color.as_deref().unwrap_or(DEFAULT_CATEGORY_COLOR);

    conn.execute(
        "INSERT INTO categories (id, name, icon, color, is_system, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            id,
            params.name,
            icon.as_db_str(),
            color,
            i32::from(params.is_system),
            now_iso8601(),
        ],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            VaultError::Validation(format!("category '{}' already exists", params.name))
        }
        other => VaultError::Database(format!("failed to create category: {other}")),
    })?;

    fetch_category(conn, &id)
}

/// List every category, with the requester's credential count per
/// category, by name.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the query fails.
pub fn list_categories(
    conn: &Connection,
    user_id: &str,
) -> Result<Vec<CategoryListItem>, VaultError> {
    let mut stmt = conn
        .prepare(
            "SELECT cat.id, cat.name, cat.icon, cat.color, cat.is_system, cat.created_at, \
             COUNT(c.id) \
             FROM categories cat \
             LEFT JOIN credentials c ON c.category_id = cat.id AND c.owner_id = ?1 \
             GROUP BY cat.id ORDER BY cat.name ASC",
        )
        .map_err(|e| VaultError::Database(format!("failed to prepare category query: {e}")))?;

    let rows = stmt
        .query_map(params![user_id], |row| {
            Ok((category_from_row(row)?, row.get::<_, u32>(6)?))
        })
        .map_err(|e| VaultError::Database(format!("failed to query categories: {e}")))?;

    let mut items = Vec::new();
    for row in rows {
        let (raw, count) =
            row.map_err(|e| VaultError::Database(format!("category row error: {e}")))?;
        items.push(CategoryListItem {
            category: build_category(raw)?,
            credential_count: count,
        });
    }
    Ok(items)
}

/// Delete a category. Credentials referencing it are detached (their
/// `category_id` goes NULL via the FK), never deleted.
///
/// # Errors
///
/// - [`VaultError::NotFound`] if the category is absent.
/// - [`VaultError::Validation`] for system categories.
pub fn delete_category(conn: &Connection, id: &str) -> Result<(), VaultError> {
    let category = fetch_category(conn, id)?;
    if category.is_system {
        return Err(VaultError::Validation(format!(
            "system category '{}' cannot be deleted",
            category.name
        )));
    }

    conn.execute("DELETE FROM categories WHERE id = ?1", params![id])
        .map_err(|e| VaultError::Database(format!("failed to delete category: {e}")))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
