//! `trousseau-vault` — Vault business logic for Trousseau.
//!
//! Multi-user credential storage over `SQLite`: encrypted-at-write
//! credentials with password history, a generic sharing engine with
//! time-limited permissions, folder/category organization, and dashboard
//! statistics. The cryptographic primitives live in `trousseau-crypto-core`;
//! this crate decides what gets sealed, who may read it, and when.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod config;
pub mod db;
pub mod error;

pub mod credentials;

pub mod sharing;

pub mod folders;

pub mod categories;

pub mod dashboard;

pub use categories::{
    create_category, delete_category, list_categories, Category, CategoryIcon, CategoryListItem,
    CreateCategoryParams,
};
pub use config::{generate_master_key, VaultConfig};
pub use credentials::{
    create_credential, delete_credential, export_vault_data, get_credential, list_credentials,
    list_history, mark_used, reveal_notes, reveal_password, toggle_favorite, update_credential,
    CreateCredentialParams, CreatedCredential, Credential, ExportedCredential, HistoryEntry,
    UpdateCredentialParams, VaultExport, HISTORY_LIMIT,
};
pub use dashboard::{dashboard_stats, security_score, CategorySlice, DashboardStats};
pub use db::VaultDb;
pub use error::VaultError;
pub use folders::{
    create_folder, delete_folder, list_folders, rename_folder, CreateFolderParams, Folder,
    FolderListItem, DEFAULT_FOLDER_COLOR, FOLDER_COLORS,
};
pub use sharing::{
    authorize, cleanup_expired, extend_expiration, list_grants, list_shared_with, revoke, share,
    sharing_statistics, toggle_active, CleanupReport, CredentialResource, FolderResource,
    Permission, ShareGrant, ShareParams, ShareableResource, SharingStatistics,
};
