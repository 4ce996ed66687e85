#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! End-to-end sharing scenarios: grants gating access to plaintext,
//! live expiry, and the periodic sweep.

use rusqlite::params;
use trousseau_crypto_core::{SecretBytes, SecretCipher, KEY_LEN};
use trousseau_vault::{
    authorize, cleanup_expired, create_credential, create_folder, list_shared_with,
    reveal_password, revoke, share, CreateCredentialParams, CreateFolderParams,
    CredentialResource, FolderResource, Permission, ShareParams, VaultDb, VaultError,
};

const ALICE: &str = "user-alice";
const BOB: &str = "user-bob";

fn open_vault() -> (tempfile::TempDir, VaultDb, SecretCipher) {
    let dir = tempfile::tempdir().unwrap();
    let db = VaultDb::open(&dir.path().join("vault.db")).unwrap();
    let cipher = SecretCipher::new(SecretBytes::new([0x33; KEY_LEN]));
    (dir, db, cipher)
}

fn alice_credential(db: &VaultDb, cipher: &SecretCipher, password: &str) -> String {
    create_credential(
        db.connection(),
        cipher,
        ALICE,
        &CreateCredentialParams {
            name: "Shared service".to_string(),
            password: Some(password.to_string()),
            ..CreateCredentialParams::default()
        },
    )
    .unwrap()
    .credential
    .id
}

fn grant(permission: Permission, expires_in_days: Option<u32>) -> ShareParams {
    ShareParams {
        grantee_id: BOB.to_string(),
        permission,
        expires_in_days,
    }
}

#[test]
fn sharing_gates_reveal_for_non_owners() {
    let (_dir, mut db, cipher) = open_vault();
    let id = alice_credential(&db, &cipher, "the-plaintext");

    // Before sharing, Bob sees nothing.
    assert!(matches!(
        reveal_password(db.connection(), &cipher, &id, BOB).unwrap_err(),
        VaultError::PermissionDenied(_)
    ));

    share::<CredentialResource>(db.connection_mut(), &id, ALICE, &grant(Permission::Read, None))
        .unwrap();
    assert_eq!(
        reveal_password(db.connection(), &cipher, &id, BOB).unwrap(),
        "the-plaintext"
    );

    // Revoking closes the door again.
    revoke::<CredentialResource>(db.connection_mut(), &id, ALICE, BOB).unwrap();
    assert!(matches!(
        reveal_password(db.connection(), &cipher, &id, BOB).unwrap_err(),
        VaultError::PermissionDenied(_)
    ));
}

#[test]
fn duplicate_grant_is_rejected_end_to_end() {
    let (_dir, mut db, cipher) = open_vault();
    let id = alice_credential(&db, &cipher, "pw");

    share::<CredentialResource>(db.connection_mut(), &id, ALICE, &grant(Permission::Read, None))
        .unwrap();
    let err = share::<CredentialResource>(
        db.connection_mut(),
        &id,
        ALICE,
        &grant(Permission::Write, Some(7)),
    )
    .unwrap_err();
    assert!(matches!(err, VaultError::DuplicateGrant(_)));
}

#[test]
fn expired_grant_denies_access_before_any_sweep() {
    let (_dir, mut db, cipher) = open_vault();
    let id = alice_credential(&db, &cipher, "pw");

    let created = share::<CredentialResource>(
        db.connection_mut(),
        &id,
        ALICE,
        &grant(Permission::Read, Some(1)),
    )
    .unwrap();

    // Force the expiry into the past; is_active remains 1.
    db.connection()
        .execute(
            "UPDATE shared_credentials SET expires_at = '2000-01-01T00:00:00Z' WHERE id = ?1",
            params![created.id],
        )
        .unwrap();

    assert!(!authorize::<CredentialResource>(db.connection(), &id, BOB, Permission::Read).unwrap());
    assert!(matches!(
        reveal_password(db.connection(), &cipher, &id, BOB).unwrap_err(),
        VaultError::PermissionDenied(_)
    ));
}

#[test]
fn sweep_deactivates_expired_grants_once() {
    let (_dir, mut db, cipher) = open_vault();
    let cred_id = alice_credential(&db, &cipher, "pw");
    let folder_id = create_folder(
        db.connection(),
        ALICE,
        &CreateFolderParams {
            name: "Shared folder".to_string(),
            ..CreateFolderParams::default()
        },
    )
    .unwrap()
    .id;

    let cred_grant = share::<CredentialResource>(
        db.connection_mut(),
        &cred_id,
        ALICE,
        &grant(Permission::Read, Some(1)),
    )
    .unwrap();
    let folder_grant = share::<FolderResource>(
        db.connection_mut(),
        &folder_id,
        ALICE,
        &grant(Permission::Read, Some(1)),
    )
    .unwrap();

    for (table, id) in [
        ("shared_credentials", &cred_grant.id),
        ("shared_folders", &folder_grant.id),
    ] {
        db.connection()
            .execute(
                &format!("UPDATE {table} SET expires_at = '2000-01-01T00:00:00Z' WHERE id = ?1"),
                params![id],
            )
            .unwrap();
    }

    let first = cleanup_expired(db.connection()).unwrap();
    assert_eq!(first.expired_credentials, 1);
    assert_eq!(first.expired_folders, 1);

    let second = cleanup_expired(db.connection()).unwrap();
    assert_eq!(second.expired_credentials, 0);
    assert_eq!(second.expired_folders, 0);
}

#[test]
fn shared_with_me_lists_live_grants_per_resource_type() {
    let (_dir, mut db, cipher) = open_vault();
    let cred_id = alice_credential(&db, &cipher, "pw");
    let folder_id = create_folder(
        db.connection(),
        ALICE,
        &CreateFolderParams {
            name: "Work".to_string(),
            ..CreateFolderParams::default()
        },
    )
    .unwrap()
    .id;

    share::<CredentialResource>(
        db.connection_mut(),
        &cred_id,
        ALICE,
        &grant(Permission::Read, None),
    )
    .unwrap();
    share::<FolderResource>(
        db.connection_mut(),
        &folder_id,
        ALICE,
        &grant(Permission::Write, Some(30)),
    )
    .unwrap();

    let creds = list_shared_with::<CredentialResource>(db.connection(), BOB).unwrap();
    assert_eq!(creds.len(), 1);
    assert_eq!(creds[0].resource_id, cred_id);

    let folders = list_shared_with::<FolderResource>(db.connection(), BOB).unwrap();
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0].permission, Permission::Write);

    // Alice shared them; nothing is shared *with* her.
    assert!(list_shared_with::<CredentialResource>(db.connection(), ALICE)
        .unwrap()
        .is_empty());
}

#[test]
fn folder_deletion_cascades_grants() {
    let (_dir, mut db, _cipher) = open_vault();
    let folder_id = create_folder(
        db.connection(),
        ALICE,
        &CreateFolderParams {
            name: "Doomed".to_string(),
            ..CreateFolderParams::default()
        },
    )
    .unwrap()
    .id;
    share::<FolderResource>(
        db.connection_mut(),
        &folder_id,
        ALICE,
        &grant(Permission::Read, None),
    )
    .unwrap();

    trousseau_vault::delete_folder(db.connection(), &folder_id, ALICE).unwrap();

    let remaining: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM shared_folders", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
}
