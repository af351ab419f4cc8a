//! Integration tests for the file-backed session store.

use std::sync::Arc;

use broll_app::store::FileSessionStore;
use broll_app::{RootController, Screen};
use broll_auth::{SessionStore, TOKEN_KEY, USER_KEY};

#[test]
fn session_store_tests_survives_reopen_and_bootstraps_editor() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("nested").join("session.json");

    let store = FileSessionStore::new(&path);
    assert_eq!(store.get(TOKEN_KEY).expect("missing file reads as empty"), None);
    store.set(TOKEN_KEY, "T").expect("set should create the file");
    store
        .set(USER_KEY, r#"{"email":"a@b.com"}"#)
        .expect("set should update the file");

    let reopened: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(&path));
    let mut root = RootController::bootstrap(Arc::clone(&reopened));
    assert_eq!(root.screen(), Screen::Editor);
    assert_eq!(root.user_label(), "a@b.com");

    root.logout().expect("logout should clear the file");
    assert_eq!(reopened.get(TOKEN_KEY).expect("get"), None);
    assert_eq!(reopened.get(USER_KEY).expect("get"), None);
    assert_eq!(
        RootController::bootstrap(reopened).screen(),
        Screen::Login
    );
}

#[test]
fn session_store_tests_corrupt_file_counts_as_signed_out() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("session.json");
    std::fs::write(&path, "not json").expect("fixture should be written");

    let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(&path));
    assert!(store.get(TOKEN_KEY).is_err());
    assert_eq!(RootController::bootstrap(store).screen(), Screen::Login);
}

#[test]
fn session_store_tests_remove_without_file_is_not_an_error() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let store = FileSessionStore::new(dir.path().join("absent.json"));

    store.remove(TOKEN_KEY).expect("remove should be a no-op");
    assert!(!store.path().exists());
}

#[test]
fn session_store_tests_writes_repair_a_corrupt_file() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("session.json");
    std::fs::write(&path, "not json").expect("fixture should be written");

    let store = FileSessionStore::new(&path);
    store.set(TOKEN_KEY, "T").expect("set should rewrite the file");
    assert_eq!(store.get(TOKEN_KEY).expect("file should parse again"), Some("T".to_string()));

    std::fs::write(&path, "not json").expect("fixture should be written");
    store.remove(TOKEN_KEY).expect("remove should rewrite the file");
    assert_eq!(store.get(TOKEN_KEY).expect("file should parse again"), None);
}
