use pretty_assertions::assert_eq;
use tempfile::tempdir;
use waste_forecast::{FileModelStore, ModelStore, StoreError};

#[test]
fn test_file_store_round_trip() {
    let dir = tempdir().unwrap();
    let store = FileModelStore::new(dir.path().join("models")).unwrap();

    assert_eq!(store.load("country-France").unwrap(), None);

    store.save("country-France", b"first").unwrap();
    store.save("country-France", b"second").unwrap();
    assert_eq!(store.load("country-France").unwrap(), Some(b"second".to_vec()));

    let path = store.path_for("country-France").unwrap();
    assert!(path.ends_with("country-France.model.json"));
    assert!(path.exists());

    store.invalidate("country-France").unwrap();
    assert!(!path.exists());
    assert_eq!(store.load("country-France").unwrap(), None);
}

#[test]
fn test_invalidating_missing_key_is_ok() {
    let dir = tempdir().unwrap();
    let store = FileModelStore::new(dir.path()).unwrap();
    store.invalidate("global").unwrap();
}

#[test]
fn test_file_store_rejects_path_keys() {
    let dir = tempdir().unwrap();
    let store = FileModelStore::new(dir.path()).unwrap();

    assert!(matches!(
        store.save("../outside", b"blob"),
        Err(StoreError::InvalidKey(_))
    ));
    assert!(matches!(store.load(""), Err(StoreError::InvalidKey(_))));
}

#[test]
fn test_store_leaves_no_temporary_files() {
    let dir = tempdir().unwrap();
    let store = FileModelStore::new(dir.path()).unwrap();
    store.save("global", b"blob").unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["global.model.json".to_string()]);
}
