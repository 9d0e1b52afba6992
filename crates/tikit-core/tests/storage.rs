use pretty_assertions::assert_eq;
use std::fs;

use tikit_core::storage::{PersistentStore, StorageError, TIMER_LENGTH_KEY};

#[test]
fn test_single_entry_file_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.txt");
    let mut store = PersistentStore::new(&path);
    store.reload().unwrap();

    store.set(TIMER_LENGTH_KEY, 21_600_000).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "timer_length=21600000");

    store.set(TIMER_LENGTH_KEY, 60_000).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "timer_length=60000");
}

#[test]
fn test_values_are_not_trimmed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.txt");
    let mut store = PersistentStore::new(&path);
    store.set("note", "  spaced  ").unwrap();

    let mut reloaded = PersistentStore::new(&path);
    reloaded.reload().unwrap();
    assert_eq!(reloaded.get("note"), Some("  spaced  "));
}

#[test]
fn test_remove_missing_key_still_rewrites() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.txt");
    let mut store = PersistentStore::new(&path);

    assert_eq!(store.remove("nothing").unwrap(), None);
    assert!(path.exists());
    assert_eq!(fs::read_to_string(&path).unwrap(), "");
}

#[test]
fn test_multiple_keys_survive_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.txt");
    let mut store = PersistentStore::new(&path);
    store.set(TIMER_LENGTH_KEY, 1000).unwrap();
    store.set("ambient", "ignore").unwrap();

    let mut reloaded = PersistentStore::new(&path);
    assert_eq!(reloaded.reload().unwrap(), 2);
    assert_eq!(reloaded.get(TIMER_LENGTH_KEY), Some("1000"));
    assert_eq!(reloaded.get("ambient"), Some("ignore"));
}

#[test]
fn test_latin1_file_is_readable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.txt");
    fs::write(&path, b"label=caf\xe9").unwrap();

    let mut store = PersistentStore::new(&path);
    store.reload().unwrap();
    assert_eq!(store.get("label"), Some("café"));

    // Rewritten as UTF-8
    store.flush().unwrap();
    assert_eq!(fs::read(&path).unwrap(), "label=café".as_bytes());
}

#[test]
fn test_reload_from_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = PersistentStore::new(dir.path());
    assert!(matches!(store.reload(), Err(StorageError::Read { .. })));
}
