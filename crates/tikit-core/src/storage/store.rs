//! Key/value store mirrored to a text file
//!
//! File format: `key=value` records. Keys are split from values at the first
//! `=`; nothing is trimmed or escaped. Records are separated by a single
//! newline with no trailing terminator, so a store holding one key is written
//! as exactly `key=value`. Keys may not contain `=` or a newline and values
//! may not contain a newline; such entries are refused.
//!
//! Files that are not valid UTF-8 are read as Latin-1 and written back as
//! UTF-8 on the next rewrite.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::StorageError;

/// Key holding the timer duration in milliseconds
pub const TIMER_LENGTH_KEY: &str = "timer_length";

/// Parse the backing file contents into a map
pub fn parse_records(content: &str) -> BTreeMap<String, String> {
    content
        .split('\n')
        .filter(|line| !line.is_empty())
        .map(|line| {
            let (key, value) = line.split_once('=').unwrap_or((line, ""));
            (key.to_string(), value.to_string())
        })
        .collect()
}

fn check_entry(key: &str, value: &str) -> Result<(), StorageError> {
    let reason = if key.contains('=') {
        "key contains '='"
    } else if key.contains('\n') {
        "key contains a newline"
    } else if value.contains('\n') {
        "value contains a newline"
    } else {
        return Ok(());
    };
    Err(StorageError::InvalidEntry {
        key: key.to_string(),
        reason,
    })
}

/// In-memory map plus the file it is mirrored to
#[derive(Debug, Clone)]
pub struct PersistentStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl PersistentStore {
    /// Empty store backed by `path`. Nothing is read until [`reload`](Self::reload).
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            entries: BTreeMap::new(),
        }
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the map with the file contents, then truncate the file.
    ///
    /// A missing file yields an empty map. Returns the number of entries loaded.
    pub fn reload(&mut self) -> Result<usize, StorageError> {
        self.entries.clear();

        match fs::read(&self.path) {
            Ok(bytes) => {
                // Fall back to Latin-1 for files edited by hand
                let content = match String::from_utf8(bytes) {
                    Ok(s) => s,
                    Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
                };
                self.entries = parse_records(&content);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(StorageError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        }

        self.write_file("")?;
        tracing::debug!(
            "Loaded {} stored value(s) from {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(self.entries.len())
    }

    /// Insert or replace a value, then rewrite the file.
    ///
    /// The map is left unchanged if the entry is refused or the write fails.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl ToString,
    ) -> Result<(), StorageError> {
        let key = key.into();
        let value = value.to_string();
        check_entry(&key, &value)?;

        let previous = self.entries.insert(key.clone(), value);
        if let Err(e) = self.flush() {
            match previous {
                Some(old) => self.entries.insert(key, old),
                None => self.entries.remove(&key),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Remove a key, then rewrite the file. Returns the old value.
    ///
    /// The key is kept if the write fails.
    pub fn remove(&mut self, key: &str) -> Result<Option<String>, StorageError> {
        let old = self.entries.remove(key);
        if let Err(e) = self.flush() {
            if let Some(value) = old {
                self.entries.insert(key.to_string(), value);
            }
            return Err(e);
        }
        Ok(old)
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Get a value parsed as `T`. Values that fail to parse count as absent.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match raw.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Stored value for '{}' is malformed: {:?}", key, raw);
                None
            }
        }
    }

    /// All entries
    pub fn get_all(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// File contents for the current map
    pub fn serialize(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Overwrite the backing file with the current map
    pub fn flush(&self) -> Result<(), StorageError> {
        self.write_file(&self.serialize())
    }

    fn write_file(&self, content: &str) -> Result<(), StorageError> {
        fs::write(&self.path, content).map_err(|source| StorageError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_splits_on_first_equals() {
        let map = parse_records("url=a=b");
        assert_eq!(map.get("url").map(String::as_str), Some("a=b"));
    }

    #[test]
    fn test_parse_keeps_whitespace() {
        let map = parse_records(" key = value \r");
        assert_eq!(map.get(" key ").map(String::as_str), Some(" value \r"));
    }

    #[test]
    fn test_parse_line_without_separator() {
        let map = parse_records("orphan\n\ntimer_length=5");
        assert_eq!(map.get("orphan").map(String::as_str), Some(""));
        assert_eq!(map.get("timer_length").map(String::as_str), Some("5"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_reload_missing_file_creates_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        let mut store = PersistentStore::new(&path);

        assert_eq!(store.reload().unwrap(), 0);
        assert!(path.exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_reload_truncates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        fs::write(&path, "timer_length=3600000").unwrap();

        let mut store = PersistentStore::new(&path);
        assert_eq!(store.reload().unwrap(), 1);
        assert_eq!(store.get(TIMER_LENGTH_KEY), Some("3600000"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_serialize_multiple_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PersistentStore::new(dir.path().join("data.txt"));
        store.set("b", 2).unwrap();
        store.set("a", "1").unwrap();
        assert_eq!(store.serialize(), "a=1\nb=2");

        let mut reloaded = PersistentStore::new(store.path());
        reloaded.reload().unwrap();
        assert_eq!(reloaded.get_all(), store.get_all());
    }

    #[test]
    fn test_get_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PersistentStore::new(dir.path().join("data.txt"));
        store.set(TIMER_LENGTH_KEY, 21_600_000u64).unwrap();
        store.set("broken", "6h").unwrap();

        assert_eq!(store.get_parsed::<u64>(TIMER_LENGTH_KEY), Some(21_600_000));
        assert_eq!(store.get_parsed::<u64>("broken"), None);
        assert_eq!(store.get_parsed::<u64>("missing"), None);
    }

    #[test]
    fn test_failed_write_keeps_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("board");
        fs::create_dir(&sub).unwrap();
        let mut store = PersistentStore::new(sub.join("data.txt"));
        store.set(TIMER_LENGTH_KEY, 1).unwrap();
        store.set("ambient", "ignore").unwrap();

        fs::remove_dir_all(&sub).unwrap();
        assert!(matches!(
            store.set(TIMER_LENGTH_KEY, 2),
            Err(StorageError::Write { .. })
        ));
        assert!(store.set("new_key", "x").is_err());
        assert!(store.remove("ambient").is_err());

        assert_eq!(store.get(TIMER_LENGTH_KEY), Some("1"));
        assert_eq!(store.get("new_key"), None);
        assert_eq!(store.get("ambient"), Some("ignore"));
    }

    #[test]
    fn test_refuses_entries_that_break_the_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        let mut store = PersistentStore::new(&path);
        store.set("note", "a").unwrap();

        for (key, value) in [("note", "a\nb=c"), ("a=b", "c"), ("line\nkey", "v")] {
            assert!(matches!(
                store.set(key, value),
                Err(StorageError::InvalidEntry { .. })
            ));
        }

        assert_eq!(store.get("note"), Some("a"));
        assert_eq!(store.len(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "note=a");
    }

    #[test]
    fn test_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PersistentStore::new(dir.path().join("missing-dir").join("data.txt"));
        assert!(matches!(
            store.set("k", "v"),
            Err(StorageError::Write { .. })
        ));
    }
}
