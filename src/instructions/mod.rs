//! Permanent instructions applied to every rewrite and improvement.
//!
//! [`InstructionStore`] keeps an ordered list of unique, non-empty rules. The
//! list is loaded once and every mutation is written through to the backing
//! [`KeyValueStore`] immediately as one whole-list write.

use std::sync::Arc;

pub mod store;

pub use store::{JsonFileStore, KeyValueStore, MemoryStore, StoreError};

/// Name of the entry holding the serialized instruction list
pub const STORE_KEY: &str = "permanent_instructions";

pub struct InstructionStore {
    entries: Vec<String>,
    backend: Arc<dyn KeyValueStore>,
}

impl InstructionStore {
    /// Load the persisted set. Missing or corrupt data yields an empty set.
    pub fn load(backend: Arc<dyn KeyValueStore>) -> Self {
        let entries = match backend.get(STORE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Ignoring malformed permanent instructions: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Could not read permanent instructions: {}", e);
                Vec::new()
            }
        };

        tracing::debug!("Loaded {} permanent instruction(s)", entries.len());
        Self { entries, backend }
    }

    /// Ephemeral store, used when persistence is unavailable
    pub fn in_memory() -> Self {
        Self::load(Arc::new(MemoryStore::new()))
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, text: &str) -> bool {
        self.entries.iter().any(|entry| entry == text)
    }

    /// Append `text` unless it is empty or already present.
    ///
    /// Returns whether the set changed.
    pub fn add(&mut self, text: &str) -> Result<bool, StoreError> {
        if text.trim().is_empty() || self.contains(text) {
            return Ok(false);
        }

        let mut next = self.entries.clone();
        next.push(text.to_string());
        self.commit(next)?;
        Ok(true)
    }

    /// Remove the instruction at a zero-based position
    pub fn remove(&mut self, index: usize) -> Result<String, StoreError> {
        if index >= self.entries.len() {
            return Err(StoreError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }

        let mut next = self.entries.clone();
        let removed = next.remove(index);
        self.commit(next)?;
        Ok(removed)
    }

    /// Replace the whole set, as given. Used by bulk import.
    pub fn replace_all(&mut self, entries: Vec<String>) -> Result<(), StoreError> {
        self.commit(entries)
    }

    /// Newline-joined dump of the current entries
    pub fn export_text(&self) -> String {
        self.entries.join("\n")
    }

    /// Parse import text: one instruction per non-empty line
    pub fn parse_import(text: &str) -> Vec<String> {
        text.split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Instructions joined into one sentence-like clause
    pub fn joined(&self) -> Option<String> {
        join_instructions(&self.entries)
    }

    // Persist first so memory never runs ahead of the stored list
    fn commit(&mut self, next: Vec<String>) -> Result<(), StoreError> {
        let serialized =
            serde_json::to_string(&next).map_err(|e| StoreError::Malformed(e.to_string()))?;
        self.backend.set(STORE_KEY, &serialized)?;
        self.entries = next;
        Ok(())
    }
}

/// Join instructions with a period-and-space separator
pub fn join_instructions(entries: &[String]) -> Option<String> {
    if entries.is_empty() {
        None
    } else {
        Some(entries.join(". "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use store::MockKeyValueStore;
    use tempfile::tempdir;
    use tokio_test::assert_ok;

    fn file_backed() -> (InstructionStore, Arc<JsonFileStore>, tempfile::TempDir) {
        let dir = tempdir().expect("temp dir");
        let backend = Arc::new(JsonFileStore::new(dir.path().join("store.json")));
        let store = InstructionStore::load(backend.clone());
        (store, backend, dir)
    }

    #[test]
    fn starts_empty() {
        let (store, _backend, _dir) = file_backed();
        assert!(store.is_empty());
        assert_eq!(store.export_text(), "");
        assert_eq!(store.joined(), None);
    }

    #[test]
    fn add_twice_keeps_one() {
        let (mut store, _backend, _dir) = file_backed();
        assert!(store.add("use emojis").unwrap());
        assert!(!store.add("use emojis").unwrap());
        assert_eq!(store.entries(), ["use emojis"]);
    }

    #[test]
    fn add_ignores_empty() {
        let (mut store, _backend, _dir) = file_backed();
        assert!(!store.add("").unwrap());
        assert!(!store.add("   ").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn mutations_persist_immediately() {
        let (mut store, backend, _dir) = file_backed();
        assert_ok!(store.add("first"));
        assert_ok!(store.add("second"));
        assert_ok!(store.add("third"));
        assert_eq!(assert_ok!(store.remove(1)), "second");

        let reloaded = InstructionStore::load(backend);
        assert_eq!(reloaded.entries(), ["first", "third"]);
    }

    #[test]
    fn remove_out_of_range_is_an_error() {
        let (mut store, _backend, _dir) = file_backed();
        store.add("only").unwrap();
        assert!(matches!(
            store.remove(3),
            Err(StoreError::IndexOutOfRange { index: 3, len: 1 })
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn replace_all_does_not_deduplicate() {
        let (mut store, backend, _dir) = file_backed();
        store
            .replace_all(vec!["a".into(), "a".into(), "b".into()])
            .unwrap();
        assert_eq!(InstructionStore::load(backend).entries(), ["a", "a", "b"]);
    }

    #[test]
    fn export_import_round_trip() {
        let (mut store, _backend, _dir) = file_backed();
        let original = vec![
            "Write in English".to_string(),
            "  keep it under 280 characters".to_string(),
            "End with #launch".to_string(),
        ];
        store.replace_all(original.clone()).unwrap();

        let exported = store.export_text();
        store.replace_all(Vec::new()).unwrap();
        store
            .replace_all(InstructionStore::parse_import(&exported))
            .unwrap();

        assert_eq!(store.entries(), original.as_slice());
    }

    #[test]
    fn parse_import_skips_blank_lines_and_carriage_returns() {
        let parsed = InstructionStore::parse_import("one\r\n\r\n  \ntwo\n");
        assert_eq!(parsed, ["one", "two"]);
    }

    #[test]
    fn joined_uses_period_separator() {
        let (mut store, _backend, _dir) = file_backed();
        store.add("Be brief").unwrap();
        store.add("Use hashtags").unwrap();
        assert_eq!(store.joined().as_deref(), Some("Be brief. Use hashtags"));
    }

    #[test]
    fn corrupt_data_loads_as_empty() {
        let mut backend = MockKeyValueStore::new();
        backend
            .expect_get()
            .with(eq(STORE_KEY))
            .returning(|_| Ok(Some("{\"not\": \"a list\"}".to_string())));

        let store = InstructionStore::load(Arc::new(backend));
        assert!(store.is_empty());
    }

    #[test]
    fn unreadable_store_loads_as_empty() {
        let mut backend = MockKeyValueStore::new();
        backend
            .expect_get()
            .returning(|_| Err(StoreError::Malformed("broken".into())));

        let store = InstructionStore::load(Arc::new(backend));
        assert!(store.is_empty());
    }

    #[test]
    fn failed_write_leaves_entries_unchanged() {
        let mut backend = MockKeyValueStore::new();
        backend.expect_get().returning(|_| Ok(None));
        backend.expect_set().times(1).returning(|_, _| {
            Err(StoreError::Io {
                path: "store.json".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        });

        let mut store = InstructionStore::load(Arc::new(backend));
        assert!(store.add("rule").is_err());
        assert!(store.is_empty());
    }
}
