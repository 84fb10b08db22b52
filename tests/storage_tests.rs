use facility_portal::{
    FileStore, KeyValueStore, MemoryStore,
    error::StorageError,
};

#[cfg(test)]
mod memory_tests {
    use super::*;

    #[test]
    fn test_memory_round_trip_and_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("ibki_user").unwrap(), None);

        store.set("ibki_user", r#"{"name":"A","level":1}"#).unwrap();
        assert_eq!(
            store.get("ibki_user").unwrap().as_deref(),
            Some(r#"{"name":"A","level":1}"#)
        );

        store.remove("ibki_user").unwrap();
        assert_eq!(store.get("ibki_user").unwrap(), None);
        // Removing again is fine.
        store.remove("ibki_user").unwrap();
    }

    #[test]
    fn test_memory_set_replaces_whole_value() {
        let store = MemoryStore::new();
        store.set("k", "first").unwrap();
        store.set("k", "second").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_failing_store_fails_every_operation() {
        let store = MemoryStore::new_failing();
        assert!(matches!(store.get("k"), Err(StorageError::Simulated)));
        assert!(matches!(store.set("k", "v"), Err(StorageError::Simulated)));
        assert!(matches!(store.remove("k"), Err(StorageError::Simulated)));
    }
}

#[cfg(test)]
mod file_tests {
    use super::*;

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        let first = FileStore::open(dir.path()).unwrap();
        first.set("ibki_staff_data", "[]").unwrap();

        let second = FileStore::open(dir.path()).unwrap();
        assert_eq!(second.get("ibki_staff_data").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_file_store_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        assert_eq!(store.get("absent").unwrap(), None);
        store.remove("absent").unwrap();
    }

    #[test]
    fn test_file_store_creates_nested_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("portal").join("data");

        let store = FileStore::open(&root).unwrap();
        store.set("k", "v").unwrap();

        assert!(root.join("k.json").exists());
        assert!(!root.join("k.json.tmp").exists());
    }

    #[test]
    fn test_file_store_keys_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("data");
        let store = FileStore::open(&root).unwrap();

        store.set("../outside", "v").unwrap();

        assert!(!dir.path().join("outside.json").exists());
        assert_eq!(store.get("../outside").unwrap().as_deref(), Some("v"));
        assert_eq!(std::fs::read_dir(&root).unwrap().count(), 1);
    }
}
