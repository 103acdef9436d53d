#![cfg(feature = "sqlite")]

use dojo_roster::{
    BackupService, KeyValueStore, PersistenceConfig, RecordSerializer, SchoolSnapshot,
    SqliteStore, StorageKey, Student,
};
use tempfile::NamedTempFile;

#[test]
fn set_overwrites_and_remove_deletes() {
    let store = SqliteStore::in_memory().unwrap();
    store.set("taekwondo_students", "first").unwrap();
    store.set("taekwondo_students", "second").unwrap();
    store.set("taekwondo_classes", "x").unwrap();

    assert_eq!(
        store.get("taekwondo_students").unwrap().as_deref(),
        Some("second")
    );
    assert_eq!(
        store.keys().unwrap(),
        vec![
            "taekwondo_classes".to_string(),
            "taekwondo_students".to_string()
        ]
    );

    store.remove("taekwondo_students").unwrap();
    assert!(store.get("taekwondo_students").unwrap().is_none());
    store.remove("missing").unwrap();
}

#[test]
fn serializer_round_trip_on_disk() {
    let file = NamedTempFile::new().unwrap();
    {
        let store = SqliteStore::new(file.path()).unwrap();
        let serializer = RecordSerializer::new(store, PersistenceConfig::default());
        assert!(serializer.save(StorageKey::Students, &[Student::new("s1", "Ana")]));
    }

    let store = SqliteStore::new(file.path()).unwrap();
    let service = BackupService::new(store, PersistenceConfig::default());
    let snapshot = service.load_initial_data();
    assert_eq!(snapshot.students, vec![Student::new("s1", "Ana")]);
    assert!(snapshot.classes.is_empty());

    assert!(service.persist(&SchoolSnapshot::default()));
    assert!(service.clear_all_data());
    assert!(service.load_initial_data().students.is_empty());
}
