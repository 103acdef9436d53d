use dojo_roster::persistence::{
    import_students_from_file, read_backup_file, write_backup_file, write_csv_export_file,
};
use dojo_roster::{
    BackupService, CsvImporter, FileStore, KeyValueStore, MemoryStore, PersistenceConfig,
    PersistenceError, RecordSerializer, SchoolSnapshot, StorageKey, Student,
};
use std::fs;
use tempfile::{NamedTempFile, tempdir};

#[test]
fn file_store_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data").join("roster.json");

    {
        let store = FileStore::new(&path).unwrap();
        let serializer = RecordSerializer::new(&store, PersistenceConfig::default());
        assert!(serializer.save(StorageKey::Students, &[Student::new("s1", "Ana")]));
    }

    let reopened = FileStore::new(&path).unwrap();
    let serializer = RecordSerializer::new(&reopened, PersistenceConfig::default());
    let students: Vec<Student> = serializer.load(StorageKey::Students);
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].name, "Ana");
    assert_eq!(reopened.keys().unwrap(), vec!["taekwondo_students".to_string()]);
}

#[test]
fn remove_rewrites_file() {
    let file = NamedTempFile::new().unwrap();
    let store = FileStore::new(file.path()).unwrap();
    store.set("a", "1").unwrap();
    store.set("b", "2").unwrap();
    store.remove("a").unwrap();

    let on_disk: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(file.path()).unwrap()).unwrap();
    assert_eq!(on_disk, serde_json::json!({ "b": "2" }));
}

#[test]
fn malformed_store_file_opens_empty_and_keeps_a_copy() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("roster.json");
    fs::write(&path, "[1, 2").unwrap();

    let store = FileStore::new(&path).unwrap();
    assert!(store.keys().unwrap().is_empty());
    assert_eq!(
        fs::read_to_string(dir.path().join("roster.json.bak")).unwrap(),
        "[1, 2"
    );

    store.set("taekwondo_students", "[]").unwrap();
    let on_disk: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk, serde_json::json!({ "taekwondo_students": "[]" }));
}

#[test]
fn failed_write_leaves_store_unchanged() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();

    let store = FileStore::new(blocker.join("roster.json")).unwrap();
    let serializer = RecordSerializer::new(&store, PersistenceConfig::default());
    assert!(!serializer.save(StorageKey::Students, &[Student::new("s1", "Ana")]));

    let students: Vec<Student> = serializer.load(StorageKey::Students);
    assert!(students.is_empty());
    assert!(store.keys().unwrap().is_empty());
    assert!(store.get("taekwondo_students").unwrap().is_none());
}

#[test]
fn successful_write_leaves_no_temp_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("roster.json");
    let store = FileStore::new(&path).unwrap();
    store.set("a", "1").unwrap();
    store.remove("a").unwrap();
    store.remove("a").unwrap();

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["roster.json".to_string()]);
}

#[test]
fn student_files_must_be_csv_or_txt() {
    let dir = tempdir().unwrap();
    let importer = CsvImporter::default();

    let xlsx = dir.path().join("alumnos.xlsx");
    fs::write(&xlsx, "Nombre,DNI\nAna,1").unwrap();
    assert!(matches!(
        import_students_from_file(&xlsx, &importer),
        Err(PersistenceError::InvalidData(_))
    ));

    let txt = dir.path().join("alumnos.TXT");
    fs::write(&txt, "Nombre,DNI\nAna,1\nLuis,2").unwrap();
    let students = import_students_from_file(&txt, &importer).unwrap();
    assert_eq!(students.len(), 2);

    let empty = dir.path().join("vacio.csv");
    fs::write(&empty, "Nombre,DNI\n").unwrap();
    assert!(matches!(
        import_students_from_file(&empty, &importer),
        Err(PersistenceError::InvalidData(_))
    ));
}

#[test]
fn backup_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("taekwondo-backup.json");

    let source = MemoryStore::new();
    let service = BackupService::new(&source, PersistenceConfig::default());
    service.persist(&SchoolSnapshot {
        students: vec![Student::new("s1", "Ana")],
        ..SchoolSnapshot::default()
    });
    write_backup_file(&service.create_backup(), &path).unwrap();

    let target = MemoryStore::new();
    let restore = BackupService::new(&target, PersistenceConfig::default());
    assert!(restore.import_json(&read_backup_file(&path).unwrap()));
    assert_eq!(restore.load_initial_data().students[0].id, "s1");
}

#[test]
fn csv_export_is_written_verbatim() {
    let file = NamedTempFile::new().unwrap();
    write_csv_export_file("a,b\n1,2", file.path()).unwrap();
    assert_eq!(fs::read_to_string(file.path()).unwrap(), "a,b\n1,2");
}
