use chrono::{NaiveDate, TimeZone, Utc};
use dojo_roster::backup::{BackupSource, backup_file_name, csv_file_name, students_to_csv};
use dojo_roster::classes::{AgeGroup, DayOfWeek};
use dojo_roster::payments::PaymentPlan;
use dojo_roster::{
    BackupService, BillingPeriod, ClassSchedule, ExportKind, KeyValueStore, Ledger, MemoryStore,
    Payment, PersistenceConfig, PersistenceError, SchoolSnapshot, StorageKey, Student,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sample_student() -> Student {
    let mut ana = Student::new("s1", "Ana Perez");
    ana.dni = "123".into();
    ana.email = "a@x.com".into();
    ana.birth_date = "2010-01-01".into();
    ana.phone = "555".into();
    ana.emergency_contact = "Luis".into();
    ana.join_date = "2024-01-01".into();
    ana.monthly_fee = 100.0;
    ana.practice_location = "Centro".into();
    ana.shift = "Tarde".into();
    ana.instructor = "Kim".into();
    ana
}

fn sample_schedule() -> ClassSchedule {
    ClassSchedule {
        id: "sch1".into(),
        location: "Centro".into(),
        days: vec![DayOfWeek::Monday, DayOfWeek::Wednesday],
        time: "18:00".into(),
        age_group: AgeGroup::Adultos,
        instructor: "Kim".into(),
        max_capacity: Some(20),
        is_active: true,
        created_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    }
}

fn sample_payments() -> Vec<Payment> {
    let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    let mut ledger = Ledger::new();
    ledger
        .add_plan(PaymentPlan {
            id: "plan1".into(),
            student_id: "s1".into(),
            monthly_amount: 100.0,
            due_day: 10,
            start_date: d(2024, 1, 1),
            end_date: None,
            is_active: true,
            discount: 0.0,
            created_date: now,
            notes: None,
        })
        .unwrap();
    ledger.generate_monthly_payments(BillingPeriod::new(2024, 2).unwrap(), now);
    ledger.payments().to_vec()
}

fn seeded_service(store: &MemoryStore) -> BackupService<&MemoryStore> {
    let service = BackupService::new(store, PersistenceConfig::default());
    assert!(service.persist(&SchoolSnapshot {
        students: vec![sample_student()],
        classes: vec![sample_schedule()],
        payments: sample_payments(),
    }));
    service
}

#[test]
fn export_then_import_restores_identical_students() {
    let source = MemoryStore::new();
    let exported = seeded_service(&source).export_json().unwrap();

    let target = MemoryStore::new();
    let service = BackupService::new(&target, PersistenceConfig::default());
    assert!(service.import_json(&exported));

    let restored = service.load_initial_data();
    assert_eq!(restored.students, vec![sample_student()]);
    assert_eq!(restored.classes, vec![sample_schedule()]);
    assert_eq!(restored.payments, sample_payments());
    assert_eq!(
        serde_json::to_string(&restored.students).unwrap(),
        serde_json::to_string(&vec![sample_student()]).unwrap()
    );
}

#[test]
fn exported_backup_has_metadata() {
    let store = MemoryStore::new();
    let exported = seeded_service(&store).export_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&exported).unwrap();

    assert_eq!(value["version"], "1.0.0");
    assert_eq!(value["metadata"]["totalRecords"], 3);
    assert_eq!(value["metadata"]["source"], "local");
    assert!(value["timestamp"].is_string());
    assert_eq!(value["classes"][0]["days"][1], "miércoles");
    assert_eq!(value["payments"][0]["period"], "2024-02");
}

#[test]
fn create_backup_stores_copy_under_backup_key() {
    let store = MemoryStore::new();
    let service = seeded_service(&store);
    let backup = service.create_backup();

    assert_eq!(backup.metadata.total_records, 3);
    assert_eq!(backup.metadata.source, BackupSource::Local);
    let raw = store.get("taekwondo_backup").unwrap().expect("backup copy");
    let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored["students"][0]["id"], "s1");
}

#[test]
fn malformed_json_writes_nothing() {
    let store = MemoryStore::new();
    let service = BackupService::new(&store, PersistenceConfig::default());

    assert!(!service.import_json("{not json"));
    assert!(matches!(
        service.try_import_json("{not json"),
        Err(PersistenceError::Serialization(_))
    ));
    assert!(store.is_empty());
}

#[test]
fn missing_or_malformed_students_is_rejected() {
    let store = MemoryStore::new();
    let service = BackupService::new(&store, PersistenceConfig::default());

    assert!(!service.import_json(r#"{"classes":[]}"#));
    assert!(!service.import_json(r#"{"students":{"id":"s1"}}"#));
    assert!(!service.import_json(r#"{"students":[{"name":"sin id"}]}"#));
    assert!(store.is_empty());
}

#[test]
fn malformed_optional_sections_are_skipped() {
    let store = MemoryStore::new();
    let service = BackupService::new(&store, PersistenceConfig::default());

    let summary = service
        .try_import_json(r#"{"students":[{"id":"s1","name":"Ana"}],"classes":"x","payments":[{"bad":true}]}"#)
        .unwrap();
    assert_eq!(summary.students, 1);
    assert_eq!(summary.classes, None);
    assert_eq!(summary.payments, None);
    assert!(store.get("taekwondo_classes").unwrap().is_none());
    assert!(store.get("taekwondo_payments").unwrap().is_none());
}

#[test]
fn import_replaces_existing_students() {
    let store = MemoryStore::new();
    let service = seeded_service(&store);

    assert!(service.import_json(r#"{"students":[]}"#));
    let snapshot = service.load_initial_data();
    assert!(snapshot.students.is_empty());
    assert_eq!(snapshot.classes.len(), 1);
}

#[test]
fn students_csv_uses_fixed_header_and_quotes() {
    let store = MemoryStore::new();
    let csv = seeded_service(&store).export_csv(ExportKind::Students).unwrap();
    let lines: Vec<&str> = csv.split('\n').collect();

    assert_eq!(
        lines[0],
        "ID,DNI,Nombre,Email,Cinta,Fecha Nacimiento,Teléfono,Contacto Emergencia,Fecha Ingreso,Cuota Mensual,Estado,Sede,Turno,Instructor"
    );
    assert_eq!(
        lines[1],
        "s1,123,\"Ana Perez\",a@x.com,\"Blanco (10)\",2010-01-01,555,\"Luis\",2024-01-01,100,active,Centro,Tarde,Kim"
    );
    assert_eq!(lines.len(), 2);
}

#[test]
fn empty_collections_export_empty_csv() {
    let store = MemoryStore::new();
    let service = BackupService::new(&store, PersistenceConfig::default());
    assert_eq!(service.export_csv(ExportKind::Students).unwrap(), "");
    assert_eq!(service.export_csv(ExportKind::Classes).unwrap(), "");
    assert_eq!(service.export_csv(ExportKind::Payments).unwrap(), "");
    assert_eq!(students_to_csv(&[]), "");
}

#[test]
fn classes_and_payments_export_as_csv() {
    let store = MemoryStore::new();
    let service = seeded_service(&store);

    let classes = service.export_csv(ExportKind::Classes).unwrap();
    let mut lines = classes.lines();
    assert_eq!(
        lines.next().unwrap(),
        "id,location,days,time,age_group,instructor,max_capacity,is_active,created_date"
    );
    let row = lines.next().unwrap();
    assert!(row.starts_with("sch1,Centro,lunes;miércoles,18:00,adultos,Kim,20,true,"));

    let payments = service.export_csv(ExportKind::Payments).unwrap();
    let mut lines = payments.lines();
    assert!(lines.next().unwrap().starts_with("id,student_id,period,amount"));
    assert!(
        lines
            .next()
            .unwrap()
            .starts_with("payment-2024-02-s1,s1,2024-02,100,0,,2024-02-10,,,pending")
    );
}

#[test]
fn persist_skips_empty_collections() {
    let store = MemoryStore::new();
    let service = seeded_service(&store);

    assert!(service.persist(&SchoolSnapshot::default()));
    let snapshot = service.load_initial_data();
    assert_eq!(snapshot.students.len(), 1);
    assert_eq!(snapshot.classes.len(), 1);
    assert_eq!(snapshot.payments.len(), 1);
}

#[test]
fn clear_all_data_removes_every_key() {
    let store = MemoryStore::new();
    store.set("unrelated", "keep").unwrap();
    let service = seeded_service(&store);
    service.create_backup();

    assert!(service.clear_all_data());
    for key in StorageKey::ALL {
        assert!(store.get(&key.key(service.config())).unwrap().is_none());
    }
    assert_eq!(store.get("unrelated").unwrap().as_deref(), Some("keep"));
    assert_eq!(service.storage_status().used, 0);
}

#[test]
fn download_names_carry_the_date() {
    assert_eq!(
        backup_file_name(d(2024, 3, 5)),
        "taekwondo-backup-2024-03-05.json"
    );
    assert_eq!(
        csv_file_name(ExportKind::Payments, d(2024, 3, 5)),
        "payments-2024-03-05.csv"
    );
}

#[test]
fn export_kind_parses_case_insensitively() {
    assert_eq!("Classes".parse::<ExportKind>().unwrap(), ExportKind::Classes);
    assert!(matches!(
        "belts".parse::<ExportKind>(),
        Err(PersistenceError::InvalidData(_))
    ));
}

#[test]
fn failed_import_rolls_back_earlier_writes() {
    let store = MemoryStore::with_capacity_limit(1200);
    let service = BackupService::new(&store, PersistenceConfig::default());
    assert!(service.persist(&SchoolSnapshot {
        students: vec![Student::new("old", "Viejo")],
        ..SchoolSnapshot::default()
    }));
    let stored_before = store.get("taekwondo_students").unwrap();

    let mut oversized = sample_schedule();
    oversized.location = "x".repeat(2000);
    let backup = serde_json::json!({
        "students": [Student::new("new", "Nuevo")],
        "classes": [oversized],
    })
    .to_string();

    assert!(!service.import_json(&backup));
    assert!(matches!(
        service.try_import_json(&backup),
        Err(PersistenceError::QuotaExceeded { .. })
    ));

    let students = service.load_initial_data().students;
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].id, "old");
    assert_eq!(store.get("taekwondo_students").unwrap(), stored_before);
    assert!(store.get("taekwondo_classes").unwrap().is_none());
}

#[test]
fn failed_import_without_prior_data_leaves_store_empty() {
    let store = MemoryStore::with_capacity_limit(1200);
    let service = BackupService::new(&store, PersistenceConfig::default());

    let mut oversized = sample_schedule();
    oversized.location = "x".repeat(2000);
    let backup = serde_json::json!({
        "students": [Student::new("new", "Nuevo")],
        "classes": [oversized],
    })
    .to_string();

    assert!(!service.import_json(&backup));
    assert!(store.is_empty());
}
