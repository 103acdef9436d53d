use chrono::{DateTime, TimeZone, Utc};
use dojo_roster::csv_import::{StudentField, detect_columns, parse_line};
use dojo_roster::{
    CsvImportError, CsvImporter, ImportReport, PersistenceConfig, Roster, Student, StudentStatus,
};

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap()
}

#[test]
fn imports_minimal_spreadsheet() {
    let importer = CsvImporter::default();
    let students = importer
        .parse_students_at("Nombre,DNI,Email\nAna,123,a@x.com", fixed_now())
        .expect("one student");

    assert_eq!(students.len(), 1);
    let ana = &students[0];
    assert_eq!(ana.name, "Ana");
    assert_eq!(ana.dni, "123");
    assert_eq!(ana.email, "a@x.com");
    assert_eq!(ana.belt, "Blanco (10)");
    assert_eq!(ana.status, StudentStatus::Active);
    assert_eq!(ana.monthly_fee, 0.0);
    assert_eq!(ana.join_date, "2024-03-15");
    assert_eq!(ana.observations.as_deref(), Some(""));
    assert_eq!(
        ana.id,
        format!("csv-{}-1", fixed_now().timestamp_millis())
    );
}

#[test]
fn row_without_name_is_skipped() {
    let importer = CsvImporter::default();
    let students = importer
        .parse_students_at("Nombre,DNI\n,,\nAna,1\n", fixed_now())
        .unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].name, "Ana");
    assert_eq!(students[0].id, format!("csv-{}-2", fixed_now().timestamp_millis()));

    let err = importer
        .parse_students_at("Nombre,DNI\n,,\n", fixed_now())
        .unwrap_err();
    assert_eq!(err, CsvImportError::NoValidRows);
    assert_eq!(
        err.to_string(),
        "No se encontraron estudiantes válidos en el archivo"
    );
}

#[test]
fn header_only_file_is_rejected() {
    let importer = CsvImporter::default();
    assert_eq!(
        importer.parse_students("Nombre,DNI\n\n  \n").unwrap_err(),
        CsvImportError::TooFewLines
    );
}

#[test]
fn quoted_fields_keep_commas() {
    let importer = CsvImporter::default();
    let students = importer
        .parse_students_at(
            "Nombre,Contacto\n\"Perez, Ana\",\"Luis, 555-1234\"",
            fixed_now(),
        )
        .unwrap();
    assert_eq!(students[0].name, "Perez, Ana");
    assert_eq!(students[0].emergency_contact, "Luis, 555-1234");
}

#[test]
fn parse_line_trims_and_toggles_quotes() {
    assert_eq!(
        parse_line(" a , \"b,c\" ,d"),
        vec!["a".to_string(), "b,c".to_string(), "d".to_string()]
    );
    assert_eq!(parse_line(""), vec![String::new()]);
}

#[test]
fn headers_match_by_substring_in_any_case() {
    let columns = detect_columns(&[
        "Nombre Completo",
        "Correo Electrónico",
        "CINTA",
        "Cuota Mensual",
        "Sede",
        "Profesor",
    ]);
    assert_eq!(columns.get(StudentField::Name), Some(0));
    assert_eq!(columns.get(StudentField::Email), Some(1));
    assert_eq!(columns.get(StudentField::Belt), Some(2));
    assert_eq!(columns.get(StudentField::MonthlyFee), Some(3));
    assert_eq!(columns.get(StudentField::PracticeLocation), Some(4));
    assert_eq!(columns.get(StudentField::Instructor), Some(5));
    assert_eq!(columns.get(StudentField::Dni), None);
}

#[test]
fn short_id_alias_matches_inside_other_headers() {
    let importer = CsvImporter::default();
    let students = importer
        .parse_students_at("Apellido,Email\nPerez,p@x.com", fixed_now())
        .unwrap();
    assert_eq!(students[0].id, "Perez");
    assert_eq!(students[0].name, "Perez");
}

#[test]
fn status_and_fee_are_parsed_leniently() {
    let importer = CsvImporter::default();
    let students = importer
        .parse_students_at(
            "Nombre,Estado,Cuota\nAna,Inactive,120.50\nLuis,baja,abc",
            fixed_now(),
        )
        .unwrap();
    assert_eq!(students[0].status, StudentStatus::Inactive);
    assert_eq!(students[0].monthly_fee, 120.5);
    assert_eq!(students[1].status, StudentStatus::Active);
    assert_eq!(students[1].monthly_fee, 0.0);
}

#[test]
fn configured_default_belt_is_used() {
    let config = PersistenceConfig {
        default_belt: "Amarilla (9)".into(),
        ..PersistenceConfig::default()
    };
    let importer = CsvImporter::new(&config);
    let students = importer
        .parse_students_at("Nombre,Cinta\nAna,\nLuis,Verde (8)", fixed_now())
        .unwrap();
    assert_eq!(students[0].belt, "Amarilla (9)");
    assert_eq!(students[1].belt, "Verde (8)");
}

#[test]
fn preview_returns_first_lines() {
    let importer = CsvImporter::default();
    let text = (0..10)
        .map(|i| format!("row{i},x"))
        .collect::<Vec<_>>()
        .join("\n");
    let preview = importer.preview(&text);
    assert_eq!(preview.len(), 6);
    assert_eq!(preview[5], vec!["row5".to_string(), "x".to_string()]);
}

#[test]
fn rejected_rows_are_reported_with_file_row_numbers() {
    let importer = CsvImporter::default();
    let mut roster = Roster::new();
    let report = importer.import_students_at(
        "Nombre,DNI,Cuota\nAna,1,100\nLuis,2,-4\nSofia,3,90",
        &mut roster,
        fixed_now(),
    );

    assert_eq!(report.total, 3);
    assert_eq!(report.success, 2);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("Error en fila 3: "));
    assert!(!report.is_clean());
    assert_eq!(report.summary(), "2 de 3 estudiantes importados");
    assert_eq!(roster.len(), 2);
}

#[test]
fn structural_failure_yields_single_error() {
    let importer = CsvImporter::default();
    let mut sink: Vec<Student> = Vec::new();
    let report = importer.import_students("Nombre\n", &mut sink);
    assert_eq!(report.success, 0);
    assert_eq!(report.total, 0);
    assert_eq!(report.errors.len(), 1);
    assert!(sink.is_empty());
}

#[test]
fn clean_import_into_vec_sink() {
    let importer = CsvImporter::default();
    let mut sink: Vec<Student> = Vec::new();
    let report = importer.import_students("Nombre,DNI\nAna,1\nLuis,2", &mut sink);
    assert!(report.is_clean());
    assert_eq!(sink.len(), 2);
}

#[test]
fn error_display_is_capped() {
    let report = ImportReport {
        success: 0,
        total: 7,
        errors: (2..9).map(|n| format!("Error en fila {n}: x")).collect(),
    };
    let shown = report.display_errors(5);
    assert_eq!(shown.len(), 6);
    assert_eq!(shown[0], "Error en fila 2: x");
    assert_eq!(shown[5], "... y 2 errores más");

    let short = ImportReport {
        success: 1,
        total: 2,
        errors: vec!["Error en fila 3: x".into()],
    };
    assert_eq!(short.display_errors(5), vec!["Error en fila 3: x".to_string()]);
}
