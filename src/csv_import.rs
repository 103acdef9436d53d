//! Lenient student import from spreadsheet exports.
//!
//! Spreadsheets arrive with whatever headers the school typed, so columns are
//! matched by case-insensitive substring against a fixed alias list instead
//! of by exact name. Lines use a deliberately small quoting grammar: a `"`
//! toggles quoting, a `,` outside quotes separates fields, and there is no
//! `""` escape or multi-line field support.

use crate::config::PersistenceConfig;
use crate::roster::StudentSink;
use crate::student::{Student, StudentStatus};
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{debug, info, warn};

/// Number of raw lines shown in an import preview.
pub const PREVIEW_LINES: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StudentField {
    Id,
    Dni,
    Name,
    Email,
    Belt,
    BirthDate,
    Phone,
    EmergencyContact,
    JoinDate,
    MonthlyFee,
    Status,
    PracticeLocation,
    Shift,
    Instructor,
}

impl StudentField {
    pub const ALL: [StudentField; 14] = [
        StudentField::Id,
        StudentField::Dni,
        StudentField::Name,
        StudentField::Email,
        StudentField::Belt,
        StudentField::BirthDate,
        StudentField::Phone,
        StudentField::EmergencyContact,
        StudentField::JoinDate,
        StudentField::MonthlyFee,
        StudentField::Status,
        StudentField::PracticeLocation,
        StudentField::Shift,
        StudentField::Instructor,
    ];

    /// Lowercase fragments that identify this field in a header cell.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            StudentField::Id => &["id", "identificador"],
            StudentField::Dni => &["dni", "documento", "cedula"],
            StudentField::Name => &["nombre", "name", "apellido"],
            StudentField::Email => &["email", "correo", "mail"],
            StudentField::Belt => &["cinta", "belt", "grado"],
            StudentField::BirthDate => &["nacimiento", "birth", "fecha"],
            StudentField::Phone => &["telefono", "teléfono", "phone", "celular"],
            StudentField::EmergencyContact => &["emergencia", "emergency", "contacto"],
            StudentField::JoinDate => &["ingreso", "join", "alta"],
            StudentField::MonthlyFee => &["cuota", "fee", "mensual"],
            StudentField::Status => &["estado", "status"],
            StudentField::PracticeLocation => &["sede", "location", "dojo"],
            StudentField::Shift => &["turno", "shift", "horario"],
            StudentField::Instructor => &["instructor", "profesor", "maestro"],
        }
    }

    fn matches(&self, header: &str) -> bool {
        self.aliases().iter().any(|alias| header.contains(alias))
    }
}

/// Column index per student field; `None` when no header matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnMap {
    columns: [Option<usize>; StudentField::ALL.len()],
}

impl ColumnMap {
    pub fn get(&self, field: StudentField) -> Option<usize> {
        self.columns[field as usize]
    }

    fn set(&mut self, field: StudentField, column: usize) {
        self.columns[field as usize] = Some(column);
    }

    pub fn matched_fields(&self) -> usize {
        self.columns.iter().filter(|c| c.is_some()).count()
    }

    fn value<'a>(&self, field: StudentField, values: &'a [String]) -> Option<&'a str> {
        self.get(field)
            .and_then(|idx| values.get(idx))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Splits one CSV line into trimmed fields.
pub fn parse_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    fields.push(current.trim().to_string());
    fields
}

/// Maps each student field to the first header cell containing one of its
/// aliases. Matching is case-insensitive; the same cell may serve several
/// fields.
pub fn detect_columns<S: AsRef<str>>(headers: &[S]) -> ColumnMap {
    let lowered: Vec<String> = headers
        .iter()
        .map(|h| h.as_ref().to_lowercase())
        .collect();
    let mut map = ColumnMap::default();
    for field in StudentField::ALL {
        if let Some(idx) = lowered.iter().position(|h| field.matches(h)) {
            map.set(field, idx);
        }
    }
    map
}

/// Mirrors `parseFloat(x) || 0`: the longest numeric prefix wins, anything
/// unparseable or non-finite becomes zero.
pub fn parse_fee(input: &str) -> f64 {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return 0.0;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    match s[..end].parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvImportError {
    /// Fewer than a header line plus one data line.
    TooFewLines,
    /// No data row produced a student with a name.
    NoValidRows,
}

impl fmt::Display for CsvImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CsvImportError::TooFewLines => write!(
                f,
                "El archivo necesita una fila de encabezados y al menos una fila de datos"
            ),
            CsvImportError::NoValidRows => {
                write!(f, "No se encontraron estudiantes válidos en el archivo")
            }
        }
    }
}

impl std::error::Error for CsvImportError {}

/// Outcome of dispatching imported students.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImportReport {
    pub success: usize,
    pub total: usize,
    pub errors: Vec<String>,
}

impl ImportReport {
    fn failed(err: CsvImportError) -> Self {
        Self {
            success: 0,
            total: 0,
            errors: vec![err.to_string()],
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.success == self.total
    }

    /// At most `limit` errors, followed by a count of the hidden ones.
    pub fn display_errors(&self, limit: usize) -> Vec<String> {
        let mut shown: Vec<String> = self.errors.iter().take(limit).cloned().collect();
        if self.errors.len() > limit {
            shown.push(format!(
                "... y {} errores más",
                self.errors.len() - limit
            ));
        }
        shown
    }

    pub fn summary(&self) -> String {
        format!(
            "{} de {} estudiantes importados",
            self.success, self.total
        )
    }
}

#[derive(Debug, Clone)]
pub struct CsvImporter {
    default_belt: String,
}

impl Default for CsvImporter {
    fn default() -> Self {
        Self::new(&PersistenceConfig::default())
    }
}

impl CsvImporter {
    pub fn new(config: &PersistenceConfig) -> Self {
        Self {
            default_belt: config.default_belt.clone(),
        }
    }

    /// The first few lines, split into fields, for showing the user what
    /// was read before committing to an import.
    pub fn preview(&self, csv_text: &str) -> Vec<Vec<String>> {
        csv_text
            .split('\n')
            .take(PREVIEW_LINES)
            .map(parse_line)
            .collect()
    }

    pub fn parse_students(&self, csv_text: &str) -> Result<Vec<Student>, CsvImportError> {
        self.parse_students_at(csv_text, Utc::now())
    }

    /// Parses every data row into a student. Rows with fewer than two fields
    /// or without a name are skipped silently. Missing ids become
    /// `csv-{millis}-{line}` using `now`, so two imports of the same file
    /// within one millisecond produce identical ids.
    pub fn parse_students_at(
        &self,
        csv_text: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Student>, CsvImportError> {
        let lines: Vec<&str> = csv_text
            .split('\n')
            .filter(|line| !line.trim().is_empty())
            .collect();
        if lines.len() < 2 {
            return Err(CsvImportError::TooFewLines);
        }

        let headers = parse_line(lines[0]);
        let columns = detect_columns(&headers);
        debug!(
            headers = headers.len(),
            matched = columns.matched_fields(),
            "detected csv columns"
        );

        let run_stamp = now.timestamp_millis();
        let today = now.date_naive().format("%Y-%m-%d").to_string();
        let mut students = Vec::new();

        for (line_idx, line) in lines.iter().enumerate().skip(1) {
            let values = parse_line(line);
            if values.len() < 2 {
                continue;
            }
            let student = self.build_student(&columns, &values, run_stamp, line_idx, &today);
            if student.name.trim().is_empty() {
                debug!(line = line_idx + 1, "skipping csv row without a name");
                continue;
            }
            students.push(student);
        }

        if students.is_empty() {
            return Err(CsvImportError::NoValidRows);
        }
        Ok(students)
    }

    fn build_student(
        &self,
        columns: &ColumnMap,
        values: &[String],
        run_stamp: i64,
        line_idx: usize,
        today: &str,
    ) -> Student {
        let text = |field: StudentField| columns.value(field, values).unwrap_or("").to_string();

        let id = columns
            .value(StudentField::Id, values)
            .map(str::to_string)
            .unwrap_or_else(|| format!("csv-{run_stamp}-{line_idx}"));
        let name = match columns.get(StudentField::Name) {
            Some(_) => text(StudentField::Name),
            None => values.first().cloned().unwrap_or_default(),
        };

        let mut student = Student::new(id, name);
        student.dni = text(StudentField::Dni);
        student.email = text(StudentField::Email);
        student.belt = columns
            .value(StudentField::Belt, values)
            .unwrap_or(&self.default_belt)
            .to_string();
        student.birth_date = text(StudentField::BirthDate);
        student.phone = text(StudentField::Phone);
        student.emergency_contact = text(StudentField::EmergencyContact);
        student.join_date = columns
            .value(StudentField::JoinDate, values)
            .unwrap_or(today)
            .to_string();
        student.monthly_fee = columns
            .value(StudentField::MonthlyFee, values)
            .map(parse_fee)
            .unwrap_or(0.0);
        student.status = columns
            .value(StudentField::Status, values)
            .map(StudentStatus::parse_lenient)
            .unwrap_or_default();
        student.practice_location = text(StudentField::PracticeLocation);
        student.shift = text(StudentField::Shift);
        student.instructor = text(StudentField::Instructor);
        student.observations = Some(String::new());
        student
    }

    pub fn import_students<S: StudentSink + ?Sized>(
        &self,
        csv_text: &str,
        sink: &mut S,
    ) -> ImportReport {
        self.import_students_at(csv_text, sink, Utc::now())
    }

    /// Parses `csv_text` and hands every student to `sink`. Sink rejections
    /// are collected per row and do not stop the import.
    pub fn import_students_at<S: StudentSink + ?Sized>(
        &self,
        csv_text: &str,
        sink: &mut S,
        now: DateTime<Utc>,
    ) -> ImportReport {
        let students = match self.parse_students_at(csv_text, now) {
            Ok(students) => students,
            Err(err) => {
                warn!(error = %err, "csv import found no students");
                return ImportReport::failed(err);
            }
        };

        let total = students.len();
        let mut success = 0;
        let mut errors = Vec::new();
        for (index, student) in students.into_iter().enumerate() {
            match sink.add_student(student) {
                Ok(()) => success += 1,
                Err(err) => errors.push(format!("Error en fila {}: {}", index + 2, err)),
            }
        }

        info!(success, total, errors = errors.len(), "csv import finished");
        ImportReport {
            success,
            total,
            errors,
        }
    }
}
