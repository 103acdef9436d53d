use crate::classes::ClassSchedule;
use crate::config::PersistenceConfig;
use crate::payments::Payment;
use crate::persistence::{KeyValueStore, PersistenceError, PersistenceResult, StorageKey};
use crate::quota::{self, StorageStatus};
use crate::serializer::RecordSerializer;
use crate::student::Student;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::{error, info, warn};

/// Fixed header of the students CSV export.
pub const STUDENT_CSV_HEADERS: [&str; 14] = [
    "ID",
    "DNI",
    "Nombre",
    "Email",
    "Cinta",
    "Fecha Nacimiento",
    "Teléfono",
    "Contacto Emergencia",
    "Fecha Ingreso",
    "Cuota Mensual",
    "Estado",
    "Sede",
    "Turno",
    "Instructor",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackupSource {
    #[default]
    Local,
    Sheets,
    Backup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetadata {
    pub total_records: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: BackupSource,
}

/// Snapshot of every persisted collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub students: Vec<Student>,
    pub classes: Vec<ClassSchedule>,
    pub payments: Vec<Payment>,
    pub metadata: BackupMetadata,
}

/// The live collections mirrored to storage.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchoolSnapshot {
    pub students: Vec<Student>,
    pub classes: Vec<ClassSchedule>,
    pub payments: Vec<Payment>,
}

impl SchoolSnapshot {
    pub fn total_records(&self) -> usize {
        self.students.len() + self.classes.len() + self.payments.len()
    }
}

/// Collections written by a JSON import. `None` means the section was
/// absent or malformed and left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RestoreSummary {
    pub students: usize,
    pub classes: Option<usize>,
    pub payments: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportKind {
    Students,
    Classes,
    Payments,
}

impl ExportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Students => "students",
            ExportKind::Classes => "classes",
            ExportKind::Payments => "payments",
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportKind {
    type Err = PersistenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "students" => Ok(ExportKind::Students),
            "classes" => Ok(ExportKind::Classes),
            "payments" => Ok(ExportKind::Payments),
            other => Err(PersistenceError::InvalidData(format!(
                "unknown export kind '{other}' (expected students, classes or payments)"
            ))),
        }
    }
}

/// `taekwondo-backup-YYYY-MM-DD.json`.
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("taekwondo-backup-{}.json", date.format("%Y-%m-%d"))
}

/// `{kind}-YYYY-MM-DD.csv`.
pub fn csv_file_name(kind: ExportKind, date: NaiveDate) -> String {
    format!("{}-{}.csv", kind, date.format("%Y-%m-%d"))
}

#[derive(Serialize)]
struct ScheduleCsvRecord {
    id: String,
    location: String,
    days: String,
    time: String,
    age_group: String,
    instructor: String,
    max_capacity: String,
    is_active: bool,
    created_date: String,
}

impl From<&ClassSchedule> for ScheduleCsvRecord {
    fn from(schedule: &ClassSchedule) -> Self {
        Self {
            id: schedule.id.clone(),
            location: schedule.location.clone(),
            days: schedule
                .days
                .iter()
                .map(|d| d.as_str())
                .collect::<Vec<_>>()
                .join(";"),
            time: schedule.time.clone(),
            age_group: schedule.age_group.as_str().to_string(),
            instructor: schedule.instructor.clone(),
            max_capacity: schedule
                .max_capacity
                .map(|c| c.to_string())
                .unwrap_or_default(),
            is_active: schedule.is_active,
            created_date: schedule.created_date.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
struct PaymentCsvRecord {
    id: String,
    student_id: String,
    period: String,
    amount: String,
    discount: String,
    penalty: String,
    due_date: String,
    paid_date: String,
    method: String,
    status: String,
    receipt_number: String,
    paid_by: String,
    notes: String,
}

impl From<&Payment> for PaymentCsvRecord {
    fn from(payment: &Payment) -> Self {
        Self {
            id: payment.id.clone(),
            student_id: payment.student_id.clone(),
            period: payment.period.to_string(),
            amount: payment.amount.to_string(),
            discount: format_option_f64(payment.discount),
            penalty: format_option_f64(payment.penalty),
            due_date: format_date(Some(payment.due_date)),
            paid_date: format_date(payment.paid_date),
            method: payment
                .method
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            status: payment.status.as_str().to_string(),
            receipt_number: payment.receipt_number.clone().unwrap_or_default(),
            paid_by: payment.paid_by.clone().unwrap_or_default(),
            notes: payment.notes.clone().unwrap_or_default(),
        }
    }
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn format_option_f64(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Full-state export and restore on top of a [`RecordSerializer`].
pub struct BackupService<S> {
    serializer: RecordSerializer<S>,
}

impl<S: KeyValueStore> BackupService<S> {
    pub fn new(store: S, config: PersistenceConfig) -> Self {
        Self {
            serializer: RecordSerializer::new(store, config),
        }
    }

    pub fn serializer(&self) -> &RecordSerializer<S> {
        &self.serializer
    }

    pub fn config(&self) -> &PersistenceConfig {
        self.serializer.config()
    }

    /// Reads all three collections once at startup.
    pub fn load_initial_data(&self) -> SchoolSnapshot {
        SchoolSnapshot {
            students: self.serializer.load(StorageKey::Students),
            classes: self.serializer.load(StorageKey::Classes),
            payments: self.serializer.load(StorageKey::Payments),
        }
    }

    /// Mirrors the live collections into storage. Empty collections are not
    /// written, so an empty state never wipes what a previous run saved.
    /// Returns `false` if any write failed.
    pub fn persist(&self, snapshot: &SchoolSnapshot) -> bool {
        let mut ok = true;
        if !snapshot.students.is_empty() {
            ok &= self
                .serializer
                .save(StorageKey::Students, &snapshot.students);
        }
        if !snapshot.classes.is_empty() {
            ok &= self.serializer.save(StorageKey::Classes, &snapshot.classes);
        }
        if !snapshot.payments.is_empty() {
            ok &= self
                .serializer
                .save(StorageKey::Payments, &snapshot.payments);
        }
        ok
    }

    /// Composes a backup from the stored collections and keeps a copy under
    /// the backup key, next to the live per-entity keys.
    pub fn create_backup(&self) -> Backup {
        let snapshot = self.load_initial_data();
        let backup = Backup {
            timestamp: Utc::now(),
            version: self.config().backup_version.clone(),
            metadata: BackupMetadata {
                total_records: snapshot.total_records(),
                last_sync: None,
                source: BackupSource::Local,
            },
            students: snapshot.students,
            classes: snapshot.classes,
            payments: snapshot.payments,
        };

        let key = StorageKey::Backup.key(self.config());
        let stored = serde_json::to_string(&backup)
            .map_err(PersistenceError::from)
            .and_then(|json| self.serializer.store().set(&key, &json));
        match stored {
            Ok(()) => info!(records = backup.metadata.total_records, "backup created"),
            Err(err) => error!(error = %err, "error storing backup copy"),
        }
        backup
    }

    pub fn export_json(&self) -> PersistenceResult<String> {
        let backup = self.create_backup();
        Ok(serde_json::to_string_pretty(&backup)?)
    }

    /// Restores a backup produced by [`export_json`](Self::export_json).
    ///
    /// The text must parse and carry a `students` array of valid students;
    /// otherwise nothing is written. `classes` and `payments` are restored
    /// only when they are well-formed arrays.
    pub fn try_import_json(&self, text: &str) -> PersistenceResult<RestoreSummary> {
        let value: Value = serde_json::from_str(text)?;
        let students = match value.get("students") {
            Some(students) if students.is_array() => {
                serde_json::from_value::<Vec<Student>>(students.clone()).map_err(|err| {
                    PersistenceError::InvalidData(format!("invalid students array: {err}"))
                })?
            }
            _ => {
                return Err(PersistenceError::InvalidData(
                    "backup has no students array".into(),
                ));
            }
        };
        let classes = optional_section::<ClassSchedule>(&value, "classes");
        let payments = optional_section::<Payment>(&value, "payments");

        let mut writes = vec![(StorageKey::Students, self.serializer.encode(&students)?)];
        let mut summary = RestoreSummary {
            students: students.len(),
            classes: None,
            payments: None,
        };
        if let Some(classes) = classes {
            writes.push((StorageKey::Classes, self.serializer.encode(&classes)?));
            summary.classes = Some(classes.len());
        }
        if let Some(payments) = payments {
            writes.push((StorageKey::Payments, self.serializer.encode(&payments)?));
            summary.payments = Some(payments.len());
        }
        self.apply_all(&writes)?;
        info!(
            students = summary.students,
            classes = ?summary.classes,
            payments = ?summary.payments,
            "backup imported"
        );
        Ok(summary)
    }

    /// Writes every entry or none: on the first failure the keys already
    /// written are put back to their previous values.
    fn apply_all(&self, writes: &[(StorageKey, String)]) -> PersistenceResult<()> {
        let store = self.serializer.store();
        let mut previous: Vec<(String, Option<String>)> = Vec::with_capacity(writes.len());
        for (key, json) in writes {
            let name = key.key(self.config());
            let before = store.get(&name)?;
            if let Err(err) = store.set(&name, json) {
                for (name, before) in previous.into_iter().rev() {
                    let restored = match before {
                        Some(value) => store.set(&name, &value),
                        None => store.remove(&name),
                    };
                    if let Err(restore_err) = restored {
                        error!(key = %name, error = %restore_err, "error rolling back import");
                    }
                }
                return Err(err);
            }
            previous.push((name, before));
        }
        Ok(())
    }

    pub fn import_json(&self, text: &str) -> bool {
        match self.try_import_json(text) {
            Ok(_) => true,
            Err(err) => {
                error!(error = %err, "error importing backup");
                false
            }
        }
    }

    /// CSV text for one collection, or an empty string when it has no rows.
    pub fn export_csv(&self, kind: ExportKind) -> PersistenceResult<String> {
        match kind {
            ExportKind::Students => {
                let students: Vec<Student> = self.serializer.load(StorageKey::Students);
                Ok(students_to_csv(&students))
            }
            ExportKind::Classes => {
                let classes: Vec<ClassSchedule> = self.serializer.load(StorageKey::Classes);
                write_records(classes.iter().map(ScheduleCsvRecord::from))
            }
            ExportKind::Payments => {
                let payments: Vec<Payment> = self.serializer.load(StorageKey::Payments);
                write_records(payments.iter().map(PaymentCsvRecord::from))
            }
        }
    }

    /// Removes every reserved key.
    pub fn clear_all_data(&self) -> bool {
        let mut ok = true;
        for key in StorageKey::ALL {
            if let Err(err) = self.serializer.remove(key) {
                error!(key = key.suffix(), error = %err, "error clearing key");
                ok = false;
            }
        }
        ok
    }

    pub fn storage_status(&self) -> StorageStatus {
        quota::storage_status(self.serializer.store(), self.config())
    }
}

fn optional_section<T: DeserializeOwned>(value: &Value, field: &str) -> Option<Vec<T>> {
    let section = value.get(field)?;
    if !section.is_array() {
        warn!(field, "backup section is not an array, skipping");
        return None;
    }
    match serde_json::from_value(section.clone()) {
        Ok(items) => Some(items),
        Err(err) => {
            warn!(field, error = %err, "backup section is malformed, skipping");
            None
        }
    }
}

/// Formats students with the fixed export header. Name, belt and emergency
/// contact are wrapped in quotes; embedded quotes and commas are written
/// as-is.
pub fn students_to_csv(students: &[Student]) -> String {
    if students.is_empty() {
        return String::new();
    }
    let mut lines = Vec::with_capacity(students.len() + 1);
    lines.push(STUDENT_CSV_HEADERS.join(","));
    for student in students {
        let row = [
            student.id.clone(),
            student.dni.clone(),
            format!("\"{}\"", student.name),
            student.email.clone(),
            format!("\"{}\"", student.belt),
            student.birth_date.clone(),
            student.phone.clone(),
            format!("\"{}\"", student.emergency_contact),
            student.join_date.clone(),
            student.monthly_fee.to_string(),
            student.status.as_str().to_string(),
            student.practice_location.clone(),
            student.shift.clone(),
            student.instructor.clone(),
        ];
        lines.push(row.join(","));
    }
    lines.join("\n")
}

fn write_records<R, I>(records: I) -> PersistenceResult<String>
where
    R: Serialize,
    I: IntoIterator<Item = R>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut rows = 0;
    for record in records {
        writer.serialize(record)?;
        rows += 1;
    }
    if rows == 0 {
        return Ok(String::new());
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| PersistenceError::Io(err.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|err| PersistenceError::InvalidData(format!("csv export is not utf-8: {err}")))
}
