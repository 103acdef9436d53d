pub mod backup;
pub mod belts;
pub mod classes;
pub mod config;
pub mod csv_import;
pub mod payments;
pub mod persistence;
pub mod quota;
pub mod record_validation;
pub mod roster;
pub mod serializer;
pub mod student;

pub use backup::{Backup, BackupService, ExportKind, RestoreSummary, SchoolSnapshot};
pub use belts::Gup;
pub use classes::{AttendanceRecord, ClassBook, ClassSchedule, ClassSession};
pub use config::PersistenceConfig;
pub use csv_import::{CsvImportError, CsvImporter, ImportReport};
pub use payments::{BillingPeriod, Ledger, Payment, PaymentPlan, PaymentStatus};
pub use persistence::{
    FileStore, KeyValueStore, MemoryStore, PersistenceError, PersistenceResult, StorageKey,
};
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteStore;
pub use quota::StorageStatus;
pub use roster::{Roster, RosterError, StudentSink};
pub use serializer::{Envelope, RecordSerializer};
pub use student::{Student, StudentStatus};
