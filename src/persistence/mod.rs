use crate::config::PersistenceConfig;
use serde_json::Error as SerdeJsonError;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum PersistenceError {
    Serialization(SerdeJsonError),
    Io(io::Error),
    #[cfg(feature = "sqlite")]
    Sqlite(rusqlite::Error),
    Csv(csv::Error),
    QuotaExceeded { requested: usize, capacity: usize },
    InvalidData(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Serialization(err) => write!(f, "serialization error: {err}"),
            PersistenceError::Io(err) => write!(f, "io error: {err}"),
            #[cfg(feature = "sqlite")]
            PersistenceError::Sqlite(err) => write!(f, "sqlite error: {err}"),
            PersistenceError::Csv(err) => write!(f, "csv error: {err}"),
            PersistenceError::QuotaExceeded {
                requested,
                capacity,
            } => write!(
                f,
                "storage quota exceeded: {requested} units requested, capacity is {capacity}"
            ),
            PersistenceError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<SerdeJsonError> for PersistenceError {
    fn from(value: SerdeJsonError) -> Self {
        Self::Serialization(value)
    }
}

impl From<io::Error> for PersistenceError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<csv::Error> for PersistenceError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// String-keyed, string-valued durable storage with local-storage semantics:
/// `set` overwrites, there is no merge and no version check.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> PersistenceResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> PersistenceResult<()>;
    fn remove(&self, key: &str) -> PersistenceResult<()>;
    fn keys(&self) -> PersistenceResult<Vec<String>>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> PersistenceResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> PersistenceResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> PersistenceResult<()> {
        (**self).remove(key)
    }

    fn keys(&self) -> PersistenceResult<Vec<String>> {
        (**self).keys()
    }
}

/// The reserved keys, one per entity family plus the composed backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Students,
    Classes,
    Payments,
    Backup,
}

impl StorageKey {
    pub const ALL: [StorageKey; 4] = [
        StorageKey::Students,
        StorageKey::Classes,
        StorageKey::Payments,
        StorageKey::Backup,
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            StorageKey::Students => "students",
            StorageKey::Classes => "classes",
            StorageKey::Payments => "payments",
            StorageKey::Backup => "backup",
        }
    }

    pub fn key(&self, config: &PersistenceConfig) -> String {
        config.namespaced(self.suffix())
    }
}

/// Number of UTF-16 code units in `value`, the unit browsers measure
/// local-storage usage in.
pub fn utf16_len(value: &str) -> usize {
    value.encode_utf16().count()
}

pub mod file;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    FileStore, import_students_from_file, read_backup_file, read_student_file,
    write_backup_file, write_csv_export_file,
};
pub use memory::MemoryStore;
