use super::{KeyValueStore, PersistenceError, PersistenceResult};
use crate::backup::Backup;
use crate::csv_import::CsvImporter;
use crate::student::Student;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

const STUDENT_FILE_EXTENSIONS: [&str; 2] = ["csv", "txt"];

/// Every key held in one JSON object on disk. Each write rewrites the whole
/// file; the last writer wins.
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens `path`, starting empty when the file does not exist yet. An
    /// unreadable store file is copied to `<path>.bak` and the store starts
    /// empty.
    pub fn new<P: AsRef<Path>>(path: P) -> PersistenceResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let text = fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                BTreeMap::new()
            } else {
                match serde_json::from_str(&text) {
                    Ok(entries) => entries,
                    Err(err) => {
                        let backup = sibling(&path, "bak");
                        fs::copy(&path, &backup)?;
                        warn!(
                            path = %path.display(),
                            backup = %backup.display(),
                            error = %err,
                            "store file is malformed, starting empty"
                        );
                        BTreeMap::new()
                    }
                }
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `entries` to a sibling temp file and renames it over the store
    /// file, so readers see either the old or the new document.
    fn flush(&self, entries: &BTreeMap<String, String>) -> PersistenceResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = sibling(&self.path, "tmp");
        let written = File::create(&tmp)
            .map_err(PersistenceError::from)
            .and_then(|file| {
                let mut writer = BufWriter::new(file);
                serde_json::to_writer_pretty(&mut writer, entries)?;
                writer.flush()?;
                writer.get_ref().sync_all()?;
                Ok(())
            })
            .and_then(|()| Ok(fs::rename(&tmp, &self.path)?));
        if written.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        written
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> PersistenceResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    /// The in-memory view only changes once the file write succeeded.
    fn set(&self, key: &str, value: &str) -> PersistenceResult<()> {
        let mut entries = self.entries.write();
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> PersistenceResult<()> {
        let mut entries = self.entries.write();
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn keys(&self) -> PersistenceResult<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}

pub fn write_backup_file<P: AsRef<Path>>(backup: &Backup, path: P) -> PersistenceResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, backup)?;
    Ok(())
}

/// Raw text of a backup file, ready for `BackupService::import_json`.
pub fn read_backup_file<P: AsRef<Path>>(path: P) -> PersistenceResult<String> {
    Ok(fs::read_to_string(path)?)
}

pub fn write_csv_export_file<P: AsRef<Path>>(contents: &str, path: P) -> PersistenceResult<()> {
    fs::write(path, contents)?;
    Ok(())
}

/// Text of a roster file. Only `.csv` and `.txt` files are accepted.
pub fn read_student_file<P: AsRef<Path>>(path: P) -> PersistenceResult<String> {
    let path = path.as_ref();
    let accepted = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            STUDENT_FILE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false);
    if !accepted {
        return Err(PersistenceError::InvalidData(format!(
            "unsupported file type '{}' (expected .csv or .txt)",
            path.display()
        )));
    }
    Ok(fs::read_to_string(path)?)
}

pub fn import_students_from_file<P: AsRef<Path>>(
    path: P,
    importer: &CsvImporter,
) -> PersistenceResult<Vec<Student>> {
    let text = read_student_file(path)?;
    importer
        .parse_students(&text)
        .map_err(|err| PersistenceError::InvalidData(err.to_string()))
}
