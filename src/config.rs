use crate::persistence::PersistenceResult;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

pub const DEFAULT_NAMESPACE: &str = "taekwondo_";
pub const DEFAULT_CAPACITY_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_SAFE_THRESHOLD_PERCENT: f64 = 90.0;
pub const DEFAULT_BELT: &str = "Blanco (10)";
pub const BACKUP_VERSION: &str = "1.0.0";

/// Tunables for the persistence layer.
///
/// Every field has a default, so a config file only needs to name the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Prefix shared by every key this crate writes.
    pub namespace: String,
    /// Ceiling used by the quota monitor, in UTF-16 code units.
    pub capacity_bytes: usize,
    /// Utilization at or above which `can_store` turns false.
    pub safe_threshold_percent: f64,
    /// Belt assigned to imported students without a belt column.
    pub default_belt: String,
    pub backup_version: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            capacity_bytes: DEFAULT_CAPACITY_BYTES,
            safe_threshold_percent: DEFAULT_SAFE_THRESHOLD_PERCENT,
            default_belt: DEFAULT_BELT.to_string(),
            backup_version: BACKUP_VERSION.to_string(),
        }
    }
}

impl PersistenceConfig {
    pub fn from_json_str(input: &str) -> PersistenceResult<Self> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> PersistenceResult<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }

    pub fn namespaced(&self, suffix: &str) -> String {
        format!("{}{}", self.namespace, suffix)
    }
}
