use crate::config::PersistenceConfig;
use crate::persistence::{KeyValueStore, PersistenceResult, utf16_len};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Advisory storage utilization. Nothing blocks writes based on this; it is
/// for warning the user before the browser-style quota is hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStatus {
    pub used: usize,
    pub available: usize,
    pub percentage: f64,
    pub can_store: bool,
}

impl StorageStatus {
    pub fn from_usage(used: usize, config: &PersistenceConfig) -> Self {
        let available = config.capacity_bytes;
        let percentage = if available == 0 {
            100.0
        } else {
            used as f64 * 100.0 / available as f64
        };
        Self {
            used,
            available,
            percentage,
            can_store: percentage < config.safe_threshold_percent,
        }
    }

    fn unavailable() -> Self {
        Self {
            used: 0,
            available: 0,
            percentage: 0.0,
            can_store: false,
        }
    }

    pub fn used_kib(&self) -> f64 {
        self.used as f64 / 1024.0
    }

    pub fn to_cli_summary(&self) -> String {
        format!(
            "{:.1}% used ({:.2} KB of {:.2} KB){}",
            self.percentage,
            self.used_kib(),
            self.available as f64 / 1024.0,
            if self.can_store { "" } else { ", storage nearly full" }
        )
    }
}

/// Sum of the UTF-16 lengths of every value stored under the namespace.
pub fn namespace_usage<S: KeyValueStore + ?Sized>(
    store: &S,
    config: &PersistenceConfig,
) -> PersistenceResult<usize> {
    let mut used = 0;
    for key in store.keys()? {
        if !key.starts_with(&config.namespace) {
            continue;
        }
        if let Some(value) = store.get(&key)? {
            used += utf16_len(&value);
        }
    }
    Ok(used)
}

/// Reports usage against the configured ceiling. A store that cannot be
/// read reports zero capacity and `can_store == false`.
pub fn storage_status<S: KeyValueStore + ?Sized>(
    store: &S,
    config: &PersistenceConfig,
) -> StorageStatus {
    match namespace_usage(store, config) {
        Ok(used) => StorageStatus::from_usage(used, config),
        Err(err) => {
            warn!(error = %err, "could not measure storage usage");
            StorageStatus::unavailable()
        }
    }
}
