use crate::config::PersistenceConfig;
use crate::persistence::{KeyValueStore, PersistenceError, PersistenceResult, StorageKey};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

/// A persisted collection together with the time it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: Vec<T>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    data: &'a [T],
    timestamp: DateTime<Utc>,
}

/// Writes typed collections into a [`KeyValueStore`] as JSON envelopes and
/// reads them back, treating anything unreadable as an empty collection.
pub struct RecordSerializer<S> {
    store: S,
    config: PersistenceConfig,
}

impl<S: KeyValueStore> RecordSerializer<S> {
    pub fn new(store: S, config: PersistenceConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// The envelope text `try_save` would write for `items`.
    pub fn encode<T: Serialize>(&self, items: &[T]) -> PersistenceResult<String> {
        let envelope = EnvelopeRef {
            data: items,
            timestamp: Utc::now(),
        };
        Ok(serde_json::to_string(&envelope)?)
    }

    pub fn try_save<T: Serialize>(&self, key: StorageKey, items: &[T]) -> PersistenceResult<()> {
        let json = self.encode(items)?;
        self.store.set(&key.key(&self.config), &json)?;
        debug!(key = key.suffix(), records = items.len(), "saved collection");
        Ok(())
    }

    /// Overwrites the collection under `key`. Failures are logged and
    /// reported as `false`.
    pub fn save<T: Serialize>(&self, key: StorageKey, items: &[T]) -> bool {
        match self.try_save(key, items) {
            Ok(()) => true,
            Err(err) => {
                error!(key = key.suffix(), error = %err, "error saving collection");
                false
            }
        }
    }

    /// Reads the envelope under `key`. `Ok(None)` means nothing is stored;
    /// a stored value that is not an object with a `data` array is
    /// `InvalidData`.
    pub fn try_load_envelope<T: DeserializeOwned>(
        &self,
        key: StorageKey,
    ) -> PersistenceResult<Option<Envelope<T>>> {
        let Some(stored) = self.store.get(&key.key(&self.config))? else {
            return Ok(None);
        };
        let mut value: Value = serde_json::from_str(&stored)?;
        let data = match value.get_mut("data") {
            Some(data) if data.is_array() => data.take(),
            _ => {
                return Err(PersistenceError::InvalidData(format!(
                    "stored {} is not an envelope with a data array",
                    key.suffix()
                )));
            }
        };
        let data: Vec<T> = serde_json::from_value(data)?;
        let timestamp = value
            .get("timestamp")
            .and_then(Value::as_str)
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or_default();
        Ok(Some(Envelope { data, timestamp }))
    }

    /// Reads the collection under `key`, returning an empty one when the key
    /// is absent or its contents are malformed.
    pub fn load<T: DeserializeOwned>(&self, key: StorageKey) -> Vec<T> {
        match self.try_load_envelope(key) {
            Ok(Some(envelope)) => envelope.data,
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(key = key.suffix(), error = %err, "error loading collection");
                Vec::new()
            }
        }
    }

    pub fn saved_at(&self, key: StorageKey) -> Option<DateTime<Utc>> {
        self.try_load_envelope::<Value>(key)
            .ok()
            .flatten()
            .map(|envelope| envelope.timestamp)
    }

    pub fn remove(&self, key: StorageKey) -> PersistenceResult<()> {
        self.store.remove(&key.key(&self.config))
    }
}
