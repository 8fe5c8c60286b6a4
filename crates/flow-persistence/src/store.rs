//! Almacenes de estado persistido.
//!
//! `StateStore` es asíncrono: los backends reales (disco, keychain, red)
//! hacen I/O. El backend en memoria guarda el JSON ya codificado para que
//! cada `load` pase por el mismo codec que un backend durable.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::codec::{from_json, to_json};
use crate::error::PersistenceError;
use crate::record::PersistedState;

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save(&self, key: &str, record: &PersistedState) -> Result<(), PersistenceError>;

    async fn load(&self, key: &str) -> Result<Option<PersistedState>, PersistenceError>;

    /// Devuelve `true` si había un registro bajo `key`.
    async fn remove(&self, key: &str) -> Result<bool, PersistenceError>;
}

#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    entries: DashMap<String, String>,
    pretty: bool,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Guarda el JSON indentado (útil para inspección manual).
    pub fn with_pretty(pretty: bool) -> Self {
        Self { entries: DashMap::new(),
               pretty }
    }

    /// JSON tal como quedó almacenado.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn save(&self, key: &str, record: &PersistedState) -> Result<(), PersistenceError> {
        let text = to_json(record, self.pretty)?;
        log::debug!("saving state '{}' ({} bytes)", key, text.len());
        self.entries.insert(key.to_string(), text);
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<PersistedState>, PersistenceError> {
        match self.entries.get(key) {
            Some(entry) => Ok(Some(from_json(entry.value())?)),
            None => Ok(None),
        }
    }

    async fn remove(&self, key: &str) -> Result<bool, PersistenceError> {
        Ok(self.entries.remove(key).is_some())
    }
}
