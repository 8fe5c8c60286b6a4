//! Codec JSON del registro persistido.

use crate::error::PersistenceError;
use crate::record::PersistedState;

pub fn to_json(record: &PersistedState, pretty: bool) -> Result<String, PersistenceError> {
    let text = if pretty { serde_json::to_string_pretty(record)? } else { serde_json::to_string(record)? };
    Ok(text)
}

pub fn from_json(text: &str) -> Result<PersistedState, PersistenceError> {
    Ok(serde_json::from_str(text)?)
}
