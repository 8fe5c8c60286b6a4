//! Mapa de datos con alcance de workflow.
//!
//! Esquema: claves `String` libres, valores JSON (`serde_json::Value`). Se
//! usa `BTreeMap` para que la serialización sea determinista y el round-trip
//! de persistencia sea exacto.

use std::collections::BTreeMap;

use serde_json::Value;

pub type DataMap = BTreeMap<String, Value>;

/// Merge shallow: las claves de `patch` reemplazan a las de `target`.
pub fn merge_data(target: &mut DataMap, patch: DataMap) {
    for (k, v) in patch {
        target.insert(k, v);
    }
}

/// Construye un `DataMap` a partir de pares clave/valor.
pub fn data_map<I, K, V>(pairs: I) -> DataMap
    where I: IntoIterator<Item = (K, V)>,
          K: Into<String>,
          V: Into<Value>
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

/// Vista JSON (objeto) de un `DataMap`, usada en payloads de eventos.
pub fn data_to_value(data: &DataMap) -> Value {
    Value::Object(data.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}
