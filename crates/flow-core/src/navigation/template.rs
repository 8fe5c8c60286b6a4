//! Resolución de plantillas de parámetros de navegación.
//!
//! Un placeholder `{{clave}}` se sustituye por `data[clave]`. Si el string es
//! exactamente un placeholder, se conserva el tipo JSON del valor; si va
//! embebido en texto se interpola su forma textual. Los placeholders sin
//! valor se dejan tal cual.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::model::DataMap;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{\s*([^{}\s]+)\s*\}\}").expect("valid placeholder regex"));
static WHOLE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{\{\s*([^{}\s]+)\s*\}\}$").expect("valid placeholder regex"));

pub fn resolve_params(template: &DataMap, data: &DataMap) -> DataMap {
    template.iter().map(|(k, v)| (k.clone(), resolve_value(v, data))).collect()
}

pub fn resolve_value(value: &Value, data: &DataMap) -> Value {
    match value {
        Value::String(s) => resolve_str(s, data),
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve_value(v, data)).collect()),
        Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), resolve_value(v, data))).collect()),
        other => other.clone(),
    }
}

fn resolve_str(s: &str, data: &DataMap) -> Value {
    if let Some(found) = WHOLE_PLACEHOLDER.captures(s).and_then(|c| data.get(&c[1])) {
        return found.clone();
    }
    let replaced = PLACEHOLDER.replace_all(s, |caps: &Captures| match data.get(&caps[1]) {
                                  Some(Value::String(text)) => text.clone(),
                                  Some(other) => other.to_string(),
                                  None => caps[0].to_string(),
                              });
    Value::String(replaced.into_owned())
}
