//! Serde helper para timestamps en forma textual ordenable.
//!
//! RFC 3339 en UTC con nanosegundos fijos (`2024-01-01T00:00:00.000000000Z`):
//! el orden lexicográfico coincide con el cronológico y el round-trip es
//! exacto.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer};

pub fn format(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer
{
    serializer.serialize_str(&format(ts))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where D: Deserializer<'de>
{
    let raw = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&raw).map(|ts| ts.with_timezone(&Utc))
                                      .map_err(serde::de::Error::custom)
}
