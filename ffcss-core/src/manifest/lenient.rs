//! Deserializers accepting any YAML scalar where a string is expected.
//!
//! Manifest authors write `firefox: 90` or `commit: 12345678` and mean the
//! text, not the number.

use serde::de::Error;
use serde::{Deserialize, Deserializer};
use serde_yaml_ng::Value;

fn scalar_text<E: Error>(value: Value) -> Result<Option<String>, E> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text)),
        Value::Number(number) => Ok(Some(number.to_string())),
        Value::Bool(flag) => Ok(Some(flag.to_string())),
        other => Err(E::custom(format!("expected a string, found {other:?}"))),
    }
}

/// A scalar as text, `null` becoming the empty string
pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(scalar_text(Value::deserialize(deserializer)?)?.unwrap_or_default())
}

pub fn optional_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    scalar_text(Value::deserialize(deserializer)?)
}
