//! Typed access to D-Bus property maps.
//!
//! BlueZ hands out `a{sv}` dictionaries. These helpers pull checked Rust
//! values out of them; a missing key and a value of the wrong type both
//! come back as `None`.

use std::collections::HashMap;

use zbus::zvariant::{OwnedValue, Value};

/// Property name -> value, as found in `GetManagedObjects` and
/// `PropertiesChanged` payloads.
pub type PropertyMap = HashMap<String, OwnedValue>;

/// Reads a string (or object path) value.
pub fn as_string(value: &Value<'_>) -> Option<String> {
   match value {
      Value::Str(s) => Some(s.as_str().to_owned()),
      Value::ObjectPath(p) => Some(p.as_str().to_owned()),
      Value::Value(inner) => as_string(inner),
      _ => None,
   }
}

pub fn as_bool(value: &Value<'_>) -> Option<bool> {
   match value {
      Value::Bool(b) => Some(*b),
      Value::Value(inner) => as_bool(inner),
      _ => None,
   }
}

/// Reads an array of strings. A single non-string element rejects the whole
/// array.
pub fn as_string_set(value: &Value<'_>) -> Option<Vec<String>> {
   match value {
      Value::Array(array) => array.iter().map(as_string).collect(),
      Value::Value(inner) => as_string_set(inner),
      _ => None,
   }
}

pub fn get_string(props: &PropertyMap, key: &str) -> Option<String> {
   props.get(key).and_then(|v| as_string(v))
}

pub fn get_bool(props: &PropertyMap, key: &str) -> Option<bool> {
   props.get(key).and_then(|v| as_bool(v))
}

pub fn get_string_set(props: &PropertyMap, key: &str) -> Option<Vec<String>> {
   props.get(key).and_then(|v| as_string_set(v))
}
