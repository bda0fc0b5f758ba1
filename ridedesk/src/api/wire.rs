//! Lenient field decoding for backend payloads.
//!
//! The backend is loose about scalar types: ids and coordinates arrive as
//! numbers or numeric strings, status flags as `1`/`0`, `true`/`false` or
//! `"active"`. It is also loose about names, and a single row may carry
//! several spellings of one field at once (`id` and `driver_id`, `lat` and
//! `latitude`). Entity types therefore decode through [`Row`], which tries
//! each spelling in order and takes the first value that parses, instead of
//! derived field aliases that reject such rows as duplicates.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Why a row could not become an entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("row is not a JSON object")]
    NotAnObject,

    #[error("missing or invalid field '{0}'")]
    Missing(&'static str),
}

/// First-match-wins view over one JSON object.
///
/// Every accessor takes the accepted names in priority order. A name whose
/// value is `null` or does not parse is skipped, so the next spelling still
/// gets a chance.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> Row<'a> {
    pub fn new(value: &'a Value) -> Result<Self, RowError> {
        value
            .as_object()
            .map(|fields| Self { fields })
            .ok_or(RowError::NotAnObject)
    }

    /// First value under `names` that `parse` accepts.
    pub fn first<T>(&self, names: &[&str], parse: impl Fn(&Value) -> Option<T>) -> Option<T> {
        names
            .iter()
            .find_map(|name| self.fields.get(*name).and_then(&parse))
    }

    /// Whether any of `names` is present, even as `null`.
    pub fn has_any(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.fields.contains_key(*name))
    }

    /// A required id.
    pub fn id(&self, names: &[&'static str]) -> Result<u64, RowError> {
        self.first(names, value_to_id)
            .ok_or_else(|| RowError::Missing(primary(names)))
    }

    pub fn opt_id(&self, names: &[&str]) -> Option<u64> {
        self.first(names, value_to_id)
    }

    /// A non-negative count; anything invalid is zero.
    pub fn count(&self, names: &[&str]) -> u64 {
        self.opt_id(names).unwrap_or(0)
    }

    pub fn opt_f64(&self, names: &[&str]) -> Option<f64> {
        self.first(names, value_to_f64)
    }

    pub fn f64_or_zero(&self, names: &[&str]) -> f64 {
        self.opt_f64(names).unwrap_or(0.0)
    }

    pub fn opt_flag(&self, names: &[&str]) -> Option<bool> {
        self.first(names, value_to_flag)
    }

    /// A status flag; missing or unrecognised is `false`.
    pub fn flag(&self, names: &[&str]) -> bool {
        self.opt_flag(names).unwrap_or(false)
    }

    /// Optional text, accepting numbers and bools as text.
    pub fn opt_string(&self, names: &[&str]) -> Option<String> {
        self.first(names, value_to_string)
    }

    /// Text with missing and `null` values as empty.
    pub fn string_or_empty(&self, names: &[&str]) -> String {
        self.opt_string(names).unwrap_or_default()
    }

    /// Text that must be present under one of `names`. A present `null`
    /// reads as empty.
    pub fn required_string(&self, names: &[&'static str]) -> Result<String, RowError> {
        match self.opt_string(names) {
            Some(text) => Ok(text),
            None if self.has_any(names) => Ok(String::new()),
            None => Err(RowError::Missing(primary(names))),
        }
    }

    pub fn opt_timestamp(&self, names: &[&str]) -> Option<DateTime<Utc>> {
        self.first(names, value_to_timestamp)
    }

    /// A serde-decodable value such as a unit enum; `null` and unknown
    /// spellings fall through.
    pub fn decode<T: DeserializeOwned>(&self, names: &[&str]) -> Option<T> {
        self.first(names, |value| <T as Deserialize>::deserialize(value).ok())
    }
}

fn primary(names: &[&'static str]) -> &'static str {
    names.first().copied().unwrap_or("<unnamed>")
}

/// Timestamps in RFC 3339 or `YYYY-MM-DD HH:MM:SS` (UTC) form.
pub fn value_to_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?.trim();
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

pub fn value_to_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn value_to_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

pub fn value_to_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" | "active" | "enabled" | "available" => Some(true),
            "0" | "false" | "no" | "off" | "inactive" | "disabled" | "unavailable" | "" => {
                Some(false)
            }
            _ => None,
        },
        _ => None,
    }
}

pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
    #[serde(rename_all = "lowercase")]
    enum Side {
        Left,
        Right,
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let value = json!({"id": "12", "lat": "24.7136", "status": "1"});
        let row = Row::new(&value).unwrap();
        assert_eq!(row.id(&["id"]), Ok(12));
        assert_eq!(row.opt_f64(&["lat"]), Some(24.7136));
        assert!(row.flag(&["status"]));
    }

    #[test]
    fn test_invalid_coordinate_is_none() {
        let value = json!({"a": "n/a", "b": null});
        let row = Row::new(&value).unwrap();
        assert_eq!(row.opt_f64(&["a"]), None);
        assert_eq!(row.opt_f64(&["b"]), None);
        assert_eq!(row.opt_f64(&["missing"]), None);
    }

    #[test]
    fn test_invalid_id_is_error() {
        let value = json!({"id": "abc"});
        let row = Row::new(&value).unwrap();
        assert_eq!(row.id(&["id"]), Err(RowError::Missing("id")));
    }

    #[test]
    fn test_non_object_row_is_rejected() {
        assert_eq!(Row::new(&json!([1, 2])).err(), Some(RowError::NotAnObject));
        assert_eq!(Row::new(&json!("row")).err(), Some(RowError::NotAnObject));
    }

    #[test]
    fn test_first_spelling_that_parses_wins() {
        let value = json!({"driver_id": 5, "id": 11, "latitude": 24.7, "lat": "24.8"});
        let row = Row::new(&value).unwrap();
        assert_eq!(row.id(&["driver_id", "id"]), Ok(5));
        assert_eq!(row.opt_f64(&["latitude", "lat"]), Some(24.7));
        assert_eq!(row.opt_f64(&["lat", "latitude"]), Some(24.8));
    }

    #[test]
    fn test_null_or_garbled_value_falls_through() {
        let value = json!({"driverId": null, "driver_id": "x", "id": 5, "name": null, "full_name": "Sara Q"});
        let row = Row::new(&value).unwrap();
        assert_eq!(row.id(&["driverId", "driver_id", "id"]), Ok(5));
        assert_eq!(row.opt_string(&["name", "full_name"]).as_deref(), Some("Sara Q"));
    }

    #[test]
    fn test_required_string() {
        let value = json!({"title": null});
        let row = Row::new(&value).unwrap();
        assert_eq!(row.required_string(&["name", "title"]), Ok(String::new()));
        assert_eq!(
            row.required_string(&["phone", "number"]),
            Err(RowError::Missing("phone"))
        );
    }

    #[test]
    fn test_decode_enum_skips_null_and_unknown() {
        let value = json!({"side": null, "kind": "middle", "type": "right"});
        let row = Row::new(&value).unwrap();
        assert_eq!(row.decode::<Side>(&["side"]), None);
        assert_eq!(row.decode::<Side>(&["side", "kind", "type"]), Some(Side::Right));
    }

    #[test]
    fn test_flag_variants() {
        assert_eq!(value_to_flag(&json!(true)), Some(true));
        assert_eq!(value_to_flag(&json!(0)), Some(false));
        assert_eq!(value_to_flag(&json!("active")), Some(true));
        assert_eq!(value_to_flag(&json!("Inactive")), Some(false));
        assert_eq!(value_to_flag(&json!("maybe")), None);
    }

    #[test]
    fn test_timestamps() {
        let rfc = value_to_timestamp(&json!("2024-03-01T08:30:00.000000Z")).unwrap();
        let plain = value_to_timestamp(&json!("2024-03-01 08:30:00")).unwrap();
        assert_eq!(rfc, plain);
        assert_eq!(value_to_timestamp(&json!("yesterday")), None);
        assert_eq!(value_to_timestamp(&json!(12)), None);
    }

    #[test]
    fn test_numbers_as_strings() {
        let value = json!({"phone": 966500000000u64});
        let row = Row::new(&value).unwrap();
        assert_eq!(row.opt_string(&["phone"]).as_deref(), Some("966500000000"));
    }
}
