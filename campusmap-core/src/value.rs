//! Loosely-typed remote document values.
//!
//! Remote documents carry arbitrary fields whose presence and representation
//! vary between writers (`current_version` vs `currentVersion`, timestamps as
//! native values, epoch seconds or strings). [`DocValue`] captures every
//! representation explicitly, and the alias helpers at the bottom of this
//! module resolve a field from an ordered list of candidate names.
//!
//! # JSON mapping
//!
//! | JSON                            | DocValue      |
//! |---------------------------------|---------------|
//! | `null`                          | `Null`        |
//! | `true` / `false`                | `Bool`        |
//! | integral number                 | `Integer`     |
//! | other number                    | `Double`      |
//! | string                          | `String`      |
//! | `{"$timestamp": "<rfc3339>"}`   | `Timestamp`   |
//! | array                           | `Array`       |
//! | other object                    | `Map`         |
//!
//! Timestamps encode back to plain RFC 3339 strings.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map as JsonMap, Number, Value};

/// Marker key for an explicit timestamp object in JSON.
pub const TIMESTAMP_KEY: &str = "$timestamp";

/// Field map of a single document.
pub type Fields = BTreeMap<String, DocValue>;

/// A single field value of a remote document.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DocValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Array(Vec<DocValue>),
    Map(Fields),
}

impl DocValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DocValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DocValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DocValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DocValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric value, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DocValue::Integer(n) => Some(*n as f64),
            DocValue::Double(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[DocValue]> {
        match self {
            DocValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Fields> {
        match self {
            DocValue::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// Resolve a point in time from any of the accepted representations:
    /// native timestamp, integer epoch seconds, or an RFC 3339 string.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            DocValue::Timestamp(ts) => Some(*ts),
            DocValue::Integer(secs) => DateTime::from_timestamp(*secs, 0),
            DocValue::String(s) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|ts| ts.with_timezone(&Utc)),
            _ => None,
        }
    }

    /// Scalar rendered as text; `None` for null, arrays and maps.
    pub fn as_scalar_string(&self) -> Option<String> {
        match self {
            DocValue::String(s) => Some(s.clone()),
            DocValue::Integer(n) => Some(n.to_string()),
            DocValue::Double(n) => Some(n.to_string()),
            DocValue::Bool(b) => Some(b.to_string()),
            DocValue::Timestamp(ts) => Some(ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
            DocValue::Null | DocValue::Array(_) | DocValue::Map(_) => None,
        }
    }

    /// Text form used when flattening lists to string lists.
    ///
    /// Scalars use [`as_scalar_string`](Self::as_scalar_string), null becomes
    /// an empty string, nested arrays and maps become compact JSON.
    pub fn to_display_string(&self) -> String {
        match self {
            DocValue::Null => String::new(),
            DocValue::Array(_) | DocValue::Map(_) => self.to_json().to_string(),
            scalar => scalar.as_scalar_string().unwrap_or_default(),
        }
    }

    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => DocValue::Null,
            Value::Bool(b) => DocValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => DocValue::Integer(i),
                None => DocValue::Double(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => DocValue::String(s),
            Value::Array(items) => {
                DocValue::Array(items.into_iter().map(DocValue::from_json).collect())
            }
            Value::Object(map) => {
                if let Some(ts) = timestamp_object(&map) {
                    return DocValue::Timestamp(ts);
                }
                DocValue::Map(
                    map.into_iter()
                        .map(|(k, v)| (k, DocValue::from_json(v)))
                        .collect(),
                )
            }
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            DocValue::Null => Value::Null,
            DocValue::Bool(b) => Value::Bool(*b),
            DocValue::Integer(n) => Value::Number((*n).into()),
            DocValue::Double(n) => Number::from_f64(*n).map_or(Value::Null, Value::Number),
            DocValue::String(s) => Value::String(s.clone()),
            DocValue::Timestamp(ts) => {
                Value::String(ts.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            DocValue::Array(items) => Value::Array(items.iter().map(DocValue::to_json).collect()),
            DocValue::Map(fields) => fields_to_json(fields),
        }
    }
}

fn timestamp_object(map: &JsonMap<String, Value>) -> Option<DateTime<Utc>> {
    if map.len() != 1 {
        return None;
    }
    let raw = map.get(TIMESTAMP_KEY)?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

impl From<&str> for DocValue {
    fn from(s: &str) -> Self {
        DocValue::String(s.to_owned())
    }
}

impl From<String> for DocValue {
    fn from(s: String) -> Self {
        DocValue::String(s)
    }
}

impl From<bool> for DocValue {
    fn from(b: bool) -> Self {
        DocValue::Bool(b)
    }
}

impl From<i64> for DocValue {
    fn from(n: i64) -> Self {
        DocValue::Integer(n)
    }
}

impl From<f64> for DocValue {
    fn from(n: f64) -> Self {
        DocValue::Double(n)
    }
}

impl From<DateTime<Utc>> for DocValue {
    fn from(ts: DateTime<Utc>) -> Self {
        DocValue::Timestamp(ts)
    }
}

impl Serialize for DocValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DocValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(DocValue::from_json)
    }
}

// ---------------------------------------------------------------------------
// Field maps
// ---------------------------------------------------------------------------

/// Convert a JSON object into a field map. Non-objects yield `None`.
pub fn fields_from_json(value: Value) -> Option<Fields> {
    match DocValue::from_json(value) {
        DocValue::Map(fields) => Some(fields),
        _ => None,
    }
}

pub fn fields_to_json(fields: &Fields) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Alias resolution
// ---------------------------------------------------------------------------

/// First alias (in order) holding a scalar value, rendered as text.
///
/// Null and non-scalar values are skipped so a later alias can still match.
pub fn first_string(fields: &Fields, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|alias| fields.get(*alias))
        .find_map(DocValue::as_scalar_string)
}

/// First alias (in order) whose value resolves to a timestamp.
pub fn first_timestamp(fields: &Fields, aliases: &[&str]) -> Option<DateTime<Utc>> {
    aliases
        .iter()
        .filter_map(|alias| fields.get(*alias))
        .find_map(DocValue::as_timestamp)
}

/// First alias (in order) holding a number.
pub fn first_f64(fields: &Fields, aliases: &[&str]) -> Option<f64> {
    aliases
        .iter()
        .filter_map(|alias| fields.get(*alias))
        .find_map(DocValue::as_f64)
}

/// First alias (in order) holding a boolean.
pub fn first_bool(fields: &Fields, aliases: &[&str]) -> Option<bool> {
    aliases
        .iter()
        .filter_map(|alias| fields.get(*alias))
        .find_map(DocValue::as_bool)
}

/// First alias (in order) holding an array, flattened to strings.
pub fn first_string_list(fields: &Fields, aliases: &[&str]) -> Option<Vec<String>> {
    aliases
        .iter()
        .filter_map(|alias| fields.get(*alias))
        .find_map(DocValue::as_array)
        .map(|items| items.iter().map(DocValue::to_display_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        fields_from_json(value).expect("object")
    }

    #[test]
    fn json_numbers_split_into_integer_and_double() {
        assert_eq!(DocValue::from_json(json!(3)), DocValue::Integer(3));
        assert_eq!(DocValue::from_json(json!(3.5)), DocValue::Double(3.5));
    }

    #[test]
    fn timestamp_marker_object_decodes_to_timestamp() {
        let value = DocValue::from_json(json!({"$timestamp": "2024-05-01T10:00:00Z"}));
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(value, DocValue::Timestamp(expected));
        assert_eq!(value.to_json(), json!("2024-05-01T10:00:00Z"));
    }

    #[test]
    fn marker_with_extra_keys_stays_a_map() {
        let value = DocValue::from_json(json!({"$timestamp": "2024-05-01T10:00:00Z", "x": 1}));
        assert!(value.as_map().is_some());
    }

    #[rstest]
    #[case(json!({"$timestamp": "2024-05-01T10:00:00Z"}))]
    #[case(json!(1_714_557_600))]
    #[case(json!("2024-05-01T10:00:00Z"))]
    #[case(json!("2024-05-01T12:00:00+02:00"))]
    fn timestamp_accepts_every_representation(#[case] raw: Value) {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(DocValue::from_json(raw).as_timestamp(), Some(expected));
    }

    #[rstest]
    #[case(json!("yesterday"))]
    #[case(json!(true))]
    #[case(json!(null))]
    #[case(json!([1, 2]))]
    fn timestamp_rejects_unparseable_values(#[case] raw: Value) {
        assert_eq!(DocValue::from_json(raw).as_timestamp(), None);
    }

    #[test]
    fn first_string_honours_alias_order() {
        let f = fields(json!({"version": "v9", "current_version": "v2"}));
        assert_eq!(
            first_string(&f, &["current_version", "currentVersion", "version"]),
            Some("v2".to_string())
        );
    }

    #[test]
    fn first_string_skips_null_and_nested_values() {
        let f = fields(json!({"current_version": null, "currentVersion": {"a": 1}, "version": 4}));
        assert_eq!(
            first_string(&f, &["current_version", "currentVersion", "version"]),
            Some("4".to_string())
        );
    }

    #[test]
    fn first_timestamp_falls_through_unparseable_alias() {
        let f = fields(json!({"last_updated": "not a date", "lastUpdated": 0}));
        assert_eq!(
            first_timestamp(&f, &["last_updated", "lastUpdated"]),
            DateTime::from_timestamp(0, 0)
        );
    }

    #[rstest]
    #[case(json!({"a": true, "b": false}), Some(true))]
    #[case(json!({"a": "true", "b": false}), Some(false))]
    #[case(json!({"a": 1}), None)]
    fn first_bool_takes_first_real_boolean(#[case] raw: Value, #[case] expected: Option<bool>) {
        assert_eq!(first_bool(&fields(raw), &["a", "b"]), expected);
    }

    #[test]
    fn string_list_flattens_mixed_items() {
        let f = fields(json!({"tags": ["a", 2, true, null, {"k": "v"}]}));
        assert_eq!(
            first_string_list(&f, &["tags"]),
            Some(vec![
                "a".to_string(),
                "2".to_string(),
                "true".to_string(),
                String::new(),
                r#"{"k":"v"}"#.to_string(),
            ])
        );
    }

    #[test]
    fn serde_goes_through_json_mapping() {
        let f = fields(json!({"n": 1, "s": "x", "nested": {"b": false}}));
        let text = serde_json::to_string(&f).expect("serialize");
        let back: Fields = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(back, f);
    }
}
