use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::field_type::ValueShape;

/// A user-entered value: one string, or the checked options of a checkbox
/// group in the order they were checked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseValue {
    Text(String),
    Choices(Vec<String>),
}

impl ResponseValue {
    pub fn shape(&self) -> ValueShape {
        match self {
            ResponseValue::Text(_) => ValueShape::Scalar,
            ResponseValue::Choices(_) => ValueShape::Multi,
        }
    }

    /// Empty string or empty array.
    pub fn is_empty(&self) -> bool {
        match self {
            ResponseValue::Text(s) => s.is_empty(),
            ResponseValue::Choices(v) => v.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseValue::Text(s) => Some(s),
            ResponseValue::Choices(_) => None,
        }
    }

    pub fn as_choices(&self) -> Option<&[String]> {
        match self {
            ResponseValue::Text(_) => None,
            ResponseValue::Choices(v) => Some(v),
        }
    }

    /// Single-line rendering used by tables and CSV cells.
    pub fn display_joined(&self) -> String {
        match self {
            ResponseValue::Text(s) => s.clone(),
            ResponseValue::Choices(v) => v.join(", "),
        }
    }
}

impl From<&str> for ResponseValue {
    fn from(s: &str) -> Self {
        ResponseValue::Text(s.to_string())
    }
}

impl From<String> for ResponseValue {
    fn from(s: String) -> Self {
        ResponseValue::Text(s)
    }
}

impl From<Vec<String>> for ResponseValue {
    fn from(v: Vec<String>) -> Self {
        ResponseValue::Choices(v)
    }
}

/// Field id -> value. A missing key means the field was never touched.
pub type ResponseMap = BTreeMap<String, ResponseValue>;

fn scalar_text(v: Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Decodes stored responses written by other clients: numbers, booleans and
/// objects become text, `null` entries are dropped.
pub(crate) fn lenient_responses<'de, D>(deserializer: D) -> Result<ResponseMap, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    let map = raw
        .into_iter()
        .filter_map(|(id, v)| {
            let value = match v {
                Value::Array(items) => Some(ResponseValue::Choices(
                    items.into_iter().filter_map(scalar_text).collect(),
                )),
                other => scalar_text(other).map(ResponseValue::Text),
            };
            value.map(|v| (id, v))
        })
        .collect();
    Ok(map)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldError {
    Required,
    #[serde(rename = "format")]
    InvalidEmail,
}

impl FieldError {
    pub fn message(self) -> &'static str {
        match self {
            FieldError::Required => "This field is required",
            FieldError::InvalidEmail => "Please enter a valid email address",
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Field id -> validation failure. Empty means the whole schema is valid.
pub type ErrorMap = BTreeMap<String, FieldError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn untagged_values_match_wire_shapes() {
        let m: ResponseMap = serde_json::from_value(json!({
            "f1": "Ada",
            "f2": ["A", "C"],
            "f3": ""
        }))
        .unwrap();
        assert_eq!(m["f1"], ResponseValue::from("Ada"));
        assert_eq!(m["f2"].as_choices().unwrap(), ["A", "C"]);
        assert!(m["f3"].is_empty());
        assert_eq!(serde_json::to_value(&m).unwrap()["f2"], json!(["A", "C"]));
    }

    #[test]
    fn stored_scalars_become_text_and_nulls_are_absent() {
        let m = lenient_responses(json!({
            "age": 42,
            "ok": true,
            "gone": null,
            "pets": ["Cat", 3, null],
            "name": "Ada"
        }))
        .unwrap();
        assert_eq!(m["age"], ResponseValue::from("42"));
        assert_eq!(m["ok"], ResponseValue::from("true"));
        assert!(!m.contains_key("gone"));
        assert_eq!(m["pets"].as_choices().unwrap(), ["Cat", "3"]);
        assert_eq!(m["name"].as_text(), Some("Ada"));
        assert!(lenient_responses(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn joined_display_uses_comma_space() {
        let v = ResponseValue::from(vec!["A".to_string(), "B".to_string()]);
        assert_eq!(v.display_joined(), "A, B");
        assert_eq!(serde_json::to_value(FieldError::InvalidEmail).unwrap(), json!("format"));
        assert_eq!(serde_json::to_value(FieldError::Required).unwrap(), json!("required"));
        assert_eq!(FieldError::Required.to_string(), "This field is required");
    }
}
