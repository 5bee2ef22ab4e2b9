use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::field::SchemaError;

/// Supported input kinds. Every dispatch over field types matches this enum
/// exhaustively, so adding a variant is checked at compile time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Email,
    Number,
    Textarea,
    Select,
    Radio,
    Checkbox,
}

/// Shape of the value a field stores in a response map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueShape {
    Scalar,
    Multi,
}

impl FieldType {
    /// Picker order.
    pub const ALL: [FieldType; 7] = [
        FieldType::Text,
        FieldType::Email,
        FieldType::Number,
        FieldType::Textarea,
        FieldType::Select,
        FieldType::Radio,
        FieldType::Checkbox,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Email => "email",
            FieldType::Number => "number",
            FieldType::Textarea => "textarea",
            FieldType::Select => "select",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
        }
    }

    /// Label shown in the field-type picker.
    pub fn label(self) -> &'static str {
        match self {
            FieldType::Text => "Text Input",
            FieldType::Email => "Email",
            FieldType::Number => "Number",
            FieldType::Textarea => "Textarea",
            FieldType::Select => "Dropdown",
            FieldType::Radio => "Radio Buttons",
            FieldType::Checkbox => "Checkboxes",
        }
    }

    /// Choice types carry an `options` list.
    pub fn is_choice(self) -> bool {
        match self {
            FieldType::Select | FieldType::Radio | FieldType::Checkbox => true,
            FieldType::Text | FieldType::Email | FieldType::Number | FieldType::Textarea => false,
        }
    }

    pub fn value_shape(self) -> ValueShape {
        match self {
            FieldType::Checkbox => ValueShape::Multi,
            FieldType::Text
            | FieldType::Email
            | FieldType::Number
            | FieldType::Textarea
            | FieldType::Select
            | FieldType::Radio => ValueShape::Scalar,
        }
    }

    pub fn default_label(self) -> String {
        format!("New {} field", self.as_str())
    }

    /// Options a freshly added field starts with; `None` for non-choice types.
    pub fn default_options(self) -> Option<Vec<String>> {
        if self.is_choice() {
            Some(vec!["Option 1".to_string(), "Option 2".to_string()])
        } else {
            None
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SchemaError::UnknownType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_types_are_exactly_select_radio_checkbox() {
        let choice: Vec<FieldType> = FieldType::ALL
            .into_iter()
            .filter(|t| t.is_choice())
            .collect();
        assert_eq!(
            choice,
            vec![FieldType::Select, FieldType::Radio, FieldType::Checkbox]
        );
        for t in FieldType::ALL {
            assert_eq!(t.is_choice(), t.default_options().is_some());
        }
    }

    #[test]
    fn only_checkbox_is_multi_valued() {
        for t in FieldType::ALL {
            let expected = if t == FieldType::Checkbox {
                ValueShape::Multi
            } else {
                ValueShape::Scalar
            };
            assert_eq!(t.value_shape(), expected, "{t}");
        }
    }

    #[test]
    fn wire_names_round_trip_through_serde_and_from_str() {
        for t in FieldType::ALL {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
            assert_eq!(t.as_str().parse::<FieldType>().unwrap(), t);
        }
        assert!(matches!(
            "date".parse::<FieldType>(),
            Err(SchemaError::UnknownType(_))
        ));
    }

    #[test]
    fn default_label_uses_wire_name() {
        assert_eq!(FieldType::Radio.default_label(), "New radio field");
        assert_eq!(FieldType::Select.label(), "Dropdown");
    }
}
