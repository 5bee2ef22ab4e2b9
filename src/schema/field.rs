use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use super::field_type::FieldType;

/// Violations of the schema invariants, reported when a schema arrives from
/// outside a builder session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("unknown field type: '{0}'")]
    UnknownType(String),
    #[error("fields[{index}]: empty id")]
    EmptyId { index: usize },
    #[error("fields[{index}]: duplicate id '{id}'")]
    DuplicateId { index: usize, id: String },
    #[error("fields[{index}] (id='{id}'): {field_type} requires 'options'")]
    MissingOptions {
        index: usize,
        id: String,
        field_type: FieldType,
    },
    #[error("fields[{index}] (id='{id}'): options must not be empty")]
    EmptyOptions { index: usize, id: String },
    #[error("fields[{index}] (id='{id}'): {field_type} does not take 'options'")]
    UnexpectedOptions {
        index: usize,
        id: String,
        field_type: FieldType,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    // Ignored by the renderer for choice types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

impl FieldDefinition {
    pub fn new(id: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: id.into(),
            field_type,
            label: field_type.default_label(),
            placeholder: Some(String::new()),
            required: false,
            options: field_type.default_options(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.field_type.is_choice() {
            self.options = Some(options.into_iter().map(Into::into).collect());
        }
        self
    }

    pub fn options(&self) -> &[String] {
        self.options.as_deref().unwrap_or(&[])
    }

    pub fn placeholder(&self) -> &str {
        self.placeholder.as_deref().unwrap_or("")
    }

    /// Applies a partial update. An options change is only taken when the
    /// field is a choice type and the new list is non-empty.
    pub(crate) fn merge(&mut self, update: FieldUpdate) {
        if let Some(label) = update.label {
            self.label = label;
        }
        if let Some(placeholder) = update.placeholder {
            self.placeholder = Some(placeholder);
        }
        if let Some(required) = update.required {
            self.required = required;
        }
        if let Some(options) = update.options {
            if self.field_type.is_choice() && !options.is_empty() {
                self.options = Some(options);
            }
        }
    }
}

/// Attribute changes for `SchemaBuilder::update_field`; `None` leaves the
/// attribute untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldUpdate {
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub required: Option<bool>,
    pub options: Option<Vec<String>>,
}

impl FieldUpdate {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn placeholder(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: Some(placeholder.into()),
            ..Default::default()
        }
    }

    pub fn required(required: bool) -> Self {
        Self {
            required: Some(required),
            ..Default::default()
        }
    }

    pub fn options(options: Vec<String>) -> Self {
        Self {
            options: Some(options),
            ..Default::default()
        }
    }
}

/// Ordered field list. Order is the display and submission order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormSchema {
    fields: Vec<FieldDefinition>,
}

impl FormSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a schema from definitions, checking every invariant.
    pub fn from_fields(fields: Vec<FieldDefinition>) -> Result<Self, SchemaError> {
        let schema = Self { fields };
        schema.validate()?;
        Ok(schema)
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.id.as_str())
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut FieldDefinition> {
        self.fields.iter_mut().find(|f| f.id == id)
    }

    pub(crate) fn fields_mut(&mut self) -> &mut Vec<FieldDefinition> {
        &mut self.fields
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for (index, f) in self.fields.iter().enumerate() {
            if f.id.is_empty() {
                return Err(SchemaError::EmptyId { index });
            }
            if !seen.insert(f.id.as_str()) {
                return Err(SchemaError::DuplicateId {
                    index,
                    id: f.id.clone(),
                });
            }
            match (f.field_type.is_choice(), &f.options) {
                (true, None) => {
                    return Err(SchemaError::MissingOptions {
                        index,
                        id: f.id.clone(),
                        field_type: f.field_type,
                    })
                }
                (true, Some(opts)) if opts.is_empty() => {
                    return Err(SchemaError::EmptyOptions {
                        index,
                        id: f.id.clone(),
                    })
                }
                (false, Some(_)) => {
                    return Err(SchemaError::UnexpectedOptions {
                        index,
                        id: f.id.clone(),
                        field_type: f.field_type,
                    })
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a FormSchema {
    type Item = &'a FieldDefinition;
    type IntoIter = std::slice::Iter<'a, FieldDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_wire_shape() {
        let v = json!([
            {"id": "f1", "type": "text", "label": "Name", "placeholder": "", "required": true},
            {"id": "f2", "type": "checkbox", "label": "Tags", "required": false, "options": ["A", "B"]}
        ]);
        let schema: FormSchema = serde_json::from_value(v).unwrap();
        assert_eq!(schema.len(), 2);
        assert!(schema.validate().is_ok());
        assert_eq!(schema.fields()[1].options(), ["A", "B"]);
        assert_eq!(schema.position("f2"), Some(1));
    }

    #[test]
    fn serializes_type_key_and_omits_absent_options() {
        let f = FieldDefinition::new("f1", FieldType::Email);
        let v = serde_json::to_value(&f).unwrap();
        assert_eq!(v["type"], "email");
        assert!(v.get("options").is_none());
        assert_eq!(v["label"], "New email field");
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let err = FormSchema::from_fields(vec![
            FieldDefinition::new("a", FieldType::Text),
            FieldDefinition::new("a", FieldType::Number),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateId {
                index: 1,
                id: "a".into()
            }
        );
        assert!(err.to_string().contains("fields[1]"));
    }

    #[test]
    fn validate_enforces_options_iff_choice() {
        let mut select = FieldDefinition::new("s", FieldType::Select);
        select.options = None;
        assert!(matches!(
            FormSchema::from_fields(vec![select.clone()]),
            Err(SchemaError::MissingOptions { .. })
        ));
        select.options = Some(vec![]);
        assert!(matches!(
            FormSchema::from_fields(vec![select]),
            Err(SchemaError::EmptyOptions { .. })
        ));
        let mut text = FieldDefinition::new("t", FieldType::Text);
        text.options = Some(vec!["x".into()]);
        assert!(matches!(
            FormSchema::from_fields(vec![text]),
            Err(SchemaError::UnexpectedOptions { .. })
        ));
    }

    #[test]
    fn merge_ignores_options_that_would_break_invariant() {
        let mut text = FieldDefinition::new("t", FieldType::Text);
        text.merge(FieldUpdate::options(vec!["x".into()]));
        assert!(text.options.is_none());

        let mut radio = FieldDefinition::new("r", FieldType::Radio);
        radio.merge(FieldUpdate::options(vec![]));
        assert_eq!(radio.options(), ["Option 1", "Option 2"]);
        radio.merge(FieldUpdate {
            label: Some("Size".into()),
            required: Some(true),
            ..Default::default()
        });
        assert_eq!(radio.label, "Size");
        assert!(radio.required);
    }
}
