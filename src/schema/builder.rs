//! Interactive schema editing.
//!
//! `SchemaBuilder` owns the schema for one editing session together with the
//! id of the field currently open for property editing. Every operation is
//! synchronous; operations that cannot apply leave the schema untouched and
//! report `false`.

use thiserror::Error;
use tracing::debug;

use super::field::{FieldDefinition, FieldUpdate, FormSchema, SchemaError};
use super::field_type::FieldType;
use super::resource::CreateFormRequest;

#[derive(Clone, Debug, Default)]
pub struct SchemaBuilder {
    schema: FormSchema,
    selected: Option<String>,
    next_seq: u64,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session over an existing schema after checking its invariants.
    pub fn from_schema(schema: FormSchema) -> Result<Self, SchemaError> {
        schema.validate()?;
        Ok(Self {
            schema,
            selected: None,
            next_seq: 0,
        })
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    fn next_id(&mut self) -> String {
        loop {
            self.next_seq += 1;
            let id = format!("field_{}", self.next_seq);
            if !self.schema.contains(&id) {
                return id;
            }
        }
    }

    pub fn add_field(&mut self, field_type: FieldType) -> &FormSchema {
        let id = self.next_id();
        debug!(%id, %field_type, "add field");
        self.schema
            .fields_mut()
            .push(FieldDefinition::new(id, field_type));
        &self.schema
    }

    pub fn update_field(&mut self, id: &str, update: FieldUpdate) -> bool {
        match self.schema.get_mut(id) {
            Some(field) => {
                field.merge(update);
                true
            }
            None => false,
        }
    }

    pub fn remove_field(&mut self, id: &str) -> bool {
        let Some(pos) = self.schema.position(id) else {
            return false;
        };
        self.schema.fields_mut().remove(pos);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        true
    }

    /// Moves one field from `source` to `destination`, shifting the fields in
    /// between. `None` is a cancelled drop.
    pub fn reorder_fields(&mut self, source: usize, destination: Option<usize>) -> bool {
        let Some(dest) = destination else {
            return false;
        };
        let len = self.schema.len();
        if source >= len || dest >= len || source == dest {
            return false;
        }
        let fields = self.schema.fields_mut();
        let moved = fields.remove(source);
        fields.insert(dest, moved);
        true
    }

    pub fn add_option(&mut self, field_id: &str) -> bool {
        match self.schema.get_mut(field_id) {
            Some(field) if field.field_type.is_choice() => {
                let options = field.options.get_or_insert_with(Vec::new);
                let label = format!("Option {}", options.len() + 1);
                options.push(label);
                true
            }
            _ => false,
        }
    }

    pub fn update_option(&mut self, field_id: &str, index: usize, value: impl Into<String>) -> bool {
        let Some(slot) = self
            .schema
            .get_mut(field_id)
            .and_then(|f| f.options.as_mut())
            .and_then(|opts| opts.get_mut(index))
        else {
            return false;
        };
        *slot = value.into();
        true
    }

    /// Removes an option unless it is the last one.
    pub fn remove_option(&mut self, field_id: &str, index: usize) -> bool {
        match self.schema.get_mut(field_id).and_then(|f| f.options.as_mut()) {
            Some(opts) if opts.len() > 1 && index < opts.len() => {
                opts.remove(index);
                true
            }
            _ => false,
        }
    }

    pub fn select(&mut self, id: &str) -> bool {
        if self.schema.contains(id) {
            self.selected = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_field(&self) -> Option<&FieldDefinition> {
        self.selected.as_deref().and_then(|id| self.schema.get(id))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    #[error("Form title is required")]
    TitleRequired,
    #[error("At least one field is required")]
    NoFields,
    #[error("Add some fields to preview the form")]
    NothingToPreview,
}

/// Snapshot handed to a preview session.
#[derive(Clone, Debug, PartialEq)]
pub struct FormPreview {
    pub title: String,
    pub description: String,
    pub fields: FormSchema,
}

/// A form under construction: title, description and its schema builder.
#[derive(Clone, Debug, Default)]
pub struct FormDraft {
    pub title: String,
    pub description: String,
    pub builder: SchemaBuilder,
}

impl FormDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(
        title: impl Into<String>,
        description: impl Into<String>,
        schema: FormSchema,
    ) -> Result<Self, SchemaError> {
        Ok(Self {
            title: title.into(),
            description: description.into(),
            builder: SchemaBuilder::from_schema(schema)?,
        })
    }

    pub fn to_request(&self) -> Result<CreateFormRequest, DraftError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(DraftError::TitleRequired);
        }
        if self.builder.schema().is_empty() {
            return Err(DraftError::NoFields);
        }
        Ok(CreateFormRequest {
            title: title.to_string(),
            description: Some(self.description.trim().to_string()),
            fields: self.builder.schema().clone(),
        })
    }

    pub fn preview(&self) -> Result<FormPreview, DraftError> {
        if self.builder.schema().is_empty() {
            return Err(DraftError::NothingToPreview);
        }
        let title = if self.title.is_empty() {
            "Untitled Form".to_string()
        } else {
            self.title.clone()
        };
        Ok(FormPreview {
            title,
            description: self.description.clone(),
            fields: self.builder.schema().clone(),
        })
    }
}
