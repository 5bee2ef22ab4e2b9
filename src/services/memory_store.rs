use anyhow::Context;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Mutex;
use uuid::Uuid;

use super::store::{FormStore, StoreError, StoreResult};
use crate::schema::{
    CreateFormRequest, FieldDefinition, FieldType, Form, FormResponse, FormSchema,
    ResponseMap, ResponseValue, SubmitReceipt, SubmitResponseRequest, UpdateFormRequest,
};

#[derive(Default)]
struct Tables {
    forms: Vec<Form>,
    responses: Vec<FormResponse>,
}

/// In-process collaborator. Forms keep insertion order.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

fn poisoned() -> StoreError {
    StoreError::Transport("memory store lock poisoned".into())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with one sample form and a couple of responses.
    pub fn with_demo_data() -> Self {
        let store = Self::new();
        if let Err(e) = store.seed_demo() {
            tracing::warn!(error = %format!("{e:#}"), "demo data not loaded");
        }
        store
    }

    fn seed_demo(&self) -> anyhow::Result<()> {
        let fields = vec![
            FieldDefinition::new("field_1", FieldType::Text)
                .with_label("Full name")
                .required(true),
            FieldDefinition::new("field_2", FieldType::Email)
                .with_label("Email")
                .required(true),
            FieldDefinition::new("field_3", FieldType::Radio)
                .with_label("How did you hear about us?")
                .with_options(["Friend", "Search", "Other"]),
            FieldDefinition::new("field_4", FieldType::Checkbox)
                .with_label("Interests")
                .with_options(["Rust", "Terminals", "Forms"]),
            FieldDefinition::new("field_5", FieldType::Textarea).with_label("Comments"),
        ];
        let req = CreateFormRequest {
            title: "Event feedback".into(),
            description: Some("Tell us how it went".into()),
            fields: FormSchema::from_fields(fields)?,
        };
        let form = self.create_form(&req).context("creating demo form")?;
        let samples: [(&str, &str, &str, &[&str]); 2] = [
            ("Ada Lovelace", "ada@example.com", "Friend", &["Rust", "Forms"]),
            ("Grace Hopper", "grace@example.com", "Search", &["Terminals"]),
        ];
        for (name, email, heard, interests) in samples {
            let mut responses = ResponseMap::new();
            responses.insert("field_1".into(), name.into());
            responses.insert("field_2".into(), email.into());
            responses.insert("field_3".into(), heard.into());
            responses.insert(
                "field_4".into(),
                ResponseValue::Choices(interests.iter().map(|s| s.to_string()).collect()),
            );
            self.submit_response(&SubmitResponseRequest {
                form_id: form.id.clone(),
                responses,
            })
            .context("submitting demo response")?;
        }
        Ok(())
    }
}

impl FormStore for MemoryStore {
    fn list_forms(&self) -> StoreResult<Vec<Form>> {
        let t = self.tables.lock().map_err(|_| poisoned())?;
        Ok(t.forms.clone())
    }

    fn get_form(&self, id: &str) -> StoreResult<Form> {
        let t = self.tables.lock().map_err(|_| poisoned())?;
        t.forms
            .iter()
            .find(|f| f.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("form {id}")))
    }

    fn create_form(&self, req: &CreateFormRequest) -> StoreResult<Form> {
        let now = Utc::now();
        let form = Form {
            id: Uuid::new_v4().to_string(),
            title: req.title.clone(),
            description: req.description.clone().unwrap_or_default(),
            fields: req.fields.clone(),
            created_at: now,
            updated_at: now,
            is_active: true,
        };
        let mut t = self.tables.lock().map_err(|_| poisoned())?;
        t.forms.push(form.clone());
        Ok(form)
    }

    fn update_form(&self, id: &str, req: &UpdateFormRequest) -> StoreResult<Form> {
        let mut t = self.tables.lock().map_err(|_| poisoned())?;
        let form = t
            .forms
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("form {id}")))?;
        if let Some(title) = &req.title {
            form.title = title.clone();
        }
        if let Some(description) = &req.description {
            form.description = description.clone();
        }
        if let Some(fields) = &req.fields {
            form.fields = fields.clone();
        }
        // Keep updated_at strictly after created_at even within one clock tick.
        form.updated_at = Utc::now().max(form.created_at + ChronoDuration::milliseconds(1));
        Ok(form.clone())
    }

    fn delete_form(&self, id: &str) -> StoreResult<()> {
        let mut t = self.tables.lock().map_err(|_| poisoned())?;
        let before = t.forms.len();
        t.forms.retain(|f| f.id != id);
        if t.forms.len() == before {
            return Err(StoreError::NotFound(format!("form {id}")));
        }
        t.responses.retain(|r| r.form_id != id);
        Ok(())
    }

    fn submit_response(&self, req: &SubmitResponseRequest) -> StoreResult<SubmitReceipt> {
        let mut t = self.tables.lock().map_err(|_| poisoned())?;
        if !t.forms.iter().any(|f| f.id == req.form_id) {
            return Err(StoreError::NotFound(format!("form {}", req.form_id)));
        }
        let id = Uuid::new_v4().to_string();
        t.responses.push(FormResponse {
            id: id.clone(),
            form_id: req.form_id.clone(),
            responses: req.responses.clone(),
            submitted_at: Utc::now(),
        });
        Ok(SubmitReceipt {
            message: "Response submitted successfully".into(),
            id,
        })
    }

    fn list_responses(&self, form_id: &str) -> StoreResult<Vec<FormResponse>> {
        let t = self.tables.lock().map_err(|_| poisoned())?;
        Ok(t.responses
            .iter()
            .filter(|r| r.form_id == form_id)
            .cloned()
            .collect())
    }

    fn delete_response(&self, id: &str) -> StoreResult<()> {
        let mut t = self.tables.lock().map_err(|_| poisoned())?;
        let before = t.responses.len();
        t.responses.retain(|r| r.id != id);
        if t.responses.len() == before {
            return Err(StoreError::NotFound(format!("response {id}")));
        }
        Ok(())
    }
}
