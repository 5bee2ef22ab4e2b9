//! Fill-in session over a read-only schema: response state, error state,
//! per-type value handling and submit gating.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, warn};

use super::field::FormSchema;
use super::field_type::{FieldType, ValueShape};
use super::response::{ErrorMap, FieldError, ResponseMap, ResponseValue};

pub const SUBMIT_FAILED: &str = "Failed to submit form. Please try again.";
pub const PREVIEW_SUBMITTED: &str =
    "This is a preview! In the actual form, this would be submitted to the server.";

static EMAIL_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn email_is_valid(s: &str) -> bool {
    EMAIL_RE
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
        .map(|re| re.is_match(s))
        .unwrap_or(false)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Editable,
    Submitting,
    Submitted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
    Live,
    /// Validates like a live form but never reaches the collaborator.
    Preview,
}

/// Result of asking the session to start a submission.
#[derive(Clone, Debug, PartialEq)]
pub enum SubmitGate {
    /// Not editable right now (already submitting or submitted).
    Busy,
    /// Validation failed; the error map is populated.
    Invalid,
    /// Preview session passed validation.
    Previewed,
    /// Valid; the payload to hand to the collaborator. Phase is now `Submitting`.
    Ready(ResponseMap),
}

// Invalid and Previewed only come out of the blocking `submit`.
#[allow(dead_code)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitStatus {
    Busy,
    Invalid,
    Previewed,
    Submitted,
    Failed,
}

/// Validation over a schema and a response map. Fields are visited in schema
/// order and each gets at most one error.
pub fn compute_errors(schema: &FormSchema, responses: &ResponseMap) -> ErrorMap {
    let mut errors = ErrorMap::new();
    for field in schema {
        let value = responses.get(&field.id);
        let present = value.map(|v| !v.is_empty()).unwrap_or(false);
        if field.required && !present {
            errors.insert(field.id.clone(), FieldError::Required);
            continue;
        }
        match field.field_type {
            FieldType::Email => {
                if let Some(s) = value.and_then(ResponseValue::as_text) {
                    if !s.is_empty() && !email_is_valid(s) {
                        errors.insert(field.id.clone(), FieldError::InvalidEmail);
                    }
                }
            }
            FieldType::Text
            | FieldType::Number
            | FieldType::Textarea
            | FieldType::Select
            | FieldType::Radio
            | FieldType::Checkbox => {}
        }
    }
    errors
}

#[derive(Clone, Debug)]
pub struct FormSession {
    schema: FormSchema,
    responses: ResponseMap,
    errors: ErrorMap,
    phase: SessionPhase,
    mode: SessionMode,
    notice: Option<String>,
}

impl FormSession {
    pub fn new(schema: FormSchema) -> Self {
        Self::with_mode(schema, SessionMode::Live)
    }

    pub fn preview(schema: FormSchema) -> Self {
        Self::with_mode(schema, SessionMode::Preview)
    }

    fn with_mode(schema: FormSchema, mode: SessionMode) -> Self {
        Self {
            schema,
            responses: ResponseMap::new(),
            errors: ErrorMap::new(),
            phase: SessionPhase::Editable,
            mode,
            notice: None,
        }
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    #[cfg(test)]
    pub fn responses(&self) -> &ResponseMap {
        &self.responses
    }

    #[cfg(test)]
    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn error_for(&self, field_id: &str) -> Option<FieldError> {
        self.errors.get(field_id).copied()
    }

    pub fn value(&self, field_id: &str) -> Option<&ResponseValue> {
        self.responses.get(field_id)
    }

    pub fn text(&self, field_id: &str) -> &str {
        self.value(field_id)
            .and_then(ResponseValue::as_text)
            .unwrap_or("")
    }

    pub fn is_checked(&self, field_id: &str, option: &str) -> bool {
        self.value(field_id)
            .and_then(ResponseValue::as_choices)
            .map(|c| c.iter().any(|o| o == option))
            .unwrap_or(false)
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_preview(&self) -> bool {
        self.mode == SessionMode::Preview
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Stores a value whose shape matches the field. Unknown ids, shape
    /// mismatches and edits outside the `Editable` phase are ignored.
    pub fn set_value(&mut self, field_id: &str, value: ResponseValue) -> bool {
        if self.phase != SessionPhase::Editable {
            return false;
        }
        let Some(field) = self.schema.get(field_id) else {
            return false;
        };
        if field.field_type.value_shape() != value.shape() {
            return false;
        }
        self.responses.insert(field_id.to_string(), value);
        self.errors.remove(field_id);
        true
    }

    pub fn set_text(&mut self, field_id: &str, text: impl Into<String>) -> bool {
        self.set_value(field_id, ResponseValue::Text(text.into()))
    }

    /// Selects one option of a dropdown or radio group.
    pub fn choose(&mut self, field_id: &str, option: &str) -> bool {
        match self.schema.get(field_id).map(|f| f.field_type) {
            Some(FieldType::Select | FieldType::Radio) => self.set_text(field_id, option),
            _ => false,
        }
    }

    /// Checks or unchecks one checkbox option. Checked values keep the order
    /// they were checked in.
    pub fn toggle_option(&mut self, field_id: &str, option: &str) -> bool {
        let Some(field) = self.schema.get(field_id) else {
            return false;
        };
        if field.field_type.value_shape() != ValueShape::Multi {
            return false;
        }
        let mut checked: Vec<String> = self
            .value(field_id)
            .and_then(ResponseValue::as_choices)
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        if let Some(pos) = checked.iter().position(|o| o == option) {
            checked.remove(pos);
        } else {
            checked.push(option.to_string());
        }
        self.set_value(field_id, ResponseValue::Choices(checked))
    }

    /// Recomputes the whole error map, replacing the previous one.
    pub fn validate(&mut self) -> &ErrorMap {
        self.errors = compute_errors(&self.schema, &self.responses);
        &self.errors
    }

    pub fn begin_submit(&mut self) -> SubmitGate {
        if self.phase != SessionPhase::Editable {
            return SubmitGate::Busy;
        }
        if !self.validate().is_empty() {
            debug!(errors = self.errors.len(), "submit blocked by validation");
            return SubmitGate::Invalid;
        }
        match self.mode {
            SessionMode::Preview => {
                self.notice = Some(PREVIEW_SUBMITTED.to_string());
                SubmitGate::Previewed
            }
            SessionMode::Live => {
                self.notice = None;
                self.phase = SessionPhase::Submitting;
                SubmitGate::Ready(self.responses.clone())
            }
        }
    }

    /// Applies the collaborator's outcome. Success discards the responses;
    /// failure returns to `Editable` with a notice.
    pub fn finish_submit<E: fmt::Display>(&mut self, result: Result<(), E>) -> SubmitStatus {
        if self.phase != SessionPhase::Submitting {
            return SubmitStatus::Busy;
        }
        match result {
            Ok(()) => {
                self.phase = SessionPhase::Submitted;
                self.responses.clear();
                self.errors.clear();
                SubmitStatus::Submitted
            }
            Err(e) => {
                warn!(error = %e, "submit failed");
                self.phase = SessionPhase::Editable;
                self.notice = Some(SUBMIT_FAILED.to_string());
                SubmitStatus::Failed
            }
        }
    }

    /// Synchronous submit: validates, then calls `send` only when valid.
    /// The UI uses the split form because the store call runs off-thread.
    #[allow(dead_code)]
    pub fn submit<F, E>(&mut self, send: F) -> SubmitStatus
    where
        F: FnOnce(&ResponseMap) -> Result<(), E>,
        E: fmt::Display,
    {
        match self.begin_submit() {
            SubmitGate::Busy => SubmitStatus::Busy,
            SubmitGate::Invalid => SubmitStatus::Invalid,
            SubmitGate::Previewed => SubmitStatus::Previewed,
            SubmitGate::Ready(payload) => {
                let result = send(&payload);
                self.finish_submit(result)
            }
        }
    }
}
