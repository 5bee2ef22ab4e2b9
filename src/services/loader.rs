use crate::app::FormPurpose;
use crate::schema::{CreateFormRequest, SubmitResponseRequest, UpdateFormRequest};
use crate::services::store::{FormStore, StoreError, StoreRef};
use crate::ui::{LoadKind, LoadMsg, LoadOutcome};
use std::sync::mpsc::Sender;
use std::thread;
use tracing::{debug, warn};

pub const LOAD_FORMS_FAILED: &str = "Failed to load forms";
pub const LOAD_FORM_FAILED: &str = "Failed to load form";
pub const FORM_UNAVAILABLE: &str = "Form not found or no longer available.";
pub const CREATE_FORM_FAILED: &str = "Failed to create form";
pub const UPDATE_FORM_FAILED: &str = "Failed to update form";
pub const DELETE_FORM_FAILED: &str = "Failed to delete form";
pub const LOAD_RESPONSES_FAILED: &str = "Failed to load form responses";
pub const DELETE_RESPONSE_FAILED: &str = "Failed to delete response";
pub const SUBMIT_FAILED: &str = crate::schema::renderer::SUBMIT_FAILED;

// The screen gets the short message; the cause goes to the log.
fn fail(msg: &str, e: StoreError) -> String {
    warn!(error = %e, "{msg}");
    msg.to_string()
}

pub(crate) fn list_forms(store: &dyn FormStore) -> Result<LoadOutcome, String> {
    store
        .list_forms()
        .map(LoadOutcome::Forms)
        .map_err(|e| fail(LOAD_FORMS_FAILED, e))
}

pub(crate) fn get_form(
    store: &dyn FormStore,
    id: &str,
    purpose: FormPurpose,
) -> Result<LoadOutcome, String> {
    let msg = match purpose {
        FormPurpose::Edit => LOAD_FORM_FAILED,
        FormPurpose::Fill => FORM_UNAVAILABLE,
    };
    store
        .get_form(id)
        .map(LoadOutcome::Form)
        .map_err(|e| fail(msg, e))
}

/// Form and its responses in one job, since the responses screen needs both.
pub(crate) fn load_responses(store: &dyn FormStore, form_id: &str) -> Result<LoadOutcome, String> {
    let form = store
        .get_form(form_id)
        .map_err(|e| fail(LOAD_RESPONSES_FAILED, e))?;
    let responses = store
        .list_responses(form_id)
        .map_err(|e| fail(LOAD_RESPONSES_FAILED, e))?;
    Ok(LoadOutcome::Responses { form, responses })
}

pub(crate) fn save_form(
    store: &dyn FormStore,
    id: Option<&str>,
    req: CreateFormRequest,
) -> Result<LoadOutcome, String> {
    match id {
        Some(id) => store
            .update_form(id, &UpdateFormRequest::from(req))
            .map(LoadOutcome::Saved)
            .map_err(|e| fail(UPDATE_FORM_FAILED, e)),
        None => store
            .create_form(&req)
            .map(LoadOutcome::Saved)
            .map_err(|e| fail(CREATE_FORM_FAILED, e)),
    }
}

pub(crate) fn delete_form(store: &dyn FormStore, id: &str) -> Result<LoadOutcome, String> {
    store
        .delete_form(id)
        .map(|_| LoadOutcome::Deleted(id.to_string()))
        .map_err(|e| fail(DELETE_FORM_FAILED, e))
}

pub(crate) fn submit_response(
    store: &dyn FormStore,
    req: &SubmitResponseRequest,
) -> Result<LoadOutcome, String> {
    store
        .submit_response(req)
        .map(LoadOutcome::Submitted)
        .map_err(|e| fail(SUBMIT_FAILED, e))
}

pub(crate) fn delete_response(store: &dyn FormStore, id: &str) -> Result<LoadOutcome, String> {
    store
        .delete_response(id)
        .map(|_| LoadOutcome::Deleted(id.to_string()))
        .map_err(|e| fail(DELETE_RESPONSE_FAILED, e))
}

/// Runs one collaborator call off the UI thread and posts the outcome.
pub(crate) fn spawn_store_call<F>(
    store: StoreRef,
    key: String,
    kind: LoadKind,
    tx: Sender<LoadMsg>,
    job: F,
) where
    F: FnOnce(&dyn FormStore) -> Result<LoadOutcome, String> + Send + 'static,
{
    thread::spawn(move || {
        debug!(%key, "store call");
        let outcome = job(store.as_ref());
        let _ = tx.send(LoadMsg { key, outcome, kind });
    });
}
