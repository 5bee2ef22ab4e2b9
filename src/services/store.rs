use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::model::{StoreConfig, StoreKind};
use crate::schema::{
    CreateFormRequest, Form, FormResponse, SubmitReceipt, SubmitResponseRequest,
    UpdateFormRequest,
};

/// Failure reported by a persistence collaborator. Calls are single attempts;
/// callers surface these and never retry.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("server returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid payload: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            StoreError::Decode(e.to_string())
        } else {
            StoreError::Transport(e.to_string())
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// CRUD contract the application needs from persistence.
pub trait FormStore: Send + Sync {
    fn list_forms(&self) -> StoreResult<Vec<Form>>;
    fn get_form(&self, id: &str) -> StoreResult<Form>;
    fn create_form(&self, req: &CreateFormRequest) -> StoreResult<Form>;
    fn update_form(&self, id: &str, req: &UpdateFormRequest) -> StoreResult<Form>;
    fn delete_form(&self, id: &str) -> StoreResult<()>;
    fn submit_response(&self, req: &SubmitResponseRequest) -> StoreResult<SubmitReceipt>;
    fn list_responses(&self, form_id: &str) -> StoreResult<Vec<FormResponse>>;
    fn delete_response(&self, id: &str) -> StoreResult<()>;
}

pub type StoreRef = Arc<dyn FormStore>;

pub fn open_store(cfg: &StoreConfig) -> anyhow::Result<StoreRef> {
    match cfg.kind {
        StoreKind::Http => {
            let store = super::http_store::HttpStore::new(
                &cfg.base_url,
                Duration::from_secs(cfg.timeout_secs),
            )?;
            Ok(Arc::new(store))
        }
        StoreKind::Memory => Ok(Arc::new(super::memory_store::MemoryStore::with_demo_data())),
    }
}
