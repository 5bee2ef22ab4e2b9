use anyhow::Context;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::store::{FormStore, StoreError, StoreResult};
use crate::schema::{
    CreateFormRequest, Form, FormResponse, SubmitReceipt, SubmitResponseRequest,
    UpdateFormRequest,
};

/// REST collaborator: `/forms` and `/responses` under a base URL.
pub struct HttpStore {
    client: Client,
    base_url: String,
}

impl HttpStore {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(&self, what: &str, req: RequestBuilder) -> StoreResult<reqwest::blocking::Response> {
        debug!(what, "store request");
        let resp = req.send()?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(what.to_string()));
        }
        let body = resp.text().unwrap_or_default();
        Err(StoreError::Http {
            status: status.as_u16(),
            body,
        })
    }

    fn json<T: DeserializeOwned>(&self, what: &str, req: RequestBuilder) -> StoreResult<T> {
        let resp = self.send(what, req)?;
        let text = resp.text()?;
        serde_json::from_str(&text).map_err(|e| StoreError::Decode(format!("{what}: {e}")))
    }
}

impl FormStore for HttpStore {
    fn list_forms(&self) -> StoreResult<Vec<Form>> {
        self.json("GET /forms", self.client.get(self.url("/forms")))
    }

    fn get_form(&self, id: &str) -> StoreResult<Form> {
        self.json(
            &format!("GET /forms/{id}"),
            self.client.get(self.url(&format!("/forms/{id}"))),
        )
    }

    fn create_form(&self, req: &CreateFormRequest) -> StoreResult<Form> {
        self.json("POST /forms", self.client.post(self.url("/forms")).json(req))
    }

    fn update_form(&self, id: &str, req: &UpdateFormRequest) -> StoreResult<Form> {
        self.json(
            &format!("PUT /forms/{id}"),
            self.client.put(self.url(&format!("/forms/{id}"))).json(req),
        )
    }

    fn delete_form(&self, id: &str) -> StoreResult<()> {
        self.send(
            &format!("DELETE /forms/{id}"),
            self.client.delete(self.url(&format!("/forms/{id}"))),
        )
        .map(|_| ())
    }

    fn submit_response(&self, req: &SubmitResponseRequest) -> StoreResult<SubmitReceipt> {
        self.json(
            "POST /responses",
            self.client.post(self.url("/responses")).json(req),
        )
    }

    fn list_responses(&self, form_id: &str) -> StoreResult<Vec<FormResponse>> {
        self.json(
            &format!("GET /responses/form/{form_id}"),
            self.client.get(self.url(&format!("/responses/form/{form_id}"))),
        )
    }

    fn delete_response(&self, id: &str) -> StoreResult<()> {
        self.send(
            &format!("DELETE /responses/{id}"),
            self.client.delete(self.url(&format!("/responses/{id}"))),
        )
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let s = HttpStore::new("http://localhost:5000/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(s.url("/forms"), "http://localhost:5000/api/forms");
    }

    #[test]
    fn unreachable_server_is_a_transport_error() {
        // Port 9 (discard) on loopback is not expected to serve HTTP.
        let s = HttpStore::new("http://127.0.0.1:9/api", Duration::from_millis(500)).unwrap();
        match s.list_forms() {
            Err(StoreError::Transport(_)) => {}
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
