use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::field::FormSchema;
use super::response::{lenient_responses, ResponseMap};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default)]
    pub fields: FormSchema,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateFormRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: FormSchema,
}

/// Partial form update; absent members are left as they are.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateFormRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<FormSchema>,
}

impl From<CreateFormRequest> for UpdateFormRequest {
    fn from(req: CreateFormRequest) -> Self {
        Self {
            title: Some(req.title),
            description: req.description,
            fields: Some(req.fields),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormResponse {
    pub id: String,
    pub form_id: String,
    #[serde(default, deserialize_with = "lenient_responses")]
    pub responses: ResponseMap,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponseRequest {
    pub form_id: String,
    pub responses: ResponseMap,
}

/// Collaborator acknowledgement for a stored response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    #[serde(default)]
    pub message: String,
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn form_uses_camel_case_wire_names() {
        let v = json!({
            "id": "abc",
            "title": "T",
            "description": "",
            "fields": [{"id": "f1", "type": "text", "label": "Name", "required": true}],
            "createdAt": "2024-03-01T10:00:00Z",
            "updatedAt": "2024-03-02T10:00:00.000Z",
            "isActive": false
        });
        let form: Form = serde_json::from_value(v).unwrap();
        assert!(!form.is_active);
        assert_eq!(form.fields.len(), 1);
        let back = serde_json::to_value(&form).unwrap();
        assert!(back.get("createdAt").is_some());
        assert!(back.get("isActive").is_some());
    }

    #[test]
    fn submit_request_serializes_form_id() {
        let mut responses = ResponseMap::new();
        responses.insert("f1".into(), "x".into());
        let req = SubmitResponseRequest {
            form_id: "abc".into(),
            responses,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v, json!({"formId": "abc", "responses": {"f1": "x"}}));
    }

    #[test]
    fn update_request_omits_untouched_members() {
        let req = UpdateFormRequest {
            title: Some("New".into()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&req).unwrap(), json!({"title": "New"}));
    }

    #[test]
    fn null_description_and_loose_response_values_decode() {
        let form: Form = serde_json::from_value(json!({
            "id": "abc",
            "title": "T",
            "description": null,
            "fields": [],
            "createdAt": "2024-03-01T10:00:00Z",
            "updatedAt": "2024-03-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(form.description, "");
        assert!(form.is_active);

        let rows: Vec<FormResponse> = serde_json::from_value(json!([
            {
                "id": "r1",
                "formId": "abc",
                "responses": {"age": 7, "agree": false, "note": null},
                "submittedAt": "2024-03-01T10:00:00Z"
            },
            {
                "id": "r2",
                "formId": "abc",
                "submittedAt": "2024-03-01T11:00:00Z"
            }
        ]))
        .unwrap();
        assert_eq!(rows[0].responses["age"].as_text(), Some("7"));
        assert_eq!(rows[0].responses["agree"].as_text(), Some("false"));
        assert!(!rows[0].responses.contains_key("note"));
        assert!(rows[1].responses.is_empty());
    }
}
