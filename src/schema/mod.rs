pub mod builder;
pub mod export;
pub mod field;
pub mod field_type;
pub mod renderer;
pub mod resource;
pub mod response;

pub use builder::{FormDraft, FormPreview};
pub use field::{FieldDefinition, FieldUpdate, FormSchema};
pub use field_type::FieldType;
pub use renderer::{FormSession, SessionPhase, SubmitGate, SubmitStatus};
pub use resource::{
    CreateFormRequest, Form, FormResponse, SubmitReceipt, SubmitResponseRequest,
    UpdateFormRequest,
};
pub use response::{ResponseMap, ResponseValue};
