//! Domain DTOs for the tracking service.
//!
//! # Design
//! Public types (`ProjectRef`, `WorkItemRef`, ...) are snapshots handed to
//! the caller; the client never caches them. The `Wire*` types mirror the
//! service's JSON shapes and stay crate-private so the public surface does
//! not depend on field names like `System.Title`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Process template used when a project is created without an explicit one
/// (the service's "Basic" process).
pub const BASIC_PROCESS_TEMPLATE: Uuid = Uuid::from_u128(0x6b724908_ef14_45cf_84f8_768b5384da45);

/// A successful outcome: a human-readable message, the operation's payload
/// and the status code the service answered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Success<T> {
    pub message: String,
    pub payload: T,
    pub status_code: u16,
}

impl<T> Success<T> {
    pub fn new(message: impl Into<String>, payload: T, status_code: u16) -> Self {
        Self {
            message: message.into(),
            payload,
            status_code,
        }
    }
}

/// Result of every public client operation.
pub type Outcome<T> = Result<Success<T>, crate::error::ServiceError>;

/// A project as returned by the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectRef {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Payload of a successful project creation. The service only hands back a
/// pointer to the queued creation operation; the project's own id must be
/// read with a follow-up get.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectCreated {
    pub operation_id: Uuid,
    pub name: String,
}

/// A work item as returned by the service.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WorkItemRef {
    pub id: u64,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub state: Option<String>,
}

/// Value type of the mapping produced when listing work items.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WorkItemSummary {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

/// Request payload for creating a project.
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,
    pub description: String,
    pub visibility: Visibility,
    pub process_template: Uuid,
}

impl CreateProject {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            visibility: Visibility::default(),
            process_template: BASIC_PROCESS_TEMPLATE,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireCreateProject<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub visibility: Visibility,
    pub capabilities: WireCapabilities,
    pub process_template: WireTemplate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireCapabilities {
    pub versioncontrol: WireVersionControl,
    pub process_template: WireTemplate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireVersionControl {
    pub source_control_type: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireTemplate {
    pub template_type_id: Uuid,
}

/// Body of the 202 answer to a create or delete project call.
#[derive(Debug, Deserialize)]
pub(crate) struct WireOperation {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireProjectList {
    pub count: usize,
    pub value: Vec<ProjectRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireWorkItem {
    pub id: u64,
    pub fields: WireFields,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireFields {
    #[serde(rename = "System.Title")]
    pub title: String,
    #[serde(rename = "System.WorkItemType")]
    pub kind: String,
    #[serde(rename = "System.State", default)]
    pub state: Option<String>,
}

impl From<WireWorkItem> for WorkItemRef {
    fn from(item: WireWorkItem) -> Self {
        Self {
            id: item.id,
            title: item.fields.title,
            kind: item.fields.kind,
            state: item.fields.state,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireQueryResult {
    #[serde(default)]
    pub work_items: Vec<WireItemReference>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireItemReference {
    pub id: u64,
    pub url: String,
}

/// Error envelope the service puts in most 4xx bodies.
#[derive(Debug, Deserialize)]
pub(crate) struct WireErrorBody {
    #[serde(default)]
    pub message: String,
}

/// One entry of a JSON patch document.
#[derive(Debug, Serialize)]
pub(crate) struct PatchOperation<'a> {
    pub op: &'static str,
    pub path: &'static str,
    pub from: Option<&'a str>,
    pub value: &'a str,
}
