//! Response classification.
//!
//! # Design
//! Every answer from the service goes through [`check`], a single decision
//! table keyed on the operation and the status code. The status alone is
//! often ambiguous (404 means three different things depending on the call),
//! so [`Operation`] carries the context needed to pick the right error. Each
//! public function then projects a successful body into that operation's
//! payload.
//!
//! Everything here is pure: same inputs, same `Outcome`, no logging.

use serde::de::DeserializeOwned;

use crate::batch::BatchRequest;
use crate::error::{ServiceError, BAD_REQUEST, NON_AUTHORITATIVE, NOT_FOUND, UNAUTHORIZED};
use crate::http::HttpResponse;
use crate::types::{
    Outcome, ProjectCreated, ProjectRef, Success, WireErrorBody, WireOperation, WireProjectList,
    WireQueryResult, WireWorkItem, WorkItemRef,
};

pub const OK: u16 = 200;
pub const ACCEPTED: u16 = 202;

/// The call a response belongs to, with the names needed to word its errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation<'a> {
    CreateProject { name: &'a str },
    ListProjects,
    GetProject { name: &'a str },
    DeleteProject { name: &'a str },
    CreateWorkItem { project: &'a str, kind: &'a str },
    QueryWorkItems { project: &'a str },
    GetWorkItem,
    UpdateWorkItem,
    DeleteWorkItem { project: &'a str },
}

impl Operation<'_> {
    pub fn success_status(&self) -> u16 {
        match self {
            Operation::CreateProject { .. } | Operation::DeleteProject { .. } => ACCEPTED,
            _ => OK,
        }
    }
}

/// Accept the response if it carries the operation's success status,
/// otherwise classify it.
pub fn check(op: &Operation<'_>, response: &HttpResponse) -> Result<(), ServiceError> {
    if response.status == op.success_status() {
        Ok(())
    } else {
        Err(reject(op, response))
    }
}

/// Map a non-success response to its error kind.
pub fn reject(op: &Operation<'_>, response: &HttpResponse) -> ServiceError {
    match (op, response.status) {
        (_, UNAUTHORIZED | NON_AUTHORITATIVE) => ServiceError::Authorization {
            status: response.status,
        },
        (Operation::CreateProject { name }, BAD_REQUEST) => ServiceError::Conflict {
            name: (*name).to_string(),
        },
        (
            Operation::GetProject { name }
            | Operation::DeleteProject { name }
            | Operation::QueryWorkItems { project: name }
            | Operation::DeleteWorkItem { project: name },
            NOT_FOUND,
        ) => ServiceError::project_not_found(*name),
        (Operation::CreateWorkItem { project, kind }, NOT_FOUND) => {
            if names_unknown_type(&response.body, kind) {
                ServiceError::UnrecognizedType {
                    kind: (*kind).to_string(),
                }
            } else {
                ServiceError::project_not_found(*project)
            }
        }
        (_, status) => ServiceError::Upstream { status },
    }
}

/// Whether a 404 body blames the work item type rather than the project.
/// The service offers no error code for this, only the message text, so the
/// match is an exact substring test.
fn names_unknown_type(body: &str, kind: &str) -> bool {
    let needle = format!("Work item type {kind} does not exist in project");
    serde_json::from_str::<WireErrorBody>(body)
        .map(|error| error.message.contains(&needle))
        .unwrap_or(false)
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ServiceError> {
    serde_json::from_str(&response.body).map_err(|e| ServiceError::Decode {
        status: response.status,
        reason: e.to_string(),
    })
}

pub fn create_project(response: &HttpResponse, name: &str) -> Outcome<ProjectCreated> {
    check(&Operation::CreateProject { name }, response)?;
    let operation: WireOperation = decode(response)?;
    Ok(Success::new(
        format!("Project '{name}' created successfully."),
        ProjectCreated {
            operation_id: operation.id,
            name: name.to_string(),
        },
        response.status,
    ))
}

pub fn list_projects(response: &HttpResponse) -> Outcome<Vec<ProjectRef>> {
    check(&Operation::ListProjects, response)?;
    let list: WireProjectList = decode(response)?;
    let message = if list.count == 0 || list.value.is_empty() {
        "There is no project in your organization."
    } else {
        "Projects listed successfully."
    };
    Ok(Success::new(message, list.value, response.status))
}

pub fn get_project(response: &HttpResponse, name: &str) -> Outcome<ProjectRef> {
    check(&Operation::GetProject { name }, response)?;
    let project: ProjectRef = decode(response)?;
    Ok(Success::new("Project found.", project, response.status))
}

pub fn delete_project(response: &HttpResponse, name: &str) -> Outcome<String> {
    check(&Operation::DeleteProject { name }, response)?;
    Ok(Success::new(
        format!("Project '{name}' deleted successfully."),
        name.to_string(),
        response.status,
    ))
}

pub fn create_work_item(
    response: &HttpResponse,
    project: &str,
    kind: &str,
    title: &str,
) -> Outcome<WorkItemRef> {
    check(&Operation::CreateWorkItem { project, kind }, response)?;
    let item = work_item(response)?;
    Ok(Success::new(
        format!("Work item '{title}' created successfully."),
        item,
        response.status,
    ))
}

/// Detail locators of every work item a project query returned.
pub fn query_references(response: &HttpResponse, project: &str) -> Result<BatchRequest, ServiceError> {
    check(&Operation::QueryWorkItems { project }, response)?;
    let result: WireQueryResult = decode(response)?;
    Ok(result
        .work_items
        .into_iter()
        .map(|reference| reference.url)
        .collect())
}

/// Project a work item body, without checking the status.
pub fn work_item(response: &HttpResponse) -> Result<WorkItemRef, ServiceError> {
    decode::<WireWorkItem>(response).map(WorkItemRef::from)
}

pub fn get_work_item(response: &HttpResponse) -> Outcome<WorkItemRef> {
    check(&Operation::GetWorkItem, response)?;
    let item = work_item(response)?;
    Ok(Success::new("Work item found.", item, response.status))
}

pub fn update_work_item(response: &HttpResponse, title: &str, new_title: &str) -> Outcome<()> {
    check(&Operation::UpdateWorkItem, response)?;
    Ok(Success::new(
        format!("Work item '{title}' updated to '{new_title}'."),
        (),
        response.status,
    ))
}

pub fn delete_work_item(response: &HttpResponse, project: &str, title: &str) -> Outcome<String> {
    check(&Operation::DeleteWorkItem { project }, response)?;
    Ok(Success::new(
        format!("Work item '{title}' deleted successfully."),
        title.to_string(),
        response.status,
    ))
}
