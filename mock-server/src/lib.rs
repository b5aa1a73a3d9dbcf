//! In-memory stand-in for the project-tracking service.
//!
//! Serves the subset of the REST surface the client uses, with the same
//! status codes and body shapes: 202 with an operation pointer for project
//! creation and deletion, patch documents for work items, WIQL queries that
//! return locators only, and 401/203 for missing or wrong credentials. A
//! Telegram-shaped endpoint records notifications so tests can inspect them.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Work item types every project accepts (the service's basic process).
pub const WORK_ITEM_TYPES: [&str; 3] = ["Epic", "Issue", "Task"];

const INITIAL_STATE: &str = "To Do";
const SIGN_IN_PAGE: &str = "<html><body>Sign in to continue</body></html>";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub url: String,
}

#[derive(Clone, Debug)]
pub struct WorkItem {
    pub id: u64,
    pub rev: u32,
    pub project_id: Uuid,
    pub project: String,
    pub kind: String,
    pub title: String,
    pub state: String,
}

/// A message received on the notification endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub bot_token: String,
    pub chat_id: String,
    pub text: String,
}

#[derive(Default)]
struct Store {
    projects: BTreeMap<String, Project>,
    work_items: BTreeMap<u64, WorkItem>,
    last_id: u64,
    notifications: Vec<Notification>,
}

impl Store {
    fn project(&self, key: &str) -> Option<&Project> {
        self.projects
            .values()
            .find(|p| p.name.eq_ignore_ascii_case(key) || p.id.to_string() == key)
    }
}

/// Shared state of one mock service instance.
#[derive(Clone, Default)]
pub struct Service {
    store: Arc<RwLock<Store>>,
    token: Option<Arc<str>>,
}

impl Service {
    /// A service that only accepts Basic auth carrying `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            store: Arc::default(),
            token: Some(Arc::from(token.into())),
        }
    }

    pub fn router(&self) -> Router {
        let api = Router::new()
            .route("/{org}/_apis/projects", get(list_projects).post(create_project))
            .route(
                "/{org}/_apis/projects/{project}",
                get(get_project).delete(delete_project),
            )
            .route("/{org}/{project}/_apis/wit/wiql", post(query_work_items))
            .route(
                "/{org}/{project}/_apis/wit/workitems/{item}",
                get(get_work_item)
                    .post(create_work_item)
                    .patch(update_work_item)
                    .delete(delete_work_item),
            )
            .route_layer(middleware::from_fn_with_state(self.clone(), require_auth));

        Router::new()
            .merge(api)
            .route("/telegram/{bot}/sendMessage", post(send_message))
            .layer(TraceLayer::new_for_http())
            .with_state(self.clone())
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.store.read().await.notifications.clone()
    }

    pub async fn work_item_count(&self) -> usize {
        self.store.read().await.work_items.len()
    }
}

/// Router over a fresh service that accepts any credentials.
pub fn app() -> Router {
    Service::default().router()
}

pub async fn serve(listener: TcpListener, service: Service) -> Result<(), std::io::Error> {
    axum::serve(listener, service.router()).await
}

type ApiError = (StatusCode, Json<Value>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "message": message.into() })))
}

fn project_missing(key: &str) -> ApiError {
    error(
        StatusCode::NOT_FOUND,
        format!("TF200016: The following project does not exist: {key}."),
    )
}

fn host(headers: &HeaderMap) -> String {
    headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost")
        .to_string()
}

async fn require_auth(State(service): State<Service>, request: Request, next: Next) -> Response {
    let Some(token) = service.token.as_deref() else {
        return next.run(request).await;
    };
    let expected = format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(format!(":{token}"))
    );
    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    match provided {
        None => StatusCode::UNAUTHORIZED.into_response(),
        Some(value) if value == expected => next.run(request).await,
        Some(_) => (StatusCode::NON_AUTHORITATIVE_INFORMATION, Html(SIGN_IN_PAGE)).into_response(),
    }
}

// --- projects ---

#[derive(Deserialize)]
pub struct CreateProject {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

async fn list_projects(State(service): State<Service>) -> Json<Value> {
    let store = service.store.read().await;
    let value: Vec<&Project> = store.projects.values().collect();
    Json(json!({ "count": value.len(), "value": value }))
}

async fn create_project(
    State(service): State<Service>,
    Path(org): Path<String>,
    headers: HeaderMap,
    Json(input): Json<CreateProject>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut store = service.store.write().await;
    if store.project(&input.name).is_some() {
        return Err(error(
            StatusCode::BAD_REQUEST,
            format!(
                "TF200019: The following project already exists: {}.",
                input.name
            ),
        ));
    }
    let id = Uuid::new_v4();
    let host = host(&headers);
    let project = Project {
        id,
        name: input.name.clone(),
        description: input.description,
        url: format!("http://{host}/{org}/_apis/projects/{id}"),
    };
    store.projects.insert(input.name, project);

    let operation = Uuid::new_v4();
    tracing::info!(%id, %operation, "project created");
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "id": operation,
            "status": "queued",
            "url": format!("http://{host}/{org}/_apis/operations/{operation}"),
        })),
    ))
}

async fn get_project(
    State(service): State<Service>,
    Path((_org, key)): Path<(String, String)>,
) -> Result<Json<Project>, ApiError> {
    let store = service.store.read().await;
    store
        .project(&key)
        .cloned()
        .map(Json)
        .ok_or_else(|| project_missing(&key))
}

async fn delete_project(
    State(service): State<Service>,
    Path((_org, key)): Path<(String, String)>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut store = service.store.write().await;
    let project = store.project(&key).cloned().ok_or_else(|| project_missing(&key))?;
    store.projects.remove(&project.name);
    store.work_items.retain(|_, item| item.project_id != project.id);
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "id": Uuid::new_v4(), "status": "queued" })),
    ))
}

// --- work items ---

#[derive(Debug, Deserialize)]
pub struct PatchOperation {
    pub op: String,
    pub path: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Deserialize)]
pub struct Query {
    pub query: String,
}

fn work_item_body(item: &WorkItem, host: &str, org: &str) -> Value {
    json!({
        "id": item.id,
        "rev": item.rev,
        "fields": {
            "System.TeamProject": item.project,
            "System.WorkItemType": item.kind,
            "System.Title": item.title,
            "System.State": item.state,
        },
        "url": format!("http://{host}/{org}/{}/_apis/wit/workitems/{}", item.project_id, item.id),
    })
}

fn apply_patch(item: &mut WorkItem, patch: &[PatchOperation]) -> Result<(), ApiError> {
    for operation in patch {
        if operation.op != "add" && operation.op != "replace" {
            return Err(error(
                StatusCode::BAD_REQUEST,
                format!("unsupported patch operation {}", operation.op),
            ));
        }
        let Some(value) = operation.value.as_str() else {
            return Err(error(StatusCode::BAD_REQUEST, "patch value must be a string"));
        };
        match operation.path.as_str() {
            "/fields/System.Title" => item.title = value.to_string(),
            "/fields/System.State" => item.state = value.to_string(),
            other => {
                return Err(error(
                    StatusCode::BAD_REQUEST,
                    format!("unsupported field path {other}"),
                ))
            }
        }
    }
    Ok(())
}

fn parse_id(item: &str) -> Result<u64, ApiError> {
    item.parse()
        .map_err(|_| error(StatusCode::BAD_REQUEST, format!("invalid work item id {item}")))
}

fn item_missing(id: u64) -> ApiError {
    error(
        StatusCode::NOT_FOUND,
        format!("TF401232: Work item {id} does not exist."),
    )
}

async fn create_work_item(
    State(service): State<Service>,
    Path((org, project_key, item)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(patch): Json<Vec<PatchOperation>>,
) -> Result<Json<Value>, ApiError> {
    let Some(kind) = item.strip_prefix('$') else {
        return Err(error(
            StatusCode::METHOD_NOT_ALLOWED,
            "work items are created with POST .../workitems/$type",
        ));
    };
    let mut store = service.store.write().await;
    let project = store
        .project(&project_key)
        .cloned()
        .ok_or_else(|| project_missing(&project_key))?;
    if !WORK_ITEM_TYPES.contains(&kind) {
        return Err(error(
            StatusCode::NOT_FOUND,
            format!(
                "VS402323: Work item type {kind} does not exist in project {} or you do not have permission to access it.",
                project.name
            ),
        ));
    }

    let mut work_item = WorkItem {
        id: store.last_id + 1,
        rev: 1,
        project_id: project.id,
        project: project.name,
        kind: kind.to_string(),
        title: String::new(),
        state: INITIAL_STATE.to_string(),
    };
    apply_patch(&mut work_item, &patch)?;
    if work_item.title.is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "System.Title is required"));
    }
    store.last_id = work_item.id;
    let body = work_item_body(&work_item, &host(&headers), &org);
    store.work_items.insert(work_item.id, work_item);
    Ok(Json(body))
}

async fn query_work_items(
    State(service): State<Service>,
    Path((org, project_key)): Path<(String, String)>,
    headers: HeaderMap,
    Json(query): Json<Query>,
) -> Result<Json<Value>, ApiError> {
    let conditions = parse_conditions(&query.query)
        .map_err(|reason| error(StatusCode::BAD_REQUEST, format!("invalid query: {reason}")))?;
    let store = service.store.read().await;
    if store.project(&project_key).is_none() {
        return Err(project_missing(&project_key));
    }

    let host = host(&headers);
    let mut matches = Vec::new();
    for item in store.work_items.values() {
        let mut keep = true;
        for (field, value) in &conditions {
            keep &= match field.as_str() {
                "System.TeamProject" => item.project.eq_ignore_ascii_case(value),
                "System.Title" => item.title == *value,
                "System.WorkItemType" => item.kind == *value,
                "System.State" => item.state == *value,
                "System.Id" => item.id.to_string() == *value,
                other => {
                    return Err(error(
                        StatusCode::BAD_REQUEST,
                        format!("unknown field {other}"),
                    ))
                }
            };
        }
        if keep {
            matches.push(json!({
                "id": item.id,
                "url": format!("http://{host}/{org}/{}/_apis/wit/workitems/{}", item.project_id, item.id),
            }));
        }
    }
    Ok(Json(json!({ "queryType": "flat", "workItems": matches })))
}

async fn get_work_item(
    State(service): State<Service>,
    Path((org, project_key, item)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&item)?;
    let store = service.store.read().await;
    let project = store.project(&project_key).ok_or_else(|| project_missing(&project_key))?;
    store
        .work_items
        .get(&id)
        .filter(|work_item| work_item.project_id == project.id)
        .map(|work_item| Json(work_item_body(work_item, &host(&headers), &org)))
        .ok_or_else(|| item_missing(id))
}

async fn update_work_item(
    State(service): State<Service>,
    Path((org, project_key, item)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(patch): Json<Vec<PatchOperation>>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&item)?;
    let mut store = service.store.write().await;
    let project_id = store
        .project(&project_key)
        .map(|project| project.id)
        .ok_or_else(|| project_missing(&project_key))?;
    let work_item = store
        .work_items
        .get_mut(&id)
        .filter(|work_item| work_item.project_id == project_id)
        .ok_or_else(|| item_missing(id))?;
    apply_patch(work_item, &patch)?;
    work_item.rev += 1;
    Ok(Json(work_item_body(work_item, &host(&headers), &org)))
}

async fn delete_work_item(
    State(service): State<Service>,
    Path((_org, project_key, item)): Path<(String, String, String)>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&item)?;
    let mut store = service.store.write().await;
    let project_id = store
        .project(&project_key)
        .map(|project| project.id)
        .ok_or_else(|| project_missing(&project_key))?;
    let owned = store
        .work_items
        .get(&id)
        .is_some_and(|work_item| work_item.project_id == project_id);
    if !owned {
        return Err(item_missing(id));
    }
    store.work_items.remove(&id);
    Ok(Json(json!({ "id": id, "code": 200 })))
}

// --- notifications ---

#[derive(Deserialize)]
pub struct SendMessage {
    pub chat_id: String,
    pub text: String,
}

async fn send_message(
    State(service): State<Service>,
    Path(bot): Path<String>,
    Json(message): Json<SendMessage>,
) -> Json<Value> {
    let notification = Notification {
        bot_token: bot.strip_prefix("bot").unwrap_or(&bot).to_string(),
        chat_id: message.chat_id,
        text: message.text,
    };
    service.store.write().await.notifications.push(notification);
    Json(json!({ "ok": true }))
}

/// Extract `[Field] = 'literal'` conditions joined by `And` from the
/// `Where` clause of a WIQL query. Doubled quotes inside a literal stand for
/// one quote. An `Order By` tail is accepted and ignored.
pub fn parse_conditions(query: &str) -> Result<Vec<(String, String)>, &'static str> {
    let Some(start) = query.to_ascii_lowercase().find(" where ") else {
        return Ok(Vec::new());
    };
    let mut rest = &query[start + " where ".len()..];
    let mut conditions = Vec::new();

    loop {
        rest = rest.trim_start();
        let field = if let Some(bracketed) = rest.strip_prefix('[') {
            let close = bracketed.find(']').ok_or("unterminated field name")?;
            rest = &bracketed[close + 1..];
            &bracketed[..close]
        } else {
            let end = rest
                .find(|c: char| c.is_whitespace() || c == '=')
                .ok_or("expected '='")?;
            let field = &rest[..end];
            rest = &rest[end..];
            field
        };

        rest = rest.trim_start().strip_prefix('=').ok_or("expected '='")?;
        rest = rest.trim_start().strip_prefix('\'').ok_or("expected a string literal")?;

        let mut value = String::new();
        let mut chars = rest.char_indices();
        let end = loop {
            match chars.next() {
                Some((index, '\'')) => {
                    if rest[index + 1..].starts_with('\'') {
                        value.push('\'');
                        chars.next();
                    } else {
                        break index;
                    }
                }
                Some((_, c)) => value.push(c),
                None => return Err("unterminated string literal"),
            }
        };
        conditions.push((field.to_string(), value));

        rest = rest[end + 1..].trim_start();
        if rest.is_empty() {
            break;
        }
        let lowered = rest.to_ascii_lowercase();
        if lowered.starts_with("and ") {
            rest = &rest["and ".len()..];
        } else if lowered.starts_with("order by") {
            break;
        } else {
            return Err("only And-joined equality conditions are supported");
        }
    }
    Ok(conditions)
}
