//! Stateless HTTP request builder for the tracking service.
//!
//! # Design
//! `TrackerApi` holds the organization URL, the api version and the
//! precomputed `Authorization` header, and carries no mutable state between
//! calls. Each endpoint gets a `build_*` method producing an `HttpRequest`;
//! executing it and interpreting the answer happen elsewhere, which keeps
//! this layer deterministic and testable without a network.

use base64::Engine;
use uuid::Uuid;

use crate::config::{ClientConfig, Credentials};
use crate::error::ServiceError;
use crate::http::{HttpMethod, HttpRequest, CONTENT_TYPE_JSON, CONTENT_TYPE_JSON_PATCH};
use crate::types::{
    CreateProject, PatchOperation, WireCapabilities, WireCreateProject, WireTemplate,
    WireVersionControl,
};
use crate::wiql::Wiql;

const TITLE_FIELD_PATH: &str = "/fields/System.Title";

#[derive(Clone)]
pub struct TrackerApi {
    org_url: String,
    api_version: String,
    authorization: String,
}

impl TrackerApi {
    pub fn new(credentials: &Credentials, config: &ClientConfig) -> Self {
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!(":{}", credentials.token()));
        Self {
            org_url: format!(
                "{}/{}",
                config.base_url.trim_end_matches('/'),
                segment(credentials.organization())
            ),
            api_version: config.api_version.clone(),
            authorization: format!("Basic {encoded}"),
        }
    }

    pub fn org_url(&self) -> &str {
        &self.org_url
    }

    pub fn build_create_project(&self, input: &CreateProject) -> Result<HttpRequest, ServiceError> {
        let template = WireTemplate {
            template_type_id: input.process_template,
        };
        let body = WireCreateProject {
            name: &input.name,
            description: &input.description,
            visibility: input.visibility,
            capabilities: WireCapabilities {
                versioncontrol: WireVersionControl {
                    source_control_type: "Git",
                },
                process_template: template,
            },
            process_template: template,
        };
        self.with_json(HttpMethod::Post, self.url("/_apis/projects"), &body)
    }

    pub fn build_list_projects(&self) -> HttpRequest {
        self.without_body(HttpMethod::Get, self.url("/_apis/projects"))
    }

    pub fn build_get_project(&self, name: &str) -> HttpRequest {
        let path = format!("/_apis/projects/{}", segment(name));
        self.without_body(HttpMethod::Get, self.url(&path))
    }

    pub fn build_delete_project(&self, id: Uuid) -> HttpRequest {
        let path = format!("/_apis/projects/{id}");
        self.without_body(HttpMethod::Delete, self.url(&path))
    }

    pub fn build_create_work_item(
        &self,
        project: &str,
        kind: &str,
        title: &str,
    ) -> Result<HttpRequest, ServiceError> {
        let path = format!(
            "/{}/_apis/wit/workitems/${}",
            segment(project),
            segment(kind)
        );
        self.with_patch(HttpMethod::Post, self.url(&path), "add", title)
    }

    pub fn build_query(&self, project: &str, query: &Wiql) -> Result<HttpRequest, ServiceError> {
        let path = format!("/{}/_apis/wit/wiql", segment(project));
        self.with_json(HttpMethod::Post, self.url(&path), &query.body())
    }

    pub fn build_get_work_item(&self, project: &str, id: u64) -> HttpRequest {
        self.without_body(HttpMethod::Get, self.work_item_url(project, id))
    }

    pub fn build_update_work_item(
        &self,
        project: &str,
        id: u64,
        new_title: &str,
    ) -> Result<HttpRequest, ServiceError> {
        self.with_patch(
            HttpMethod::Patch,
            self.work_item_url(project, id),
            "replace",
            new_title,
        )
    }

    pub fn build_delete_work_item(&self, project: &str, id: u64) -> HttpRequest {
        self.without_body(HttpMethod::Delete, self.work_item_url(project, id))
    }

    /// GET an absolute detail locator handed out by a query result.
    pub fn build_fetch(&self, locator: &str) -> HttpRequest {
        let path = if locator.contains('?') {
            locator.to_string()
        } else {
            format!("{locator}?api-version={}", self.api_version)
        };
        self.without_body(HttpMethod::Get, path)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}?api-version={}", self.org_url, self.api_version)
    }

    fn work_item_url(&self, project: &str, id: u64) -> String {
        self.url(&format!("/{}/_apis/wit/workitems/{id}", segment(project)))
    }

    fn headers(&self, content_type: Option<&str>) -> Vec<(String, String)> {
        let mut headers = vec![
            ("authorization".to_string(), self.authorization.clone()),
            ("accept".to_string(), CONTENT_TYPE_JSON.to_string()),
        ];
        if let Some(content_type) = content_type {
            headers.push(("content-type".to_string(), content_type.to_string()));
        }
        headers
    }

    fn without_body(&self, method: HttpMethod, path: String) -> HttpRequest {
        HttpRequest {
            method,
            path,
            headers: self.headers(None),
            body: None,
        }
    }

    fn with_json<B: serde::Serialize>(
        &self,
        method: HttpMethod,
        path: String,
        body: &B,
    ) -> Result<HttpRequest, ServiceError> {
        let body =
            serde_json::to_string(body).map_err(|e| ServiceError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method,
            path,
            headers: self.headers(Some(CONTENT_TYPE_JSON)),
            body: Some(body),
        })
    }

    fn with_patch(
        &self,
        method: HttpMethod,
        path: String,
        op: &'static str,
        title: &str,
    ) -> Result<HttpRequest, ServiceError> {
        let document = [PatchOperation {
            op,
            path: TITLE_FIELD_PATH,
            from: None,
            value: title,
        }];
        let body = serde_json::to_string(&document)
            .map_err(|e| ServiceError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method,
            path,
            headers: self.headers(Some(CONTENT_TYPE_JSON_PATCH)),
            body: Some(body),
        })
    }
}

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
