//! The client facade.
//!
//! # Design
//! `TrackerClient` is written once, against [`Transport`]. Compound
//! operations chain their steps with `?`, so the first error ends the
//! operation and is returned as is; nothing already applied is rolled back.
//! Nothing is cached between calls: deletes and work item mutations resolve
//! the target's id again every time.
//!
//! Successful mutations are announced through the injected [`Notifier`].

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::api::TrackerApi;
use crate::batch::{self, WorkItemMap};
use crate::classify;
use crate::config::{ClientConfig, Credentials};
use crate::error::{ConfigError, ServiceError};
use crate::http::{HttpRequest, HttpResponse};
use crate::notify::{NoopNotifier, Notifier};
use crate::resolver::{self, Resolution};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{CreateProject, Outcome, ProjectCreated, ProjectRef, Success, WorkItemRef};
use crate::wiql::Wiql;

pub struct TrackerClient<T> {
    api: TrackerApi,
    organization: String,
    transport: T,
    notifier: Arc<dyn Notifier>,
}

impl TrackerClient<ReqwestTransport> {
    /// Client over reqwest. Operations must be awaited inside a tokio runtime.
    pub fn connect(credentials: Credentials, config: &ClientConfig) -> Result<Self, ConfigError> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::with_transport(credentials, config, transport))
    }
}

impl<T: Transport> TrackerClient<T> {
    pub fn with_transport(credentials: Credentials, config: &ClientConfig, transport: T) -> Self {
        Self {
            api: TrackerApi::new(&credentials, config),
            organization: credentials.organization().to_string(),
            transport,
            notifier: Arc::new(NoopNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Release the connection. Taking `self` guarantees no operation is
    /// still running.
    pub fn close(self) {
        info!(organization = %self.organization, "closing tracker client");
    }

    #[instrument(skip(self, input), fields(project = %input.name))]
    pub async fn create_project(&self, input: &CreateProject) -> Outcome<ProjectCreated> {
        let outcome = self.try_create_project(input).await;
        let text = format!(
            "New project '{}' created in organization '{}'.",
            input.name, self.organization
        );
        self.finish(outcome, Some(text)).await
    }

    #[instrument(skip(self))]
    pub async fn list_projects(&self) -> Outcome<Vec<ProjectRef>> {
        let outcome = match self.send(self.api.build_list_projects()).await {
            Ok(response) => classify::list_projects(&response),
            Err(error) => Err(error),
        };
        self.finish(outcome, None).await
    }

    #[instrument(skip(self))]
    pub async fn get_project(&self, name: &str) -> Outcome<ProjectRef> {
        let outcome = match self.send(self.api.build_get_project(name)).await {
            Ok(response) => classify::get_project(&response, name),
            Err(error) => Err(error),
        };
        self.finish(outcome, None).await
    }

    /// Look the project up by name, then delete it by id.
    #[instrument(skip(self))]
    pub async fn delete_project(&self, name: &str) -> Outcome<String> {
        let outcome = self.try_delete_project(name).await;
        let text = format!(
            "Project '{name}' deleted from organization '{}'.",
            self.organization
        );
        self.finish(outcome, Some(text)).await
    }

    #[instrument(skip(self))]
    pub async fn create_work_item(&self, project: &str, kind: &str, title: &str) -> Outcome<WorkItemRef> {
        let outcome = self.try_create_work_item(project, kind, title).await;
        let text = format!(
            "Work item '{title}' created in organization '{}'.",
            self.organization
        );
        self.finish(outcome, Some(text)).await
    }

    /// Query the project's work items, then fetch each one's detail.
    #[instrument(skip(self))]
    pub async fn list_work_items(&self, project: &str) -> Outcome<WorkItemMap> {
        let outcome = self.try_list_work_items(project).await;
        self.finish(outcome, None).await
    }

    #[instrument(skip(self))]
    pub async fn get_work_item(&self, project: &str, title: &str) -> Outcome<WorkItemRef> {
        let outcome = self.try_get_work_item(project, title).await;
        self.finish(outcome, None).await
    }

    #[instrument(skip(self))]
    pub async fn update_work_item(&self, project: &str, title: &str, new_title: &str) -> Outcome<()> {
        let outcome = self.try_update_work_item(project, title, new_title).await;
        let text = format!(
            "Work item '{title}' updated to '{new_title}' in organization '{}'.",
            self.organization
        );
        self.finish(outcome, Some(text)).await
    }

    #[instrument(skip(self))]
    pub async fn delete_work_item(&self, project: &str, title: &str) -> Outcome<String> {
        let outcome = self.try_delete_work_item(project, title).await;
        let text = format!(
            "Work item '{title}' deleted from organization '{}'.",
            self.organization
        );
        self.finish(outcome, Some(text)).await
    }

    /// Find the id of the first work item titled `title` in `project`.
    /// Only a transport failure is an `Err`.
    pub async fn resolve_work_item_id(&self, project: &str, title: &str) -> Result<Resolution, ServiceError> {
        let request = self.api.build_query(project, &Wiql::items_titled(project, title))?;
        let response = self.send(request).await?;
        Ok(resolver::resolution(&response))
    }

    async fn try_create_project(&self, input: &CreateProject) -> Outcome<ProjectCreated> {
        let request = self.api.build_create_project(input)?;
        let response = self.send(request).await?;
        classify::create_project(&response, &input.name)
    }

    async fn try_delete_project(&self, name: &str) -> Outcome<String> {
        let project = self.get_project(name).await?.payload;
        let response = self.send(self.api.build_delete_project(project.id)).await?;
        classify::delete_project(&response, name)
    }

    async fn try_create_work_item(&self, project: &str, kind: &str, title: &str) -> Outcome<WorkItemRef> {
        let request = self.api.build_create_work_item(project, kind, title)?;
        let response = self.send(request).await?;
        classify::create_work_item(&response, project, kind, title)
    }

    async fn try_list_work_items(&self, project: &str) -> Outcome<WorkItemMap> {
        let request = self.api.build_query(project, &Wiql::project_items(project))?;
        let response = self.send(request).await?;
        let references = classify::query_references(&response, project)?;
        let items = batch::fetch_all(&self.transport, &self.api, references).await?;
        Ok(Success::new("Work items listed successfully.", items, response.status))
    }

    async fn try_get_work_item(&self, project: &str, title: &str) -> Outcome<WorkItemRef> {
        let id = self.work_item_id(project, title).await?;
        let response = self.send(self.api.build_get_work_item(project, id)).await?;
        classify::get_work_item(&response)
    }

    async fn try_update_work_item(&self, project: &str, title: &str, new_title: &str) -> Outcome<()> {
        let id = self.work_item_id(project, title).await?;
        let request = self.api.build_update_work_item(project, id, new_title)?;
        let response = self.send(request).await?;
        classify::update_work_item(&response, title, new_title)
    }

    async fn try_delete_work_item(&self, project: &str, title: &str) -> Outcome<String> {
        let id = self.work_item_id(project, title).await?;
        let response = self.send(self.api.build_delete_work_item(project, id)).await?;
        classify::delete_work_item(&response, project, title)
    }

    async fn work_item_id(&self, project: &str, title: &str) -> Result<u64, ServiceError> {
        self.resolve_work_item_id(project, title).await?.into_id(title)
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ServiceError> {
        debug!(method = %request.method, path = %request.path, "sending request");
        let response = self.transport.execute(request).await?;
        debug!(status = response.status, "received response");
        Ok(response)
    }

    async fn finish<P>(&self, outcome: Outcome<P>, announcement: Option<String>) -> Outcome<P> {
        match &outcome {
            Ok(success) => {
                debug!(status = success.status_code, message = %success.message, "operation succeeded");
                if let Some(text) = announcement {
                    info!(message = %success.message, "mutation applied");
                    self.notify(&text).await;
                }
            }
            Err(error) => {
                warn!(kind = error.label(), status = ?error.status_code(), %error, "operation failed");
            }
        }
        outcome
    }

    async fn notify(&self, text: &str) {
        let Some(request) = self.notifier.announce(text) else {
            return;
        };
        match self.transport.execute(request).await {
            Ok(response) if (200..300).contains(&response.status) => {
                debug!("notification delivered");
            }
            Ok(response) => warn!(status = response.status, "notification rejected"),
            Err(error) => warn!(%error, "notification failed"),
        }
    }
}
