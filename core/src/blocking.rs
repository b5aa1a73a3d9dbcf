//! Blocking facade.
//!
//! Drives the async [`client::TrackerClient`] to completion on the calling
//! thread. With [`UreqTransport`] no call ever suspends, so every operation
//! blocks the caller until its last request returns, and work item listings
//! fan out over the transport's worker pool.

use futures::executor::block_on;

use crate::batch::WorkItemMap;
use crate::client;
use crate::config::{ClientConfig, Credentials};
use crate::error::ServiceError;
use crate::notify::Notifier;
use crate::resolver::Resolution;
use crate::transport::{Transport, UreqTransport};
use crate::types::{CreateProject, Outcome, ProjectCreated, ProjectRef, WorkItemRef};

pub struct TrackerClient<T = UreqTransport> {
    inner: client::TrackerClient<T>,
}

impl TrackerClient<UreqTransport> {
    pub fn connect(credentials: Credentials, config: &ClientConfig) -> Self {
        Self::with_transport(credentials, config, UreqTransport::new(config))
    }
}

impl<T: Transport> TrackerClient<T> {
    pub fn with_transport(credentials: Credentials, config: &ClientConfig, transport: T) -> Self {
        Self {
            inner: client::TrackerClient::with_transport(credentials, config, transport),
        }
    }

    pub fn with_notifier(self, notifier: impl Notifier + 'static) -> Self {
        Self {
            inner: self.inner.with_notifier(notifier),
        }
    }

    pub fn organization(&self) -> &str {
        self.inner.organization()
    }

    pub fn close(self) {
        self.inner.close();
    }

    pub fn create_project(&self, input: &CreateProject) -> Outcome<ProjectCreated> {
        block_on(self.inner.create_project(input))
    }

    pub fn list_projects(&self) -> Outcome<Vec<ProjectRef>> {
        block_on(self.inner.list_projects())
    }

    pub fn get_project(&self, name: &str) -> Outcome<ProjectRef> {
        block_on(self.inner.get_project(name))
    }

    pub fn delete_project(&self, name: &str) -> Outcome<String> {
        block_on(self.inner.delete_project(name))
    }

    pub fn create_work_item(&self, project: &str, kind: &str, title: &str) -> Outcome<WorkItemRef> {
        block_on(self.inner.create_work_item(project, kind, title))
    }

    pub fn list_work_items(&self, project: &str) -> Outcome<WorkItemMap> {
        block_on(self.inner.list_work_items(project))
    }

    pub fn get_work_item(&self, project: &str, title: &str) -> Outcome<WorkItemRef> {
        block_on(self.inner.get_work_item(project, title))
    }

    pub fn update_work_item(&self, project: &str, title: &str, new_title: &str) -> Outcome<()> {
        block_on(self.inner.update_work_item(project, title, new_title))
    }

    pub fn delete_work_item(&self, project: &str, title: &str) -> Outcome<String> {
        block_on(self.inner.delete_work_item(project, title))
    }

    pub fn resolve_work_item_id(&self, project: &str, title: &str) -> Result<Resolution, ServiceError> {
        block_on(self.inner.resolve_work_item_id(project, title))
    }
}
