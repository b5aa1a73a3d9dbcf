//! Batch detail fetching for work item listings.
//!
//! A project query only returns locators; each one is resolved into full
//! detail by its own GET. The requests are handed to
//! [`Transport::execute_all`] as one batch, so the transport decides how
//! they run (a worker pool for the blocking transport, one after another for
//! the suspending one).
//!
//! Failure policy: the batch is all-or-nothing. The first reference, in
//! submission order, whose fetch fails or answers with an error fails the
//! whole listing; no partial map is returned.

use std::collections::BTreeMap;

use crate::api::TrackerApi;
use crate::classify::{self, Operation};
use crate::error::ServiceError;
use crate::transport::Transport;
use crate::types::WorkItemSummary;

/// Work items keyed by their server-assigned id.
pub type WorkItemMap = BTreeMap<u64, WorkItemSummary>;

/// Ordered detail locators produced by a query. Consumed by [`fetch_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchRequest {
    locators: Vec<String>,
}

impl BatchRequest {
    pub fn new(locators: Vec<String>) -> Self {
        Self { locators }
    }

    pub fn locators(&self) -> &[String] {
        &self.locators
    }

    pub fn len(&self) -> usize {
        self.locators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }
}

impl FromIterator<String> for BatchRequest {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Fetch every referenced work item and merge the results by id.
pub async fn fetch_all<T>(
    transport: &T,
    api: &TrackerApi,
    batch: BatchRequest,
) -> Result<WorkItemMap, ServiceError>
where
    T: Transport + ?Sized,
{
    if batch.is_empty() {
        return Ok(WorkItemMap::new());
    }
    tracing::debug!(references = batch.len(), "fetching work item details");

    let requests = batch
        .locators
        .iter()
        .map(|locator| api.build_fetch(locator))
        .collect();
    let responses = transport.execute_all(requests).await?;

    let mut items = WorkItemMap::new();
    for response in &responses {
        classify::check(&Operation::GetWorkItem, response)?;
        let item = classify::work_item(response)?;
        items.insert(
            item.id,
            WorkItemSummary {
                title: item.title,
                kind: item.kind,
            },
        );
    }
    Ok(items)
}
