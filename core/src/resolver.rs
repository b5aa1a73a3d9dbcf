//! Title to id resolution for work items.
//!
//! The service addresses work items by id, callers address them by title.
//! Resolution runs a WIQL query for the title within the project and takes
//! the first match the service lists. There is no uniqueness check: with
//! duplicate titles the service's ordering decides.
//!
//! Any answer other than a success or an authorization failure resolves to
//! `NotFound`, so "no such title" and "the query itself failed" look the
//! same to callers.

use crate::classify::OK;
use crate::error::{ServiceError, NON_AUTHORITATIVE, UNAUTHORIZED};
use crate::http::HttpResponse;
use crate::types::WireQueryResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Found(u64),
    NotFound,
    Unauthorized,
}

impl Resolution {
    /// Turn the resolution into the id or the error the caller should see.
    pub fn into_id(self, title: &str) -> Result<u64, ServiceError> {
        match self {
            Resolution::Found(id) => Ok(id),
            Resolution::NotFound => Err(ServiceError::work_item_not_found(title)),
            Resolution::Unauthorized => Err(ServiceError::Authorization {
                status: UNAUTHORIZED,
            }),
        }
    }
}

/// Interpret the answer to a title query.
pub fn resolution(response: &HttpResponse) -> Resolution {
    match response.status {
        OK => serde_json::from_str::<WireQueryResult>(&response.body)
            .ok()
            .and_then(|result| result.work_items.into_iter().next())
            .map_or(Resolution::NotFound, |first| Resolution::Found(first.id)),
        UNAUTHORIZED | NON_AUTHORITATIVE => Resolution::Unauthorized,
        _ => Resolution::NotFound,
    }
}
