//! Work item query language (WIQL) rendering.
//!
//! Values never get spliced into the query text as-is: every literal goes
//! through [`quote`], which doubles embedded single quotes the way WIQL
//! escapes them. The rendered text is what the service has always received
//! for ordinary titles; only titles containing quotes change, and those
//! could previously terminate the literal early.

use serde::Serialize;

pub const FIELD_ID: &str = "System.Id";
pub const FIELD_TITLE: &str = "System.Title";
pub const FIELD_PROJECT: &str = "System.TeamProject";

/// A flat `Select ... From WorkItems Where a = 'x' And b = 'y'` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wiql {
    select: &'static str,
    conditions: Vec<(&'static str, String)>,
}

impl Wiql {
    pub fn select(field: &'static str) -> Self {
        Self {
            select: field,
            conditions: Vec::new(),
        }
    }

    pub fn where_eq(mut self, field: &'static str, value: impl Into<String>) -> Self {
        self.conditions.push((field, value.into()));
        self
    }

    /// Every work item of `project`.
    pub fn project_items(project: &str) -> Self {
        Self::select(FIELD_ID).where_eq(FIELD_PROJECT, project)
    }

    /// Work items of `project` whose title equals `title`.
    pub fn items_titled(project: &str, title: &str) -> Self {
        Self::select(FIELD_ID)
            .where_eq(FIELD_TITLE, title)
            .where_eq(FIELD_PROJECT, project)
    }

    pub fn render(&self) -> String {
        let mut text = format!("Select [{}] From WorkItems", self.select);
        for (index, (field, value)) in self.conditions.iter().enumerate() {
            let keyword = if index == 0 { "Where" } else { "And" };
            text.push_str(&format!(" {keyword} [{field}] = {}", quote(value)));
        }
        text
    }

    pub(crate) fn body(&self) -> QueryBody {
        QueryBody {
            query: self.render(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QueryBody {
    pub query: String,
}

/// Render `value` as a WIQL string literal.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
