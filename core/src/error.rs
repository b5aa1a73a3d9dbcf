//! Error types for the tracking service client.
//!
//! # Design
//! `ServiceError` is the error half of every operation's `Outcome`. The
//! first five variants are the service-level taxonomy produced by the
//! classifier; `Decode`, `Serialization` and `Transport` cover failures that
//! happen around the exchange rather than in the service's answer.
//! `ConfigError` is kept apart because it can only occur while building a
//! client, never while running an operation.

use std::fmt;

use thiserror::Error;

/// Second status the service uses for a rejected token, next to 401. It
/// answers 203 with a sign-in page instead of a JSON body.
pub const NON_AUTHORITATIVE: u16 = 203;
pub const UNAUTHORIZED: u16 = 401;
pub const NOT_FOUND: u16 = 404;
pub const BAD_REQUEST: u16 = 400;

/// What kind of entity a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Project,
    WorkItem,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Project => f.write_str("Project"),
            Entity::WorkItem => f.write_str("Work item"),
        }
    }
}

/// Failure to move bytes to or from the service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("transport failure: {0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Errors returned by client operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// 401 or 203. Both statuses produce the same message.
    #[error("you have authorization problem, recheck your token.")]
    Authorization { status: u16 },

    #[error("{entity} '{name}' not found.")]
    NotFound { entity: Entity, name: String },

    /// Project name already taken.
    #[error("Project '{name}' already exists.")]
    Conflict { name: String },

    /// The work item type is not defined by the project's process.
    #[error("Work item type '{kind}' does not exist in the project.")]
    UnrecognizedType { kind: String },

    #[error("Error occurred with code {status}.")]
    Upstream { status: u16 },

    /// The service reported success but the body had an unexpected shape.
    #[error("unexpected response body (status {status}): {reason}")]
    Decode { status: u16, reason: String },

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ServiceError {
    pub fn project_not_found(name: impl Into<String>) -> Self {
        ServiceError::NotFound {
            entity: Entity::Project,
            name: name.into(),
        }
    }

    pub fn work_item_not_found(title: impl Into<String>) -> Self {
        ServiceError::NotFound {
            entity: Entity::WorkItem,
            name: title.into(),
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Status code associated with the error. `None` when no response was
    /// received or the request was never sent.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ServiceError::Authorization { status }
            | ServiceError::Upstream { status }
            | ServiceError::Decode { status, .. } => Some(*status),
            ServiceError::NotFound { .. } | ServiceError::UnrecognizedType { .. } => {
                Some(NOT_FOUND)
            }
            ServiceError::Conflict { .. } => Some(BAD_REQUEST),
            ServiceError::Serialization(_) | ServiceError::Transport(_) => None,
        }
    }

    /// Stable label for log fields.
    pub fn label(&self) -> &'static str {
        match self {
            ServiceError::Authorization { .. } => "authorization",
            ServiceError::NotFound { .. } => "not_found",
            ServiceError::Conflict { .. } => "conflict",
            ServiceError::UnrecognizedType { .. } => "unrecognized_type",
            ServiceError::Upstream { .. } => "upstream",
            ServiceError::Decode { .. } => "decode",
            ServiceError::Serialization(_) => "serialization",
            ServiceError::Transport(_) => "transport",
        }
    }
}

/// Errors raised while constructing a client.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("token and organization must be specified")]
    MissingCredentials,

    #[error("environment variable {name} is not set")]
    MissingEnv { name: &'static str },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}
