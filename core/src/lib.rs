//! Client core for a hosted project-tracking service.
//!
//! # Overview
//! Create, list, get and delete projects; create, list, get, update and
//! delete work items. Work items are addressed by title and resolved to ids
//! on every call.
//!
//! # Design
//! - `TrackerApi` builds `HttpRequest` values and `classify` turns
//!   `HttpResponse` values into typed outcomes. Neither touches the network.
//! - `client::TrackerClient` orchestrates compound operations once, over
//!   the [`Transport`] trait. `blocking::TrackerClient` drives the same code
//!   on the calling thread with a ureq transport; the async client runs on
//!   reqwest.
//! - Every operation returns an [`Outcome`]: a [`Success`] carrying message,
//!   payload and status code, or a [`ServiceError`].
//! - Notifications are an injected [`Notifier`]; the default sends nothing.

pub mod api;
pub mod batch;
pub mod blocking;
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod notify;
pub mod resolver;
pub mod transport;
pub mod types;
pub mod wiql;

pub use api::TrackerApi;
pub use batch::{BatchRequest, WorkItemMap};
pub use client::TrackerClient;
pub use config::{ClientConfig, Credentials};
pub use error::{ConfigError, Entity, ServiceError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use notify::{NoopNotifier, Notifier, TelegramNotifier};
pub use resolver::Resolution;
pub use transport::{ReqwestTransport, Transport, UreqTransport};
pub use types::{
    CreateProject, Outcome, ProjectCreated, ProjectRef, Success, Visibility, WorkItemRef,
    WorkItemSummary,
};
