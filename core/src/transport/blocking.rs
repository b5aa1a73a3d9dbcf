use std::thread;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use super::Transport;
use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

type UreqResponse = ureq::http::Response<ureq::Body>;

/// Blocking transport over a shared ureq agent.
///
/// Status codes are returned as data (`http_status_as_error(false)`) so the
/// classifier sees every 4xx/5xx answer.
pub struct UreqTransport {
    agent: ureq::Agent,
    workers: usize,
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout))
            .build()
            .new_agent();
        Self {
            agent,
            workers: config.batch_workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    fn call(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest {
            method,
            path,
            headers,
            body,
        } = request;
        let content_type = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.clone());

        let result = match method {
            HttpMethod::Get => with_headers(self.agent.get(&path), &headers).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(&path), &headers).call(),
            HttpMethod::Post => send(
                with_headers(self.agent.post(&path), &headers),
                content_type,
                body,
            ),
            HttpMethod::Patch => send(
                with_headers(self.agent.patch(&path), &headers),
                content_type,
                body,
            ),
        };
        let mut response = result.map_err(|e| TransportError::new(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError::new(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        if !name.eq_ignore_ascii_case("content-type") {
            builder = builder.header(name.as_str(), value.as_str());
        }
    }
    builder
}

fn send(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    content_type: Option<String>,
    body: Option<String>,
) -> Result<UreqResponse, ureq::Error> {
    let builder = match content_type {
        Some(content_type) => builder.content_type(content_type),
        None => builder,
    };
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}

#[async_trait]
impl Transport for UreqTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.call(request)
    }

    /// Run the batch on `workers` scoped threads pulling from one queue.
    /// Returns only once every request has finished; the first failure in
    /// submission order is reported.
    async fn execute_all(
        &self,
        requests: Vec<HttpRequest>,
    ) -> Result<Vec<HttpResponse>, TransportError> {
        let total = requests.len();
        let workers = self.workers.min(total);
        debug!(total, workers, "running batch on worker pool");

        let queue = Mutex::new(requests.into_iter().enumerate());
        let slots: Mutex<Vec<Option<Result<HttpResponse, TransportError>>>> =
            Mutex::new((0..total).map(|_| None).collect());

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let next = queue.lock().next();
                    let Some((index, request)) = next else {
                        break;
                    };
                    let result = self.call(request);
                    slots.lock()[index] = Some(result);
                });
            }
        });

        slots
            .into_inner()
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Err(TransportError::new("batch request never ran"))))
            .collect()
    }
}
