//! Transport adapter: executes an `HttpRequest` and reports a `RawOutcome`.
//!
//! # Design
//! `Transport` is the only seam that performs network I/O. Everything above
//! it stays deterministic and is tested against a scripted in-process
//! transport.
//! [`UreqTransport`] never treats a 4xx/5xx status as an error: the gateway
//! carries its semantic status in the body, so those bodies must reach the
//! normalizer. Connection, DNS and timeout errors become
//! `RawOutcome::TransportFailure`. There are no retries.

use std::sync::Arc;
use std::time::Duration;

use ureq::Agent;

use crate::config::DEFAULT_TIMEOUT;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RawOutcome};

/// Performs exactly one HTTP round-trip per call.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> RawOutcome;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: &HttpRequest) -> RawOutcome {
        (**self).send(request)
    }
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }

    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ureq::Error> {
        let mut response = match request.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()?
            }
            HttpMethod::Post => {
                let mut builder = self.agent.post(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                match &request.body {
                    Some(body) => builder.send(body.as_slice())?,
                    None => builder.send_empty()?,
                }
            }
        };

        let status = response.status().as_u16();
        let body = response.body_mut().read_to_vec()?;
        Ok(HttpResponse { status, body })
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> RawOutcome {
        match self.execute(request) {
            Ok(response) => {
                tracing::debug!(
                    method = %request.method,
                    url = %request.url,
                    status = response.status,
                    "gateway responded"
                );
                RawOutcome::Response(response)
            }
            Err(err) => {
                tracing::debug!(
                    method = %request.method,
                    url = %request.url,
                    error = %err,
                    "gateway unreachable"
                );
                RawOutcome::TransportFailure(err.to_string())
            }
        }
    }
}
