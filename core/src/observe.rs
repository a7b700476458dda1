//! Lifecycle hook.
//!
//! The client reports each call's progress through an [`Observer`] it was
//! given at construction, rather than logging from arbitrary places. The
//! default [`TracingObserver`] turns these into `tracing` events; the crate
//! never installs a subscriber itself.

use crate::http::HttpRequest;

pub trait Observer: Send + Sync {
    /// A request is about to be handed to the transport.
    fn on_request_built(&self, _action: &str, _request: &HttpRequest) {}

    /// The transport returned a response.
    fn on_response_received(&self, _action: &str, _status: u16, _body_len: usize) {}

    /// The transport could not obtain a response.
    fn on_transport_failed(&self, _action: &str, _cause: &str) {}

    /// The call was rejected before any I/O.
    fn on_validation_failed(&self, _action: &str, _message: &str) {}
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {}

/// Emits `tracing` events with structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_request_built(&self, action: &str, request: &HttpRequest) {
        tracing::debug!(
            action,
            method = %request.method,
            url = %request.url,
            body_len = request.body.as_ref().map_or(0, Vec::len),
            "request built"
        );
    }

    fn on_response_received(&self, action: &str, status: u16, body_len: usize) {
        tracing::debug!(action, status, body_len, "response received");
    }

    fn on_transport_failed(&self, action: &str, cause: &str) {
        tracing::warn!(action, cause, "transport failed");
    }

    fn on_validation_failed(&self, action: &str, message: &str) {
        tracing::info!(action, message, "validation failed");
    }
}
