//! In-process doubles for the transport and observer seams. Test builds only.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::http::{HttpRequest, HttpResponse, RawOutcome};
use crate::observe::Observer;
use crate::transport::Transport;

/// Replays queued outcomes and records every request it was asked to send.
///
/// When the queue is empty it answers with a transport failure, so a test
/// that forgets to script a response fails loudly instead of hanging.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    outcomes: Mutex<VecDeque<RawOutcome>>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with the given status and body.
    pub fn respond(self, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.push(RawOutcome::Response(HttpResponse::new(status, body)));
        self
    }

    /// Queue a transport failure carrying `cause`.
    pub fn fail(self, cause: &str) -> Self {
        self.push(RawOutcome::TransportFailure(cause.to_string()));
        self
    }

    pub fn push(&self, outcome: RawOutcome) {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
    }

    pub fn call_count(&self) -> usize {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> RawOutcome {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| RawOutcome::TransportFailure("no scripted response".to_string()))
    }
}

/// One recorded lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    RequestBuilt { action: String, url: String },
    ResponseReceived { action: String, status: u16 },
    TransportFailed { action: String, cause: String },
    ValidationFailed { action: String, message: String },
}

#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }
}

impl Observer for RecordingObserver {
    fn on_request_built(&self, action: &str, request: &HttpRequest) {
        self.record(Event::RequestBuilt {
            action: action.to_string(),
            url: request.url.clone(),
        });
    }

    fn on_response_received(&self, action: &str, status: u16, _body_len: usize) {
        self.record(Event::ResponseReceived {
            action: action.to_string(),
            status,
        });
    }

    fn on_transport_failed(&self, action: &str, cause: &str) {
        self.record(Event::TransportFailed {
            action: action.to_string(),
            cause: cause.to_string(),
        });
    }

    fn on_validation_failed(&self, action: &str, message: &str) {
        self.record(Event::ValidationFailed {
            action: action.to_string(),
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;

    fn request() -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Post,
            url: "http://gw/order/create".to_string(),
            headers: Vec::new(),
            body: Some(b"{}".to_vec()),
        }
    }

    #[test]
    fn scripted_transport_replays_in_order_and_records() {
        let transport = ScriptedTransport::new().respond(200, "first").fail("reset by peer");
        assert_eq!(transport.send(&request()), RawOutcome::Response(HttpResponse::new(200, "first")));
        assert_eq!(
            transport.send(&request()),
            RawOutcome::TransportFailure("reset by peer".to_string())
        );
        assert_eq!(transport.call_count(), 2);
        assert_eq!(transport.requests()[0].url, "http://gw/order/create");
    }

    #[test]
    fn scripted_transport_runs_dry_as_failure() {
        let transport = ScriptedTransport::new();
        assert!(matches!(transport.send(&request()), RawOutcome::TransportFailure(_)));
    }
}
