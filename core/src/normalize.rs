//! Status normalizer.
//!
//! # Design
//! The gateway has no single status vocabulary. Some endpoint families signal
//! success with `status == 0`, the transaction query uses `status == 2`, the
//! ATM family accepts either, order creation uses a boolean `ok`, the
//! redirect-payment endpoint a boolean `success`, and the upload endpoint
//! only the HTTP status line. Each of those is one [`Rule`] variant and every
//! registered action names exactly one of them.
//!
//! [`NormalizedResult`] is the only thing handed back to callers. Its
//! canonical status is derived from whether a failure is present, so the flag
//! and the code cannot disagree.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::decode::{decode, DecodedBody};
use crate::http::{HttpResponse, RawOutcome};

/// Canonical status code for a successful result.
pub const STATUS_SUCCESS: u8 = 1;
/// Canonical status code for a failed result.
pub const STATUS_FAILURE: u8 = 0;

/// How an endpoint reports success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Body field `status` equals 0.
    StatusZero,
    /// Body field `status` equals 2 (transaction query).
    StatusTwo,
    /// Body field `status` is 0 or 2 (ATM family).
    StatusZeroOrTwo,
    /// Body field `ok` is boolean `true`.
    OkFlag,
    /// Body field `success` is boolean `true`.
    SuccessFlag,
    /// HTTP 200 with a structured body; the body is passed through as-is.
    HttpOkPassthrough,
}

impl Rule {
    pub const ALL: [Rule; 6] = [
        Rule::StatusZero,
        Rule::StatusTwo,
        Rule::StatusZeroOrTwo,
        Rule::OkFlag,
        Rule::SuccessFlag,
        Rule::HttpOkPassthrough,
    ];

    /// Whether the decoded upstream body signals success under this rule.
    ///
    /// Not meaningful for `HttpOkPassthrough`, which only looks at the status
    /// line.
    fn accepts(self, body: &Value) -> bool {
        match self {
            Rule::StatusZero => status_code(body) == Some(0),
            Rule::StatusTwo => status_code(body) == Some(2),
            Rule::StatusZeroOrTwo => matches!(status_code(body), Some(0 | 2)),
            Rule::OkFlag => body.get("ok") == Some(&Value::Bool(true)),
            Rule::SuccessFlag => body.get("success") == Some(&Value::Bool(true)),
            Rule::HttpOkPassthrough => true,
        }
    }
}

/// Integer `status` field. Numeric strings are accepted because some gateway
/// endpoints quote their codes.
fn status_code(body: &Value) -> Option<i64> {
    match body.get("status")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Which layer produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureLayer {
    /// The action name (or a group's `action` parameter) is not registered.
    Unsupported,
    /// Parameters could not be turned into a request.
    InvalidRequest,
    /// An upload file reference did not resolve.
    Precondition,
    /// No HTTP response was obtained.
    Transport,
    /// The response body was not structured data.
    Decode,
    /// The gateway answered but its status signals failure.
    Upstream,
}

#[derive(Debug, Clone, PartialEq)]
struct Failure {
    layer: FailureLayer,
    message: String,
}

/// The caller-facing result of every dispatch and upload.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResult {
    failure: Option<Failure>,
    payload: Map<String, Value>,
}

impl NormalizedResult {
    pub fn success(payload: Map<String, Value>) -> Self {
        Self {
            failure: None,
            payload,
        }
    }

    pub fn failure(layer: FailureLayer, message: impl Into<String>) -> Self {
        Self {
            failure: Some(Failure {
                layer,
                message: message.into(),
            }),
            payload: Map::new(),
        }
    }

    pub fn unsupported_method(name: &str) -> Self {
        Self::failure(FailureLayer::Unsupported, format!("Unsupported method: {name}"))
    }

    pub fn unsupported_action(action: &str) -> Self {
        Self::failure(FailureLayer::Unsupported, format!("Unsupported action: {action}"))
    }

    pub fn transport(cause: &str) -> Self {
        Self::failure(FailureLayer::Transport, format!("transport error: {cause}"))
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// 1 for success, 0 for failure.
    pub fn canonical_status(&self) -> u8 {
        if self.is_success() {
            STATUS_SUCCESS
        } else {
            STATUS_FAILURE
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.message.as_str())
    }

    pub fn failure_layer(&self) -> Option<FailureLayer> {
        self.failure.as_ref().map(|f| f.layer)
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn into_payload(self) -> Map<String, Value> {
        self.payload
    }
}

impl Serialize for NormalizedResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("NormalizedResult", 4)?;
        state.serialize_field("success", &self.is_success())?;
        state.serialize_field("status", &self.canonical_status())?;
        state.serialize_field("message", &self.message())?;
        state.serialize_field("payload", &self.payload)?;
        state.end()
    }
}

/// Object bodies pass their fields through; anything else lands under `data`.
fn into_payload(body: Value) -> Map<String, Value> {
    match body {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("data".to_string(), other);
            map
        }
    }
}

fn decode_failure(error: &str, raw: &[u8]) -> NormalizedResult {
    NormalizedResult::failure(
        FailureLayer::Decode,
        format!("decode error: {error}; raw body: {}", DecodedBody::raw_text(raw)),
    )
}

/// Apply `rule` to a decoded body received with `http_status`.
pub fn normalize(rule: Rule, http_status: u16, decoded: DecodedBody) -> NormalizedResult {
    if rule == Rule::HttpOkPassthrough && http_status != 200 {
        let mut message = format!("HTTP status {http_status}");
        let raw = match &decoded {
            DecodedBody::Json(body) => body.to_string(),
            DecodedBody::Invalid { raw, .. } => DecodedBody::raw_text(raw),
        };
        if !raw.is_empty() {
            message.push_str(&format!("; raw body: {raw}"));
        }
        return NormalizedResult::failure(FailureLayer::Upstream, message);
    }

    match decoded {
        DecodedBody::Invalid { error, raw } => decode_failure(&error, &raw),
        DecodedBody::Json(body) if rule.accepts(&body) => NormalizedResult::success(into_payload(body)),
        DecodedBody::Json(body) => {
            NormalizedResult::failure(FailureLayer::Upstream, format!("upstream rejected: {body}"))
        }
    }
}

/// Decode and normalize a response in one step.
pub fn normalize_response(rule: Rule, response: &HttpResponse) -> NormalizedResult {
    normalize(rule, response.status, decode(&response.body))
}

/// Full pipeline from a transport outcome to a caller-facing result.
pub fn normalize_outcome(rule: Rule, outcome: &RawOutcome) -> NormalizedResult {
    match outcome {
        RawOutcome::Response(response) => normalize_response(rule, response),
        RawOutcome::TransportFailure(cause) => NormalizedResult::transport(cause),
    }
}
