//! Request body encoders.
//!
//! # Design
//! Each action declares one `Encoding`. JSON, FORM and QUERY are built from a
//! flat parameter map by [`build_request`]; MULTIPART has its own builder,
//! [`MultipartBody`], because its parts come from resolved files rather than
//! from the parameter map.
//!
//! FORM and QUERY flatten values the way the gateway reads them: strings go
//! through untouched, numbers and booleans use their JSON text, nested
//! objects/arrays are sent as compact JSON, and `null` entries are dropped.

use serde_json::{Map, Value};
use url::form_urlencoded;
use uuid::Uuid;

use crate::error::EncodeError;
use crate::http::{HttpMethod, HttpRequest};

const JSON_CONTENT_TYPE: &str = "application/json";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    Form,
    Query,
    Multipart,
}

impl Encoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Json => "json",
            Encoding::Form => "form",
            Encoding::Query => "query",
            Encoding::Multipart => "multipart",
        }
    }
}

/// Build a request for the JSON, FORM and QUERY encodings.
///
/// MULTIPART requests are assembled by the upload orchestrator and rejected
/// here.
pub fn build_request(
    method: HttpMethod,
    url: String,
    encoding: Encoding,
    params: &Map<String, Value>,
) -> Result<HttpRequest, EncodeError> {
    match encoding {
        Encoding::Json => {
            if method == HttpMethod::Get {
                return Err(EncodeError::BodyOnGet("json"));
            }
            let body = serde_json::to_vec(params)?;
            Ok(HttpRequest {
                method,
                url,
                headers: vec![("content-type".to_string(), JSON_CONTENT_TYPE.to_string())],
                body: Some(body),
            })
        }
        Encoding::Form => {
            if method == HttpMethod::Get {
                return Err(EncodeError::BodyOnGet("form"));
            }
            Ok(HttpRequest {
                method,
                url,
                headers: vec![("content-type".to_string(), FORM_CONTENT_TYPE.to_string())],
                body: Some(url_encode(params).into_bytes()),
            })
        }
        Encoding::Query => {
            let query = url_encode(params);
            let url = if query.is_empty() {
                url
            } else {
                format!("{url}?{query}")
            };
            Ok(HttpRequest {
                method,
                url,
                headers: Vec::new(),
                body: None,
            })
        }
        Encoding::Multipart => Err(EncodeError::MultipartNeedsFiles),
    }
}

/// `application/x-www-form-urlencoded` rendering of a parameter map.
pub fn url_encode(params: &Map<String, Value>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        if let Some(text) = flatten(value) {
            serializer.append_pair(key, &text);
        }
    }
    serializer.finish()
}

fn flatten(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// One part of a multipart/form-data body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// A multipart/form-data body under construction.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    boundary: String,
    parts: Vec<Part>,
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::with_boundary(format!("paygate-{}", Uuid::new_v4().simple()))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.parts.push(Part {
            name: name.to_string(),
            filename: None,
            content_type: None,
            data: value.as_bytes().to_vec(),
        });
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: Vec<u8>) -> Self {
        self.parts.push(Part {
            name: name.to_string(),
            filename: Some(filename.to_string()),
            content_type: Some(content_type.to_string()),
            data,
        });
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn into_request(self, url: String) -> HttpRequest {
        let content_type = self.content_type();
        HttpRequest {
            method: HttpMethod::Post,
            url,
            headers: vec![("content-type".to_string(), content_type)],
            body: Some(self.to_bytes()),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for part in &self.parts {
            out.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
            let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", quote(&part.name));
            if let Some(filename) = &part.filename {
                disposition.push_str(&format!("; filename=\"{}\"", quote(filename)));
            }
            out.extend_from_slice(disposition.as_bytes());
            out.extend_from_slice(b"\r\n");
            if let Some(content_type) = &part.content_type {
                out.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
            }
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(&part.data);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        out
    }
}

fn quote(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != '\r' && *c != '\n')
        .map(|c| if c == '"' { "%22".to_string() } else { c.to_string() })
        .collect()
}
