use {
    serde::{Serialize, Deserialize},
    thiserror::Error,
    http::{HeaderMap, header::{self, IntoHeaderName, HeaderValue}, StatusCode, Method},
};

pub use crate::cors::{CorsPolicy, CorsError};

pub mod cors;

pub const DEFAULT_COUNTER_NAME: &str = "VisitsCounter";

/// Single persisted row tracking total visit count.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CounterRecord {
    pub name: String,
    pub visits: u64,
}

impl CounterRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visits: 0,
        }
    }

    pub fn with_visits(mut self, visits: u64) -> Self {
        self.visits = visits;
        self
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct VisitsBody {
    pub visits: u64,
}

/// Part of the incoming request the counter looks at. Nothing in it changes the outcome,
/// it only ends up in logs.
#[derive(Debug, Clone)]
pub struct VisitRequest {
    pub method: Method,
    pub path: String,
}

impl VisitRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

impl<B> From<&http::Request<B>> for VisitRequest {
    fn from(request: &http::Request<B>) -> Self {
        Self::new(request.method().clone(), request.uri().path())
    }
}

#[derive(Debug)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: vec![],
        }
    }

    pub fn json<T: Serialize>(value: &T) -> Result<Self, HttpResponseError> {
        let body = serde_json::to_vec(value)
            .map_err(|err| HttpResponseError::Serialization { reason: format!("failed to serialize response body: {err:?}") })?;
        Ok(Self::new()
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(body))
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn with_header<K: IntoHeaderName>(mut self, header_name: K, header_value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(header_name, header_value.into());
        self
    }

    pub fn with_body(mut self, body: impl HttpResponseBody) -> Self {
        self.body = body.into_bytes();
        self
    }

    pub fn body_json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, HttpResponseError> {
        serde_json::from_slice(&self.body)
            .map_err(|err| HttpResponseError::Serialization { reason: format!("failed to deserialize response body: {err:?}") })
    }
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Error)]
pub enum HttpResponseError {
    #[error("serialization error: {reason}")]
    Serialization { reason: String },
}

pub trait HttpResponseBody {
    fn into_bytes(self) -> Vec<u8>;
}

impl HttpResponseBody for Vec<u8> {
    fn into_bytes(self) -> Vec<u8> { self }
}

impl HttpResponseBody for String {
    fn into_bytes(self) -> Vec<u8> { self.into_bytes() }
}

impl HttpResponseBody for &str {
    fn into_bytes(self) -> Vec<u8> { self.as_bytes().to_vec() }
}
