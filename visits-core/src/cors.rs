use {
    thiserror::Error,
    http::header::{self, HeaderValue, InvalidHeaderValue},
    crate::HttpResponse,
};

pub const ALLOW_ANY_ORIGIN: &str = "*";
const ALLOW_HEADERS: &str = "Content-Type, Origin";
const ALLOW_METHODS: &str = "OPTIONS,POST,GET";

/// Headers that let a browser page on another origin read the counter.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allow_headers: HeaderValue,
    allow_origin: HeaderValue,
    allow_methods: HeaderValue,
}

#[derive(Debug, Error)]
pub enum CorsError {
    #[error("allowed origin is not a valid header value: {origin:?} ({source})")]
    InvalidOrigin {
        origin: String,
        source: InvalidHeaderValue,
    },
}

impl CorsPolicy {
    /// Blank origin falls back to `*`.
    pub fn new(allowed_origin: &str) -> Result<Self, CorsError> {
        let allowed_origin = allowed_origin.trim();
        let allowed_origin = if allowed_origin.is_empty() { ALLOW_ANY_ORIGIN } else { allowed_origin };

        Ok(Self {
            allow_headers: HeaderValue::from_static(ALLOW_HEADERS),
            allow_origin: HeaderValue::from_str(allowed_origin)
                .map_err(|source| CorsError::InvalidOrigin { origin: allowed_origin.to_owned(), source })?,
            allow_methods: HeaderValue::from_static(ALLOW_METHODS),
        })
    }

    pub fn allow_origin(&self) -> &HeaderValue {
        &self.allow_origin
    }

    pub fn apply(&self, response: HttpResponse) -> HttpResponse {
        response
            .with_header(header::ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone())
            .with_header(header::ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone())
            .with_header(header::ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone())
    }
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allow_headers: HeaderValue::from_static(ALLOW_HEADERS),
            allow_origin: HeaderValue::from_static(ALLOW_ANY_ORIGIN),
            allow_methods: HeaderValue::from_static(ALLOW_METHODS),
        }
    }
}
