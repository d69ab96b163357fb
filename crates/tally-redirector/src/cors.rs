use crate::error::ConfigError;
use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

static ALLOW_METHODS: HeaderValue = HeaderValue::from_static("GET, OPTIONS");
static ALLOW_HEADERS: HeaderValue =
    HeaderValue::from_static("Accept, Authorization, Content-Type, X-CSRF-Token");
static ALLOW_CREDENTIALS: HeaderValue = HeaderValue::from_static("false");

/// Fixed CORS headers stamped on every response.
///
/// The configured origins are sent verbatim as one comma-joined
/// `Access-Control-Allow-Origin` value. With no origins configured that
/// header is omitted and the remaining headers are still sent.
#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    allow_origin: Option<HeaderValue>,
}

impl CorsPolicy {
    pub fn new<I, T>(origins: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let origins: Vec<String> = origins
            .into_iter()
            .map(|origin| origin.as_ref().trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        if origins.is_empty() {
            return Ok(Self::default());
        }

        let joined = origins.join(",");
        let allow_origin = HeaderValue::from_bytes(joined.as_bytes())
            .map_err(|e| ConfigError::InvalidOrigins(format!("{joined}: {e}")))?;

        Ok(Self {
            allow_origin: Some(allow_origin),
        })
    }

    /// The `Access-Control-Allow-Origin` value, if any origins are configured.
    pub fn allow_origin(&self) -> Option<&HeaderValue> {
        self.allow_origin.as_ref()
    }

    pub fn apply(&self, headers: &mut HeaderMap) {
        if let Some(origin) = &self.allow_origin {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        }
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, ALLOW_METHODS.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, ALLOW_HEADERS.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, ALLOW_CREDENTIALS.clone());
    }
}

/// Answers preflight requests with 204 and adds the CORS headers to
/// everything else.
pub async fn cors_middleware(
    State(policy): State<CorsPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    policy.apply(response.headers_mut());
    response
}
