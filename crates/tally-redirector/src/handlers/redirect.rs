use crate::service::RequestMeta;
use crate::state::AppState;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::{REFERER, USER_AGENT};
use axum::http::{HeaderMap, HeaderName, StatusCode, Version};
use axum::response::Redirect;
use std::net::SocketAddr;

/// Redirects any method on `/` to the target with the new count attached.
pub async fn redirect_handler(State(state): State<AppState>, request: Request) -> Redirect {
    let redirection = state.redirects().redirect(request_meta(&request));
    Redirect::temporary(&redirection.location)
}

pub async fn not_found_handler() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Collects the request log fields of an inbound request.
///
/// Missing peer address or headers are recorded as empty strings.
pub fn request_meta(request: &Request) -> RequestMeta {
    let uri = request.uri();
    let request_uri = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    RequestMeta {
        remote_addr: request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string())
            .unwrap_or_default(),
        method: request.method().to_string(),
        request_uri,
        protocol: protocol_name(request.version()).to_string(),
        user_agent: header_str(request.headers(), USER_AGENT),
        referer: header_str(request.headers(), REFERER),
    }
}

fn protocol_name(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "",
    }
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
