use crate::cors::cors_middleware;
use crate::handlers::{info_handler, not_found_handler, redirect_handler};
use crate::state::AppState;
use axum::http::StatusCode;
use axum::routing::{any, get};
use axum::{middleware, Router};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub struct App {}

impl App {
    /// Builds the router. CORS headers and preflight handling cover every
    /// route, including the 404 fallback.
    pub fn router(state: AppState) -> Router {
        let cors = state.cors().clone();
        let request_timeout = state.request_timeout();

        Router::new()
            .route("/", any(redirect_handler))
            .route("/info", get(info_handler))
            .fallback(not_found_handler)
            .with_state(state)
            .layer(middleware::from_fn_with_state(cors, cors_middleware))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                request_timeout,
            ))
            .layer(TraceLayer::new_for_http())
    }
}
