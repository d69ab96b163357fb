//! HTTP redirect service that counts its redirects.
//!
//! Every request to `/` is answered with a `307 Temporary Redirect` to a
//! fixed target carrying the running count as a query parameter. The count
//! comes from an in-memory [`RedirectCounter`](tally_core::RedirectCounter)
//! seeded from the durable store at startup; the durable increment and the
//! request log append happen in a detached task after the response is built.
//! `GET /info` reports store health and request log counts.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tally_core::InMemoryStore;
//! use tally_redirector::{bootstrap, App, AppState, RedirectTarget, ServiceConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryStore::new());
//! let counter = Arc::new(bootstrap::start(store.as_ref()).await?);
//!
//! let config = ServiceConfig::builder()
//!     .target(RedirectTarget::with_default_param("https://example.com/landing")?)
//!     .build();
//! let router = App::router(AppState::new(counter, store, config));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! tally_redirector::server::serve(listener, router, tally_redirector::server::shutdown_signal()).await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod cors;
pub mod error;
pub mod handlers;
pub mod model;
pub mod server;
pub mod service;
pub mod state;
pub mod stats;
pub mod target;

pub use app::App;
pub use config::ServiceConfig;
pub use cors::CorsPolicy;
pub use error::{ConfigError, StartupError};
pub use model::InfoResponse;
pub use service::{Redirection, RedirectService, RequestMeta};
pub use state::AppState;
pub use stats::{DbStatus, StatsReport, StatsReporter};
pub use target::RedirectTarget;
