//! Axum HTTP trigger for the clip compilation worker.
//!
//! Exposes on-demand compilation, scheduling passes and the game list
//! refresh, with per-client rate limiting and Prometheus metrics.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
