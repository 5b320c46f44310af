//! Axum HTTP entrypoint for the music video pipeline.
//!
//! This crate provides:
//! - `POST /generate` (and `/webhook`) returning the master mp4
//! - Health and Prometheus metrics endpoints
//! - Request id, logging, CORS and body-limit middleware

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
pub use state::{AppState, PipelineRunner};
