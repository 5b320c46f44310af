//! Firestore REST API client.
//!
//! This crate provides:
//! - Generation record repository with upsert-by-song-id semantics
//! - Service account authentication via gcp_auth, or emulator mode
//! - Retry with exponential backoff and request metrics

pub mod client;
pub mod error;
pub mod generation_repo;
pub mod metrics;
pub mod retry;
pub mod token_cache;
pub mod types;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use generation_repo::{GenerationRepository, GENERATIONS_COLLECTION};
pub use retry::RetryConfig;
pub use types::{Document, FromFirestoreValue, ToFirestoreValue, Value};
