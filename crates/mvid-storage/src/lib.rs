//! Cloudflare R2 asset storage.
//!
//! Uploads clip stills, raw clips and master videos, and hands back the
//! public URL each object is served from.

pub mod client;
pub mod error;

pub use client::{validate_key, R2Client, R2Config};
pub use error::{StorageError, StorageResult};
