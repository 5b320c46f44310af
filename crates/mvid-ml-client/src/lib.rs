//! Clients for the model services behind the pipeline.
//!
//! Each model (speech-to-text, storyboard text generation, still image
//! synthesis and image-to-video synthesis) is served over HTTP. Binary
//! payloads travel as base64 PNG in JSON, except audio which is uploaded
//! as multipart form data.

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::MlClient;
pub use config::{MlServicesConfig, TextGenerationParams};
pub use error::{MlError, MlResult};
