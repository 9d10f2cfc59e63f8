//! facereg-api — Client side of the face recognition service.
//!
//! [`FaceApi`] lists the operations the service offers; [`HttpFaceApi`]
//! implements them over HTTP. Every response is the `{code, message, data}`
//! envelope, surfaced to callers as `Result<_, ApiError>`.

pub mod client;
pub mod config;
pub mod http;

pub use client::{FaceApi, ListQuery, RecognizeForm, RegisterForm};
pub use config::{Config, ConfigError};
pub use facereg_core::ApiError;
pub use http::HttpFaceApi;
