//! Playground Server Library
//!
//! HTTP proxy that lets a browser UI stream chat completions through the
//! playground client without talking to the endpoint directly.

pub mod config;
pub mod error;
pub mod http;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use http::create_router;
pub use state::AppState;
