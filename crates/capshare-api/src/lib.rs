//! HTTP surface of capshare: access validation, request handlers and startup.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;
pub mod utils;

pub use error::{ApiOutcome, HttpAppError};
pub use state::AppState;
