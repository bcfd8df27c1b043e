pub mod cli;
pub mod db;
pub mod error;
pub mod models;
pub mod schedule;
pub mod server;
pub mod webhook;

pub use error::{Result, SchedulingError};
pub use models::*;

/// Default server URL for the salond API
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

/// API version prefix
pub const API_VERSION: &str = "v1";
