mod bookings;
mod config;
mod seed;
mod slots;

pub use bookings::*;
pub use config::*;
pub use seed::*;
pub use slots::*;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn print<T: Serialize + std::fmt::Display>(&self, value: &T) {
        match self {
            OutputFormat::Human => println!("{}", value),
            OutputFormat::Json => match serde_json::to_string_pretty(value) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Failed to encode output: {}", e),
            },
        }
    }
}

/// Success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

impl std::fmt::Display for SuccessResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Error body returned by the server
#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
    message: String,
}

/// Get the API client for making requests to the server
pub fn get_api_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")
}

/// Get the server URL from config or default
pub fn get_server_url() -> String {
    crate::models::LocalConfig::load()
        .ok()
        .and_then(|c| c.server_url)
        .unwrap_or_else(|| crate::DEFAULT_SERVER_URL.to_string())
}

/// Resolve the shop to act on: explicit flag first, then local config
pub fn get_shop_id(explicit: Option<&str>) -> Result<String> {
    if let Some(shop) = explicit.filter(|s| !s.trim().is_empty()) {
        return Ok(shop.trim().to_string());
    }
    let config = crate::models::LocalConfig::load()?;
    config
        .shop_id
        .ok_or_else(|| anyhow::anyhow!("No shop selected. Run 'salond config shop <ID>' first."))
}

/// Build a shop-scoped API URL
pub fn shop_url(server_url: &str, shop_id: &str, path: &str) -> String {
    format!(
        "{}/{}/shops/{}/{}",
        server_url.trim_end_matches('/'),
        crate::API_VERSION,
        shop_id,
        path.trim_start_matches('/')
    )
}

/// Turn a non-success response into an error carrying the server's message
async fn check_response(resp: reqwest::Response, action: &str) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiError>(&body) {
        Ok(err) => anyhow::bail!("Failed to {}: {} ({})", action, err.message, err.error),
        Err(_) => anyhow::bail!("Failed to {}: {} {}", action, status, body),
    }
}
