use anyhow::Result;
use serde::Serialize;

use super::{OutputFormat, SuccessResponse};
use crate::models::LocalConfig;

/// Config show response
#[derive(Debug, Serialize)]
pub struct ConfigShowResponse {
    pub path: String,
    pub server_url: Option<String>,
    pub shop_id: Option<String>,
}

impl std::fmt::Display for ConfigShowResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Config file: {}", self.path)?;
        writeln!(
            f,
            "Server: {}",
            self.server_url.as_deref().unwrap_or(crate::DEFAULT_SERVER_URL)
        )?;
        write!(f, "Shop: {}", self.shop_id.as_deref().unwrap_or("not set"))
    }
}

/// Show current configuration
pub fn run_config_show(format: OutputFormat) -> Result<()> {
    let config = LocalConfig::load()?;
    let response = ConfigShowResponse {
        path: LocalConfig::config_path().display().to_string(),
        server_url: config.server_url,
        shop_id: config.shop_id,
    };
    format.print(&response);
    Ok(())
}

/// Set server URL (local only)
pub fn run_config_server(url: &str, format: OutputFormat) -> Result<()> {
    url::Url::parse(url).map_err(|e| anyhow::anyhow!("Invalid server URL: {}", e))?;

    let mut config = LocalConfig::load().unwrap_or_default();
    config.server_url = Some(url.trim_end_matches('/').to_string());
    config.save()?;

    format.print(&SuccessResponse {
        message: format!("Server URL set to: {}", url),
    });
    Ok(())
}

/// Select the default shop for client commands (local only)
pub fn run_config_shop(shop_id: &str, format: OutputFormat) -> Result<()> {
    let shop_id = shop_id.trim();
    if shop_id.is_empty() {
        anyhow::bail!("Shop ID cannot be empty");
    }

    let mut config = LocalConfig::load().unwrap_or_default();
    config.shop_id = Some(shop_id.to_string());
    config.save()?;

    format.print(&SuccessResponse {
        message: format!("Default shop set to: {}", shop_id),
    });
    Ok(())
}
