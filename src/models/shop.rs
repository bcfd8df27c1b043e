use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TimeOfDay;

/// A tenant. Every query in the engine is scoped to one shop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shop {
    pub id: String,
    pub name: String,
    pub webhook_url: Option<String>,
    #[serde(default, skip_serializing)]
    pub webhook_secret: Option<String>,
    #[serde(default)]
    pub created_at: i64,
}

/// Recurring weekly work interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: u8,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
}

impl Shift {
    /// A shift is usable only when it opens before it closes
    pub fn is_valid(&self) -> bool {
        self.day_of_week <= 6 && self.start_time < self.end_time
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: String,
    pub shop_id: String,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub work_schedule: Vec<Shift>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub shop_id: String,
    pub name: String,
    pub duration_minutes: u32,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub shop_id: String,
    pub name: String,
    pub phone: Option<String>,
}

fn default_active() -> bool {
    true
}

/// Records loaded by `salond seed`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub shops: Vec<Shop>,
    #[serde(default)]
    pub staff: Vec<Staff>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub customers: Vec<Customer>,
}

/// Resolved view of one staff member's shift on a specific date
#[derive(Debug, Clone)]
pub struct StaffAvailability {
    pub staff_id: String,
    pub shift: Option<Shift>,
}

/// Configuration stored locally on the CLI
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocalConfig {
    pub server_url: Option<String>,
    pub shop_id: Option<String>,
}

impl LocalConfig {
    pub fn config_path() -> std::path::PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        std::path::PathBuf::from(home)
            .join(".config")
            .join("salond")
            .join("config.json")
    }

    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}
