use anyhow::{Context, Result};
use std::path::Path;

use super::{OutputFormat, SuccessResponse};
use crate::db::Database;
use crate::models::SeedData;
use crate::schedule::time::MINUTES_PER_DAY;

/// Read a JSON fixture of shops, staff, services and customers
pub fn load_seed_file(path: &Path) -> Result<SeedData> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let data: SeedData = serde_json::from_str(&content)
        .with_context(|| format!("Invalid seed file {}", path.display()))?;

    for staff in &data.staff {
        if let Some(shift) = staff.work_schedule.iter().find(|s| !s.is_valid()) {
            anyhow::bail!(
                "Staff {} has an invalid shift on day {}: {} - {}",
                staff.id,
                shift.day_of_week,
                shift.start_time,
                shift.end_time
            );
        }
    }
    for service in &data.services {
        if service.duration_minutes == 0 || service.duration_minutes >= MINUTES_PER_DAY {
            anyhow::bail!(
                "Service {} must last between 1 and {} minutes",
                service.id,
                MINUTES_PER_DAY - 1
            );
        }
    }
    Ok(data)
}

/// Load a fixture into the database at `db_path`
pub fn run_seed(db_path: &str, file: &Path, format: OutputFormat) -> Result<()> {
    let data = load_seed_file(file)?;
    let db = Database::open(db_path).with_context(|| format!("Failed to open {}", db_path))?;
    db.seed(&data).context("Failed to load seed data")?;

    tracing::info!("Seeded {} from {}", db_path, file.display());
    format.print(&SuccessResponse {
        message: format!(
            "Loaded {} shops, {} staff, {} services, {} customers",
            data.shops.len(),
            data.staff.len(),
            data.services.len(),
            data.customers.len()
        ),
    });
    Ok(())
}
