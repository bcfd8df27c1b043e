use anyhow::{Context, Result};
use serde::Serialize;

use super::{check_response, get_api_client, get_server_url, get_shop_id, shop_url, OutputFormat};
use crate::models::AvailableSlotsResponse;

/// Slots as printed by `salond slots`
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct SlotsView(pub AvailableSlotsResponse);

impl std::fmt::Display for SlotsView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let r = &self.0;
        if r.slots.is_empty() {
            return write!(f, "No free slots on {} for {} minutes.", r.date, r.duration_minutes);
        }
        writeln!(
            f,
            "Free start times on {} ({} minutes):",
            r.date, r.duration_minutes
        )?;
        for chunk in r.slots.chunks(8) {
            writeln!(f, "  {}", chunk.join("  "))?;
        }
        Ok(())
    }
}

/// Query free start times for a set of services
pub async fn run_slots(
    shop: Option<&str>,
    date: &str,
    services: &str,
    staff: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let shop_id = get_shop_id(shop)?;
    let server_url = get_server_url();

    let mut query = vec![("date", date), ("service_ids", services)];
    if let Some(staff) = staff {
        query.push(("staff_id", staff));
    }

    let client = get_api_client()?;
    let resp = client
        .get(shop_url(&server_url, &shop_id, "available-slots"))
        .query(&query)
        .send()
        .await
        .context("Failed to query available slots")?;
    let resp = check_response(resp, "query available slots").await?;

    let response: AvailableSlotsResponse =
        resp.json().await.context("Failed to parse response")?;
    format.print(&SlotsView(response));
    Ok(())
}
