use anyhow::{Context, Result};
use serde::Serialize;

use super::{check_response, get_api_client, get_server_url, get_shop_id, shop_url, OutputFormat};
use crate::models::{
    parse_id_list, Booking, BookingChannel, BookingListResponse, CreateBookingRequest,
    StatusChangeRequest,
};

/// A single booking as printed by the CLI
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct BookingView(pub Booking);

impl std::fmt::Display for BookingView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let b = &self.0;
        writeln!(f, "Booking {} ({})", b.booking_code, b.status)?;
        writeln!(f, "  ID:       {}", b.id)?;
        writeln!(
            f,
            "  When:     {} {} - {}",
            b.appointment_date, b.start_time, b.end_time
        )?;
        writeln!(f, "  Staff:    {}", b.staff_id)?;
        writeln!(f, "  Customer: {}", b.customer_id)?;
        writeln!(
            f,
            "  Services: {} ({} min, {})",
            b.service_ids.join(", "),
            b.total_duration_minutes,
            b.total_price
        )?;
        if let Some(ref notes) = b.notes {
            writeln!(f, "  Notes:    {}", notes)?;
        }
        Ok(())
    }
}

/// Day sheet as printed by `salond bookings`
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct BookingListView(pub BookingListResponse);

impl std::fmt::Display for BookingListView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.bookings.is_empty() {
            return write!(f, "No bookings.");
        }
        for b in &self.0.bookings {
            writeln!(
                f,
                "{}-{}  {:<10} {:<10} {} [{}]",
                b.start_time,
                b.end_time,
                b.staff_id,
                b.booking_code,
                b.service_ids.join(","),
                b.status
            )?;
        }
        Ok(())
    }
}

/// Arguments of `salond book`
pub struct BookArgs<'a> {
    pub customer: &'a str,
    pub services: &'a str,
    pub staff: Option<&'a str>,
    pub date: &'a str,
    pub start: &'a str,
    pub notes: Option<&'a str>,
    pub online: bool,
}

/// Create a booking
pub async fn run_book(shop: Option<&str>, args: BookArgs<'_>, format: OutputFormat) -> Result<()> {
    let shop_id = get_shop_id(shop)?;
    let server_url = get_server_url();

    let request = CreateBookingRequest {
        customer_id: args.customer.to_string(),
        service_ids: parse_id_list(args.services),
        staff_id: args.staff.map(str::to_string),
        date: args.date.to_string(),
        start_time: args.start.to_string(),
        notes: args.notes.map(str::to_string),
        channel: if args.online {
            BookingChannel::Online
        } else {
            BookingChannel::Staff
        },
    };

    let client = get_api_client()?;
    let resp = client
        .post(shop_url(&server_url, &shop_id, "bookings"))
        .json(&request)
        .send()
        .await
        .context("Failed to create booking")?;
    let resp = check_response(resp, "create booking").await?;

    let booking: Booking = resp.json().await.context("Failed to parse response")?;
    format.print(&BookingView(booking));
    Ok(())
}

/// List the bookings of one day
pub async fn run_bookings(shop: Option<&str>, date: &str, format: OutputFormat) -> Result<()> {
    let shop_id = get_shop_id(shop)?;
    let server_url = get_server_url();

    let client = get_api_client()?;
    let resp = client
        .get(shop_url(&server_url, &shop_id, "bookings"))
        .query(&[("date", date)])
        .send()
        .await
        .context("Failed to list bookings")?;
    let resp = check_response(resp, "list bookings").await?;

    let response: BookingListResponse = resp.json().await.context("Failed to parse response")?;
    format.print(&BookingListView(response));
    Ok(())
}

/// Show one booking, by ID or by booking code
pub async fn run_show(
    shop: Option<&str>,
    id_or_code: &str,
    by_code: bool,
    format: OutputFormat,
) -> Result<()> {
    let shop_id = get_shop_id(shop)?;
    let server_url = get_server_url();

    let path = if by_code {
        format!("bookings/code/{}", id_or_code)
    } else {
        format!("bookings/{}", id_or_code)
    };

    let client = get_api_client()?;
    let resp = client
        .get(shop_url(&server_url, &shop_id, &path))
        .send()
        .await
        .context("Failed to fetch booking")?;
    let resp = check_response(resp, "fetch booking").await?;

    let booking: Booking = resp.json().await.context("Failed to parse response")?;
    format.print(&BookingView(booking));
    Ok(())
}

/// Cancel a booking
pub async fn run_cancel(shop: Option<&str>, id: &str, format: OutputFormat) -> Result<()> {
    let shop_id = get_shop_id(shop)?;
    let server_url = get_server_url();

    let client = get_api_client()?;
    let resp = client
        .delete(shop_url(&server_url, &shop_id, &format!("bookings/{}", id)))
        .send()
        .await
        .context("Failed to cancel booking")?;
    let resp = check_response(resp, "cancel booking").await?;

    let booking: Booking = resp.json().await.context("Failed to parse response")?;
    format.print(&BookingView(booking));
    Ok(())
}

/// Move a booking to another status
pub async fn run_status(
    shop: Option<&str>,
    id: &str,
    status: &str,
    format: OutputFormat,
) -> Result<()> {
    let shop_id = get_shop_id(shop)?;
    let server_url = get_server_url();

    let request = StatusChangeRequest {
        status: status.to_string(),
    };
    // Fail fast on typos before hitting the server
    request.validate()?;

    let client = get_api_client()?;
    let resp = client
        .post(shop_url(
            &server_url,
            &shop_id,
            &format!("bookings/{}/status", id),
        ))
        .json(&request)
        .send()
        .await
        .context("Failed to change booking status")?;
    let resp = check_response(resp, "change booking status").await?;

    let booking: Booking = resp.json().await.context("Failed to parse response")?;
    format.print(&BookingView(booking));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures;
    use crate::models::BookingStatus;

    #[test]
    fn test_booking_view() {
        let mut booking =
            fixtures::booking("b1", "ana", "09:00", "10:00", BookingStatus::Confirmed);
        booking.notes = Some("allergic to ammonia".into());
        let text = BookingView(booking).to_string();
        assert!(text.contains("(CONFIRMED)"));
        assert!(text.contains("2026-03-02 09:00 - 10:00"));
        assert!(text.contains("color (60 min, 80.00)"));
        assert!(text.contains("allergic to ammonia"));
    }

    #[test]
    fn test_booking_list_view() {
        let list = BookingListView(BookingListResponse {
            bookings: vec![fixtures::booking(
                "b1",
                "ben",
                "10:00",
                "11:00",
                BookingStatus::Cancelled,
            )],
        });
        let text = list.to_string();
        assert!(text.starts_with("10:00-11:00  ben"));
        assert!(text.ends_with("[CANCELLED]\n"));

        let empty = BookingListView(BookingListResponse { bookings: vec![] });
        assert_eq!(empty.to_string(), "No bookings.");
    }
}
