use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Booking, BookingStatus, TimeOfDay};

/// Types of webhook events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    /// A booking was created
    BookingCreated,
    /// Services, staff or time of a booking changed
    BookingUpdated,
    /// A booking moved to another status (other than cancelled)
    BookingStatusChanged,
    /// A booking was cancelled and its slot released
    BookingCancelled,
    /// Manual delivery check
    Test,
}

impl WebhookEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEventType::BookingCreated => "booking.created",
            WebhookEventType::BookingUpdated => "booking.updated",
            WebhookEventType::BookingStatusChanged => "booking.status_changed",
            WebhookEventType::BookingCancelled => "booking.cancelled",
            WebhookEventType::Test => "webhook.test",
        }
    }
}

impl std::fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Webhook event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Event type
    pub event: String,
    /// Timestamp of the event
    pub timestamp: DateTime<Utc>,
    pub shop_id: String,
    /// Booking snapshot, absent for test pings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<WebhookEventData>,
}

impl WebhookEvent {
    pub fn new(event_type: WebhookEventType, shop_id: &str, data: Option<WebhookEventData>) -> Self {
        Self {
            event: event_type.as_str().to_string(),
            timestamp: Utc::now(),
            shop_id: shop_id.to_string(),
            data,
        }
    }

    pub fn for_booking(event_type: WebhookEventType, booking: &Booking) -> Self {
        Self::new(
            event_type,
            &booking.shop_id,
            Some(WebhookEventData::from(booking)),
        )
    }
}

/// Booking fields carried by an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEventData {
    pub booking_id: String,
    pub booking_code: String,
    pub customer_id: String,
    pub staff_id: String,
    pub appointment_date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub status: BookingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<BookingStatus>,
}

impl WebhookEventData {
    pub fn with_previous_status(mut self, previous: BookingStatus) -> Self {
        self.previous_status = Some(previous);
        self
    }
}

impl From<&Booking> for WebhookEventData {
    fn from(b: &Booking) -> Self {
        Self {
            booking_id: b.id.clone(),
            booking_code: b.booking_code.clone(),
            customer_id: b.customer_id.clone(),
            staff_id: b.staff_id.clone(),
            appointment_date: b.appointment_date,
            start_time: b.start_time,
            end_time: b.end_time,
            status: b.status,
            previous_status: None,
        }
    }
}
