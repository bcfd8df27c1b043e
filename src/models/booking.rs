use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{TimeInterval, TimeOfDay};
use crate::error::SchedulingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::NoShow => "NO_SHOW",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Some(BookingStatus::Pending),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "COMPLETED" => Some(BookingStatus::Completed),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            "NO_SHOW" => Some(BookingStatus::NoShow),
            _ => None,
        }
    }

    /// Whether this booking still occupies its staff member's time
    pub fn holds_slot(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled | BookingStatus::NoShow)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::NoShow
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a booking request came from; decides its initial status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingChannel {
    /// Public self-service booking, auto-confirmed
    Online,
    /// Entered by shop staff, awaits confirmation
    #[default]
    Staff,
}

impl BookingChannel {
    pub fn initial_status(&self) -> BookingStatus {
        match self {
            BookingChannel::Online => BookingStatus::Confirmed,
            BookingChannel::Staff => BookingStatus::Pending,
        }
    }
}

/// An appointment stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub booking_code: String,
    pub shop_id: String,
    pub customer_id: String,
    pub staff_id: String,
    pub service_ids: Vec<String>,
    pub appointment_date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub total_duration_minutes: u32,
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Booking {
    pub fn interval(&self) -> TimeInterval {
        TimeInterval::new(self.start_time, self.end_time)
    }
}

/// Parse a calendar date in `YYYY-MM-DD` form
pub fn parse_date(s: &str) -> Result<NaiveDate, SchedulingError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| SchedulingError::Validation(format!("invalid date {s:?} (expected YYYY-MM-DD)")))
}

/// Split a comma-separated id list, dropping blanks and repeats
pub fn parse_id_list(s: &str) -> Vec<String> {
    unique_ids(s.split(','))
}

/// Trim each id, drop blanks and keep the first occurrence of repeats.
/// Ids are taken as-is; a comma inside one is not a separator.
fn dedup_ids(ids: Vec<String>) -> Vec<String> {
    unique_ids(ids.iter().map(String::as_str))
}

fn unique_ids<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for id in raw.map(str::trim).filter(|id| !id.is_empty()) {
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

/// Query for available slots, as received on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableSlotsQuery {
    pub date: String,
    /// Comma-separated service ids
    pub service_ids: String,
    #[serde(default)]
    pub staff_id: Option<String>,
}

/// Validated slot query
#[derive(Debug, Clone)]
pub struct SlotQuery {
    pub date: NaiveDate,
    pub service_ids: Vec<String>,
    pub staff_id: Option<String>,
}

impl AvailableSlotsQuery {
    pub fn validate(self) -> Result<SlotQuery, SchedulingError> {
        Ok(SlotQuery {
            date: parse_date(&self.date)?,
            service_ids: parse_id_list(&self.service_ids),
            staff_id: self.staff_id.filter(|s| !s.trim().is_empty()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableSlotsResponse {
    pub date: NaiveDate,
    pub duration_minutes: u32,
    pub slots: Vec<String>,
}

/// Request to create a booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub customer_id: String,
    pub service_ids: Vec<String>,
    #[serde(default)]
    pub staff_id: Option<String>,
    pub date: String,
    pub start_time: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub channel: BookingChannel,
}

/// Validated booking creation command
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub customer_id: String,
    pub service_ids: Vec<String>,
    pub staff_id: Option<String>,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub notes: Option<String>,
    pub channel: BookingChannel,
}

impl CreateBookingRequest {
    pub fn validate(self) -> Result<NewBooking, SchedulingError> {
        let customer_id = self.customer_id.trim().to_string();
        if customer_id.is_empty() {
            return Err(SchedulingError::Validation("customer_id is required".into()));
        }
        let service_ids = dedup_ids(self.service_ids);
        if service_ids.is_empty() {
            return Err(SchedulingError::Validation(
                "at least one service is required".into(),
            ));
        }

        Ok(NewBooking {
            customer_id,
            service_ids,
            staff_id: self.staff_id.filter(|s| !s.trim().is_empty()),
            date: parse_date(&self.date)?,
            start_time: self.start_time.trim().parse()?,
            notes: self.notes,
            channel: self.channel,
        })
    }
}

/// Partial update of an existing booking
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBookingRequest {
    #[serde(default)]
    pub service_ids: Option<Vec<String>>,
    #[serde(default)]
    pub staff_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Validated booking edit
#[derive(Debug, Clone, Default)]
pub struct BookingChanges {
    pub service_ids: Option<Vec<String>>,
    pub staff_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<TimeOfDay>,
    pub notes: Option<String>,
}

impl BookingChanges {
    /// Whether the edit touches when, with whom, or for how long
    pub fn touches_schedule(&self) -> bool {
        self.service_ids.is_some()
            || self.staff_id.is_some()
            || self.date.is_some()
            || self.start_time.is_some()
    }
}

impl UpdateBookingRequest {
    pub fn validate(self) -> Result<BookingChanges, SchedulingError> {
        let service_ids = match self.service_ids {
            Some(ids) => {
                let ids = dedup_ids(ids);
                if ids.is_empty() {
                    return Err(SchedulingError::Validation(
                        "at least one service is required".into(),
                    ));
                }
                Some(ids)
            }
            None => None,
        };

        let staff_id = match self.staff_id {
            Some(id) if id.trim().is_empty() => {
                return Err(SchedulingError::StaffRequired);
            }
            other => other,
        };

        Ok(BookingChanges {
            service_ids,
            staff_id,
            date: self.date.as_deref().map(parse_date).transpose()?,
            start_time: self
                .start_time
                .as_deref()
                .map(|s| s.trim().parse())
                .transpose()?,
            notes: self.notes,
        })
    }
}

/// Request to move a booking to another status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangeRequest {
    pub status: String,
}

impl StatusChangeRequest {
    pub fn validate(&self) -> Result<BookingStatus, SchedulingError> {
        BookingStatus::parse(self.status.trim()).ok_or_else(|| {
            SchedulingError::Validation(format!("unknown booking status {:?}", self.status))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingListResponse {
    pub bookings: Vec<Booking>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_names() {
        assert_eq!(BookingStatus::parse("no_show"), Some(BookingStatus::NoShow));
        assert_eq!(BookingStatus::parse("CONFIRMED"), Some(BookingStatus::Confirmed));
        assert_eq!(BookingStatus::parse("done"), None);
        assert_eq!(
            serde_json::to_string(&BookingStatus::NoShow).unwrap(),
            "\"NO_SHOW\""
        );
    }

    #[test]
    fn test_slot_holding_statuses() {
        assert!(BookingStatus::Pending.holds_slot());
        assert!(BookingStatus::Confirmed.holds_slot());
        assert!(BookingStatus::Completed.holds_slot());
        assert!(!BookingStatus::Cancelled.holds_slot());
        assert!(!BookingStatus::NoShow.holds_slot());
    }

    #[test]
    fn test_create_request_validation() {
        let req = CreateBookingRequest {
            customer_id: "cust-1".into(),
            service_ids: vec!["cut".into(), "cut".into(), "color".into()],
            staff_id: Some("  ".into()),
            date: "2026-03-02".into(),
            start_time: "09:30".into(),
            notes: None,
            channel: BookingChannel::Online,
        };
        let booking = req.validate().unwrap();
        assert_eq!(booking.service_ids, vec!["cut", "color"]);
        assert_eq!(booking.staff_id, None);
        assert_eq!(booking.start_time.to_string(), "09:30");
    }

    #[test]
    fn test_create_request_rejects_bad_input() {
        let base = CreateBookingRequest {
            customer_id: "cust-1".into(),
            service_ids: vec!["cut".into()],
            staff_id: None,
            date: "2026-03-02".into(),
            start_time: "09:30".into(),
            notes: None,
            channel: BookingChannel::Staff,
        };

        let mut no_services = base.clone();
        no_services.service_ids.clear();
        assert!(matches!(
            no_services.validate(),
            Err(SchedulingError::Validation(_))
        ));

        let mut bad_time = base.clone();
        bad_time.start_time = "9.30".into();
        assert!(matches!(
            bad_time.validate(),
            Err(SchedulingError::InvalidFormat(_))
        ));

        let mut bad_date = base;
        bad_date.date = "02/03/2026".into();
        assert!(matches!(bad_date.validate(), Err(SchedulingError::Validation(_))));
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("a, b,,a"), vec!["a", "b"]);
        assert!(parse_id_list("").is_empty());
    }

    #[test]
    fn test_service_id_list_is_not_resplit() {
        let req = CreateBookingRequest {
            customer_id: "cust-1".into(),
            service_ids: vec!["cut,color".into(), " cut,color ".into(), "".into()],
            staff_id: None,
            date: "2026-03-02".into(),
            start_time: "09:30".into(),
            notes: None,
            channel: BookingChannel::Staff,
        };
        assert_eq!(req.validate().unwrap().service_ids, vec!["cut,color"]);

        let changes = UpdateBookingRequest {
            service_ids: Some(vec!["cut,color".into()]),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(changes.service_ids, Some(vec!["cut,color".to_string()]));
    }

    #[test]
    fn test_update_touches_schedule() {
        let notes_only = UpdateBookingRequest {
            notes: Some("bring photos".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert!(!notes_only.touches_schedule());

        let moved = UpdateBookingRequest {
            start_time: Some("11:00".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert!(moved.touches_schedule());
    }
}
