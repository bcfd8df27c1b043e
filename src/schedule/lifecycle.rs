use tracing::warn;

use crate::error::{Result, SchedulingError};
use crate::models::BookingStatus;

/// Statuses reachable from `current` in one step
pub fn valid_transitions(current: BookingStatus) -> &'static [BookingStatus] {
    match current {
        BookingStatus::Pending => &[
            BookingStatus::Confirmed,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
            BookingStatus::NoShow,
        ],
        BookingStatus::Confirmed => &[
            BookingStatus::Completed,
            BookingStatus::Cancelled,
            BookingStatus::NoShow,
        ],
        // Terminal
        BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::NoShow => &[],
    }
}

/// Validate that a status transition is allowed
pub fn validate_transition(from: BookingStatus, to: BookingStatus) -> Result<()> {
    if valid_transitions(from).contains(&to) {
        Ok(())
    } else {
        warn!("Rejected booking status transition {} -> {}", from, to);
        Err(SchedulingError::InvalidTransition { from, to })
    }
}
