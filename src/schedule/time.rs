//! Wall-clock arithmetic on minute offsets within a single day.

use crate::error::{Result, SchedulingError};

/// Minutes in a calendar day
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Parse "HH:mm" into minutes since midnight (0..=1439)
pub fn parse_time(s: &str) -> Result<u16> {
    let invalid = || SchedulingError::InvalidFormat(s.to_string());

    let (hours, minutes) = s.split_once(':').ok_or_else(invalid)?;
    if hours.len() != 2 || minutes.len() != 2 {
        return Err(invalid());
    }
    if !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let h: u16 = hours.parse().map_err(|_| invalid())?;
    let m: u16 = minutes.parse().map_err(|_| invalid())?;
    if h > 23 || m > 59 {
        return Err(invalid());
    }

    Ok(h * 60 + m)
}

/// Format minutes since midnight as zero-padded "HH:mm"
pub fn format_time(minutes: u16) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Compute the end of an appointment that starts at `start` and lasts
/// `duration` minutes. The result must stay within the same day.
pub fn add_minutes(start: u16, duration: u32) -> Result<u16> {
    match u32::from(start).checked_add(duration) {
        Some(end) if end < MINUTES_PER_DAY => Ok(end as u16),
        _ => Err(SchedulingError::CrossesMidnight {
            start: format_time(start),
            duration,
        }),
    }
}

/// Half-open overlap test: `[a_start, a_end)` vs `[b_start, b_end)`.
/// Intervals that only touch at a boundary do not overlap.
pub fn intervals_overlap(a_start: u16, a_end: u16, b_start: u16, b_end: u16) -> bool {
    a_start < b_end && a_end > b_start
}
