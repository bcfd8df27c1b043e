use crate::error::{Result, SchedulingError};
use crate::models::{Shift, TimeInterval, TimeOfDay};

/// Default distance between candidate start times
pub const DEFAULT_SLOT_STEP_MINUTES: u32 = 30;

/// Check that an appointment of `duration` minutes starting at `start`
/// fits inside `shift` and collides with none of the `busy` intervals.
///
/// This is the one overlap rule used both for listing slots and for the
/// authoritative check at booking time.
pub fn check_fit(
    shift: Option<&Shift>,
    busy: &[TimeInterval],
    start: TimeOfDay,
    duration: u32,
) -> Result<TimeInterval> {
    let shift = shift.ok_or_else(|| {
        SchedulingError::StaffUnavailable("staff member is not working on this date".into())
    })?;

    let candidate = TimeInterval::new(start, start.plus(duration)?);
    let window = TimeInterval::new(shift.start_time, shift.end_time);
    if !window.contains(&candidate) {
        return Err(SchedulingError::StaffUnavailable(format!(
            "{}-{} is outside working hours {}-{}",
            candidate.start, candidate.end, window.start, window.end
        )));
    }

    if let Some(clash) = busy.iter().find(|b| b.overlaps(&candidate)) {
        return Err(SchedulingError::StaffUnavailable(format!(
            "{}-{} overlaps an existing booking {}-{}",
            candidate.start, candidate.end, clash.start, clash.end
        )));
    }

    Ok(candidate)
}

/// Enumerate start times within `shift`, `step` minutes apart, at which an
/// appointment of `duration` minutes fits without touching `busy`.
pub fn find_available_slots(
    shift: &Shift,
    busy: &[TimeInterval],
    duration: u32,
    step: u32,
) -> Vec<TimeOfDay> {
    if duration == 0 || step == 0 {
        return Vec::new();
    }

    let mut available = Vec::new();
    let mut minute = u32::from(shift.start_time.minutes());
    let close = u32::from(shift.end_time.minutes());

    while minute.checked_add(duration).is_some_and(|end| end <= close) {
        if let Some(start) = u16::try_from(minute).ok().and_then(TimeOfDay::from_minutes) {
            if check_fit(Some(shift), busy, start, duration).is_ok() {
                available.push(start);
            }
        }
        let Some(next) = minute.checked_add(step) else {
            break;
        };
        minute = next;
    }

    available
}
