use chrono::{Datelike, NaiveDate};

use crate::models::{Shift, Staff, StaffAvailability};

/// Day index used by shifts: 0 = Sunday .. 6 = Saturday
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Find the shift that applies on `date`.
///
/// Only one shift per weekday is modeled. If the schedule lists several for
/// the same day the first one wins; if that one is malformed the staff member
/// is treated as not working.
pub fn resolve_shift(shifts: &[Shift], date: NaiveDate) -> Option<Shift> {
    let dow = day_of_week(date);
    shifts
        .iter()
        .find(|s| s.day_of_week == dow)
        .filter(|s| s.is_valid())
        .copied()
}

/// Resolve a staff member's working window on `date`
pub fn resolve_availability(staff: &Staff, date: NaiveDate) -> StaffAvailability {
    StaffAvailability {
        staff_id: staff.id.clone(),
        shift: resolve_shift(&staff.work_schedule, date),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift(day: u8, start: &str, end: &str) -> Shift {
        Shift {
            day_of_week: day,
            start_time: start.parse().unwrap(),
            end_time: end.parse().unwrap(),
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_day_of_week_is_sunday_based() {
        // 2026-03-01 is a Sunday
        assert_eq!(day_of_week(date("2026-03-01")), 0);
        assert_eq!(day_of_week(date("2026-03-07")), 6);
    }

    #[test]
    fn test_resolve_shift() {
        let schedule = vec![shift(1, "09:00", "17:00"), shift(3, "12:00", "20:00")];

        // Monday
        let monday = resolve_shift(&schedule, date("2026-03-02")).unwrap();
        assert_eq!(monday.start_time.to_string(), "09:00");

        // Wednesday
        let wednesday = resolve_shift(&schedule, date("2026-03-04")).unwrap();
        assert_eq!(wednesday.end_time.to_string(), "20:00");

        // Tuesday: not working
        assert!(resolve_shift(&schedule, date("2026-03-03")).is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let schedule = vec![shift(1, "09:00", "12:00"), shift(1, "14:00", "18:00")];
        let resolved = resolve_shift(&schedule, date("2026-03-02")).unwrap();
        assert_eq!(resolved.end_time.to_string(), "12:00");
    }

    #[test]
    fn test_inverted_shift_means_not_working() {
        let schedule = vec![shift(1, "17:00", "09:00")];
        assert!(resolve_shift(&schedule, date("2026-03-02")).is_none());
    }

    #[test]
    fn test_resolve_availability() {
        let staff = Staff {
            id: "stf-1".into(),
            shop_id: "shop-1".into(),
            name: "Ana".into(),
            active: true,
            work_schedule: vec![shift(2, "10:00", "18:00")],
        };
        let avail = resolve_availability(&staff, date("2026-03-03"));
        assert_eq!(avail.staff_id, "stf-1");
        assert!(avail.shift.is_some());
    }
}
