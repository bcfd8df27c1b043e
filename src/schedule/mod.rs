//! Appointment scheduling engine.
//!
//! The engine is stateless: every call re-reads what it needs from the
//! injected [`SchedulingStore`]. Slot listings are advisory; the check that
//! actually prevents double-booking runs inside the store's guarded write.

mod code;
pub mod lifecycle;
pub mod shift;
pub mod slots;
pub mod time;

pub use code::generate_booking_code;
pub use lifecycle::{valid_transitions, validate_transition};
pub use shift::{day_of_week, resolve_availability, resolve_shift};
pub use slots::{check_fit, find_available_slots, DEFAULT_SLOT_STEP_MINUTES};

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, SchedulingError};
use crate::models::{
    AvailableSlotsResponse, Booking, BookingChanges, BookingStatus, NewBooking, Service, Shift,
    SlotQuery, Staff, TimeInterval, TimeOfDay,
};

/// How many fresh booking codes to try before giving up
const MAX_CODE_ATTEMPTS: usize = 5;

/// Check run by the store against the other active bookings of the same
/// staff member and day, inside the write transaction.
pub type BookingGuard<'a> = &'a dyn Fn(&[Booking]) -> Result<()>;

/// Read/write access to shop data needed for scheduling.
///
/// Every method is scoped by `shop_id`; an id that exists under another shop
/// must behave exactly like one that does not exist at all.
pub trait SchedulingStore: Send + Sync {
    fn get_services_by_ids(&self, shop_id: &str, ids: &[String]) -> Result<Vec<Service>>;

    /// Active staff of the shop, ordered by name then id
    fn get_active_staff(&self, shop_id: &str) -> Result<Vec<Staff>>;

    fn get_staff_by_id(&self, shop_id: &str, staff_id: &str) -> Result<Option<Staff>>;

    fn customer_exists(&self, shop_id: &str, customer_id: &str) -> Result<bool>;

    /// Bookings that still hold time (not CANCELLED / NO_SHOW)
    fn find_bookings_for_staff_on_date(
        &self,
        shop_id: &str,
        staff_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Booking>>;

    fn get_booking(&self, shop_id: &str, booking_id: &str) -> Result<Option<Booking>>;

    fn get_booking_by_code(&self, shop_id: &str, code: &str) -> Result<Option<Booking>>;

    /// Every booking of the day regardless of status
    fn list_bookings_on_date(&self, shop_id: &str, date: NaiveDate) -> Result<Vec<Booking>>;

    /// Atomically load the staff member's active bookings for the booking's
    /// date, run `guard` on them and insert `booking` if it passes.
    fn insert_booking_guarded(&self, booking: &Booking, guard: BookingGuard<'_>) -> Result<()>;

    /// Atomically re-check (when `guard` is given) and overwrite `booking`.
    /// The booking itself is excluded from the list passed to `guard`. Fails
    /// with `ConcurrentModification` if its stored status changed meanwhile.
    fn update_booking_guarded(
        &self,
        booking: &Booking,
        guard: Option<BookingGuard<'_>>,
    ) -> Result<()>;

    /// Compare-and-set the status. Returns false if the stored status was not
    /// `from` (or the booking does not exist in this shop).
    fn update_booking_status(
        &self,
        shop_id: &str,
        booking_id: &str,
        from: BookingStatus,
        to: BookingStatus,
        updated_at: i64,
    ) -> Result<bool>;
}

/// Fire-and-forget hooks into the notification subsystem.
/// Implementations must not block and must not fail the caller.
pub trait BookingNotifier: Send + Sync {
    fn booking_created(&self, booking: &Booking);
    fn booking_updated(&self, booking: &Booking);
    fn booking_status_changed(&self, booking: &Booking, previous: BookingStatus);
    fn booking_cancelled(&self, booking: &Booking);
}

/// Notifier that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl BookingNotifier for NoopNotifier {
    fn booking_created(&self, _booking: &Booking) {}
    fn booking_updated(&self, _booking: &Booking) {}
    fn booking_status_changed(&self, _booking: &Booking, _previous: BookingStatus) {}
    fn booking_cancelled(&self, _booking: &Booking) {}
}

/// What to do when a booking request names no staff member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StaffPolicy {
    /// Reject with `StaffRequired`
    Required,
    /// Book the first active staff member who is free
    #[default]
    AutoAssign,
}

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub slot_step_minutes: u32,
    pub staff_policy: StaffPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            slot_step_minutes: DEFAULT_SLOT_STEP_MINUTES,
            staff_policy: StaffPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=720).contains(&self.slot_step_minutes) {
            return Err(SchedulingError::Validation(format!(
                "slot step must be between 1 and 720 minutes, got {}",
                self.slot_step_minutes
            )));
        }
        Ok(())
    }
}

/// Summed duration and price of the services in one booking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceTotals {
    pub duration_minutes: u32,
    pub price: Decimal,
}

impl ServiceTotals {
    /// Add up durations and prices. A total that overflows can never fit in
    /// a day and is rejected rather than wrapped.
    pub fn sum(services: &[Service]) -> Result<Self> {
        let mut totals = ServiceTotals {
            duration_minutes: 0,
            price: Decimal::ZERO,
        };
        for service in services {
            if service.duration_minutes == 0 || service.price < Decimal::ZERO {
                return Err(SchedulingError::Validation(format!(
                    "service {} has no usable duration or price",
                    service.id
                )));
            }
            totals.duration_minutes = totals
                .duration_minutes
                .checked_add(service.duration_minutes)
                .ok_or_else(|| {
                    SchedulingError::Validation("combined service duration is too long".into())
                })?;
            totals.price = totals.price.checked_add(service.price).ok_or_else(|| {
                SchedulingError::Validation("combined service price is too large".into())
            })?;
        }
        Ok(totals)
    }
}

fn busy_intervals(bookings: &[Booking]) -> Vec<TimeInterval> {
    bookings
        .iter()
        .filter(|b| b.status.holds_slot())
        .map(Booking::interval)
        .collect()
}

pub struct BookingEngine<S> {
    store: S,
    notifier: Arc<dyn BookingNotifier>,
    config: EngineConfig,
}

impl<S: SchedulingStore> BookingEngine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self {
            store,
            notifier: Arc::new(NoopNotifier),
            config,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn BookingNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolve service ids and sum their durations and prices
    pub fn resolve_services(&self, shop_id: &str, ids: &[String]) -> Result<ServiceTotals> {
        if ids.is_empty() {
            return Err(SchedulingError::Validation(
                "at least one service is required".into(),
            ));
        }

        let services = self.store.get_services_by_ids(shop_id, ids)?;
        let missing: Vec<&str> = ids
            .iter()
            .filter(|id| !services.iter().any(|s| &s.id == *id))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(SchedulingError::ServiceNotFound(missing.join(", ")));
        }

        ServiceTotals::sum(&services)
    }

    /// Start times ("HH:mm", ascending, deduplicated across staff) at which
    /// the requested services could be booked on `query.date`.
    pub fn available_slots(&self, shop_id: &str, query: &SlotQuery) -> Result<AvailableSlotsResponse> {
        if query.service_ids.is_empty() {
            return Ok(AvailableSlotsResponse {
                date: query.date,
                duration_minutes: 0,
                slots: Vec::new(),
            });
        }

        let totals = self.resolve_services(shop_id, &query.service_ids)?;

        let candidates = match &query.staff_id {
            Some(staff_id) => self
                .store
                .get_staff_by_id(shop_id, staff_id)?
                .filter(|s| s.active)
                .into_iter()
                .collect(),
            None => self.store.get_active_staff(shop_id)?,
        };

        let mut accepted: BTreeSet<TimeOfDay> = BTreeSet::new();
        for staff in &candidates {
            let Some(shift) = resolve_availability(staff, query.date).shift else {
                debug!("Staff {} is not working on {}", staff.id, query.date);
                continue;
            };

            let bookings =
                self.store
                    .find_bookings_for_staff_on_date(shop_id, &staff.id, query.date)?;
            let slots = find_available_slots(
                &shift,
                &busy_intervals(&bookings),
                totals.duration_minutes,
                self.config.slot_step_minutes,
            );
            debug!(
                "Staff {} has {} open slots on {}",
                staff.id,
                slots.len(),
                query.date
            );
            accepted.extend(slots);
        }

        Ok(AvailableSlotsResponse {
            date: query.date,
            duration_minutes: totals.duration_minutes,
            slots: accepted.iter().map(ToString::to_string).collect(),
        })
    }

    /// Validate and persist a new booking.
    ///
    /// The shift and overlap check is re-run inside the store's write
    /// transaction, so two concurrent requests for the same staff and time
    /// cannot both succeed.
    pub fn create_booking(&self, shop_id: &str, req: NewBooking) -> Result<Booking> {
        if !self.store.customer_exists(shop_id, &req.customer_id)? {
            return Err(SchedulingError::not_found("customer"));
        }

        let totals = self.resolve_services(shop_id, &req.service_ids)?;
        let end_time = req.start_time.plus(totals.duration_minutes)?;

        let (candidates, auto_assign) = match &req.staff_id {
            Some(staff_id) => {
                let staff = self
                    .store
                    .get_staff_by_id(shop_id, staff_id)?
                    .filter(|s| s.active)
                    .ok_or_else(|| SchedulingError::not_found("staff member"))?;
                (vec![staff], false)
            }
            None => match self.config.staff_policy {
                StaffPolicy::Required => return Err(SchedulingError::StaffRequired),
                StaffPolicy::AutoAssign => (self.store.get_active_staff(shop_id)?, true),
            },
        };

        let now = Utc::now().timestamp();
        let mut booking = Booking {
            id: Uuid::new_v4().to_string(),
            booking_code: String::new(),
            shop_id: shop_id.to_string(),
            customer_id: req.customer_id,
            staff_id: String::new(),
            service_ids: req.service_ids,
            appointment_date: req.date,
            start_time: req.start_time,
            end_time,
            total_duration_minutes: totals.duration_minutes,
            total_price: totals.price,
            status: req.channel.initial_status(),
            notes: req.notes,
            created_at: now,
            updated_at: now,
        };

        for staff in &candidates {
            booking.staff_id = staff.id.clone();
            match self.insert_for_staff(&mut booking, staff) {
                Ok(()) => {
                    info!(
                        "Booked {} for staff {} on {} {}-{}",
                        booking.booking_code,
                        booking.staff_id,
                        booking.appointment_date,
                        booking.start_time,
                        booking.end_time
                    );
                    self.notifier.booking_created(&booking);
                    return Ok(booking);
                }
                Err(SchedulingError::StaffUnavailable(reason)) if auto_assign => {
                    debug!("Skipping staff {} for auto-assignment: {}", staff.id, reason);
                }
                Err(e) => return Err(e),
            }
        }

        Err(SchedulingError::StaffUnavailable(format!(
            "no staff member is free on {} at {}-{}",
            booking.appointment_date, booking.start_time, booking.end_time
        )))
    }

    fn insert_for_staff(&self, booking: &mut Booking, staff: &Staff) -> Result<()> {
        let shift = resolve_shift(&staff.work_schedule, booking.appointment_date);
        let guard = slot_guard(shift, booking.start_time, booking.total_duration_minutes);

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            booking.booking_code = generate_booking_code();
            match self.store.insert_booking_guarded(booking, &guard) {
                Err(SchedulingError::BookingCodeTaken) => {
                    warn!("Booking code collision on attempt {}", attempt);
                }
                other => return other,
            }
        }

        Err(SchedulingError::Internal(
            "could not generate a unique booking code".into(),
        ))
    }

    /// Apply an edit to an existing booking. Changes to services, staff,
    /// date or start time re-run the availability guard.
    pub fn update_booking(
        &self,
        shop_id: &str,
        booking_id: &str,
        changes: BookingChanges,
    ) -> Result<Booking> {
        let current = self.get_booking(shop_id, booking_id)?;
        let reschedule = changes.touches_schedule();
        if reschedule && current.status.is_terminal() {
            return Err(SchedulingError::BookingClosed(current.status));
        }

        let mut updated = current.clone();
        if let Some(service_ids) = changes.service_ids {
            let totals = self.resolve_services(shop_id, &service_ids)?;
            updated.service_ids = service_ids;
            updated.total_duration_minutes = totals.duration_minutes;
            updated.total_price = totals.price;
        }
        if let Some(date) = changes.date {
            updated.appointment_date = date;
        }
        if let Some(start_time) = changes.start_time {
            updated.start_time = start_time;
        }
        if let Some(notes) = changes.notes {
            updated.notes = Some(notes);
        }
        updated.end_time = updated.start_time.plus(updated.total_duration_minutes)?;
        updated.updated_at = Utc::now().timestamp();

        if reschedule {
            let staff_id = changes.staff_id.as_deref().unwrap_or(&current.staff_id);
            let staff = self
                .store
                .get_staff_by_id(shop_id, staff_id)?
                .filter(|s| s.active)
                .ok_or_else(|| SchedulingError::not_found("staff member"))?;
            updated.staff_id = staff.id.clone();

            let shift = resolve_shift(&staff.work_schedule, updated.appointment_date);
            let guard = slot_guard(shift, updated.start_time, updated.total_duration_minutes);
            self.store.update_booking_guarded(&updated, Some(&guard))?;
        } else {
            self.store.update_booking_guarded(&updated, None)?;
        }

        info!("Updated booking {}", updated.booking_code);
        self.notifier.booking_updated(&updated);
        Ok(updated)
    }

    /// Move a booking to `to`, enforcing the lifecycle state machine
    pub fn transition(&self, shop_id: &str, booking_id: &str, to: BookingStatus) -> Result<Booking> {
        let mut booking = self.get_booking(shop_id, booking_id)?;
        let from = booking.status;
        validate_transition(from, to)?;

        let now = Utc::now().timestamp();
        if !self
            .store
            .update_booking_status(shop_id, booking_id, from, to, now)?
        {
            return Err(SchedulingError::ConcurrentModification);
        }
        booking.status = to;
        booking.updated_at = now;

        info!("Booking {} moved {} -> {}", booking.booking_code, from, to);
        if to == BookingStatus::Cancelled {
            self.notifier.booking_cancelled(&booking);
        } else {
            self.notifier.booking_status_changed(&booking, from);
        }
        Ok(booking)
    }

    /// Cancel a booking, freeing its time. The record is kept.
    pub fn cancel(&self, shop_id: &str, booking_id: &str) -> Result<Booking> {
        self.transition(shop_id, booking_id, BookingStatus::Cancelled)
    }

    pub fn get_booking(&self, shop_id: &str, booking_id: &str) -> Result<Booking> {
        self.store
            .get_booking(shop_id, booking_id)?
            .ok_or_else(|| SchedulingError::not_found("booking"))
    }

    pub fn get_booking_by_code(&self, shop_id: &str, code: &str) -> Result<Booking> {
        self.store
            .get_booking_by_code(shop_id, &code.trim().to_ascii_uppercase())?
            .ok_or_else(|| SchedulingError::not_found("booking"))
    }

    pub fn list_bookings(&self, shop_id: &str, date: NaiveDate) -> Result<Vec<Booking>> {
        self.store.list_bookings_on_date(shop_id, date)
    }
}

/// Guard accepting `[start, start + duration)` only if it fits `shift` and
/// overlaps none of the given bookings.
fn slot_guard(
    shift: Option<Shift>,
    start: TimeOfDay,
    duration: u32,
) -> impl Fn(&[Booking]) -> Result<()> {
    move |existing: &[Booking]| {
        check_fit(shift.as_ref(), &busy_intervals(existing), start, duration).map(|_| ())
    }
}

#[cfg(test)]
mod tests;
