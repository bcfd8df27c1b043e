use anyhow::Context;
use chrono::NaiveDate;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior,
};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Result, SchedulingError};
use crate::models::{
    Booking, BookingStatus, Customer, SeedData, Service, Shift, Shop, Staff, TimeOfDay,
};
use crate::schedule::{BookingGuard, SchedulingStore};

#[cfg(test)]
pub(crate) mod fixtures;

const MIGRATION_001: &str = include_str!("migrations/001_initial.sql");

const BOOKING_COLUMNS: &str = "id, booking_code, shop_id, customer_id, staff_id, appointment_date,
     start_minute, end_minute, total_duration_minutes, total_price, status, notes,
     created_at, updated_at";

/// Database connection wrapper
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> anyhow::Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch(MIGRATION_001)
            .context("Failed to run migration 001")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| SchedulingError::Internal("database connection lock poisoned".into()))
    }

    // ==================== Shop Operations ====================

    /// Create or replace a shop
    pub fn upsert_shop(&self, shop: &Shop) -> Result<()> {
        let conn = self.conn()?;
        upsert_shop(&conn, shop)
    }

    /// Get a shop by ID
    pub fn get_shop(&self, id: &str) -> Result<Option<Shop>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, webhook_url, webhook_secret, created_at FROM shops WHERE id = ?1",
            params![id],
            |row| {
                Ok(Shop {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    webhook_url: row.get(2)?,
                    webhook_secret: row.get(3)?,
                    created_at: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(Into::into)
    }

    /// Update the shop's webhook configuration
    pub fn update_shop_webhook(
        &self,
        shop_id: &str,
        webhook_url: Option<&str>,
        webhook_secret: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE shops SET webhook_url = ?1, webhook_secret = ?2 WHERE id = ?3",
            params![webhook_url, webhook_secret, shop_id],
        )?;
        Ok(())
    }

    // ==================== Catalog Operations ====================

    /// Create or replace a staff member together with their weekly schedule
    pub fn upsert_staff(&self, staff: &Staff) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        upsert_staff(&tx, staff)?;
        tx.commit()?;
        Ok(())
    }

    pub fn upsert_service(&self, service: &Service) -> Result<()> {
        let conn = self.conn()?;
        upsert_service(&conn, service)
    }

    pub fn upsert_customer(&self, customer: &Customer) -> Result<()> {
        let conn = self.conn()?;
        upsert_customer(&conn, customer)
    }

    /// Load a fixture in one transaction
    pub fn seed(&self, data: &SeedData) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for shop in &data.shops {
            upsert_shop(&tx, shop)?;
        }
        for staff in &data.staff {
            upsert_staff(&tx, staff)?;
        }
        for service in &data.services {
            upsert_service(&tx, service)?;
        }
        for customer in &data.customers {
            upsert_customer(&tx, customer)?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn upsert_shop(conn: &Connection, shop: &Shop) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO shops (id, name, webhook_url, webhook_secret, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(id) DO UPDATE SET name = excluded.name
        "#,
        params![
            shop.id,
            shop.name,
            shop.webhook_url,
            shop.webhook_secret,
            shop.created_at,
        ],
    )?;
    Ok(())
}

fn upsert_staff(conn: &Connection, staff: &Staff) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO staff (id, shop_id, name, active) VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(id) DO UPDATE SET name = excluded.name, active = excluded.active
        "#,
        params![staff.id, staff.shop_id, staff.name, staff.active],
    )?;
    conn.execute(
        "DELETE FROM staff_shifts WHERE staff_id = ?1",
        params![staff.id],
    )?;
    for (position, shift) in staff.work_schedule.iter().enumerate() {
        conn.execute(
            r#"
            INSERT INTO staff_shifts (staff_id, position, day_of_week, start_time, end_time)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                staff.id,
                position as i64,
                shift.day_of_week,
                shift.start_time.to_string(),
                shift.end_time.to_string(),
            ],
        )?;
    }
    Ok(())
}

fn upsert_service(conn: &Connection, service: &Service) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO services (id, shop_id, name, duration_minutes, price)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(id) DO UPDATE SET name = excluded.name,
            duration_minutes = excluded.duration_minutes, price = excluded.price
        "#,
        params![
            service.id,
            service.shop_id,
            service.name,
            service.duration_minutes,
            service.price.to_string(),
        ],
    )?;
    Ok(())
}

fn upsert_customer(conn: &Connection, customer: &Customer) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO customers (id, shop_id, name, phone) VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(id) DO UPDATE SET name = excluded.name, phone = excluded.phone
        "#,
        params![customer.id, customer.shop_id, customer.name, customer.phone],
    )?;
    Ok(())
}

// ==================== Row Mapping ====================

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

/// Dates are written as `YYYY-MM-DD`; anything after the date part of an
/// older timestamp-style value is ignored.
fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    let day = raw.get(..10).unwrap_or(&raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| conversion_error(idx, e))
}

fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<TimeOfDay> {
    let minutes: u16 = row.get(idx)?;
    TimeOfDay::from_minutes(minutes).ok_or(rusqlite::Error::IntegralValueOutOfRange(
        idx,
        i64::from(minutes),
    ))
}

fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn status_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<BookingStatus> {
    let raw: String = row.get(idx)?;
    BookingStatus::parse(&raw).ok_or(rusqlite::Error::InvalidColumnType(
        idx,
        "status".to_string(),
        rusqlite::types::Type::Text,
    ))
}

fn row_to_booking(row: &Row<'_>) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: row.get(0)?,
        booking_code: row.get(1)?,
        shop_id: row.get(2)?,
        customer_id: row.get(3)?,
        staff_id: row.get(4)?,
        service_ids: Vec::new(),
        appointment_date: date_column(row, 5)?,
        start_time: time_column(row, 6)?,
        end_time: time_column(row, 7)?,
        total_duration_minutes: row.get(8)?,
        total_price: decimal_column(row, 9)?,
        status: status_column(row, 10)?,
        notes: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn attach_service_ids(conn: &Connection, mut bookings: Vec<Booking>) -> Result<Vec<Booking>> {
    let mut stmt = conn.prepare(
        "SELECT service_id FROM booking_services WHERE booking_id = ?1 ORDER BY position",
    )?;
    for booking in &mut bookings {
        booking.service_ids = stmt
            .query_map(params![booking.id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
    }
    Ok(bookings)
}

fn query_bookings<P: rusqlite::Params>(
    conn: &Connection,
    filter: &str,
    params: P,
) -> Result<Vec<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE {filter}");
    let mut stmt = conn.prepare(&sql)?;
    let bookings = stmt
        .query_map(params, row_to_booking)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    attach_service_ids(conn, bookings)
}

fn next_day(date: NaiveDate) -> Result<NaiveDate> {
    date.succ_opt()
        .ok_or_else(|| SchedulingError::Validation(format!("date {date} is out of range")))
}

/// Slot-holding bookings of one staff member over the whole calendar day.
/// The range form tolerates stored values that carry a time of day.
fn staff_day_bookings(
    conn: &Connection,
    shop_id: &str,
    staff_id: &str,
    date: NaiveDate,
    exclude_booking: Option<&str>,
) -> Result<Vec<Booking>> {
    query_bookings(
        conn,
        "shop_id = ?1 AND staff_id = ?2
         AND appointment_date >= ?3 AND appointment_date < ?4
         AND status NOT IN ('CANCELLED', 'NO_SHOW')
         AND id != ?5
         ORDER BY start_minute",
        params![
            shop_id,
            staff_id,
            date,
            next_day(date)?,
            exclude_booking.unwrap_or(""),
        ],
    )
}

fn load_shifts(conn: &Connection, staff_id: &str) -> Result<Vec<Shift>> {
    let mut stmt = conn.prepare(
        "SELECT day_of_week, start_time, end_time FROM staff_shifts
         WHERE staff_id = ?1 ORDER BY position",
    )?;
    let rows = stmt
        .query_map(params![staff_id], |row| {
            Ok((
                row.get::<_, u8>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut shifts = Vec::with_capacity(rows.len());
    for (day_of_week, start, end) in rows {
        match (start.parse::<TimeOfDay>(), end.parse::<TimeOfDay>()) {
            (Ok(start_time), Ok(end_time)) => shifts.push(Shift {
                day_of_week,
                start_time,
                end_time,
            }),
            _ => tracing::warn!(
                "Ignoring malformed shift {}-{} for staff {}",
                start,
                end,
                staff_id
            ),
        }
    }
    Ok(shifts)
}

fn query_staff<P: rusqlite::Params>(conn: &Connection, filter: &str, params: P) -> Result<Vec<Staff>> {
    let sql = format!("SELECT id, shop_id, name, active FROM staff WHERE {filter}");
    let mut stmt = conn.prepare(&sql)?;
    let mut staff = stmt
        .query_map(params, |row| {
            Ok(Staff {
                id: row.get(0)?,
                shop_id: row.get(1)?,
                name: row.get(2)?,
                active: row.get(3)?,
                work_schedule: Vec::new(),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    for member in &mut staff {
        member.work_schedule = load_shifts(conn, &member.id)?;
    }
    Ok(staff)
}

/// Translate constraint failures raised while writing a booking
fn map_write_error(err: rusqlite::Error) -> SchedulingError {
    if let rusqlite::Error::SqliteFailure(_, Some(message)) = &err {
        if message.contains("staff_unavailable") {
            return SchedulingError::StaffUnavailable(
                "the requested time overlaps an existing booking".into(),
            );
        }
        if message.contains("bookings.booking_code") {
            return SchedulingError::BookingCodeTaken;
        }
    }
    SchedulingError::Database(err)
}

fn write_booking_services(conn: &Connection, booking: &Booking) -> Result<()> {
    conn.execute(
        "DELETE FROM booking_services WHERE booking_id = ?1",
        params![booking.id],
    )?;
    for (position, service_id) in booking.service_ids.iter().enumerate() {
        conn.execute(
            "INSERT INTO booking_services (booking_id, position, service_id) VALUES (?1, ?2, ?3)",
            params![booking.id, position as i64, service_id],
        )?;
    }
    Ok(())
}

impl SchedulingStore for Database {
    fn get_services_by_ids(&self, shop_id: &str, ids: &[String]) -> Result<Vec<Service>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id, shop_id, name, duration_minutes, price FROM services
             WHERE shop_id = ? AND id IN ({placeholders})"
        );
        let mut stmt = conn.prepare(&sql)?;
        let args = std::iter::once(shop_id).chain(ids.iter().map(String::as_str));
        let services = stmt
            .query_map(params_from_iter(args), |row| {
                Ok(Service {
                    id: row.get(0)?,
                    shop_id: row.get(1)?,
                    name: row.get(2)?,
                    duration_minutes: row.get(3)?,
                    price: decimal_column(row, 4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(services)
    }

    fn get_active_staff(&self, shop_id: &str) -> Result<Vec<Staff>> {
        let conn = self.conn()?;
        query_staff(
            &conn,
            "shop_id = ?1 AND active = 1 ORDER BY name, id",
            params![shop_id],
        )
    }

    fn get_staff_by_id(&self, shop_id: &str, staff_id: &str) -> Result<Option<Staff>> {
        let conn = self.conn()?;
        let staff = query_staff(&conn, "shop_id = ?1 AND id = ?2", params![shop_id, staff_id])?;
        Ok(staff.into_iter().next())
    }

    fn customer_exists(&self, shop_id: &str, customer_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT 1 FROM customers WHERE shop_id = ?1 AND id = ?2")?;
        Ok(stmt.exists(params![shop_id, customer_id])?)
    }

    fn find_bookings_for_staff_on_date(
        &self,
        shop_id: &str,
        staff_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Booking>> {
        let conn = self.conn()?;
        staff_day_bookings(&conn, shop_id, staff_id, date, None)
    }

    fn get_booking(&self, shop_id: &str, booking_id: &str) -> Result<Option<Booking>> {
        let conn = self.conn()?;
        let bookings = query_bookings(
            &conn,
            "shop_id = ?1 AND id = ?2",
            params![shop_id, booking_id],
        )?;
        Ok(bookings.into_iter().next())
    }

    fn get_booking_by_code(&self, shop_id: &str, code: &str) -> Result<Option<Booking>> {
        let conn = self.conn()?;
        let bookings = query_bookings(
            &conn,
            "shop_id = ?1 AND booking_code = ?2",
            params![shop_id, code],
        )?;
        Ok(bookings.into_iter().next())
    }

    fn list_bookings_on_date(&self, shop_id: &str, date: NaiveDate) -> Result<Vec<Booking>> {
        let conn = self.conn()?;
        query_bookings(
            &conn,
            "shop_id = ?1 AND appointment_date >= ?2 AND appointment_date < ?3
             ORDER BY staff_id, start_minute",
            params![shop_id, date, next_day(date)?],
        )
    }

    fn insert_booking_guarded(&self, booking: &Booking, guard: BookingGuard<'_>) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = staff_day_bookings(
            &tx,
            &booking.shop_id,
            &booking.staff_id,
            booking.appointment_date,
            None,
        )?;
        guard(existing.as_slice())?;

        tx.execute(
            r#"
            INSERT INTO bookings (id, booking_code, shop_id, customer_id, staff_id,
                                  appointment_date, start_minute, end_minute,
                                  total_duration_minutes, total_price, status, notes,
                                  created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                booking.id,
                booking.booking_code,
                booking.shop_id,
                booking.customer_id,
                booking.staff_id,
                booking.appointment_date,
                booking.start_time.minutes(),
                booking.end_time.minutes(),
                booking.total_duration_minutes,
                booking.total_price.to_string(),
                booking.status.as_str(),
                booking.notes,
                booking.created_at,
                booking.updated_at,
            ],
        )
        .map_err(map_write_error)?;
        write_booking_services(&tx, booking)?;

        tx.commit()?;
        Ok(())
    }

    fn update_booking_guarded(
        &self,
        booking: &Booking,
        guard: Option<BookingGuard<'_>>,
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let stored: Option<String> = tx
            .query_row(
                "SELECT status FROM bookings WHERE shop_id = ?1 AND id = ?2",
                params![booking.shop_id, booking.id],
                |row| row.get(0),
            )
            .optional()?;
        match stored {
            None => return Err(SchedulingError::not_found("booking")),
            Some(status) if status != booking.status.as_str() => {
                return Err(SchedulingError::ConcurrentModification);
            }
            Some(_) => {}
        }

        if let Some(guard) = guard {
            let others = staff_day_bookings(
                &tx,
                &booking.shop_id,
                &booking.staff_id,
                booking.appointment_date,
                Some(&booking.id),
            )?;
            guard(others.as_slice())?;
        }

        tx.execute(
            r#"
            UPDATE bookings SET staff_id = ?1, appointment_date = ?2, start_minute = ?3,
                   end_minute = ?4, total_duration_minutes = ?5, total_price = ?6,
                   notes = ?7, updated_at = ?8
            WHERE shop_id = ?9 AND id = ?10
            "#,
            params![
                booking.staff_id,
                booking.appointment_date,
                booking.start_time.minutes(),
                booking.end_time.minutes(),
                booking.total_duration_minutes,
                booking.total_price.to_string(),
                booking.notes,
                booking.updated_at,
                booking.shop_id,
                booking.id,
            ],
        )
        .map_err(map_write_error)?;
        write_booking_services(&tx, booking)?;

        tx.commit()?;
        Ok(())
    }

    fn update_booking_status(
        &self,
        shop_id: &str,
        booking_id: &str,
        from: BookingStatus,
        to: BookingStatus,
        updated_at: i64,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let count = conn
            .execute(
                "UPDATE bookings SET status = ?1, updated_at = ?2
                 WHERE shop_id = ?3 AND id = ?4 AND status = ?5",
                params![to.as_str(), updated_at, shop_id, booking_id, from.as_str()],
            )
            .map_err(map_write_error)?;
        Ok(count == 1)
    }
}
