//! Shared test data: two shops, a small team and a service menu.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::Database;
use crate::models::{Booking, BookingStatus, Customer, SeedData, Service, Shift, Shop, Staff};
use crate::schedule::generate_booking_code;

pub const SHOP_A: &str = "shop-a";
pub const SHOP_B: &str = "shop-b";
/// A Monday
pub const MONDAY: &str = "2026-03-02";
/// A Tuesday
pub const TUESDAY: &str = "2026-03-03";

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn shift(day_of_week: u8, start: &str, end: &str) -> Shift {
    Shift {
        day_of_week,
        start_time: start.parse().unwrap(),
        end_time: end.parse().unwrap(),
    }
}

fn service(shop_id: &str, id: &str, minutes: u32, price_cents: i64) -> Service {
    Service {
        id: id.into(),
        shop_id: shop_id.into(),
        name: id.replace('-', " "),
        duration_minutes: minutes,
        price: Decimal::new(price_cents, 2),
    }
}

pub fn seed_data() -> SeedData {
    SeedData {
        shops: vec![
            Shop {
                id: SHOP_A.into(),
                name: "Studio A".into(),
                webhook_url: None,
                webhook_secret: None,
                created_at: 0,
            },
            Shop {
                id: SHOP_B.into(),
                name: "Studio B".into(),
                webhook_url: None,
                webhook_secret: None,
                created_at: 0,
            },
        ],
        staff: vec![
            Staff {
                id: "ana".into(),
                shop_id: SHOP_A.into(),
                name: "Ana".into(),
                active: true,
                // Monday to Friday, 09:00-17:00
                work_schedule: (1..=5).map(|d| shift(d, "09:00", "17:00")).collect(),
            },
            Staff {
                id: "ben".into(),
                shop_id: SHOP_A.into(),
                name: "Ben".into(),
                active: true,
                work_schedule: vec![shift(1, "10:00", "12:00")],
            },
            Staff {
                id: "cleo".into(),
                shop_id: SHOP_A.into(),
                name: "Cleo".into(),
                active: false,
                work_schedule: vec![shift(1, "08:00", "20:00")],
            },
            Staff {
                id: "dana".into(),
                shop_id: SHOP_B.into(),
                name: "Dana".into(),
                active: true,
                work_schedule: vec![shift(1, "09:00", "17:00")],
            },
        ],
        services: vec![
            service(SHOP_A, "cut", 30, 2500),
            service(SHOP_A, "color", 60, 8000),
            service(SHOP_A, "style", 45, 4000),
            service(SHOP_B, "shop-b-cut", 30, 3000),
        ],
        customers: vec![
            Customer {
                id: "cust-1".into(),
                shop_id: SHOP_A.into(),
                name: "Maria".into(),
                phone: Some("+33 6 12 34 56 78".into()),
            },
            Customer {
                id: "cust-b".into(),
                shop_id: SHOP_B.into(),
                name: "Tom".into(),
                phone: None,
            },
        ],
    }
}

/// Fresh in-memory database with the standard fixture loaded
pub fn salon() -> Database {
    let db = Database::open_in_memory().unwrap();
    db.seed(&seed_data()).unwrap();
    db
}

/// A Monday booking in shop A for `cust-1`
pub fn booking(id: &str, staff_id: &str, start: &str, end: &str, status: BookingStatus) -> Booking {
    let start_time: crate::models::TimeOfDay = start.parse().unwrap();
    let end_time: crate::models::TimeOfDay = end.parse().unwrap();
    Booking {
        id: id.into(),
        booking_code: generate_booking_code(),
        shop_id: SHOP_A.into(),
        customer_id: "cust-1".into(),
        staff_id: staff_id.into(),
        service_ids: vec!["color".into()],
        appointment_date: date(MONDAY),
        start_time,
        end_time,
        total_duration_minutes: u32::from(end_time.minutes() - start_time.minutes()),
        total_price: Decimal::new(8000, 2),
        status,
        notes: None,
        created_at: 0,
        updated_at: 0,
    }
}
