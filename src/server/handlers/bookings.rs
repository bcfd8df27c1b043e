use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::SchedulingError;
use crate::models::{
    parse_date, Booking, BookingListResponse, CreateBookingRequest, StatusChangeRequest,
    UpdateBookingRequest,
};
use crate::server::middleware::ShopScope;
use crate::server::AppState;

#[derive(Deserialize)]
pub struct ListBookingsQuery {
    pub date: String,
}

/// Create a booking
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Extension(ShopScope(shop)): Extension<ShopScope>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), SchedulingError> {
    let booking = state.engine.create_booking(&shop.id, req.validate()?)?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// List all bookings on a date, cancelled ones included
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Extension(ShopScope(shop)): Extension<ShopScope>,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<BookingListResponse>, SchedulingError> {
    let date = parse_date(&query.date)?;
    let bookings = state.engine.list_bookings(&shop.id, date)?;
    Ok(Json(BookingListResponse { bookings }))
}

/// Get a booking by ID
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Extension(ShopScope(shop)): Extension<ShopScope>,
    Path((_, id)): Path<(String, String)>,
) -> Result<Json<Booking>, SchedulingError> {
    Ok(Json(state.engine.get_booking(&shop.id, &id)?))
}

/// Get a booking by its customer-facing code
pub async fn get_booking_by_code(
    State(state): State<Arc<AppState>>,
    Extension(ShopScope(shop)): Extension<ShopScope>,
    Path((_, code)): Path<(String, String)>,
) -> Result<Json<Booking>, SchedulingError> {
    Ok(Json(state.engine.get_booking_by_code(&shop.id, &code)?))
}

/// Edit services, staff, date, time or notes of a booking
pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    Extension(ShopScope(shop)): Extension<ShopScope>,
    Path((_, id)): Path<(String, String)>,
    Json(req): Json<UpdateBookingRequest>,
) -> Result<Json<Booking>, SchedulingError> {
    let booking = state.engine.update_booking(&shop.id, &id, req.validate()?)?;
    Ok(Json(booking))
}

/// Move a booking through its lifecycle
pub async fn change_status(
    State(state): State<Arc<AppState>>,
    Extension(ShopScope(shop)): Extension<ShopScope>,
    Path((_, id)): Path<(String, String)>,
    Json(req): Json<StatusChangeRequest>,
) -> Result<Json<Booking>, SchedulingError> {
    let to = req.validate()?;
    Ok(Json(state.engine.transition(&shop.id, &id, to)?))
}

/// Cancel a booking. The record stays and its slot is released.
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Extension(ShopScope(shop)): Extension<ShopScope>,
    Path((_, id)): Path<(String, String)>,
) -> Result<Json<Booking>, SchedulingError> {
    Ok(Json(state.engine.cancel(&shop.id, &id)?))
}
