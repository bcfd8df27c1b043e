use axum::{
    extract::{Extension, Query, State},
    Json,
};
use std::sync::Arc;

use crate::error::SchedulingError;
use crate::models::{AvailableSlotsQuery, AvailableSlotsResponse};
use crate::server::middleware::ShopScope;
use crate::server::AppState;

/// List start times at which the requested services can still be booked
pub async fn available_slots(
    State(state): State<Arc<AppState>>,
    Extension(ShopScope(shop)): Extension<ShopScope>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<AvailableSlotsResponse>, SchedulingError> {
    let query = query.validate()?;
    let response = state.engine.available_slots(&shop.id, &query)?;
    Ok(Json(response))
}
