use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;

use super::AppState;
use crate::error::SchedulingError;
use crate::models::Shop;

/// Extension for the shop a request is scoped to
#[derive(Clone)]
pub struct ShopScope(pub Shop);

/// Resolve `:shop_id` and reject requests for unknown shops
pub async fn shop_scope_middleware(
    State(state): State<Arc<AppState>>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Result<Response, SchedulingError> {
    let shop_id = params
        .get("shop_id")
        .ok_or_else(|| SchedulingError::not_found("shop"))?;

    let shop = state
        .db
        .get_shop(shop_id)?
        .ok_or_else(|| SchedulingError::not_found("shop"))?;

    // Add shop to request extensions
    request.extensions_mut().insert(ShopScope(shop));

    Ok(next.run(request).await)
}
