use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::middleware::shop_scope_middleware;
use super::AppState;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no shop scope)
    let public_routes = Router::new().route("/health", get(handlers::health));

    // Shop-scoped routes (shop must exist)
    let shop_routes = Router::new()
        // Availability
        .route(
            "/v1/shops/:shop_id/available-slots",
            get(handlers::availability::available_slots),
        )
        // Bookings
        .route(
            "/v1/shops/:shop_id/bookings",
            post(handlers::bookings::create_booking).get(handlers::bookings::list_bookings),
        )
        .route(
            "/v1/shops/:shop_id/bookings/code/:code",
            get(handlers::bookings::get_booking_by_code),
        )
        .route(
            "/v1/shops/:shop_id/bookings/:id",
            get(handlers::bookings::get_booking)
                .patch(handlers::bookings::update_booking)
                .delete(handlers::bookings::cancel_booking),
        )
        .route(
            "/v1/shops/:shop_id/bookings/:id/status",
            post(handlers::bookings::change_status),
        )
        // Webhooks
        .route(
            "/v1/shops/:shop_id/webhooks",
            post(handlers::webhooks::register_webhook).delete(handlers::webhooks::remove_webhook),
        )
        .route(
            "/v1/shops/:shop_id/webhooks/test",
            post(handlers::webhooks::test_webhook),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            shop_scope_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(shop_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
