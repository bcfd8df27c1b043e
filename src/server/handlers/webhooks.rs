use axum::{
    extract::{Extension, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::SchedulingError;
use crate::server::middleware::ShopScope;
use crate::server::AppState;
use crate::webhook::{generate_webhook_secret, WebhookClient, WebhookEvent, WebhookEventType};

#[derive(Deserialize)]
pub struct RegisterWebhookRequest {
    pub url: String,
}

#[derive(Serialize)]
pub struct RegisterWebhookResponse {
    pub url: String,
    pub secret: String,
}

/// Register or update the shop's webhook URL
pub async fn register_webhook(
    State(state): State<Arc<AppState>>,
    Extension(ShopScope(shop)): Extension<ShopScope>,
    Json(req): Json<RegisterWebhookRequest>,
) -> Result<Json<RegisterWebhookResponse>, SchedulingError> {
    // Validate URL
    let url = url::Url::parse(&req.url)
        .map_err(|e| SchedulingError::Validation(format!("invalid webhook URL: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(SchedulingError::Validation(
            "webhook URL must use http or https".into(),
        ));
    }

    // Generate new secret
    let secret = generate_webhook_secret();
    state
        .db
        .update_shop_webhook(&shop.id, Some(&req.url), Some(&secret))?;

    tracing::info!("Registered webhook for shop {}", shop.id);
    Ok(Json(RegisterWebhookResponse {
        url: req.url,
        secret,
    }))
}

/// Remove the shop's webhook
pub async fn remove_webhook(
    State(state): State<Arc<AppState>>,
    Extension(ShopScope(shop)): Extension<ShopScope>,
) -> Result<Json<serde_json::Value>, SchedulingError> {
    state.db.update_shop_webhook(&shop.id, None, None)?;
    Ok(Json(serde_json::json!({ "status": "removed" })))
}

#[derive(Serialize)]
pub struct TestWebhookResponse {
    pub success: bool,
    pub error: Option<String>,
}

/// Test webhook delivery
pub async fn test_webhook(
    Extension(ShopScope(shop)): Extension<ShopScope>,
) -> Result<Json<TestWebhookResponse>, SchedulingError> {
    let (webhook_url, webhook_secret) = match (shop.webhook_url, shop.webhook_secret) {
        (Some(url), Some(secret)) => (url, secret),
        _ => {
            return Err(SchedulingError::Validation(
                "no webhook configured for this shop".into(),
            ))
        }
    };

    let event = WebhookEvent::new(WebhookEventType::Test, &shop.id, None);

    let client = WebhookClient::new();
    let response = match client.deliver(&webhook_url, &webhook_secret, &event).await {
        Ok(()) => TestWebhookResponse {
            success: true,
            error: None,
        },
        Err(e) => TestWebhookResponse {
            success: false,
            error: Some(e.to_string()),
        },
    };
    Ok(Json(response))
}
