mod events;

pub use events::*;

use anyhow::{Context, Result};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::db::Database;
use crate::models::{Booking, BookingStatus};
use crate::schedule::BookingNotifier;

type HmacSha256 = Hmac<Sha256>;

/// Generate a random secret for signing webhook deliveries
pub fn generate_webhook_secret() -> String {
    let random_bytes: [u8; 32] = rand::random();
    hex::encode(random_bytes)
}

/// Header carrying the hex HMAC of `"{timestamp}.{body}"`
pub const SIGNATURE_HEADER: &str = "X-Salond-Signature";
/// Header carrying the unix timestamp that was signed
pub const TIMESTAMP_HEADER: &str = "X-Salond-Timestamp";

/// Deliveries older than this are rejected by `verify_signature`
const MAX_SIGNATURE_AGE_SECS: i64 = 300;
const DELIVERY_ATTEMPTS: u32 = 3;

fn mac_for(secret: &str, timestamp: &str, payload: &str) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).context("Invalid HMAC key")?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    Ok(mac)
}

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`
pub fn sign_payload(secret: &str, timestamp: &str, payload: &str) -> Result<String> {
    let mac = mac_for(secret, timestamp, payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a received delivery. Stale timestamps and malformed signatures
/// verify as false.
pub fn verify_signature(secret: &str, timestamp: &str, payload: &str, signature: &str) -> Result<bool> {
    let ts: i64 = timestamp.parse().context("Invalid timestamp")?;
    if (Utc::now().timestamp() - ts).abs() > MAX_SIGNATURE_AGE_SECS {
        return Ok(false);
    }
    let Ok(expected) = hex::decode(signature) else {
        return Ok(false);
    };
    let mac = mac_for(secret, timestamp, payload)?;
    Ok(mac.verify_slice(&expected).is_ok())
}

/// Webhook delivery client
#[derive(Clone)]
pub struct WebhookClient {
    http_client: reqwest::Client,
}

impl WebhookClient {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
        }
    }

    /// Deliver an event, retrying connection failures and 5xx answers
    pub async fn deliver(&self, url: &str, secret: &str, event: &WebhookEvent) -> Result<()> {
        let payload = serde_json::to_string(event).context("Failed to serialize webhook event")?;

        let mut attempt = 1;
        loop {
            match self.post_once(url, secret, &payload).await {
                Ok(()) => return Ok(()),
                Err(Delivery::Permanent(e)) => return Err(e),
                Err(Delivery::Transient(e)) if attempt >= DELIVERY_ATTEMPTS => return Err(e),
                Err(Delivery::Transient(e)) => {
                    tracing::debug!("{} delivery attempt {} failed: {}", event.event, attempt, e);
                    tokio::time::sleep(std::time::Duration::from_millis(500 * u64::from(attempt)))
                        .await;
                    attempt += 1;
                }
            }
        }
    }

    async fn post_once(&self, url: &str, secret: &str, payload: &str) -> Result<(), Delivery> {
        // Signed per attempt so retries carry a fresh timestamp
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_payload(secret, &timestamp, payload).map_err(Delivery::Permanent)?;

        let response = self
            .http_client
            .post(url)
            .header("Content-Type", "application/json")
            .header(SIGNATURE_HEADER, signature)
            .header(TIMESTAMP_HEADER, &timestamp)
            .body(payload.to_string())
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| Delivery::Transient(anyhow::Error::new(e).context("Failed to send webhook")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        let err = anyhow::anyhow!("Webhook delivery failed: {} - {}", status, body);
        if status.is_server_error() {
            Err(Delivery::Transient(err))
        } else {
            Err(Delivery::Permanent(err))
        }
    }
}

impl Default for WebhookClient {
    fn default() -> Self {
        Self::new()
    }
}

enum Delivery {
    Transient(anyhow::Error),
    Permanent(anyhow::Error),
}

/// Publishes booking events to the shop's registered webhook
#[derive(Clone)]
pub struct WebhookNotifier {
    db: Database,
    client: WebhookClient,
}

impl WebhookNotifier {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            client: WebhookClient::new(),
        }
    }

    fn publish(&self, event: WebhookEvent) {
        let shop = match self.db.get_shop(&event.shop_id) {
            Ok(Some(shop)) => shop,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("Skipping {} webhook, shop lookup failed: {}", event.event, e);
                return;
            }
        };
        let (Some(url), Some(secret)) = (shop.webhook_url, shop.webhook_secret) else {
            return;
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime, dropping {} webhook", event.event);
            return;
        };

        let client = self.client.clone();
        // Fire and forget - don't block on webhook delivery
        runtime.spawn(async move {
            if let Err(e) = client.deliver(&url, &secret, &event).await {
                tracing::warn!("Failed to deliver webhook: {}", e);
            }
        });
    }
}

impl BookingNotifier for WebhookNotifier {
    fn booking_created(&self, booking: &Booking) {
        self.publish(WebhookEvent::for_booking(
            WebhookEventType::BookingCreated,
            booking,
        ));
    }

    fn booking_updated(&self, booking: &Booking) {
        self.publish(WebhookEvent::for_booking(
            WebhookEventType::BookingUpdated,
            booking,
        ));
    }

    fn booking_status_changed(&self, booking: &Booking, previous: BookingStatus) {
        let data = WebhookEventData::from(booking).with_previous_status(previous);
        self.publish(WebhookEvent::new(
            WebhookEventType::BookingStatusChanged,
            &booking.shop_id,
            Some(data),
        ));
    }

    fn booking_cancelled(&self, booking: &Booking) {
        self.publish(WebhookEvent::for_booking(
            WebhookEventType::BookingCancelled,
            booking,
        ));
    }
}
