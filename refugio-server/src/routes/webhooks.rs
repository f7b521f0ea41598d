//! Payment provider notifications

use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use refugio_core::booking::{BookingState, ConfirmationOutcome};
use refugio_core::payment::signature;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::routes::AppError;
use crate::state::AppState;

const PAYMENT_TYPE: &str = "payment";

pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks/payments", post(payment_notification))
}

/// Notification body. Only the payment id is used; the payment itself is
/// re-read from the provider.
#[derive(Deserialize)]
pub struct Notification {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub data: Option<NotificationData>,
}

#[derive(Deserialize)]
pub struct NotificationData {
    pub id: Value,
}

#[derive(Serialize)]
pub struct NotificationResponse {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<BookingState>,
}

/// POST /webhooks/payments - Drive the booking state machine
async fn payment_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(notification): Json<Notification>,
) -> Result<Json<NotificationResponse>, AppError> {
    if notification.kind != PAYMENT_TYPE {
        info!(kind = %notification.kind, "Ignoring non-payment notification");
        return Ok(Json(NotificationResponse {
            received: true,
            state: None,
        }));
    }

    let payment_id = notification
        .data
        .map(|d| match d.id {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .filter(|id| !id.is_empty() && id != "null")
        .ok_or_else(|| AppError::invalid("notification carries no payment id"))?;

    match state.config.payment.webhook_secret.as_deref() {
        Some(secret) if !secret.is_empty() => {
            let header = headers
                .get("x-signature")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            let request_id = headers.get("x-request-id").and_then(|v| v.to_str().ok());
            signature::verify(secret, header, request_id, &payment_id)?;
        }
        _ => warn!(payment = %payment_id, "No webhook secret configured, accepting unsigned notification"),
    }

    let outcome = state.bookings().handle_notification(&payment_id).await?;
    if let ConfirmationOutcome::ConflictDetected { conflicting_ids, .. } = &outcome {
        warn!(payment = %payment_id, conflicts = ?conflicting_ids, "Payment needs manual review");
    }

    Ok(Json(NotificationResponse {
        received: true,
        state: Some(outcome.state()),
    }))
}

#[cfg(test)]
mod tests {
    use crate::testing::{fixture, record, send};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use refugio_core::booking::ReviewQueue;
    use refugio_core::payment::{PaymentDetails, PaymentStatus, signature};
    use refugio_core::reservation::ReservationSource;
    use serde_json::{Map, Value, json};

    fn approved(id: &str, check_in: &str, check_out: &str) -> PaymentDetails {
        let metadata = json!({
            "unit_id": "cabana-bosque",
            "check_in": check_in,
            "check_out": check_out,
            "adults": 2,
            "guest_name": "Ana Soto",
            "guest_email": "ana@example.com",
            "total_amount": 180000
        });
        PaymentDetails {
            id: id.into(),
            status: PaymentStatus::Approved,
            raw_status: "approved".into(),
            amount: 180_000.0,
            metadata: metadata.as_object().cloned().unwrap_or_else(Map::new),
            approved_at: None,
        }
    }

    fn notification(payment_id: &str, signed: bool) -> Request<Body> {
        let mut builder = Request::post("/webhooks/payments")
            .header("content-type", "application/json")
            .header("x-request-id", "req-1");
        if signed {
            let v1 = signature::sign("whsec", payment_id, Some("req-1"), "1700000000").unwrap();
            builder = builder.header("x-signature", format!("ts=1700000000,v1={}", v1));
        }
        let body = json!({ "type": "payment", "data": { "id": payment_id } });
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn signed_approval_confirms_once() {
        let fx = fixture(vec![]);
        fx.payments
            .payments
            .lock()
            .unwrap()
            .push(approved("pay-1", "2025-05-01", "2025-05-03"));

        let (status, body) = send(&fx.app, notification("pay-1", true)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "reservation_confirmed");

        let (status, _) = send(&fx.app, notification("pay-1", true)).await;
        assert_eq!(status, StatusCode::OK);

        let records = fx.store.snapshot();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, ReservationSource::Direct);
    }

    #[tokio::test]
    async fn bad_signature_is_401_and_changes_nothing() {
        let fx = fixture(vec![]);
        fx.payments
            .payments
            .lock()
            .unwrap()
            .push(approved("pay-1", "2025-05-01", "2025-05-03"));

        let (status, _) = send(&fx.app, notification("pay-1", false)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(fx.store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn conflict_goes_to_review() {
        let fx = fixture(vec![record("r1", "cabana-bosque", "2025-05-02", "2025-05-04")]);
        fx.payments
            .payments
            .lock()
            .unwrap()
            .push(approved("pay-1", "2025-05-01", "2025-05-03"));

        let (status, body) = send(&fx.app, notification("pay-1", true)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "conflict_detected");
        assert_eq!(fx.store.snapshot().len(), 1);
        assert_eq!(fx.review.entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn other_notification_types_are_ignored() {
        let fx = fixture(vec![]);
        let request = Request::post("/webhooks/payments")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "type": "merchant_order", "data": { "id": 5 } }).to_string()))
            .unwrap();

        let (status, body) = send(&fx.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], Value::Null);
    }

    #[tokio::test]
    async fn provider_outage_is_retryable() {
        let fx = fixture(vec![]);
        let (status, _) = send(&fx.app, notification("unknown", true)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }
}
