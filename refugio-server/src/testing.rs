//! Route test fixtures: in-memory collaborators and a request helper.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use refugio_core::booking::MemoryReviewQueue;
use refugio_core::payment::{
    CheckoutSession, PaymentDetails, PaymentIntentContext, PaymentProvider,
};
use refugio_core::reservation::{ReservationRecord, ReservationSource, ReservationStatus};
use refugio_core::store::MemoryRecordStore;
use refugio_core::{FeedFetcher, RefugioError, RefugioResult, SiteConfig};
use serde_json::Value;
use tower::ServiceExt;

use crate::routes;
use crate::state::AppState;

pub const CONFIG: &str = r#"
domain = "refugio.example"

[[units]]
id = "refugio-intimo"
name = "Refugio Íntimo"
capacity = 2
nightly_rate = 65000
cleaning_fee = 15000

[[units]]
id = "cabana-bosque"
name = "Cabaña del Bosque"
capacity = 6
nightly_rate = 90000

[payment]
access_token = "TEST-token"
webhook_secret = "whsec"

[sync]
token = "sync-token"
"#;

/// Serves whatever payments a test puts in it.
#[derive(Default)]
pub struct FakePayments {
    pub payments: Mutex<Vec<PaymentDetails>>,
}

#[async_trait]
impl PaymentProvider for FakePayments {
    async fn create_checkout(&self, intent: &PaymentIntentContext) -> RefugioResult<CheckoutSession> {
        Ok(CheckoutSession {
            preference_id: format!("pref-{}", intent.reference),
            redirect_url: format!("https://pay.example/checkout/{}", intent.reference),
        })
    }

    async fn get_payment(&self, payment_id: &str) -> RefugioResult<PaymentDetails> {
        self.payments
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == payment_id)
            .cloned()
            .ok_or_else(|| RefugioError::Payment("HTTP 404".into()))
    }
}

pub struct Fixture {
    pub app: Router,
    pub store: Arc<MemoryRecordStore>,
    pub payments: Arc<FakePayments>,
    pub review: Arc<MemoryReviewQueue>,
}

pub fn fixture(records: Vec<ReservationRecord>) -> Fixture {
    fixture_with(SiteConfig::from_toml(CONFIG).unwrap(), records)
}

pub fn fixture_with(config: SiteConfig, records: Vec<ReservationRecord>) -> Fixture {
    let store = Arc::new(MemoryRecordStore::with_records(records));
    let payments = Arc::new(FakePayments::default());
    let review = Arc::new(MemoryReviewQueue::new());

    let state = AppState {
        config: Arc::new(config),
        store: store.clone(),
        payments: payments.clone(),
        review: review.clone(),
        fetcher: FeedFetcher::new(Duration::from_secs(2)).unwrap(),
    };

    Fixture {
        app: routes::router(state),
        store,
        payments,
        review,
    }
}

pub fn record(id: &str, unit_id: &str, check_in: &str, check_out: &str) -> ReservationRecord {
    let stamp = chrono::DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
        .unwrap()
        .to_utc();
    ReservationRecord {
        id: id.into(),
        unit_id: unit_id.into(),
        check_in: check_in.parse().unwrap(),
        check_out: check_out.parse().unwrap(),
        guest: refugio_core::reservation::GuestContact {
            name: "Ana Soto".into(),
            email: Some("ana@example.com".into()),
            phone: None,
        },
        party: Default::default(),
        status: ReservationStatus::Confirmed,
        source: ReservationSource::Direct,
        external_id: None,
        reservation_code: Some("RF00AA11BB".into()),
        payment: None,
        special_requests: None,
        created_at: stamp,
        updated_at: stamp,
    }
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Send one request and return the status and raw body.
pub async fn send_raw(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

/// Send one request and decode a JSON body (`Null` when empty).
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send_raw(app, request).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&body).unwrap()
    };
    (status, value)
}
