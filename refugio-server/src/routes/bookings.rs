//! Booking intent endpoint

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use refugio_core::booking::{BookingRequest, IntentOutcome};
use refugio_core::pricing::Quote;
use refugio_core::DateInterval;
use serde::Serialize;

use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/bookings", post(create_booking))
}

#[derive(Serialize)]
pub struct IntentResponse {
    pub redirect_url: String,
    pub reference: String,
    pub quote: Quote,
}

#[derive(Serialize)]
pub struct UnavailableResponse {
    pub error: String,
    pub conflicts: Vec<DateInterval>,
}

/// POST /bookings - Validate, price and hand the guest to the payment provider
async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<BookingRequest>,
) -> Result<Response, AppError> {
    let outcome = state.bookings().create_intent(&req).await?;

    let response = match outcome {
        IntentOutcome::AwaitingPayment {
            redirect_url,
            reference,
            quote,
            ..
        } => (
            StatusCode::CREATED,
            Json(IntentResponse {
                redirect_url,
                reference,
                quote,
            }),
        )
            .into_response(),
        IntentOutcome::Unavailable { check } => (
            StatusCode::CONFLICT,
            Json(UnavailableResponse {
                error: "those dates are no longer available".into(),
                conflicts: check.conflicts.iter().filter_map(|r| r.interval()).collect(),
            }),
        )
            .into_response(),
    };
    Ok(response)
}
