//! Host-only endpoints: manual bookings, blocks, cancellations, review queue

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use refugio_core::availability::UnitCalendar;
use refugio_core::booking::{ManualEntry, ManualOutcome, ReviewEntry, ReviewQueue};
use refugio_core::reservation::ReservationRecord;
use serde::Serialize;

use crate::routes::availability::RangeQuery;
use crate::routes::{AppError, require_bearer};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/reservations", post(create_reservation))
        .route("/admin/reservations/{id}/cancel", post(cancel_reservation))
        .route("/admin/units/{id}/calendar", get(unit_calendar))
        .route("/admin/reviews", get(reviews))
}

#[derive(Serialize)]
pub struct ConflictResponse {
    pub error: String,
    pub conflicting_ids: Vec<String>,
}

/// POST /admin/reservations - Manual booking or block
async fn create_reservation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(entry): Json<ManualEntry>,
) -> Result<Response, AppError> {
    require_bearer(&headers, state.config.sync.token.as_deref())?;

    let response = match state.bookings().create_manual(&entry).await? {
        ManualOutcome::Created { reservation } => (StatusCode::CREATED, Json(reservation)).into_response(),
        ManualOutcome::Unavailable { check } => (
            StatusCode::CONFLICT,
            Json(ConflictResponse {
                error: "dates overlap existing reservations".into(),
                conflicting_ids: check.conflict_ids(),
            }),
        )
            .into_response(),
    };
    Ok(response)
}

/// POST /admin/reservations/:id/cancel - Free the dates of a reservation
async fn cancel_reservation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ReservationRecord>, AppError> {
    require_bearer(&headers, state.config.sync.token.as_deref())?;
    Ok(Json(state.bookings().cancel_reservation(&id).await?))
}

/// GET /admin/units/:id/calendar - Full calendar with event details
async fn unit_calendar(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(unit_id): Path<String>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<UnitCalendar>, AppError> {
    require_bearer(&headers, state.config.sync.token.as_deref())?;
    let range = query.interval(&state)?;
    Ok(Json(state.availability().unit_calendar(&unit_id, &range).await?))
}

/// GET /admin/reviews - Paid intents waiting for a human
async fn reviews(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ReviewEntry>>, AppError> {
    require_bearer(&headers, state.config.sync.token.as_deref())?;
    Ok(Json(state.review.entries().await?))
}
