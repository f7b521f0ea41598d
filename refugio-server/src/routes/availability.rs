//! Availability endpoints

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use chrono::{Days, Utc};
use refugio_core::DateInterval;
use refugio_core::availability::DayAvailability;
use refugio_core::interval::parse_date;
use serde::{Deserialize, Serialize};

use crate::routes::AppError;
use crate::state::AppState;

/// Days shown when the caller gives no `to`.
const DEFAULT_WINDOW_DAYS: u64 = 90;
/// Longest range a calendar request may span.
const MAX_RANGE_DAYS: u32 = 366;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/units/{id}/availability", get(calendar))
        .route("/units/{id}/availability/check", post(check))
}

#[derive(Deserialize)]
pub struct RangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl RangeQuery {
    /// The requested range, defaulting to a window starting today.
    pub fn interval(&self, state: &AppState) -> Result<DateInterval, AppError> {
        let from = match self.from.as_deref() {
            Some(s) => parse_date(s)?,
            None => Utc::now().with_timezone(&state.config.feed_tz()?).date_naive(),
        };
        let to = match self.to.as_deref() {
            Some(s) => parse_date(s)?,
            None => from
                .checked_add_days(Days::new(DEFAULT_WINDOW_DAYS))
                .ok_or_else(|| AppError::invalid("date out of range"))?,
        };
        let range = DateInterval::new(from, to)?;
        if range.nights() > MAX_RANGE_DAYS {
            return Err(AppError::invalid(format!(
                "range spans more than {} days",
                MAX_RANGE_DAYS
            )));
        }
        Ok(range)
    }
}

/// Public calendar: statuses only, no guest details.
#[derive(Serialize)]
pub struct CalendarResponse {
    pub unit_id: String,
    pub range: DateInterval,
    pub days: Vec<DayAvailability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_error: Option<String>,
}

/// GET /units/:id/availability?from=&to= - Per-day statuses for the calendar widget
async fn calendar(
    State(state): State<AppState>,
    Path(unit_id): Path<String>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<CalendarResponse>, AppError> {
    let range = query.interval(&state)?;
    let calendar = state.availability().unit_calendar(&unit_id, &range).await?;

    Ok(Json(CalendarResponse {
        unit_id: calendar.unit_id,
        range: calendar.range,
        days: calendar.days,
        // The widget only needs to know the feed was down
        feed_error: calendar.feed_error.map(|_| "live feed unavailable".to_string()),
    }))
}

#[derive(Deserialize)]
pub struct CheckRequest {
    pub check_in: String,
    pub check_out: String,
}

/// Public answer: whether the stay fits, and which ranges are in the way.
#[derive(Serialize)]
pub struct CheckResponse {
    pub is_available: bool,
    pub conflicts: Vec<DateInterval>,
}

/// POST /units/:id/availability/check - Apply the booking conflict check
async fn check(
    State(state): State<AppState>,
    Path(unit_id): Path<String>,
    Json(req): Json<CheckRequest>,
) -> Result<Json<CheckResponse>, AppError> {
    let interval = DateInterval::parse(&req.check_in, &req.check_out)?;
    let result = state.availability().check(&unit_id, &interval).await?;

    Ok(Json(CheckResponse {
        is_available: result.is_available,
        conflicts: result.conflicts.iter().filter_map(|r| r.interval()).collect(),
    }))
}
