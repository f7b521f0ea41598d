//! Outbound feed and the feed parse tool

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, header},
    response::IntoResponse,
    routing::{get, post},
};
use refugio_core::feed::{FeedCounts, FeedEvent, generate_feed, parse_feed_in, summarize};
use refugio_core::store::ReservationFilter;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::routes::{AppError, require_bearer};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/units/{id}/calendar.ics", get(calendar_ics))
        .route("/feeds/parse", post(parse))
}

/// GET /units/:id/calendar.ics - Our bookings for third-party platforms to import
async fn calendar_ics(
    State(state): State<AppState>,
    Path(unit_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let unit = state.config.unit(&unit_id)?;
    let records = state.store.list(&ReservationFilter::active(&unit.id)).await?;

    let ics = generate_feed(&records, &unit.name, &state.config.domain);
    debug!(unit = %unit.id, records = records.len(), "Serving outbound feed");

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CACHE_CONTROL,
                "no-cache, no-store, must-revalidate".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}.ics\"", unit.id),
            ),
        ],
        ics,
    ))
}

/// Request body for the parse tool: a feed URL or raw feed text
#[derive(Deserialize)]
pub struct ParseRequest {
    pub url: Option<String>,
    pub ics: Option<String>,
}

#[derive(Serialize)]
pub struct ParseResponse {
    pub events: Vec<FeedEvent>,
    pub counts: FeedCounts,
}

/// POST /feeds/parse - Normalize a feed without storing anything (admin tool)
async fn parse(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ParseRequest>,
) -> Result<Json<ParseResponse>, AppError> {
    require_bearer(&headers, state.config.sync.token.as_deref())?;
    let tz = state.config.feed_tz()?;

    let events = match (req.url.as_deref(), req.ics.as_deref()) {
        (_, Some(ics)) if !ics.trim().is_empty() => parse_feed_in(ics, tz)?,
        (Some(url), _) if !url.trim().is_empty() => state.fetcher.fetch_events(url.trim(), tz).await?,
        _ => return Err(AppError::invalid("provide either 'url' or 'ics'")),
    };

    let counts = summarize(&events);
    Ok(Json(ParseResponse { events, counts }))
}

#[cfg(test)]
mod tests {
    use crate::testing::{fixture, json_request, record, send, send_raw};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use refugio_core::reservation::ReservationStatus;
    use serde_json::{Value, json};

    fn parse_request(body: Value) -> Request<Body> {
        let mut request = json_request("POST", "/feeds/parse", body);
        request
            .headers_mut()
            .insert("authorization", "Bearer sync-token".parse().unwrap());
        request
    }

    #[tokio::test]
    async fn serves_active_records_as_ics() {
        let mut cancelled = record("r2", "refugio-intimo", "2025-03-20", "2025-03-22");
        cancelled.status = ReservationStatus::Cancelled;
        let fx = fixture(vec![
            record("r1", "refugio-intimo", "2025-03-10", "2025-03-12"),
            cancelled,
            record("r3", "cabana-bosque", "2025-03-10", "2025-03-12"),
        ]);

        let request = Request::get("/units/refugio-intimo/calendar.ics")
            .body(Body::empty())
            .unwrap();
        let (status, headers, body) = send_raw(&fx.app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert!(headers["content-type"].to_str().unwrap().starts_with("text/calendar"));
        assert!(headers["cache-control"].to_str().unwrap().contains("no-cache"));
        assert!(body.contains("UID:r1@refugio.example\r\n"));
        assert!(!body.contains("r2@"));
        assert!(!body.contains("r3@"));
        assert!(!body.contains("Ana Soto"));
    }

    #[tokio::test]
    async fn unknown_unit_is_404() {
        let fx = fixture(vec![]);
        let request = Request::get("/units/nope/calendar.ics").body(Body::empty()).unwrap();
        let (status, _, _) = send_raw(&fx.app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn parses_inline_feed_with_counts() {
        let fx = fixture(vec![]);
        let ics = "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\nUID:a\r\nSUMMARY:Ana Soto - Airbnb\r\nDTSTART;VALUE=DATE:20250310\r\nDTEND;VALUE=DATE:20250312\r\nEND:VEVENT\r\n\
BEGIN:VEVENT\r\nUID:b\r\nSUMMARY:Not available\r\nDTSTART;VALUE=DATE:20250320\r\nDTEND;VALUE=DATE:20250322\r\nEND:VEVENT\r\n\
END:VCALENDAR\r\n";

        let (status, body) = send(&fx.app, parse_request(json!({ "ics": ics }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["counts"], json!({ "total": 2, "reservations": 1, "blocked": 1 }));
        assert_eq!(body["events"][0]["guest_name"], "Ana Soto");
        assert_eq!(body["events"][0]["interval"]["start"], "2025-03-10");
    }

    #[tokio::test]
    async fn parse_needs_input_and_a_calendar() {
        let fx = fixture(vec![]);
        let (status, _) = send(&fx.app, parse_request(json!({}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(
            &fx.app,
            parse_request(json!({ "ics": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn parse_tool_requires_token() {
        let fx = fixture(vec![]);
        let body = json!({ "url": "http://127.0.0.1:9/internal.ics" });

        let (status, _) = send(&fx.app, json_request("POST", "/feeds/parse", body.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let mut wrong = json_request("POST", "/feeds/parse", body);
        wrong
            .headers_mut()
            .insert("authorization", "Bearer guess".parse().unwrap());
        let (status, _) = send(&fx.app, wrong).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
