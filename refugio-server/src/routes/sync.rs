//! Feed sync trigger

use axum::{
    Json, Router,
    extract::{Query, State},
    http::HeaderMap,
    routing::post,
};
use refugio_core::sync::SyncSummary;
use serde::Deserialize;

use crate::routes::{AppError, require_bearer};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/sync", post(sync))
}

#[derive(Deserialize)]
pub struct SyncQuery {
    pub unit: Option<String>,
}

/// POST /sync - Reconcile every unit's feed (or just `?unit=`) against the store
async fn sync(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SyncQuery>,
) -> Result<Json<SyncSummary>, AppError> {
    require_bearer(&headers, state.config.sync.token.as_deref())?;

    let reconciler = state.reconciler();
    let summary = match query.unit.as_deref() {
        Some(unit_id) => SyncSummary::from_results(vec![reconciler.sync_unit_id(unit_id).await?]),
        None => reconciler.sync_all().await,
    };

    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use crate::testing::{CONFIG, fixture, fixture_with, send};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use refugio_core::SiteConfig;

    fn trigger(token: Option<&str>) -> Request<Body> {
        let mut builder = Request::post("/sync");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn requires_the_sync_token() {
        let fx = fixture(vec![]);
        let (status, _) = send(&fx.app, trigger(None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&fx.app, trigger(Some("wrong"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unreachable_feed_is_reported_per_unit() {
        let config = CONFIG.replace(
            "capacity = 2\n",
            "capacity = 2\nfeed_url = \"http://127.0.0.1:9/intimo.ics\"\n",
        );
        let fx = fixture_with(SiteConfig::from_toml(&config).unwrap(), vec![]);

        let (status, body) = send(&fx.app, trigger(Some("sync-token"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["units_processed"], 1);
        assert_eq!(body["units_failed"], 1);
        assert!(body["results"][0]["error"].is_string());
    }

    #[tokio::test]
    async fn unit_without_feed_cannot_be_synced() {
        let fx = fixture(vec![]);
        let request = Request::post("/sync?unit=cabana-bosque")
            .header("authorization", "Bearer sync-token")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&fx.app, request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
