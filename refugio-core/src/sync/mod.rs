//! Reconciliation of stored external records against each unit's feed.
//!
//! The feed is the source of truth for external bookings. Every run fetches,
//! diffs and writes from scratch, so an interrupted run is finished by the next.

mod diff_kind;
mod reservation_diff;
mod summary;
mod unit_diff;

pub use diff_kind::DiffKind;
pub use reservation_diff::ReservationDiff;
pub use summary::{SyncSummary, UnitSyncResult};
pub use unit_diff::UnitDiff;

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{RentalUnit, SiteConfig};
use crate::error::{RefugioError, RefugioResult};
use crate::feed::FeedFetcher;
use crate::reservation::ReservationSource;
use crate::store::{RecordStore, ReservationFilter};

#[derive(Clone)]
pub struct Reconciler {
    config: Arc<SiteConfig>,
    store: Arc<dyn RecordStore>,
    fetcher: FeedFetcher,
}

impl Reconciler {
    pub fn new(config: Arc<SiteConfig>, store: Arc<dyn RecordStore>, fetcher: FeedFetcher) -> Self {
        Reconciler {
            config,
            store,
            fetcher,
        }
    }

    /// Reconcile every unit that has a feed. One unit failing never stops the others.
    pub async fn sync_all(&self) -> SyncSummary {
        let mut results = Vec::new();

        for unit in self.config.feed_units() {
            results.push(self.sync_unit(unit).await);
        }

        let summary = SyncSummary::from_results(results);
        info!(
            units = summary.units_processed,
            failed = summary.units_failed,
            created = summary.total_created,
            updated = summary.total_updated,
            cancelled = summary.total_cancelled,
            errors = summary.total_errors,
            "Sync finished"
        );
        summary
    }

    /// Reconcile a single unit by id.
    pub async fn sync_unit_id(&self, unit_id: &str) -> RefugioResult<UnitSyncResult> {
        let unit = self.config.unit(unit_id)?;
        if !unit.has_feed() {
            return Err(RefugioError::Validation(format!("Unit '{}' has no feed_url", unit_id)));
        }
        Ok(self.sync_unit(unit).await)
    }

    pub async fn sync_unit(&self, unit: &RentalUnit) -> UnitSyncResult {
        let diff = match self.plan_unit(unit).await {
            Ok(diff) => diff,
            Err(e) => {
                warn!(unit = %unit.id, error = %e, "Skipping unit");
                return UnitSyncResult::failed(&unit.id, e);
            }
        };

        if diff.is_empty() {
            return UnitSyncResult::new(&unit.id);
        }

        let result = diff.apply(self.store.as_ref()).await;
        info!(
            unit = %unit.id,
            created = result.created,
            updated = result.updated,
            cancelled = result.cancelled,
            errors = result.errors,
            "Unit synced"
        );
        result
    }

    /// Fetch, parse and diff without writing anything.
    pub async fn plan_unit(&self, unit: &RentalUnit) -> RefugioResult<UnitDiff> {
        let url = unit
            .feed_url
            .as_deref()
            .filter(|_| unit.has_feed())
            .ok_or_else(|| RefugioError::Config(format!("Unit '{}' has no feed_url", unit.id)))?;

        let events = self.fetcher.fetch_events(url, self.config.feed_tz()?).await?;

        // Cancelled records are loaded too so a returning event reinstates rather than duplicates
        let existing = self
            .store
            .list(&ReservationFilter::unit(&unit.id).from_source(ReservationSource::ExternalFeed))
            .await?;

        Ok(UnitDiff::compute(&unit.id, &events, &existing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reservation::{
        ReservationInput, ReservationPatch, ReservationRecord, ReservationStatus,
    };
    use crate::store::MemoryRecordStore;
    use crate::test_support::{config, external, record};
    use async_trait::async_trait;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const UNIT: &str = "refugio-intimo";

    fn feed(events: &[(&str, &str, &str, &str)]) -> String {
        let mut ics = String::from("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n");
        for (uid, start, end, summary) in events {
            ics.push_str(&format!(
                "BEGIN:VEVENT\r\nUID:{}\r\nSUMMARY:{}\r\nDTSTART;VALUE=DATE:{}\r\nDTEND;VALUE=DATE:{}\r\nEND:VEVENT\r\n",
                uid, summary, start, end
            ));
        }
        ics.push_str("END:VCALENDAR\r\n");
        ics
    }

    async fn serve(server: &MockServer, route: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    fn reconciler(server: &MockServer, store: Arc<dyn RecordStore>) -> Reconciler {
        let mut config = config();
        config.units[0].feed_url = Some(format!("{}/intimo.ics", server.uri()));
        Reconciler::new(
            Arc::new(config),
            store,
            FeedFetcher::new(Duration::from_secs(2)).unwrap(),
        )
    }

    #[tokio::test]
    async fn second_run_with_same_feed_changes_nothing() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/intimo.ics",
            feed(&[
                ("evt1", "20250310", "20250312", "Ana Soto - Airbnb"),
                ("evt2", "20250320", "20250322", "Reserved"),
            ]),
        )
        .await;

        let store = Arc::new(MemoryRecordStore::new());
        let sync = reconciler(&server, store.clone());

        let first = sync.sync_all().await;
        assert_eq!(first.total_created, 2);
        assert_eq!(first.units_processed, 1);

        let second = sync.sync_all().await;
        assert_eq!(second.total_created, 0);
        assert_eq!(second.total_updated, 0);
        assert_eq!(second.total_cancelled, 0);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn missing_event_cancels_only_that_record() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/intimo.ics",
            feed(&[("evt2", "20250320", "20250322", "Luis")]),
        )
        .await;

        let store = Arc::new(MemoryRecordStore::with_records(vec![
            external("r1", UNIT, "evt1", "2025-03-10", "2025-03-12", "Ana"),
            external("r2", UNIT, "evt2", "2025-03-20", "2025-03-22", "Luis"),
            record("r3", UNIT, "2025-04-01", "2025-04-03", ReservationStatus::Confirmed),
        ]));
        let summary = reconciler(&server, store.clone()).sync_all().await;

        assert_eq!(summary.total_cancelled, 1);
        let status = |id: &str| {
            store
                .snapshot()
                .into_iter()
                .find(|r| r.id == id)
                .map(|r| r.status)
        };
        assert_eq!(status("r1"), Some(ReservationStatus::Cancelled));
        assert_eq!(status("r2"), Some(ReservationStatus::Confirmed));
        assert_eq!(status("r3"), Some(ReservationStatus::Confirmed));
    }

    #[tokio::test]
    async fn moved_dates_update_in_place() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/intimo.ics",
            feed(&[("evt1", "20250310", "20250315", "Ana")]),
        )
        .await;

        let store = Arc::new(MemoryRecordStore::with_records(vec![external(
            "r1", UNIT, "evt1", "2025-03-10", "2025-03-12", "Ana",
        )]));
        let summary = reconciler(&server, store.clone()).sync_all().await;

        assert_eq!(summary.total_updated, 1);
        let records = store.snapshot();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].check_out.to_string(), "2025-03-15");
    }

    #[tokio::test]
    async fn feed_outage_is_a_unit_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryRecordStore::with_records(vec![external(
            "r1", UNIT, "evt1", "2025-03-10", "2025-03-12", "Ana",
        )]));
        let summary = reconciler(&server, store.clone()).sync_all().await;

        assert_eq!(summary.units_failed, 1);
        assert!(summary.results[0].error.is_some());
        // An unreachable feed must not look like an empty one
        assert_eq!(store.snapshot()[0].status, ReservationStatus::Confirmed);
    }

    /// Refuses to create records for one external id.
    struct PickyStore {
        inner: MemoryRecordStore,
        refuse: &'static str,
    }

    #[async_trait]
    impl RecordStore for PickyStore {
        async fn list(&self, filter: &ReservationFilter) -> RefugioResult<Vec<ReservationRecord>> {
            self.inner.list(filter).await
        }

        async fn create(&self, input: ReservationInput) -> RefugioResult<ReservationRecord> {
            if input.external_id.as_deref() == Some(self.refuse) {
                return Err(RefugioError::Store("HTTP 500".into()));
            }
            self.inner.create(input).await
        }

        async fn update(&self, id: &str, patch: &ReservationPatch) -> RefugioResult<ReservationRecord> {
            self.inner.update(id, patch).await
        }

        async fn delete(&self, id: &str) -> RefugioResult<()> {
            self.inner.delete(id).await
        }
    }

    #[tokio::test]
    async fn one_failed_write_does_not_stop_the_rest() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/intimo.ics",
            feed(&[
                ("evt1", "20250310", "20250312", "Ana"),
                ("evt2", "20250320", "20250322", "Luis"),
                ("evt3", "20250401", "20250403", "Eva"),
            ]),
        )
        .await;

        let store = Arc::new(PickyStore {
            inner: MemoryRecordStore::new(),
            refuse: "evt2",
        });
        let summary = reconciler(&server, store.clone()).sync_all().await;

        assert_eq!(summary.total_created, 2);
        assert_eq!(summary.total_errors, 1);
        assert!(summary.results[0].error.is_none());
        assert_eq!(store.inner.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn unit_without_feed_is_rejected() {
        let server = MockServer::start().await;
        let sync = reconciler(&server, Arc::new(MemoryRecordStore::new()));
        assert!(sync.sync_unit_id("cabana-bosque").await.is_err());
        assert!(sync.sync_unit_id("nope").await.is_err());
    }
}
