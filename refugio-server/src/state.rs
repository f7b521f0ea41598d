use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use refugio_core::availability::AvailabilityService;
use refugio_core::booking::{BookingService, JsonlReviewQueue, ReviewQueue};
use refugio_core::payment::{HttpPaymentProvider, PaymentProvider};
use refugio_core::store::{HttpRecordStore, RecordStore};
use refugio_core::sync::Reconciler;
use refugio_core::{FeedFetcher, SiteConfig};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SiteConfig>,
    pub store: Arc<dyn RecordStore>,
    pub payments: Arc<dyn PaymentProvider>,
    pub review: Arc<dyn ReviewQueue>,
    pub fetcher: FeedFetcher,
}

impl AppState {
    /// Wire the HTTP collaborators described by `config`.
    pub fn from_config(config: SiteConfig) -> Result<Self> {
        let store = HttpRecordStore::new(&config.store)?;
        let payments = HttpPaymentProvider::new(&config.payment)?;
        let review = JsonlReviewQueue::new(config.review_log_path());
        let fetcher = FeedFetcher::new(Duration::from_secs(config.sync.feed_timeout_secs))?;

        Ok(AppState {
            config: Arc::new(config),
            store: Arc::new(store),
            payments: Arc::new(payments),
            review: Arc::new(review),
            fetcher,
        })
    }

    pub fn availability(&self) -> AvailabilityService {
        AvailabilityService::new(self.config.clone(), self.store.clone(), self.fetcher.clone())
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.config.clone(), self.store.clone(), self.fetcher.clone())
    }

    pub fn bookings(&self) -> BookingService {
        BookingService::new(
            self.config.clone(),
            self.store.clone(),
            self.payments.clone(),
            self.review.clone(),
        )
    }
}
