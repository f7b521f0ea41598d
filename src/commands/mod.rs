pub mod check;
pub mod export;
pub mod parse;
pub mod sync;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use refugio_core::SiteConfig;
use refugio_core::feed::FeedFetcher;
use refugio_core::store::{HttpRecordStore, RecordStore};

/// The configured record store.
pub fn record_store(config: &SiteConfig) -> Result<Arc<dyn RecordStore>> {
    Ok(Arc::new(HttpRecordStore::new(&config.store)?))
}

pub fn feed_fetcher(config: &SiteConfig) -> Result<FeedFetcher> {
    Ok(FeedFetcher::new(Duration::from_secs(config.sync.feed_timeout_secs))?)
}
