//! The record store: the one shared, mutable resource.
//!
//! Every read goes back to the store; nothing is cached between requests.

mod http;
mod memory;

pub use http::HttpRecordStore;
pub use memory::MemoryRecordStore;

use async_trait::async_trait;

use crate::error::RefugioResult;
use crate::reservation::{
    ReservationInput, ReservationPatch, ReservationRecord, ReservationSource, ReservationStatus,
};

/// Equality filters, all optional and combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReservationFilter {
    pub unit_id: Option<String>,
    pub status_not: Option<ReservationStatus>,
    pub source: Option<ReservationSource>,
    pub payment_id: Option<String>,
}

impl ReservationFilter {
    pub fn unit(unit_id: &str) -> Self {
        ReservationFilter {
            unit_id: Some(unit_id.to_string()),
            ..Default::default()
        }
    }

    /// Records that still occupy dates for `unit_id`.
    pub fn active(unit_id: &str) -> Self {
        Self::unit(unit_id).excluding(ReservationStatus::Cancelled)
    }

    pub fn by_payment(payment_id: &str) -> Self {
        ReservationFilter {
            payment_id: Some(payment_id.to_string()),
            ..Default::default()
        }
    }

    pub fn excluding(mut self, status: ReservationStatus) -> Self {
        self.status_not = Some(status);
        self
    }

    pub fn from_source(mut self, source: ReservationSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn matches(&self, record: &ReservationRecord) -> bool {
        self.unit_id.as_deref().is_none_or(|u| record.unit_id == u)
            && self.status_not.is_none_or(|s| record.status != s)
            && self.source.is_none_or(|s| record.source == s)
            && self.payment_id.as_deref().is_none_or(|p| {
                record
                    .payment
                    .as_ref()
                    .is_some_and(|link| link.payment_id == p)
            })
    }
}

/// Filtered record API over whatever holds the reservations.
///
/// Each write touches a single row; there are no cross-row transactions.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Matching records sorted by check-in ascending.
    async fn list(&self, filter: &ReservationFilter) -> RefugioResult<Vec<ReservationRecord>>;

    async fn create(&self, input: ReservationInput) -> RefugioResult<ReservationRecord>;

    async fn update(&self, id: &str, patch: &ReservationPatch) -> RefugioResult<ReservationRecord>;

    /// Hard delete. Reconciliation and booking never call this; they cancel instead.
    async fn delete(&self, id: &str) -> RefugioResult<()>;
}
