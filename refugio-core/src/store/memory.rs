use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{RecordStore, ReservationFilter};
use crate::error::{RefugioError, RefugioResult};
use crate::reservation::{ReservationInput, ReservationPatch, ReservationRecord};

/// Process-local store used by tests and the CLI's dry runs.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<ReservationRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<ReservationRecord>) -> Self {
        MemoryRecordStore {
            records: Mutex::new(records),
        }
    }

    /// Everything, cancelled included, in insertion order.
    pub fn snapshot(&self) -> Vec<ReservationRecord> {
        self.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn lock(&self) -> RefugioResult<std::sync::MutexGuard<'_, Vec<ReservationRecord>>> {
        self.records
            .lock()
            .map_err(|_| RefugioError::Store("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn list(&self, filter: &ReservationFilter) -> RefugioResult<Vec<ReservationRecord>> {
        let records = self.lock()?;
        let mut matching: Vec<ReservationRecord> =
            records.iter().filter(|r| filter.matches(r)).cloned().collect();
        matching.sort_by_key(|r| r.check_in);
        Ok(matching)
    }

    async fn create(&self, input: ReservationInput) -> RefugioResult<ReservationRecord> {
        input.validate()?;

        let now = Utc::now();
        let record = ReservationRecord {
            id: uuid::Uuid::new_v4().to_string(),
            unit_id: input.unit_id,
            check_in: input.check_in,
            check_out: input.check_out,
            guest: input.guest,
            party: input.party,
            status: input.status,
            source: input.source,
            external_id: input.external_id,
            reservation_code: input.reservation_code,
            payment: input.payment,
            special_requests: input.special_requests,
            created_at: now,
            updated_at: now,
        };

        self.lock()?.push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, patch: &ReservationPatch) -> RefugioResult<ReservationRecord> {
        let mut records = self.lock()?;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| RefugioError::Store(format!("No reservation with id {}", id)))?;

        let mut updated = record.clone();
        patch.apply_to(&mut updated);
        if updated.check_in >= updated.check_out {
            return Err(RefugioError::InvalidInterval(format!(
                "{} must be before {}",
                updated.check_in, updated.check_out
            )));
        }
        updated.updated_at = Utc::now();

        *record = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> RefugioResult<()> {
        let mut records = self.lock()?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(RefugioError::Store(format!("No reservation with id {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reservation::{
        GuestContact, PartyComposition, PaymentLink, ReservationSource, ReservationStatus,
    };
    use chrono::NaiveDate;

    fn input(unit: &str, day: u32) -> ReservationInput {
        ReservationInput {
            unit_id: unit.into(),
            check_in: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2025, 3, day + 2).unwrap(),
            guest: GuestContact {
                name: "Ana".into(),
                ..Default::default()
            },
            party: PartyComposition::default(),
            status: ReservationStatus::Confirmed,
            source: ReservationSource::Direct,
            external_id: None,
            reservation_code: None,
            payment: None,
            special_requests: None,
        }
    }

    #[tokio::test]
    async fn list_filters_and_sorts_by_check_in() {
        let store = MemoryRecordStore::new();
        store.create(input("a", 20)).await.unwrap();
        store.create(input("a", 10)).await.unwrap();
        store.create(input("b", 5)).await.unwrap();

        let listed = store.list(&ReservationFilter::unit("a")).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].check_in < listed[1].check_in);
    }

    #[tokio::test]
    async fn cancel_hides_from_active_filter() {
        let store = MemoryRecordStore::new();
        let record = store.create(input("a", 10)).await.unwrap();
        store.update(&record.id, &ReservationPatch::cancel()).await.unwrap();

        assert!(store.list(&ReservationFilter::active("a")).await.unwrap().is_empty());
        assert_eq!(store.list(&ReservationFilter::unit("a")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn payment_filter_matches_link() {
        let store = MemoryRecordStore::new();
        let mut paid = input("a", 10);
        paid.payment = Some(PaymentLink {
            payment_id: "pay-1".into(),
            amount: 10.0,
            paid_at: None,
        });
        store.create(paid).await.unwrap();
        store.create(input("a", 20)).await.unwrap();

        let found = store.list(&ReservationFilter::by_payment("pay-1")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(store.list(&ReservationFilter::by_payment("pay-2")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_rejects_reversed_dates_and_unknown_ids() {
        let store = MemoryRecordStore::new();
        let record = store.create(input("a", 10)).await.unwrap();

        let patch = ReservationPatch {
            check_out: Some(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()),
            ..Default::default()
        };
        assert!(store.update(&record.id, &patch).await.is_err());
        assert!(store.update("missing", &ReservationPatch::cancel()).await.is_err());
        assert!(store.delete("missing").await.is_err());
        store.delete(&record.id).await.unwrap();
        assert!(store.snapshot().is_empty());
    }
}
