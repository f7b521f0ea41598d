//! Host-entered bookings and blocks.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::BookingService;
use crate::availability::{AvailabilityCheck, check_date_availability};
use crate::error::{RefugioError, RefugioResult};
use crate::interval::DateInterval;
use crate::reservation::{
    GuestContact, PartyComposition, ReservationInput, ReservationPatch, ReservationRecord,
    ReservationSource, ReservationStatus, new_reservation_code,
};
use crate::store::ReservationFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualKind {
    /// A stay arranged outside the site (phone, walk-in).
    Booking,
    /// Dates the host closes without a guest.
    Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualEntry {
    pub unit_id: String,
    pub check_in: String,
    pub check_out: String,
    pub kind: ManualKind,
    #[serde(default)]
    pub guest_name: Option<String>,
    #[serde(default)]
    pub guest_email: Option<String>,
    #[serde(default)]
    pub guest_phone: Option<String>,
    #[serde(default)]
    pub adults: Option<u32>,
    #[serde(default)]
    pub children: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ManualOutcome {
    Created { reservation: ReservationRecord },
    Unavailable { check: AvailabilityCheck },
}

impl ManualEntry {
    fn input(&self, interval: &DateInterval) -> RefugioResult<ReservationInput> {
        let (guest, status) = match self.kind {
            ManualKind::Booking => {
                let name = self
                    .guest_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| RefugioError::Validation("guest name is required".into()))?;
                let guest = GuestContact {
                    name: name.to_string(),
                    email: self.guest_email.clone(),
                    phone: self.guest_phone.clone(),
                };
                (guest, ReservationStatus::Confirmed)
            }
            ManualKind::Block => {
                let guest = GuestContact {
                    name: self.guest_name.clone().unwrap_or_else(|| "Blocked".into()),
                    ..Default::default()
                };
                (guest, ReservationStatus::Blocked)
            }
        };

        Ok(ReservationInput {
            unit_id: self.unit_id.clone(),
            check_in: interval.start(),
            check_out: interval.end(),
            guest,
            party: PartyComposition {
                adults: self.adults.unwrap_or(1).max(1),
                children: self.children,
                pets: 0,
            },
            status,
            source: ReservationSource::Manual,
            external_id: None,
            reservation_code: Some(new_reservation_code()),
            payment: None,
            special_requests: self.notes.clone(),
        })
    }
}

impl BookingService {
    /// Record a host booking or block. The same conflict predicate applies as
    /// for guests; past dates are allowed.
    pub async fn create_manual(&self, entry: &ManualEntry) -> RefugioResult<ManualOutcome> {
        let unit = self.config.unit(&entry.unit_id)?;
        let interval = DateInterval::parse(&entry.check_in, &entry.check_out)
            .map_err(|_| RefugioError::Validation("check-out must be after check-in".into()))?;
        let input = entry.input(&interval)?;

        if entry.kind == ManualKind::Booking && input.party.guests() > unit.capacity {
            return Err(RefugioError::Validation(format!(
                "{} sleeps at most {} guests",
                unit.name, unit.capacity
            )));
        }

        let records = self.store.list(&ReservationFilter::active(&unit.id)).await?;
        let check = check_date_availability(&unit.id, &interval, &records);
        if !check.is_available {
            return Ok(ManualOutcome::Unavailable { check });
        }

        let reservation = self.store.create(input).await?;
        info!(
            reservation = %reservation.id,
            unit = %reservation.unit_id,
            range = %interval,
            status = %reservation.status,
            "Manual entry created"
        );
        Ok(ManualOutcome::Created { reservation })
    }

    /// Cancellation is a status change; records are never deleted here.
    pub async fn cancel_reservation(&self, id: &str) -> RefugioResult<ReservationRecord> {
        let record = self.store.update(id, &ReservationPatch::cancel()).await?;
        info!(reservation = %record.id, unit = %record.unit_id, "Reservation cancelled");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::MemoryReviewQueue;
    use crate::payment::{CheckoutSession, PaymentDetails, PaymentIntentContext, PaymentProvider};
    use crate::store::MemoryRecordStore;
    use crate::test_support::{config, record};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NoPayments;

    #[async_trait]
    impl PaymentProvider for NoPayments {
        async fn create_checkout(&self, _: &PaymentIntentContext) -> RefugioResult<CheckoutSession> {
            Err(RefugioError::Payment("unused".into()))
        }

        async fn get_payment(&self, _: &str) -> RefugioResult<PaymentDetails> {
            Err(RefugioError::Payment("unused".into()))
        }
    }

    fn service(store: Arc<MemoryRecordStore>) -> BookingService {
        BookingService::new(
            Arc::new(config()),
            store,
            Arc::new(NoPayments),
            Arc::new(MemoryReviewQueue::new()),
        )
    }

    fn entry(kind: ManualKind, check_in: &str, check_out: &str) -> ManualEntry {
        ManualEntry {
            unit_id: "cabana-bosque".into(),
            check_in: check_in.into(),
            check_out: check_out.into(),
            kind,
            guest_name: Some("Pedro Rojas".into()),
            guest_email: None,
            guest_phone: Some("+56 9 1234 5678".into()),
            adults: Some(4),
            children: 1,
            notes: None,
        }
    }

    #[tokio::test]
    async fn manual_booking_is_confirmed_and_manual() {
        let store = Arc::new(MemoryRecordStore::new());
        let outcome = service(store.clone())
            .create_manual(&entry(ManualKind::Booking, "2025-05-01", "2025-05-04"))
            .await
            .unwrap();

        let ManualOutcome::Created { reservation } = outcome else {
            panic!("expected a created reservation");
        };
        assert_eq!(reservation.status, ReservationStatus::Confirmed);
        assert_eq!(reservation.source, ReservationSource::Manual);
        assert_eq!(reservation.party.guests(), 5);
        assert!(reservation.reservation_code.is_some());
    }

    #[tokio::test]
    async fn block_does_not_need_a_guest() {
        let store = Arc::new(MemoryRecordStore::new());
        let mut block = entry(ManualKind::Block, "2025-05-01", "2025-05-02");
        block.guest_name = None;

        let outcome = service(store.clone()).create_manual(&block).await.unwrap();
        assert!(matches!(outcome, ManualOutcome::Created { .. }));
        assert_eq!(store.snapshot()[0].status, ReservationStatus::Blocked);
    }

    #[tokio::test]
    async fn manual_entries_respect_existing_stays() {
        let store = Arc::new(MemoryRecordStore::with_records(vec![record(
            "r1",
            "cabana-bosque",
            "2025-05-02",
            "2025-05-05",
            ReservationStatus::Confirmed,
        )]));
        let outcome = service(store.clone())
            .create_manual(&entry(ManualKind::Block, "2025-05-01", "2025-05-03"))
            .await
            .unwrap();

        assert!(matches!(outcome, ManualOutcome::Unavailable { .. }));
        assert_eq!(store.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn booking_without_name_or_over_capacity_is_invalid() {
        let store = Arc::new(MemoryRecordStore::new());
        let service = service(store);

        let mut nameless = entry(ManualKind::Booking, "2025-05-01", "2025-05-04");
        nameless.guest_name = Some("  ".into());
        assert!(matches!(
            service.create_manual(&nameless).await,
            Err(RefugioError::Validation(_))
        ));

        let mut crowded = entry(ManualKind::Booking, "2025-05-01", "2025-05-04");
        crowded.adults = Some(7);
        assert!(matches!(
            service.create_manual(&crowded).await,
            Err(RefugioError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn cancel_frees_the_dates() {
        let store = Arc::new(MemoryRecordStore::with_records(vec![record(
            "r1",
            "cabana-bosque",
            "2025-05-02",
            "2025-05-05",
            ReservationStatus::Confirmed,
        )]));
        let service = service(store.clone());

        let cancelled = service.cancel_reservation("r1").await.unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);

        let outcome = service
            .create_manual(&entry(ManualKind::Booking, "2025-05-02", "2025-05-05"))
            .await
            .unwrap();
        assert!(matches!(outcome, ManualOutcome::Created { .. }));
        assert!(service.cancel_reservation("missing").await.is_err());
    }
}
