use std::fmt;

use serde::{Deserialize, Serialize};

use crate::feed::FeedEvent;
use crate::reservation::{
    GuestContact, PartyComposition, ReservationInput, ReservationPatch, ReservationRecord,
    ReservationSource, ReservationStatus,
};
use crate::sync::DiffKind;

/// One change needed to bring a stored external record in line with the feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationDiff {
    pub kind: DiffKind,
    pub existing: Option<ReservationRecord>,
    pub event: Option<FeedEvent>,
}

impl fmt::Display for ReservationDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.event, &self.existing) {
            (Some(event), _) => write!(
                f,
                "{} {} {} ({})",
                self.kind, event.interval, event.guest_name, event.external_id
            ),
            (None, Some(record)) => write!(
                f,
                "{} {} → {} {} ({})",
                self.kind,
                record.check_in,
                record.check_out,
                record.guest.name,
                record.external_id.as_deref().unwrap_or(&record.id)
            ),
            (None, None) => write!(f, "{}", self.kind),
        }
    }
}

impl ReservationDiff {
    /// Compare a stored record with the feed's version of it.
    ///
    /// Only check-in, check-out and guest name count as changes. A cancelled
    /// record whose event is back in the feed is reinstated.
    pub fn get_diff(
        existing: Option<&ReservationRecord>,
        event: Option<&FeedEvent>,
    ) -> Option<ReservationDiff> {
        let kind = match (existing, event) {
            (None, Some(_)) => DiffKind::Create,
            (Some(record), None) => {
                if record.status == ReservationStatus::Cancelled {
                    return None;
                }
                DiffKind::Cancel
            }
            (Some(record), Some(event)) => {
                let reinstated = record.status == ReservationStatus::Cancelled;
                if !reinstated && !differs(record, event) {
                    return None;
                }
                DiffKind::Update
            }
            (None, None) => return None,
        };

        Some(ReservationDiff {
            kind,
            existing: existing.cloned(),
            event: event.cloned(),
        })
    }

    /// Create payload for a `Create` diff.
    pub fn input(&self, unit_id: &str) -> Option<ReservationInput> {
        let event = self.event.as_ref()?;
        Some(ReservationInput {
            unit_id: unit_id.to_string(),
            check_in: event.interval.start(),
            check_out: event.interval.end(),
            guest: GuestContact {
                name: event.guest_name.clone(),
                ..Default::default()
            },
            party: PartyComposition {
                adults: event.guest_count.max(1),
                ..Default::default()
            },
            status: ReservationStatus::Confirmed,
            source: ReservationSource::ExternalFeed,
            external_id: Some(event.external_id.clone()),
            reservation_code: Some(event.reservation_code.clone()).filter(|c| !c.is_empty()),
            payment: None,
            special_requests: None,
        })
    }

    /// Patch for an `Update` or `Cancel` diff.
    pub fn patch(&self) -> Option<ReservationPatch> {
        match self.kind {
            DiffKind::Create => None,
            DiffKind::Cancel => Some(ReservationPatch::cancel()),
            DiffKind::Update => {
                let record = self.existing.as_ref()?;
                let event = self.event.as_ref()?;
                let mut patch = ReservationPatch::default();

                if record.check_in != event.interval.start() {
                    patch.check_in = Some(event.interval.start());
                }
                if record.check_out != event.interval.end() {
                    patch.check_out = Some(event.interval.end());
                }
                if record.guest.name != event.guest_name {
                    patch.guest_name = Some(event.guest_name.clone());
                }
                if record.status == ReservationStatus::Cancelled {
                    patch.status = Some(ReservationStatus::Confirmed);
                }

                Some(patch)
            }
        }
    }

    /// Id of the stored record this diff touches, if any.
    pub fn record_id(&self) -> Option<&str> {
        self.existing.as_ref().map(|r| r.id.as_str())
    }
}

fn differs(record: &ReservationRecord, event: &FeedEvent) -> bool {
    record.check_in != event.interval.start()
        || record.check_out != event.interval.end()
        || record.guest.name != event.guest_name
}
