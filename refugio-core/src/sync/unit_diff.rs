//! Per-unit diff computation and application.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::feed::FeedEvent;
use crate::reservation::{ReservationRecord, ReservationSource, ReservationStatus};
use crate::store::RecordStore;
use crate::sync::{DiffKind, ReservationDiff, UnitSyncResult};

/// Changes that would make one unit's external records match its feed.
#[derive(Debug, Clone)]
pub struct UnitDiff {
    pub unit_id: String,
    pub diffs: Vec<ReservationDiff>,
}

impl UnitDiff {
    /// Pure comparison of the parsed feed against the unit's stored records.
    /// Records from other units or other sources are ignored.
    pub fn compute(unit_id: &str, events: &[FeedEvent], existing: &[ReservationRecord]) -> Self {
        let mut existing_by_uid: HashMap<&str, &ReservationRecord> = HashMap::new();
        for record in existing
            .iter()
            .filter(|r| r.unit_id == unit_id && r.source == ReservationSource::ExternalFeed)
        {
            let Some(uid) = record.external_id.as_deref() else {
                continue;
            };
            // Keep the active record when a uid was stored twice
            match existing_by_uid.get(uid) {
                Some(kept) if kept.status != ReservationStatus::Cancelled => {}
                _ => {
                    existing_by_uid.insert(uid, record);
                }
            }
        }

        let events_by_uid: HashMap<&str, &FeedEvent> = events
            .iter()
            .map(|e| (e.external_id.as_str(), e))
            .collect();

        let mut diffs = Vec::new();

        for (uid, event) in &events_by_uid {
            let existing = existing_by_uid.get(uid).copied();
            if let Some(diff) = ReservationDiff::get_diff(existing, Some(*event)) {
                diffs.push(diff);
            }
        }

        for (uid, record) in &existing_by_uid {
            if events_by_uid.contains_key(uid) {
                continue;
            }
            if let Some(diff) = ReservationDiff::get_diff(Some(*record), None) {
                diffs.push(diff);
            }
        }

        diffs.sort_by_key(|d| {
            let start = d
                .event
                .as_ref()
                .map(|e| e.interval.start())
                .or(d.existing.as_ref().map(|r| r.check_in));
            (start, d.kind as u8)
        });

        UnitDiff {
            unit_id: unit_id.to_string(),
            diffs,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty()
    }

    /// (created, updated, cancelled)
    pub fn counts(&self) -> (usize, usize, usize) {
        let mut created = 0;
        let mut updated = 0;
        let mut cancelled = 0;

        for diff in &self.diffs {
            match diff.kind {
                DiffKind::Create => created += 1,
                DiffKind::Update => updated += 1,
                DiffKind::Cancel => cancelled += 1,
            }
        }

        (created, updated, cancelled)
    }

    /// Write every change. A failed item is counted and logged; the rest still run.
    pub async fn apply(&self, store: &dyn RecordStore) -> UnitSyncResult {
        let mut result = UnitSyncResult::new(&self.unit_id);

        for diff in &self.diffs {
            let outcome = match diff.kind {
                DiffKind::Create => match diff.input(&self.unit_id) {
                    Some(input) => store.create(input).await.map(|_| ()),
                    None => continue,
                },
                DiffKind::Update | DiffKind::Cancel => match (diff.record_id(), diff.patch()) {
                    (Some(id), Some(patch)) => store.update(id, &patch).await.map(|_| ()),
                    _ => continue,
                },
            };

            match outcome {
                Ok(()) => {
                    debug!(unit = %self.unit_id, "{}", diff);
                    match diff.kind {
                        DiffKind::Create => result.created += 1,
                        DiffKind::Update => result.updated += 1,
                        DiffKind::Cancel => result.cancelled += 1,
                    }
                }
                Err(e) => {
                    warn!(unit = %self.unit_id, change = %diff, error = %e, "Sync change failed");
                    result.errors += 1;
                }
            }
        }

        result
    }
}
