//! Availability: merging events from every source and resolving day status.
//!
//! [`check_date_availability`] is the only conflict predicate. Booking intents,
//! webhook confirmations and admin bookings all call it.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{RentalUnit, SiteConfig};
use crate::error::RefugioResult;
use crate::feed::{FeedEvent, FeedEventKind, FeedFetcher};
use crate::interval::DateInterval;
use crate::reservation::{ReservationRecord, ReservationStatus};
use crate::store::{RecordStore, ReservationFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Reservation,
    Blocked,
    Maintenance,
}

/// A date range occupied for a unit, derived per read and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub unit_id: String,
    pub interval: DateInterval,
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Ordered by precedence: a day takes the highest status of any event covering it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    Available,
    Reserved,
    Blocked,
    Maintenance,
}

impl DayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayStatus::Available => "available",
            DayStatus::Reserved => "reserved",
            DayStatus::Blocked => "blocked",
            DayStatus::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for DayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<EventKind> for DayStatus {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Reservation => DayStatus::Reserved,
            EventKind::Blocked => DayStatus::Blocked,
            EventKind::Maintenance => DayStatus::Maintenance,
        }
    }
}

/// Result of the conflict predicate. A conflict is an answer, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityCheck {
    pub is_available: bool,
    pub conflicts: Vec<ReservationRecord>,
}

impl AvailabilityCheck {
    pub fn conflict_ids(&self) -> Vec<String> {
        self.conflicts.iter().map(|r| r.id.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub status: DayStatus,
}

/// Status of `date` for `unit_id`: maintenance > blocked > reservation > available.
pub fn availability_for_date(date: NaiveDate, unit_id: &str, events: &[CalendarEvent]) -> DayStatus {
    events
        .iter()
        .filter(|e| e.unit_id == unit_id && e.interval.contains_date(date))
        .map(|e| DayStatus::from(e.kind))
        .max()
        .unwrap_or(DayStatus::Available)
}

/// Every non-cancelled record of `unit_id` whose stay overlaps `interval`.
pub fn check_date_availability(
    unit_id: &str,
    interval: &DateInterval,
    records: &[ReservationRecord],
) -> AvailabilityCheck {
    let conflicts: Vec<ReservationRecord> = records
        .iter()
        .filter(|r| r.unit_id == unit_id && r.is_active())
        .filter(|r| r.interval().is_some_and(|existing| existing.overlaps(interval)))
        .cloned()
        .collect();

    AvailabilityCheck {
        is_available: conflicts.is_empty(),
        conflicts,
    }
}

/// Calendar events for stored records. Cancelled records produce nothing.
pub fn events_from_records(records: &[ReservationRecord]) -> Vec<CalendarEvent> {
    records
        .iter()
        .filter(|r| r.is_active())
        .filter_map(|r| {
            let interval = r.interval()?;
            let kind = if r.status == ReservationStatus::Blocked {
                EventKind::Blocked
            } else {
                EventKind::Reservation
            };
            Some(CalendarEvent {
                id: r.id.clone(),
                unit_id: r.unit_id.clone(),
                interval,
                kind,
                detail: Some(format!("{} ({})", r.guest.name, r.source)),
            })
        })
        .collect()
}

pub fn events_from_feed(unit_id: &str, events: &[FeedEvent]) -> Vec<CalendarEvent> {
    events
        .iter()
        .map(|e| CalendarEvent {
            id: e.external_id.clone(),
            unit_id: unit_id.to_string(),
            interval: e.interval,
            kind: match e.kind {
                FeedEventKind::Reservation => EventKind::Reservation,
                FeedEventKind::Blocked => EventKind::Blocked,
            },
            detail: Some(e.summary.clone()),
        })
        .collect()
}

pub fn maintenance_events(unit: &RentalUnit) -> Vec<CalendarEvent> {
    unit.maintenance
        .iter()
        .enumerate()
        .map(|(i, interval)| CalendarEvent {
            id: format!("maintenance-{}-{}", unit.id, i),
            unit_id: unit.id.clone(),
            interval: *interval,
            kind: EventKind::Maintenance,
            detail: None,
        })
        .collect()
}

/// Plain union. Precedence is applied per day, never here.
pub fn merge_events<I>(sources: I) -> Vec<CalendarEvent>
where
    I: IntoIterator<Item = Vec<CalendarEvent>>,
{
    sources.into_iter().flatten().collect()
}

/// One entry per day of `range`.
pub fn day_statuses(unit_id: &str, range: &DateInterval, events: &[CalendarEvent]) -> Vec<DayAvailability> {
    let relevant: Vec<CalendarEvent> = events
        .iter()
        .filter(|e| e.unit_id == unit_id && e.interval.overlaps(range))
        .cloned()
        .collect();

    range
        .days()
        .map(|date| DayAvailability {
            date,
            status: availability_for_date(date, unit_id, &relevant),
        })
        .collect()
}

/// A unit's calendar for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitCalendar {
    pub unit_id: String,
    pub range: DateInterval,
    pub days: Vec<DayAvailability>,
    pub events: Vec<CalendarEvent>,
    /// Set when the live feed could not be read; days reflect stored records only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_error: Option<String>,
}

/// Reads that need the record store (and optionally the live feed).
#[derive(Clone)]
pub struct AvailabilityService {
    config: Arc<SiteConfig>,
    store: Arc<dyn RecordStore>,
    fetcher: FeedFetcher,
}

impl AvailabilityService {
    pub fn new(config: Arc<SiteConfig>, store: Arc<dyn RecordStore>, fetcher: FeedFetcher) -> Self {
        AvailabilityService {
            config,
            store,
            fetcher,
        }
    }

    pub async fn unit_calendar(&self, unit_id: &str, range: &DateInterval) -> RefugioResult<UnitCalendar> {
        let unit = self.config.unit(unit_id)?;
        let records = self.store.list(&ReservationFilter::active(unit_id)).await?;

        let mut feed_error = None;
        let feed_events = match unit.feed_url.as_deref().filter(|_| unit.has_feed()) {
            Some(url) => match self.fetcher.fetch_events(url, self.config.feed_tz()?).await {
                Ok(events) => events_from_feed(unit_id, &events),
                Err(e) => {
                    warn!(unit = %unit_id, error = %e, "Feed unavailable, showing stored records only");
                    feed_error = Some(e.to_string());
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let events: Vec<CalendarEvent> = merge_events([
            maintenance_events(unit),
            events_from_records(&records),
            feed_events,
        ])
        .into_iter()
        .filter(|e| e.interval.overlaps(range))
        .collect();

        Ok(UnitCalendar {
            unit_id: unit_id.to_string(),
            range: *range,
            days: day_statuses(unit_id, range, &events),
            events,
            feed_error,
        })
    }

    /// The shared predicate over the unit's current non-cancelled records.
    pub async fn check(&self, unit_id: &str, interval: &DateInterval) -> RefugioResult<AvailabilityCheck> {
        self.config.unit(unit_id)?;
        let records = self.store.list(&ReservationFilter::active(unit_id)).await?;
        Ok(check_date_availability(unit_id, interval, &records))
    }
}
