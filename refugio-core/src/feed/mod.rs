//! iCalendar feeds: reading the third-party export, publishing our own.
//!
//! Parsing is tolerant: every field is optional text and guest details are
//! pattern-matched out of the summary/description. A broken VEVENT is dropped,
//! never the whole feed.

mod fetch;
mod generate;
mod parse;

pub use fetch::FeedFetcher;
pub use generate::generate_feed;
pub use parse::{REDACTED_GUEST_NAME, parse_feed, parse_feed_in};

use serde::{Deserialize, Serialize};

use crate::interval::DateInterval;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedEventKind {
    /// A guest stay, possibly with the guest's identity redacted.
    Reservation,
    /// Host-side "Not available" / closed dates.
    Blocked,
}

/// One booked range from a third-party feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEvent {
    /// The feed's UID, stable across exports.
    pub external_id: String,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub interval: DateInterval,
    pub guest_name: String,
    pub guest_count: u32,
    /// Empty when the description carries no code.
    pub reservation_code: String,
    pub kind: FeedEventKind,
}

/// Totals by kind, reported by the parse endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCounts {
    pub total: usize,
    pub reservations: usize,
    pub blocked: usize,
}

pub fn summarize(events: &[FeedEvent]) -> FeedCounts {
    events.iter().fold(FeedCounts::default(), |mut counts, event| {
        counts.total += 1;
        match event.kind {
            FeedEventKind::Reservation => counts.reservations += 1,
            FeedEventKind::Blocked => counts.blocked += 1,
        }
        counts
    })
}
