//! Core types and engines for refugio.
//!
//! This crate holds everything the server and the CLI share:
//! - `interval` and `reservation` for the booking data model
//! - `feed` for reading, writing and fetching iCalendar feeds
//! - `availability`, `sync` and `booking` for the three engines built on them

pub mod availability;
pub mod booking;
pub mod config;
pub mod error;
pub mod feed;
pub mod interval;
pub mod payment;
pub mod pricing;
pub mod reservation;
pub mod store;
pub mod sync;

#[cfg(test)]
mod test_support;

pub use availability::{AvailabilityCheck, AvailabilityService, DayStatus, check_date_availability};
pub use booking::{
    BookingRequest, BookingService, BookingState, ConfirmationOutcome, IntentOutcome, ManualEntry,
};
pub use config::{RentalUnit, SiteConfig};
pub use error::{RefugioError, RefugioResult};
pub use feed::{FeedEvent, FeedFetcher, generate_feed, parse_feed};
pub use interval::DateInterval;
pub use reservation::{ReservationRecord, ReservationSource, ReservationStatus};
pub use sync::{Reconciler, SyncSummary};
