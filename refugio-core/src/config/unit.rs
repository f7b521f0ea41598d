//! Rental unit definitions.

use serde::{Deserialize, Serialize};

use crate::interval::DateInterval;

/// A bookable cabin. Defined in configuration, read-only at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalUnit {
    pub id: String,
    pub name: String,
    /// Maximum people (adults + children).
    pub capacity: u32,
    /// Third-party iCalendar export to reconcile against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_url: Option<String>,
    /// Price per night, whole currency units.
    #[serde(default)]
    pub nightly_rate: u64,
    /// Flat fee per stay.
    #[serde(default)]
    pub cleaning_fee: u64,
    /// Flat fee per stay when at least one pet comes along.
    #[serde(default)]
    pub pet_fee: u64,
    /// Planned maintenance windows; these always show as unavailable.
    #[serde(default)]
    pub maintenance: Vec<DateInterval>,
}

impl RentalUnit {
    pub fn has_feed(&self) -> bool {
        self.feed_url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }
}
