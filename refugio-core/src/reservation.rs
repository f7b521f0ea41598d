//! Reservation records as held by the record store.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RefugioError, RefugioResult};
use crate::interval::DateInterval;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Blocked,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a reservation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReservationSource {
    ExternalFeed,
    Direct,
    Manual,
}

impl ReservationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationSource::ExternalFeed => "external-feed",
            ReservationSource::Direct => "direct",
            ReservationSource::Manual => "manual",
        }
    }
}

impl fmt::Display for ReservationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuestContact {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyComposition {
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    #[serde(default)]
    pub pets: u32,
}

impl Default for PartyComposition {
    fn default() -> Self {
        PartyComposition {
            adults: 1,
            children: 0,
            pets: 0,
        }
    }
}

impl PartyComposition {
    /// People staying (pets excluded). Saturates instead of wrapping, so an
    /// absurd count still fails a capacity check.
    pub fn guests(&self) -> u32 {
        self.adults.saturating_add(self.children)
    }
}

/// Links a reservation to the provider payment that paid for it.
/// Always filled from the provider's own payment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentLink {
    pub payment_id: String,
    pub amount: f64,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationRecord {
    pub id: String,
    pub unit_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guest: GuestContact,
    pub party: PartyComposition,
    pub status: ReservationStatus,
    pub source: ReservationSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReservationRecord {
    /// The occupied range, or `None` for a row that breaks `check_in < check_out`.
    pub fn interval(&self) -> Option<DateInterval> {
        DateInterval::new(self.check_in, self.check_out).ok()
    }

    /// Cancelled records never block dates.
    pub fn is_active(&self) -> bool {
        self.status != ReservationStatus::Cancelled
    }
}

/// Payload for creating a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationInput {
    pub unit_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guest: GuestContact,
    pub party: PartyComposition,
    pub status: ReservationStatus,
    pub source: ReservationSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
}

impl ReservationInput {
    /// Checks the record invariants before anything reaches the store.
    pub fn validate(&self) -> RefugioResult<()> {
        DateInterval::new(self.check_in, self.check_out)?;

        match (self.source, self.external_id.as_deref()) {
            (ReservationSource::ExternalFeed, None) | (ReservationSource::ExternalFeed, Some("")) => {
                Err(RefugioError::Validation(
                    "external-feed reservations need an external id".into(),
                ))
            }
            (ReservationSource::Direct | ReservationSource::Manual, Some(_)) => Err(
                RefugioError::Validation("only external-feed reservations carry an external id".into()),
            ),
            _ => Ok(()),
        }
    }
}

/// Partial update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReservationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_out: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adults: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ReservationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_code: Option<String>,
}

impl ReservationPatch {
    pub fn cancel() -> Self {
        ReservationPatch {
            status: Some(ReservationStatus::Cancelled),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == ReservationPatch::default()
    }

    /// Apply onto a record in place (used by the in-memory store).
    pub fn apply_to(&self, record: &mut ReservationRecord) {
        if let Some(check_in) = self.check_in {
            record.check_in = check_in;
        }
        if let Some(check_out) = self.check_out {
            record.check_out = check_out;
        }
        if let Some(ref name) = self.guest_name {
            record.guest.name = name.clone();
        }
        if let Some(adults) = self.adults {
            record.party.adults = adults;
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(ref code) = self.reservation_code {
            record.reservation_code = Some(code.clone());
        }
    }
}

/// Human-facing booking code: `RF` followed by eight uppercase hex digits.
pub fn new_reservation_code() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
    format!("RF{}", &id[..8])
}
