//! Payment provider collaborator.
//!
//! The provider owns the money. We hand it an intent (with everything needed to
//! write the reservation later, as string metadata) and, when it calls back, ask
//! it again for the authoritative payment record.

mod http;
pub mod signature;

pub use http::HttpPaymentProvider;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{RefugioError, RefugioResult};
use crate::interval::{DateInterval, parse_date};
use crate::pricing::Quote;
use crate::reservation::{GuestContact, PartyComposition};

/// Booking details carried through the provider and read back on approval.
/// Keys are snake_case on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMetadata {
    pub unit_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub adults: u32,
    pub children: u32,
    pub pets: u32,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: Option<String>,
    pub total_amount: u64,
    pub special_requests: Option<String>,
    /// Code shown to the guest at checkout, kept on the confirmed record.
    pub reservation_code: Option<String>,
}

impl PaymentMetadata {
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("unit_id".into(), self.unit_id.clone());
        map.insert("check_in".into(), self.check_in.format("%Y-%m-%d").to_string());
        map.insert("check_out".into(), self.check_out.format("%Y-%m-%d").to_string());
        map.insert("adults".into(), self.adults.to_string());
        map.insert("children".into(), self.children.to_string());
        map.insert("pets".into(), self.pets.to_string());
        map.insert("guest_name".into(), self.guest_name.clone());
        map.insert("guest_email".into(), self.guest_email.clone());
        if let Some(ref phone) = self.guest_phone {
            map.insert("guest_phone".into(), phone.clone());
        }
        map.insert("total_amount".into(), self.total_amount.to_string());
        if let Some(ref requests) = self.special_requests {
            map.insert("special_requests".into(), requests.clone());
        }
        if let Some(ref code) = self.reservation_code {
            map.insert("reservation_code".into(), code.clone());
        }
        map
    }

    /// Decode what the provider echoes back. Providers may turn numeric strings
    /// into JSON numbers, so both are accepted.
    pub fn from_map(map: &Map<String, Value>) -> RefugioResult<Self> {
        let text = |key: &str| -> Option<String> {
            match map.get(key)? {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }
        };
        let required = |key: &str| {
            text(key).ok_or_else(|| {
                RefugioError::Payment(format!("payment metadata is missing '{}'", key))
            })
        };
        let number = |key: &str, default: Option<u64>| -> RefugioResult<u64> {
            match text(key) {
                // Amounts may come back as "145000.0"
                Some(raw) => raw
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite() && *n >= 0.0)
                    .map(|n| n.round() as u64)
                    .ok_or_else(|| {
                        RefugioError::Payment(format!("payment metadata '{}' is not a number", key))
                    }),
                None => default.ok_or_else(|| {
                    RefugioError::Payment(format!("payment metadata is missing '{}'", key))
                }),
            }
        };
        let count = |key: &str, default: Option<u64>| -> RefugioResult<u32> {
            u32::try_from(number(key, default)?).map_err(|_| {
                RefugioError::Payment(format!("payment metadata '{}' is out of range", key))
            })
        };

        Ok(PaymentMetadata {
            unit_id: required("unit_id")?,
            check_in: parse_date(&required("check_in")?)?,
            check_out: parse_date(&required("check_out")?)?,
            adults: count("adults", None)?,
            children: count("children", Some(0))?,
            pets: count("pets", Some(0))?,
            guest_name: required("guest_name")?,
            guest_email: required("guest_email")?,
            guest_phone: text("guest_phone"),
            total_amount: number("total_amount", None)?,
            special_requests: text("special_requests"),
            reservation_code: text("reservation_code"),
        })
    }

    pub fn interval(&self) -> RefugioResult<DateInterval> {
        DateInterval::new(self.check_in, self.check_out)
    }

    pub fn guest(&self) -> GuestContact {
        GuestContact {
            name: self.guest_name.clone(),
            email: Some(self.guest_email.clone()),
            phone: self.guest_phone.clone(),
        }
    }

    pub fn party(&self) -> PartyComposition {
        PartyComposition {
            adults: self.adults,
            children: self.children,
            pets: self.pets,
        }
    }
}

/// Everything the provider needs to open a checkout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentIntentContext {
    pub unit_id: String,
    pub unit_name: String,
    pub interval: DateInterval,
    pub guest: GuestContact,
    pub party: PartyComposition,
    pub quote: Quote,
    pub currency: String,
    /// Our reference for the checkout, shown to the guest by the provider.
    pub reference: String,
    pub metadata: PaymentMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub preference_id: String,
    pub redirect_url: String,
}

/// Provider statuses collapsed to what the booking flow acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Approved,
    /// Still settling (offline methods, in review, authorized but not captured).
    Pending,
    /// Rejected, cancelled, refunded or charged back.
    Rejected,
}

impl PaymentStatus {
    pub fn from_provider(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "approved" => PaymentStatus::Approved,
            "rejected" | "cancelled" | "refunded" | "charged_back" => PaymentStatus::Rejected,
            _ => PaymentStatus::Pending,
        }
    }
}

/// The provider's own record of a payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub id: String,
    pub status: PaymentStatus,
    /// Status string exactly as the provider reported it.
    pub raw_status: String,
    pub amount: f64,
    pub metadata: Map<String, Value>,
    pub approved_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_checkout(&self, intent: &PaymentIntentContext) -> RefugioResult<CheckoutSession>;

    async fn get_payment(&self, payment_id: &str) -> RefugioResult<PaymentDetails>;
}
