//! Direct booking: from the guest's form to a confirmed reservation.
//!
//! ```text
//! intent_created -> awaiting_payment -> approved | rejected | pending_payment
//! approved -> reservation_confirmed | conflict_detected
//! ```
//!
//! Nothing is written to the record store until the provider reports the
//! payment approved. At that point availability is checked again with the same
//! predicate used for the intent, and a clash goes to the review queue instead
//! of becoming a double booking.

mod manual;
pub mod review;

pub use manual::{ManualEntry, ManualKind, ManualOutcome};
pub use review::{JsonlReviewQueue, MemoryReviewQueue, ReviewEntry, ReviewQueue, ReviewReason};

use std::fmt;
use std::sync::{Arc, LazyLock};

use chrono::{NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::availability::{AvailabilityCheck, check_date_availability};
use crate::config::SiteConfig;
use crate::error::{RefugioError, RefugioResult};
use crate::interval::DateInterval;
use crate::payment::{
    PaymentDetails, PaymentIntentContext, PaymentMetadata, PaymentProvider, PaymentStatus,
};
use crate::pricing::{Quote, quote};
use crate::reservation::{
    GuestContact, PartyComposition, PaymentLink, ReservationInput, ReservationRecord,
    ReservationSource, ReservationStatus, new_reservation_code,
};
use crate::store::{RecordStore, ReservationFilter};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingState {
    IntentCreated,
    AwaitingPayment,
    Approved,
    Rejected,
    PendingPayment,
    ReservationConfirmed,
    ConflictDetected,
}

impl fmt::Display for BookingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingState::IntentCreated => "intent-created",
            BookingState::AwaitingPayment => "awaiting-payment",
            BookingState::Approved => "approved",
            BookingState::Rejected => "rejected",
            BookingState::PendingPayment => "pending-payment",
            BookingState::ReservationConfirmed => "reservation-confirmed",
            BookingState::ConflictDetected => "conflict-detected",
        };
        f.write_str(s)
    }
}

/// The booking form as submitted. Dates are text so bad input becomes a
/// validation message rather than a decode failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub unit_id: String,
    pub check_in: String,
    pub check_out: String,
    pub guest_name: String,
    pub guest_email: String,
    #[serde(default)]
    pub guest_phone: Option<String>,
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    #[serde(default)]
    pub pets: u32,
    #[serde(default)]
    pub special_requests: Option<String>,
}

impl BookingRequest {
    /// Check the form against the unit and return the requested stay.
    pub fn validate(&self, config: &SiteConfig, today: NaiveDate) -> RefugioResult<DateInterval> {
        let unit = config.unit(&self.unit_id)?;

        if self.guest_name.trim().is_empty() {
            return Err(RefugioError::Validation("guest name is required".into()));
        }
        if !EMAIL.is_match(self.guest_email.trim()) {
            return Err(RefugioError::Validation("a valid email is required".into()));
        }
        if self.adults < 1 {
            return Err(RefugioError::Validation("at least one adult is required".into()));
        }
        let party = self.party();
        if party.guests() > unit.capacity {
            return Err(RefugioError::Validation(format!(
                "{} sleeps at most {} guests",
                unit.name, unit.capacity
            )));
        }
        if party.pets > unit.capacity {
            return Err(RefugioError::Validation(format!(
                "{} takes at most {} pets",
                unit.name, unit.capacity
            )));
        }

        let interval = DateInterval::parse(&self.check_in, &self.check_out)
            .map_err(|_| RefugioError::Validation("check-out must be after check-in".into()))?;

        if interval.start() < today {
            return Err(RefugioError::Validation("check-in cannot be in the past".into()));
        }
        if unit.maintenance.iter().any(|m| m.overlaps(&interval)) {
            return Err(RefugioError::Validation(
                "the cabin is closed for maintenance on those dates".into(),
            ));
        }

        Ok(interval)
    }

    fn guest(&self) -> GuestContact {
        GuestContact {
            name: self.guest_name.trim().to_string(),
            email: Some(self.guest_email.trim().to_string()),
            phone: self
                .guest_phone
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from),
        }
    }

    fn party(&self) -> PartyComposition {
        PartyComposition {
            adults: self.adults,
            children: self.children,
            pets: self.pets,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IntentOutcome {
    AwaitingPayment {
        redirect_url: String,
        preference_id: String,
        reference: String,
        quote: Quote,
    },
    /// The dates are taken; nothing was sent to the provider.
    Unavailable { check: AvailabilityCheck },
}

impl IntentOutcome {
    pub fn state(&self) -> BookingState {
        match self {
            IntentOutcome::AwaitingPayment { .. } => BookingState::AwaitingPayment,
            IntentOutcome::Unavailable { .. } => BookingState::IntentCreated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConfirmationOutcome {
    ReservationConfirmed { reservation: ReservationRecord },
    /// A repeat notification for a payment that already has its reservation.
    AlreadyConfirmed { reservation: ReservationRecord },
    ConflictDetected {
        payment_id: String,
        conflicting_ids: Vec<String>,
    },
    /// Approved, but the metadata does not describe a bookable stay. Flagged for review.
    Unprocessable { payment_id: String, reason: String },
    Rejected { payment_id: String, status: String },
    PendingPayment { payment_id: String, status: String },
}

impl ConfirmationOutcome {
    pub fn state(&self) -> BookingState {
        match self {
            ConfirmationOutcome::ReservationConfirmed { .. }
            | ConfirmationOutcome::AlreadyConfirmed { .. } => BookingState::ReservationConfirmed,
            ConfirmationOutcome::ConflictDetected { .. }
            | ConfirmationOutcome::Unprocessable { .. } => BookingState::ConflictDetected,
            ConfirmationOutcome::Rejected { .. } => BookingState::Rejected,
            ConfirmationOutcome::PendingPayment { .. } => BookingState::PendingPayment,
        }
    }
}

#[derive(Clone)]
pub struct BookingService {
    config: Arc<SiteConfig>,
    store: Arc<dyn RecordStore>,
    payments: Arc<dyn PaymentProvider>,
    review: Arc<dyn ReviewQueue>,
}

impl BookingService {
    pub fn new(
        config: Arc<SiteConfig>,
        store: Arc<dyn RecordStore>,
        payments: Arc<dyn PaymentProvider>,
        review: Arc<dyn ReviewQueue>,
    ) -> Self {
        BookingService {
            config,
            store,
            payments,
            review,
        }
    }

    /// Today in the site's timezone.
    fn today(&self) -> RefugioResult<NaiveDate> {
        Ok(Utc::now().with_timezone(&self.config.feed_tz()?).date_naive())
    }

    pub async fn create_intent(&self, request: &BookingRequest) -> RefugioResult<IntentOutcome> {
        self.create_intent_on(request, self.today()?).await
    }

    /// [`create_intent`](Self::create_intent) with an explicit "today".
    pub async fn create_intent_on(
        &self,
        request: &BookingRequest,
        today: NaiveDate,
    ) -> RefugioResult<IntentOutcome> {
        let interval = request.validate(&self.config, today)?;
        let unit = self.config.unit(&request.unit_id)?;
        let party = request.party();
        let quote = quote(unit, &interval, &party);

        let records = self.store.list(&ReservationFilter::active(&unit.id)).await?;
        let check = check_date_availability(&unit.id, &interval, &records);
        if !check.is_available {
            info!(unit = %unit.id, range = %interval, conflicts = check.conflicts.len(), "Dates unavailable");
            return Ok(IntentOutcome::Unavailable { check });
        }

        let guest = request.guest();
        let reference = new_reservation_code();
        let intent = PaymentIntentContext {
            unit_id: unit.id.clone(),
            unit_name: unit.name.clone(),
            interval,
            guest: guest.clone(),
            party,
            quote,
            currency: self.config.currency.clone(),
            reference: reference.clone(),
            metadata: PaymentMetadata {
                unit_id: unit.id.clone(),
                check_in: interval.start(),
                check_out: interval.end(),
                adults: party.adults,
                children: party.children,
                pets: party.pets,
                guest_name: guest.name.clone(),
                guest_email: guest.email.clone().unwrap_or_default(),
                guest_phone: guest.phone.clone(),
                total_amount: quote.total,
                special_requests: request
                    .special_requests
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from),
                reservation_code: Some(reference.clone()),
            },
        };

        let session = self.payments.create_checkout(&intent).await?;
        info!(unit = %unit.id, range = %interval, reference = %reference, "Awaiting payment");

        Ok(IntentOutcome::AwaitingPayment {
            redirect_url: session.redirect_url,
            preference_id: session.preference_id,
            reference,
            quote,
        })
    }

    /// Drive the state machine from a provider notification. Only the payment id
    /// is taken from the notification; everything else is re-read from the provider.
    pub async fn handle_notification(&self, payment_id: &str) -> RefugioResult<ConfirmationOutcome> {
        let payment = self.payments.get_payment(payment_id).await?;

        let outcome = match payment.status {
            PaymentStatus::Approved => self.confirm(&payment).await?,
            PaymentStatus::Rejected => ConfirmationOutcome::Rejected {
                payment_id: payment.id.clone(),
                status: payment.raw_status.clone(),
            },
            PaymentStatus::Pending => ConfirmationOutcome::PendingPayment {
                payment_id: payment.id.clone(),
                status: payment.raw_status.clone(),
            },
        };

        info!(payment = %payment.id, state = %outcome.state(), "Payment notification handled");
        Ok(outcome)
    }

    async fn confirm(&self, payment: &PaymentDetails) -> RefugioResult<ConfirmationOutcome> {
        // A provider may deliver the same approval more than once
        let existing = self.store.list(&ReservationFilter::by_payment(&payment.id)).await?;
        if let Some(reservation) = existing.into_iter().next() {
            return Ok(ConfirmationOutcome::AlreadyConfirmed { reservation });
        }

        let metadata = match self.decode(payment) {
            Ok(metadata) => metadata,
            Err(e) => return self.flag_unprocessable(payment, e.to_string()).await,
        };
        let interval = metadata.interval()?;

        let records = self
            .store
            .list(&ReservationFilter::active(&metadata.unit_id))
            .await?;
        let check = check_date_availability(&metadata.unit_id, &interval, &records);

        if !check.is_available {
            return self.flag_conflict(payment, &metadata, &interval, check).await;
        }

        let input = ReservationInput {
            unit_id: metadata.unit_id.clone(),
            check_in: interval.start(),
            check_out: interval.end(),
            guest: metadata.guest(),
            party: metadata.party(),
            status: ReservationStatus::Confirmed,
            source: ReservationSource::Direct,
            external_id: None,
            reservation_code: Some(
                metadata
                    .reservation_code
                    .clone()
                    .unwrap_or_else(new_reservation_code),
            ),
            payment: Some(PaymentLink {
                payment_id: payment.id.clone(),
                amount: payment.amount,
                paid_at: payment.approved_at,
            }),
            special_requests: metadata.special_requests.clone(),
        };

        let reservation = self.store.create(input).await?;
        info!(
            payment = %payment.id,
            reservation = %reservation.id,
            unit = %reservation.unit_id,
            range = %interval,
            "Reservation confirmed"
        );
        Ok(ConfirmationOutcome::ReservationConfirmed { reservation })
    }

    fn decode(&self, payment: &PaymentDetails) -> RefugioResult<PaymentMetadata> {
        let metadata = PaymentMetadata::from_map(&payment.metadata)?;
        self.config.unit(&metadata.unit_id)?;
        metadata.interval()?;
        Ok(metadata)
    }

    async fn flag_conflict(
        &self,
        payment: &PaymentDetails,
        metadata: &PaymentMetadata,
        interval: &DateInterval,
        check: AvailabilityCheck,
    ) -> RefugioResult<ConfirmationOutcome> {
        let conflicting_ids = check.conflict_ids();
        error!(
            payment = %payment.id,
            amount = payment.amount,
            unit = %metadata.unit_id,
            range = %interval,
            conflicts = ?conflicting_ids,
            "Payment approved for dates that are no longer free"
        );

        self.flag_once(ReviewEntry {
            payment_id: payment.id.clone(),
            amount: payment.amount,
            reason: ReviewReason::DateConflict,
            unit_id: Some(metadata.unit_id.clone()),
            interval: Some(*interval),
            conflicting_ids: conflicting_ids.clone(),
            detail: format!("{} <{}>", metadata.guest_name, metadata.guest_email),
            flagged_at: Utc::now(),
        })
        .await?;

        Ok(ConfirmationOutcome::ConflictDetected {
            payment_id: payment.id.clone(),
            conflicting_ids,
        })
    }

    async fn flag_unprocessable(
        &self,
        payment: &PaymentDetails,
        reason: String,
    ) -> RefugioResult<ConfirmationOutcome> {
        error!(payment = %payment.id, amount = payment.amount, reason = %reason, "Approved payment cannot be booked");

        self.flag_once(ReviewEntry {
            payment_id: payment.id.clone(),
            amount: payment.amount,
            reason: ReviewReason::Unprocessable,
            unit_id: None,
            interval: None,
            conflicting_ids: Vec::new(),
            detail: reason.clone(),
            flagged_at: Utc::now(),
        })
        .await?;

        Ok(ConfirmationOutcome::Unprocessable {
            payment_id: payment.id.clone(),
            reason,
        })
    }

    /// Repeat notifications for a flagged payment do not add new entries.
    async fn flag_once(&self, entry: ReviewEntry) -> RefugioResult<()> {
        if self.review.contains(&entry.payment_id).await? {
            warn!(payment = %entry.payment_id, "Payment already queued for review");
            return Ok(());
        }
        self.review.flag(entry).await
    }
}
