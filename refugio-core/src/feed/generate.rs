//! Outbound feed generation.
//!
//! Output is a pure function of the records passed in: DTSTAMP comes from the
//! record's `updated_at` and events are sorted, so consumers that diff exports
//! see no churn. The published feed carries dates and a source label only.

use icalendar::{Calendar, Component, EventLike, EventStatus, Property};

use crate::reservation::{ReservationRecord, ReservationSource, ReservationStatus};

const PRODID: &str = "-//Refugio//Booking Feed//EN";

/// Render the unit's confirmed, pending and blocked records as a VCALENDAR.
/// Cancelled records never appear.
pub fn generate_feed(records: &[ReservationRecord], unit_name: &str, domain: &str) -> String {
    let mut published: Vec<&ReservationRecord> = records
        .iter()
        .filter(|r| r.is_active() && r.interval().is_some())
        .collect();
    published.sort_by(|a, b| (a.check_in, &a.id).cmp(&(b.check_in, &b.id)));

    let mut calendar = Calendar::empty();
    calendar
        .append_property(Property::new("VERSION", "2.0"))
        .append_property(Property::new("PRODID", PRODID))
        .append_property(Property::new("CALSCALE", "GREGORIAN"))
        .append_property(Property::new("METHOD", "PUBLISH"))
        .name(unit_name);

    for record in published {
        calendar.push(event(record, domain));
    }

    calendar.done().to_string()
}

fn event(record: &ReservationRecord, domain: &str) -> icalendar::Event {
    let status = match record.status {
        ReservationStatus::Pending => EventStatus::Tentative,
        _ => EventStatus::Confirmed,
    };

    icalendar::Event::new()
        .uid(&format!("{}@{}", record.id, domain))
        // Fixed stamp instead of the wall clock the crate would write
        .add_property(
            "DTSTAMP",
            record.updated_at.format("%Y%m%dT%H%M%SZ").to_string(),
        )
        .starts(record.check_in)
        .ends(record.check_out)
        .summary(summary(record))
        .add_property("TRANSP", "OPAQUE")
        .status(status)
        .done()
}

fn summary(record: &ReservationRecord) -> &'static str {
    if record.status == ReservationStatus::Blocked {
        return "Not available";
    }

    match record.source {
        ReservationSource::ExternalFeed => "Reserved - External booking",
        ReservationSource::Direct => "Reserved - Direct booking",
        ReservationSource::Manual => "Reserved - Manual booking",
    }
}
