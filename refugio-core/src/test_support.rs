//! Fixtures shared by unit tests.

use chrono::{NaiveDate, TimeZone, Utc};

use crate::config::SiteConfig;
use crate::interval::{DateInterval, parse_date};
use crate::reservation::{
    GuestContact, PartyComposition, ReservationRecord, ReservationSource, ReservationStatus,
};

pub(crate) const CONFIG: &str = r#"
domain = "refugio.example"

[[units]]
id = "refugio-intimo"
name = "Refugio Íntimo"
capacity = 2
feed_url = "https://feeds.example.com/intimo.ics"
nightly_rate = 65000
cleaning_fee = 15000
pet_fee = 10000
maintenance = [{ start = "2025-06-01", end = "2025-06-05" }]

[[units]]
id = "cabana-bosque"
name = "Cabaña del Bosque"
capacity = 6
nightly_rate = 90000

[payment]
access_token = "TEST-token"
webhook_secret = "whsec"
success_url = "https://refugio.example/reserva/ok"
failure_url = "https://refugio.example/reserva/error"
pending_url = "https://refugio.example/reserva/pendiente"
notification_url = "https://refugio.example/webhooks/payments"

[sync]
token = "sync-token"
"#;

pub(crate) fn config() -> SiteConfig {
    SiteConfig::from_toml(CONFIG).unwrap()
}

pub(crate) fn date(s: &str) -> NaiveDate {
    parse_date(s).unwrap()
}

pub(crate) fn interval(start: &str, end: &str) -> DateInterval {
    DateInterval::parse(start, end).unwrap()
}

pub(crate) fn record(
    id: &str,
    unit_id: &str,
    check_in: &str,
    check_out: &str,
    status: ReservationStatus,
) -> ReservationRecord {
    let stamp = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    ReservationRecord {
        id: id.to_string(),
        unit_id: unit_id.to_string(),
        check_in: date(check_in),
        check_out: date(check_out),
        guest: GuestContact {
            name: "Ana Soto".into(),
            ..Default::default()
        },
        party: PartyComposition::default(),
        status,
        source: ReservationSource::Direct,
        external_id: None,
        reservation_code: None,
        payment: None,
        special_requests: None,
        created_at: stamp,
        updated_at: stamp,
    }
}

pub(crate) fn external(
    id: &str,
    unit_id: &str,
    external_id: &str,
    check_in: &str,
    check_out: &str,
    guest: &str,
) -> ReservationRecord {
    let mut r = record(id, unit_id, check_in, check_out, ReservationStatus::Confirmed);
    r.source = ReservationSource::ExternalFeed;
    r.external_id = Some(external_id.to_string());
    r.guest.name = guest.to_string();
    r
}
