//! Feed parsing on top of the icalendar crate's parser.
//!
//! Each VEVENT is read on its own, so one unreadable event never costs the rest
//! of the feed.

use std::sync::LazyLock;

use chrono::{NaiveDate, TimeZone};
use chrono_tz::Tz;
use icalendar::parser::{Component, Property, read_components, unfold};
use icalendar::{CalendarDateTime, DatePerhapsTime};
use regex::Regex;
use tracing::debug;

use super::{FeedEvent, FeedEventKind};
use crate::error::{RefugioError, RefugioResult};
use crate::interval::DateInterval;

/// Guest name used when the feed hides who booked.
pub const REDACTED_GUEST_NAME: &str = "Reserved Guest";

/// Summaries that carry no guest identity.
const REDACTED_MARKERS: &[&str] = &[
    "reserved",
    "reservado",
    "not available",
    "no disponible",
    "unavailable",
    "blocked",
    "bloqueado",
    "closed",
];

/// Summaries meaning the host closed the dates rather than a guest booking them.
const BLOCKED_MARKERS: &[&str] = &[
    "not available",
    "no disponible",
    "unavailable",
    "blocked",
    "bloqueado",
    "closed",
];

const NAME_SEPARATORS: &[&str] = &[" - ", " – ", " (", "|", ","];

const GUEST_WORDS: &str = r"guests?|adults?|huésped(?:es)?|huespedes|adultos?|personas?";

static COUNT_AFTER_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)(\d+)\s*(?:{GUEST_WORDS})\b")).unwrap());

static COUNT_AFTER_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)\b(?:{GUEST_WORDS})\s*[:=]?\s*(\d+)")).unwrap());

static CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[A-Za-z0-9]{8,}\b").unwrap());

/// Parse a feed, flooring timed events to UTC calendar days.
pub fn parse_feed(content: &str) -> RefugioResult<Vec<FeedEvent>> {
    parse_feed_in(content, Tz::UTC)
}

/// Parse a feed, flooring timed events to calendar days in `tz`.
///
/// Returns an error only when the text is not a VCALENDAR at all; malformed or
/// incomplete VEVENTs are skipped.
pub fn parse_feed_in(content: &str, tz: Tz) -> RefugioResult<Vec<FeedEvent>> {
    let unfolded = unfold(content);
    let components = read_components(&unfolded).map_err(|e| {
        let reason = e.lines().next().unwrap_or("unreadable calendar").to_string();
        RefugioError::FeedParse(reason)
    })?;

    let calendar = components
        .iter()
        .find(|c| c.name == "VCALENDAR")
        .ok_or_else(|| RefugioError::FeedParse("no BEGIN:VCALENDAR found in feed".into()))?;

    Ok(calendar
        .components
        .iter()
        .filter(|c| c.name == "VEVENT")
        .filter_map(|vevent| feed_event(vevent, tz))
        .collect())
}

fn text(vevent: &Component<'_>, name: &str) -> Option<String> {
    vevent
        .find_prop(name)
        .map(|p| p.val.as_str().to_string())
        .filter(|v| !v.trim().is_empty())
}

/// Convert one VEVENT, or `None` when it cannot occupy dates.
fn feed_event(vevent: &Component<'_>, tz: Tz) -> Option<FeedEvent> {
    let Some(uid) = text(vevent, "UID") else {
        debug!("Skipping VEVENT without UID");
        return None;
    };

    let cancelled = vevent
        .find_prop("STATUS")
        .is_some_and(|p| p.val.as_str().trim().eq_ignore_ascii_case("CANCELLED"));
    if cancelled {
        debug!(uid = %uid, "Skipping cancelled VEVENT");
        return None;
    }

    let Some(summary) = vevent.find_prop("SUMMARY").map(|p| p.val.as_str().to_string()) else {
        debug!(uid = %uid, "Skipping VEVENT without SUMMARY");
        return None;
    };

    let start = vevent.find_prop("DTSTART").and_then(|p| feed_day(p, tz));
    let end = vevent.find_prop("DTEND").and_then(|p| feed_day(p, tz));
    let (Some(start), Some(end)) = (start, end) else {
        debug!(uid = %uid, "Skipping VEVENT with missing or unreadable dates");
        return None;
    };

    let interval = match DateInterval::new(start, end) {
        Ok(interval) => interval,
        Err(e) => {
            debug!(uid = %uid, error = %e, "Skipping VEVENT with empty range");
            return None;
        }
    };

    let description = text(vevent, "DESCRIPTION");
    let guest_count = description.as_deref().map(guest_count).unwrap_or(1);
    let reservation_code = description
        .as_deref()
        .map(reservation_code)
        .unwrap_or_default();

    Some(FeedEvent {
        external_id: uid,
        guest_name: guest_name(&summary),
        kind: event_kind(&summary),
        summary,
        description,
        location: text(vevent, "LOCATION"),
        interval,
        guest_count,
        reservation_code,
    })
}

/// DATE values are taken as-is. DATE-TIME values become an instant (UTC `Z`,
/// `TZID=` zone, or floating) and are floored to the day in `tz`.
fn feed_day(property: &Property<'_>, tz: Tz) -> Option<NaiveDate> {
    match DatePerhapsTime::try_from(property).ok()? {
        DatePerhapsTime::Date(date) => Some(date),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(instant)) => {
            Some(instant.with_timezone(&tz).date_naive())
        }
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => Some(naive.date()),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => Some(
            tzid.parse::<Tz>()
                .ok()
                .and_then(|source| source.from_local_datetime(&date_time).earliest())
                .map(|dt| dt.with_timezone(&tz).date_naive())
                .unwrap_or(date_time.date()),
        ),
    }
}

fn is_redacted(summary: &str) -> bool {
    let lower = summary.trim().to_lowercase();
    lower.is_empty() || REDACTED_MARKERS.iter().any(|m| lower.contains(m))
}

fn event_kind(summary: &str) -> FeedEventKind {
    let lower = summary.to_lowercase();
    if BLOCKED_MARKERS.iter().any(|m| lower.contains(m)) {
        FeedEventKind::Blocked
    } else {
        FeedEventKind::Reservation
    }
}

/// First segment of the summary, or the placeholder for redacted summaries.
fn guest_name(summary: &str) -> String {
    if is_redacted(summary) {
        return REDACTED_GUEST_NAME.to_string();
    }

    let cut = NAME_SEPARATORS
        .iter()
        .filter_map(|sep| summary.find(sep))
        .min()
        .unwrap_or(summary.len());

    let name = summary[..cut].trim();
    if name.is_empty() {
        REDACTED_GUEST_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// First number next to a guest/adult word, either side. Defaults to 1.
fn guest_count(description: &str) -> u32 {
    let before = COUNT_AFTER_NUMBER
        .captures(description)
        .and_then(|c| c.get(1));
    let after = COUNT_AFTER_KEYWORD
        .captures(description)
        .and_then(|c| c.get(1));

    let first = match (before, after) {
        (Some(a), Some(b)) => Some(if a.start() <= b.start() { a } else { b }),
        (a, b) => a.or(b),
    };

    first
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(1)
}

/// First run of 8+ alphanumerics that mixes letters and digits.
/// All-digit runs are dates or phone numbers; all-letter runs are words.
fn reservation_code(description: &str) -> String {
    CODE.find_iter(description)
        .map(|m| m.as_str())
        .find(|s| {
            s.chars().any(|c| c.is_ascii_digit()) && s.chars().any(|c| c.is_ascii_alphabetic())
        })
        .unwrap_or_default()
        .to_string()
}
