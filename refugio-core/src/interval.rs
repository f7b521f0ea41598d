//! Half-open calendar date ranges.
//!
//! Dates are calendar days with no time-of-day and no timezone. Everything that
//! builds a `NaiveDate` from text goes through [`parse_date`], which reads the
//! `YYYY-MM-DD` prefix directly instead of parsing an instant first.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{RefugioError, RefugioResult};

/// Occupies `[start, end)`: the check-out day is free for the next arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct DateInterval {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawInterval {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawInterval> for DateInterval {
    type Error = RefugioError;

    fn try_from(raw: RawInterval) -> RefugioResult<Self> {
        DateInterval::new(raw.start, raw.end)
    }
}

impl DateInterval {
    pub fn new(start: NaiveDate, end: NaiveDate) -> RefugioResult<Self> {
        if start >= end {
            return Err(RefugioError::InvalidInterval(format!(
                "{} must be before {}",
                start, end
            )));
        }
        Ok(DateInterval { start, end })
    }

    /// Build an interval from two date strings (`YYYY-MM-DD`, partial ISO or `YYYYMMDD`).
    pub fn parse(start: &str, end: &str) -> RefugioResult<Self> {
        DateInterval::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn nights(&self) -> u32 {
        u32::try_from((self.end - self.start).num_days()).unwrap_or(u32::MAX)
    }

    pub fn overlaps(&self, other: &DateInterval) -> bool {
        overlaps(self, other)
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        contains_date(self, date)
    }

    /// Every occupied day, check-out day excluded.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start
            .iter_days()
            .take_while(move |d| *d < self.end)
    }
}

impl fmt::Display for DateInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.start, self.end)
    }
}

/// Two stays conflict iff each starts before the other ends.
pub fn overlaps(a: &DateInterval, b: &DateInterval) -> bool {
    a.start < b.end && b.start < a.end
}

pub fn contains_date(interval: &DateInterval, date: NaiveDate) -> bool {
    interval.start <= date && date < interval.end
}

/// Parse a calendar day from `YYYY-MM-DD`, any ISO string starting with it
/// (`2025-03-10T00:00:00.000Z` → March 10), or compact `YYYYMMDD`.
///
/// The time part, if any, is ignored rather than converted: a date-only value
/// must never shift by a day because of the process timezone.
pub fn parse_date(s: &str) -> RefugioResult<NaiveDate> {
    let s = s.trim();
    let invalid = || RefugioError::InvalidInterval(format!("Invalid date '{}'", s));

    if s.len() >= 10 && s.as_bytes().get(4) == Some(&b'-') {
        let head = s.get(..10).ok_or_else(invalid)?;
        return NaiveDate::parse_from_str(head, "%Y-%m-%d").map_err(|_| invalid());
    }

    if s.len() >= 8 && s.as_bytes()[..8].iter().all(u8::is_ascii_digit) {
        let head = s.get(..8).ok_or_else(invalid)?;
        return NaiveDate::parse_from_str(head, "%Y%m%d").map_err(|_| invalid());
    }

    Err(invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn iv(a: &str, b: &str) -> DateInterval {
        DateInterval::parse(a, b).unwrap()
    }

    #[test]
    fn shared_boundary_is_not_a_conflict() {
        let a = iv("2025-03-10", "2025-03-12");
        let b = iv("2025-03-12", "2025-03-14");
        assert!(!overlaps(&a, &b));
        assert!(!overlaps(&b, &a));
    }

    #[test]
    fn partial_overlap_conflicts_both_ways() {
        let a = iv("2025-03-10", "2025-03-12");
        let b = iv("2025-03-11", "2025-03-13");
        assert!(overlaps(&a, &b));
        assert!(overlaps(&b, &a));
    }

    #[test]
    fn interval_overlaps_itself() {
        let a = iv("2025-03-10", "2025-03-11");
        assert!(overlaps(&a, &a));
    }

    #[test]
    fn containment_overlaps() {
        let outer = iv("2025-03-01", "2025-03-31");
        let inner = iv("2025-03-10", "2025-03-12");
        assert!(overlaps(&outer, &inner));
        assert!(overlaps(&inner, &outer));
    }

    #[test]
    fn overlap_is_symmetric_over_a_grid() {
        let days = ["2025-03-10", "2025-03-11", "2025-03-12", "2025-03-13", "2025-03-14"];
        let mut intervals = Vec::new();
        for (i, a) in days.iter().enumerate() {
            for b in &days[i + 1..] {
                intervals.push(iv(a, b));
            }
        }
        for a in &intervals {
            for b in &intervals {
                assert_eq!(overlaps(a, b), overlaps(b, a), "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn contains_date_is_half_open() {
        let a = iv("2025-03-10", "2025-03-12");
        assert!(a.contains_date(d("2025-03-10")));
        assert!(a.contains_date(d("2025-03-11")));
        assert!(!a.contains_date(d("2025-03-12")));
        assert!(!a.contains_date(d("2025-03-09")));
    }

    #[test]
    fn empty_and_reversed_ranges_are_rejected() {
        assert!(DateInterval::parse("2025-03-10", "2025-03-10").is_err());
        assert!(DateInterval::parse("2025-03-12", "2025-03-10").is_err());
    }

    #[test]
    fn parse_date_ignores_time_component() {
        // A UTC midnight instant must stay on its calendar day whatever the local zone
        assert_eq!(d("2025-03-10T00:00:00.000Z"), NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(d("2025-03-10T23:30:00-05:00"), NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
    }

    #[test]
    fn parse_date_accepts_compact_form() {
        assert_eq!(d("20250310"), NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(d("20250310T140000Z"), NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert!(parse_date("tomorrow").is_err());
        assert!(parse_date("2025-13-40").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn nights_and_days() {
        let a = iv("2025-03-10", "2025-03-13");
        assert_eq!(a.nights(), 3);
        let days: Vec<_> = a.days().collect();
        assert_eq!(days, vec![d("2025-03-10"), d("2025-03-11"), d("2025-03-12")]);
    }

    #[test]
    fn deserialize_enforces_ordering() {
        let ok: DateInterval =
            serde_json::from_str(r#"{"start":"2025-03-10","end":"2025-03-12"}"#).unwrap();
        assert_eq!(ok.nights(), 2);
        let bad = serde_json::from_str::<DateInterval>(r#"{"start":"2025-03-12","end":"2025-03-10"}"#);
        assert!(bad.is_err());
    }
}
