//! TUI rendering traits for refugio types.
//!
//! Extension traits that add colored terminal rendering to refugio-core types
//! using owo_colors.

use owo_colors::OwoColorize;
use refugio_core::RentalUnit;
use refugio_core::feed::{FeedEvent, FeedEventKind};
use refugio_core::reservation::ReservationRecord;
use refugio_core::sync::{DiffKind, ReservationDiff, UnitDiff, UnitSyncResult};

pub trait Render {
    fn render(&self) -> String;
}

impl Render for DiffKind {
    fn render(&self) -> String {
        let symbol = self.to_string();
        match self {
            DiffKind::Create => symbol.green().to_string(),
            DiffKind::Update => symbol.yellow().to_string(),
            DiffKind::Cancel => symbol.red().to_string(),
        }
    }
}

fn colorize_diff(kind: DiffKind, text: &str) -> String {
    match kind {
        DiffKind::Create => text.green().to_string(),
        DiffKind::Update => text.yellow().to_string(),
        DiffKind::Cancel => text.red().to_string(),
    }
}

impl Render for ReservationDiff {
    fn render(&self) -> String {
        let (name, dates, uid) = match (&self.event, &self.existing) {
            (Some(event), _) => (
                event.guest_name.clone(),
                event.interval.to_string(),
                event.external_id.clone(),
            ),
            (None, Some(record)) => (
                record.guest.name.clone(),
                format!("{} → {}", record.check_in, record.check_out),
                record.external_id.clone().unwrap_or_else(|| record.id.clone()),
            ),
            (None, None) => return self.kind.render(),
        };

        let mut line = format!(
            "{} {} {} {}",
            self.kind.render(),
            colorize_diff(self.kind, &name),
            dates,
            uid.dimmed()
        );

        // Show what moved for updates
        if let (DiffKind::Update, Some(record), Some(event)) = (self.kind, &self.existing, &self.event) {
            if record.check_in != event.interval.start() || record.check_out != event.interval.end() {
                line.push_str(&format!(
                    "\n     {} {} → {}",
                    "was".dimmed(),
                    record.check_in,
                    record.check_out
                ));
            }
        }
        line
    }
}

impl Render for UnitDiff {
    fn render(&self) -> String {
        if self.is_empty() {
            return format!("   {}", "Up to date".dimmed());
        }
        self.diffs
            .iter()
            .map(|d| format!("   {}", d.render()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Render for UnitSyncResult {
    fn render(&self) -> String {
        if let Some(ref error) = self.error {
            return format!("   {}", error.red());
        }
        if self.changes() == 0 && self.errors == 0 {
            return format!("   {}", "Up to date".dimmed());
        }

        let mut line = format!(
            "   {} created, {} updated, {} cancelled",
            self.created.green(),
            self.updated.yellow(),
            self.cancelled.red()
        );
        if self.errors > 0 {
            line.push_str(&format!(" ({} failed)", self.errors).red().to_string());
        }
        line
    }
}

impl Render for RentalUnit {
    fn render(&self) -> String {
        format!("🏠 {}", self.id)
    }
}

impl Render for FeedEvent {
    fn render(&self) -> String {
        let name = match self.kind {
            FeedEventKind::Reservation => self.guest_name.clone(),
            FeedEventKind::Blocked => self.summary.dimmed().to_string(),
        };
        let mut line = format!("{} {} ({} nights)", self.interval, name, self.interval.nights());
        if self.kind == FeedEventKind::Reservation {
            line.push_str(&format!(", {} guests", self.guest_count));
        }
        if !self.reservation_code.is_empty() {
            line.push_str(&format!(" {}", self.reservation_code.dimmed()));
        }
        line
    }
}

impl Render for ReservationRecord {
    fn render(&self) -> String {
        format!(
            "{} → {} {} {}",
            self.check_in,
            self.check_out,
            self.guest.name,
            format!("[{}, {}]", self.source, self.status).dimmed()
        )
    }
}
