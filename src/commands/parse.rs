use std::time::Duration;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use owo_colors::OwoColorize;
use refugio_core::feed::{FeedFetcher, parse_feed_in, summarize};

use crate::render::Render;
use crate::utils::tui::create_spinner;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run(source: &str, tz: Option<&str>, json: bool) -> Result<()> {
    let tz = match tz {
        Some(name) => name
            .parse::<Tz>()
            .map_err(|_| anyhow::anyhow!("Unknown timezone '{}'", name))?,
        None => Tz::UTC,
    };

    let events = if is_url(source) {
        let spinner = create_spinner(format!("Fetching {}", source));
        let result = FeedFetcher::new(FETCH_TIMEOUT)?.fetch_events(source, tz).await;
        spinner.finish_and_clear();
        result?
    } else {
        let content = tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("Could not read {}", source))?;
        parse_feed_in(&content, tz)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    for event in &events {
        println!("   {}", event.render());
    }

    let counts = summarize(&events);
    println!(
        "\n{} events: {} reservations, {} blocked",
        counts.total,
        counts.reservations.green(),
        counts.blocked.dimmed()
    );
    Ok(())
}

fn is_url(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    ["http://", "https://", "webcal://"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}
