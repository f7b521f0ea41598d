use std::sync::Arc;

use anyhow::Result;
use owo_colors::OwoColorize;
use refugio_core::sync::{Reconciler, SyncSummary};
use refugio_core::{RentalUnit, SiteConfig};

use super::{feed_fetcher, record_store};
use crate::render::Render;
use crate::utils::tui::create_spinner;

pub async fn run(config: SiteConfig, unit: Option<&str>, dry_run: bool) -> Result<()> {
    let config = Arc::new(config);
    let units = resolve_units(&config, unit)?;
    let reconciler = Reconciler::new(config.clone(), record_store(&config)?, feed_fetcher(&config)?);

    let mut results = Vec::new();

    for (i, unit) in units.iter().enumerate() {
        let spinner = create_spinner(unit.render());

        if dry_run {
            let plan = reconciler.plan_unit(unit).await;
            spinner.finish_and_clear();
            println!("{}", unit.render());
            match plan {
                Ok(diff) => println!("{}", diff.render()),
                Err(e) => println!("   {}", e.to_string().red()),
            }
        } else {
            let result = reconciler.sync_unit(unit).await;
            spinner.finish_and_clear();
            println!("{}", unit.render());
            println!("{}", result.render());
            results.push(result);
        }

        // Add spacing between units (but not after the last one)
        if i < units.len() - 1 {
            println!();
        }
    }

    if dry_run {
        return Ok(());
    }

    let summary = SyncSummary::from_results(results);
    if summary.total_created + summary.total_updated + summary.total_cancelled > 0 {
        println!(
            "\nSynced {} created, {} updated, {} cancelled",
            summary.total_created, summary.total_updated, summary.total_cancelled
        );
    }
    if summary.units_failed > 0 || summary.total_errors > 0 {
        anyhow::bail!(
            "{} unit(s) failed, {} change(s) rejected by the store",
            summary.units_failed,
            summary.total_errors
        );
    }

    Ok(())
}

fn resolve_units<'a>(config: &'a SiteConfig, filter: Option<&str>) -> Result<Vec<&'a RentalUnit>> {
    match filter {
        Some(id) => {
            let unit = config.unit(id)?;
            if !unit.has_feed() {
                anyhow::bail!("Unit '{}' has no feed_url", id);
            }
            Ok(vec![unit])
        }
        None => {
            let units: Vec<_> = config.feed_units().collect();
            if units.is_empty() {
                let available: Vec<_> = config.units.iter().map(|u| u.id.as_str()).collect();
                anyhow::bail!(
                    "None of the configured units has a feed_url. Units: {}",
                    available.join(", ")
                );
            }
            Ok(units)
        }
    }
}
