use std::sync::Arc;

use anyhow::Result;
use owo_colors::OwoColorize;
use refugio_core::availability::AvailabilityService;
use refugio_core::pricing::quote;
use refugio_core::reservation::PartyComposition;
use refugio_core::{DateInterval, SiteConfig};

use super::{feed_fetcher, record_store};
use crate::render::Render;

pub async fn run(
    config: SiteConfig,
    unit_id: &str,
    check_in: &str,
    check_out: &str,
    party: PartyComposition,
) -> Result<()> {
    let interval = DateInterval::parse(check_in, check_out)?;
    let config = Arc::new(config);
    let unit = config.unit(unit_id)?.clone();

    let service = AvailabilityService::new(config.clone(), record_store(&config)?, feed_fetcher(&config)?);
    let check = service.check(unit_id, &interval).await?;

    println!("{} {}", unit.render(), interval);

    if party.guests() > unit.capacity {
        println!(
            "   {}",
            format!("{} sleeps at most {} guests", unit.name, unit.capacity).yellow()
        );
    }
    if let Some(window) = unit.maintenance.iter().find(|m| m.overlaps(&interval)) {
        println!("   {} {}", "Closed for maintenance".yellow(), window);
    }

    if check.is_available {
        let quote = quote(&unit, &interval, &party);
        println!("   {}", "Available".green());
        println!(
            "   {} nights × {} + cleaning {} + pets {} = {}",
            quote.nights,
            quote.nightly_rate,
            quote.cleaning_fee,
            quote.pet_fee,
            quote.total.bold()
        );
    } else {
        println!("   {}", "Unavailable".red());
        for record in &check.conflicts {
            println!("   {} {}", "-".red(), record.render());
        }
    }

    Ok(())
}
