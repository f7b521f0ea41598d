use anyhow::{Context, Result};
use refugio_core::SiteConfig;
use refugio_core::feed::generate_feed;
use refugio_core::store::ReservationFilter;

use super::record_store;

pub async fn run(config: SiteConfig, unit_id: &str, output: Option<&str>) -> Result<()> {
    let unit = config.unit(unit_id)?;
    let records = record_store(&config)?
        .list(&ReservationFilter::active(&unit.id))
        .await?;

    let ics = generate_feed(&records, &unit.name, &config.domain);

    match output {
        Some(path) => {
            tokio::fs::write(path, &ics)
                .await
                .with_context(|| format!("Could not write {}", path))?;
            eprintln!("Wrote {} reservations to {}", records.len(), path);
        }
        None => print!("{}", ics),
    }

    Ok(())
}
