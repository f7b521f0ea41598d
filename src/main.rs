mod commands;
mod render;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use refugio_core::SiteConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "refugio")]
#[command(about = "Sync rental units with their calendar feeds, inspect feeds and check availability")]
struct Cli {
    /// Config file (defaults to $REFUGIO_CONFIG or ~/.config/refugio/config.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile stored external reservations with each unit's feed
    Sync {
        /// Only operate on this unit (by id)
        #[arg(short, long)]
        unit: Option<String>,

        /// Show the changes without writing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Parse a feed (URL or file) and show what it contains
    Parse {
        /// http(s):// or webcal:// URL, or a path to an .ics file
        source: String,

        /// Zone timed events are floored in (e.g. "America/Santiago")
        #[arg(long)]
        tz: Option<String>,

        /// Print the parsed events as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check whether a stay fits and what it costs
    Check {
        unit: String,

        /// Check-in date (YYYY-MM-DD)
        check_in: String,

        /// Check-out date (YYYY-MM-DD)
        check_out: String,

        #[arg(long, default_value_t = 1)]
        adults: u32,

        #[arg(long, default_value_t = 0)]
        children: u32,

        #[arg(long, default_value_t = 0)]
        pets: u32,
    },
    /// Write a unit's outbound iCalendar feed
    Export {
        unit: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sync { unit, dry_run } => {
            let config = load_config(cli.config.as_deref())?;
            commands::sync::run(config, unit.as_deref(), dry_run).await
        }
        Commands::Parse { source, tz, json } => commands::parse::run(&source, tz.as_deref(), json).await,
        Commands::Check {
            unit,
            check_in,
            check_out,
            adults,
            children,
            pets,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let party = refugio_core::reservation::PartyComposition {
                adults,
                children,
                pets,
            };
            commands::check::run(config, &unit, &check_in, &check_out, party).await
        }
        Commands::Export { unit, output } => {
            let config = load_config(cli.config.as_deref())?;
            commands::export::run(config, &unit, output.as_deref()).await
        }
    }
}

fn load_config(path: Option<&str>) -> Result<SiteConfig> {
    let config = SiteConfig::load(path).context("Could not load refugio config")?;

    if config.units.is_empty() {
        anyhow::bail!(
            "No rental units configured.\n\n\
            Add one to your config.toml:\n  \
            [[units]]\n  \
            id = \"refugio-intimo\"\n  \
            name = \"Refugio Íntimo\"\n  \
            capacity = 2"
        );
    }

    Ok(config)
}
