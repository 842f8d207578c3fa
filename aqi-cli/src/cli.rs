use anyhow::Context;
use aqi_core::{
    Config, DashboardSession, RegionId, StationFetcher, source::source_from_config,
};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select};

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "aqi", version, about = "Air-quality station tracker")]
pub struct Cli {
    /// Log request-level detail to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API token and default region.
    Configure,

    /// Sweep a region once and print its stations.
    Show {
        /// Region id, e.g. "nepal" or "kathmandu-valley".
        #[arg(long)]
        region: Option<String>,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show the feed for a single city.
    City {
        name: String,

        #[arg(long)]
        json: bool,
    },

    /// Keep refreshing a region until interrupted.
    Watch {
        #[arg(long)]
        region: Option<String>,

        /// Seconds between refreshes; defaults to the configured interval.
        #[arg(long)]
        interval: Option<u64>,
    },

    /// List the built-in regions.
    Regions,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { region, json } => {
                let config = Config::load()?;
                let region = resolve_region(&config, region.as_deref())?.region();
                let fetcher =
                    StationFetcher::new(source_from_config(&config)?, config.fetch_options());

                let stations = fetcher
                    .fetch_region(&region)
                    .await
                    .with_context(|| format!("Failed to fetch stations for {}", region.name))?;

                if json {
                    output::print_json(&stations)
                } else {
                    output::print_table(&region.name, &stations);
                    Ok(())
                }
            }
            Command::City { name, json } => {
                let config = Config::load()?;
                let fetcher =
                    StationFetcher::new(source_from_config(&config)?, config.fetch_options());

                let stations = fetcher
                    .fetch_city(&name)
                    .await
                    .with_context(|| format!("Failed to fetch city feed for '{name}'"))?;

                if json {
                    output::print_json(&stations)
                } else {
                    output::print_table(&name, &stations);
                    Ok(())
                }
            }
            Command::Watch { region, interval } => {
                let config = Config::load()?;
                let region = resolve_region(&config, region.as_deref())?.region();
                let period = interval
                    .map(std::time::Duration::from_secs)
                    .unwrap_or_else(|| config.refresh_interval());
                let fetcher =
                    StationFetcher::new(source_from_config(&config)?, config.fetch_options());

                watch(DashboardSession::new(fetcher, region, period)).await
            }
            Command::Regions => {
                for id in RegionId::all() {
                    let region = id.region();
                    println!(
                        "{:<18} {} centred {:.4}, {:.4} ({} sub-regions, {} population centres)",
                        id.as_str(),
                        region.name,
                        region.center.lat,
                        region.center.lng,
                        region.bounds.len(),
                        region.points.len()
                    );
                }
                Ok(())
            }
        }
    }
}

fn resolve_region(config: &Config, flag: Option<&str>) -> anyhow::Result<RegionId> {
    match flag {
        Some(s) => RegionId::try_from(s),
        None => config.default_region_id(),
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let token = Password::new("WAQI API token:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Token prompt aborted")?;
    config.set_token(token.trim().to_string());

    let region = Select::new("Default region:", RegionId::all().to_vec())
        .prompt()
        .context("Region prompt aborted")?;
    config.set_default_region(region);

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn watch<S>(session: DashboardSession<S>) -> anyhow::Result<()>
where
    S: aqi_core::AqiSource + 'static,
{
    let mut snapshots = session.subscribe();
    session.start();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if let Some(snapshot) = snapshot {
                    output::print_snapshot(&session.region().name, &snapshot);
                }
            }
        }
    }

    session.shutdown();
    Ok(())
}
