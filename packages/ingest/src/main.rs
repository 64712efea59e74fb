#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the heritage catalog import tool.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use unesco_map_database::db;
use unesco_map_ingest::access::MatchOn;
use unesco_map_ingest::rows::CsvRows;
use unesco_map_ingest::{Command, run_atomic};

#[derive(Parser)]
#[command(name = "unesco_map_ingest", about = "Heritage catalog import tool")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update sites from an interchange CSV
    ImportSites {
        /// Path to the CSV file
        csv: PathBuf,
    },
    /// Attach accessibility flags to existing sites
    ImportAccess {
        /// Path to the CSV file
        csv: PathBuf,
        /// Column used to find each site
        #[arg(long, value_enum, default_value_t = MatchOn::UnescoId)]
        match_on: MatchOn,
    },
    /// Patch coordinates, city, and region by `unesco_id`
    UpdateCoords {
        /// Path to the CSV file
        csv: PathBuf,
    },
    /// Merge category spellings into "Culturale" and "Naturale"
    NormalizeCategories,
    /// Create or rebuild the demo itineraries
    SeedItineraries,
}

impl Commands {
    fn into_command(self) -> Result<Command, Box<dyn std::error::Error>> {
        Ok(match self {
            Self::ImportSites { csv } => Command::ImportSites(CsvRows::from_path(&csv)?),
            Self::ImportAccess { csv, match_on } => {
                Command::ImportAccess(CsvRows::from_path(&csv)?, match_on)
            }
            Self::UpdateCoords { csv } => Command::UpdateCoords(CsvRows::from_path(&csv)?),
            Self::NormalizeCategories => Command::NormalizeCategories,
            Self::SeedItineraries => Command::SeedItineraries,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return unesco_map_ingest::interactive::run().await;
    };

    let command = command.into_command()?;
    let db = db::connect_from_env().await?;

    let start = Instant::now();
    let report = run_atomic(db.as_ref(), &command).await?;
    log::info!(
        "{} finished in {:.1}s",
        command.name(),
        start.elapsed().as_secs_f64()
    );
    println!("{report}");

    Ok(())
}
