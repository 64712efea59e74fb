#![allow(clippy::module_name_repetitions)]

//! Interactive menu for the ingest tool.
//!
//! Lets an operator pick a command and its input file with `dialoguer`
//! prompts instead of remembering subcommands.

use std::path::PathBuf;
use std::time::Instant;

use dialoguer::{Confirm, Input, Select};

use crate::access::MatchOn;
use crate::rows::CsvRows;
use crate::{Command, run_atomic};

/// Top-level actions available in the ingest interactive menu.
enum IngestAction {
    ImportSites,
    ImportAccess,
    UpdateCoords,
    NormalizeCategories,
    SeedItineraries,
}

impl IngestAction {
    const ALL: &[Self] = &[
        Self::ImportSites,
        Self::ImportAccess,
        Self::UpdateCoords,
        Self::NormalizeCategories,
        Self::SeedItineraries,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::ImportSites => "Import sites from CSV",
            Self::ImportAccess => "Import accessibility flags from CSV",
            Self::UpdateCoords => "Update coordinates and locations from CSV",
            Self::NormalizeCategories => "Normalize categories",
            Self::SeedItineraries => "Seed demo itineraries",
        }
    }
}

/// Runs the interactive menu, prompting for one command and its input.
///
/// # Errors
///
/// Returns an error if a prompt fails, the database cannot be opened, the
/// CSV cannot be read, or the command fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let labels: Vec<&str> = IngestAction::ALL.iter().map(IngestAction::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    let command = match IngestAction::ALL[idx] {
        IngestAction::ImportSites => Command::ImportSites(prompt_csv()?),
        IngestAction::ImportAccess => {
            let rows = prompt_csv()?;
            Command::ImportAccess(rows, prompt_match_on()?)
        }
        IngestAction::UpdateCoords => Command::UpdateCoords(prompt_csv()?),
        IngestAction::NormalizeCategories => Command::NormalizeCategories,
        IngestAction::SeedItineraries => {
            let proceed = Confirm::new()
                .with_prompt("Existing stops of the demo itineraries will be replaced. Continue?")
                .default(true)
                .interact()?;
            if !proceed {
                return Ok(());
            }
            Command::SeedItineraries
        }
    };

    let db = unesco_map_database::db::connect_from_env().await?;

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

fn prompt_csv() -> Result<CsvRows, Box<dyn std::error::Error>> {
    let path: String = Input::new().with_prompt("CSV file").interact_text()?;
    let path = PathBuf::from(path.trim());
    Ok(CsvRows::from_path(&path)?)
}

fn prompt_match_on() -> Result<MatchOn, Box<dyn std::error::Error>> {
    let options = [MatchOn::UnescoId, MatchOn::Nome];
    let labels: Vec<&str> = options.iter().map(|m| m.column()).collect();
    let idx = Select::new()
        .with_prompt("Match sites on")
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(options[idx])
}
