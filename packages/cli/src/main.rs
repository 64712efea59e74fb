#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Interactive launcher for the heritage map toolchain.
//!
//! Lets users pick which tool to run (catalog import or the API server) and
//! hands over to that tool's own interactive prompts.

use dialoguer::Select;

/// Top-level tool selection.
enum Tool {
    Ingest,
    Server,
}

impl Tool {
    const ALL: &[Self] = &[Self::Ingest, Self::Server];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Ingest => "Import & maintain catalog data",
            Self::Server => "Start server",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    println!("Heritage Map Toolchain");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Tool::ALL[idx] {
        Tool::Ingest => unesco_map_ingest::interactive::run().await?,
        Tool::Server => {
            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(unesco_map_server::interactive::run())
            })
            .await??;
        }
    }

    Ok(())
}
