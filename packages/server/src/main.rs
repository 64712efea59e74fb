#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the heritage map application.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "unesco_map_server", about = "Heritage map API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server using `BIND_ADDR`, `PORT`, and `HERITAGE_DB_PATH`
    Serve,
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve) => unesco_map_server::run_server().await?,
        None => unesco_map_server::interactive::run().await?,
    }

    Ok(())
}
