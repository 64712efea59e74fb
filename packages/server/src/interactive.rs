//! Interactive mode for the server.
//!
//! Prompts for the bind address, port, and database file before starting
//! the server.

use dialoguer::{Confirm, Input};

use crate::ServerError;

/// Runs the server in interactive mode, prompting for configuration.
///
/// Asks for a bind address, port, and database file, sets the corresponding
/// environment variables (`BIND_ADDR`, `PORT`, `HERITAGE_DB_PATH`), and
/// delegates to [`super::run_server`].
///
/// # Errors
///
/// Returns [`ServerError`] if the underlying server fails to start.
#[allow(clippy::future_not_send)]
pub async fn run() -> Result<(), ServerError> {
    println!("Heritage Map Server");
    println!();

    let bind_addr: String = Input::new()
        .with_prompt("Bind address")
        .default("127.0.0.1".to_string())
        .interact_text()
        .unwrap_or_else(|_| "127.0.0.1".to_string());

    let port_str: String = Input::new()
        .with_prompt("Port")
        .default("8080".to_string())
        .validate_with(|input: &String| -> Result<(), &str> {
            input
                .trim()
                .parse::<u16>()
                .map(|_| ())
                .map_err(|_| "Enter a port between 0 and 65535")
        })
        .interact_text()
        .unwrap_or_else(|_| "8080".to_string());

    let db_path: String = Input::new()
        .with_prompt("Database file")
        .default(unesco_map_database::paths::db_path().display().to_string())
        .interact_text()
        .unwrap_or_else(|_| unesco_map_database::paths::DEFAULT_DB_PATH.to_string());

    // SAFETY: no other thread reads the environment before the server starts,
    // and these are read once during startup.
    unsafe {
        std::env::set_var("BIND_ADDR", &bind_addr);
        std::env::set_var("PORT", port_str.trim());
        std::env::set_var(unesco_map_database::paths::DB_PATH_ENV, &db_path);
    }

    if !Confirm::new()
        .with_prompt(format!("Start server on {bind_addr}:{port_str}?"))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_server().await
}
