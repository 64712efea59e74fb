#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the heritage map application.
//!
//! Serves the site and itinerary REST API and the static map frontend.
//! Handlers only see the [`HeritageStore`] in [`AppState`], so the whole
//! application can be exercised against the in-memory store.

mod geojson;
mod handlers;
pub mod interactive;

use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpResponse, HttpServer, error, middleware, web};
use thiserror::Error;
use unesco_map_database::{DbError, HeritageStore, SqlStore, db};
use unesco_map_server_models::ApiError;

pub use handlers::{CurrentUser, REMOTE_USER_HEADER};

/// Shared application state.
pub struct AppState {
    /// Heritage catalog store.
    pub store: Arc<dyn HeritageStore>,
}

impl AppState {
    /// Wraps a store.
    #[must_use]
    pub fn new(store: Arc<dyn HeritageStore>) -> Self {
        Self { store }
    }
}

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The database could not be opened.
    #[error(transparent)]
    Database(#[from] DbError),
    /// Binding or serving failed.
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Registers the `/api` scope.
///
/// Shared by [`run_server`] and tests so both see the same routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json = web::JsonConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(ApiError::new(err.to_string()));
        error::InternalError::from_response(err, response).into()
    });

    cfg.service(
        web::scope("/api")
            .app_data(json)
            .route("/health", web::get().to(handlers::health))
            .route("/categories", web::get().to(handlers::categories))
            .route("/sites.geojson", web::get().to(handlers::sites_geojson))
            .route("/siti.geojson", web::get().to(handlers::sites_geojson))
            .route(
                r"/itinerario/{id:\d+}.geojson",
                web::get().to(handlers::itinerary_geojson),
            )
            .route("/itinerari", web::get().to(handlers::list_itineraries))
            .route(r"/itinerari/{id:\d+}", web::get().to(handlers::itinerary_detail))
            .route(
                r"/itinerari/{id:\d+}/toggle-prenota",
                web::post().to(handlers::toggle_follow),
            )
            .route(
                r"/itinerari/{id:\d+}/prenota",
                web::post().to(handlers::create_booking),
            ),
    );
}

/// Starts the heritage map API server.
///
/// Opens the database named by `HERITAGE_DB_PATH`, then serves the API and
/// the frontend in `app/dist` on `BIND_ADDR:PORT`. The caller provides the
/// async runtime (e.g. via `#[actix_web::main]`) and the logger.
///
/// # Errors
///
/// Returns [`ServerError`] if the database cannot be opened or the HTTP
/// server fails to bind or run.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> Result<(), ServerError> {
    log::info!("Connecting to database...");
    let db_conn = db::connect_from_env().await?;

    let state = web::Data::new(AppState::new(Arc::new(SqlStore::new(db_conn))));

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
            // Serve frontend static files (production)
            .service(Files::new("/", "app/dist").index_file("index.html"))
    })
    .bind((bind_addr, port))?
    .run()
    .await?;

    Ok(())
}
