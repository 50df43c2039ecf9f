pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod utils;

use std::time::Duration;

use sea_orm::DatabaseConnection;

pub use config::Config;
pub use error::{AppError, AppResult};

use services::locks::TripLocks;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    pub trip_locks: TripLocks,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let trip_locks = TripLocks::new(Duration::from_millis(config.lock_timeout_ms));
        Self {
            db,
            config,
            trip_locks,
        }
    }
}
