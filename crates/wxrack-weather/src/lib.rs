//! Site weather fetching for wxrack
//!
//! Periodically pulls current conditions and forecasts for configured sites
//! from OpenWeather, normalizes them into a compact shape and keeps the
//! result in a write-through cache (memory plus SQLite).

pub mod error;
pub mod normalize;
pub mod orchestrator;
pub mod provider;
pub mod scheduler;
pub mod store;
pub mod types;

pub use error::WeatherError;
pub use orchestrator::{FetchOrchestrator, RunOutcome, SnapshotSource};
pub use provider::WeatherProvider;
pub use scheduler::{spawn_fetch_schedule, DEFAULT_FETCH_INTERVAL};
pub use store::{KeyValueStore, SnapshotStore, SqliteKvStore};
pub use types::*;
