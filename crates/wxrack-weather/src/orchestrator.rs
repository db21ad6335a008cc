//! Fetch cycle orchestration.
//!
//! `FetchOrchestrator` owns the in-memory snapshot map and the in-flight flag.
//! A cycle walks the configured sites one at a time, writes each site's
//! result into the map as soon as it is known, then persists the whole map.
//! Only one cycle runs at a time; a `run()` that arrives while another is in
//! flight returns `RunOutcome::Skipped` without touching anything.

use chrono::Utc;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::{Result, WeatherError};
use crate::normalize;
use crate::provider::WeatherProvider;
use crate::store::SnapshotStore;
use crate::types::{Site, SiteSnapshot, SnapshotMap};

/// Read access to the latest snapshot, for RPC layers and other consumers.
pub trait SnapshotSource: Send + Sync {
    fn current_snapshot(&self) -> SnapshotMap;
}

/// Result of a `run()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Another cycle was already in flight; nothing was done.
    Skipped,
    Completed {
        succeeded: usize,
        failed: usize,
        persisted: bool,
    },
}

/// Clears the in-flight flag when dropped, on every exit path.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct FetchOrchestrator {
    provider: WeatherProvider,
    store: SnapshotStore,
    sites: Vec<Site>,
    request_timeout: Duration,
    snapshot: RwLock<SnapshotMap>,
    fetching: AtomicBool,
}

impl FetchOrchestrator {
    pub fn new(
        provider: WeatherProvider,
        store: SnapshotStore,
        sites: Vec<Site>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            store,
            sites,
            request_timeout,
            snapshot: RwLock::new(SnapshotMap::new()),
            fetching: AtomicBool::new(false),
        }
    }

    /// Seed the in-memory map from the store.
    ///
    /// Returns `true` when a persisted snapshot was loaded. An unreachable
    /// store or a corrupt blob is logged and treated as a cold start.
    pub fn hydrate(&self) -> bool {
        match self.store.load() {
            Ok(Some(map)) => {
                tracing::info!("Loaded cached snapshot for {} sites", map.len());
                *self.snapshot.write() = map;
                true
            }
            Ok(None) => {
                tracing::info!("No cached snapshot, starting cold");
                false
            }
            Err(e) => {
                tracing::warn!("Ignoring cached snapshot: {}", e);
                false
            }
        }
    }

    /// Latest snapshot. Never blocks on I/O; during a cycle some sites may
    /// already hold this cycle's results while others still hold the last one.
    pub fn current(&self) -> SnapshotMap {
        self.snapshot.read().clone()
    }

    pub fn is_fetching(&self) -> bool {
        self.fetching.load(Ordering::Acquire)
    }

    /// Run one fetch cycle over every configured site.
    pub async fn run(&self) -> RunOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.fetching) else {
            tracing::debug!("Fetch cycle already in flight, skipping");
            return RunOutcome::Skipped;
        };

        tracing::info!("Starting fetch cycle for {} sites", self.sites.len());

        let mut succeeded = 0;
        let mut failed = 0;

        for site in &self.sites {
            let entry = match self.fetch_site(site).await {
                Ok(snapshot) => {
                    succeeded += 1;
                    snapshot
                }
                Err(e) => {
                    tracing::error!(site = %site.name, error = %e, "ERR_FETCH_WEATHER_DATA");
                    failed += 1;
                    SiteSnapshot::failed()
                }
            };
            self.snapshot.write().insert(site.name.clone(), entry);
        }

        let persisted = match self.store.persist(self.current()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "ERR_FETCH_OPENWEATHER_DATA");
                false
            }
        };

        tracing::info!(
            "Fetch cycle finished: {} ok, {} failed, persisted={}",
            succeeded,
            failed,
            persisted
        );

        RunOutcome::Completed {
            succeeded,
            failed,
            persisted,
        }
    }

    /// Reverse geocode a coordinate through the provider.
    pub async fn resolve_city_name(&self, lat: f64, lon: f64) -> Option<String> {
        match self.provider.fetch_city_name(lat, lon).await {
            Ok(Some(name)) => Some(name),
            Ok(None) => {
                tracing::error!("No city found for the given coordinates.");
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "ERR_FETCH_CITY_COORDINATES");
                None
            }
        }
    }

    async fn fetch_site(&self, site: &Site) -> Result<SiteSnapshot> {
        let raw = tokio::time::timeout(
            self.request_timeout,
            self.provider.fetch_current_and_forecast(site.lat, site.lon),
        )
        .await
        .map_err(|_| {
            WeatherError::ProviderUnavailable(format!(
                "request timed out after {:?}",
                self.request_timeout
            ))
        })??;

        Ok(normalize::to_report(&raw, Utc::now())?.into())
    }
}

impl SnapshotSource for FetchOrchestrator {
    fn current_snapshot(&self) -> SnapshotMap {
        self.current()
    }
}
