use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use wxrack_weather::{
    spawn_fetch_schedule, FetchOrchestrator, RunOutcome, SnapshotSource, SnapshotStore,
    WeatherProvider,
};

use crate::{AppError, Config};

/// Application state and lifecycle manager.
///
/// Owns the orchestrator and the schedule driving it. Consumers that only
/// need to read the cache take `snapshot_source()`.
pub struct App {
    config: Arc<Config>,
    orchestrator: Arc<FetchOrchestrator>,
    shutdown: CancellationToken,
    schedule: Option<JoinHandle<()>>,
}

impl App {
    /// Wire provider, store and orchestrator, then hydrate from the store.
    pub fn new(config: Config) -> Result<Self, AppError> {
        let store_path = config.store.effective_path();
        if let Some(parent) = store_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let store = SnapshotStore::open(&store_path)?;
        let provider = WeatherProvider::new(
            &config.provider.base_url,
            &config.provider.api_key,
            config.provider.request_timeout(),
        )?;

        let orchestrator = Arc::new(FetchOrchestrator::new(
            provider,
            store,
            config.sites.clone(),
            config.provider.request_timeout(),
        ));
        orchestrator.hydrate();

        tracing::info!(
            "App ready: {} sites, store at {}",
            config.sites.len(),
            store_path.display()
        );

        Ok(Self {
            config: Arc::new(config),
            orchestrator,
            shutdown: CancellationToken::new(),
            schedule: None,
        })
    }

    /// Start periodic fetching (first cycle runs immediately).
    pub fn start(&mut self) {
        if self.schedule.is_some() {
            tracing::debug!("Fetch schedule already running");
            return;
        }

        self.schedule = Some(spawn_fetch_schedule(
            self.orchestrator.clone(),
            self.config.fetch.interval(),
            self.shutdown.clone(),
        ));
    }

    /// Run a single fetch cycle in the caller's task.
    pub async fn run_once(&self) -> RunOutcome {
        self.orchestrator.run().await
    }

    /// Stop the schedule and wait for it to exit.
    pub async fn shutdown(&mut self) {
        tracing::info!("Shutting down application");
        self.shutdown.cancel();

        if let Some(handle) = self.schedule.take() {
            if let Err(e) = handle.await {
                tracing::error!("Fetch schedule task failed: {}", e);
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn orchestrator(&self) -> Arc<FetchOrchestrator> {
        self.orchestrator.clone()
    }

    /// Read-only view of the snapshot cache.
    pub fn snapshot_source(&self) -> Arc<dyn SnapshotSource> {
        self.orchestrator.clone()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use wxrack_weather::Site;

    fn test_config(base_url: &str, dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.provider.base_url = base_url.to_string();
        config.provider.api_key = "key".to_string();
        config.provider.request_timeout_secs = 5;
        config.store.path = Some(dir.join("store").join("openweather.db"));
        config.sites = vec![Site::new("home", 10.0, 20.0)];
        config
    }

    #[tokio::test]
    async fn test_run_once_and_reload() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "timezone": "UTC",
                "timezone_offset": 0,
                "current": {
                    "temp": 12.0, "clouds": 40, "humidity": 70,
                    "wind_speed": 2.0, "wind_deg": 300
                }
            })))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&mock_server.uri(), dir.path());

        let app = App::new(config.clone()).unwrap();
        assert!(app.snapshot_source().current_snapshot().is_empty());
        assert!(matches!(app.run_once().await, RunOutcome::Completed { succeeded: 1, .. }));

        let reopened = App::new(config).unwrap();
        let snapshot = reopened.snapshot_source().current_snapshot();
        assert_eq!(snapshot["home"].report().unwrap().overview.temperature, 12.0);
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config("http://127.0.0.1:1", dir.path());
        config.sites.clear();
        config.fetch.interval_ms = Some(20);

        let mut app = App::new(config).unwrap();
        app.start();
        app.start();
        tokio::time::sleep(Duration::from_millis(60)).await;
        app.shutdown().await;

        assert!(!app.orchestrator().is_fetching());
        assert_eq!(app.config().fetch.interval(), Duration::from_millis(20));
    }

    #[test]
    fn test_unopenable_store() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let mut config = test_config("http://localhost", dir.path());
        config.store.path = Some(blocker.join("openweather.db"));

        assert!(App::new(config).is_err());
    }
}
