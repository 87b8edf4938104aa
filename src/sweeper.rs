//! Background retention sweeper
//!
//! Periodically deletes stored files older than the retention age and,
//! when configured, drops stale job entries from the registry.

use crate::config::Config;
use crate::registry::JobRegistry;
use crate::storage::StorageArea;
use crate::types::Event;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Shortest sweep interval taken from configuration
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Sweeper timing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SweeperSettings {
    /// Time between sweeps (first sweep runs immediately)
    pub interval: Duration,
    /// Files strictly older than this are deleted
    pub retention: Duration,
    /// Registry entries idle longer than this are pruned, if set
    pub registry_ttl: Option<Duration>,
}

impl SweeperSettings {
    /// Settings taken from the storage and registry sections of `config`
    ///
    /// The interval is raised to [`MIN_SWEEP_INTERVAL`] if configured lower.
    pub fn from_config(config: &Config) -> Self {
        let configured = config.storage.sweep_interval;
        if configured < MIN_SWEEP_INTERVAL {
            tracing::warn!(
                configured_ms = configured.as_millis() as u64,
                "sweep interval below minimum, using 1s"
            );
        }
        Self {
            interval: configured.max(MIN_SWEEP_INTERVAL),
            retention: config.storage.retention,
            registry_ttl: config.registry.entry_ttl,
        }
    }
}

/// Spawn the sweeper loop; it stops when `cancel_token` is cancelled
///
/// A failing sweep is logged and the next tick runs as usual.
pub fn spawn_retention_sweeper(
    storage: StorageArea,
    registry: JobRegistry,
    settings: SweeperSettings,
    event_tx: broadcast::Sender<Event>,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        // tokio's interval panics on a zero period
        let period = settings.interval.max(Duration::from_millis(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = period.as_secs(),
            retention_secs = settings.retention.as_secs(),
            "retention sweeper started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    run_once(&storage, &registry, &settings, &event_tx).await;
                }
                _ = cancel_token.cancelled() => {
                    tracing::info!("retention sweeper shutting down");
                    break;
                }
            }
        }
    })
}

async fn run_once(
    storage: &StorageArea,
    registry: &JobRegistry,
    settings: &SweeperSettings,
    event_tx: &broadcast::Sender<Event>,
) {
    match storage.sweep(settings.retention).await {
        Ok(report) => {
            tracing::debug!(
                removed = report.removed,
                retained = report.retained,
                errors = report.errors,
                "retention sweep finished"
            );
            if report.removed > 0 {
                event_tx
                    .send(Event::Swept {
                        removed: report.removed,
                    })
                    .ok();
            }
        }
        Err(e) => {
            tracing::error!(dir = %storage.dir().display(), error = %e, "retention sweep failed");
        }
    }

    if let Some(ttl) = settings.registry_ttl {
        registry.prune(ttl);
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JobId;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn write_aged(dir: &std::path::Path, name: &str, age: Duration) {
        let path = dir.join(name);
        std::fs::write(&path, b"data").unwrap();
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    fn settings(retention: Duration) -> SweeperSettings {
        SweeperSettings {
            interval: Duration::from_secs(3600),
            retention,
            registry_ttl: None,
        }
    }

    #[tokio::test]
    async fn first_tick_sweeps_immediately() {
        let temp = TempDir::new().unwrap();
        let storage = StorageArea::new(temp.path()).unwrap();
        write_aged(temp.path(), "old.mp4", Duration::from_secs(7200));
        write_aged(temp.path(), "new.mp4", Duration::from_secs(10));

        let (tx, mut rx) = broadcast::channel(8);
        let cancel = CancellationToken::new();
        let handle = spawn_retention_sweeper(
            storage,
            JobRegistry::new(),
            settings(Duration::from_secs(3600)),
            tx,
            cancel.clone(),
        );

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("sweep event")
            .unwrap();
        assert_eq!(event, Event::Swept { removed: 1 });
        assert!(!temp.path().join("old.mp4").exists());
        assert!(temp.path().join("new.mp4").exists());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sweeper stops on cancel")
            .unwrap();
    }

    #[tokio::test]
    async fn missing_directory_does_not_stop_the_loop() {
        let temp = TempDir::new().unwrap();
        let storage = StorageArea::new(temp.path().join("dl")).unwrap();
        std::fs::remove_dir_all(temp.path().join("dl")).unwrap();

        let (tx, _rx) = broadcast::channel(8);
        let cancel = CancellationToken::new();
        let handle = spawn_retention_sweeper(
            storage,
            JobRegistry::new(),
            SweeperSettings {
                interval: Duration::from_millis(20),
                ..settings(Duration::from_secs(1))
            },
            tx,
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!handle.is_finished());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn prunes_registry_when_ttl_set() {
        let temp = TempDir::new().unwrap();
        let storage = StorageArea::new(temp.path()).unwrap();
        let registry = JobRegistry::new();
        let id = JobId::new();
        registry.create(id);

        tokio::time::sleep(Duration::from_millis(30)).await;

        let (tx, _rx) = broadcast::channel(8);
        let cancel = CancellationToken::new();
        let handle = spawn_retention_sweeper(
            storage,
            registry.clone(),
            SweeperSettings {
                registry_ttl: Some(Duration::from_millis(10)),
                ..settings(Duration::from_secs(3600))
            },
            tx,
            cancel.clone(),
        );

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while registry.contains(id) && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!registry.contains(id));

        cancel.cancel();
        handle.await.unwrap();
    }

    #[test]
    fn settings_follow_config() {
        let mut config = Config::default();
        config.registry.entry_ttl = Some(Duration::from_secs(60));
        let settings = SweeperSettings::from_config(&config);
        assert_eq!(settings.interval, Duration::from_secs(3600));
        assert_eq!(settings.retention, Duration::from_secs(3600));
        assert_eq!(settings.registry_ttl, Some(Duration::from_secs(60)));
    }

    #[test]
    fn zero_interval_from_config_is_raised_to_minimum() {
        let config: Config =
            serde_json::from_value(serde_json::json!({"storage": {"sweep_interval": 0}})).unwrap();
        assert_eq!(config.storage.sweep_interval, Duration::ZERO);
        assert_eq!(
            SweeperSettings::from_config(&config).interval,
            MIN_SWEEP_INTERVAL
        );
    }

    #[tokio::test]
    async fn zero_interval_settings_keep_the_loop_alive() {
        let temp = TempDir::new().unwrap();
        let storage = StorageArea::new(temp.path()).unwrap();
        write_aged(temp.path(), "old.mp3", Duration::from_secs(7200));

        let (tx, mut rx) = broadcast::channel(8);
        let cancel = CancellationToken::new();
        let handle = spawn_retention_sweeper(
            storage,
            JobRegistry::new(),
            SweeperSettings {
                interval: Duration::ZERO,
                ..settings(Duration::from_secs(3600))
            },
            tx,
            cancel.clone(),
        );

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("sweep event")
            .unwrap();
        assert_eq!(event, Event::Swept { removed: 1 });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        cancel.cancel();
        handle.await.unwrap();
    }
}
