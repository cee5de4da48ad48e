use crate::core::tasks::BackgroundTasks;
use crate::core::{CacheService, CatalogSync, Clock, Environment, SystemClock};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const SYNC_CATALOG_KEY: &str = "automation-catalog-sync-ts";
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Request handlers whose traffic may kick off a catalog sync (prefix match).
pub const TARGET_HANDLERS: [&str; 5] = [
    "SolutionController",
    "ArchitecturesBomController",
    "ArchitecturesController",
    "AutomationCatalogController",
    "BomController",
];

pub fn is_sync_target(target: &str) -> bool {
    TARGET_HANDLERS.iter().any(|handler| target.starts_with(handler))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    /// Environment or request target not eligible.
    Skipped,
    NotDue,
    Triggered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Syncing,
}

/// Rate-limits background imports to one per interval across every process
/// sharing the cache. Without a cache the gate lives in this process only.
///
/// There is no timer: syncs are driven by request traffic, so with no
/// traffic they never run.
pub struct CatalogSyncScheduler {
    syncs: Vec<Arc<dyn CatalogSync>>,
    cache: Option<Arc<dyn CacheService>>,
    clock: Arc<dyn Clock>,
    environment: Environment,
    interval: Duration,
    tasks: Arc<BackgroundTasks>,
    gate: Mutex<Option<DateTime<Utc>>>,
}

impl CatalogSyncScheduler {
    pub fn new(syncs: Vec<Arc<dyn CatalogSync>>, environment: Environment) -> Self {
        Self {
            syncs,
            cache: None,
            clock: Arc::new(SystemClock),
            environment,
            interval: DEFAULT_SYNC_INTERVAL,
            tasks: Arc::new(BackgroundTasks::new()),
            gate: Mutex::new(None),
        }
    }

    pub fn with_cache(mut self, cache: Option<Arc<dyn CacheService>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn tasks(&self) -> &Arc<BackgroundTasks> {
        &self.tasks
    }

    pub fn state(&self) -> SchedulerState {
        if self.tasks.in_flight() > 0 {
            SchedulerState::Syncing
        } else {
            SchedulerState::Idle
        }
    }

    /// Called once per handled request. Never waits for the sync itself.
    pub async fn on_request(&self, target: &str) -> SyncDecision {
        if !self.environment.runs_background_sync() {
            return SyncDecision::Skipped;
        }
        if !is_sync_target(target) {
            return SyncDecision::Skipped;
        }

        // Held across read-decide-write so one process triggers at most once per window.
        let mut gate = self.gate.lock().await;
        let now = self.clock.now();
        let next_sync_at = match self.cache.as_deref() {
            Some(cache) => self.read_mark(cache).await.or(*gate),
            None => *gate,
        };

        if let Some(next_sync_at) = next_sync_at {
            if now < next_sync_at {
                return SyncDecision::NotDue;
            }
        }

        self.trigger();

        let interval =
            chrono::Duration::from_std(self.interval).unwrap_or_else(|_| chrono::Duration::zero());
        let next = now + interval;
        *gate = Some(next);
        if let Some(cache) = self.cache.as_deref() {
            let mark = next.timestamp_millis().to_string();
            if let Err(e) = cache.set(SYNC_CATALOG_KEY, &mark, None).await {
                tracing::warn!("Failed to store next sync time in cache: {}", e);
            }
        }
        tracing::info!("Next catalog sync not before {}", next);

        SyncDecision::Triggered
    }

    /// Starts every sync job detached, bypassing the rate gate.
    pub fn trigger(&self) {
        tracing::info!("🔄 Synchronizing public solutions and BOMs");
        for sync in &self.syncs {
            let sync = sync.clone();
            self.tasks.spawn(sync.name(), async move { sync.sync().await });
        }
    }

    async fn read_mark(&self, cache: &dyn CacheService) -> Option<DateTime<Utc>> {
        match cache.get(SYNC_CATALOG_KEY).await {
            Ok(Some(raw)) => match raw.trim().parse::<i64>() {
                Ok(millis) => DateTime::from_timestamp_millis(millis),
                Err(_) => {
                    tracing::warn!("Ignoring malformed sync timestamp '{}'", raw);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to read {} from cache: {}", SYNC_CATALOG_KEY, e);
                None
            }
        }
    }
}
