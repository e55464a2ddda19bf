use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, interval};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::SchedulerConfig;
use crate::services::Reconciler;

/// Runs reconciliation periodically, either on a fixed interval or on a cron
/// expression when one is configured.
#[derive(Clone)]
pub struct Scheduler {
    reconciler: Arc<Reconciler>,
    config: SchedulerConfig,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(reconciler: Arc<Reconciler>, config: SchedulerConfig) -> Self {
        Self {
            reconciler,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting background scheduler");

        if let Some(cron_expr) = &self.config.cron_expression {
            self.run_with_cron(cron_expr).await
        } else {
            self.run_with_interval().await
        }
    }

    async fn run_with_cron(&self, cron_expr: &str) -> Result<()> {
        let mut sched = JobScheduler::new().await?;

        let reconciler = Arc::clone(&self.reconciler);
        let running = Arc::clone(&self.running);
        let dry_run = self.config.dry_run;

        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let reconciler = Arc::clone(&reconciler);
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                reconcile_job(&reconciler, dry_run).await;
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Scheduler running with cron: {}", cron_expr);

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    async fn run_with_interval(&self) -> Result<()> {
        let interval_mins = self.config.reconcile_interval_minutes.max(1);
        info!("Scheduler running: reconcile every {}m", interval_mins);

        let mut reconcile_interval = interval(Duration::from_secs(u64::from(interval_mins) * 60));

        loop {
            reconcile_interval.tick().await;
            if !*self.running.read().await {
                break;
            }
            reconcile_job(&self.reconciler, self.config.dry_run).await;
        }

        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    pub async fn run_once(&self) -> Result<()> {
        info!("Running manual reconciliation...");
        self.reconciler.run(self.config.dry_run).await?;
        Ok(())
    }
}

async fn reconcile_job(reconciler: &Reconciler, dry_run: bool) {
    let start = std::time::Instant::now();
    info!(event = "job_started", job_name = "reconcile", "Starting scheduled reconciliation");

    match reconciler.run(dry_run).await {
        Ok(report) => info!(
            event = "job_finished",
            job_name = "reconcile",
            removable = report.removable(),
            deleted = report.deleted,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Scheduled reconciliation finished"
        ),
        Err(e) => {
            error!(
                event = "job_failed",
                job_name = "reconcile",
                error = %e,
                "Scheduled reconciliation failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, Fields, InMemoryStore, StoreLayout};
    use serde_json::json;

    fn layout() -> StoreLayout {
        StoreLayout {
            database_id: "db".to_string(),
            users: "users".to_string(),
            media: "media".to_string(),
            media_source: "media_source".to_string(),
            collections: "collections".to_string(),
        }
    }

    async fn store_with_orphan() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        let data: Fields =
            serde_json::from_value(json!({"media_id": "missing", "source_id": "1"})).unwrap();
        store
            .create_document("db", "media_source", "orphan", data)
            .await
            .unwrap();
        store
    }

    fn scheduler(store: Arc<InMemoryStore>, config: SchedulerConfig) -> Scheduler {
        let reconciler = Arc::new(Reconciler::new(store, layout(), 100));
        Scheduler::new(reconciler, config)
    }

    #[tokio::test]
    async fn run_once_reconciles() {
        let store = store_with_orphan().await;
        let scheduler = scheduler(Arc::clone(&store), SchedulerConfig::default());

        scheduler.run_once().await.unwrap();
        assert!(store.documents("db", "media_source").await.is_empty());
    }

    #[tokio::test]
    async fn disabled_scheduler_returns_immediately() {
        let store = store_with_orphan().await;
        let config = SchedulerConfig {
            enabled: false,
            ..SchedulerConfig::default()
        };
        let scheduler = scheduler(Arc::clone(&store), config);

        scheduler.start().await.unwrap();
        assert!(!scheduler.is_running().await);
        assert_eq!(store.documents("db", "media_source").await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_runs_until_stopped() {
        let store = store_with_orphan().await;
        let scheduler = scheduler(Arc::clone(&store), SchedulerConfig::default());

        let background = scheduler.clone();
        let handle = tokio::spawn(async move { background.start().await });

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(scheduler.is_running().await);
        assert!(store.documents("db", "media_source").await.is_empty());

        scheduler.stop().await;
        tokio::time::timeout(Duration::from_secs(3600), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
