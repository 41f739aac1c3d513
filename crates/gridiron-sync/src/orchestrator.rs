use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use gridiron_adapters::{ScrapeContext, StatHandler, StatRegistry};
use gridiron_core::{validate_season, GridironError, ScrapeJob, StatResult};
use gridiron_storage::{JobStore, Session};
use tracing::{info, info_span, warn, Instrument};

use crate::bridge::BlockingBridge;
use crate::config::ScrapeConfig;

/// Error text of a batch item whose identifier has no handler.
pub const UNKNOWN_STAT: &str = "unknown stat type";

/// Drives batch and single-stat scrapes: dispatch, fetch and parse on the
/// bridge, persist through the caller's session.
#[derive(Clone)]
pub struct BatchOrchestrator {
    registry: Arc<StatRegistry>,
    bridge: BlockingBridge,
    context: ScrapeContext,
    item_delay: Duration,
}

impl BatchOrchestrator {
    pub fn new(registry: Arc<StatRegistry>, bridge: BlockingBridge, context: ScrapeContext) -> Self {
        Self {
            registry,
            bridge,
            context,
            item_delay: Duration::ZERO,
        }
    }

    /// Baseline registry, configured backend and pool size.
    pub fn from_config(config: &ScrapeConfig) -> Result<Self, GridironError> {
        Ok(Self::new(
            Arc::new(StatRegistry::baseline()?),
            BlockingBridge::new(config.workers),
            config.scrape_context()?,
        )
        .with_item_delay(config.item_delay()))
    }

    /// Pause between consecutive upstream fetches of one batch.
    pub fn with_item_delay(mut self, delay: Duration) -> Self {
        self.item_delay = delay;
        self
    }

    pub fn registry(&self) -> &StatRegistry {
        &self.registry
    }

    pub fn bridge(&self) -> &BlockingBridge {
        &self.bridge
    }

    /// The explicit list, or every registered stat when it is empty.
    pub fn effective_stats(&self, requested: Vec<String>) -> Vec<String> {
        if requested.is_empty() {
            self.registry
                .ids()
                .into_iter()
                .map(|id| id.as_str().to_string())
                .collect()
        } else {
            requested
        }
    }

    /// Runs one batch to completion. Never fails: every per-item error ends
    /// up as a FAILED result and the remaining items are still attempted.
    pub async fn run_batch(
        &self,
        session: &mut Session,
        season: i32,
        requested: Vec<String>,
        dry_run: bool,
    ) -> ScrapeJob {
        let stats = self.effective_stats(requested);
        let span = info_span!("batch_scrape", season, dry_run, items = stats.len());
        self.drive(session, ScrapeJob::new(season, stats, dry_run))
            .instrument(span)
            .await
    }

    async fn drive(&self, session: &mut Session, mut job: ScrapeJob) -> ScrapeJob {
        transition(job.start(Utc::now()));
        info!(stats = ?job.requested_stats, "batch started");

        // Dry runs leave storage untouched, job row included.
        let tracked = !job.dry_run && self.track_start(session, &mut job).await;

        let mut fetched = false;
        for stat in job.requested_stats.clone() {
            let result = if job.dry_run {
                StatResult::skipped(&stat)
            } else {
                match self.registry.resolve(&stat) {
                    None => StatResult::failed(&stat, UNKNOWN_STAT),
                    Some(handler) => {
                        if fetched && !self.item_delay.is_zero() {
                            tokio::time::sleep(self.item_delay).await;
                        }
                        fetched = true;
                        match self.scrape_with(session, handler, job.season).await {
                            Ok(count) => StatResult::success(&stat, count),
                            Err(err) => StatResult::failed(&stat, err.to_string()),
                        }
                    }
                }
            };
            if let Some(cause) = &result.error_detail {
                warn!(stat = %stat, error = %cause, "batch item failed");
            }
            transition(job.record(result));
            if tracked {
                self.track_progress(session, &job).await;
            }
        }

        transition(job.finish(Utc::now()));
        if tracked {
            self.track_progress(session, &job).await;
        }
        info!(
            status = job.status.as_str(),
            items = job.results.len(),
            failed = job.failed_count(),
            "batch finished"
        );
        job
    }

    /// Single-stat scrape. Unlike a batch, errors are returned to the caller.
    pub async fn scrape_one(
        &self,
        session: &mut Session,
        stat: &str,
        season: i32,
    ) -> Result<usize, GridironError> {
        let handler = self
            .registry
            .resolve(stat)
            .ok_or_else(|| GridironError::UnknownStat(stat.to_string()))?;
        self.scrape_with(session, handler, season).await
    }

    /// Fetch and parse on the bridge, then persist and commit. Whatever the
    /// session holds is rolled back on failure.
    async fn scrape_with(
        &self,
        session: &mut Session,
        handler: Arc<dyn StatHandler>,
        season: i32,
    ) -> Result<usize, GridironError> {
        let outcome = self.fetch_and_store(session, handler, season).await;
        if outcome.is_err() {
            discard_pending(session, "failed item").await;
        }
        outcome
    }

    async fn fetch_and_store(
        &self,
        session: &mut Session,
        handler: Arc<dyn StatHandler>,
        season: i32,
    ) -> Result<usize, GridironError> {
        validate_season(season)?;
        let ctx = self.context.clone();
        let worker = handler.clone();
        let records = self
            .bridge
            .run_blocking(move || {
                let url = worker.url(&ctx, season);
                let _span = info_span!("stat_fetch", stat = worker.stat().as_str(), season, url = %url)
                    .entered();
                worker.scrape(&ctx, season)
            })
            .await??;
        let count = self.bridge.run(handler.persist(session, records)).await??;
        session.commit().await?;
        info!(stat = handler.stat().as_str(), season, records = count, "stat stored");
        Ok(count)
    }

    async fn track_start(&self, session: &mut Session, job: &mut ScrapeJob) -> bool {
        match JobStore::new(session).insert(job, true).await {
            Ok(id) => {
                info!(job_id = id, "job recorded");
                true
            }
            Err(err) => {
                warn!(error = %err, "could not record job, continuing untracked");
                discard_pending(session, "failed job insert").await;
                false
            }
        }
    }

    /// A failed update must not leave its transaction open for the next item.
    async fn track_progress(&self, session: &mut Session, job: &ScrapeJob) {
        if let Err(err) = JobStore::new(session).update(job, true).await {
            warn!(job_id = ?job.id, error = %err, "could not update job row");
            discard_pending(session, "failed job update").await;
        }
    }
}

async fn discard_pending(session: &mut Session, after: &str) {
    if session.in_transaction() {
        if let Err(err) = session.rollback().await {
            warn!(error = %err, after, "rollback failed");
        }
    }
}

fn transition(step: Result<(), GridironError>) {
    if let Err(err) = step {
        warn!(error = %err, "job state transition rejected");
    }
}
