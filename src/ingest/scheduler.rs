//! Ingestion scheduler - one serialized execution slot, two trigger sources
//!
//! A recurring timer and the manual `/api/ingest` endpoint both funnel into
//! `trigger()`, which claims an atomic flag before spawning a run. A trigger
//! arriving while a run is in flight is reported as `AlreadyRunning`, never
//! queued - there is at most one ingestion pass in flight at any time.
//!
//! Run failures are logged and swallowed here; the schedule continues on its
//! next tick regardless of the previous outcome.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use super::engine::IngestionEngine;
use super::types::FetchOptions;

/// Outcome of a trigger request. `Started` means the run was launched in the
/// background; completion is only observable via logs and status queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started,
    AlreadyRunning,
}

pub struct IngestionScheduler {
    engine: Arc<IngestionEngine>,
    running: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    current_run: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl IngestionScheduler {
    pub fn new(engine: Arc<IngestionEngine>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            engine,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            ticker: Mutex::new(None),
            current_run: tokio::sync::Mutex::new(None),
        }
    }

    /// Claim the execution slot and run one ingestion pass in the background.
    ///
    /// Returns immediately; the caller gets an acknowledgment, not a result.
    pub async fn trigger(&self, options: FetchOptions) -> TriggerOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return TriggerOutcome::AlreadyRunning;
        }

        let engine = self.engine.clone();
        let running = self.running.clone();
        let handle = tokio::spawn(async move {
            match engine.run_ingestion(options).await {
                Ok(tally) => log::info!(
                    "Ingestion run completed: {} stored, {} skipped",
                    tally.stored,
                    tally.skipped
                ),
                Err(e) => log::error!("Ingestion run failed: {}", e),
            }
            running.store(false, Ordering::SeqCst);
        });

        *self.current_run.lock().await = Some(handle);
        TriggerOutcome::Started
    }

    /// Spawn the recurring ticker. The first tick fires immediately, which
    /// gives the initial run at process start.
    pub fn start(self: Arc<Self>, every: Duration) {
        log::info!("⏰ Starting ingestion scheduler (interval: {:?})", every);

        let scheduler = Arc::clone(&self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            let mut timer = interval(every);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        log::info!("Running scheduled data ingestion...");
                        if scheduler.trigger(FetchOptions::default()).await
                            == TriggerOutcome::AlreadyRunning
                        {
                            log::warn!("Previous ingestion still in flight, skipping this tick");
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }

            log::info!("Scheduler ticker stopped");
        });

        *self.ticker.lock().unwrap() = Some(handle);
    }

    /// Cancel future ticks and wait for an in-flight run to finish.
    /// The running pass is never force-killed.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);

        let ticker = self.ticker.lock().unwrap().take();
        if let Some(handle) = ticker {
            let _ = handle.await;
        }

        let current = self.current_run.lock().await.take();
        if let Some(handle) = current {
            let _ = handle.await;
        }
    }

    /// Whether an ingestion pass is currently in flight.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
