// Background recompute job: rescore every team on an interval and store the
// results until told to stop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::analysis::AnalysisService;
use crate::store::ConfigStore;

#[derive(Clone)]
pub struct RecomputeJob {
    pub service: Arc<AnalysisService>,
    pub store: Arc<ConfigStore>,
    /// Profile key the job scores with.
    pub profile: String,
    pub interval: Duration,
}

/// Run one recompute pass on a blocking thread. Returns how many analyses
/// were stored.
pub async fn run_pass(job: &RecomputeJob) -> anyhow::Result<usize> {
    let service = Arc::clone(&job.service);
    let store = Arc::clone(&job.store);
    let key = job.profile.clone();

    tokio::task::spawn_blocking(move || -> anyhow::Result<usize> {
        let profile = store
            .load_or_default(&key)
            .with_context(|| format!("failed to load profile {key}"))?;
        let analyses = service.recompute_all(&profile);
        let mut saved = 0;
        for analysis in &analyses {
            match store.save_analysis(&analysis.key.to_string(), &key, analysis) {
                Ok(()) => saved += 1,
                Err(e) => warn!(team = %analysis.key, error = %e, "failed to store analysis"),
            }
        }
        Ok(saved)
    })
    .await
    .context("recompute task panicked")?
}

/// Run passes every `job.interval` (the first one immediately) until
/// `shutdown` turns true or its sender is dropped. Returns the number of
/// passes run.
pub async fn run(job: RecomputeJob, mut shutdown: watch::Receiver<bool>) -> usize {
    if *shutdown.borrow_and_update() {
        return 0;
    }
    info!(interval_secs = job.interval.as_secs(), profile = %job.profile, "recompute job started");

    let mut interval = tokio::time::interval(job.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut passes = 0;

    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }

            _ = interval.tick() => {
                passes += 1;
                match run_pass(&job).await {
                    Ok(saved) => info!(pass = passes, saved, "recompute pass stored"),
                    Err(e) => error!(pass = passes, error = %e, "recompute pass failed"),
                }
            }
        }
    }

    info!(passes, "recompute job stopped");
    passes
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
