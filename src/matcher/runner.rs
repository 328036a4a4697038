use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{MatchPoolError, Result};
use crate::matcher::SplitPlanner;
use crate::region::Region;
use crate::store::MatchStore;
use crate::telemetry;

/// What one tick accomplished.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickReport {
    pub matches_created: usize,
    /// Set when a transient store error cut the tick short. Non-fatal; the
    /// next tick retries.
    pub aborted: bool,
}

/// The periodic matcher task.
///
/// Stateless between ticks: every tick claims queue rows under lock-or-skip
/// through the store, so any number of runner processes can share the same
/// regions without duplicating matches.
pub struct MatcherRunner {
    store: Arc<dyn MatchStore>,
    planner: SplitPlanner,
    regions: Vec<Region>,
    tick_interval: Duration,
    running: AtomicBool,
}

impl MatcherRunner {
    pub fn new(
        store: Arc<dyn MatchStore>,
        regions: Vec<Region>,
        split_beta: f64,
        tick_interval: Duration,
    ) -> Self {
        Self {
            store,
            planner: SplitPlanner::new(split_beta),
            regions,
            tick_interval,
            running: AtomicBool::new(false),
        }
    }

    /// Run ticks on the configured cadence until [`stop`](Self::stop).
    ///
    /// A tick that overruns its slot is not cancelled; the missed slot is
    /// skipped and the next one fires on schedule.
    pub async fn run(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(MatchPoolError::OperationFailed(
                "matcher runner is already running".to_string(),
            ));
        }

        info!(regions = ?self.regions, interval_ms = self.tick_interval.as_millis() as u64, "matcher started");

        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            let report = self.run_tick().await;
            if report.matches_created > 0 {
                info!(matches = report.matches_created, "tick formed matches");
            }
        }

        info!("matcher stopped");
        Ok(())
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// One pass over every configured region.
    ///
    /// Store errors abandon the remainder of the tick instead of surfacing:
    /// queue entries stay put and the next tick picks them up.
    pub async fn run_tick(&self) -> TickReport {
        let mut report = TickReport::default();

        for &region in &self.regions {
            match self.store.drain_region(region, &self.planner).await {
                Ok(formed) => {
                    for record in &formed {
                        debug!(
                            match_id = %record.match_id,
                            %region,
                            quality = record.quality,
                            "match formed"
                        );
                    }
                    report.matches_created += formed.len();
                    telemetry::core_metrics().inc_matches_created(formed.len() as u64);
                }
                Err(err) => {
                    warn!(%region, %err, "tick abandoned on store error");
                    report.aborted = true;
                    break;
                }
            }
        }

        report
    }
}
