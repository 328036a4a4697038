use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::model::{ApplyOutcome, Team};
use crate::rating::TrueSkill;
use crate::store::MatchStore;
use crate::telemetry;

/// Applies reported results to player ratings and finalizes matches.
///
/// Safe to invoke any number of times per match: the store observes
/// `finished` on every application after the first and exits with a no-op
/// tag, so at-least-once delivery upstream needs no coordination.
pub struct ResultApplier {
    store: Arc<dyn MatchStore>,
    env: TrueSkill,
}

impl ResultApplier {
    pub fn new(store: Arc<dyn MatchStore>) -> Self {
        Self {
            store,
            env: TrueSkill::default(),
        }
    }

    pub fn with_env(store: Arc<dyn MatchStore>, env: TrueSkill) -> Self {
        Self { store, env }
    }

    pub async fn apply(&self, match_id: Uuid, winner_team: Team) -> Result<ApplyOutcome> {
        let outcome = self.store.apply_result(match_id, winner_team, &self.env).await?;

        match &outcome {
            ApplyOutcome::Applied { .. } => {
                info!(%match_id, winner = %winner_team, "result applied");
                telemetry::core_metrics().inc_results_applied();
            }
            ApplyOutcome::NoMatch { .. } => {
                warn!(%match_id, "result reported for vanished match");
            }
            ApplyOutcome::AlreadyFinished { .. } => {
                debug!(%match_id, "duplicate result delivery absorbed");
            }
        }

        Ok(outcome)
    }
}

/// A result report waiting to be applied.
#[derive(Debug, Clone, Copy)]
pub struct ResultJob {
    pub match_id: Uuid,
    pub winner_team: Team,
}

/// Hands result jobs to a background apply task.
///
/// The in-process realization of the result bus: the HTTP façade records the
/// report intent in its own transaction, then dispatches here. Delivery is
/// at-least-once from the caller's perspective; the applier's idempotence
/// does the rest.
#[derive(Clone)]
pub struct ResultDispatcher {
    tx: mpsc::UnboundedSender<ResultJob>,
}

impl ResultDispatcher {
    /// Spawn the consumer task and return the dispatch handle.
    pub fn start(applier: ResultApplier) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<ResultJob>();

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                if let Err(err) = applier.apply(job.match_id, job.winner_team).await {
                    // Transient store failure: the report intent is already
                    // durable, so a later redelivery can still land it.
                    error!(match_id = %job.match_id, %err, "result apply failed");
                }
            }
        });

        Self { tx }
    }

    pub fn dispatch(&self, match_id: Uuid, winner_team: Team) {
        let job = ResultJob {
            match_id,
            winner_team,
        };
        if self.tx.send(job).is_err() {
            error!(%match_id, "result worker is gone, dropping job");
        }
    }
}
