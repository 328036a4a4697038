use once_cell::sync::OnceCell;
use prometheus::{
    register_int_counter, register_int_gauge_vec, Encoder, IntCounter, IntGaugeVec, TextEncoder,
};

use crate::error::{MatchPoolError, Result};
use crate::region::Region;

/// Metric set for the matchmaking core.
pub struct CoreMetrics {
    pub matches_created_total: IntCounter,
    pub results_applied_total: IntCounter,
    pub queue_depth: IntGaugeVec,
}

impl CoreMetrics {
    pub fn inc_matches_created(&self, delta: u64) {
        self.matches_created_total.inc_by(delta);
    }

    pub fn inc_results_applied(&self) {
        self.results_applied_total.inc();
    }

    /// Refresh the per-region depth gauge from a full snapshot; regions with
    /// no entries drop back to zero.
    pub fn set_queue_depths(&self, depths: &[(Region, i64)]) {
        for region in Region::ALL {
            self.queue_depth.with_label_values(&[region.as_str()]).set(0);
        }
        for (region, depth) in depths {
            self.queue_depth
                .with_label_values(&[region.as_str()])
                .set(*depth);
        }
    }
}

static CORE_METRICS: OnceCell<CoreMetrics> = OnceCell::new();

pub fn core_metrics() -> &'static CoreMetrics {
    CORE_METRICS.get_or_init(|| CoreMetrics {
        matches_created_total: register_int_counter!(
            "matchpool_matches_created_total",
            "Matches formed by the matcher"
        )
        .expect("register matchpool_matches_created_total"),
        results_applied_total: register_int_counter!(
            "matchpool_results_applied_total",
            "Match results applied to player ratings"
        )
        .expect("register matchpool_results_applied_total"),
        queue_depth: register_int_gauge_vec!(
            "matchpool_queue_depth",
            "Players currently enqueued, by region",
            &["region"]
        )
        .expect("register matchpool_queue_depth"),
    })
}

/// Encode every registered metric in the Prometheus text format.
pub fn encode_text() -> Result<String> {
    let families = prometheus::gather();
    let mut buf = Vec::new();
    TextEncoder::new()
        .encode(&families, &mut buf)
        .map_err(|err| MatchPoolError::OperationFailed(err.to_string()))?;
    String::from_utf8(buf).map_err(|err| MatchPoolError::OperationFailed(err.to_string()))
}
