//! Speed level selection policies.

use log::debug;

use crate::speed::SpeedTable;
use crate::task::Task;

/// Fraction of short jobs in the ready set above which the highest level is used.
const SHORT_FRACTION_TRIGGER: f64 = 0.6;

/// Speed policy chooses the execution speed level for the upcoming slice
/// based on the aggregate shape of the ready set.
pub trait SpeedPolicy {
    /// Returns the index of the chosen level in `table`.
    fn select_level(&self, ready: &[&Task], table: &SpeedTable) -> usize;

    fn name(&self) -> String {
        "unnamed speed policy".to_string()
    }
}

/// Stateless heuristic balancing queue drain speed against power draw.
///
/// The decision is an ordered rule list, first match wins:
/// 1. many short jobs or high predicted utilization in the lookahead window
///    -> highest level, to drain the queue before it builds up;
/// 2. long jobs dominate -> lowest level, long work tolerates low speed;
/// 3. otherwise -> the mid-table level.
///
/// There is no feedback from past prediction accuracy.
pub struct WorkloadAwareSpeedPolicy {
    /// Lookahead window in ms for utilization prediction.
    lookahead_window: f64,
    /// Remaining work below this value (ms) marks a job as short.
    short_threshold: f64,
    /// Predicted utilization above this value triggers the highest level.
    util_threshold: f64,
    /// Average remaining work above this value (ms) triggers the lowest level.
    long_job_threshold: f64,
}

impl WorkloadAwareSpeedPolicy {
    pub fn new(lookahead_window: f64, short_threshold: f64, util_threshold: f64, long_job_threshold: f64) -> Self {
        Self {
            lookahead_window,
            short_threshold,
            util_threshold,
            long_job_threshold,
        }
    }
}

impl Default for WorkloadAwareSpeedPolicy {
    fn default() -> Self {
        Self::new(200., 30., 0.6, 200.)
    }
}

impl SpeedPolicy for WorkloadAwareSpeedPolicy {
    fn select_level(&self, ready: &[&Task], table: &SpeedTable) -> usize {
        if ready.is_empty() {
            // no demand, nothing to drain
            return table.lowest();
        }
        let count = ready.len() as f64;
        let sum_remaining: f64 = ready.iter().map(|t| t.remaining).sum();
        let short_count = ready.iter().filter(|t| t.remaining <= self.short_threshold).count();
        let short_fraction = short_count as f64 / count;
        let avg_remaining = sum_remaining / count;
        let predicted_util = (sum_remaining / self.lookahead_window.max(1.)).min(1.);

        let level = if short_fraction > SHORT_FRACTION_TRIGGER || predicted_util > self.util_threshold {
            table.highest()
        } else if avg_remaining > self.long_job_threshold {
            table.lowest()
        } else {
            // middle is in range, the table is validated to hold >= 3 levels
            table.middle()
        };
        debug!(
            "speed policy: short_fraction={:.2} predicted_util={:.2} avg_remaining={:.1} -> level {}",
            short_fraction,
            predicted_util,
            avg_remaining,
            table.level(level).name
        );
        level
    }

    fn name(&self) -> String {
        "workload-aware".to_string()
    }
}
