//! Append-only telemetry time series.

use crate::EPSILON;

/// A single telemetry sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeriesPoint {
    /// Timestamp in ms.
    pub time: f64,
    pub value: f64,
}

/// Ordered, append-only sequence of telemetry samples.
///
/// Timestamps are non-decreasing and points are never reordered or pruned
/// within one run. The running maximum of observed values is tracked for
/// forecast clamping.
#[derive(Clone, Debug, Default)]
pub struct TimeSeries {
    points: Vec<SeriesPoint>,
    max_observed: f64,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sample.
    ///
    /// Panics if `time` precedes the last recorded timestamp, since samples
    /// must be recorded in simulated-time order.
    pub fn append(&mut self, time: f64, value: f64) {
        if let Some(last) = self.points.last() {
            assert!(
                time >= last.time - EPSILON,
                "time series timestamps must be non-decreasing: {} < {}",
                time,
                last.time
            );
        }
        self.points.push(SeriesPoint { time, value });
        self.max_observed = self.max_observed.max(value);
    }

    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }

    /// Value of the last sample, or 0 for an empty series.
    pub fn last_value(&self) -> f64 {
        self.points.last().map_or(0., |p| p.value)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    /// Maximum value observed so far, non-decreasing.
    pub fn max_observed(&self) -> f64 {
        self.max_observed
    }

    /// Drops all samples and the running maximum at run start.
    pub fn reset(&mut self) {
        self.points.clear();
        self.max_observed = 0.;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_running_maximum() {
        let mut series = TimeSeries::new();
        series.append(0., 10.);
        series.append(5., 30.);
        series.append(10., 20.);
        assert_eq!(series.max_observed(), 30.);
        assert_eq!(series.last_value(), 20.);
        assert_eq!(series.len(), 3);
    }

    #[test]
    #[should_panic(expected = "non-decreasing")]
    fn rejects_out_of_order_samples() {
        let mut series = TimeSeries::new();
        series.append(10., 1.);
        series.append(5., 2.);
    }
}
