//! Telemetry analytics: moving averages, trend regression and heuristic rules.

use crate::series::TimeSeries;
use crate::task::{Task, TaskClass};

/// Minimum sample count for a meaningful regression fit.
pub const MIN_REGRESSION_POINTS: usize = 5;

/// Cumulative CPU time in ms above which a task may be flagged as a hotspot.
const HOTSPOT_CPU_MS: f64 = 100.;
/// Remaining work in ms above which a heavy consumer still counts as unfinished.
const HOTSPOT_REMAINING_MS: f64 = 50.;

/// Consumed CPU fraction above which a task is classified as CPU-bound.
const CPU_BOUND_FRACTION: f64 = 0.7;
/// I/O weight above which a non-CPU-bound task is classified as IO-bound.
const IO_BOUND_WEIGHT: f64 = 0.6;

const VARIANCE_EPSILON: f64 = 1e-9;

/// Result of a trend fit over a telemetry series.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrendEstimate {
    /// Fitted slope in value units per ms.
    pub slope: f64,
    /// Value predicted at the last timestamp of the fitted window.
    pub intercept: f64,
}

/// Memory projection derived from a trend estimate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Forecast {
    /// Unbounded projection at the forecast horizon.
    pub raw: f64,
    /// Projection clamped to the sane range derived from observed history.
    pub clamped: f64,
}

/// Mean of the trailing samples within `window` ms of the last timestamp.
///
/// The series is scanned backward from its last point and the scan stops at
/// the first point outside the window. With irregular sampling this excludes
/// older points behind a gap even if their timestamps would fit the window;
/// the included segment is always contiguous in time. Returns 0 for an empty
/// series.
pub fn moving_average(series: &TimeSeries, window: f64) -> f64 {
    let points = series.points();
    let last = match points.last() {
        Some(p) => p.time,
        None => return 0.,
    };
    let mut sum = 0.;
    let mut count = 0;
    for point in points.iter().rev() {
        if last - point.time > window {
            break;
        }
        sum += point.value;
        count += 1;
    }
    sum / count as f64
}

/// Ordinary least-squares fit of value on time over the last `last_n` samples.
///
/// Timestamps are offset by the window's first timestamp before fitting to
/// keep the normal equations numerically stable. Degenerate inputs fall back
/// to a flat estimate: fewer than [`MIN_REGRESSION_POINTS`] samples yield
/// slope 0 and the last observed value (0 for an empty series), a near-zero
/// variance denominator yields slope 0 and the window mean.
pub fn linear_regression(series: &TimeSeries, last_n: usize) -> TrendEstimate {
    let points = series.points();
    let n = points.len().min(last_n);
    if n < MIN_REGRESSION_POINTS {
        return TrendEstimate {
            slope: 0.,
            intercept: series.last_value(),
        };
    }
    let window = &points[points.len() - n..];
    let t0 = window[0].time;
    let mut sx = 0.;
    let mut sy = 0.;
    let mut sxx = 0.;
    let mut sxy = 0.;
    for point in window {
        let x = point.time - t0;
        sx += x;
        sy += point.value;
        sxx += x * x;
        sxy += x * point.value;
    }
    let count = n as f64;
    let denom = count * sxx - sx * sx;
    if denom.abs() < VARIANCE_EPSILON {
        return TrendEstimate {
            slope: 0.,
            intercept: sy / count,
        };
    }
    let slope = (count * sxy - sx * sy) / denom;
    let offset = (sy - slope * sx) / count;
    let last_x = window[n - 1].time - t0;
    TrendEstimate {
        slope,
        intercept: slope * last_x + offset,
    }
}

/// Projects `last_value` ahead by `horizon` ms along `slope` and clamps the
/// result to `[0, cap]`.
///
/// The cap is twice the maximum value observed in the series so far; when the
/// maximum is near zero the cap falls back to `max(100, 2 * last_value)`.
/// This bounds runaway extrapolation from a noisy slope.
pub fn project_forecast(last_value: f64, slope: f64, horizon: f64, max_observed: f64) -> Forecast {
    let raw = last_value + slope * horizon;
    let mut cap = (2. * max_observed).max(0.);
    if cap < 1. {
        cap = (2. * last_value).max(100.);
    }
    Forecast {
        raw,
        clamped: raw.clamp(0., cap),
    }
}

/// A task is a hotspot if it has consumed significant CPU time while still
/// having substantial work left.
pub fn is_hotspot(task: &Task) -> bool {
    task.cpu_consumed() > HOTSPOT_CPU_MS && task.remaining > HOTSPOT_REMAINING_MS
}

/// Classifies a task by its consumed CPU fraction and configured I/O share.
pub fn classify(task: &Task) -> TaskClass {
    let cpu_fraction = task.cpu_consumed() / task.burst.max(1.);
    if cpu_fraction > CPU_BOUND_FRACTION {
        TaskClass::CpuBound
    } else if task.io_weight > IO_BOUND_WEIGHT {
        TaskClass::IoBound
    } else {
        TaskClass::Mixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskRequest;

    fn consumed_task(burst: f64, io_weight: f64, consumed: f64) -> Task {
        let mut task = Task::new(1, TaskRequest::with_profile(0., burst, 0., io_weight));
        task.consume(consumed, 0.);
        task
    }

    #[test]
    fn hotspot_needs_heavy_consumption_and_substantial_remainder() {
        assert!(is_hotspot(&consumed_task(300., 0., 150.)));
        // only 40 ms left, nearly done
        assert!(!is_hotspot(&consumed_task(160., 0., 120.)));
        // not yet a heavy consumer
        assert!(!is_hotspot(&consumed_task(300., 0., 90.)));
    }

    #[test]
    fn classification_by_cpu_fraction_then_io_weight() {
        assert_eq!(classify(&consumed_task(100., 0.1, 80.)), TaskClass::CpuBound);
        assert_eq!(classify(&consumed_task(100., 0.7, 10.)), TaskClass::IoBound);
        assert_eq!(classify(&consumed_task(100., 0.2, 10.)), TaskClass::Mixed);
    }
}
