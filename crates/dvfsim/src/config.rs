//! Simulation configuration.

use serde::{Deserialize, Serialize};

use crate::speed::SpeedLevel;

/// Holds raw simulation config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawSimulationConfig {
    pub quantum: Option<f64>,
    pub lookahead_window: Option<f64>,
    pub short_threshold: Option<f64>,
    pub util_threshold: Option<f64>,
    pub long_job_threshold: Option<f64>,
    pub report_interval: Option<f64>,
    pub moving_avg_window: Option<f64>,
    pub regression_points: Option<usize>,
    pub forecast_horizon: Option<f64>,
    pub idle_power: Option<f64>,
    pub max_sim_time: Option<f64>,
    pub speed_levels: Option<Vec<SpeedLevel>>,
}

/// Represents simulation configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Maximum duration in ms of one uninterrupted execution slice.
    pub quantum: f64,
    /// Lookahead window in ms used for utilization prediction.
    pub lookahead_window: f64,
    /// Remaining work in ms below which a job counts as short.
    pub short_threshold: f64,
    /// Predicted utilization above which the highest speed level is used.
    pub util_threshold: f64,
    /// Average remaining work in ms above which the lowest speed level is used.
    pub long_job_threshold: f64,
    /// Interval in ms between periodic analysis snapshots.
    pub report_interval: f64,
    /// Window in ms of the utilization moving average.
    pub moving_avg_window: f64,
    /// Number of trailing memory samples fed to the trend regression.
    pub regression_points: usize,
    /// Horizon in ms of the memory forecast projection.
    pub forecast_horizon: f64,
    /// Deep-idle power draw in watts.
    pub idle_power: f64,
    /// Safety horizon in ms, the run terminates once the clock exceeds it.
    pub max_sim_time: f64,
    /// Available execution speed levels, lowest first.
    pub speed_levels: Vec<SpeedLevel>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            quantum: 50.,
            lookahead_window: 200.,
            short_threshold: 30.,
            util_threshold: 0.6,
            long_job_threshold: 200.,
            report_interval: 100.,
            moving_avg_window: 200.,
            regression_points: 10,
            forecast_horizon: 500.,
            idle_power: 0.2,
            max_sim_time: 100_000.,
            speed_levels: vec![
                SpeedLevel::new(1.0, 1.5, "1.0GHz"),
                SpeedLevel::new(1.5, 2.6, "1.5GHz"),
                SpeedLevel::new(2.0, 4.5, "2.0GHz"),
            ],
        }
    }
}

impl SimulationConfig {
    /// Creates simulation config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Self {
        let raw: RawSimulationConfig = serde_yaml::from_str(
            &std::fs::read_to_string(file_name).unwrap_or_else(|_| panic!("Can't read file {}", file_name)),
        )
        .unwrap_or_else(|_| panic!("Can't parse YAML from file {}", file_name));
        let defaults = Self::default();

        Self {
            quantum: raw.quantum.unwrap_or(defaults.quantum),
            lookahead_window: raw.lookahead_window.unwrap_or(defaults.lookahead_window),
            short_threshold: raw.short_threshold.unwrap_or(defaults.short_threshold),
            util_threshold: raw.util_threshold.unwrap_or(defaults.util_threshold),
            long_job_threshold: raw.long_job_threshold.unwrap_or(defaults.long_job_threshold),
            report_interval: raw.report_interval.unwrap_or(defaults.report_interval),
            moving_avg_window: raw.moving_avg_window.unwrap_or(defaults.moving_avg_window),
            regression_points: raw.regression_points.unwrap_or(defaults.regression_points),
            forecast_horizon: raw.forecast_horizon.unwrap_or(defaults.forecast_horizon),
            idle_power: raw.idle_power.unwrap_or(defaults.idle_power),
            max_sim_time: raw.max_sim_time.unwrap_or(defaults.max_sim_time),
            speed_levels: raw.speed_levels.unwrap_or(defaults.speed_levels),
        }
    }
}
