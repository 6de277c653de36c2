//! Execution speed levels and their power draw.

use serde::{Deserialize, Serialize};

/// Minimum number of levels required from a speed table.
///
/// The workload-aware policy addresses the lowest, middle and highest levels,
/// so smaller tables are rejected at construction time.
pub const MIN_SPEED_LEVELS: usize = 3;

/// A discrete execution speed level (DVFS operating point).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeedLevel {
    /// Relative throughput multiplier, baseline 1.0.
    pub speed: f64,
    /// Power draw in watts at this level, inclusive of static power.
    pub power_w: f64,
    /// Human-readable level name.
    pub name: String,
}

impl SpeedLevel {
    pub fn new(speed: f64, power_w: f64, name: &str) -> Self {
        Self {
            speed,
            power_w,
            name: name.to_string(),
        }
    }
}

/// Ordered list of available speed levels, index 0 = lowest speed.
#[derive(Clone, Debug)]
pub struct SpeedTable {
    levels: Vec<SpeedLevel>,
}

impl SpeedTable {
    /// Creates a speed table from the given levels.
    ///
    /// Panics if fewer than [`MIN_SPEED_LEVELS`] levels are supplied or any
    /// level has a non-positive speed or power, so that level selection is
    /// always in range during a run.
    pub fn new(levels: Vec<SpeedLevel>) -> Self {
        assert!(
            levels.len() >= MIN_SPEED_LEVELS,
            "speed table requires at least {} levels, got {}",
            MIN_SPEED_LEVELS,
            levels.len()
        );
        for level in &levels {
            assert!(
                level.speed > 0. && level.power_w > 0.,
                "speed level {} must have positive speed and power",
                level.name
            );
        }
        Self { levels }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level(&self, index: usize) -> &SpeedLevel {
        &self.levels[index]
    }

    pub fn levels(&self) -> &[SpeedLevel] {
        &self.levels
    }

    /// Index of the lowest available level.
    pub fn lowest(&self) -> usize {
        0
    }

    /// Index of the mid-table level.
    pub fn middle(&self) -> usize {
        self.levels.len() / 2
    }

    /// Index of the highest available level.
    pub fn highest(&self) -> usize {
        self.levels.len() - 1
    }
}

impl Default for SpeedTable {
    /// Three illustrative operating points of a small DVFS-capable core.
    fn default() -> Self {
        Self::new(vec![
            SpeedLevel::new(1.0, 1.5, "1.0GHz"),
            SpeedLevel::new(1.5, 2.6, "1.5GHz"),
            SpeedLevel::new(2.0, 4.5, "2.0GHz"),
        ])
    }
}
