//! Periodic analysis snapshots and end-of-run summary.

use std::fs::File;

use serde::Serialize;

use crate::task::TaskClass;

/// Number of top CPU consumers included in a snapshot.
pub const TOP_CONSUMERS: usize = 3;

/// Clamped forecast in kb above which a snapshot carries a memory pressure warning.
pub const MEMORY_PRESSURE_KB: f64 = 1024. * 1024.;

/// One contiguous execution record: consecutive slices of the same task are
/// merged. Used for reporting only.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExecutionRecord {
    pub task_id: u32,
    /// Duration of the record in ms.
    pub duration: f64,
}

/// Analysis values assembled at one reporting boundary.
#[derive(Clone, Debug)]
pub struct Snapshot {
    /// Boundary timestamp in ms.
    pub time: f64,
    /// Moving average of CPU utilization in percent.
    pub avg_cpu_util: f64,
    /// Total resident memory in kb at snapshot time.
    pub mem_kb: f64,
    /// Fitted memory trend in kb/ms.
    pub mem_slope: f64,
    /// Unclamped memory projection in kb.
    pub forecast_raw_kb: f64,
    /// Clamped memory projection in kb.
    pub forecast_kb: f64,
    /// Up to [`TOP_CONSUMERS`] (task id, cpu ms) pairs, ranked descending by
    /// consumed CPU time, ties broken by original task order.
    pub top_consumers: Vec<(u32, f64)>,
    /// Ids of tasks currently flagged as hotspots.
    pub hotspots: Vec<u32>,
    /// Classifications of tasks that have consumed CPU time so far.
    pub classes: Vec<(u32, TaskClass)>,
    /// Set when the clamped forecast projects more than 1 GB of memory in use.
    pub memory_pressure: bool,
}

/// CSV row with the tabular subset of a snapshot.
#[derive(Serialize)]
struct SnapshotRow {
    time_ms: i64,
    avg_cpu_util: f64,
    mem_kb: i64,
    slope_kb_per_ms: f64,
    forecast_kb: i64,
    top1_pid: Option<u32>,
    top1_cpu_ms: Option<i64>,
    top2_pid: Option<u32>,
    top2_cpu_ms: Option<i64>,
    top3_pid: Option<u32>,
    top3_cpu_ms: Option<i64>,
    hotspots: usize,
}

impl SnapshotRow {
    fn from_snapshot(snapshot: &Snapshot) -> Self {
        let top = |i: usize| snapshot.top_consumers.get(i).copied();
        Self {
            time_ms: snapshot.time.round() as i64,
            avg_cpu_util: snapshot.avg_cpu_util,
            mem_kb: snapshot.mem_kb.round() as i64,
            slope_kb_per_ms: snapshot.mem_slope,
            forecast_kb: snapshot.forecast_kb.round() as i64,
            top1_pid: top(0).map(|(id, _)| id),
            top1_cpu_ms: top(0).map(|(_, cpu)| cpu.round() as i64),
            top2_pid: top(1).map(|(id, _)| id),
            top2_cpu_ms: top(1).map(|(_, cpu)| cpu.round() as i64),
            top3_pid: top(2).map(|(id, _)| id),
            top3_cpu_ms: top(2).map(|(_, cpu)| cpu.round() as i64),
            hotspots: snapshot.hotspots.len(),
        }
    }
}

/// Collects snapshots at a fixed reporting interval.
///
/// The engine drives the boundary cursor after every clock advance; one
/// snapshot is emitted per boundary crossed, so a single long jump over
/// several boundaries catches up with one snapshot for each. A forced final
/// snapshot is appended at the run's true end time.
pub struct Reporter {
    interval: f64,
    next_boundary: f64,
    snapshots: Vec<Snapshot>,
}

impl Reporter {
    pub fn new(interval: f64) -> Self {
        assert!(interval > 0., "reporting interval must be positive");
        Self {
            interval,
            next_boundary: interval,
            snapshots: Vec::new(),
        }
    }

    /// Next boundary the cursor is waiting for, in ms.
    pub fn next_boundary(&self) -> f64 {
        self.next_boundary
    }

    /// Whether a boundary has been crossed at the current clock value.
    pub fn boundary_due(&self, now: f64) -> bool {
        now >= self.next_boundary
    }

    /// Records a snapshot for the current boundary and moves the cursor.
    pub fn record(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
        self.next_boundary += self.interval;
    }

    /// Records the forced final snapshot without moving the cursor.
    pub fn record_final(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn reset(&mut self) {
        self.next_boundary = self.interval;
        self.snapshots.clear();
    }

    /// Saves the tabular snapshot record as CSV.
    pub fn save_csv(&self, path: &str) -> Result<(), std::io::Error> {
        let file = File::create(path)?;
        let mut wtr = csv::Writer::from_writer(file);
        for snapshot in &self.snapshots {
            wtr.serialize(SnapshotRow::from_snapshot(snapshot))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Per-task record exposed in the run summary.
#[derive(Clone, Debug)]
pub struct TaskSummary {
    pub id: u32,
    pub arrival: f64,
    pub burst: f64,
    /// Unset if the task was never dispatched.
    pub start_time: Option<f64>,
    /// Unset if the task did not finish before the run ended.
    pub finish_time: Option<f64>,
    pub cpu_consumed: f64,
}

/// Final values of one simulation run.
///
/// Turnaround, waiting and makespan aggregate over finished tasks only;
/// tasks cut off by the safety horizon appear in `tasks` with their finish
/// time unset.
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    pub tasks: Vec<TaskSummary>,
    pub finished_tasks: usize,
    /// Mean of (finish - arrival) in ms.
    pub avg_turnaround: f64,
    /// Mean of (turnaround - burst) in ms.
    pub avg_waiting: f64,
    /// Maximum finish time in ms.
    pub makespan: f64,
    /// busy_time / makespan in percent.
    pub cpu_utilization: f64,
    /// Total energy consumption in joules.
    pub total_energy: f64,
    /// Merged execution trace in dispatch order.
    pub trace: Vec<ExecutionRecord>,
}
