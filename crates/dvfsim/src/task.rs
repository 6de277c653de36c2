//! Simulated task and its lifecycle.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::EPSILON;

/// Classification of a task derived from its observed execution profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TaskClass {
    CpuBound,
    IoBound,
    Mixed,
}

impl Display for TaskClass {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            TaskClass::CpuBound => write!(f, "CPU-bound"),
            TaskClass::IoBound => write!(f, "IO-bound"),
            TaskClass::Mixed => write!(f, "Mixed"),
        }
    }
}

/// Task descriptor accepted from external loaders and generators.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TaskRequest {
    /// Arrival time in ms.
    pub arrival: f64,
    /// Total amount of work in ms at baseline speed.
    pub burst: f64,
    /// Memory footprint in kb.
    pub mem_kb: f64,
    /// Fraction of a time slice spent on I/O wait, in [0, 1].
    pub io_weight: f64,
}

impl TaskRequest {
    /// Creates a request with zero memory footprint and no I/O share.
    pub fn new(arrival: f64, burst: f64) -> Self {
        Self {
            arrival,
            burst,
            mem_kb: 0.,
            io_weight: 0.,
        }
    }

    /// Creates a request with full resource profile.
    pub fn with_profile(arrival: f64, burst: f64, mem_kb: f64, io_weight: f64) -> Self {
        Self {
            arrival,
            burst,
            mem_kb,
            io_weight,
        }
    }
}

/// Represents a single unit of work processed by the simulated system.
///
/// A task is described by its arrival time and total work (burst), plus a memory
/// footprint and an I/O share used by the telemetry and progress models.
/// The engine owns the full task collection for the lifetime of a run; finished
/// tasks are never removed, only marked via `finish_time`.
#[derive(Clone, Debug)]
pub struct Task {
    pub id: u32,
    /// Arrival time in ms.
    pub arrival: f64,
    /// Total work in ms at baseline speed.
    pub burst: f64,
    /// Remaining work in ms at baseline speed, non-increasing.
    pub remaining: f64,
    /// Memory footprint in kb.
    pub mem_kb: f64,
    /// Fraction of a time slice that does not count as CPU progress.
    pub io_weight: f64,
    start_time: Option<f64>,
    finish_time: Option<f64>,
    cpu_consumed: f64,
}

impl Task {
    /// Creates a task from a request.
    pub fn new(id: u32, request: TaskRequest) -> Self {
        Self {
            id,
            arrival: request.arrival,
            burst: request.burst,
            remaining: request.burst,
            mem_kb: request.mem_kb,
            io_weight: request.io_weight,
            start_time: None,
            finish_time: None,
            cpu_consumed: 0.,
        }
    }

    /// A task is ready at time `t` iff it has arrived and still has work left.
    pub fn is_ready(&self, time: f64) -> bool {
        self.arrival <= time && self.remaining > EPSILON
    }

    pub fn is_finished(&self) -> bool {
        self.finish_time.is_some()
    }

    /// Time of first dispatch, unset until the task runs for the first time.
    pub fn start_time(&self) -> Option<f64> {
        self.start_time
    }

    /// Completion time, unset until the remaining work reaches zero.
    pub fn finish_time(&self) -> Option<f64> {
        self.finish_time
    }

    /// Cumulative CPU work consumed in ms, non-decreasing.
    pub fn cpu_consumed(&self) -> f64 {
        self.cpu_consumed
    }

    /// Records the first dispatch time. Subsequent calls have no effect.
    pub(crate) fn record_start(&mut self, time: f64) {
        if self.start_time.is_none() {
            self.start_time = Some(time);
        }
    }

    /// Applies `work` ms of CPU progress and marks the task finished at `time`
    /// once the remaining work is exhausted.
    pub(crate) fn consume(&mut self, work: f64, time: f64) {
        self.remaining = (self.remaining - work).max(0.);
        self.cpu_consumed += work;
        if self.remaining <= EPSILON && self.finish_time.is_none() {
            self.finish_time = Some(time);
        }
    }

    /// Restores the task to its pre-run state.
    pub(crate) fn reset(&mut self) {
        self.remaining = self.burst;
        self.start_time = None;
        self.finish_time = None;
        self.cpu_consumed = 0.;
    }
}
