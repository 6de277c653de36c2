//! Simulation engine: event clock, dispatch and telemetry recording.

use log::{debug, info, warn};

use crate::analyzer;
use crate::config::SimulationConfig;
use crate::dvfs::{SpeedPolicy, WorkloadAwareSpeedPolicy};
use crate::energy::EnergyMeter;
use crate::report::{ExecutionRecord, Reporter, RunSummary, Snapshot, TaskSummary, MEMORY_PRESSURE_KB, TOP_CONSUMERS};
use crate::scheduler::{Scheduler, SrtfScheduler};
use crate::series::TimeSeries;
use crate::speed::SpeedTable;
use crate::task::{Task, TaskRequest};
use crate::EPSILON;

enum Step {
    Advanced,
    Complete,
}

/// Discrete-event simulation of a single DVFS-capable processor.
///
/// The engine owns the task table, the clock and all run-scoped accumulators.
/// Each event step resolves the ready set, asks the scheduler and the speed
/// policy what to run and how fast, applies the resulting slice and records
/// telemetry. When no task is ready the clock jumps directly to the next
/// arrival while accruing idle energy.
pub struct DvfsSimulation {
    config: SimulationConfig,
    tasks: Vec<Task>,
    speed_table: SpeedTable,
    scheduler: Box<dyn Scheduler>,
    speed_policy: Box<dyn SpeedPolicy>,
    clock: f64,
    meter: EnergyMeter,
    cpu_util_series: TimeSeries,
    mem_series: TimeSeries,
    reporter: Reporter,
    trace: Vec<ExecutionRecord>,
}

impl DvfsSimulation {
    /// Creates a simulation with the SRTF scheduler and the workload-aware
    /// speed policy configured from `config`.
    pub fn new(config: SimulationConfig) -> Self {
        let policy = WorkloadAwareSpeedPolicy::new(
            config.lookahead_window,
            config.short_threshold,
            config.util_threshold,
            config.long_job_threshold,
        );
        Self::with_policies(config, Box::new(SrtfScheduler::new()), Box::new(policy))
    }

    /// Creates a simulation with custom scheduling and speed policies.
    pub fn with_policies(
        config: SimulationConfig,
        scheduler: Box<dyn Scheduler>,
        speed_policy: Box<dyn SpeedPolicy>,
    ) -> Self {
        let speed_table = SpeedTable::new(config.speed_levels.clone());
        let reporter = Reporter::new(config.report_interval);
        Self {
            config,
            tasks: Vec::new(),
            speed_table,
            scheduler,
            speed_policy,
            clock: 0.,
            meter: EnergyMeter::new(),
            cpu_util_series: TimeSeries::new(),
            mem_series: TimeSeries::new(),
            reporter,
            trace: Vec::new(),
        }
    }

    /// Adds a task and returns its id. Ids are assigned sequentially from 1.
    pub fn add_task(&mut self, request: TaskRequest) -> u32 {
        let id = self.tasks.len() as u32 + 1;
        self.tasks.push(Task::new(id, request));
        id
    }

    /// Adds all tasks from the given request list.
    pub fn load(&mut self, requests: &[TaskRequest]) {
        for request in requests {
            self.add_task(*request);
        }
    }

    /// Current simulated time in ms.
    pub fn time(&self) -> f64 {
        self.clock
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Returns the task with the given id.
    ///
    /// Panics if no such task exists.
    pub fn task(&self, id: u32) -> &Task {
        self.tasks.iter().find(|t| t.id == id).unwrap()
    }

    /// Total energy consumption so far in joules.
    pub fn energy_consumed(&self) -> f64 {
        self.meter.energy_consumed()
    }

    /// Total busy time so far in ms.
    pub fn busy_time(&self) -> f64 {
        self.meter.busy_time()
    }

    pub fn cpu_util_series(&self) -> &TimeSeries {
        &self.cpu_util_series
    }

    pub fn mem_series(&self) -> &TimeSeries {
        &self.mem_series
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        self.reporter.snapshots()
    }

    /// Saves the tabular snapshot record as CSV.
    pub fn save_csv(&self, path: &str) -> Result<(), std::io::Error> {
        self.reporter.save_csv(path)
    }

    /// Runs the simulation to completion and returns the final summary.
    ///
    /// All run-scoped state (clock, accumulators, series, snapshots, task
    /// progress) is reset at run start, so repeated runs over the same task
    /// set are independent.
    pub fn run(&mut self) -> RunSummary {
        self.reset();
        info!(
            "starting run: {} tasks, {} scheduler, {} speed policy",
            self.tasks.len(),
            self.scheduler.name(),
            self.speed_policy.name()
        );
        self.record_telemetry();
        loop {
            match self.step() {
                Step::Complete => break,
                Step::Advanced => {
                    self.emit_due_snapshots();
                    if self.clock > self.config.max_sim_time {
                        warn!(
                            "safety horizon of {} ms exceeded, terminating run early",
                            self.config.max_sim_time
                        );
                        break;
                    }
                }
            }
        }
        let final_snapshot = self.build_snapshot(self.clock);
        self.reporter.record_final(final_snapshot);
        let summary = self.summary();
        info!(
            "run complete at {:.3} ms: {}/{} tasks finished, avg turnaround {:.3} ms, total energy {:.3} J",
            self.clock,
            summary.finished_tasks,
            self.tasks.len(),
            summary.avg_turnaround,
            summary.total_energy
        );
        summary
    }

    /// Assembles the final summary from the current run state.
    pub fn summary(&self) -> RunSummary {
        let mut total_turnaround = 0.;
        let mut total_waiting = 0.;
        let mut makespan: f64 = 0.;
        let mut finished = 0;
        for task in &self.tasks {
            if let Some(finish) = task.finish_time() {
                let turnaround = finish - task.arrival;
                total_turnaround += turnaround;
                total_waiting += turnaround - task.burst;
                makespan = makespan.max(finish);
                finished += 1;
            }
        }
        let (avg_turnaround, avg_waiting) = if finished > 0 {
            (total_turnaround / finished as f64, total_waiting / finished as f64)
        } else {
            (0., 0.)
        };
        RunSummary {
            tasks: self
                .tasks
                .iter()
                .map(|t| TaskSummary {
                    id: t.id,
                    arrival: t.arrival,
                    burst: t.burst,
                    start_time: t.start_time(),
                    finish_time: t.finish_time(),
                    cpu_consumed: t.cpu_consumed(),
                })
                .collect(),
            finished_tasks: finished,
            avg_turnaround,
            avg_waiting,
            makespan,
            cpu_utilization: self.meter.busy_time() / makespan.max(1.) * 100.,
            total_energy: self.meter.energy_consumed(),
            trace: self.trace.clone(),
        }
    }

    fn reset(&mut self) {
        self.clock = 0.;
        self.meter.reset();
        self.cpu_util_series.reset();
        self.mem_series.reset();
        self.reporter.reset();
        self.trace.clear();
        for task in &mut self.tasks {
            task.reset();
        }
    }

    fn step(&mut self) -> Step {
        let ready = self.ready_indices();
        if ready.is_empty() {
            return self.idle_jump();
        }

        let selection = {
            let ready_refs: Vec<&Task> = ready.iter().map(|&i| &self.tasks[i]).collect();
            self.scheduler
                .select(&ready_refs)
                .map(|pos| (ready[pos], self.speed_policy.select_level(&ready_refs, &self.speed_table)))
        };
        let (task_idx, level_idx) = match selection {
            Some(choice) => choice,
            // the scheduler declined to dispatch, wait for the next arrival
            None => return self.idle_jump(),
        };

        let level = self.speed_table.level(level_idx).clone();
        let next_arrival = self.next_arrival_after(self.clock);
        let task = &self.tasks[task_idx];
        // net progress rate; zero for pure I/O waiters, which then only burn time
        let net_rate = level.speed * (1. - task.io_weight);
        let time_to_finish = if net_rate > EPSILON {
            task.remaining / net_rate
        } else {
            f64::INFINITY
        };
        let mut run_until = self.clock + time_to_finish;
        if let Some(arrival) = next_arrival {
            run_until = run_until.min(arrival);
        }
        run_until = run_until.min(self.clock + self.config.quantum);
        let slice = run_until - self.clock;
        if slice <= 0. {
            // degenerate slice: advance to the boundary without crediting work
            let boundary = next_arrival.unwrap_or(self.clock + 1.);
            self.meter.add_idle(boundary - self.clock, self.config.idle_power);
            self.clock = boundary;
            self.record_telemetry();
            return Step::Advanced;
        }

        let end = self.clock + slice;
        let task = &mut self.tasks[task_idx];
        task.record_start(self.clock);
        let work = slice * net_rate;
        task.consume(work, end);
        let id = task.id;
        let finished = task.is_finished();
        self.meter.add_busy(slice, level.power_w);
        match self.trace.last_mut() {
            Some(record) if record.task_id == id => record.duration += slice,
            _ => self.trace.push(ExecutionRecord {
                task_id: id,
                duration: slice,
            }),
        }
        debug!(
            "[{:.3}] task {} ran {:.3} ms at {} doing {:.3} ms of work",
            self.clock, id, slice, level.name, work
        );
        self.clock = end;
        if finished {
            debug!("[{:.3}] task {} finished", self.clock, id);
        }
        self.record_telemetry();
        Step::Advanced
    }

    /// Jumps the clock to the next arrival, accruing idle energy for the gap.
    fn idle_jump(&mut self) -> Step {
        match self.next_arrival_after(self.clock) {
            None => Step::Complete,
            Some(arrival) => {
                let gap = arrival - self.clock;
                self.meter.add_idle(gap, self.config.idle_power);
                debug!("[{:.3}] no ready task, idle jump to {:.3}", self.clock, arrival);
                self.clock = arrival;
                self.record_telemetry();
                Step::Advanced
            }
        }
    }

    fn ready_indices(&self) -> Vec<usize> {
        (0..self.tasks.len()).filter(|&i| self.tasks[i].is_ready(self.clock)).collect()
    }

    fn next_arrival_after(&self, time: f64) -> Option<f64> {
        self.tasks
            .iter()
            .filter(|t| t.arrival > time)
            .map(|t| t.arrival)
            .min_by(f64::total_cmp)
    }

    /// Appends one point to each tracked series at the current clock value.
    fn record_telemetry(&mut self) {
        let mut busy = 0.;
        let mut mem = 0.;
        for task in &self.tasks {
            if task.is_ready(self.clock) {
                busy += (1. - task.io_weight).max(0.);
                mem += task.mem_kb;
            }
        }
        let util = (100. * busy / (self.tasks.len() as f64).max(1.)).clamp(0., 100.);
        self.cpu_util_series.append(self.clock, util);
        self.mem_series.append(self.clock, mem);
    }

    fn emit_due_snapshots(&mut self) {
        while self.reporter.boundary_due(self.clock) {
            let snapshot = self.build_snapshot(self.reporter.next_boundary());
            for id in &snapshot.hotspots {
                debug!("[{:.3}] hotspot: task {}", snapshot.time, id);
            }
            self.reporter.record(snapshot);
        }
    }

    /// Assembles the analysis snapshot stamped with `at`, reading the current
    /// engine state.
    fn build_snapshot(&self, at: f64) -> Snapshot {
        let avg_cpu_util = analyzer::moving_average(&self.cpu_util_series, self.config.moving_avg_window);
        let trend = analyzer::linear_regression(&self.mem_series, self.config.regression_points);
        let mem_kb = self.mem_series.last_value();
        let forecast = analyzer::project_forecast(
            mem_kb,
            trend.slope,
            self.config.forecast_horizon,
            self.mem_series.max_observed(),
        );
        let mut order: Vec<usize> = (0..self.tasks.len()).collect();
        // stable descending sort, ties keep the original task order
        order.sort_by(|&a, &b| self.tasks[b].cpu_consumed().total_cmp(&self.tasks[a].cpu_consumed()));
        let top_consumers = order
            .iter()
            .take(TOP_CONSUMERS)
            .map(|&i| (self.tasks[i].id, self.tasks[i].cpu_consumed()))
            .collect();
        let hotspots = self
            .tasks
            .iter()
            .filter(|t| analyzer::is_hotspot(t))
            .map(|t| t.id)
            .collect();
        let classes = self
            .tasks
            .iter()
            .filter(|t| t.cpu_consumed() > 0.)
            .map(|t| (t.id, analyzer::classify(t)))
            .collect();
        Snapshot {
            time: at,
            avg_cpu_util,
            mem_kb,
            mem_slope: trend.slope,
            forecast_raw_kb: forecast.raw,
            forecast_kb: forecast.clamped,
            top_consumers,
            hotspots,
            classes,
            memory_pressure: forecast.clamped > MEMORY_PRESSURE_KB,
        }
    }
}
