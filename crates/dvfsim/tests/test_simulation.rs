use approx::assert_abs_diff_eq;

use dvfsim::simulation::DvfsSimulation;
use dvfsim::speed::SpeedLevel;
use dvfsim::task::TaskRequest;
use dvfsim::trace::sample_workload;
use dvfsim::SimulationConfig;

/// Config with three identical unit-speed levels, so that speed selection
/// has no effect on timing and the scheduling behavior can be asserted exactly.
fn uniform_config() -> SimulationConfig {
    SimulationConfig {
        speed_levels: vec![
            SpeedLevel::new(1.0, 1.5, "uniform-0"),
            SpeedLevel::new(1.0, 1.5, "uniform-1"),
            SpeedLevel::new(1.0, 1.5, "uniform-2"),
        ],
        ..Default::default()
    }
}

#[test]
// Both tasks arrive at t=0 with bursts 100 and 50 ms and run at unit speed.
// SRTF completes the 50 ms task first (finish=50), then the 100 ms task
// (finish=150). Avg turnaround = (50 + 150) / 2 = 100, avg waiting =
// (0 + 50) / 2 = 25.
fn srtf_runs_shortest_task_first() {
    let mut sim = DvfsSimulation::new(uniform_config());
    let long = sim.add_task(TaskRequest::new(0., 100.));
    let short = sim.add_task(TaskRequest::new(0., 50.));
    let summary = sim.run();

    assert_eq!(sim.task(short).finish_time(), Some(50.));
    assert_eq!(sim.task(long).finish_time(), Some(150.));
    assert_eq!(summary.avg_turnaround, 100.);
    assert_eq!(summary.avg_waiting, 25.);
    assert_eq!(summary.makespan, 150.);
    assert_eq!(summary.finished_tasks, 2);
    assert_eq!(summary.cpu_utilization, 100.);
    // 150 ms busy at 1.5 W, no idle time
    assert_abs_diff_eq!(summary.total_energy, 0.225, epsilon = 1e-12);

    // consecutive slices of the same task are merged into one record
    let ids: Vec<u32> = summary.trace.iter().map(|r| r.task_id).collect();
    assert_eq!(ids, vec![short, long]);
    assert_abs_diff_eq!(summary.trace[0].duration, 50., epsilon = 1e-9);
    assert_abs_diff_eq!(summary.trace[1].duration, 100., epsilon = 1e-9);
}

#[test]
// Nothing is ready before t=20, so the clock must jump directly from 0 to 20
// and accrue idle energy for the gap: 0.2 W * 0.020 s, with no task executed
// in between.
fn idle_jump_to_first_arrival() {
    let mut sim = DvfsSimulation::new(uniform_config());
    let id = sim.add_task(TaskRequest::new(20., 10.));
    let summary = sim.run();

    assert_eq!(sim.task(id).start_time(), Some(20.));
    assert_eq!(summary.makespan, 30.);
    assert_eq!(sim.busy_time(), 10.);
    assert_eq!(summary.trace.len(), 1);
    // idle: 0.2 W * 0.020 s; busy: 1.5 W * 0.010 s
    assert_abs_diff_eq!(summary.total_energy, 0.2 * 0.020 + 1.5 * 0.010, epsilon = 1e-12);
}

#[test]
// A shorter task arriving mid-slice preempts at the arrival boundary:
// the long task runs [0, 10), the short one [10, 30), then the long resumes.
fn arrival_preempts_running_task() {
    let mut sim = DvfsSimulation::new(uniform_config());
    let long = sim.add_task(TaskRequest::new(0., 100.));
    let short = sim.add_task(TaskRequest::new(10., 20.));
    sim.run();

    assert_eq!(sim.task(short).start_time(), Some(10.));
    assert_eq!(sim.task(short).finish_time(), Some(30.));
    assert_eq!(sim.task(long).finish_time(), Some(120.));
}

#[test]
// Cumulative CPU consumed plus remaining work must equal the burst at any
// point, including when a run is cut off by the safety horizon with
// I/O-discounted progress.
fn work_is_conserved_under_horizon_cutoff() {
    let config = SimulationConfig {
        max_sim_time: 120.,
        ..uniform_config()
    };
    let mut sim = DvfsSimulation::new(config);
    sim.add_task(TaskRequest::with_profile(0., 500., 1000., 0.5));
    sim.add_task(TaskRequest::with_profile(0., 300., 2000., 0.25));
    let summary = sim.run();

    assert_eq!(summary.finished_tasks, 0);
    for task in sim.tasks() {
        assert_abs_diff_eq!(task.cpu_consumed() + task.remaining, task.burst, epsilon = 1e-9);
        assert_eq!(task.finish_time(), None);
    }
}

#[test]
// io_weight = 1 yields zero net progress per slice. Wall-clock time still
// advances by the full slice, so the safety horizon terminates the run.
fn pure_io_task_hits_safety_horizon() {
    let config = SimulationConfig {
        max_sim_time: 1000.,
        ..uniform_config()
    };
    let mut sim = DvfsSimulation::new(config);
    let id = sim.add_task(TaskRequest::with_profile(0., 100., 500., 1.0));
    let summary = sim.run();

    assert_eq!(summary.finished_tasks, 0);
    assert_eq!(sim.task(id).finish_time(), None);
    assert!(sim.time() > 1000.);
    assert_eq!(sim.task(id).remaining, 100.);
}

#[test]
// An idle jump spanning several reporting boundaries must emit one snapshot
// per crossed boundary (at 100, 200 and 300 ms here) plus the forced final
// snapshot at the run's true end time.
fn reporter_catches_up_over_idle_jump() {
    let mut sim = DvfsSimulation::new(uniform_config());
    sim.add_task(TaskRequest::new(350., 10.));
    sim.run();

    let times: Vec<f64> = sim.snapshots().iter().map(|s| s.time).collect();
    assert_eq!(times, vec![100., 200., 300., 360.]);
}

#[test]
// Equal CPU consumption keeps the original task order in the ranking.
fn top_consumer_ranking_is_stable() {
    let mut sim = DvfsSimulation::new(uniform_config());
    for i in 0..4 {
        sim.add_task(TaskRequest::new(i as f64 * 1000., 50.));
    }
    sim.run();

    let last = sim.snapshots().last().unwrap();
    let ids: Vec<u32> = last.top_consumers.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn telemetry_is_monotonic_and_bounded() {
    let mut sim = DvfsSimulation::new(SimulationConfig::default());
    sim.load(&sample_workload());
    let summary = sim.run();

    assert!(summary.total_energy > 0.);
    assert!(sim.busy_time() <= sim.time());
    for series in [sim.cpu_util_series(), sim.mem_series()] {
        for pair in series.points().windows(2) {
            assert!(pair[0].time <= pair[1].time);
        }
    }
    for point in sim.cpu_util_series().points() {
        assert!((0. ..=100.).contains(&point.value));
    }
}

#[test]
// The sample workload contains a long CPU-heavy task, so some periodic
// snapshot must flag a hotspot, and finished runs classify every consumer.
fn sample_workload_produces_analysis() {
    let mut sim = DvfsSimulation::new(SimulationConfig::default());
    sim.load(&sample_workload());
    let summary = sim.run();

    assert_eq!(summary.finished_tasks, 5);
    assert!(sim.snapshots().iter().any(|s| !s.hotspots.is_empty()));
    let last = sim.snapshots().last().unwrap();
    assert_eq!(last.classes.len(), 5);
    assert_eq!(last.top_consumers.len(), 3);
}

#[test]
// Re-running the same simulation resets all run-scoped state and reproduces
// identical results.
fn repeated_runs_are_deterministic() {
    let mut sim = DvfsSimulation::new(SimulationConfig::default());
    sim.load(&sample_workload());
    let first = sim.run();
    let second = sim.run();

    assert_eq!(first.avg_turnaround, second.avg_turnaround);
    assert_eq!(first.total_energy, second.total_energy);
    assert_eq!(first.makespan, second.makespan);
    assert_eq!(first.trace.len(), second.trace.len());
}

#[test]
fn csv_export_writes_one_row_per_snapshot() {
    let mut sim = DvfsSimulation::new(SimulationConfig::default());
    sim.load(&sample_workload());
    sim.run();

    let path = std::env::temp_dir().join("dvfsim_analysis_test.csv");
    sim.save_csv(&path.to_string_lossy()).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    let mut lines = content.lines();
    assert!(lines.next().unwrap().starts_with("time_ms,avg_cpu_util,mem_kb,slope_kb_per_ms,forecast_kb"));
    assert_eq!(lines.count(), sim.snapshots().len());
}
