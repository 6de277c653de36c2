use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use log::error;

use dvfsim::report::{RunSummary, Snapshot};
use dvfsim::simulation::DvfsSimulation;
use dvfsim::trace::{load_trace, random_workload, sample_workload};
use dvfsim::SimulationConfig;

#[derive(Parser)]
#[command(about, long_about = None)]
/// Runs a DVFS scheduling simulation over a task trace
struct Args {
    /// Path to a trace file with one task per line: arrival burst [mem_kb io_weight].
    /// The built-in sample workload is used when omitted.
    trace: Option<PathBuf>,

    /// Path to YAML file with simulation configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to produced CSV file with the periodic analysis record
    #[arg(short, long, default_value = "analysis.csv")]
    output: PathBuf,

    /// Generate a random workload of this size instead of reading a trace file
    #[arg(long)]
    random_tasks: Option<usize>,

    /// Seed for the random workload generator
    #[arg(long, default_value_t = 123)]
    seed: u64,
}

fn init_logger() {
    use env_logger::Builder;
    use std::io::Write;
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

fn print_snapshot(sim: &DvfsSimulation, snapshot: &Snapshot) {
    println!("\n--- Analysis at t={} ms ---", snapshot.time.round() as i64);
    println!("Top CPU consumers:");
    for (id, cpu_ms) in &snapshot.top_consumers {
        let task = sim.task(*id);
        println!(
            "  P{} cpu_ms={} mem={} io={}",
            id,
            cpu_ms.round() as i64,
            task.mem_kb.round() as i64,
            task.io_weight
        );
    }
    println!("Avg CPU util (recent) = {:.2}%", snapshot.avg_cpu_util);
    println!(
        "Memory slope = {:.4} kb/ms, forecast = {} kb",
        snapshot.mem_slope,
        snapshot.forecast_kb.round() as i64
    );
    if snapshot.memory_pressure {
        println!("Warning: projected memory > 1GB, suggest reducing the working set.");
    }
    for id in &snapshot.hotspots {
        let task = sim.task(*id);
        println!(
            "Hotspot detected: P{} (cpu_ms={}, rem={} ms), consider lowering its priority",
            id,
            task.cpu_consumed().round() as i64,
            task.remaining.round() as i64
        );
    }
    for (id, class) in &snapshot.classes {
        println!("P{} classified: {}", id, class);
    }
}

fn print_summary(summary: &RunSummary) {
    println!("\n===== Simulation Results =====");
    println!("Processes: {} ({} finished)", summary.tasks.len(), summary.finished_tasks);
    println!("Avg Turnaround (ms): {:.3}", summary.avg_turnaround);
    println!("Avg Waiting (ms): {:.3}", summary.avg_waiting);
    println!("Makespan (ms): {:.3}", summary.makespan);
    println!("Total Energy (J): {:.3}", summary.total_energy);
    println!("CPU Utilization (%): {:.3}", summary.cpu_utilization);

    println!("\nExecution trace (pid:duration_ms):");
    let trace: Vec<String> = summary
        .trace
        .iter()
        .map(|r| format!("[P{}:{}ms]", r.task_id, r.duration.round() as i64))
        .collect();
    println!("{}", trace.join(" "));

    println!("\nDetailed per-process:");
    for task in &summary.tasks {
        let fmt = |v: Option<f64>| v.map_or("-".to_string(), |t| format!("{:.1}", t));
        println!(
            "P{} arrival={} burst={} start={} finish={} cpu_ms={}",
            task.id,
            task.arrival,
            task.burst,
            fmt(task.start_time),
            fmt(task.finish_time),
            task.cpu_consumed.round() as i64
        );
    }
}

fn main() {
    init_logger();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SimulationConfig::from_file(&path.to_string_lossy()),
        None => SimulationConfig::default(),
    };

    let requests = if let Some(count) = args.random_tasks {
        random_workload(args.seed, count)
    } else if let Some(path) = &args.trace {
        match load_trace(path) {
            Ok(requests) => requests,
            Err(e) => {
                error!("cannot load trace {}: {}", path.display(), e);
                exit(1);
            }
        }
    } else {
        println!("No trace file given, using the built-in sample workload.");
        sample_workload()
    };

    let mut sim = DvfsSimulation::new(config);
    sim.load(&requests);
    let summary = sim.run();

    for snapshot in sim.snapshots() {
        print_snapshot(&sim, snapshot);
    }
    print_summary(&summary);

    if let Err(e) = sim.save_csv(&args.output.to_string_lossy()) {
        error!("cannot write CSV to {}: {}", args.output.display(), e);
        exit(1);
    }
    println!("\nSimulation finished. CSV saved to {}.", args.output.display());
}
