//! Workload sources: trace files, a fixed sample jobset and a random generator.

use std::io::{Error, ErrorKind};
use std::path::Path;

use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg64;

use crate::task::TaskRequest;

/// Loads a task trace from a whitespace-separated text file.
///
/// Each non-empty line holds either `arrival burst` or
/// `arrival burst mem_kb io_weight` (all in ms/kb, io_weight in [0, 1]);
/// lines starting with `#` are skipped. Malformed lines are rejected with
/// `InvalidData` before any task reaches the engine.
pub fn load_trace<P: AsRef<Path>>(path: P) -> Result<Vec<TaskRequest>, Error> {
    let content = std::fs::read_to_string(path)?;
    let mut requests = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields = line
            .split_whitespace()
            .map(|field| field.parse::<f64>())
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|e| invalid_line(lineno, &e.to_string()))?;
        let request = match fields[..] {
            [arrival, burst] => TaskRequest::new(arrival, burst),
            [arrival, burst, mem_kb, io_weight] => TaskRequest::with_profile(arrival, burst, mem_kb, io_weight),
            _ => return Err(invalid_line(lineno, "expected 2 or 4 columns")),
        };
        validate(lineno, &request)?;
        requests.push(request);
    }
    Ok(requests)
}

fn validate(lineno: usize, request: &TaskRequest) -> Result<(), Error> {
    if request.arrival < 0. {
        return Err(invalid_line(lineno, "arrival time must be non-negative"));
    }
    if request.burst <= 0. {
        return Err(invalid_line(lineno, "burst must be positive"));
    }
    if request.mem_kb < 0. {
        return Err(invalid_line(lineno, "memory footprint must be non-negative"));
    }
    if !(0. ..=1.).contains(&request.io_weight) {
        return Err(invalid_line(lineno, "io_weight must lie in [0, 1]"));
    }
    Ok(())
}

fn invalid_line(lineno: usize, reason: &str) -> Error {
    Error::new(ErrorKind::InvalidData, format!("trace line {}: {}", lineno + 1, reason))
}

/// Built-in illustrative jobset with mixed CPU/IO profiles.
pub fn sample_workload() -> Vec<TaskRequest> {
    vec![
        TaskRequest::with_profile(0., 200., 20000., 0.1),
        TaskRequest::with_profile(20., 80., 10000., 0.7),
        TaskRequest::with_profile(40., 150., 50000., 0.2),
        TaskRequest::with_profile(100., 400., 120000., 0.05),
        TaskRequest::with_profile(250., 60., 8000., 0.8),
    ]
}

/// Generates `count` tasks with illustrative arrival/burst/footprint ranges.
/// Deterministic for a given seed.
pub fn random_workload(seed: u64, count: usize) -> Vec<TaskRequest> {
    let mut rand = Pcg64::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            TaskRequest::with_profile(
                rand.gen_range(0.0..500.0),
                rand.gen_range(20.0..400.0),
                rand.gen_range(5_000.0..100_000.0),
                rand.gen_range(0.0..0.9),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_workload_is_deterministic() {
        let a = random_workload(42, 10);
        let b = random_workload(42, 10);
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);
        for request in &a {
            assert!(request.burst > 0.);
            assert!((0. ..1.).contains(&request.io_weight));
        }
    }

    #[test]
    fn sample_workload_is_well_formed() {
        for request in sample_workload() {
            assert!(request.arrival >= 0.);
            assert!(request.burst > 0.);
            assert!((0. ..=1.).contains(&request.io_weight));
        }
    }
}
