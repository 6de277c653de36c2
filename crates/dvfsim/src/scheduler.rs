//! Task selection policies.

use crate::task::Task;

/// Scheduler chooses the next task to dispatch from the ready set.
pub trait Scheduler {
    /// Returns the index of the chosen task within `ready`,
    /// or `None` if the ready set is empty.
    fn select(&self, ready: &[&Task]) -> Option<usize>;

    fn name(&self) -> String {
        "unnamed scheduler".to_string()
    }
}

/// Shortest-remaining-time-first policy.
///
/// Among the ready tasks the one with minimum remaining work is chosen.
/// Ties are broken in favor of the task encountered first in the ready set's
/// iteration order, which is stable with respect to task insertion order.
#[derive(Default)]
pub struct SrtfScheduler {}

impl SrtfScheduler {
    pub fn new() -> Self {
        Self {}
    }
}

impl Scheduler for SrtfScheduler {
    fn select(&self, ready: &[&Task]) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, task) in ready.iter().enumerate() {
            match best {
                Some(b) if task.remaining >= ready[b].remaining => {}
                _ => best = Some(i),
            }
        }
        best
    }

    fn name(&self) -> String {
        "SRTF".to_string()
    }
}
