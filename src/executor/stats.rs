/*!
 * Executor Statistics
 * Atomic counters updated on spawn and on each task's terminal transition
 */

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of executor activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutorStats {
    /// Tasks accepted since start
    pub spawned: u64,

    /// Tasks that completed with a value
    pub completed: u64,

    /// Tasks that returned an error or panicked
    pub failed: u64,

    /// Tasks cancelled or dropped before producing a result
    pub cancelled: u64,

    /// Tasks not yet terminal
    pub in_flight: u64,

    /// Highest in-flight count observed
    pub peak_in_flight: u64,
}

impl ExecutorStats {
    /// Tasks that reached a terminal state
    pub fn finished(&self) -> u64 {
        self.completed + self.failed + self.cancelled
    }

    /// Fraction of finished tasks that completed successfully
    pub fn success_ratio(&self) -> Option<f64> {
        match self.finished() {
            0 => None,
            n => Some(self.completed as f64 / n as f64),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    spawned: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    peak_in_flight: AtomicU64,
}

/// How a task left the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Settlement {
    Completed,
    Failed,
    Cancelled,
}

impl StatsCounters {
    pub(crate) fn record_spawn(&self, in_flight: usize) {
        self.spawned.fetch_add(1, Ordering::Relaxed);
        self.peak_in_flight
            .fetch_max(in_flight as u64, Ordering::Relaxed);
    }

    pub(crate) fn record(&self, settlement: Settlement) {
        let counter = match settlement {
            Settlement::Completed => &self.completed,
            Settlement::Failed => &self.failed,
            Settlement::Cancelled => &self.cancelled,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, in_flight: usize) -> ExecutorStats {
        ExecutorStats {
            spawned: self.spawned.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            in_flight: in_flight as u64,
            peak_in_flight: self.peak_in_flight.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_ratio() {
        let counters = StatsCounters::default();
        counters.record_spawn(1);
        counters.record_spawn(2);
        counters.record_spawn(1);
        counters.record(Settlement::Completed);
        counters.record(Settlement::Completed);
        counters.record(Settlement::Failed);

        let stats = counters.snapshot(0);
        assert_eq!(stats.spawned, 3);
        assert_eq!(stats.peak_in_flight, 2);
        assert_eq!(stats.finished(), 3);
        let ratio = stats.success_ratio().unwrap();
        assert!((ratio - 2.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_ratio() {
        assert_eq!(ExecutorStats::default().success_ratio(), None);
    }

    #[test]
    fn test_serializes_to_json() {
        let stats = StatsCounters::default().snapshot(4);
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["in_flight"], 4);
    }
}
