//! Run performance record
//!
//! Captures the outcome of one propagation run: iterations completed, total
//! wall time, and an ordered breakdown of named moments (`setup`,
//! `iterations`, `finalize`).

use std::time::Duration;

/// Timing and iteration summary of one propagation run
#[derive(Debug, Clone, Default)]
pub struct PerformanceRecord {
    iterations_completed: usize,
    total_time: Duration,
    moments: Vec<(String, Duration)>,
}

impl PerformanceRecord {
    /// Create an empty record
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of iterations the run performed
    #[must_use]
    pub const fn iterations_completed(&self) -> usize {
        self.iterations_completed
    }

    /// Total wall time of the run
    #[must_use]
    pub const fn total_time(&self) -> Duration {
        self.total_time
    }

    /// Total wall time in milliseconds
    #[must_use]
    pub fn total_time_ms(&self) -> f64 {
        self.total_time.as_secs_f64() * 1e3
    }

    /// Ordered `(label, duration)` breakdown
    #[must_use]
    pub fn moments(&self) -> &[(String, Duration)] {
        &self.moments
    }

    /// Duration of the first moment recorded under `label`, if any
    #[must_use]
    pub fn moment(&self, label: &str) -> Option<Duration> {
        self.moments
            .iter()
            .find(|(name, _)| name == label)
            .map(|&(_, d)| d)
    }

    pub(crate) fn add_moment(&mut self, label: &str, duration: Duration) {
        self.moments.push((label.to_string(), duration));
    }

    pub(crate) fn set_iterations(&mut self, iterations: usize) {
        self.iterations_completed = iterations;
    }

    pub(crate) fn set_total_time(&mut self, total: Duration) {
        self.total_time = total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moments_keep_insertion_order() {
        let mut record = PerformanceRecord::new();
        record.add_moment("setup", Duration::from_millis(3));
        record.add_moment("iterations", Duration::from_millis(40));
        record.add_moment("finalize", Duration::from_millis(1));
        record.set_iterations(12);
        record.set_total_time(Duration::from_millis(44));

        let labels: Vec<&str> = record.moments().iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, ["setup", "iterations", "finalize"]);
        assert_eq!(record.moment("iterations"), Some(Duration::from_millis(40)));
        assert_eq!(record.moment("missing"), None);
        assert_eq!(record.iterations_completed(), 12);
        assert!((record.total_time_ms() - 44.0).abs() < f64::EPSILON);
    }
}
