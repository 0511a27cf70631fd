//! Named interval timer used to benchmark request phases
//!
//! One [`Timer`] lives for exactly one request. Intervals are keyed by name;
//! starting a name again replaces the previous interval, so each name has at
//! most one interval at any time.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

/// Request phase names recorded by the dispatcher
pub mod phase {
    pub const TOTAL_EXECUTION: &str = "total_execution";
    pub const BOOTSTRAP: &str = "bootstrap";
    pub const ROUTING: &str = "routing";
    pub const CONTROLLER: &str = "controller";
    pub const CONTROLLER_CONSTRUCTOR: &str = "controller_constructor";
}

#[derive(Debug, Clone, Copy)]
struct Interval {
    start: Instant,
    end: Option<Instant>,
}

impl Interval {
    fn elapsed(&self) -> Duration {
        match self.end {
            Some(end) => end.saturating_duration_since(self.start),
            None => self.start.elapsed(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Timer {
    intervals: HashMap<String, Interval>,
    order: Vec<String>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) the interval called `name`
    pub fn start(&mut self, name: &str) {
        self.start_at(name, Instant::now());
    }

    /// Start the interval at an instant captured earlier
    pub fn start_at(&mut self, name: &str, at: Instant) {
        if !self.intervals.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.intervals
            .insert(name.to_string(), Interval { start: at, end: None });
    }

    /// Stop the interval. Returns `false` if it was never started.
    pub fn stop(&mut self, name: &str) -> bool {
        match self.intervals.get_mut(name) {
            Some(interval) => {
                interval.end = Some(Instant::now());
                true
            }
            None => {
                log::debug!("Timer '{name}' stopped before it was started");
                false
            }
        }
    }

    /// Elapsed time of the interval; a running interval reports time so far
    pub fn elapsed(&self, name: &str) -> Option<Duration> {
        self.intervals.get(name).map(Interval::elapsed)
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.intervals
            .get(name)
            .is_some_and(|interval| interval.end.is_none())
    }

    pub fn has(&self, name: &str) -> bool {
        self.intervals.contains_key(name)
    }

    /// All recorded intervals in the order they were first started
    pub fn timers(&self) -> Vec<(&str, Duration)> {
        self.order
            .iter()
            .filter_map(|name| {
                self.intervals
                    .get(name)
                    .map(|interval| (name.as_str(), interval.elapsed()))
            })
            .collect()
    }
}

/// Seconds with four decimals, the format used for `{elapsed_time}`
pub fn format_seconds(duration: Duration) -> String {
    format!("{:.4}", duration.as_secs_f64())
}
