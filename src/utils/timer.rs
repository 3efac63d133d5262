//! Timer utilities
//!
//! Measures individual tests and the phases of a run.

use std::time::{Duration, Instant};
use tracing::debug;

/// Elapsed-time measurement for a single test
#[derive(Debug)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }
}

/// Records how long each phase of a run (setup, tests, report) took
#[derive(Debug)]
pub struct PhaseTimer {
    start: Instant,
    last: Instant,
    phases: Vec<(&'static str, Duration)>,
}

impl PhaseTimer {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            phases: Vec::new(),
        }
    }

    /// Close the current phase under `name`
    pub fn finish(&mut self, name: &'static str) -> Duration {
        let now = Instant::now();
        let spent = now - self.last;
        self.last = now;
        self.phases.push((name, spent));
        debug!("Phase {} took {}ms", name, spent.as_millis());
        spent
    }

    pub fn phases(&self) -> &[(&'static str, Duration)] {
        &self.phases
    }

    pub fn total(&self) -> Duration {
        self.start.elapsed()
    }

    /// One line per phase plus the total
    pub fn format(&self) -> String {
        let mut output = String::new();
        for (name, spent) in &self.phases {
            output.push_str(&format!("{}: {}ms\n", name, spent.as_millis()));
        }
        output.push_str(&format!("Total: {}ms", self.total().as_millis()));
        output
    }
}

impl Default for PhaseTimer {
    fn default() -> Self {
        Self::new()
    }
}
