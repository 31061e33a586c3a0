//! Rolling timings for the named phases of the authority loop

use super::ring_buffer::RingBuffer;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub struct PhaseProfiler {
    window: usize,
    phases: HashMap<&'static str, RingBuffer<Duration>>,
}

impl PhaseProfiler {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            phases: HashMap::new(),
        }
    }

    pub fn time_phase<F, R>(&mut self, name: &'static str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        let window = self.window;
        self.phases
            .entry(name)
            .or_insert_with(|| RingBuffer::new(window))
            .push(elapsed);
        result
    }

    pub fn average(&self, name: &str) -> Duration {
        self.phases
            .get(name)
            .map(RingBuffer::average)
            .unwrap_or(Duration::ZERO)
    }

    /// Slowest sample still in the window.
    pub fn max(&self, name: &str) -> Duration {
        self.phases
            .get(name)
            .map(RingBuffer::max)
            .unwrap_or(Duration::ZERO)
    }
}

impl Default for PhaseProfiler {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_samples_are_kept_per_name() {
        let mut profiler = PhaseProfiler::new(8);
        profiler.time_phase("sync", || ());
        profiler.time_phase("sync", || ());
        profiler.time_phase("cleanup", || ());

        assert_eq!(profiler.phases["sync"].len(), 2);
        assert_eq!(profiler.phases["cleanup"].len(), 1);
        assert!(!profiler.phases.contains_key("missing"));
        assert_eq!(profiler.average("missing"), Duration::ZERO);
        assert_eq!(profiler.max("missing"), Duration::ZERO);
        assert!(profiler.max("sync") >= profiler.average("sync"));
    }
}
