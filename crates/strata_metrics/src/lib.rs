//! Strata Metrics - counters and phase timings for the streaming loop
//!
//! Everything here compiles down to empty stubs unless the `metrics`
//! feature is enabled, so the authority loop can stay instrumented in
//! shipping builds at no cost.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use strata_metrics::{OpCounter, OpKind, PhaseProfiler};
//!
//! let mut ops = OpCounter::new();
//! let mut phases = PhaseProfiler::new(32);
//! phases.time_phase("sync", || ops.record(OpKind::Add, 16));
//! println!("adds: {}", ops.get(OpKind::Add));
//! ```

#[cfg(feature = "metrics")]
mod counter;
#[cfg(feature = "metrics")]
mod phase_profiler;
#[cfg(feature = "metrics")]
mod ring_buffer;

#[cfg(feature = "metrics")]
pub use counter::OpCounter;
#[cfg(feature = "metrics")]
pub use phase_profiler::PhaseProfiler;
#[cfg(feature = "metrics")]
pub use ring_buffer::RingBuffer;

/// Kinds of work the authority loop reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Add,
    Remove,
    Clear,
    SyncStep,
    CleanupStep,
}

impl OpKind {
    pub const ALL: [OpKind; 5] = [
        OpKind::Add,
        OpKind::Remove,
        OpKind::Clear,
        OpKind::SyncStep,
        OpKind::CleanupStep,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OpKind::Add => "add",
            OpKind::Remove => "remove",
            OpKind::Clear => "clear",
            OpKind::SyncStep => "sync_step",
            OpKind::CleanupStep => "cleanup_step",
        }
    }

    #[allow(dead_code)]
    fn slot(self) -> usize {
        self as usize
    }
}

// ============================================================================
// Macros for conditional compilation
// ============================================================================

/// Time a loop phase (zero-cost when metrics disabled)
#[macro_export]
macro_rules! time_phase {
    ($profiler:expr, $name:expr, $body:block) => {{
        #[cfg(feature = "metrics")]
        {
            $profiler.time_phase($name, || $body)
        }
        #[cfg(not(feature = "metrics"))]
        {
            $body
        }
    }};
}

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct OpCounter;

#[cfg(not(feature = "metrics"))]
impl OpCounter {
    pub fn new() -> Self { Self }
    pub fn record(&mut self, _kind: OpKind, _count: u64) {}
    pub fn get(&self, _kind: OpKind) -> u64 { 0 }
    pub fn reset(&mut self) {}
}

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct PhaseProfiler;

#[cfg(not(feature = "metrics"))]
impl PhaseProfiler {
    pub fn new(_window: usize) -> Self { Self }
    pub fn time_phase<F, R>(&mut self, _name: &'static str, f: F) -> R where F: FnOnce() -> R { f() }
    pub fn average(&self, _name: &str) -> std::time::Duration { std::time::Duration::ZERO }
    pub fn max(&self, _name: &str) -> std::time::Duration { std::time::Duration::ZERO }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_kind_names_are_unique() {
        let mut names: Vec<_> = OpKind::ALL.iter().map(|k| k.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), OpKind::ALL.len());
    }

    #[test]
    fn test_time_phase_returns_body_value() {
        let mut profiler = PhaseProfiler::new(4);
        let value = time_phase!(profiler, "sync", { 2 + 3 });
        assert_eq!(value, 5);
    }
}
