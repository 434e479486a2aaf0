//! Profiling core modules
//!
//! This module contains the per-thread machinery behind the hooks:
//! - Call stack tracking (enter/exit pairing, skip propagation, overflow)
//! - Trace line rendering and the output sink
//! - Monotonic clock
//! - Process-wide anomaly counters

pub mod call_stack;
pub mod clock;
pub mod diagnostics;
pub mod line_format;

// Re-export common types
pub use call_stack::{CallTracker, ThreadTracker, TrackerStats, MAX_DEPTH};
pub use clock::{Clock, MonotonicClock};
pub use diagnostics::{diagnostics, log_summary_at_exit, DiagnosticsSnapshot, TraceDiagnostics};
pub use line_format::{LineBuffer, LineSink, StderrSink, LINE_CAPACITY};
