//! Process-wide counters for tracing anomalies
//!
//! None of these conditions stop tracing; they only mean some lines were
//! omitted or shortened. Each thread's tracker keeps its own exact numbers
//! (see `TrackerStats`); these totals aggregate them across threads so an
//! embedding application can check them once, e.g. at exit.

use log::{info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

#[derive(Debug, Default)]
pub struct TraceDiagnostics {
    /// Entries beyond the stack capacity (forced-skip)
    overflows: AtomicU64,
    /// Exits with no matching entry
    underflows: AtomicU64,
    /// Lines cut to the line buffer capacity
    truncated_lines: AtomicU64,
    /// Exits whose address differs from the entry they were paired with
    mismatched_exits: AtomicU64,
}

/// Point-in-time copy of [`TraceDiagnostics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    pub overflows: u64,
    pub underflows: u64,
    pub truncated_lines: u64,
    pub mismatched_exits: u64,
}

impl TraceDiagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_overflow(&self) {
        self.overflows.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_underflow(&self) {
        self.underflows.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_truncation(&self) {
        self.truncated_lines.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_mismatched_exit(&self) {
        self.mismatched_exits.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            overflows: self.overflows.load(Ordering::Relaxed),
            underflows: self.underflows.load(Ordering::Relaxed),
            truncated_lines: self.truncated_lines.load(Ordering::Relaxed),
            mismatched_exits: self.mismatched_exits.load(Ordering::Relaxed),
        }
    }

    /// Log the totals if anything was recorded.
    pub fn log_summary(&self) {
        let snap = self.snapshot();
        if snap == DiagnosticsSnapshot::default() {
            return;
        }
        info!(
            "calltrace diagnostics: overflows={} underflows={} truncated_lines={} mismatched_exits={}",
            snap.overflows, snap.underflows, snap.truncated_lines, snap.mismatched_exits
        );
    }
}

static DIAGNOSTICS: OnceLock<TraceDiagnostics> = OnceLock::new();

/// Log the global totals when the process exits normally. Registers once.
#[allow(unsafe_code)]
pub fn log_summary_at_exit() {
    static REGISTERED: OnceLock<()> = OnceLock::new();

    extern "C" fn summary() {
        diagnostics().log_summary();
    }

    REGISTERED.get_or_init(|| {
        // SAFETY: `summary` takes no arguments and touches only 'static state.
        if unsafe { libc::atexit(summary) } != 0 {
            warn!("Could not register the exit-time diagnostics summary");
        }
    });
}

/// Get the global tracing diagnostics.
pub fn diagnostics() -> &'static TraceDiagnostics {
    DIAGNOSTICS.get_or_init(TraceDiagnostics::new)
}
