//! Per-thread call stack: pairs every exit with its entry
//!
//! The tracker owns a fixed array of frames indexed by depth. `enter` decides
//! once whether the frame is traced and records that decision in the frame;
//! `exit` pops the frame and replays the decision without re-resolving
//! anything. A skipped frame makes every frame nested under it skipped too,
//! until its own exit.
//!
//! ## Overflow
//!
//! Entries arriving with the array full are not stored. They bump a separate
//! overflow counter instead and emit nothing; exits drain that counter before
//! touching the array, so pairing stays balanced once the program unwinds
//! back under the limit.
//!
//! ## Underflow
//!
//! An exit with nothing to pop (hooks installed mid-call, or an instrumentation
//! contract violation) is counted and otherwise ignored.

use log::{debug, trace};
use std::rc::Rc;
use std::sync::Arc;

use crate::classification::{FilterDecision, SymbolFilter};
use crate::config::TracerConfig;
use crate::domain::{Address, Elapsed};
use crate::symbolization::{Demangle, DlAddrResolver, NameCache, SymbolDemangler, SymbolSource};

use super::clock::{Clock, MonotonicClock};
use super::diagnostics::diagnostics;
use super::line_format::{LineBuffer, LineSink, StderrSink};

/// Default stack capacity per thread.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Default, Clone)]
struct CallFrame {
    address: Address,
    name: Option<Rc<str>>,
    start_ns: u64,
    skip: bool,
}

/// Counters for one thread's tracker.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TrackerStats {
    pub entered: u64,
    pub traced: u64,
    pub skipped: u64,
    pub overflowed: u64,
    pub underflows: u64,
    pub mismatched_exits: u64,
    pub truncated_lines: u64,
}

pub struct CallTracker<R, D, C, S> {
    resolver: R,
    cache: NameCache<D>,
    filter: Arc<SymbolFilter>,
    clock: C,
    sink: S,
    frames: Box<[CallFrame]>,
    depth: usize,
    /// Entries past capacity still waiting for their exit
    overflow: usize,
    line: LineBuffer,
    stats: TrackerStats,
}

/// The tracker the hooks install on every thread.
pub type ThreadTracker = CallTracker<DlAddrResolver, SymbolDemangler, MonotonicClock, StderrSink>;

impl ThreadTracker {
    #[must_use]
    pub fn from_config(config: &TracerConfig) -> Self {
        CallTracker::new(
            DlAddrResolver::new(config.symtab_fallback),
            SymbolDemangler,
            Arc::clone(&config.filter),
            MonotonicClock,
            StderrSink,
            config.max_depth,
        )
    }
}

impl<R, D, C, S> CallTracker<R, D, C, S>
where
    R: SymbolSource,
    D: Demangle,
    C: Clock,
    S: LineSink,
{
    /// Create a tracker holding at most `max_depth` frames (at least one).
    #[must_use]
    pub fn new(resolver: R, demangler: D, filter: Arc<SymbolFilter>, clock: C, sink: S, max_depth: usize) -> Self {
        Self {
            resolver,
            cache: NameCache::new(demangler),
            filter,
            clock,
            sink,
            frames: vec![CallFrame::default(); max_depth.max(1)].into_boxed_slice(),
            depth: 0,
            overflow: 0,
            line: LineBuffer::new(),
            stats: TrackerStats::default(),
        }
    }

    /// A function at `address` was entered.
    pub fn enter(&mut self, address: Address) {
        self.stats.entered += 1;

        if self.depth >= self.frames.len() {
            if self.overflow == 0 {
                debug!("Call depth limit {} reached at {address}, skipping deeper frames", self.frames.len());
            }
            self.overflow = self.overflow.saturating_add(1);
            self.stats.overflowed += 1;
            diagnostics().record_overflow();
            return;
        }

        let depth = self.depth;
        let inherited_skip = depth > 0 && self.frames[depth - 1].skip;
        let name = if inherited_skip { None } else { self.admit(address) };

        let frame = &mut self.frames[depth];
        frame.address = address;
        self.depth += 1;

        let Some(name) = name else {
            frame.skip = true;
            frame.name = None;
            self.stats.skipped += 1;
            return;
        };

        frame.skip = false;
        frame.start_ns = self.clock.now_ns();
        let line = self.line.entry(depth, Some(&*name));
        self.sink.write_line(line);
        frame.name = Some(name);

        self.stats.traced += 1;
        self.note_truncation();
    }

    /// The most recently entered, still active function returned.
    ///
    /// `address` is only cross-checked against the entry; pass
    /// `Address(0)` when it is unknown.
    pub fn exit(&mut self, address: Address) {
        if self.overflow > 0 {
            self.overflow -= 1;
            return;
        }

        if self.depth == 0 {
            self.stats.underflows += 1;
            if self.stats.underflows == 1 {
                debug!("Exit from {address} with no matching entry");
            }
            diagnostics().record_underflow();
            return;
        }

        self.depth -= 1;
        let depth = self.depth;
        let frame = &mut self.frames[depth];

        if !address.is_null() && frame.address != address {
            self.stats.mismatched_exits += 1;
            if self.stats.mismatched_exits == 1 {
                debug!("Exit from {address} paired with entry at {}", frame.address);
            }
            diagnostics().record_mismatched_exit();
        }

        if frame.skip {
            frame.skip = false;
            return;
        }

        let elapsed = Elapsed::between(frame.start_ns, self.clock.now_ns());
        let name = frame.name.take();
        let line = self.line.exit(depth, name.as_deref(), elapsed);
        self.sink.write_line(line);

        self.note_truncation();
    }

    /// Resolve and filter a frame; `Some` carries the display name to trace under.
    fn admit(&mut self, address: Address) -> Option<Rc<str>> {
        let symbol = match self.resolver.resolve(address) {
            Ok(symbol) => symbol,
            Err(e) => {
                trace!("Not tracing {address}: {e}");
                return None;
            }
        };

        match self.filter.decide(Some(&symbol.name), &mut self.cache) {
            FilterDecision::Trace(display) => Some(display),
            _ => None,
        }
    }

    fn note_truncation(&mut self) {
        if self.line.truncated() {
            self.stats.truncated_lines += 1;
            diagnostics().record_truncation();
        }
    }

    /// Number of frames currently held (excluding overflowed entries).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Entries past capacity that have not exited yet.
    #[must_use]
    pub fn overflow_depth(&self) -> usize {
        self.overflow
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn stats(&self) -> TrackerStats {
        self.stats
    }

    #[must_use]
    pub fn cache(&self) -> &NameCache<D> {
        &self.cache
    }

    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
