//! Frame filtering: which call frames are worth a trace line.
//!
//! Naive instrumentation output is dominated by standard-library and
//! compiler-generated frames. The filter rejects them in two passes:
//!
//! 1. **Mangled-name prefixes** - Cheap, checked before any demangling
//!    - `_ZNSt`, `_ZSt`, `_ZNKSt` → libstdc++ `std::`
//!    - `_ZN3std`, `_ZNK3std` → libc++ `std::` (and Rust's `std`)
//!
//! 2. **Display-name prefixes** - Checked on the demangled name
//!    - `_GLOBAL__sub` → static initializers
//!    - `__gnu`, `__cxx` → runtime/ABI helpers
//!    - `dbg_internal` → internal debug helpers
//!    - `operator<` → comparison/stream operators that clutter output
//!
//! A rejected frame is skipped together with everything it calls; that
//! propagation is the call stack's job, not the filter's.

use std::rc::Rc;

use crate::symbolization::{Demangle, NameCache};

/// Outcome of filtering one raw symbol name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision<'f> {
    /// Trace the frame under this display name
    Trace(Rc<str>),
    /// The address had no symbol name
    Unresolved,
    /// Rejected by a mangled-name prefix, without demangling
    MangledPrefix(&'f str),
    /// Rejected by a display-name prefix
    DisplayPrefix { prefix: &'f str, display: Rc<str> },
}

impl FilterDecision<'_> {
    #[must_use]
    pub fn is_trace(&self) -> bool {
        matches!(self, FilterDecision::Trace(_))
    }
}

// =============================================================================
// DEFAULT DENYLISTS
// =============================================================================

/// Mangled prefixes of C++ standard library symbols
pub const DEFAULT_MANGLED_PREFIXES: &[&str] = &[
    "_ZNSt",    // libstdc++ std::
    "_ZN3std",  // libc++ std::
    "_ZSt",     // std helper
    "_ZNKSt",   // libstdc++ const member
    "_ZNK3std", // libc++ const member
];

/// Display-name prefixes of compiler-generated and runtime frames
pub const DEFAULT_DISPLAY_PREFIXES: &[&str] =
    &["_GLOBAL__sub", "__gnu", "__cxx", "dbg_internal", "operator<"];

// =============================================================================
// FILTER
// =============================================================================

/// Prefix denylists applied to every resolved frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolFilter {
    mangled_prefixes: Vec<String>,
    display_prefixes: Vec<String>,
}

impl Default for SymbolFilter {
    fn default() -> Self {
        Self {
            mangled_prefixes: DEFAULT_MANGLED_PREFIXES.iter().map(|p| (*p).to_string()).collect(),
            display_prefixes: DEFAULT_DISPLAY_PREFIXES.iter().map(|p| (*p).to_string()).collect(),
        }
    }
}

impl SymbolFilter {
    /// A filter that rejects only unresolved frames.
    #[must_use]
    pub fn empty() -> Self {
        Self { mangled_prefixes: Vec::new(), display_prefixes: Vec::new() }
    }

    #[must_use]
    pub fn with_mangled_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.push_unique_mangled(prefix.into());
        self
    }

    #[must_use]
    pub fn with_display_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.push_unique_display(prefix.into());
        self
    }

    /// Add several prefixes of each kind; empty strings are ignored since they
    /// would reject every frame.
    pub fn extend<M, D>(&mut self, mangled: M, display: D)
    where
        M: IntoIterator<Item = String>,
        D: IntoIterator<Item = String>,
    {
        for prefix in mangled {
            self.push_unique_mangled(prefix);
        }
        for prefix in display {
            self.push_unique_display(prefix);
        }
    }

    fn push_unique_mangled(&mut self, prefix: String) {
        if !prefix.is_empty() && !self.mangled_prefixes.contains(&prefix) {
            self.mangled_prefixes.push(prefix);
        }
    }

    fn push_unique_display(&mut self, prefix: String) {
        if !prefix.is_empty() && !self.display_prefixes.contains(&prefix) {
            self.display_prefixes.push(prefix);
        }
    }

    #[must_use]
    pub fn mangled_prefixes(&self) -> &[String] {
        &self.mangled_prefixes
    }

    #[must_use]
    pub fn display_prefixes(&self) -> &[String] {
        &self.display_prefixes
    }

    /// Decide whether a frame named `raw` is traced.
    ///
    /// The only side effect is populating `cache` when the mangled pass lets
    /// the name through.
    pub fn decide<D: Demangle>(&self, raw: Option<&str>, cache: &mut NameCache<D>) -> FilterDecision<'_> {
        let Some(raw) = raw else {
            return FilterDecision::Unresolved;
        };

        if let Some(prefix) = find_prefix(&self.mangled_prefixes, raw) {
            return FilterDecision::MangledPrefix(prefix);
        }

        let display = cache.resolve_display_name(raw);
        if let Some(prefix) = find_prefix(&self.display_prefixes, &display) {
            return FilterDecision::DisplayPrefix { prefix, display };
        }

        FilterDecision::Trace(display)
    }

    pub fn should_trace<D: Demangle>(&self, raw: Option<&str>, cache: &mut NameCache<D>) -> bool {
        self.decide(raw, cache).is_trace()
    }
}

fn find_prefix<'f>(prefixes: &'f [String], name: &str) -> Option<&'f str> {
    prefixes.iter().map(String::as_str).find(|prefix| name.starts_with(prefix))
}
