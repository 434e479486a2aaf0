//! Per-thread memo of raw symbol name → display name
//!
//! Demangling is the expensive step of naming a frame, so every raw name is
//! demangled at most once per cache. Entries are never replaced or evicted:
//! a raw name always demangles to the same text. Values are `Rc<str>` handles
//! so call frames can hold the name without copying it and without borrowing
//! the map.

use std::collections::HashMap;
use std::rc::Rc;

use super::demangle::{Demangle, SymbolDemangler};

pub struct NameCache<D = SymbolDemangler> {
    demangler: D,
    entries: HashMap<Box<str>, Rc<str>>,
}

impl<D: Demangle> NameCache<D> {
    #[must_use]
    pub fn new(demangler: D) -> Self {
        Self { demangler, entries: HashMap::new() }
    }

    /// Display name for `raw`, demangling on first sight.
    ///
    /// Never fails: a name the demangler rejects is returned as-is.
    pub fn resolve_display_name(&mut self, raw: &str) -> Rc<str> {
        if let Some(display) = self.entries.get(raw) {
            return Rc::clone(display);
        }

        let display: Rc<str> = match self.demangler.demangle(raw) {
            Some(demangled) => Rc::from(demangled),
            None => Rc::from(raw),
        };
        self.entries.insert(Box::from(raw), Rc::clone(&display));
        display
    }

    #[must_use]
    pub fn contains(&self, raw: &str) -> bool {
        self.entries.contains_key(raw)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for NameCache<SymbolDemangler> {
    fn default() -> Self {
        Self::new(SymbolDemangler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingDemangler<'a> {
        calls: &'a Cell<usize>,
    }

    impl Demangle for CountingDemangler<'_> {
        fn demangle(&self, raw: &str) -> Option<String> {
            self.calls.set(self.calls.get() + 1);
            raw.strip_prefix("_M").map(|rest| format!("pretty::{rest}"))
        }
    }

    #[test]
    fn test_demangles_once_per_name() {
        let calls = Cell::new(0);
        let mut cache = NameCache::new(CountingDemangler { calls: &calls });

        let first = cache.resolve_display_name("_Mwork");
        let second = cache.resolve_display_name("_Mwork");

        assert_eq!(&*first, "pretty::work");
        assert_eq!(first, second);
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_passes_through_on_failure() {
        let calls = Cell::new(0);
        let mut cache = NameCache::new(CountingDemangler { calls: &calls });

        assert_eq!(&*cache.resolve_display_name("plain_c_function"), "plain_c_function");
        assert_eq!(&*cache.resolve_display_name("plain_c_function"), "plain_c_function");
        assert_eq!(calls.get(), 1);
        assert!(cache.contains("plain_c_function"));
    }

    #[test]
    fn test_distinct_names_get_distinct_entries() {
        let mut cache = NameCache::default();
        assert!(cache.is_empty());

        assert_eq!(&*cache.resolve_display_name("_Z3foov"), "foo()");
        assert_eq!(&*cache.resolve_display_name("_Z3barv"), "bar()");
        assert_eq!(cache.len(), 2);
    }
}
