//! Text rendering of filter decisions for `calltrace check`

use crate::classification::{FilterDecision, SymbolFilter};
use crate::symbolization::{Demangle, NameCache};

/// One report line: the raw name, what it displays as, and whether it is traced.
pub fn describe<D: Demangle>(filter: &SymbolFilter, cache: &mut NameCache<D>, raw: &str) -> String {
    match filter.decide(Some(raw), cache) {
        FilterDecision::Trace(display) => format!("{raw}\n    display: {display}\n    trace"),
        FilterDecision::MangledPrefix(prefix) => {
            format!("{raw}\n    display: (not demangled)\n    skip: mangled prefix {prefix:?}")
        }
        FilterDecision::DisplayPrefix { prefix, display } => {
            format!("{raw}\n    display: {display}\n    skip: display prefix {prefix:?}")
        }
        FilterDecision::Unresolved => format!("{raw}\n    skip: unresolved"),
    }
}
