//! Raw symbol name → display name
//!
//! Targets built with `-finstrument-functions` are usually C++, so Itanium
//! names go through `cpp_demangle`. Rust symbols (legacy `_ZN…17h<hash>E` and
//! v0 `_R…`) are also valid-looking Itanium names, so they are recognized
//! first and handed to `rustc-demangle`, which drops the hash suffix.

use cpp_demangle::{DemangleOptions, Symbol};

/// Turns a raw symbol name into its human-readable form.
///
/// `None` means the name is not mangled (or not in a scheme we understand);
/// callers pass the raw name through in that case.
pub trait Demangle {
    fn demangle(&self, raw: &str) -> Option<String>;
}

/// Default demangler: Rust first when the name looks like a Rust symbol, C++ otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymbolDemangler;

impl Demangle for SymbolDemangler {
    fn demangle(&self, raw: &str) -> Option<String> {
        if is_rust_symbol(raw) {
            if let Ok(demangled) = rustc_demangle::try_demangle(raw) {
                return Some(format!("{demangled:#}"));
            }
        }

        let symbol = Symbol::new(raw.as_bytes()).ok()?;
        symbol.demangle(&DemangleOptions::default()).ok()
    }
}

/// Length of the legacy Rust hash trailer: `17h` + 16 hex digits + `E`.
const LEGACY_HASH_LEN: usize = 20;

/// Recognize Rust mangling without attempting a full parse.
fn is_rust_symbol(raw: &str) -> bool {
    if raw.starts_with("_R") {
        return true;
    }

    // LLVM may append `.llvm.<digits>` or similar after the mangled body
    let body = raw.split('.').next().unwrap_or(raw).as_bytes();
    if !body.starts_with(b"_ZN") || body.len() <= 3 + LEGACY_HASH_LEN {
        return false;
    }

    let tail = &body[body.len() - LEGACY_HASH_LEN..];
    tail.starts_with(b"17h")
        && tail.ends_with(b"E")
        && tail[3..LEGACY_HASH_LEN - 1].iter().all(u8::is_ascii_hexdigit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demangles_cpp_free_function() {
        assert_eq!(SymbolDemangler.demangle("_Z3foov").as_deref(), Some("foo()"));
    }

    #[test]
    fn test_demangles_cpp_namespaced_function() {
        assert_eq!(SymbolDemangler.demangle("_ZN2ns3barEi").as_deref(), Some("ns::bar(int)"));
    }

    #[test]
    fn test_demangles_rust_legacy_without_hash() {
        let raw = "_ZN4core3fmt5write17h0123456789abcdefE";
        assert!(is_rust_symbol(raw));
        assert_eq!(SymbolDemangler.demangle(raw).as_deref(), Some("core::fmt::write"));
    }

    #[test]
    fn test_demangles_rust_v0() {
        assert_eq!(SymbolDemangler.demangle("_RNvC6_123foo3bar").as_deref(), Some("123foo::bar"));
    }

    #[test]
    fn test_plain_c_name_is_not_mangled() {
        assert_eq!(SymbolDemangler.demangle("main"), None);
        assert!(!is_rust_symbol("main"));
    }

    #[test]
    fn test_cpp_name_is_not_taken_for_rust() {
        assert!(!is_rust_symbol("_ZN2ns3barEi"));
        assert!(!is_rust_symbol("_ZN4core3fmt5write17hnothexnothexnothE"));
    }

    #[test]
    fn test_rust_legacy_with_llvm_suffix() {
        assert!(is_rust_symbol("_ZN4core3fmt5write17h0123456789abcdefE.llvm.1234"));
    }
}
