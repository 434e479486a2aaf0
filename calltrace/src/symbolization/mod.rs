//! # Symbol Resolution and Naming
//!
//! Turns the opaque code address passed to a hook into the text printed on a
//! trace line. This happens in two stages with very different costs.
//!
//! ## Stage 1: address → raw symbol ([`resolver`])
//!
//! `dladdr(3)` asks the dynamic loader which loaded module contains the
//! address and which *dynamic* symbol starts at or before it. The result is a
//! raw, usually mangled name such as `_ZN2ns3barEi`. Addresses the loader
//! cannot place, and functions with no dynamic symbol, are *unresolved*; the
//! tracker never traces them.
//!
//! Optionally ([`symtab`]), an address whose module is known but whose
//! function is not exported is looked up in that module's on-disk `.symtab`.
//!
//! ## Stage 2: raw symbol → display name ([`name_cache`], [`demangle`])
//!
//! ```text
//! _ZN2ns3barEi                               → ns::bar(int)
//! _ZN4core3fmt5write17h0123456789abcdefE     → core::fmt::write
//! main                                       → main (passed through)
//! ```
//!
//! Demangling allocates and walks a grammar, so each thread keeps a
//! [`NameCache`] and demangles a given raw name at most once.

pub mod demangle;
pub mod name_cache;
pub mod resolver;
pub mod symtab;

pub use demangle::{Demangle, SymbolDemangler};
pub use name_cache::NameCache;
pub use resolver::{DlAddrResolver, RawSymbol, SymbolSource};
pub use symtab::ModuleSymbols;
