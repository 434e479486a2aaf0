//! Address → raw symbol name via the dynamic loader
//!
//! `dladdr` searches the dynamic symbol tables of every loaded module for the
//! nearest symbol at or before an address. Functions that are not exported
//! (static functions, executables linked without `-rdynamic`) have no dynamic
//! symbol; those resolve to [`ResolveError::NoSymbol`] unless the symbol-table
//! fallback is enabled, in which case the module's on-disk `.symtab` is
//! consulted (see [`super::symtab`]).

use std::ffi::{c_void, CStr};
use std::ptr;

use crate::domain::{Address, ResolveError};

use super::symtab;

/// Raw (possibly mangled) symbol covering a code address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSymbol {
    pub name: String,
    /// Path of the containing module, when the loader reports one
    pub module: Option<String>,
    /// Start address of the symbol
    pub symbol_addr: Address,
}

/// Source of raw symbol names for code addresses.
pub trait SymbolSource {
    /// # Errors
    /// Returns a [`ResolveError`] when no symbol name can be produced.
    fn resolve(&self, addr: Address) -> Result<RawSymbol, ResolveError>;
}

/// Resolver backed by `dladdr(3)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DlAddrResolver {
    symtab_fallback: bool,
}

impl DlAddrResolver {
    #[must_use]
    pub fn new(symtab_fallback: bool) -> Self {
        Self { symtab_fallback }
    }
}

impl SymbolSource for DlAddrResolver {
    #[allow(unsafe_code)]
    fn resolve(&self, addr: Address) -> Result<RawSymbol, ResolveError> {
        if addr.is_null() {
            return Err(ResolveError::NoModule { addr });
        }

        let mut info = libc::Dl_info {
            dli_fname: ptr::null(),
            dli_fbase: ptr::null_mut(),
            dli_sname: ptr::null(),
            dli_saddr: ptr::null_mut(),
        };

        // SAFETY: dladdr only reads loader metadata and writes into `info`,
        // which is a valid, exclusively borrowed Dl_info.
        let found = unsafe { libc::dladdr(addr.0 as *const c_void, &mut info) };
        if found == 0 {
            return Err(ResolveError::NoModule { addr });
        }

        // SAFETY: when non-null, dli_fname and dli_sname point at NUL-terminated
        // strings owned by the loader for as long as the module stays loaded;
        // they are copied out before returning.
        let module = unsafe { c_string(info.dli_fname) }.map(|name| name.to_string_lossy().into_owned());

        let Some(sname) = (unsafe { c_string(info.dli_sname) }) else {
            if self.symtab_fallback {
                if let Some(module) = module.as_deref() {
                    if let Some((name, start)) = symtab::lookup(module, info.dli_fbase as usize, addr) {
                        return Ok(RawSymbol { name, module: Some(module.to_owned()), symbol_addr: start });
                    }
                }
            }
            return Err(ResolveError::NoSymbol {
                addr,
                module: module.unwrap_or_else(|| "<unknown>".to_string()),
            });
        };

        let name = sname.to_str().map_err(|_| ResolveError::InvalidName { addr })?;
        if name.is_empty() {
            return Err(ResolveError::NoSymbol {
                addr,
                module: module.unwrap_or_else(|| "<unknown>".to_string()),
            });
        }

        Ok(RawSymbol {
            name: name.to_owned(),
            module,
            symbol_addr: Address(info.dli_saddr as usize),
        })
    }
}

/// Borrow a loader-owned C string, `None` for null.
///
/// # Safety
/// `ptr` must be null or point at a NUL-terminated string that outlives `'a`.
#[allow(unsafe_code)]
unsafe fn c_string<'a>(ptr: *const libc::c_char) -> Option<&'a CStr> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr))
    }
}
