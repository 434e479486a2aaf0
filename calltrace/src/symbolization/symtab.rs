//! Full symbol tables for modules whose functions are not exported
//!
//! Most executables are linked without `-rdynamic`, so `dladdr` knows the
//! module but no symbol name. The on-disk ELF `.symtab` still has one. Each
//! module is parsed once per process and shared by every thread; a module
//! that cannot be read is remembered as such so it is not retried.
//!
//! Each thread keeps its own map of modules it has already seen, so the
//! process-wide table is locked at most once per module per thread, and
//! never while a file is read or parsed.

use anyhow::{Context, Result};
use log::{debug, warn};
use object::{Object, ObjectKind, ObjectSymbol, SymbolKind};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

use crate::domain::Address;

#[derive(Debug, Clone)]
struct FunctionSymbol {
    start: u64,
    size: u64,
    name: String,
}

/// Function symbols of one module, sorted by start address.
#[derive(Debug)]
pub struct ModuleSymbols {
    /// Symbol values are offsets from the load base (PIE and shared objects)
    relative: bool,
    symbols: Vec<FunctionSymbol>,
}

impl ModuleSymbols {
    /// Read and index the module at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not an object file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path.as_ref())
            .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;
        Self::parse(&data)
    }

    /// Index the function symbols of an in-memory object file.
    ///
    /// # Errors
    /// Returns an error if `data` is not a parsable object file.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let obj = object::File::parse(data).context("Failed to parse object file")?;

        let mut symbols: Vec<FunctionSymbol> = obj
            .symbols()
            .filter(|sym| sym.kind() == SymbolKind::Text && sym.is_definition())
            .filter_map(|sym| {
                let name = sym.name().ok().filter(|name| !name.is_empty())?;
                Some(FunctionSymbol { start: sym.address(), size: sym.size(), name: name.to_owned() })
            })
            .collect();
        symbols.sort_by_key(|sym| sym.start);

        Ok(Self { relative: obj.kind() != ObjectKind::Executable, symbols })
    }

    /// Nearest function symbol at or before `runtime_addr`, given the
    /// module's load base. Returns the raw name and the symbol's runtime start.
    #[must_use]
    pub fn lookup(&self, base: usize, runtime_addr: Address) -> Option<(&str, Address)> {
        let bias = if self.relative { base as u64 } else { 0 };
        let offset = (runtime_addr.0 as u64).checked_sub(bias)?;

        let idx = self.symbols.partition_point(|sym| sym.start <= offset);
        let sym = self.symbols.get(idx.checked_sub(1)?)?;
        if sym.size != 0 && offset >= sym.start + sym.size {
            return None;
        }

        let start = usize::try_from(sym.start + bias).ok()?;
        Some((sym.name.as_str(), Address(start)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// A module's symbols, or `None` once loading it has failed.
type ModuleSlot = Arc<OnceLock<Option<Arc<ModuleSymbols>>>>;

static MODULES: OnceLock<Mutex<HashMap<String, ModuleSlot>>> = OnceLock::new();

thread_local! {
    // Modules this thread has already seen; hits never touch `MODULES`.
    static THREAD_MODULES: RefCell<HashMap<String, Option<Arc<ModuleSymbols>>>> =
        RefCell::new(HashMap::new());
}

/// The shared slot for `module`. The lock only covers the map lookup.
fn shared_slot(module: &str) -> ModuleSlot {
    let table = MODULES.get_or_init(|| Mutex::new(HashMap::new()));
    let mut table = match table.lock() {
        Ok(guard) => guard,
        Err(err) => err.into_inner(),
    };
    match table.get(module) {
        Some(slot) => Arc::clone(slot),
        None => Arc::clone(table.entry(module.to_owned()).or_default()),
    }
}

/// The loader reports the main program as `""` (or `argv[0]`, which may be
/// relative to a directory we are no longer in).
fn module_path(module: &str) -> &str {
    if module.is_empty() || !Path::new(module).exists() {
        "/proc/self/exe"
    } else {
        module
    }
}

fn load_module(module: &str) -> Option<Arc<ModuleSymbols>> {
    let path = module_path(module);
    match ModuleSymbols::load(path) {
        Ok(symbols) => {
            debug!("Loaded {} function symbols from {path}", symbols.len());
            Some(Arc::new(symbols))
        }
        Err(e) => {
            warn!("No symbol table for {path}: {e:#}");
            None
        }
    }
}

/// Symbols of `module`, parsed at most once per process.
///
/// Threads asking for a module that is still being parsed wait for that
/// module only; other modules and cached lookups proceed.
fn module_symbols(module: &str) -> Option<Arc<ModuleSymbols>> {
    let cached = THREAD_MODULES
        .try_with(|local| local.try_borrow().ok().and_then(|local| local.get(module).cloned()))
        .ok()
        .flatten();
    if let Some(symbols) = cached {
        return symbols;
    }

    let slot = shared_slot(module);
    let symbols = slot.get_or_init(|| load_module(module)).clone();

    let _ = THREAD_MODULES.try_with(|local| {
        if let Ok(mut local) = local.try_borrow_mut() {
            local.insert(module.to_owned(), symbols.clone());
        }
    });
    symbols
}

/// Look up `addr` in the full symbol table of `module`, loaded at `base`.
pub fn lookup(module: &str, base: usize, addr: Address) -> Option<(String, Address)> {
    let symbols = module_symbols(module)?;
    symbols.lookup(base, addr).map(|(name, start)| (name.to_owned(), start))
}
