//! Pre-flight checks for `calltrace run`
//!
//! Validates the program and the hook library before launching anything, so
//! a typo or a wrong build shows up as a clear message instead of a silent
//! run with no trace output.

use anyhow::{bail, Context, Result};
use object::{Object, ObjectSection, ObjectSymbol, SymbolKind};
use std::path::Path;

use crate::hooks::{ENTER_HOOK, EXIT_HOOK};

/// Run all pre-flight checks before launching `program` with `library` preloaded
pub fn run_preflight_checks(program: &Path, library: &Path, symtab: bool, quiet: bool) -> Result<()> {
    check_binary_exists(program, "Program")?;
    check_binary_exists(library, "Hook library")?;
    check_library_exports_hooks(library)?;
    check_instrumentation(program, symtab, quiet)?;
    Ok(())
}

/// Check that `path` exists and is a regular file
pub fn check_binary_exists(path: &Path, what: &str) -> Result<()> {
    if !path.exists() {
        bail!(
            "{what} not found: {}\n\n\
             Make sure the path is correct and the file exists.",
            path.display()
        );
    }
    if !path.is_file() {
        bail!("Not a file: {}\n\n{what} must be a file, not a directory.", path.display());
    }
    Ok(())
}

/// Check that the library defines and exports both hook functions
pub fn check_library_exports_hooks(library: &Path) -> Result<()> {
    let data = std::fs::read(library)
        .with_context(|| format!("Failed to read hook library: {}", library.display()))?;
    let obj = object::File::parse(&*data)
        .with_context(|| format!("Not a shared library: {}", library.display()))?;

    let exported = |name: &str| {
        obj.dynamic_symbols().any(|sym| sym.is_definition() && sym.name().is_ok_and(|n| n == name))
    };
    for hook in [ENTER_HOOK, EXIT_HOOK] {
        if !exported(hook) {
            bail!(
                "{} does not export {hook}\n\n\
                 Pass the calltrace shared library (libcalltrace.so) with --library.",
                library.display()
            );
        }
    }
    Ok(())
}

/// What the program's object file says about how it was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instrumentation {
    /// The program references the entry hook
    pub calls_hooks: bool,
    /// The program exports function symbols dynamically
    pub exports_functions: bool,
    /// The program carries a `.symtab` section
    pub has_symtab: bool,
}

/// Inspect an object file for hook references and symbol visibility
pub fn inspect_program(data: &[u8]) -> Result<Instrumentation> {
    let obj = object::File::parse(data).context("Failed to parse program")?;

    let calls_hooks = obj
        .symbols()
        .chain(obj.dynamic_symbols())
        .any(|sym| sym.name().is_ok_and(|n| n == ENTER_HOOK));
    let exports_functions = obj
        .dynamic_symbols()
        .any(|sym| sym.is_definition() && sym.kind() == SymbolKind::Text);
    let has_symtab = obj.section_by_name(".symtab").is_some_and(|s| s.size() > 0);

    Ok(Instrumentation { calls_hooks, exports_functions, has_symtab })
}

/// Warn when the program is unlikely to produce a useful trace
fn check_instrumentation(program: &Path, symtab: bool, quiet: bool) -> Result<()> {
    if quiet {
        return Ok(());
    }

    let data = std::fs::read(program)
        .with_context(|| format!("Failed to read program: {}", program.display()))?;
    let Ok(info) = inspect_program(&data) else {
        // Scripts and other non-ELF programs; let the launch decide
        return Ok(());
    };

    if !info.calls_hooks {
        eprintln!(
            "warning: {} does not reference {ENTER_HOOK}; was it built with -finstrument-functions?",
            program.display()
        );
    }
    if symtab && !info.has_symtab {
        eprintln!("warning: program is stripped, --symtab cannot name its functions");
    } else if !symtab && !info.exports_functions {
        eprintln!(
            "warning: program exports no functions, most frames will be skipped\n\
             Link with -rdynamic or pass --symtab."
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_binary_not_found() {
        let result = check_binary_exists(Path::new("/nonexistent/path/to/program"), "Program");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Program not found"));
    }

    #[test]
    fn test_directory_is_not_a_binary() {
        let dir = tempfile::tempdir().unwrap();
        let err = check_binary_exists(dir.path(), "Hook library").unwrap_err().to_string();
        assert!(err.contains("Not a file"));
    }

    #[test]
    fn test_garbage_library_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"definitely not an ELF file").unwrap();

        let err = check_library_exports_hooks(file.path()).unwrap_err().to_string();
        assert!(err.contains("Not a shared library"));
    }

    #[test]
    #[cfg(feature = "hooks")]
    fn test_test_binary_references_hooks() {
        // This binary links the crate, which defines both hooks.
        let exe = std::env::current_exe().unwrap();
        let data = std::fs::read(exe).unwrap();
        let info = inspect_program(&data).unwrap();
        assert!(info.calls_hooks);
    }

    #[test]
    fn test_inspect_rejects_non_object() {
        assert!(inspect_program(b"#!/bin/sh\necho hi\n").is_err());
    }
}
