//! Launching a traced program: path lookup, preload setup, exit status.

use anyhow::{bail, Context, Result};
use std::ffi::{OsStr, OsString};
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use crate::config::TracerConfig;

/// File name of the hook library looked up next to the CLI executable
pub const LIBRARY_FILE_NAME: &str = "libcalltrace.so";

const PRELOAD_VAR: &str = "LD_PRELOAD";

/// Default hook library: `libcalltrace.so` in the directory of the running executable.
pub fn default_library_path() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate the calltrace executable")?;
    Ok(exe.with_file_name(LIBRARY_FILE_NAME))
}

/// Resolve `program` the way a shell would: paths with a `/` are used as
/// given, bare names are searched in `path_var`.
pub fn resolve_program(program: &Path, path_var: Option<&OsStr>) -> Result<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return Ok(program.to_path_buf());
    }

    if let Some(path_var) = path_var {
        for dir in std::env::split_paths(path_var) {
            let candidate = dir.join(program);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }

    bail!(
        "Program '{}' not found in PATH.\n\n\
         Pass a path such as ./{} to run a program from the current directory.",
        program.display(),
        program.display()
    )
}

/// `LD_PRELOAD` value with `library` placed ahead of any existing entries.
pub fn preload_value(library: &Path, existing: Option<&OsStr>) -> OsString {
    let mut value = OsString::from(library.as_os_str());
    if let Some(existing) = existing.filter(|v| !v.is_empty()) {
        value.push(":");
        value.push(existing);
    }
    value
}

/// Build the command that runs `program` under the tracer.
pub fn traced_command(program: &Path, args: &[String], library: &Path, config: &TracerConfig) -> Command {
    let library = std::path::absolute(library).unwrap_or_else(|_| library.to_path_buf());

    let mut command = Command::new(program);
    command
        .args(args)
        .envs(config.to_env())
        .env(PRELOAD_VAR, preload_value(&library, std::env::var_os(PRELOAD_VAR).as_deref()));
    command
}

/// Shell-style exit code: the child's own code, or 128 + signal number.
pub fn exit_code(status: ExitStatus) -> i32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => 1,
    }
}
