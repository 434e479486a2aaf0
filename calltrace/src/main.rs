//! # calltrace - Main Entry Point
//!
//! Two subcommands:
//! - **check** (`calltrace check SYMBOL...`): Show how raw names are displayed and filtered
//! - **run** (`calltrace run -- PROGRAM ARGS`): Launch an instrumented program with the
//!   hook library preloaded; the trace goes to the program's stderr

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use calltrace::cli::report::describe;
use calltrace::cli::{Args, Command, FilterArgs};
use calltrace::launcher::{default_library_path, exit_code, resolve_program, traced_command};
use calltrace::preflight::run_preflight_checks;
use calltrace::symbolization::NameCache;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_NOT_FOUND: i32 = 127;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(code) => code,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let msg = err.to_string().to_lowercase();
    if msg.contains("not found") {
        EXIT_NOT_FOUND
    } else {
        EXIT_ERROR
    }
}

fn run() -> Result<i32> {
    let args = Args::parse();

    match args.command {
        Command::Check { filter, symbols } => {
            check(&filter, &symbols);
            Ok(EXIT_SUCCESS)
        }
        Command::Run { filter, library, max_depth, symtab, program, args: program_args } => {
            let options = RunOptions { filter, library, max_depth, symtab, program, quiet: args.quiet };
            run_traced(options, &program_args)
        }
    }
}

fn check(filter: &FilterArgs, symbols: &[String]) {
    let filter = filter.to_filter();
    let mut cache = NameCache::default();
    for raw in symbols {
        println!("{}", describe(&filter, &mut cache, raw));
    }
}

struct RunOptions {
    filter: FilterArgs,
    library: Option<PathBuf>,
    max_depth: usize,
    symtab: bool,
    program: PathBuf,
    quiet: bool,
}

fn run_traced(options: RunOptions, program_args: &[String]) -> Result<i32> {
    let program = resolve_program(&options.program, std::env::var_os("PATH").as_deref())?;
    let library = match options.library {
        Some(library) => library,
        None => default_library_path()?,
    };

    run_preflight_checks(&program, &library, options.symtab, options.quiet)?;

    let config = options
        .filter
        .to_config()
        .with_max_depth(options.max_depth)
        .with_symtab_fallback(options.symtab);

    info!(
        "Tracing {} with {} (max depth {}, symtab {})",
        program.display(),
        library.display(),
        config.max_depth,
        config.symtab_fallback
    );

    let status = traced_command(&program, program_args, &library, &config)
        .status()
        .with_context(|| format!("Failed to launch {}", program.display()))?;

    Ok(exit_code(status))
}
