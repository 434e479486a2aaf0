//! CLI argument definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::classification::SymbolFilter;
use crate::config::TracerConfig;
use crate::profiling::MAX_DEPTH;

#[derive(Parser)]
#[command(
    name = "calltrace",
    version,
    about = "Print an indented, timed call tree of programs built with -finstrument-functions",
    after_help = "\
EXAMPLES:
    calltrace run -- ./app --flag            Trace ./app with the default filters
    calltrace run --symtab -- ./app          Also name functions that are not exported
    calltrace run --skip-display 'util::' -- ./app
                                             Hide util:: and everything it calls
    calltrace check _ZN2ns3barEi _ZNSt6vectorIiSaIiEE9push_backERKi
                                             Show how names are displayed and filtered"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the display name and filter decision for raw symbol names
    Check {
        #[command(flatten)]
        filter: FilterArgs,

        /// Raw (mangled) symbol names
        #[arg(required = true, value_name = "SYMBOL")]
        symbols: Vec<String>,
    },

    /// Run an instrumented program with the hook library preloaded
    Run {
        #[command(flatten)]
        filter: FilterArgs,

        /// Hook library to preload (default: libcalltrace.so next to this executable)
        #[arg(long, value_name = "PATH")]
        library: Option<PathBuf>,

        /// Per-thread call depth before frames are skipped
        #[arg(long, default_value_t = MAX_DEPTH, value_parser = parse_max_depth)]
        max_depth: usize,

        /// Look up non-exported functions in the module's symbol table
        #[arg(long)]
        symtab: bool,

        /// Program to run
        #[arg(value_name = "PROGRAM")]
        program: PathBuf,

        /// Arguments passed to the program
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
        args: Vec<String>,
    },
}

/// Filter options shared by every subcommand.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Skip frames whose mangled name starts with PREFIX (repeatable)
    #[arg(long = "skip-mangled", value_name = "PREFIX")]
    pub skip_mangled: Vec<String>,

    /// Skip frames whose display name starts with PREFIX (repeatable)
    #[arg(long = "skip-display", value_name = "PREFIX")]
    pub skip_display: Vec<String>,

    /// Start from an empty filter instead of the built-in std/runtime lists
    #[arg(long)]
    pub no_default_filters: bool,
}

impl FilterArgs {
    #[must_use]
    pub fn to_filter(&self) -> SymbolFilter {
        let mut filter = if self.no_default_filters { SymbolFilter::empty() } else { SymbolFilter::default() };
        filter.extend(self.skip_mangled.iter().cloned(), self.skip_display.iter().cloned());
        filter
    }

    #[must_use]
    pub fn to_config(&self) -> TracerConfig {
        TracerConfig::default().with_filter(self.to_filter())
    }
}

fn parse_max_depth(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(depth) => Ok(depth),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_collects_trailing_args() {
        let args = Args::parse_from(["calltrace", "run", "--symtab", "--", "./app", "--flag", "-v"]);
        match args.command {
            Command::Run { program, args, symtab, max_depth, .. } => {
                assert_eq!(program, PathBuf::from("./app"));
                assert_eq!(args, ["--flag", "-v"]);
                assert!(symtab);
                assert_eq!(max_depth, MAX_DEPTH);
            }
            Command::Check { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn test_filter_args_build_filter() {
        let args = Args::parse_from([
            "calltrace",
            "check",
            "--no-default-filters",
            "--skip-mangled",
            "_ZN5boost",
            "--skip-display",
            "util::",
            "_Z3foov",
        ]);
        let Command::Check { filter, symbols } = args.command else {
            panic!("expected check");
        };

        let filter = filter.to_filter();
        assert_eq!(filter.mangled_prefixes(), ["_ZN5boost".to_string()]);
        assert_eq!(filter.display_prefixes(), ["util::".to_string()]);
        assert_eq!(symbols, ["_Z3foov"]);
    }

    #[test]
    fn test_zero_depth_is_rejected() {
        assert!(Args::try_parse_from(["calltrace", "run", "--max-depth", "0", "./app"]).is_err());
    }

    #[test]
    fn test_check_requires_symbols() {
        assert!(Args::try_parse_from(["calltrace", "check"]).is_err());
    }
}
