//! # calltrace - Function Call Tracer for `-finstrument-functions` Builds
//!
//! calltrace prints an indented, timed call tree of a running program. The
//! program is compiled with `-finstrument-functions`, which makes the compiler
//! call two hooks around every function body; this crate provides those hooks.
//! Linked in (or preloaded via `LD_PRELOAD`), it writes one line to stderr per
//! traced entry and exit:
//!
//! ```text
//! >> main
//!   >> compute(int)
//!     >> helper()
//!     << helper(): 2.000 ms
//!   << compute(int): 10.000 ms
//! << main: 10.500 ms
//! ```
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 Instrumented Program (C / C++)                  │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ __cyg_profile_func_enter / _exit
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  hooks: thread-local tracker, created from the active config    │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │ symbolization│──▶│classification│──▶│  profiling   │         │
//! │  │ dladdr/cache │   │ prefix filter│   │ stack + lines│──▶ stderr
//! │  └──────────────┘   └──────────────┘   └──────────────┘         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`hooks`]: The two `extern "C"` entrypoints and per-thread tracker storage
//! - [`profiling`]: Call stack pairing, skip propagation, line formatting, clock
//! - [`symbolization`]: Address → raw symbol (`dladdr`, optional `.symtab`) and
//!   raw → display name (demangling with a per-thread cache)
//! - [`classification`]: Which frames are worth a line
//! - [`config`]: Tracer configuration from the environment
//! - [`domain`]: Core types (`Address`, `Elapsed`) and errors
//! - [`cli`], [`preflight`], [`launcher`]: The `calltrace` command-line tool
//!
//! ## Key Concepts
//!
//! - **Skipped frame**: A frame the filter rejected (or could not name). It
//!   prints nothing, and neither does anything it calls.
//! - **Overflow**: Frames beyond the depth limit are counted, not stored, and
//!   their exits are matched against the count.
//! - **Display name**: The demangled symbol name, or the raw name when it does
//!   not demangle.

pub mod classification;
pub mod cli;
pub mod config;
pub mod domain;
pub mod hooks;
pub mod launcher;
pub mod preflight;
pub mod profiling;
pub mod symbolization;

pub use classification::{FilterDecision, SymbolFilter};
pub use config::TracerConfig;
pub use hooks::{on_enter, on_exit, thread_depth, thread_stats};
