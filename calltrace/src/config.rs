//! Tracer configuration
//!
//! A process has exactly one active configuration. An embedding application
//! may [`install`] one before the first hook fires; otherwise it is read from
//! `CALLTRACE_*` environment variables the first time any thread needs it.

use log::{info, warn};
use std::env;
use std::sync::{Arc, OnceLock};

use crate::classification::SymbolFilter;
use crate::domain::ConfigError;
use crate::profiling::{log_summary_at_exit, MAX_DEPTH};

/// Comma-separated mangled prefixes added to the filter; `\` escapes the next
/// character (a literal comma, backslash or edge whitespace)
pub const ENV_SKIP_MANGLED: &str = "CALLTRACE_SKIP_MANGLED";
/// Comma-separated display-name prefixes added to the filter, escaped like
/// [`ENV_SKIP_MANGLED`]
pub const ENV_SKIP_DISPLAY: &str = "CALLTRACE_SKIP_DISPLAY";
/// Start from an empty filter instead of the defaults
pub const ENV_NO_DEFAULT_FILTERS: &str = "CALLTRACE_NO_DEFAULT_FILTERS";
/// Per-thread call stack capacity
pub const ENV_MAX_DEPTH: &str = "CALLTRACE_MAX_DEPTH";
/// Look up non-exported functions in on-disk symbol tables
pub const ENV_SYMTAB: &str = "CALLTRACE_SYMTAB";
/// `env_logger` filter for the library's own log output
pub const ENV_LOG: &str = "CALLTRACE_LOG";

/// Controls which frames are traced and how deep a thread's stack may grow.
#[derive(Debug, Clone)]
pub struct TracerConfig {
    /// Prefix denylists, shared by every thread's tracker
    pub filter: Arc<SymbolFilter>,
    /// Frames held per thread before entries are forced-skip
    pub max_depth: usize,
    /// Fall back to the module's `.symtab` when `dladdr` finds no symbol
    pub symtab_fallback: bool,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self { filter: Arc::new(SymbolFilter::default()), max_depth: MAX_DEPTH, symtab_fallback: false }
    }
}

impl TracerConfig {
    #[must_use]
    pub fn with_filter(mut self, filter: SymbolFilter) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    /// Builder-style helper to adjust the stack capacity (clamped to at least 1).
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    #[must_use]
    pub fn with_symtab_fallback(mut self, enabled: bool) -> Self {
        self.symtab_fallback = enabled;
        self
    }

    /// Build a configuration from `CALLTRACE_*` variables supplied by `lookup`.
    ///
    /// # Errors
    /// Returns an error if `CALLTRACE_MAX_DEPTH` is not a positive integer.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut filter = if lookup(ENV_NO_DEFAULT_FILTERS).is_some_and(|v| is_truthy(&v)) {
            SymbolFilter::empty()
        } else {
            SymbolFilter::default()
        };
        filter.extend(
            split_list(lookup(ENV_SKIP_MANGLED).as_deref()),
            split_list(lookup(ENV_SKIP_DISPLAY).as_deref()),
        );

        let max_depth = match lookup(ENV_MAX_DEPTH) {
            Some(raw) => parse_max_depth(&raw)?,
            None => MAX_DEPTH,
        };

        Ok(Self {
            filter: Arc::new(filter),
            max_depth,
            symtab_fallback: lookup(ENV_SYMTAB).is_some_and(|v| is_truthy(&v)),
        })
    }

    /// Read the process environment; invalid values fall back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        match Self::from_lookup(|key| env::var(key).ok()) {
            Ok(config) => config,
            Err(e) => {
                warn!("{e}; using the default depth of {MAX_DEPTH}");
                Self::from_lookup(|key| if key == ENV_MAX_DEPTH { None } else { env::var(key).ok() })
                    .unwrap_or_default()
            }
        }
    }

    /// Environment variables that reproduce this configuration exactly in a
    /// child process (see [`TracerConfig::from_lookup`]).
    #[must_use]
    pub fn to_env(&self) -> Vec<(&'static str, String)> {
        let mut vars = vec![
            (ENV_NO_DEFAULT_FILTERS, "1".to_string()),
            (ENV_SKIP_MANGLED, join_list(self.filter.mangled_prefixes())),
            (ENV_SKIP_DISPLAY, join_list(self.filter.display_prefixes())),
            (ENV_MAX_DEPTH, self.max_depth.to_string()),
        ];
        if self.symtab_fallback {
            vars.push((ENV_SYMTAB, "1".to_string()));
        }
        vars
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Split a comma-separated list. Unescaped whitespace around items is
/// trimmed; a backslash makes the next character literal.
fn split_list(value: Option<&str>) -> Vec<String> {
    let mut items = Vec::new();
    let mut item = String::new();
    // Bytes of `item` that trimming must keep (up to the last escaped char)
    let mut literal_len = 0;

    let mut chars = value.unwrap_or_default().chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                item.push(chars.next().unwrap_or('\\'));
                literal_len = item.len();
            }
            ',' => finish_item(&mut items, &mut item, &mut literal_len),
            c if c.is_whitespace() && item.is_empty() => {}
            c => item.push(c),
        }
    }
    finish_item(&mut items, &mut item, &mut literal_len);
    items
}

fn finish_item(items: &mut Vec<String>, item: &mut String, literal_len: &mut usize) {
    let keep = item.trim_end().len().max(*literal_len);
    item.truncate(keep);
    if !item.is_empty() {
        items.push(std::mem::take(item));
    }
    *literal_len = 0;
}

/// Inverse of [`split_list`] for any list of non-empty items.
fn join_list(items: &[String]) -> String {
    let mut joined = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            joined.push(',');
        }
        for c in item.chars() {
            if c == ',' || c == '\\' || c.is_whitespace() {
                joined.push('\\');
            }
            joined.push(c);
        }
    }
    joined
}

fn parse_max_depth(raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(ConfigError::ZeroMaxDepth),
        Ok(depth) => Ok(depth),
        Err(_) => Err(ConfigError::InvalidMaxDepth(raw.to_string())),
    }
}

static ACTIVE: OnceLock<TracerConfig> = OnceLock::new();

/// Make `config` the process configuration.
///
/// # Errors
/// Returns [`ConfigError::AlreadyInstalled`] if a configuration was already
/// installed or a hook already loaded one from the environment.
pub fn install(config: TracerConfig) -> Result<(), ConfigError> {
    let depth = config.max_depth;
    ACTIVE.set(config).map_err(|_| ConfigError::AlreadyInstalled)?;
    info!("Tracer configuration installed (max depth {depth})");
    Ok(())
}

/// The process configuration, loading it from the environment on first use.
pub fn active() -> &'static TracerConfig {
    ACTIVE.get_or_init(|| {
        init_logging();
        TracerConfig::from_env()
    })
}

/// Honor `CALLTRACE_LOG` without overriding a logger the host already set up.
fn init_logging() {
    if let Ok(filter) = env::var(ENV_LOG) {
        if env_logger::Builder::new().parse_filters(&filter).try_init().is_ok() {
            log_summary_at_exit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = TracerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.max_depth, MAX_DEPTH);
        assert!(!config.symtab_fallback);
        assert_eq!(*config.filter, SymbolFilter::default());
    }

    #[test]
    fn test_extra_prefixes_are_appended() {
        let config = TracerConfig::from_lookup(lookup_from(&[
            (ENV_SKIP_MANGLED, "_ZN5boost, _ZN4absl ,"),
            (ENV_SKIP_DISPLAY, "noisy::"),
        ]))
        .unwrap();

        let mangled = config.filter.mangled_prefixes();
        assert!(mangled.contains(&"_ZNSt".to_string()));
        assert!(mangled.contains(&"_ZN5boost".to_string()));
        assert!(mangled.contains(&"_ZN4absl".to_string()));
        assert_eq!(config.filter.display_prefixes().last().map(String::as_str), Some("noisy::"));
    }

    #[test]
    fn test_no_default_filters() {
        let config = TracerConfig::from_lookup(lookup_from(&[
            (ENV_NO_DEFAULT_FILTERS, "yes"),
            (ENV_SKIP_DISPLAY, "only::"),
        ]))
        .unwrap();

        assert!(config.filter.mangled_prefixes().is_empty());
        assert_eq!(config.filter.display_prefixes(), ["only::".to_string()]);
    }

    #[test]
    fn test_max_depth_and_symtab() {
        let config =
            TracerConfig::from_lookup(lookup_from(&[(ENV_MAX_DEPTH, " 64 "), (ENV_SYMTAB, "true")])).unwrap();
        assert_eq!(config.max_depth, 64);
        assert!(config.symtab_fallback);
    }

    #[test]
    fn test_invalid_max_depth() {
        assert_eq!(
            TracerConfig::from_lookup(lookup_from(&[(ENV_MAX_DEPTH, "deep")])).unwrap_err(),
            ConfigError::InvalidMaxDepth("deep".to_string())
        );
        assert_eq!(
            TracerConfig::from_lookup(lookup_from(&[(ENV_MAX_DEPTH, "0")])).unwrap_err(),
            ConfigError::ZeroMaxDepth
        );
    }

    #[test]
    fn test_env_round_trip() {
        let config = TracerConfig::default()
            .with_filter(SymbolFilter::empty().with_mangled_prefix("_ZN3foo").with_display_prefix("bar"))
            .with_max_depth(32)
            .with_symtab_fallback(true);

        let env = config.to_env();
        let vars: Vec<(&str, &str)> = env.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let restored = TracerConfig::from_lookup(lookup_from(&vars)).unwrap();

        assert_eq!(restored.filter, config.filter);
        assert_eq!(restored.max_depth, 32);
        assert!(restored.symtab_fallback);
    }

    #[test]
    fn test_prefixes_with_commas_and_spaces_survive_env() {
        let filter = SymbolFilter::empty()
            .with_mangled_prefix("_ZN3foo")
            .with_display_prefix("std::pair<int, int>")
            .with_display_prefix(" padded ")
            .with_display_prefix("back\\slash");
        let config = TracerConfig::default().with_filter(filter);

        let env = config.to_env();
        let vars: Vec<(&str, &str)> = env.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let restored = TracerConfig::from_lookup(lookup_from(&vars)).unwrap();

        assert_eq!(
            restored.filter.display_prefixes(),
            ["std::pair<int, int>".to_string(), " padded ".to_string(), "back\\slash".to_string()]
        );
        assert_eq!(restored.filter, config.filter);
    }

    #[test]
    fn test_split_list_escapes() {
        assert_eq!(split_list(Some(r"a\,b, c ,,\ d\ ")), ["a,b", "c", " d "]);
        assert_eq!(split_list(Some(r"trailing\")), [r"trailing\"]);
        assert!(split_list(None).is_empty());
    }

    #[test]
    fn test_with_max_depth_clamps_to_one() {
        assert_eq!(TracerConfig::default().with_max_depth(0).max_depth, 1);
    }
}
