use calltrace::config::{self, TracerConfig};
use calltrace::domain::ConfigError;
use calltrace::{on_enter, on_exit, thread_depth, thread_stats, SymbolFilter};

// Integration tests run in their own process, so this file owns the
// process-wide configuration.
#[test]
fn test_installed_config_drives_new_threads() {
    let config = TracerConfig::default()
        .with_filter(SymbolFilter::empty().with_display_prefix("never"))
        .with_max_depth(2);
    config::install(config).unwrap();

    assert_eq!(config::install(TracerConfig::default()), Err(ConfigError::AlreadyInstalled));
    assert_eq!(config::active().max_depth, 2);

    std::thread::spawn(|| {
        for addr in [0x10, 0x20, 0x30, 0x40] {
            on_enter(addr);
        }
        assert_eq!(thread_depth(), 4);
        let stats = thread_stats();
        assert_eq!(stats.entered, 4);
        assert_eq!(stats.overflowed, 2);

        for addr in [0x40, 0x30, 0x20, 0x10] {
            on_exit(addr);
        }
        assert_eq!(thread_depth(), 0);
        assert_eq!(thread_stats().underflows, 0);
        assert_eq!(thread_stats().mismatched_exits, 0);
    })
    .join()
    .unwrap();
}
