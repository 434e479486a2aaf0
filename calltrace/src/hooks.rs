//! Hook entrypoints called by instrumented code
//!
//! Code compiled with `-finstrument-functions` calls
//! `__cyg_profile_func_enter` before and `__cyg_profile_func_exit` after every
//! instrumented function body. Both forward to a tracker owned by the calling
//! thread, created on the thread's first hook call from [`config::active`].
//!
//! Nothing here may itself be instrumented: a hook that re-enters the hooks
//! would corrupt the pairing. Rust code in this crate is never built with
//! instrumentation; if a re-entrant call still arrives (for example through
//! an instrumented allocator), it finds the tracker already borrowed and is
//! dropped, and so is its matching exit.

use std::cell::RefCell;
use std::ffi::c_void;

use crate::config;
use crate::domain::Address;
use crate::profiling::{ThreadTracker, TrackerStats};

/// Symbol the compiler calls on function entry
pub const ENTER_HOOK: &str = "__cyg_profile_func_enter";
/// Symbol the compiler calls on function exit
pub const EXIT_HOOK: &str = "__cyg_profile_func_exit";

thread_local! {
    static TRACKER: RefCell<Option<ThreadTracker>> = const { RefCell::new(None) };
}

/// Run `f` on this thread's tracker, creating it on first use.
///
/// Returns `None` when the tracker is unavailable: re-entrant call, or the
/// thread is tearing down its thread-locals.
fn with_tracker<T>(f: impl FnOnce(&mut ThreadTracker) -> T) -> Option<T> {
    TRACKER
        .try_with(|cell| {
            let mut slot = cell.try_borrow_mut().ok()?;
            let tracker = slot.get_or_insert_with(|| ThreadTracker::from_config(config::active()));
            Some(f(tracker))
        })
        .ok()
        .flatten()
}

/// Read this thread's tracker without creating one.
fn peek<T>(f: impl FnOnce(&ThreadTracker) -> T) -> Option<T> {
    TRACKER
        .try_with(|cell| cell.try_borrow().ok().and_then(|slot| slot.as_ref().map(f)))
        .ok()
        .flatten()
}

/// Function at `address` entered on the current thread.
pub fn on_enter(address: usize) {
    with_tracker(|tracker| tracker.enter(Address(address)));
}

/// Function at `address` about to return on the current thread.
pub fn on_exit(address: usize) {
    with_tracker(|tracker| tracker.exit(Address(address)));
}

/// Active activations on the current thread, overflowed ones included.
#[must_use]
pub fn thread_depth() -> usize {
    peek(|tracker| tracker.depth() + tracker.overflow_depth()).unwrap_or(0)
}

/// Counters of the current thread's tracker (zero if it has none yet).
#[must_use]
pub fn thread_stats() -> TrackerStats {
    peek(ThreadTracker::stats).unwrap_or_default()
}

#[cfg(feature = "hooks")]
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn __cyg_profile_func_enter(this_fn: *mut c_void, _call_site: *mut c_void) {
    on_enter(this_fn as usize);
}

#[cfg(feature = "hooks")]
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn __cyg_profile_func_exit(this_fn: *mut c_void, _call_site: *mut c_void) {
    on_exit(this_fn as usize);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    // Addresses below the first mapped page never resolve, so these tests
    // exercise the pairing without writing trace lines.
    const UNMAPPED: [usize; 3] = [0x10, 0x20, 0x30];

    #[test]
    fn test_depth_follows_hooks() {
        thread::spawn(|| {
            assert_eq!(thread_depth(), 0);
            for addr in UNMAPPED {
                on_enter(addr);
            }
            assert_eq!(thread_depth(), 3);
            for addr in UNMAPPED.iter().rev() {
                on_exit(*addr);
            }
            assert_eq!(thread_depth(), 0);

            let stats = thread_stats();
            assert_eq!(stats.entered, 3);
            assert_eq!(stats.skipped, 3);
            assert_eq!(stats.traced, 0);
        })
        .join()
        .expect("hook thread panicked");
    }

    #[test]
    fn test_threads_have_independent_stacks() {
        let handles: Vec<_> = (0..4)
            .map(|n| {
                thread::spawn(move || {
                    for _ in 0..=n {
                        on_enter(UNMAPPED[0]);
                    }
                    let depth = thread_depth();
                    for _ in 0..=n {
                        on_exit(UNMAPPED[0]);
                    }
                    (n, depth, thread_depth())
                })
            })
            .collect();

        for handle in handles {
            let (n, depth, after) = handle.join().expect("hook thread panicked");
            assert_eq!(depth, n + 1);
            assert_eq!(after, 0);
        }
    }

    #[test]
    fn test_exit_before_any_enter_is_harmless() {
        thread::spawn(|| {
            on_exit(UNMAPPED[0]);
            assert_eq!(thread_depth(), 0);
            assert_eq!(thread_stats().underflows, 1);
        })
        .join()
        .expect("hook thread panicked");
    }

    #[cfg(feature = "hooks")]
    #[test]
    fn test_extern_hooks_forward() {
        thread::spawn(|| {
            __cyg_profile_func_enter(UNMAPPED[1] as *mut c_void, std::ptr::null_mut());
            assert_eq!(thread_depth(), 1);
            __cyg_profile_func_exit(UNMAPPED[1] as *mut c_void, std::ptr::null_mut());
            assert_eq!(thread_depth(), 0);
        })
        .join()
        .expect("hook thread panicked");
    }
}
