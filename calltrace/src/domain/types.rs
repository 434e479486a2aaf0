//! Domain types providing compile-time safety and self-documentation

use std::fmt;

/// Code address handed to the hooks by the instrumented target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub usize);

impl Address {
    /// Returns true for the null address, which never resolves.
    #[must_use]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl From<usize> for Address {
    fn from(addr: usize) -> Self {
        Address(addr)
    }
}

/// Elapsed time of one traced activation, in nanoseconds.
///
/// `Display` picks the largest unit that keeps the value at or above one
/// (`ns`, `us`, `ms`, `s`) and always prints three decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Elapsed(pub u64);

impl Elapsed {
    /// Elapsed time between two monotonic readings, clamped at zero.
    #[must_use]
    pub fn between(start_ns: u64, end_ns: u64) -> Self {
        Elapsed(end_ns.saturating_sub(start_ns))
    }

    /// Scaled value and unit suffix used for display.
    #[allow(clippy::cast_precision_loss)] // Display only
    #[must_use]
    pub fn scaled(self) -> (f64, &'static str) {
        let ns = self.0;
        if ns >= 1_000_000_000 {
            (ns as f64 / 1_000_000_000.0, "s")
        } else if ns >= 1_000_000 {
            (ns as f64 / 1_000_000.0, "ms")
        } else if ns >= 1_000 {
            (ns as f64 / 1_000.0, "us")
        } else {
            (ns as f64, "ns")
        }
    }
}

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (value, unit) = self.scaled();
        write!(f, "{value:.3} {unit}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_boundaries() {
        assert_eq!(Elapsed(999).to_string(), "999.000 ns");
        assert_eq!(Elapsed(1_000).to_string(), "1.000 us");
        assert_eq!(Elapsed(999_999).to_string(), "999.999 us");
        assert_eq!(Elapsed(1_000_000).to_string(), "1.000 ms");
        // Still milliseconds, even though rounding carries into the next power
        assert_eq!(Elapsed(999_999_999).to_string(), "1000.000 ms");
        assert_eq!(Elapsed(1_000_000_000).to_string(), "1.000 s");
    }

    #[test]
    fn test_zero_and_large() {
        assert_eq!(Elapsed(0).to_string(), "0.000 ns");
        assert_eq!(Elapsed(90_500_000_000).to_string(), "90.500 s");
    }

    #[test]
    fn test_between_never_negative() {
        assert_eq!(Elapsed::between(10, 4), Elapsed(0));
        assert_eq!(Elapsed::between(1_000_000, 3_000_000), Elapsed(2_000_000));
    }

    #[test]
    fn test_address_display() {
        assert_eq!(Address(0x4011a0).to_string(), "0x4011a0");
        assert!(Address(0).is_null());
        assert!(!Address::from(16).is_null());
    }
}
