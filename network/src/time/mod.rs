//! Time and timing module.
//!
//! A millisecond `Clock` abstraction, phase deadlines, and the per-phase
//! timeout table. On x86_64 bare metal the TSC drives the clock; host
//! builds use `std::time`.

/// Monotonic millisecond clock with a blocking sleep.
///
/// Implementations are cheap handles: the session and the network stack
/// each hold their own copy.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin.
    fn now_ms(&self) -> u64;

    /// Block for `ms` milliseconds.
    fn sleep_ms(&self, ms: u64);
}

/// Point in time after which a wait is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    expires_ms: u64,
}

impl Deadline {
    /// Deadline `ms` milliseconds from now.
    pub fn after<C: Clock + ?Sized>(clock: &C, ms: u64) -> Self {
        Self {
            expires_ms: clock.now_ms().saturating_add(ms),
        }
    }

    #[inline]
    pub fn expired<C: Clock + ?Sized>(&self, clock: &C) -> bool {
        clock.now_ms() >= self.expires_ms
    }

    /// Milliseconds left, zero once expired.
    #[inline]
    pub fn remaining_ms<C: Clock + ?Sized>(&self, clock: &C) -> u64 {
        self.expires_ms.saturating_sub(clock.now_ms())
    }
}

/// Upper bound for every phase wait.
///
/// Connect, receive and send get deadlines too, so no phase can stall a
/// cycle forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Radio association plus address lease.
    pub link_ms: u32,
    pub resolve_ms: u32,
    pub connect_ms: u32,
    /// Waiting for the server's payload.
    pub receive_ms: u32,
    /// Waiting for the request to be fully acknowledged.
    pub send_ms: u32,
}

impl Timeouts {
    /// Link association timeout (10 seconds).
    pub const LINK_MS: u32 = 10_000;
    /// DNS timeout (5 seconds).
    pub const RESOLVE_MS: u32 = 5_000;
    /// TCP connect timeout (10 seconds).
    pub const CONNECT_MS: u32 = 10_000;
    /// Receive idle timeout (30 seconds).
    pub const RECEIVE_MS: u32 = 30_000;
    /// Send acknowledgement timeout (10 seconds).
    pub const SEND_MS: u32 = 10_000;
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            link_ms: Self::LINK_MS,
            resolve_ms: Self::RESOLVE_MS,
            connect_ms: Self::CONNECT_MS,
            receive_ms: Self::RECEIVE_MS,
            send_ms: Self::SEND_MS,
        }
    }
}

/// TSC-backed clock for bare-metal x86_64.
#[cfg(target_arch = "x86_64")]
#[derive(Debug, Clone, Copy)]
pub struct TscClock {
    ticks_per_ms: u64,
}

#[cfg(target_arch = "x86_64")]
impl TscClock {
    /// Create from TSC frequency (Hz).
    pub fn new(tsc_freq: u64) -> Self {
        Self {
            ticks_per_ms: (tsc_freq / 1_000).max(1),
        }
    }

    /// Convert milliseconds to ticks
    #[inline]
    pub fn ms_to_ticks(&self, ms: u64) -> u64 {
        ms * self.ticks_per_ms
    }
}

#[cfg(target_arch = "x86_64")]
impl Clock for TscClock {
    fn now_ms(&self) -> u64 {
        read_tsc() / self.ticks_per_ms
    }

    fn sleep_ms(&self, ms: u64) {
        let start = read_tsc();
        let ticks = self.ms_to_ticks(ms);
        while read_tsc().wrapping_sub(start) < ticks {
            core::hint::spin_loop();
        }
    }
}

/// Read TSC (Time Stamp Counter).
#[cfg(target_arch = "x86_64")]
#[inline]
pub fn read_tsc() -> u64 {
    let lo: u32;
    let hi: u32;
    unsafe {
        core::arch::asm!(
            "rdtsc",
            out("eax") lo,
            out("edx") hi,
            options(nostack, nomem, preserves_flags)
        );
    }
    ((hi as u64) << 32) | (lo as u64)
}

/// Wall clock for hosted builds.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn sleep_ms(&self, ms: u64) {
        std::thread::sleep(std::time::Duration::from_millis(ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct FixedClock(Cell<u64>);

    impl Clock for FixedClock {
        fn now_ms(&self) -> u64 {
            self.0.get()
        }

        fn sleep_ms(&self, ms: u64) {
            self.0.set(self.0.get() + ms);
        }
    }

    #[test]
    fn test_deadline_expires_after_interval() {
        let clock = FixedClock(Cell::new(100));
        let deadline = Deadline::after(&clock, 50);
        assert!(!deadline.expired(&clock));
        assert_eq!(deadline.remaining_ms(&clock), 50);

        clock.sleep_ms(49);
        assert!(!deadline.expired(&clock));

        clock.sleep_ms(1);
        assert!(deadline.expired(&clock));
        assert_eq!(deadline.remaining_ms(&clock), 0);
    }

    #[test]
    fn test_deadline_saturates() {
        let clock = FixedClock(Cell::new(u64::MAX - 1));
        let deadline = Deadline::after(&clock, 10);
        assert!(!deadline.expired(&clock));
    }

    #[test]
    fn test_default_timeouts() {
        let t = Timeouts::default();
        assert_eq!(t.link_ms, 10_000);
        assert_eq!(t.resolve_ms, 5_000);
        assert_eq!(t.receive_ms, 30_000);
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn test_tsc_conversion() {
        let clock = TscClock::new(2_000_000_000);
        assert_eq!(clock.ms_to_ticks(3), 6_000_000);
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn test_tsc_clock_advances_across_sleep() {
        let clock = TscClock::new(1_000_000_000);
        let before = clock.now_ms();
        clock.sleep_ms(2);
        assert!(clock.now_ms() > before);
    }
}
