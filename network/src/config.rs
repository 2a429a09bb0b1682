//! Session configuration.

use crate::time::Timeouts;

/// Configuration for the session loop.
#[derive(Debug, Clone)]
pub struct SessionConfig<'a> {
    /// Wireless network name
    pub ssid: &'a str,
    /// WPA2 passphrase
    pub credential: &'a str,
    /// Server host name (or dotted-quad address)
    pub hostname: &'a str,
    /// Server TCP port
    pub port: u16,
    /// Interval between idle poll callbacks, in seconds
    pub poll_period_secs: u8,
    /// Fixed pause between cycles
    pub cycle_delay_ms: u64,
    /// Per-phase deadlines
    pub timeouts: Timeouts,
}

impl<'a> SessionConfig<'a> {
    /// Default server port.
    pub const DEFAULT_PORT: u16 = 50_000;
    /// Default idle poll period (5 seconds).
    pub const DEFAULT_POLL_PERIOD_SECS: u8 = 5;
    /// Default pause between cycles (5 seconds).
    pub const DEFAULT_CYCLE_DELAY_MS: u64 = 5_000;

    /// Create config for the given network and server, defaults elsewhere.
    pub fn new(ssid: &'a str, credential: &'a str, hostname: &'a str) -> Self {
        Self {
            ssid,
            credential,
            hostname,
            port: Self::DEFAULT_PORT,
            poll_period_secs: Self::DEFAULT_POLL_PERIOD_SECS,
            cycle_delay_ms: Self::DEFAULT_CYCLE_DELAY_MS,
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_cycle_delay_ms(mut self, ms: u64) -> Self {
        self.cycle_delay_ms = ms;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Poll interval in transport coarse timer slots (two per second).
    pub fn poll_interval_ticks(&self) -> u8 {
        self.poll_period_secs.saturating_mul(2)
    }
}

impl Default for SessionConfig<'static> {
    fn default() -> Self {
        Self::new("ssid", "password", "server")
    }
}
