//! `smoltcp::phy::Device` over a frame-level `NetworkDriver`.
//!
//! One inbound frame is staged at a time. The RX token owns a copy of it so
//! the driver stays free for the paired TX token. Transmit failures are
//! counted, not reported: TCP retransmits on its own timers.

use log::trace;
use smoltcp::phy::{self, Device, DeviceCapabilities, Medium};
use smoltcp::time::Instant;

use crate::driver::traits::{NetworkDriver, RxError};

/// Largest Ethernet frame handled (no FCS).
pub const MAX_FRAME: usize = 1514;

/// Frame counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdapterStats {
    pub rx_frames: u32,
    pub rx_errors: u32,
    pub tx_frames: u32,
    pub tx_errors: u32,
}

pub struct SmoltcpAdapter<'a, D: NetworkDriver> {
    driver: &'a mut D,
    frame: [u8; MAX_FRAME],
    /// Length of the staged frame, if one is waiting.
    staged: Option<usize>,
    stats: AdapterStats,
}

impl<'a, D: NetworkDriver> SmoltcpAdapter<'a, D> {
    pub fn new(driver: &'a mut D) -> Self {
        Self {
            driver,
            frame: [0u8; MAX_FRAME],
            staged: None,
            stats: AdapterStats::default(),
        }
    }

    fn stage(&mut self) {
        if self.staged.is_some() {
            return;
        }
        match self.driver.receive(&mut self.frame) {
            Ok(Some(len)) => {
                self.staged = Some(len.min(MAX_FRAME));
                self.stats.rx_frames = self.stats.rx_frames.wrapping_add(1);
            }
            Ok(None) => {}
            Err(RxError::BufferTooSmall { needed }) => {
                trace!("[NIC] dropped {} byte frame", needed);
                self.stats.rx_errors = self.stats.rx_errors.wrapping_add(1);
            }
            Err(e) => {
                trace!("[NIC] rx failed: {:?}", e);
                self.stats.rx_errors = self.stats.rx_errors.wrapping_add(1);
            }
        }
    }

    /// Station address reported by the driver.
    pub fn mac_address(&self) -> [u8; 6] {
        self.driver.mac_address()
    }

    pub fn stats(&self) -> AdapterStats {
        self.stats
    }
}

pub struct RxToken {
    frame: [u8; MAX_FRAME],
    len: usize,
}

impl phy::RxToken for RxToken {
    fn consume<R, F>(mut self, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        f(&mut self.frame[..self.len])
    }
}

pub struct TxToken<'a, D: NetworkDriver> {
    driver: &'a mut D,
    stats: &'a mut AdapterStats,
}

impl<'a, D: NetworkDriver> phy::TxToken for TxToken<'a, D> {
    fn consume<R, F>(self, len: usize, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        let mut out = [0u8; MAX_FRAME];
        let len = len.min(MAX_FRAME);
        let result = f(&mut out[..len]);

        match self.driver.transmit(&out[..len]) {
            Ok(()) => self.stats.tx_frames = self.stats.tx_frames.wrapping_add(1),
            Err(e) => {
                trace!("[NIC] tx failed: {:?}", e);
                self.stats.tx_errors = self.stats.tx_errors.wrapping_add(1);
            }
        }
        result
    }
}

impl<'a, D: NetworkDriver> Device for SmoltcpAdapter<'a, D> {
    type RxToken<'b> = RxToken where Self: 'b;
    type TxToken<'b> = TxToken<'b, D> where Self: 'b;

    fn receive(&mut self, _timestamp: Instant) -> Option<(Self::RxToken<'_>, Self::TxToken<'_>)> {
        self.stage();
        let len = self.staged.take()?;

        let rx = RxToken {
            frame: self.frame,
            len,
        };
        let tx = TxToken {
            driver: &mut *self.driver,
            stats: &mut self.stats,
        };
        Some((rx, tx))
    }

    fn transmit(&mut self, _timestamp: Instant) -> Option<Self::TxToken<'_>> {
        if !self.driver.can_transmit() {
            return None;
        }
        Some(TxToken {
            driver: &mut *self.driver,
            stats: &mut self.stats,
        })
    }

    fn capabilities(&self) -> DeviceCapabilities {
        let mut caps = DeviceCapabilities::default();
        caps.medium = Medium::Ethernet;
        caps.max_transmission_unit = MAX_FRAME;
        caps.max_burst_size = Some(1);
        caps
    }
}
