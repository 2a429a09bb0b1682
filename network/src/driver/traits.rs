//! Driver traits.

use core::fmt;

/// Errors reported by the receive path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxError {
    /// Frame larger than the supplied buffer.
    BufferTooSmall { needed: usize },
    /// Device reported a fault.
    DeviceError,
}

/// Errors reported by the transmit path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxError {
    /// No free transmit descriptor.
    QueueFull,
    /// Device reported a fault.
    DeviceError,
}

/// Errors reported by association control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// Network not found.
    NoNetwork,
    /// Credential rejected.
    AuthFailed,
    /// Firmware or bus fault.
    DeviceError,
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoNetwork => write!(f, "Network not found"),
            Self::AuthFailed => write!(f, "Authentication failed"),
            Self::DeviceError => write!(f, "Radio device error"),
        }
    }
}

/// Frame-level NIC interface.
pub trait NetworkDriver {
    /// Station MAC address.
    fn mac_address(&self) -> [u8; 6];

    /// Copy the next received frame into `buffer`.
    ///
    /// `Ok(None)` when nothing is pending.
    fn receive(&mut self, buffer: &mut [u8]) -> Result<Option<usize>, RxError>;

    /// Queue one frame for transmission.
    fn transmit(&mut self, frame: &[u8]) -> Result<(), TxError>;

    /// Whether a transmit descriptor is free.
    fn can_transmit(&self) -> bool;

    /// Carrier / association state as seen by the data path.
    fn link_up(&self) -> bool;
}

/// Association control for a wireless NIC.
pub trait Radio {
    /// Start joining `ssid`. Completion is observed through `is_associated`.
    fn associate(&mut self, ssid: &str, credential: &str) -> Result<(), RadioError>;

    fn is_associated(&self) -> bool;

    /// Leave the network.
    fn disassociate(&mut self);
}

/// Radio for wired or virtual interfaces: always associated.
#[derive(Debug, Clone, Copy, Default)]
pub struct WiredRadio;

impl Radio for WiredRadio {
    fn associate(&mut self, _ssid: &str, _credential: &str) -> Result<(), RadioError> {
        Ok(())
    }

    fn is_associated(&self) -> bool {
        true
    }

    fn disassociate(&mut self) {}
}
