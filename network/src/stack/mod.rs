//! Capabilities the session consumes from the network stack.
//!
//! # Contract
//!
//! - Nothing here blocks except `Link::link_connect`, which is bounded by
//!   its timeout.
//! - Completion handlers are only ever invoked from inside
//!   `Transport::pump_events` (or synchronously from `Resolver::resolve`
//!   for a cache hit, reported through the return value instead).
//! - At most one connection and one link association exist at a time.
//!
//! # Implementations
//! - `smoltcp_stack::SmoltcpStack` - smoltcp interface with DHCP, DNS and TCP sockets

pub mod adapter;
pub mod smoltcp_stack;

use core::str::FromStr;

use smoltcp::wire::{IpAddress, IpVersion, Ipv4Address};

use crate::error::ErrorCode;
use crate::mainloop::event::CompletionSink;

pub use adapter::{AdapterStats, SmoltcpAdapter};
pub use smoltcp_stack::{IpConfig, SmoltcpStack};

/// Outcome of starting a name resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Answered synchronously (cache hit or literal address).
    Ready(IpAddress),
    /// Query in flight; the answer arrives through `on_resolved`.
    Pending,
    /// Query could not be started.
    Failed(ErrorCode),
}

/// Wireless link association.
pub trait Link {
    /// Join the network and obtain an address, within `timeout_ms`.
    fn link_connect(&mut self, ssid: &str, credential: &str, timeout_ms: u32)
        -> Result<(), ErrorCode>;

    /// Release the association.
    fn link_disconnect(&mut self);
}

/// Host name resolution.
pub trait Resolver {
    /// Start resolving `hostname`. Asynchronous answers go to `sink`.
    fn resolve(&mut self, hostname: &str, sink: &CompletionSink) -> Resolution;
}

/// Byte-stream transport.
pub trait Transport {
    /// Opaque connection handle.
    type Handle: Copy + core::fmt::Debug;

    /// Allocate a connection object for the given address family.
    fn connection_open(&mut self, family: IpVersion) -> Option<Self::Handle>;

    /// Register the error, receive, sent and poll handlers for `handle`.
    ///
    /// The poll handler fires every `poll_interval_ticks` coarse ticks
    /// (two per second).
    fn register_handlers(
        &mut self,
        handle: Self::Handle,
        sink: CompletionSink,
        poll_interval_ticks: u8,
    );

    /// Start connecting. Success is reported through `on_connected`,
    /// failure through `on_error`.
    fn connect(&mut self, handle: Self::Handle, address: IpAddress, port: u16)
        -> Result<(), ErrorCode>;

    /// Queue `bytes` for transmission. The bytes are copied, so the caller
    /// may reuse its buffer immediately. Progress arrives through `on_sent`.
    fn write(&mut self, handle: Self::Handle, bytes: &[u8]) -> Result<(), ErrorCode>;

    /// Graceful shutdown. The handle is released either way.
    fn close(&mut self, handle: Self::Handle) -> Result<(), ErrorCode>;

    /// Forced teardown.
    fn abort(&mut self, handle: Self::Handle);

    /// Drive one tick of the stack, dispatching any ready completions.
    fn pump_events(&mut self);
}

/// Everything the session needs from one stack.
pub trait NetStack: Link + Resolver + Transport {}

impl<T: Link + Resolver + Transport> NetStack for T {}

/// Dotted-quad literal, if `s` is one.
pub fn parse_ipv4(s: &str) -> Option<Ipv4Address> {
    Ipv4Address::from_str(s).ok()
}
