//! Wireless TCP session client.
//!
//! Brings a link up, resolves the server, connects, receives one payload,
//! answers with `Hello server N`, closes and starts over, forever.
//!
//! # Modules
//! - `mainloop` - Session state machine, event queue and poll loop
//! - `stack` - Capabilities consumed from the network stack, smoltcp implementation
//! - `driver` - NIC and radio traits the smoltcp stack runs on
//! - `time` - Clocks, deadlines and phase timeouts
//! - `config` - Session configuration
//! - `error` - Status codes and session errors

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod config;
pub mod driver;
pub mod error;
pub mod mainloop;
pub mod stack;
pub mod time;

pub use config::SessionConfig;
pub use error::{ErrorCode, Result, SessionError};
pub use mainloop::{CycleReport, Session, SessionState};
pub use stack::{IpConfig, NetStack, Resolution, SmoltcpAdapter, SmoltcpStack};
pub use time::{Clock, Timeouts};
