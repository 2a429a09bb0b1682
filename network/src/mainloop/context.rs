//! Session context.
//!
//! The single mutable record the cycle works on: state, last error, peer
//! address, connection handle and the shared buffer. Allocated once,
//! zeroed at the end of every cycle.
//!
//! Only the session controller writes here. Completion handlers reach it
//! indirectly, through events applied by `apply()`.

extern crate alloc;
use alloc::vec::Vec;

use log::{debug, trace, warn};
use smoltcp::wire::IpAddress;

use crate::error::ErrorCode;
use super::buffer::SessionBuffer;
use super::event::Event;
use super::state::{SessionState, Transition};

/// Follow-up the controller must perform after applying an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// The connection is dead; close it and drop the handle.
    ReleaseConnection,
}

/// Shared context for one session cycle.
pub struct SessionContext<H> {
    state: SessionState,
    last_error: ErrorCode,
    peer: Option<IpAddress>,
    /// Present iff `state.has_connection()`.
    connection: Option<H>,
    buffer: SessionBuffer,
    /// Inbound bytes dropped for lack of capacity this cycle.
    truncated: usize,
    /// States entered this cycle, in order.
    history: Vec<SessionState>,
}

impl<H: Copy> SessionContext<H> {
    pub const fn new() -> Self {
        Self {
            state: SessionState::Init,
            last_error: ErrorCode::OK,
            peer: None,
            connection: None,
            buffer: SessionBuffer::new(),
            truncated: 0,
            history: Vec::new(),
        }
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    pub fn last_error(&self) -> ErrorCode {
        self.last_error
    }

    pub fn peer(&self) -> Option<IpAddress> {
        self.peer
    }

    pub fn connection(&self) -> Option<H> {
        self.connection
    }

    pub fn buffer(&self) -> &SessionBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut SessionBuffer {
        &mut self.buffer
    }

    pub fn truncated(&self) -> usize {
        self.truncated
    }

    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    /// Move to `next`. Every state change goes through here.
    pub fn enter(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_enter(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        trace!("[CTX] {} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
    }

    pub fn set_error(&mut self, code: ErrorCode) {
        self.last_error = code;
    }

    /// Record a resolved peer synchronously (cache hit or literal address).
    pub fn resolved(&mut self, address: IpAddress) {
        self.peer = Some(address);
        self.last_error = ErrorCode::OK;
        self.enter(SessionState::Resolved);
    }

    /// Take ownership of a freshly connected handle.
    pub fn attach(&mut self, handle: H) {
        debug_assert!(self.state.has_connection());
        self.connection = Some(handle);
    }

    /// Give up ownership of the connection handle.
    pub fn detach(&mut self) -> Option<H> {
        self.connection.take()
    }

    /// Apply one completion event.
    pub fn apply(&mut self, event: Event) -> Effect {
        match self.state.on_event(&event) {
            Transition::Ignore => {
                debug!("[CTX] Ignoring {} in {}", event.name(), self.state);
                Effect::None
            }
            Transition::Fail(code) => {
                self.last_error = code;
                Effect::None
            }
            Transition::Enter(next) => {
                match event {
                    Event::Resolved {
                        address: Some(address),
                        ..
                    } => {
                        self.peer = Some(address);
                        self.last_error = ErrorCode::OK;
                    }
                    Event::Received(Some(payload)) => {
                        let fill = self.buffer.fill(&payload.bytes);
                        let dropped = fill.dropped + payload.dropped();
                        if dropped > 0 {
                            warn!(
                                "[RX] Payload of {} bytes truncated to {}",
                                payload.total_len, fill.copied
                            );
                            self.truncated += dropped;
                        }
                    }
                    _ => {}
                }
                self.enter(next);
                Effect::None
            }
            Transition::Advance(acked) => {
                if self.buffer.advance(acked) {
                    self.enter(SessionState::Sent);
                }
                Effect::None
            }
            Transition::PeerClosed => {
                self.last_error = ErrorCode::CLOSED;
                self.enter(SessionState::Resolved);
                Effect::ReleaseConnection
            }
            Transition::Idle => {
                trace!("[CTX] Poll tick in {}", self.state);
                Effect::None
            }
        }
    }

    /// Zero every field and return to `Init`.
    pub fn reset(&mut self) {
        self.state = SessionState::Init;
        self.last_error = ErrorCode::OK;
        self.peer = None;
        self.connection = None;
        self.buffer.zero();
        self.truncated = 0;
        self.history.clear();
    }

    /// Whether every field holds its zero / `Init` value.
    pub fn is_pristine(&self) -> bool {
        self.state == SessionState::Init
            && self.last_error.is_ok()
            && self.peer.is_none()
            && self.connection.is_none()
            && self.buffer.is_zeroed()
            && self.truncated == 0
            && self.history.is_empty()
    }
}

impl<H: Copy> Default for SessionContext<H> {
    fn default() -> Self {
        Self::new()
    }
}
