//! Connect phase: RESOLVED → CONNECTED.
//!
//! The handle stays local until the connection is up, so the context only
//! ever holds a handle in a connected state. On failure the local handle
//! is aborted here.

use log::{info, warn};

use crate::error::{ErrorCode, Result, SessionError};
use crate::mainloop::state::SessionState;
use crate::stack::NetStack;
use crate::time::Clock;

use super::Session;

impl<'a, S: NetStack, C: Clock> Session<'a, S, C> {
    pub(super) fn connect_peer(&mut self) -> Result<()> {
        let Some(peer) = self.ctx.peer() else {
            self.ctx.set_error(ErrorCode::RESOLVE);
            return Err(SessionError::Resolution(ErrorCode::RESOLVE));
        };
        let port = self.config.port;
        info!("[TCP] Connecting to {}:{}", peer, port);

        let Some(handle) = self.stack.connection_open(peer.version()) else {
            warn!("[TCP] No connection object available");
            self.ctx.set_error(ErrorCode::MEM);
            return Err(SessionError::Connect(ErrorCode::MEM));
        };
        self.stack
            .register_handlers(handle, self.sink.clone(), self.config.poll_interval_ticks());

        if let Err(code) = self.stack.connect(handle, peer, port) {
            warn!("[TCP] Connect rejected: {}", code);
            self.ctx.set_error(code);
            self.stack.abort(handle);
            return Err(SessionError::Connect(code));
        }

        let timeout = self.config.timeouts.connect_ms;
        if let Err(code) = self.wait_for(SessionState::Connected, timeout) {
            warn!("[TCP] Failed to connect: {}", code);
            self.stack.abort(handle);
            return Err(SessionError::Connect(code));
        }

        self.ctx.attach(handle);
        info!("[TCP] Connected");
        Ok(())
    }
}
