//! Receive phase: CONNECTED → RECEIVED.

extern crate alloc;
use alloc::string::String;

use log::info;

use crate::error::{Result, SessionError};
use crate::mainloop::state::SessionState;
use crate::stack::NetStack;
use crate::time::Clock;

use super::Session;

impl<'a, S: NetStack, C: Clock> Session<'a, S, C> {
    pub(super) fn receive(&mut self) -> Result<()> {
        info!("[RX] Waiting for data");

        let timeout = self.config.timeouts.receive_ms;
        self.wait_for(SessionState::Received, timeout)
            .map_err(SessionError::transport)?;

        let data = self.ctx.buffer().filled();
        info!("[RX] Received data \"{}\"", String::from_utf8_lossy(data));
        Ok(())
    }
}
