//! Link association phase: INIT → LINK_UP.

use log::{info, warn};

use crate::error::{Result, SessionError};
use crate::mainloop::state::SessionState;
use crate::stack::NetStack;
use crate::time::Clock;

use super::Session;

impl<'a, S: NetStack, C: Clock> Session<'a, S, C> {
    pub(super) fn link_up(&mut self) -> Result<()> {
        let ssid = self.config.ssid;
        info!("[LINK] Connecting to {}", ssid);

        let timeout = self.config.timeouts.link_ms;
        if let Err(code) = self.stack.link_connect(ssid, self.config.credential, timeout) {
            warn!("[LINK] Failed to connect: {}", code);
            self.ctx.set_error(code);
            return Err(SessionError::Link(code));
        }

        self.ctx.enter(SessionState::LinkUp);
        info!("[LINK] Connected");
        Ok(())
    }
}
