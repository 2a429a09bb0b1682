//! Name resolution phase: LINK_UP → RESOLVED.

use log::{debug, info, warn};

use crate::error::{Result, SessionError};
use crate::mainloop::state::SessionState;
use crate::stack::{NetStack, Resolution};
use crate::time::Clock;

use super::Session;

impl<'a, S: NetStack, C: Clock> Session<'a, S, C> {
    pub(super) fn resolve_host(&mut self) -> Result<()> {
        let hostname = self.config.hostname;
        info!("[DNS] Resolving {}", hostname);

        match self.stack.resolve(hostname, &self.sink) {
            Resolution::Ready(address) => {
                debug!("[DNS] Answered without a query");
                self.ctx.resolved(address);
            }
            Resolution::Pending => {
                let timeout = self.config.timeouts.resolve_ms;
                if let Err(code) = self.wait_for(SessionState::Resolved, timeout) {
                    warn!("[DNS] Failed to resolve {}: {}", hostname, code);
                    return Err(SessionError::Resolution(code));
                }
            }
            Resolution::Failed(code) => {
                warn!("[DNS] Failed to start query for {}: {}", hostname, code);
                self.ctx.set_error(code);
                return Err(SessionError::Resolution(code));
            }
        }

        if let Some(address) = self.ctx.peer() {
            info!("[DNS] {} is {}", hostname, address);
        }
        Ok(())
    }
}
