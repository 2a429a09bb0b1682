//! End-of-cycle teardown.

use log::{debug, info, warn};

use crate::mainloop::state::SessionState;
use crate::stack::NetStack;
use crate::time::Clock;

use super::Session;

impl<'a, S: NetStack, C: Clock> Session<'a, S, C> {
    /// Close the connection held by the context, aborting if close fails.
    pub(super) fn release_connection(&mut self) {
        if let Some(handle) = self.ctx.detach() {
            debug!("[CLOSE] Closing {:?}", handle);
            if let Err(code) = self.stack.close(handle) {
                warn!("[CLOSE] Close failed ({}), aborting", code);
                self.stack.abort(handle);
            }
        }
    }

    /// Release whatever the cycle still holds: connection first, then link.
    pub(super) fn teardown(&mut self) {
        if self.ctx.state().has_connection() {
            info!("[CLOSE] Closing connection");
            self.release_connection();
            self.ctx.enter(SessionState::LinkUp);
        }

        if self.ctx.state().holds_link() {
            info!("[LINK] Disconnecting");
            self.stack.link_disconnect();
        }
    }
}
