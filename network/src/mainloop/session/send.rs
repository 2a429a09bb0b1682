//! Send phase: RECEIVED → SENT.

use log::{info, warn};

use crate::error::{ErrorCode, Result, SessionError};
use crate::mainloop::state::SessionState;
use crate::stack::NetStack;
use crate::time::Clock;

use super::Session;

impl<'a, S: NetStack, C: Clock> Session<'a, S, C> {
    pub(super) fn send_greeting(&mut self) -> Result<()> {
        let Some(handle) = self.ctx.connection() else {
            self.ctx.set_error(ErrorCode::CONN);
            return Err(SessionError::Transport(ErrorCode::CONN));
        };

        let n = self.sent_count;
        let len = match self.ctx.buffer_mut().compose(format_args!("Hello server {}", n)) {
            Ok(len) => len,
            Err(_) => {
                self.ctx.set_error(ErrorCode::BUF);
                return Err(SessionError::Write(ErrorCode::BUF));
            }
        };
        info!("[TX] Sending \"Hello server {}\" ({} bytes)", n, len);

        // A rejected submission never produces an ack, so there is nothing to wait for.
        if let Err(code) = self.stack.write(handle, self.ctx.buffer().filled()) {
            warn!("[TX] Write rejected: {}", code);
            self.ctx.set_error(code);
            return Err(SessionError::Write(code));
        }

        let timeout = self.config.timeouts.send_ms;
        self.wait_for(SessionState::Sent, timeout)
            .map_err(SessionError::transport)?;

        self.sent_count = self.sent_count.wrapping_add(1);
        info!("[TX] Acknowledged");
        Ok(())
    }
}
