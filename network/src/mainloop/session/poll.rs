//! Cooperative wait loop.

use crate::error::ErrorCode;
use crate::mainloop::context::Effect;
use crate::mainloop::state::SessionState;
use crate::stack::NetStack;
use crate::time::{Clock, Deadline};

use super::Session;

impl<'a, S: NetStack, C: Clock> Session<'a, S, C> {
    /// Pump the stack until the context reaches `target`.
    ///
    /// Returns at once if the target was already reached by events applied
    /// in an earlier phase. Otherwise returns the recorded error if one shows
    /// up first, or `TIMEOUT` once `timeout_ms` has passed. The state is
    /// checked before the error so an error that arrives after the target was
    /// reached does not fail the phase.
    pub(super) fn wait_for(&mut self, target: SessionState, timeout_ms: u32) -> Result<(), ErrorCode> {
        let deadline = Deadline::after(&self.clock, timeout_ms as u64);

        loop {
            if self.ctx.state() >= target {
                return Ok(());
            }

            let error = self.ctx.last_error();
            if error.is_err() {
                return Err(error);
            }

            if deadline.expired(&self.clock) {
                self.ctx.set_error(ErrorCode::TIMEOUT);
                return Err(ErrorCode::TIMEOUT);
            }

            self.stack.pump_events();
            self.dispatch();
            core::hint::spin_loop();
        }
    }

    /// Apply every queued event, in arrival order.
    pub(super) fn dispatch(&mut self) {
        while let Some(event) = self.queue.pop() {
            if self.ctx.apply(event) == Effect::ReleaseConnection {
                self.release_connection();
            }
        }
    }
}
