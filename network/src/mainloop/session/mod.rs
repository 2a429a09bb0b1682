//! Session controller.
//!
//! Drives one full session per cycle and loops forever:
//!
//! ```text
//! link_up → resolve_host → connect_peer → receive → send_greeting
//!     │           │              │            │           │
//!     └───────────┴──── error ───┴────────────┴───────────┘
//!                              ▼
//!                 teardown (close / abort, release link)
//!                              ▼
//!                     reset → sleep → next cycle
//! ```
//!
//! Each phase kicks off its operation and then waits in `wait_for()`,
//! which pumps the stack and applies queued completion events until the
//! phase's target state is reached, an error is recorded, or the phase
//! deadline passes. Any error abandons the rest of the cycle; nothing
//! outlives it except the greeting counter.

mod connect;
mod dns;
mod link;
mod poll;
mod receive;
mod send;
mod teardown;


extern crate alloc;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use log::{info, warn};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::stack::NetStack;
use crate::time::Clock;
use super::context::SessionContext;
use super::event::{CompletionSink, EventQueue};
use super::state::SessionState;

/// What happened during one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// 1-based cycle number.
    pub cycle: u64,
    /// Every state the context passed through, starting and ending at `Init`.
    pub trace: Vec<SessionState>,
    /// State reached before teardown.
    pub terminal: SessionState,
    /// Why the cycle was abandoned, if it was.
    pub error: Option<SessionError>,
    /// Payload kept from the server (possibly truncated).
    pub received: Vec<u8>,
    /// Greeting that was acknowledged.
    pub sent: Vec<u8>,
    /// Inbound bytes discarded for lack of buffer space.
    pub truncated_bytes: usize,
}

impl CycleReport {
    fn new(cycle: u64) -> Self {
        Self {
            cycle,
            trace: Vec::new(),
            terminal: SessionState::Init,
            error: None,
            received: Vec::new(),
            sent: Vec::new(),
            truncated_bytes: 0,
        }
    }

    /// Cycle ran all the way to `Sent`.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.terminal == SessionState::Sent
    }
}

/// Session controller over a network stack.
pub struct Session<'a, S: NetStack, C: Clock> {
    stack: S,
    clock: C,
    config: SessionConfig<'a>,
    ctx: SessionContext<S::Handle>,
    queue: Arc<EventQueue>,
    sink: CompletionSink,
    cycle: u64,
    /// Greetings acknowledged so far; survives resets.
    sent_count: u32,
}

impl<'a, S: NetStack, C: Clock> Session<'a, S, C> {
    pub fn new(stack: S, clock: C, config: SessionConfig<'a>) -> Self {
        let queue = Arc::new(EventQueue::new());
        let sink = CompletionSink::new(queue.clone());
        Self {
            stack,
            clock,
            config,
            ctx: SessionContext::new(),
            queue,
            sink,
            cycle: 0,
            sent_count: 0,
        }
    }

    pub fn context(&self) -> &SessionContext<S::Handle> {
        &self.ctx
    }

    pub fn config(&self) -> &SessionConfig<'a> {
        &self.config
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut S {
        &mut self.stack
    }

    /// Cycles started so far.
    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Greetings acknowledged so far.
    pub fn sent_count(&self) -> u32 {
        self.sent_count
    }

    /// Run one cycle from `Init` back to `Init`.
    pub fn run_cycle(&mut self) -> CycleReport {
        debug_assert!(self.ctx.is_pristine());
        self.cycle += 1;
        info!("[CYCLE] #{} starting", self.cycle);

        let mut report = CycleReport::new(self.cycle);
        let outcome = self.drive(&mut report);
        report.terminal = self.ctx.state();

        if let Err(e) = outcome {
            if e.is_benign() {
                info!("[CYCLE] #{} ended: {}", self.cycle, e);
            } else {
                warn!("[CYCLE] #{} failed in {}: {}", self.cycle, report.terminal, e);
            }
            report.error = Some(e);
        } else {
            info!("[CYCLE] #{} complete", self.cycle);
        }

        self.teardown();

        report.trace = vec![SessionState::Init];
        report.trace.extend_from_slice(self.ctx.history());
        report.trace.push(SessionState::Init);
        report.truncated_bytes = self.ctx.truncated();

        self.reset();
        report
    }

    /// Run `count` cycles with the configured pause between them.
    pub fn run_cycles(&mut self, count: usize) -> Vec<CycleReport> {
        let mut reports = Vec::with_capacity(count);
        for i in 0..count {
            if i > 0 {
                self.clock.sleep_ms(self.config.cycle_delay_ms);
            }
            reports.push(self.run_cycle());
        }
        reports
    }

    /// Run cycles until the device is powered off.
    pub fn run_forever(&mut self) -> ! {
        loop {
            let _ = self.run_cycle();
            self.clock.sleep_ms(self.config.cycle_delay_ms);
        }
    }

    fn drive(&mut self, report: &mut CycleReport) -> Result<()> {
        self.link_up()?;
        self.resolve_host()?;
        self.connect_peer()?;

        self.receive()?;
        report.received = self.ctx.buffer().filled().to_vec();

        self.send_greeting()?;
        report.sent = self.ctx.buffer().filled().to_vec();
        Ok(())
    }

    /// Zero the context and drop any events left over from this cycle.
    fn reset(&mut self) {
        self.queue.clear();
        self.ctx.reset();
        info!("[RESET] Context cleared");
    }
}
