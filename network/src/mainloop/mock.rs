//! Scripted network stack and manual clock for session tests.
//!
//! Every `pump_events()` advances the clock by one millisecond and plays
//! the next scripted action through the registered completion sink. An
//! empty script leaves the stack idle, so waits run into their deadlines.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::string::String;
use std::vec::Vec;

use smoltcp::wire::{IpAddress, IpVersion, Ipv4Address};

use crate::error::ErrorCode;
use crate::mainloop::event::CompletionSink;
use crate::stack::{Link, Resolution, Resolver, Transport};
use crate::time::Clock;

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub(crate) struct ManualClock(Rc<Cell<u64>>);

impl ManualClock {
    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }

    fn sleep_ms(&self, ms: u64) {
        self.advance(ms);
    }
}

/// One scripted completion, played by a single pump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Action {
    Resolve(Option<IpAddress>),
    Connect,
    Receive(Vec<u8>),
    PeerClose,
    /// Acknowledge everything written so far.
    AckAll,
    Ack(usize),
    Error(ErrorCode),
    Poll,
    Idle,
    /// Several completions within the same pump.
    Batch(Vec<Action>),
}

/// Capability call observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    LinkConnect(String),
    LinkDisconnect,
    Resolve(String),
    Open,
    Register(u8),
    Connect(IpAddress, u16),
    Write(Vec<u8>),
    Close(u8),
    Abort(u8),
}

pub(crate) struct MockStack {
    pub link: Result<(), ErrorCode>,
    pub resolution: Resolution,
    pub open: bool,
    pub connect_result: Result<(), ErrorCode>,
    pub write_result: Result<(), ErrorCode>,
    pub close_result: Result<(), ErrorCode>,
    pub script: VecDeque<Action>,
    pub calls: Vec<Call>,
    pub pumps: usize,
    clock: ManualClock,
    resolver_sink: Option<(String, CompletionSink)>,
    sink: Option<CompletionSink>,
    unacked: usize,
    next_handle: u8,
}

pub(crate) fn server_addr() -> IpAddress {
    IpAddress::Ipv4(Ipv4Address::new(192, 168, 1, 10))
}

impl MockStack {
    /// Stack on which every operation succeeds and nothing completes.
    pub fn new(clock: ManualClock) -> Self {
        Self {
            link: Ok(()),
            resolution: Resolution::Pending,
            open: true,
            connect_result: Ok(()),
            write_result: Ok(()),
            close_result: Ok(()),
            script: VecDeque::new(),
            calls: Vec::new(),
            pumps: 0,
            clock,
            resolver_sink: None,
            sink: None,
            unacked: 0,
            next_handle: 1,
        }
    }

    /// Script for one full successful exchange.
    pub fn happy_script() -> Vec<Action> {
        std::vec![
            Action::Resolve(Some(server_addr())),
            Action::Connect,
            Action::Receive(b"data".to_vec()),
            Action::AckAll,
        ]
    }

    pub fn with_script(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.script.extend(actions);
        self
    }

    /// Position of the first call equal to `call`.
    pub fn position(&self, call: &Call) -> Option<usize> {
        self.calls.iter().position(|c| c == call)
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl Link for MockStack {
    fn link_connect(&mut self, ssid: &str, _credential: &str, _timeout_ms: u32) -> Result<(), ErrorCode> {
        self.calls.push(Call::LinkConnect(ssid.into()));
        self.link
    }

    fn link_disconnect(&mut self) {
        self.calls.push(Call::LinkDisconnect);
    }
}

impl Resolver for MockStack {
    fn resolve(&mut self, hostname: &str, sink: &CompletionSink) -> Resolution {
        self.calls.push(Call::Resolve(hostname.into()));
        self.resolver_sink = Some((hostname.into(), sink.clone()));
        self.resolution
    }
}

impl Transport for MockStack {
    type Handle = u8;

    fn connection_open(&mut self, _family: IpVersion) -> Option<u8> {
        self.calls.push(Call::Open);
        if !self.open {
            return None;
        }
        let handle = self.next_handle;
        self.next_handle = self.next_handle.wrapping_add(1);
        Some(handle)
    }

    fn register_handlers(&mut self, _handle: u8, sink: CompletionSink, poll_interval_ticks: u8) {
        self.calls.push(Call::Register(poll_interval_ticks));
        self.sink = Some(sink);
    }

    fn connect(&mut self, _handle: u8, address: IpAddress, port: u16) -> Result<(), ErrorCode> {
        self.calls.push(Call::Connect(address, port));
        self.connect_result
    }

    fn write(&mut self, _handle: u8, bytes: &[u8]) -> Result<(), ErrorCode> {
        self.calls.push(Call::Write(bytes.to_vec()));
        if self.write_result.is_ok() {
            self.unacked += bytes.len();
        }
        self.write_result
    }

    fn close(&mut self, handle: u8) -> Result<(), ErrorCode> {
        self.calls.push(Call::Close(handle));
        self.sink = None;
        self.close_result
    }

    fn abort(&mut self, handle: u8) {
        self.calls.push(Call::Abort(handle));
        self.sink = None;
    }

    fn pump_events(&mut self) {
        self.pumps += 1;
        self.clock.advance(1);

        let Some(action) = self.script.pop_front() else {
            return;
        };
        self.play(action);
    }
}

impl MockStack {
    fn play(&mut self, action: Action) {
        match action {
            Action::Resolve(address) => {
                if let Some((name, sink)) = &self.resolver_sink {
                    sink.on_resolved(name, address);
                }
            }
            Action::Connect => {
                if let Some(sink) = &self.sink {
                    sink.on_connected();
                }
            }
            Action::Receive(data) => {
                if let Some(sink) = &self.sink {
                    sink.on_receive(Some(&data));
                }
            }
            Action::PeerClose => {
                if let Some(sink) = &self.sink {
                    sink.on_receive(None);
                }
            }
            Action::AckAll => {
                if let Some(sink) = &self.sink {
                    sink.on_sent(self.unacked);
                    self.unacked = 0;
                }
            }
            Action::Ack(n) => {
                if let Some(sink) = &self.sink {
                    sink.on_sent(n);
                    self.unacked = self.unacked.saturating_sub(n);
                }
            }
            Action::Error(code) => {
                if let Some(sink) = &self.sink {
                    sink.on_error(code);
                }
            }
            Action::Poll => {
                if let Some(sink) = &self.sink {
                    sink.on_poll();
                }
            }
            Action::Idle => {}
            Action::Batch(actions) => {
                for action in actions {
                    self.play(action);
                }
            }
        }
    }
}
