//! Completion events and the handler contracts that produce them.
//!
//! The network stack reports asynchronous outcomes by calling the methods
//! of a `CompletionSink` from inside `pump_events()`. The sink never
//! touches the session context: it turns each call into an `Event` on a
//! single queue, which the poll loop drains and applies in one place.
//!
//! ```text
//!   stack (pump_events)          poll loop
//!   ──────────────────           ─────────
//!   sink.on_connected() ──push──► EventQueue ──pop──► SessionContext::apply
//! ```

extern crate alloc;
use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use smoltcp::wire::IpAddress;
use spin::Mutex;

use crate::error::ErrorCode;
use super::buffer::BUFFER_CAPACITY;

/// Inbound data copied out of the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// At most `BUFFER_CAPACITY` leading bytes of the segment.
    pub bytes: Vec<u8>,
    /// Length the transport delivered (and was told was consumed).
    pub total_len: usize,
}

impl Payload {
    /// Copy up to `BUFFER_CAPACITY` bytes of `data`.
    pub fn copy_from(data: &[u8]) -> Self {
        let keep = data.len().min(BUFFER_CAPACITY);
        Self {
            bytes: data[..keep].to_vec(),
            total_len: data.len(),
        }
    }

    /// Bytes that did not fit.
    pub fn dropped(&self) -> usize {
        self.total_len - self.bytes.len()
    }
}

/// One asynchronous outcome reported by the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Name resolution finished; `None` means not found.
    Resolved {
        name: String,
        address: Option<IpAddress>,
    },
    /// Connection established.
    Connected,
    /// Data arrived; `None` means the peer closed the connection.
    Received(Option<Payload>),
    /// Peer acknowledged this many bytes.
    Sent(usize),
    /// Transport fault.
    Errored(ErrorCode),
    /// Periodic idle tick.
    Polled,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Resolved { .. } => "Resolved",
            Event::Connected => "Connected",
            Event::Received(_) => "Received",
            Event::Sent(_) => "Sent",
            Event::Errored(_) => "Errored",
            Event::Polled => "Polled",
        }
    }
}

/// FIFO of pending events.
#[derive(Debug)]
pub struct EventQueue {
    events: Mutex<VecDeque<Event>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, event: Event) {
        self.events.lock().push_back(event);
    }

    pub fn pop(&self) -> Option<Event> {
        self.events.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Drop everything still queued.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle the stack uses to report completions.
///
/// Cloning is cheap; every clone feeds the same queue. Handlers never block.
#[derive(Debug, Clone)]
pub struct CompletionSink {
    queue: Arc<EventQueue>,
}

impl CompletionSink {
    pub fn new(queue: Arc<EventQueue>) -> Self {
        Self { queue }
    }

    /// Resolution finished for `name`.
    pub fn on_resolved(&self, name: &str, address: Option<IpAddress>) {
        self.queue.push(Event::Resolved {
            name: String::from(name),
            address,
        });
    }

    /// Connection attempt succeeded. Only called on success.
    pub fn on_connected(&self) {
        self.queue.push(Event::Connected);
    }

    pub fn on_error(&self, code: ErrorCode) {
        self.queue.push(Event::Errored(code));
    }

    /// Inbound data, or `None` when the peer closed.
    ///
    /// Returns how many bytes the stack should treat as consumed: always the
    /// full delivered length, even when only a prefix fits the buffer.
    pub fn on_receive(&self, data: Option<&[u8]>) -> usize {
        match data {
            Some(data) => {
                let payload = Payload::copy_from(data);
                let consumed = payload.total_len;
                self.queue.push(Event::Received(Some(payload)));
                consumed
            }
            None => {
                self.queue.push(Event::Received(None));
                0
            }
        }
    }

    /// Peer acknowledged `acked` bytes.
    pub fn on_sent(&self, acked: usize) {
        self.queue.push(Event::Sent(acked));
    }

    /// Idle tick. Reserved for keepalive.
    pub fn on_poll(&self) {
        self.queue.push(Event::Polled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smoltcp::wire::Ipv4Address;

    fn sink() -> (Arc<EventQueue>, CompletionSink) {
        let queue = Arc::new(EventQueue::new());
        let sink = CompletionSink::new(queue.clone());
        (queue, sink)
    }

    #[test]
    fn test_events_arrive_in_order() {
        let (queue, sink) = sink();
        let addr = IpAddress::Ipv4(Ipv4Address::new(192, 168, 1, 10));
        sink.on_resolved("server", Some(addr));
        sink.on_connected();
        sink.on_sent(3);

        assert_eq!(queue.len(), 3);
        assert_eq!(
            queue.pop(),
            Some(Event::Resolved {
                name: "server".into(),
                address: Some(addr)
            })
        );
        assert_eq!(queue.pop(), Some(Event::Connected));
        assert_eq!(queue.pop(), Some(Event::Sent(3)));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_receive_consumes_full_length() {
        let (queue, sink) = sink();
        let data = [7u8; BUFFER_CAPACITY + 44];
        assert_eq!(sink.on_receive(Some(&data)), BUFFER_CAPACITY + 44);

        match queue.pop() {
            Some(Event::Received(Some(payload))) => {
                assert_eq!(payload.bytes.len(), BUFFER_CAPACITY);
                assert_eq!(payload.dropped(), 44);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_receive_none_reports_close() {
        let (queue, sink) = sink();
        assert_eq!(sink.on_receive(None), 0);
        assert_eq!(queue.pop(), Some(Event::Received(None)));
    }

    #[test]
    fn test_clones_share_queue() {
        let (queue, sink) = sink();
        let other = sink.clone();
        sink.on_poll();
        other.on_error(ErrorCode::RESET);
        assert_eq!(queue.len(), 2);
        queue.clear();
        assert!(queue.is_empty());
    }
}
