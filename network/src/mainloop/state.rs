//! Session states and the transition function.
//!
//! ```text
//! INIT ──link──► LINK_UP ──resolve──► RESOLVED ──connect──► CONNECTED
//!                   ▲                    ▲                      │ data / peer close
//!                   │                    └──── peer close ──────┤
//!                   │                                           ▼
//!                   └────────── close ◄──── SENT ◄──acked──── RECEIVED
//! ```
//!
//! `SessionState::on_event` is pure: it only decides what an event means in
//! the current state. `SessionContext::apply` carries the decision out.

use crate::error::ErrorCode;
use super::event::Event;

/// Phase reached within the current cycle.
///
/// Ordered: within a cycle the state only moves forward, except for the
/// peer-close and close edges back to `Resolved` / `LinkUp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum SessionState {
    #[default]
    Init = 0,
    LinkUp = 1,
    Resolved = 2,
    Connected = 3,
    Received = 4,
    Sent = 5,
}

/// What an event does in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Event does not belong to this state; drop it.
    Ignore,
    /// Record the error, state unchanged.
    Fail(ErrorCode),
    /// Move to the given state (clearing any error on resolution).
    Enter(SessionState),
    /// Advance the send cursor; `Sent` once the buffer drains.
    Advance(usize),
    /// Peer closed: record `CLOSED`, fall back to `Resolved`, release the
    /// connection.
    PeerClosed,
    /// Idle poll tick, nothing to do.
    Idle,
}

impl SessionState {
    pub fn name(self) -> &'static str {
        match self {
            SessionState::Init => "INIT",
            SessionState::LinkUp => "LINK_UP",
            SessionState::Resolved => "RESOLVED",
            SessionState::Connected => "CONNECTED",
            SessionState::Received => "RECEIVED",
            SessionState::Sent => "SENT",
        }
    }

    /// States in which the context owns an open connection.
    #[inline]
    pub fn has_connection(self) -> bool {
        matches!(
            self,
            SessionState::Connected | SessionState::Received | SessionState::Sent
        )
    }

    /// States from which the cycle ends by releasing the link.
    #[inline]
    pub fn holds_link(self) -> bool {
        matches!(self, SessionState::LinkUp | SessionState::Resolved)
    }

    /// Whether `self -> next` is an edge of the session graph.
    pub fn can_enter(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Init, LinkUp)
            | (LinkUp, Resolved)
            | (Resolved, Connected)
            | (Connected, Received)
            | (Received, Sent) => true,
            // peer close during receive or later
            (Connected | Received | Sent, Resolved) => true,
            // orderly close
            (Connected | Received | Sent, LinkUp) => true,
            // cycle end
            (LinkUp | Resolved, Init) => true,
            _ => false,
        }
    }

    /// Decide what `event` means in this state.
    pub fn on_event(self, event: &Event) -> Transition {
        use SessionState::*;
        match (self, event) {
            (LinkUp, Event::Resolved { address: Some(_), .. }) => Transition::Enter(Resolved),
            (LinkUp, Event::Resolved { address: None, .. }) => Transition::Fail(ErrorCode::RESOLVE),
            (Resolved, Event::Connected) => Transition::Enter(Connected),
            (Connected, Event::Received(Some(_))) => Transition::Enter(Received),
            (Connected | Received | Sent, Event::Received(None)) => Transition::PeerClosed,
            (Received, Event::Sent(acked)) => Transition::Advance(*acked),
            (_, Event::Errored(code)) if code.is_err() => Transition::Fail(*code),
            (_, Event::Polled) => Transition::Idle,
            _ => Transition::Ignore,
        }
    }
}

impl core::fmt::Display for SessionState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mainloop::event::Payload;
    use smoltcp::wire::{IpAddress, Ipv4Address};

    const ALL: [SessionState; 6] = [
        SessionState::Init,
        SessionState::LinkUp,
        SessionState::Resolved,
        SessionState::Connected,
        SessionState::Received,
        SessionState::Sent,
    ];

    fn resolved(address: Option<IpAddress>) -> Event {
        Event::Resolved {
            name: "server".into(),
            address,
        }
    }

    fn addr() -> IpAddress {
        IpAddress::Ipv4(Ipv4Address::new(10, 0, 0, 2))
    }

    #[test]
    fn test_happy_path_edges() {
        use SessionState::*;
        assert_eq!(LinkUp.on_event(&resolved(Some(addr()))), Transition::Enter(Resolved));
        assert_eq!(Resolved.on_event(&Event::Connected), Transition::Enter(Connected));
        let data = Event::Received(Some(Payload::copy_from(b"data")));
        assert_eq!(Connected.on_event(&data), Transition::Enter(Received));
        assert_eq!(Received.on_event(&Event::Sent(14)), Transition::Advance(14));
    }

    #[test]
    fn test_every_entered_state_is_a_graph_edge() {
        let events = [
            resolved(Some(addr())),
            resolved(None),
            Event::Connected,
            Event::Received(Some(Payload::copy_from(b"x"))),
            Event::Received(None),
            Event::Sent(1),
            Event::Errored(ErrorCode::RESET),
            Event::Polled,
        ];
        for state in ALL {
            for event in &events {
                match state.on_event(event) {
                    Transition::Enter(next) => assert!(
                        state.can_enter(next),
                        "{} -> {} via {}",
                        state,
                        next,
                        event.name()
                    ),
                    Transition::PeerClosed => {
                        assert!(state.can_enter(SessionState::Resolved))
                    }
                    Transition::Advance(_) => {
                        assert!(state.can_enter(SessionState::Sent))
                    }
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn test_failed_resolution_keeps_state() {
        assert_eq!(
            SessionState::LinkUp.on_event(&resolved(None)),
            Transition::Fail(ErrorCode::RESOLVE)
        );
    }

    #[test]
    fn test_errors_recorded_in_any_state() {
        for state in ALL {
            assert_eq!(
                state.on_event(&Event::Errored(ErrorCode::ABORTED)),
                Transition::Fail(ErrorCode::ABORTED)
            );
        }
        assert_eq!(
            SessionState::Connected.on_event(&Event::Errored(ErrorCode::OK)),
            Transition::Ignore
        );
    }

    #[test]
    fn test_out_of_order_events_are_ignored() {
        use SessionState::*;
        assert_eq!(Connected.on_event(&Event::Sent(3)), Transition::Ignore);
        assert_eq!(LinkUp.on_event(&Event::Connected), Transition::Ignore);
        assert_eq!(Resolved.on_event(&resolved(Some(addr()))), Transition::Ignore);
        let late = Event::Received(Some(Payload::copy_from(b"late")));
        assert_eq!(Received.on_event(&late), Transition::Ignore);
        assert_eq!(Resolved.on_event(&Event::Received(None)), Transition::Ignore);
    }

    #[test]
    fn test_peer_close_from_connected_states() {
        use SessionState::*;
        for state in [Connected, Received, Sent] {
            assert_eq!(state.on_event(&Event::Received(None)), Transition::PeerClosed);
        }
    }

    #[test]
    fn test_no_skipping() {
        use SessionState::*;
        assert!(!Init.can_enter(Resolved));
        assert!(!LinkUp.can_enter(Connected));
        assert!(!Connected.can_enter(Sent));
        assert!(!Sent.can_enter(Init));
        assert!(Sent.can_enter(LinkUp));
        assert!(Resolved.can_enter(Init));
    }

    #[test]
    fn test_ordering_follows_cycle() {
        assert!(SessionState::Init < SessionState::LinkUp);
        assert!(SessionState::Received < SessionState::Sent);
        assert_eq!(SessionState::default(), SessionState::Init);
    }
}
