//! Error codes and the session failure taxonomy.
//!
//! Two layers:
//! - `ErrorCode` - the raw signed status recorded in the session context.
//!   Zero means "no error"; negative values follow lwIP `err_t` numbering so
//!   codes coming out of an lwIP-style transport pass through unchanged.
//! - `SessionError` - which phase of the cycle failed, carrying the code.
//!
//! Nothing here ever leaves the cycle that produced it: every error is
//! logged, the cycle is abandoned and the session is reset.

use core::fmt;

/// Signed status code. Zero means no error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct ErrorCode(pub i8);

impl ErrorCode {
    pub const OK: Self = Self(0);
    /// Out of memory or no connection object available.
    pub const MEM: Self = Self(-1);
    /// Outbound queue has no room for the write.
    pub const BUF: Self = Self(-2);
    pub const TIMEOUT: Self = Self(-3);
    /// No route to the peer (interface not addressed).
    pub const ROUTE: Self = Self(-4);
    pub const VALUE: Self = Self(-6);
    /// Operation requires an established connection.
    pub const CONN: Self = Self(-11);
    pub const ABORTED: Self = Self(-13);
    /// Connection refused or reset by the peer.
    pub const RESET: Self = Self(-14);
    /// Connection closed by the peer.
    pub const CLOSED: Self = Self(-15);
    pub const ARG: Self = Self(-16);
    /// Name resolution produced no address.
    pub const RESOLVE: Self = Self(-20);
    /// Radio association or address lease failed.
    pub const LINK: Self = Self(-21);

    #[inline]
    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_err(self) -> bool {
        self.0 != 0
    }

    #[inline]
    pub const fn raw(self) -> i8 {
        self.0
    }

    /// Short symbolic name for logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::OK => "ok",
            Self::MEM => "out of memory",
            Self::BUF => "buffer full",
            Self::TIMEOUT => "timeout",
            Self::ROUTE => "no route",
            Self::VALUE => "illegal value",
            Self::CONN => "not connected",
            Self::ABORTED => "connection aborted",
            Self::RESET => "connection reset",
            Self::CLOSED => "connection closed",
            Self::ARG => "illegal argument",
            Self::RESOLVE => "resolution failed",
            Self::LINK => "link failure",
            _ => "unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

/// Why a cycle was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// Association with the wireless network failed or timed out.
    Link(ErrorCode),
    /// Host name not found or resolution timed out.
    Resolution(ErrorCode),
    /// Transport refused or failed to establish the connection.
    Connect(ErrorCode),
    /// Peer closed the connection. Benign: the link stays up.
    TransportClosed,
    /// Any other fault on an established connection.
    Transport(ErrorCode),
    /// The transport rejected the write submission itself.
    Write(ErrorCode),
}

impl SessionError {
    /// Underlying status code.
    pub fn code(&self) -> ErrorCode {
        match *self {
            Self::Link(code)
            | Self::Resolution(code)
            | Self::Connect(code)
            | Self::Transport(code)
            | Self::Write(code) => code,
            Self::TransportClosed => ErrorCode::CLOSED,
        }
    }

    /// Peer-initiated close is expected behaviour, not a fault.
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::TransportClosed)
    }

    /// Classify a failure observed on an established connection.
    pub fn transport(code: ErrorCode) -> Self {
        if code == ErrorCode::CLOSED {
            Self::TransportClosed
        } else {
            Self::Transport(code)
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link(code) => write!(f, "link association failed: {}", code),
            Self::Resolution(code) => write!(f, "name resolution failed: {}", code),
            Self::Connect(code) => write!(f, "connect failed: {}", code),
            Self::TransportClosed => write!(f, "connection closed by peer"),
            Self::Transport(code) => write!(f, "transport error: {}", code),
            Self::Write(code) => write!(f, "write rejected: {}", code),
        }
    }
}

/// Result type for session operations.
pub type Result<T> = core::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_ok() {
        assert!(ErrorCode::OK.is_ok());
        assert!(ErrorCode::default().is_ok());
        assert!(ErrorCode::CLOSED.is_err());
    }

    #[test]
    fn test_lwip_numbering() {
        assert_eq!(ErrorCode::CLOSED.raw(), -15);
        assert_eq!(ErrorCode::RESET.raw(), -14);
        assert_eq!(ErrorCode::TIMEOUT.raw(), -3);
    }

    #[test]
    fn test_closed_classifies_as_benign() {
        let err = SessionError::transport(ErrorCode::CLOSED);
        assert_eq!(err, SessionError::TransportClosed);
        assert!(err.is_benign());
        assert_eq!(err.code(), ErrorCode::CLOSED);
    }

    #[test]
    fn test_other_transport_codes_are_faults() {
        let err = SessionError::transport(ErrorCode::RESET);
        assert_eq!(err, SessionError::Transport(ErrorCode::RESET));
        assert!(!err.is_benign());
    }

    #[test]
    fn test_display_includes_code() {
        let text = alloc::format!("{}", SessionError::Write(ErrorCode::BUF));
        assert_eq!(text, "write rejected: buffer full (-2)");
    }
}
