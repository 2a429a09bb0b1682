//! Driver abstraction module.
//!
//! A wireless NIC is consumed through two halves:
//! - `NetworkDriver` - the frame path (receive / transmit raw Ethernet frames)
//! - `Radio` - association control (join / leave a network)
//!
//! Radio bring-up and regulatory configuration happen before either half is
//! handed to the stack.

pub mod traits;

pub use traits::{NetworkDriver, Radio, RadioError, RxError, TxError, WiredRadio};
