//! This module provides the selective-repeat state machine: the send and receive windows and the
//! retransmission timers protecting outstanding packets.

pub use self::receive_window::{Arrival, ReceiveWindow};
pub use self::send_window::{Acknowledgment, SendWindow};
pub use self::timer::{RetransmitScheduler, RetransmitTimers, TimerId};

mod receive_window;
mod send_window;
mod timer;
