//! This module provides the selective-repeat transport and the datagram sockets it runs on.

pub use self::datagram_socket::{DatagramSocket, DatagramSocketReceiver, DatagramSocketSender};
pub use self::events::{LogObserver, TransportEvent, TransportObserver};
pub use self::link_conditioner::LinkConditioner;
pub use self::selective_repeat::{SelectiveRepeat, SelectiveRepeatRx, SelectiveRepeatTx};
pub use self::socket::UdpSocket;

pub(crate) use self::events::DisplayAddress;

mod datagram_socket;
mod events;
mod link_conditioner;
mod selective_repeat;
mod socket;

pub mod constants;
