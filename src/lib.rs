//! rdt is a reliable data transfer layer on top of unreliable datagram sockets.
//!
//! It implements selective-repeat ARQ: every payload gets a sequence number, the receiver
//! acknowledges each packet individually, and unacknowledged packets are retransmitted after a
//! timeout until their acknowledgment arrives. Payloads are delivered exactly once, in the order
//! they arrive.
//!
//! # Concepts
//!
//! This library is loosely based off of [Computer Networking: A Top-Down Approach](https://gaia.cs.umass.edu/kurose_ross/),
//! chapter 3.4, and the sliding window it describes.
//!
//! - A send window of at most `window_size` unacknowledged packets, sending beyond it fails
//!   with `ErrorKind::WindowFull`
//! - Selective acknowledgments, the window slides once its oldest packet is acknowledged
//! - A receive buffer that suppresses duplicates and re-acknowledges them
//! - Retransmission timers, either for the oldest packet only or for every outstanding packet
//!
//! # Example
//!
//! ```no_run
//! use rdt::SelectiveRepeat;
//!
//! let server = SelectiveRepeat::bind("127.0.0.1:12345").unwrap();
//! let (tx, mut rx) = SelectiveRepeat::bind_any().unwrap().split();
//!
//! // acknowledgments are only processed while receiving
//! std::thread::spawn(move || while rx.receive().is_ok() {});
//!
//! tx.send(b"hello", &server.local_addr().unwrap()).unwrap();
//! ```

#![warn(missing_docs)]

pub use self::config::{Config, RetransmitStrategy};
pub use self::error::{
    ConfigErrorKind, EncodingErrorKind, ErrorKind, PacketErrorKind, Result,
};
pub use self::net::{
    DatagramSocket, DatagramSocketReceiver, DatagramSocketSender, LinkConditioner, LogObserver,
    SelectiveRepeat, SelectiveRepeatRx, SelectiveRepeatTx, TransportEvent, TransportObserver,
    UdpSocket,
};
pub use self::packet::{header::PacketHeader, Packet, SequenceNumber};
#[cfg(feature = "tester")]
pub use self::throughput::ThroughputMonitoring;

mod config;
mod error;
mod infrastructure;
mod net;
mod packet;
mod sequence_buffer;
#[cfg(feature = "tester")]
mod throughput;

#[cfg(test)]
mod test_utils;
