use std::fmt::{self, Debug, Display};

use crossbeam_channel::Sender;
use log::{debug, info, trace};
use socket2::SockAddr;

use crate::packet::SequenceNumber;

/// Something that happened inside a transport, reported to its `TransportObserver`.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A data packet was put on the wire for the first time.
    PacketSent {
        /// Sequence number assigned to the packet.
        sequence: SequenceNumber,
        /// Destination of the packet.
        address: SockAddr,
        /// Payload length in bytes.
        length: usize,
    },
    /// An acknowledgment for an outstanding packet arrived.
    AckReceived {
        /// The acknowledged sequence number.
        sequence: SequenceNumber,
        /// The oldest unacknowledged sequence number after processing the acknowledgment.
        send_base: SequenceNumber,
    },
    /// An acknowledgment was sent for a received data packet.
    AckSent {
        /// The acknowledged sequence number.
        sequence: SequenceNumber,
        /// Where the acknowledgment went.
        address: SockAddr,
    },
    /// A data packet that was received before arrived again and was dropped.
    DuplicateDiscarded {
        /// Sequence number of the duplicate.
        sequence: SequenceNumber,
        /// The address the duplicate came from.
        address: SockAddr,
        /// Number of payload bytes dropped.
        discarded: usize,
    },
    /// An unacknowledged packet was sent again after its timer expired.
    Retransmission {
        /// Sequence number of the packet.
        sequence: SequenceNumber,
        /// Destination of the packet.
        address: SockAddr,
        /// How often the packet has been put on the wire, counting this time.
        attempt: u32,
    },
}

/// Receives the events of a transport.
///
/// Called from the thread that caused the event, which may be the retransmission timer thread,
/// so implementations should return quickly.
pub trait TransportObserver: Debug + Send + Sync {
    /// Handles a single event.
    fn on_event(&self, event: TransportEvent);
}

/// Writes every event as a `key=value` line to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl TransportObserver for LogObserver {
    fn on_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::PacketSent {
                sequence,
                address,
                length,
            } => trace!(
                "event=packet_sent sequence={} address={} length={}",
                sequence,
                DisplayAddress(&address),
                length
            ),
            TransportEvent::AckReceived {
                sequence,
                send_base,
            } => trace!(
                "event=ack_received sequence={} send_base={}",
                sequence,
                send_base
            ),
            TransportEvent::AckSent { sequence, address } => trace!(
                "event=ack_sent sequence={} address={}",
                sequence,
                DisplayAddress(&address)
            ),
            TransportEvent::DuplicateDiscarded {
                sequence,
                address,
                discarded,
            } => debug!(
                "event=duplicate_discarded sequence={} address={} discarded={}",
                sequence,
                DisplayAddress(&address),
                discarded
            ),
            TransportEvent::Retransmission {
                sequence,
                address,
                attempt,
            } => info!(
                "event=retransmission sequence={} address={} attempt={}",
                sequence,
                DisplayAddress(&address),
                attempt
            ),
        }
    }
}

/// Forwards every event into a channel. A disconnected receiver is ignored.
impl TransportObserver for Sender<TransportEvent> {
    fn on_event(&self, event: TransportEvent) {
        let _ = self.send(event);
    }
}

/// Formats a `SockAddr` the way `SocketAddr` is formatted.
pub(crate) struct DisplayAddress<'a>(pub &'a SockAddr);

impl Display for DisplayAddress<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_socket() {
            Some(address) => write!(f, "{}", address),
            None => write!(f, "{:?}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use crossbeam_channel::unbounded;
    use socket2::SockAddr;

    use super::{DisplayAddress, TransportEvent, TransportObserver};

    #[test]
    fn channel_observer_forwards_events() {
        let (tx, rx) = unbounded();
        tx.on_event(TransportEvent::AckReceived {
            sequence: 3,
            send_base: 4,
        });

        assert_eq!(
            rx.try_recv(),
            Ok(TransportEvent::AckReceived {
                sequence: 3,
                send_base: 4
            })
        );
    }

    #[test]
    fn channel_observer_ignores_dropped_receiver() {
        let (tx, rx) = unbounded();
        drop(rx);
        tx.on_event(TransportEvent::AckReceived {
            sequence: 1,
            send_base: 2,
        });
    }

    #[test]
    fn address_is_displayed_like_socket_addr() {
        let address: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        let address = SockAddr::from(address);
        assert_eq!(DisplayAddress(&address).to_string(), "127.0.0.1:12345");
    }
}
