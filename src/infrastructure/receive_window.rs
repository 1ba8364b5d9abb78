use socket2::SockAddr;

use crate::config::Config;
use crate::net::constants::INITIAL_SEQUENCE;
use crate::packet::header::PacketHeader;
use crate::packet::{Packet, SequenceNumber};
use crate::sequence_buffer::{sequence_less_than, PacketSlot, SequenceBuffer};

/// How an inbound data packet relates to what was received before.
#[derive(Debug, Clone, PartialEq)]
pub enum Arrival {
    /// First time this sequence number is seen, the payload should be delivered.
    New,
    /// The packet is still recorded in the receive buffer, its acknowledgment got lost.
    Duplicate {
        /// The address the original packet came from.
        reply_to: SockAddr,
    },
}

/// Receive side of the selective-repeat state machine.
///
/// Only used for duplicate suppression, payloads are handed up in arrival order. A packet counts as
/// a duplicate only while its slot still holds the same sequence number, anything else is new.
#[derive(Debug)]
pub struct ReceiveWindow {
    receive_base: SequenceNumber,
    slots: SequenceBuffer<PacketSlot>,
}

impl ReceiveWindow {
    /// Creates an empty window from the given configuration.
    pub fn new(config: &Config) -> Self {
        ReceiveWindow {
            receive_base: INITIAL_SEQUENCE,
            slots: SequenceBuffer::with_capacity(config.receive_buffer_capacity),
        }
    }

    /// Returns the lowest sequence number the receive buffer can still hold after the newest
    /// recorded packet.
    pub fn receive_base(&self) -> SequenceNumber {
        self.receive_base
    }

    #[cfg(test)]
    pub fn contains(&self, sequence: SequenceNumber) -> bool {
        self.slots.exists(sequence)
    }

    /// Decides whether a data packet with `sequence` is new.
    pub fn classify(&self, sequence: SequenceNumber) -> Arrival {
        match self.slots.get(sequence) {
            Some(slot) => Arrival::Duplicate {
                reply_to: slot.address().clone(),
            },
            None => Arrival::New,
        }
    }

    /// Records a newly delivered packet and moves the receive base along if the buffer wrapped.
    ///
    /// A late packet below the base takes over its slot but never moves the base back.
    pub fn record(&mut self, header: PacketHeader, address: SockAddr) {
        let sequence = header.sequence();
        let capacity = self.slots.capacity() as SequenceNumber;

        let _ = self
            .slots
            .insert(sequence, PacketSlot::new(Packet::header_only(header), address));

        if !sequence_less_than(sequence, self.receive_base.wrapping_add(capacity)) {
            self.receive_base = sequence.wrapping_sub(capacity).wrapping_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::packet::header::PacketHeader;
    use crate::test_utils::address;

    use super::{Arrival, ReceiveWindow};

    fn window() -> ReceiveWindow {
        ReceiveWindow::new(&Config {
            send_buffer_capacity: 8,
            receive_buffer_capacity: 8,
            window_size: 4,
            ..Default::default()
        })
    }

    #[test]
    fn unseen_packet_is_new() {
        let window = window();
        assert_eq!(window.classify(5), Arrival::New);
        assert_eq!(window.receive_base(), 1);
    }

    #[test]
    fn recorded_packet_is_duplicate_of_original_sender() {
        let mut window = window();
        window.record(PacketHeader::data(5, 1), address(4000));

        assert!(window.contains(5));
        assert_eq!(
            window.classify(5),
            Arrival::Duplicate {
                reply_to: address(4000)
            }
        );
    }

    #[test]
    fn base_moves_once_buffer_wraps() {
        let mut window = window();
        for sequence in 1..=8 {
            window.record(PacketHeader::data(sequence, 1), address(4000));
        }
        assert_eq!(window.receive_base(), 1);

        window.record(PacketHeader::data(10, 1), address(4000));
        assert_eq!(window.receive_base(), 3);

        // 2 shared its slot with 10 and was evicted, 9 never arrived
        assert_eq!(window.classify(2), Arrival::New);
        assert_eq!(window.classify(9), Arrival::New);
        assert!(matches!(window.classify(3), Arrival::Duplicate { .. }));
    }

    #[test]
    fn late_packet_below_base_is_new() {
        let mut window = window();
        for sequence in 2..=9 {
            window.record(PacketHeader::data(sequence, 1), address(4000));
        }
        assert_eq!(window.receive_base(), 2);

        assert_eq!(window.classify(1), Arrival::New);
        window.record(PacketHeader::data(1, 1), address(4001));
        assert_eq!(window.receive_base(), 2);
        assert_eq!(
            window.classify(1),
            Arrival::Duplicate {
                reply_to: address(4001)
            }
        );
    }

    #[test]
    fn sequence_wrap_keeps_duplicates_apart() {
        let mut window = window();
        for sequence in [u32::MAX - 1, u32::MAX, 0, 1] {
            window.record(PacketHeader::data(sequence, 1), address(4000));
        }

        for sequence in [u32::MAX - 1, u32::MAX, 0, 1] {
            assert!(window.contains(sequence));
        }
        assert_eq!(window.classify(2), Arrival::New);
    }

    #[test]
    fn aliased_sequence_is_not_a_duplicate() {
        let mut window = window();
        window.record(PacketHeader::data(1, 1), address(4000));

        assert_eq!(window.classify(9), Arrival::New);
    }
}
