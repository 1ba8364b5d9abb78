//! This module provides all the logic around the packet, such as reading, parsing, and constructing headers.

pub use self::packet_reader::PacketReader;
pub use self::packet_structure::Packet;

pub mod header;

mod packet_reader;
mod packet_structure;

/// Sequence number carried by every packet.
pub type SequenceNumber = u32;
/// Length of a data payload as written in the header.
pub type PayloadLength = u32;

/// Half of the sequence space, used to compare sequence numbers across wrap-around.
pub const SEQUENCE_MID: SequenceNumber = ((SequenceNumber::MAX - 1) / 2) + 1;
