use std::mem::size_of;
use std::time::Duration;

use crate::packet::{PayloadLength, SequenceNumber};

/// The size of the packet header: ack flag, sequence number and payload length.
pub const HEADER_SIZE: usize =
    size_of::<u8>() + size_of::<SequenceNumber>() + size_of::<PayloadLength>();
/// The first sequence number handed out by a fresh send window.
pub const INITIAL_SEQUENCE: SequenceNumber = 1;
/// Default maximum number of unacknowledged packets.
pub const DEFAULT_WINDOW_SIZE: u32 = 16;
/// Default number of slots in both the send and the receive buffer.
pub const DEFAULT_BUFFER_CAPACITY: u32 = 32;
/// Default amount of time to resend a packet if no acknowledgment has been received.
pub const DEFAULT_RETRANSMIT_TIMEOUT: Duration = Duration::from_millis(200);
/// Maximum transmission unit of a datagram.
///
/// Derived from ethernet_mtu - ipv6_header_size - udp_header_size
///       1452 = 1500         - 40               - 8
///
/// This is not strictly guaranteed -- there may be less room in an ethernet frame than this due to
/// variability in ipv6 header size.
pub const DEFAULT_MTU: u16 = 1452;
