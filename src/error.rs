use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    io, result,
};

/// Wrapped result type for selective-repeat errors.
pub type Result<T> = result::Result<T, ErrorKind>;

/// Enum with all possible errors that could occur while using the transport.
#[derive(Debug)]
pub enum ErrorKind {
    /// The send window already holds `window_size` unacknowledged packets.
    /// The caller should retry once an acknowledgment has advanced the window.
    WindowFull,
    /// The underlying datagram socket failed to send or receive.
    TransportError(io::Error),
    /// A packet could not be encoded to or decoded from its wire format.
    EncodingError(EncodingErrorKind),
    /// The payload handed to `send` can not be turned into a data packet.
    PacketError(PacketErrorKind),
    /// The configuration violates one of the transport preconditions.
    InvalidConfig(ConfigErrorKind),
}

impl Display for ErrorKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::WindowFull => write!(
                fmt,
                "The send window is full. Retry once outstanding packets are acknowledged."
            ),
            ErrorKind::TransportError(e) => {
                write!(fmt, "An IO error occurred on the datagram socket. Reason: {:?}.", e)
            }
            ErrorKind::EncodingError(e) => write!(
                fmt,
                "Something went wrong with encoding or decoding a packet. Reason: {:?}.",
                e
            ),
            ErrorKind::PacketError(e) => {
                write!(fmt, "The payload could not be packed. Reason: {:?}.", e)
            }
            ErrorKind::InvalidConfig(e) => {
                write!(fmt, "The configuration is invalid. Reason: {:?}.", e)
            }
        }
    }
}

impl Error for ErrorKind {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ErrorKind::TransportError(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors that could occur while encoding or decoding the packet header.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum EncodingErrorKind {
    /// The acknowledgment flag byte was neither `0` nor `1`.
    InvalidAckFlag(u8),
    /// The datagram is shorter than the fixed header.
    TruncatedHeader {
        /// Number of bytes that were available.
        available: usize,
    },
    /// The datagram holds fewer payload bytes than its header announces.
    TruncatedPayload {
        /// Payload length announced by the header.
        expected: usize,
        /// Payload bytes actually present.
        available: usize,
    },
    /// The payload length does not fit the 32-bit length field.
    PayloadLengthOverflow(usize),
}

impl Display for EncodingErrorKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EncodingErrorKind::InvalidAckFlag(flag) => {
                write!(fmt, "The acknowledgment flag {} is not a valid boolean.", flag)
            }
            EncodingErrorKind::TruncatedHeader { available } => write!(
                fmt,
                "The header could not be read, only {} bytes available.",
                available
            ),
            EncodingErrorKind::TruncatedPayload {
                expected,
                available,
            } => write!(
                fmt,
                "Expected a payload of {} bytes but only {} are available.",
                expected, available
            ),
            EncodingErrorKind::PayloadLengthOverflow(len) => {
                write!(fmt, "A payload of {} bytes does not fit the length field.", len)
            }
        }
    }
}

/// Errors that could occur while turning a payload into a data packet.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum PacketErrorKind {
    /// Data packets must carry at least one byte.
    EmptyPayload,
    /// The encoded packet would not fit in a single datagram.
    ExceededMaxPacketSize {
        /// Size of the payload that was handed in.
        size: usize,
        /// Largest payload a datagram can carry with the current config.
        max: usize,
    },
}

impl Display for PacketErrorKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PacketErrorKind::EmptyPayload => write!(fmt, "The payload is empty."),
            PacketErrorKind::ExceededMaxPacketSize { size, max } => write!(
                fmt,
                "The payload of {} bytes exceeds the maximum of {} bytes.",
                size, max
            ),
        }
    }
}

/// Configuration preconditions that were not met.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ConfigErrorKind {
    /// The window must allow at least one outstanding packet.
    ZeroWindow,
    /// Two in-flight sequence numbers could alias the same send slot.
    SendCapacityBelowWindow {
        /// Configured send buffer capacity.
        capacity: u32,
        /// Configured window size.
        window: u32,
    },
    /// Two tracked sequence numbers could alias the same receive slot.
    ReceiveCapacityBelowWindow {
        /// Configured receive buffer capacity.
        capacity: u32,
        /// Configured window size.
        window: u32,
    },
    /// A buffer capacity that does not divide the sequence space aliases slots at the wrap.
    CapacityNotPowerOfTwo(u32),
    /// A zero retransmission interval would retransmit in a busy loop.
    ZeroRetransmitTimeout,
    /// The receive buffer can not hold a header plus a single payload byte.
    ReceiveBufferTooSmall(usize),
}

impl Display for ConfigErrorKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigErrorKind::ZeroWindow => write!(fmt, "The window size must be at least 1."),
            ConfigErrorKind::SendCapacityBelowWindow { capacity, window } => write!(
                fmt,
                "The send buffer capacity {} is smaller than the window size {}.",
                capacity, window
            ),
            ConfigErrorKind::ReceiveCapacityBelowWindow { capacity, window } => write!(
                fmt,
                "The receive buffer capacity {} is smaller than the window size {}.",
                capacity, window
            ),
            ConfigErrorKind::CapacityNotPowerOfTwo(capacity) => write!(
                fmt,
                "The buffer capacity {} is not a power of two.",
                capacity
            ),
            ConfigErrorKind::ZeroRetransmitTimeout => {
                write!(fmt, "The retransmission timeout must be non-zero.")
            }
            ConfigErrorKind::ReceiveBufferTooSmall(size) => write!(
                fmt,
                "A receive buffer of {} bytes can not hold a single data packet.",
                size
            ),
        }
    }
}

impl From<io::Error> for ErrorKind {
    fn from(inner: io::Error) -> ErrorKind {
        ErrorKind::TransportError(inner)
    }
}

impl From<EncodingErrorKind> for ErrorKind {
    fn from(inner: EncodingErrorKind) -> Self {
        ErrorKind::EncodingError(inner)
    }
}

impl From<PacketErrorKind> for ErrorKind {
    fn from(inner: PacketErrorKind) -> Self {
        ErrorKind::PacketError(inner)
    }
}

impl From<ConfigErrorKind> for ErrorKind {
    fn from(inner: ConfigErrorKind) -> Self {
        ErrorKind::InvalidConfig(inner)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use std::io;

    use super::*;

    #[test]
    fn able_to_box_errors() {
        let _: Box<dyn Error> = Box::new(ErrorKind::WindowFull);
    }

    #[test]
    fn io_errors_become_transport_errors() {
        let error: ErrorKind = io::Error::from(io::ErrorKind::WouldBlock).into();
        assert!(matches!(error, ErrorKind::TransportError(ref e) if e.kind() == io::ErrorKind::WouldBlock));
        assert!(error.source().is_some());
    }

    #[test]
    fn nested_kinds_convert() {
        let error: ErrorKind = EncodingErrorKind::InvalidAckFlag(7).into();
        assert!(matches!(
            error,
            ErrorKind::EncodingError(EncodingErrorKind::InvalidAckFlag(7))
        ));
        assert!(error.source().is_none());
    }
}
