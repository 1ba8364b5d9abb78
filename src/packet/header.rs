//! Header types that are written in front of every payload.

use std::io::Cursor;

pub use self::packet_header::PacketHeader;

mod packet_header;

/// Trait for parsing a header.
pub trait HeaderWriter {
    /// Associated type for the HeaderParser, since it parses it from a Header.
    type Output;

    /// Writes the header to the given buffer.
    fn write(&self, buffer: &mut Vec<u8>) -> Self::Output;
}

/// Trait that supports reading a Header from a packet.
pub trait HeaderReader {
    /// Associated type for the HeaderReader, since it reads it from a Header.
    type Header;

    /// Reads the specified header from the given Cursor.
    fn read(rdr: &mut Cursor<&[u8]>) -> Self::Header;

    /// Returns the size of the header.
    fn size() -> usize;
}
