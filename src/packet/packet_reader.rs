use std::io::Cursor;

use crate::error::{EncodingErrorKind, Result};
use crate::packet::header::{HeaderReader, PacketHeader};

/// Can be used to walk over the contents of a single datagram.
///
/// # Remarks
/// - `PacketReader` is using an underlying `Cursor` to manage the reading of the bytes.
/// - The header is read first, after which the payload is either read or discarded. This is the
///   two-phase receive over a datagram that has already been received as a whole.
pub struct PacketReader<'s> {
    buffer: &'s [u8],
    cursor: Cursor<&'s [u8]>,
}

impl<'s> PacketReader<'s> {
    /// Construct a new instance of `PacketReader`, the given `buffer` will be used to read information from.
    pub fn new(buffer: &'s [u8]) -> PacketReader<'s> {
        PacketReader {
            buffer,
            cursor: Cursor::new(buffer),
        }
    }

    /// Reads the `PacketHeader` from the start of the underlying buffer.
    ///
    /// # Remark
    /// - Will change the position to the end of the header.
    pub fn read_header(&mut self) -> Result<PacketHeader> {
        self.cursor.set_position(0);

        if self.can_read(PacketHeader::size()) {
            PacketHeader::read(&mut self.cursor)
        } else {
            Err(EncodingErrorKind::TruncatedHeader {
                available: self.buffer.len(),
            }
            .into())
        }
    }

    /// Reads `length` payload bytes from the current position.
    ///
    /// Fails without moving the position when fewer bytes are left.
    pub fn read_payload(&mut self, length: usize) -> Result<Box<[u8]>> {
        if !self.can_read(length) {
            return Err(EncodingErrorKind::TruncatedPayload {
                expected: length,
                available: self.remaining(),
            }
            .into());
        }

        let start = self.cursor.position() as usize;
        self.cursor.set_position((start + length) as u64);
        Ok(self.buffer[start..start + length].to_vec().into_boxed_slice())
    }

    /// Skips up to `length` bytes without reading them and returns how many were skipped.
    pub fn discard(&mut self, length: usize) -> usize {
        let discarded = length.min(self.remaining());
        self.cursor
            .set_position(self.cursor.position() + discarded as u64);
        discarded
    }

    /// Returns the number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor.position() as usize
    }

    // Checks if a given length of bytes could be read with the buffer.
    fn can_read(&self, length: usize) -> bool {
        self.remaining() >= length
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{EncodingErrorKind, ErrorKind};
    use crate::packet::header::{HeaderWriter, PacketHeader};
    use crate::packet::{PacketReader, SequenceNumber};

    fn data_frame(sequence: SequenceNumber, payload: &[u8]) -> Vec<u8> {
        let mut buffer = Vec::new();
        PacketHeader::data(sequence, payload.len() as u32)
            .write(&mut buffer)
            .unwrap();
        buffer.extend_from_slice(payload);
        buffer
    }

    #[test]
    fn can_read_bytes() {
        let buffer = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10];

        let reader = PacketReader::new(buffer.as_slice());
        assert!(reader.can_read(buffer.len()));
        assert!(!reader.can_read(buffer.len() + 1));
    }

    #[test]
    fn assure_read_header_then_payload() {
        let buffer = data_frame(7, b"abc");
        let mut reader = PacketReader::new(buffer.as_slice());

        let header = reader.read_header().unwrap();
        assert!(!header.is_ack());
        assert_eq!(header.sequence(), 7);
        assert_eq!(header.data_length(), 3);

        let payload = reader.read_payload(header.data_length() as usize).unwrap();
        assert_eq!(&payload[..], b"abc");
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn discard_skips_payload() {
        let buffer = data_frame(7, b"abcdef");
        let mut reader = PacketReader::new(buffer.as_slice());

        reader.read_header().unwrap();
        assert_eq!(reader.discard(4), 4);
        assert_eq!(reader.remaining(), 2);
        // never skips past the end of the datagram
        assert_eq!(reader.discard(10), 2);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let mut buffer = data_frame(1, b"abc");
        buffer.truncate(buffer.len() - 1);
        let mut reader = PacketReader::new(buffer.as_slice());

        reader.read_header().unwrap();
        assert!(matches!(
            reader.read_payload(3),
            Err(ErrorKind::EncodingError(EncodingErrorKind::TruncatedPayload {
                expected: 3,
                available: 2
            }))
        ));
        assert_eq!(reader.remaining(), 2);
    }

    #[test]
    fn expect_read_error() {
        // header with one byte missing
        let buffer: Vec<u8> = vec![0, 0, 0, 0, 1, 0, 0, 0];

        let mut reader = PacketReader::new(buffer.as_slice());

        assert!(matches!(
            reader.read_header(),
            Err(ErrorKind::EncodingError(EncodingErrorKind::TruncatedHeader { available: 8 }))
        ));
    }
}
