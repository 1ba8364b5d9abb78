use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{EncodingErrorKind, Result};
use crate::net::constants::HEADER_SIZE;
use crate::packet::{PayloadLength, SequenceNumber};

use super::{HeaderReader, HeaderWriter};

/// This header is written in front of every packet.
///
/// A data packet announces the length of the payload that follows it,
/// an acknowledgment packet only carries the acknowledged sequence number.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PacketHeader {
    is_ack: bool,
    sequence: SequenceNumber,
    data_length: PayloadLength,
}

impl PacketHeader {
    /// Creates the header of a data packet.
    pub fn data(sequence: SequenceNumber, data_length: PayloadLength) -> Self {
        PacketHeader {
            is_ack: false,
            sequence,
            data_length,
        }
    }

    /// Creates the header of an acknowledgment for `sequence`.
    pub fn acknowledgment(sequence: SequenceNumber) -> Self {
        PacketHeader {
            is_ack: true,
            sequence,
            data_length: 0,
        }
    }

    /// Returns true if this header belongs to an acknowledgment.
    pub fn is_ack(&self) -> bool {
        self.is_ack
    }

    /// Returns the sequence number.
    pub fn sequence(&self) -> SequenceNumber {
        self.sequence
    }

    /// Returns the announced payload length.
    pub fn data_length(&self) -> PayloadLength {
        self.data_length
    }
}

impl HeaderWriter for PacketHeader {
    type Output = Result<()>;

    fn write(&self, buffer: &mut Vec<u8>) -> Self::Output {
        buffer.write_u8(u8::from(self.is_ack))?;
        buffer.write_u32::<BigEndian>(self.sequence)?;
        buffer.write_u32::<BigEndian>(self.data_length)?;
        Ok(())
    }
}

impl HeaderReader for PacketHeader {
    type Header = Result<PacketHeader>;

    fn read(rdr: &mut Cursor<&[u8]>) -> Self::Header {
        let is_ack = match rdr.read_u8()? {
            0 => false,
            1 => true,
            flag => return Err(EncodingErrorKind::InvalidAckFlag(flag).into()),
        };
        let sequence = rdr.read_u32::<BigEndian>()?;
        let data_length = rdr.read_u32::<BigEndian>()?;

        Ok(PacketHeader {
            is_ack,
            sequence,
            data_length,
        })
    }

    /// Returns the size of this header.
    fn size() -> usize {
        HEADER_SIZE
    }
}
