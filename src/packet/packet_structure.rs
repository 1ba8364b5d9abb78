use std::convert::TryFrom;

use crate::error::{EncodingErrorKind, Result};
use crate::net::constants::HEADER_SIZE;
use crate::packet::header::{HeaderWriter, PacketHeader};
use crate::packet::{PacketReader, PayloadLength, SequenceNumber};

/// A packet as it travels over the wire: a header followed by the payload.
///
/// | Kind             | `is_ack` | `data_length`     | Payload        |
/// | :-------------:  | :------: | :---------------: | :------------: |
/// | **Data**         | false    | length of payload | payload bytes  |
/// | **Acknowledgment** | true   | 0                 | none           |
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Packet {
    header: PacketHeader,
    payload: Box<[u8]>,
}

impl Packet {
    /// Creates a data packet carrying `payload` under `sequence`.
    pub fn data(sequence: SequenceNumber, payload: &[u8]) -> Result<Packet> {
        let data_length = PayloadLength::try_from(payload.len())
            .map_err(|_| EncodingErrorKind::PayloadLengthOverflow(payload.len()))?;

        Ok(Packet {
            header: PacketHeader::data(sequence, data_length),
            payload: Box::from(payload),
        })
    }

    /// Creates an acknowledgment for `sequence`.
    pub fn acknowledgment(sequence: SequenceNumber) -> Packet {
        Packet {
            header: PacketHeader::acknowledgment(sequence),
            payload: Box::default(),
        }
    }

    /// Creates a packet that only remembers its header, used for bookkeeping of received packets.
    pub(crate) fn header_only(header: PacketHeader) -> Packet {
        Packet {
            header,
            payload: Box::default(),
        }
    }

    /// Returns the header.
    pub fn header(&self) -> &PacketHeader {
        &self.header
    }

    /// Returns the sequence number.
    pub fn sequence(&self) -> SequenceNumber {
        self.header.sequence()
    }

    /// Returns true if this packet is an acknowledgment.
    pub fn is_ack(&self) -> bool {
        self.header.is_ack()
    }

    /// Returns the payload of this packet.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Encodes the header followed by the payload.
    pub fn marshal(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        self.header.write(&mut buffer)?;
        if !self.header.is_ack() {
            buffer.extend_from_slice(&self.payload);
        }
        Ok(buffer)
    }

    /// Decodes a complete datagram into a packet.
    ///
    /// Bytes after the announced payload are ignored.
    pub fn unmarshal(datagram: &[u8]) -> Result<Packet> {
        let mut reader = PacketReader::new(datagram);
        let header = reader.read_header()?;
        if header.is_ack() {
            return Ok(Packet::acknowledgment(header.sequence()));
        }

        let payload = reader.read_payload(header.data_length() as usize)?;
        Ok(Packet { header, payload })
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{EncodingErrorKind, ErrorKind};
    use crate::packet::Packet;

    #[test]
    fn data_packet_layout() {
        let packet = Packet::data(2, b"hi").unwrap();
        assert_eq!(
            packet.marshal().unwrap(),
            vec![0, 0, 0, 0, 2, 0, 0, 0, 2, b'h', b'i']
        );
    }

    #[test]
    fn acknowledgment_has_no_payload() {
        let bytes = Packet::acknowledgment(9).marshal().unwrap();
        assert_eq!(bytes.len(), 9);

        let packet = Packet::unmarshal(&bytes).unwrap();
        assert!(packet.is_ack());
        assert_eq!(packet.sequence(), 9);
        assert!(packet.payload().is_empty());
    }

    #[test]
    fn unmarshal_ignores_trailing_bytes() {
        let mut bytes = Packet::data(3, b"abc").unwrap().marshal().unwrap();
        bytes.extend_from_slice(b"garbage");

        let packet = Packet::unmarshal(&bytes).unwrap();
        assert_eq!(packet, Packet::data(3, b"abc").unwrap());
    }

    #[test]
    fn unmarshal_rejects_short_payload() {
        let mut bytes = Packet::data(3, b"abc").unwrap().marshal().unwrap();
        bytes.pop();

        assert!(matches!(
            Packet::unmarshal(&bytes),
            Err(ErrorKind::EncodingError(EncodingErrorKind::TruncatedPayload { .. }))
        ));
    }

    #[quickcheck_macros::quickcheck]
    fn unmarshal_never_panics(bytes: Vec<u8>) -> bool {
        match Packet::unmarshal(&bytes) {
            Ok(packet) => packet.is_ack() || packet.payload().len() <= bytes.len(),
            Err(_) => true,
        }
    }
}
