//! The DNS packet header is a struct with an id a few flags and the number of questions, answers,
//! name servers in the authority section, and the number of additional records. The structure is
//! as the following, and multibyte items are in big endian order.
//! ```text
//!                                     1  1  1  1  1  1
//!       0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                      ID                       |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |QR|   Opcode  |AA|TC|RD|RA|   Z    |   RCODE   |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                    QDCOUNT                    |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                    ANCOUNT                    |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                    NSCOUNT                    |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                    ARCOUNT                    |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! ```
//!
//! - **ID**: Copied from the query into the response. The probe uses it to match a response to
//!   the query it sent.
//! - **QR**: Query (0) or response (1). Maps to the [PacketType] enum.
//! - **Opcode**: The kind of query, see [Opcode].
//! - **AA**: Set when the responding name server is an authority for the name in question.
//! - **TC**: Set when the message was truncated to fit the transport.
//! - **RD**: Asks the name server to pursue the query recursively.
//! - **RA**: Set in responses when the server supports recursive queries.
//! - **Z**: Reserved in RFC 1035. Later RFCs use two of the bits (AD and CD), so the value is kept
//!   as is rather than rejected.
//! - **RCODE**: The outcome of the query, see [ResponseCode].
//! - **QDCOUNT**, **ANCOUNT**, **NSCOUNT**, **ARCOUNT**: Entry counts of the four sections.

use std::fmt;

use bytes::BufMut;
use nom::{
    number::complete::{be_u16, be_u8},
    sequence::tuple,
    IResult,
};
use thiserror::Error;

use super::{FromPacketBytes, WriteToPacket};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    #[error("The size of the header buffer was {0} expected {}", Header::SIZE)]
    IncorrectHeaderSize(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Query,
    InverseQuery,
    Status,
    Notify,
    Update,
    Unknown(u8),
}

impl Opcode {
    pub const fn as_u8(&self) -> u8 {
        match self {
            Opcode::Query => 0,
            Opcode::InverseQuery => 1,
            Opcode::Status => 2,
            Opcode::Notify => 4,
            Opcode::Update => 5,
            Opcode::Unknown(code) => *code & 0xf,
        }
    }

    const fn from_u8(code: u8) -> Self {
        match code & 0xf {
            0 => Opcode::Query,
            1 => Opcode::InverseQuery,
            2 => Opcode::Status,
            4 => Opcode::Notify,
            5 => Opcode::Update,
            code => Opcode::Unknown(code),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Query => f.write_str("QUERY"),
            Opcode::InverseQuery => f.write_str("IQUERY"),
            Opcode::Status => f.write_str("STATUS"),
            Opcode::Notify => f.write_str("NOTIFY"),
            Opcode::Update => f.write_str("UPDATE"),
            Opcode::Unknown(code) => write!(f, "OPCODE{code}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Query,
    Response,
}

impl PacketType {
    pub const fn as_u8(&self) -> u8 {
        match self {
            Self::Query => 0,
            Self::Response => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    /// No error condition
    None,
    /// The name server was unable to interpret the query.
    FormatError,
    /// The name server was unable to process this query due to
    /// a problem with the name server.
    ServerFailure,
    /// Meaningful only for responses from an authoritative name
    /// server, this code signifies that the domain name referenced
    /// in the query does not exist.
    NameError,
    /// The name server does not support the requested kind of query.
    NotImplemented,
    /// The name server refuses to perform the specified operation
    /// for policy reasons.
    Refused,
    Unknown(u8),
}

impl ResponseCode {
    pub const fn as_u8(&self) -> u8 {
        match self {
            ResponseCode::None => 0,
            ResponseCode::FormatError => 1,
            ResponseCode::ServerFailure => 2,
            ResponseCode::NameError => 3,
            ResponseCode::NotImplemented => 4,
            ResponseCode::Refused => 5,
            ResponseCode::Unknown(code) => *code & 0xf,
        }
    }

    const fn from_u8(code: u8) -> Self {
        match code & 0xf {
            0 => ResponseCode::None,
            1 => ResponseCode::FormatError,
            2 => ResponseCode::ServerFailure,
            3 => ResponseCode::NameError,
            4 => ResponseCode::NotImplemented,
            5 => ResponseCode::Refused,
            code => ResponseCode::Unknown(code),
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseCode::None => f.write_str("NOERROR"),
            ResponseCode::FormatError => f.write_str("FORMERR"),
            ResponseCode::ServerFailure => f.write_str("SERVFAIL"),
            ResponseCode::NameError => f.write_str("NXDOMAIN"),
            ResponseCode::NotImplemented => f.write_str("NOTIMP"),
            ResponseCode::Refused => f.write_str("REFUSED"),
            ResponseCode::Unknown(code) => write!(f, "RCODE{code}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// A 16 bit identifier assigned by the program that
    /// generates any kind of query.  This identifier is copied
    /// the corresponding reply and can be used by the requester
    /// to match up replies to outstanding queries.
    ///
    /// Field: ID
    pub id: u16,

    /// Field: QR
    pub packet_type: PacketType,

    /// Field: Opcode
    pub opcode: Opcode,

    /// Authoritative Answer - this bit is valid in responses,
    /// and specifies that the responding name server is an
    /// authority for the domain name in question section.
    ///
    /// Field: AA
    pub authoritive_answer: bool,

    /// Field: TC
    pub truncated: bool,

    /// Recursion Desired - this bit may be set in a query and
    /// is copied into the response.  If RD is set, it directs
    /// the name server to pursue the query recursively.
    /// Recursive query support is optional.
    ///
    /// Field: RD
    pub recursion_desired: bool,

    /// Field: RA
    pub recursion_available: bool,

    /// The three reserved bits, right aligned.
    ///
    /// Field: Z
    pub reserved: u8,

    /// Field: RCODE
    pub response_code: ResponseCode,

    /// Field: QDCOUNT
    pub question_entries: u16,

    /// Field: ANCOUNT
    pub answer_entries: u16,

    /// Field: NSCOUNT
    pub authority_entries: u16,

    /// Field: ARCOUNT
    pub additional_entries: u16,
}

type RawHeader = (u16, u8, u8, u16, u16, u16, u16);

fn raw_header(input: &[u8]) -> IResult<&[u8], RawHeader> {
    tuple((be_u16, be_u8, be_u8, be_u16, be_u16, be_u16, be_u16))(input)
}

impl Header {
    pub const SIZE: usize = 12;

    pub fn new(id: u16) -> Self {
        Self {
            id,
            packet_type: PacketType::Query,
            opcode: Opcode::Query,
            authoritive_answer: false,
            truncated: false,
            recursion_desired: false,
            recursion_available: false,
            reserved: 0,
            response_code: ResponseCode::None,
            question_entries: 0,
            answer_entries: 0,
            authority_entries: 0,
            additional_entries: 0,
        }
    }

    /// The flags that are set, in dig's lower case notation.
    pub fn flags(&self) -> Vec<&'static str> {
        [
            (self.packet_type == PacketType::Response, "qr"),
            (self.authoritive_answer, "aa"),
            (self.truncated, "tc"),
            (self.recursion_desired, "rd"),
            (self.recursion_available, "ra"),
            (self.reserved & 0b010 != 0, "ad"),
            (self.reserved & 0b001 != 0, "cd"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect()
    }
}

impl FromPacketBytes for Header {
    type Error = HeaderError;

    fn parse(bytes: &[u8], offset: usize) -> Result<(Self, usize), Self::Error> {
        let input = bytes.get(offset..).unwrap_or_default();
        let (_, (id, flags_hi, flags_lo, qd, an, ns, ar)) =
            raw_header(input).map_err(|_| HeaderError::IncorrectHeaderSize(input.len()))?;
        Ok((
            Self {
                id,
                packet_type: if (flags_hi & 0x80) == 0x80 {
                    PacketType::Response
                } else {
                    PacketType::Query
                },
                opcode: Opcode::from_u8(flags_hi >> 3),
                authoritive_answer: (flags_hi & 4) == 4,
                truncated: (flags_hi & 2) == 2,
                recursion_desired: (flags_hi & 1) == 1,
                recursion_available: (flags_lo & 0x80) == 0x80,
                reserved: (flags_lo >> 4) & 0b111,
                response_code: ResponseCode::from_u8(flags_lo),
                question_entries: qd,
                answer_entries: an,
                authority_entries: ns,
                additional_entries: ar,
            },
            Self::SIZE,
        ))
    }
}

impl WriteToPacket for Header {
    fn len_in_packet(&self) -> usize {
        Self::SIZE
    }

    fn write_into<B: BufMut>(&self, buffer: &mut B) {
        buffer.put_u16(self.id);
        buffer.put_u8(
            (self.recursion_desired as u8)
                | ((self.truncated as u8) << 1)
                | ((self.authoritive_answer as u8) << 2)
                | (self.opcode.as_u8() << 3)
                | (self.packet_type.as_u8() << 7),
        );
        buffer.put_u8(
            self.response_code.as_u8()
                | ((self.reserved & 0b111) << 4)
                | ((self.recursion_available as u8) << 7),
        );
        buffer.put_u16(self.question_entries);
        buffer.put_u16(self.answer_entries);
        buffer.put_u16(self.authority_entries);
        buffer.put_u16(self.additional_entries);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_serde() {
        let input_bytes = [4u8, 210, 1, 0, 0, 1, 0, 0, 0, 0, 0, 0];
        let (input_header, size) = Header::parse(&input_bytes, 0).unwrap();
        assert_eq!(size, Header::SIZE);
        assert_eq!(input_header.id, 1234);
        assert_eq!(input_header.packet_type, PacketType::Query);
        assert!(input_header.recursion_desired);
        assert_eq!(input_header.question_entries, 1);
        let mut output_bytes = Vec::with_capacity(Header::SIZE);
        input_header.write_into(&mut output_bytes);
        assert_eq!(&input_bytes[..], &output_bytes[..]);
    }

    #[test]
    fn response_flags() {
        // QR, opcode QUERY, AA, RD / RA, AD, NXDOMAIN
        let bytes = [0, 7, 0x85, 0xa3, 0, 1, 0, 0, 0, 1, 0, 0];
        let (header, _) = Header::parse(&bytes, 0).unwrap();
        assert_eq!(header.packet_type, PacketType::Response);
        assert_eq!(header.opcode, Opcode::Query);
        assert!(header.authoritive_answer);
        assert!(!header.truncated);
        assert!(header.recursion_desired);
        assert!(header.recursion_available);
        assert_eq!(header.response_code, ResponseCode::NameError);
        assert_eq!(header.authority_entries, 1);
        assert_eq!(header.flags(), vec!["qr", "aa", "rd", "ra", "ad"]);

        let mut output = Vec::new();
        header.write_into(&mut output);
        assert_eq!(&output[..], &bytes[..]);
    }

    #[test]
    fn opcode_bits() {
        let mut header = Header::new(1);
        header.opcode = Opcode::Status;
        let mut output = Vec::new();
        header.write_into(&mut output);
        assert_eq!(output[2], 2 << 3);
        assert_eq!(Header::parse(&output, 0).unwrap().0.opcode, Opcode::Status);
    }

    #[test]
    fn unknown_codes_survive() {
        let bytes = [0, 0, 0x80 | (9 << 3), 0x0b, 0, 0, 0, 0, 0, 0, 0, 0];
        let (header, _) = Header::parse(&bytes, 0).unwrap();
        assert_eq!(header.opcode, Opcode::Unknown(9));
        assert_eq!(header.response_code, ResponseCode::Unknown(11));
        assert_eq!(header.response_code.to_string(), "RCODE11");
    }

    #[test]
    fn too_short() {
        assert_eq!(
            Header::parse(&[0, 1, 2], 0),
            Err(HeaderError::IncorrectHeaderSize(3))
        );
        assert_eq!(
            Header::parse(&[0; 12], 4),
            Err(HeaderError::IncorrectHeaderSize(8))
        );
    }
}
