//! DNS wire format (RFC 1035 section 4) as far as a one-shot query probe needs it: encoding
//! queries and decoding whatever comes back.

mod class;
mod domain_name;
mod header;
mod label;
mod macros;
mod packet;
mod question;
mod resource;
mod types;

pub use self::class::{Class, QClass};
pub use self::domain_name::{DomainName, DomainNameError};
pub use self::header::{Header, HeaderError, Opcode, PacketType, ResponseCode};
pub use self::label::{Label, LabelError};
pub use self::packet::{Packet, PacketBuilder, PacketError, Section, MAX_UDP_MESSAGE_SIZE};
pub use self::question::{Question, QuestionError};
pub use self::resource::{RData, Resource, ResourceError};
pub use self::types::{QType, Type};

use bytes::BufMut;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown {kind} mnemonic '{value}'")]
pub struct UnknownMnemonic {
    pub kind: &'static str,
    pub value: String,
}

pub trait FromPacketBytes: Sized {
    type Error;

    /// Parses an item starting at `offset` in the full message `bytes`. The whole message is
    /// needed to follow name compression pointers. Returns the item and the amount of bytes it
    /// occupies at `offset`.
    fn parse(bytes: &[u8], offset: usize) -> Result<(Self, usize), Self::Error>;
}

pub trait WriteToPacket {
    fn len_in_packet(&self) -> usize;

    fn write_into<B: BufMut>(&self, buffer: &mut B);
}
