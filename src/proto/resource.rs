use std::{
    fmt,
    net::{Ipv4Addr, Ipv6Addr},
};

use bytes::{BufMut, Bytes};
use nom::{
    number::complete::{be_u16, be_u32},
    sequence::tuple,
    IResult,
};
use thiserror::Error;

use super::{
    class::Class,
    domain_name::{DomainName, DomainNameError},
    types::Type,
    FromPacketBytes, WriteToPacket,
};

/// A resource record from one of the answer, authority or additional sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    name: DomainName,
    typ: Type,
    class: Class,
    ttl: u32,
    data: RData,
}

/// Record data decoded for the types a probe usually gets back. Everything else is kept raw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Ns(DomainName),
    Cname(DomainName),
    Ptr(DomainName),
    Mx {
        preference: u16,
        exchange: DomainName,
    },
    Soa {
        mname: DomainName,
        rname: DomainName,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
    Txt(Vec<Bytes>),
    /// Data of any other record type, as received.
    Other(Type, Bytes),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error(transparent)]
    DomainName(#[from] DomainNameError),
    #[error("The resource record was cut off by the end of the message")]
    EOF,
    #[error("The data of the {typ} record is {found} bytes long, expected {expected}")]
    DataLength {
        typ: Type,
        expected: usize,
        found: usize,
    },
    #[error("A name inside the {0} record data runs past the data length")]
    NameOverrun(Type),
    #[error("A character string is {0} bytes long but at most 255 bytes fit behind its length byte")]
    CharacterStringTooLong(usize),
    #[error("The data of the {typ} record is {len} bytes long which does not fit the 16 bit length field")]
    DataTooLong { typ: Type, len: usize },
}

fn record_fields(input: &[u8]) -> IResult<&[u8], (u16, u16, u32, u16)> {
    tuple((be_u16, be_u16, be_u32, be_u16))(input)
}

fn soa_counters(input: &[u8]) -> IResult<&[u8], (u32, u32, u32, u32, u32)> {
    tuple((be_u32, be_u32, be_u32, be_u32, be_u32))(input)
}

impl Resource {
    pub fn new(name: DomainName, class: Class, ttl: u32, data: RData) -> Self {
        Self {
            name,
            typ: data.typ(),
            class,
            ttl,
            data,
        }
    }

    pub fn name(&self) -> &DomainName {
        &self.name
    }

    pub fn typ(&self) -> Type {
        self.typ
    }

    pub fn class(&self) -> Class {
        self.class
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn data(&self) -> &RData {
        &self.data
    }

    /// Checks that every length field of the record can hold the length it has to describe.
    pub fn validate(&self) -> Result<(), ResourceError> {
        if let RData::Txt(strings) = &self.data {
            if let Some(string) = strings.iter().find(|s| s.len() > u8::MAX as usize) {
                return Err(ResourceError::CharacterStringTooLong(string.len()));
            }
        }
        let len = self.data.len_in_packet();
        if len > u16::MAX as usize {
            return Err(ResourceError::DataTooLong { typ: self.typ, len });
        }
        Ok(())
    }
}

impl FromPacketBytes for Resource {
    type Error = ResourceError;

    fn parse(bytes: &[u8], offset: usize) -> Result<(Self, usize), Self::Error> {
        let (name, name_size) = DomainName::parse(bytes, offset)?;
        let fields_start = offset + name_size;
        let (_, (typ, class, ttl, data_len)) =
            record_fields(&bytes[fields_start..]).map_err(|_| ResourceError::EOF)?;
        let typ = Type::from(typ);
        let data_start = fields_start + 10;
        let data_len = data_len as usize;
        if data_start + data_len > bytes.len() {
            return Err(ResourceError::EOF);
        }
        let data = RData::parse(typ, bytes, data_start, data_len)?;
        Ok((
            Self {
                name,
                typ,
                class: Class::from(class),
                ttl,
                data,
            },
            name_size + 10 + data_len,
        ))
    }
}

impl WriteToPacket for Resource {
    fn len_in_packet(&self) -> usize {
        self.name.len_in_packet() + 10 + self.data.len_in_packet()
    }

    fn write_into<B: BufMut>(&self, buffer: &mut B) {
        self.name.write_into(buffer);
        buffer.put_u16(self.typ.as_u16());
        buffer.put_u16(self.class.as_u16());
        buffer.put_u32(self.ttl);
        buffer.put_u16(self.data.len_in_packet() as u16);
        self.data.write_into(buffer);
    }
}

impl RData {
    pub fn typ(&self) -> Type {
        match self {
            Self::A(_) => Type::A,
            Self::Aaaa(_) => Type::AAAA,
            Self::Ns(_) => Type::NS,
            Self::Cname(_) => Type::CNAME,
            Self::Ptr(_) => Type::PTR,
            Self::Mx { .. } => Type::MX,
            Self::Soa { .. } => Type::SOA,
            Self::Txt(_) => Type::TXT,
            Self::Other(typ, _) => *typ,
        }
    }

    /// Decodes `len` bytes of record data at `offset`. Names inside the data may point anywhere in
    /// `message` but must not run past the data.
    fn parse(typ: Type, message: &[u8], offset: usize, len: usize) -> Result<Self, ResourceError> {
        let data = &message[offset..offset + len];
        let exact = |expected: usize| {
            if len == expected {
                Ok(())
            } else {
                Err(ResourceError::DataLength {
                    typ,
                    expected,
                    found: len,
                })
            }
        };
        let name_at = |at: usize| -> Result<(DomainName, usize), ResourceError> {
            let (name, size) = DomainName::parse(message, offset + at)?;
            if at + size > len {
                return Err(ResourceError::NameOverrun(typ));
            }
            Ok((name, size))
        };

        Ok(match typ {
            Type::A => {
                exact(4)?;
                Self::A(Ipv4Addr::new(data[0], data[1], data[2], data[3]))
            }
            Type::AAAA => {
                exact(16)?;
                let mut octets = [0u8; 16];
                octets.copy_from_slice(data);
                Self::Aaaa(Ipv6Addr::from(octets))
            }
            Type::NS | Type::CNAME | Type::PTR => {
                let (name, size) = name_at(0)?;
                exact(size)?;
                match typ {
                    Type::NS => Self::Ns(name),
                    Type::CNAME => Self::Cname(name),
                    _ => Self::Ptr(name),
                }
            }
            Type::MX => {
                if len < 2 {
                    return Err(ResourceError::DataLength {
                        typ,
                        expected: 3,
                        found: len,
                    });
                }
                let (exchange, size) = name_at(2)?;
                exact(2 + size)?;
                Self::Mx {
                    preference: u16::from_be_bytes([data[0], data[1]]),
                    exchange,
                }
            }
            Type::SOA => {
                let (mname, mname_size) = name_at(0)?;
                let (rname, rname_size) = name_at(mname_size)?;
                let counters_start = mname_size + rname_size;
                exact(counters_start + 20)?;
                let (_, (serial, refresh, retry, expire, minimum)) =
                    soa_counters(&data[counters_start..]).map_err(|_| ResourceError::EOF)?;
                Self::Soa {
                    mname,
                    rname,
                    serial,
                    refresh,
                    retry,
                    expire,
                    minimum,
                }
            }
            Type::TXT => {
                let mut strings = Vec::new();
                let mut cursor = 0;
                while cursor < len {
                    let string_len = data[cursor] as usize;
                    if cursor + 1 + string_len > len {
                        return Err(ResourceError::EOF);
                    }
                    strings.push(Bytes::copy_from_slice(
                        &data[cursor + 1..cursor + 1 + string_len],
                    ));
                    cursor += 1 + string_len;
                }
                Self::Txt(strings)
            }
            _ => Self::Other(typ, Bytes::copy_from_slice(data)),
        })
    }

    fn len_in_packet(&self) -> usize {
        match self {
            Self::A(_) => 4,
            Self::Aaaa(_) => 16,
            Self::Ns(name) | Self::Cname(name) | Self::Ptr(name) => name.len_in_packet(),
            Self::Mx { exchange, .. } => 2 + exchange.len_in_packet(),
            Self::Soa { mname, rname, .. } => mname.len_in_packet() + rname.len_in_packet() + 20,
            Self::Txt(strings) => strings.iter().map(|s| 1 + s.len()).sum(),
            Self::Other(_, data) => data.len(),
        }
    }

    fn write_into<B: BufMut>(&self, buffer: &mut B) {
        match self {
            Self::A(addr) => buffer.put_slice(&addr.octets()),
            Self::Aaaa(addr) => buffer.put_slice(&addr.octets()),
            Self::Ns(name) | Self::Cname(name) | Self::Ptr(name) => name.write_into(buffer),
            Self::Mx {
                preference,
                exchange,
            } => {
                buffer.put_u16(*preference);
                exchange.write_into(buffer);
            }
            Self::Soa {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => {
                mname.write_into(buffer);
                rname.write_into(buffer);
                for counter in [serial, refresh, retry, expire, minimum] {
                    buffer.put_u32(*counter);
                }
            }
            Self::Txt(strings) => {
                for string in strings {
                    buffer.put_u8(string.len() as u8);
                    buffer.put_slice(string);
                }
            }
            Self::Other(_, data) => buffer.put_slice(data),
        }
    }
}

fn write_character_string(f: &mut fmt::Formatter<'_>, string: &[u8]) -> fmt::Result {
    f.write_str("\"")?;
    for &c in string {
        match c {
            b'"' | b'\\' => write!(f, "\\{}", c as char)?,
            0x20..=0x7e => write!(f, "{}", c as char)?,
            c => write!(f, "\\{c:03}")?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for RData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A(addr) => write!(f, "{addr}"),
            Self::Aaaa(addr) => write!(f, "{addr}"),
            Self::Ns(name) | Self::Cname(name) | Self::Ptr(name) => write!(f, "{name}"),
            Self::Mx {
                preference,
                exchange,
            } => write!(f, "{preference} {exchange}"),
            Self::Soa {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => write!(
                f,
                "{mname} {rname} {serial} {refresh} {retry} {expire} {minimum}"
            ),
            Self::Txt(strings) => {
                for (i, string) in strings.iter().enumerate() {
                    if i != 0 {
                        f.write_str(" ")?;
                    }
                    write_character_string(f, string)?;
                }
                Ok(())
            }
            Self::Other(_, data) => {
                write!(f, "\\# {}", data.len())?;
                if !data.is_empty() {
                    f.write_str(" ")?;
                    for byte in data.iter() {
                        write!(f, "{byte:02x}")?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.name, self.ttl, self.class, self.typ, self.data
        )
    }
}
