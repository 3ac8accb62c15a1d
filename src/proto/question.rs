use std::fmt;

use bytes::BufMut;
use nom::{number::complete::be_u16, sequence::tuple, IResult};
use thiserror::Error;

use super::{
    class::QClass,
    domain_name::{DomainName, DomainNameError},
    types::QType,
    FromPacketBytes, WriteToPacket,
};

/// The (name, type, class) triple a query asks about. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    name: DomainName,
    q_type: QType,
    q_class: QClass,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuestionError {
    #[error(transparent)]
    DomainName(#[from] DomainNameError),
    #[error("The question type and class were cut off by the end of the message")]
    EOF,
}

fn type_and_class(input: &[u8]) -> IResult<&[u8], (u16, u16)> {
    tuple((be_u16, be_u16))(input)
}

impl Question {
    pub fn new(name: DomainName, q_type: QType, q_class: QClass) -> Self {
        Self {
            name,
            q_type,
            q_class,
        }
    }

    /// An Internet class question.
    pub fn internet(name: DomainName, q_type: QType) -> Self {
        Self::new(name, q_type, QClass::IN)
    }

    pub fn name(&self) -> &DomainName {
        &self.name
    }

    pub fn q_type(&self) -> QType {
        self.q_type
    }

    pub fn q_class(&self) -> QClass {
        self.q_class
    }
}

impl FromPacketBytes for Question {
    type Error = QuestionError;

    fn parse(bytes: &[u8], offset: usize) -> Result<(Self, usize), Self::Error> {
        let (name, name_size) = DomainName::parse(bytes, offset)?;
        let rest = &bytes[offset + name_size..];
        let (_, (q_type, q_class)) = type_and_class(rest).map_err(|_| QuestionError::EOF)?;
        Ok((
            Self {
                name,
                q_type: QType::from(q_type),
                q_class: QClass::from(q_class),
            },
            name_size + 4,
        ))
    }
}

impl WriteToPacket for Question {
    fn len_in_packet(&self) -> usize {
        4 + self.name.len_in_packet()
    }

    fn write_into<B: BufMut>(&self, buffer: &mut B) {
        self.name.write_into(buffer);
        buffer.put_u16(self.q_type.as_u16());
        buffer.put_u16(self.q_class.as_u16());
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.name, self.q_class, self.q_type)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn cloud99p_a() -> Question {
        Question::internet("cloud99p.org".parse().unwrap(), QType::A)
    }

    #[test]
    fn write_and_parse() {
        let question = cloud99p_a();
        let mut buffer = Vec::new();
        question.write_into(&mut buffer);
        assert_eq!(buffer, b"\x08cloud99p\x03org\x00\x00\x01\x00\x01");
        assert_eq!(question.len_in_packet(), buffer.len());

        let (parsed, size) = Question::parse(&buffer, 0).unwrap();
        assert_eq!(size, buffer.len());
        assert_eq!(parsed, question);
    }

    #[test]
    fn parse_at_offset_with_unknown_type() {
        let buffer = b"\xff\xff\x03org\x00\x01\x00\x00\xff";
        let (parsed, size) = Question::parse(buffer, 2).unwrap();
        assert_eq!(size, 9);
        assert_eq!(parsed.q_type(), QType::Unknown(256));
        assert_eq!(parsed.q_class(), QClass::ANY);
    }

    #[test]
    fn missing_type() {
        assert_eq!(
            Question::parse(b"\x03org\x00\x00", 0),
            Err(QuestionError::EOF)
        );
    }

    #[test]
    fn display() {
        assert_eq!(cloud99p_a().to_string(), "cloud99p.org. IN A");
    }
}
