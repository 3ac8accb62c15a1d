use std::fmt;

use bytes::{Bytes, BytesMut};
use thiserror::Error;

use super::{
    FromPacketBytes, Header, HeaderError, PacketType, Question, QuestionError, RData, Resource,
    ResourceError, ResponseCode, WriteToPacket,
};

/// The classic limit for a DNS message over UDP without EDNS(0).
pub const MAX_UDP_MESSAGE_SIZE: usize = 512;

/// A whole DNS message. The header counts always agree with the section lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    header: Header,
    questions: Vec<Question>,
    answers: Vec<Resource>,
    authority: Vec<Resource>,
    additional: Vec<Resource>,
}

pub struct PacketBuilder {
    header: Header,
    questions: Vec<Question>,
    answers: Vec<Resource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Question,
    Answer,
    Authority,
    Additional,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error(transparent)]
    Header(#[from] HeaderError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error("Failed to read the {section} section: {source}")]
    Resource {
        section: Section,
        source: ResourceError,
    },
    #[error("Expected to find {expected} {section} entries but the message ended after {found}")]
    TooFewEntries {
        section: Section,
        expected: usize,
        found: usize,
    },
    #[error("A query needs at least one question")]
    NoQuestions,
    #[error("The message takes up {0} bytes which is more than the {MAX_UDP_MESSAGE_SIZE} bytes allowed over UDP")]
    TooLarge(usize),
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Section::Question => "question",
            Section::Answer => "answer",
            Section::Authority => "authority",
            Section::Additional => "additional",
        })
    }
}

fn get_entry_vec<T>(entries: u16) -> Vec<T> {
    // The counts come from the network, do not trust them for allocation.
    Vec::with_capacity(entries.min(10).into())
}

impl Packet {
    /// Starts a standard query with the given transaction id.
    pub fn query(id: u16) -> PacketBuilder {
        PacketBuilder {
            header: Header::new(id),
            questions: Vec::new(),
            answers: Vec::new(),
        }
    }

    /// Starts a response to this packet: id, opcode, RD and the questions are copied.
    pub fn respond(&self, code: ResponseCode) -> PacketBuilder {
        let mut header = Header::new(self.header.id);
        header.opcode = self.header.opcode;
        header.recursion_desired = self.header.recursion_desired;
        header.packet_type = PacketType::Response;
        header.response_code = code;
        header.question_entries = self.questions.len() as u16;
        PacketBuilder {
            header,
            questions: self.questions.clone(),
            answers: Vec::new(),
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn id(&self) -> u16 {
        self.header.id
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &[Resource] {
        &self.answers
    }

    pub fn authority(&self) -> &[Resource] {
        &self.authority
    }

    pub fn additional(&self) -> &[Resource] {
        &self.additional
    }

    pub fn try_parse(buffer: &[u8]) -> Result<Self, PacketError> {
        let (header, mut offset) = Header::parse(buffer, 0)?;

        let mut questions = get_entry_vec(header.question_entries);
        for found in 0..header.question_entries as usize {
            if offset >= buffer.len() {
                return Err(PacketError::TooFewEntries {
                    section: Section::Question,
                    expected: header.question_entries as usize,
                    found,
                });
            }
            let (question, size) = Question::parse(buffer, offset)?;
            offset += size;
            questions.push(question);
        }

        let mut sections = [
            (Section::Answer, header.answer_entries, Vec::new()),
            (Section::Authority, header.authority_entries, Vec::new()),
            (Section::Additional, header.additional_entries, Vec::new()),
        ];
        for (section, entries, resources) in sections.iter_mut() {
            *resources = get_entry_vec(*entries);
            for found in 0..*entries as usize {
                if offset >= buffer.len() {
                    return Err(PacketError::TooFewEntries {
                        section: *section,
                        expected: *entries as usize,
                        found,
                    });
                }
                let (resource, size) =
                    Resource::parse(buffer, offset).map_err(|source| PacketError::Resource {
                        section: *section,
                        source,
                    })?;
                offset += size;
                resources.push(resource);
            }
        }
        let [(_, _, answers), (_, _, authority), (_, _, additional)] = sections;

        Ok(Self {
            header,
            questions,
            answers,
            authority,
            additional,
        })
    }

    pub fn len_in_packet(&self) -> usize {
        Header::SIZE
            + self
                .questions
                .iter()
                .map(|question| question.len_in_packet())
                .sum::<usize>()
            + [&self.answers, &self.authority, &self.additional]
                .into_iter()
                .flatten()
                .map(|resource| resource.len_in_packet())
                .sum::<usize>()
    }

    /// Encodes the message without name compression, refusing records whose length fields would
    /// overflow and anything that does not fit a single UDP datagram.
    pub fn encode(&self) -> Result<Bytes, PacketError> {
        for (section, resources) in [
            (Section::Answer, &self.answers),
            (Section::Authority, &self.authority),
            (Section::Additional, &self.additional),
        ] {
            for resource in resources {
                resource
                    .validate()
                    .map_err(|source| PacketError::Resource { section, source })?;
            }
        }
        let size = self.len_in_packet();
        if size > MAX_UDP_MESSAGE_SIZE {
            return Err(PacketError::TooLarge(size));
        }
        let mut buffer = BytesMut::with_capacity(size);
        self.header.write_into(&mut buffer);
        for question in &self.questions {
            question.write_into(&mut buffer);
        }
        for resource in [&self.answers, &self.authority, &self.additional]
            .into_iter()
            .flatten()
        {
            resource.write_into(&mut buffer);
        }
        Ok(buffer.freeze())
    }

    /// A one line description: the first question for queries, the first answer for responses
    /// and the response code for responses without answers.
    pub fn summary(&self) -> String {
        match self.header.packet_type {
            PacketType::Query => match self.questions.first() {
                Some(question) => format!("DNS Qry \"{}\"", question.name()),
                None => "DNS Qry".to_owned(),
            },
            PacketType::Response => match self.answers.first().map(Resource::data) {
                Some(data @ (RData::Txt(_) | RData::Other(..))) => format!("DNS Ans {data}"),
                Some(data) => format!("DNS Ans \"{data}\""),
                None => format!("DNS Ans {}", self.header.response_code),
            },
        }
    }
}

impl PacketBuilder {
    pub fn recursion_desired(mut self, recursion_desired: bool) -> Self {
        self.header.recursion_desired = recursion_desired;
        self
    }

    pub fn add_question(mut self, question: Question) -> Self {
        self.questions.push(question);
        self.header.question_entries += 1;
        self
    }

    pub fn add_answer(mut self, answer: Resource) -> Self {
        self.answers.push(answer);
        self.header.answer_entries += 1;
        self
    }

    /// Finishes the packet. Queries need at least one question.
    pub fn build(self) -> Result<Packet, PacketError> {
        if self.header.packet_type == PacketType::Query && self.questions.is_empty() {
            return Err(PacketError::NoQuestions);
        }
        Ok(Packet {
            header: self.header,
            questions: self.questions,
            answers: self.answers,
            authority: Vec::new(),
            additional: Vec::new(),
        })
    }
}

fn write_section(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    resources: &[Resource],
) -> fmt::Result {
    if resources.is_empty() {
        return Ok(());
    }
    writeln!(f)?;
    writeln!(f, ";; {title} SECTION:")?;
    for resource in resources {
        writeln!(f, "{resource}")?;
    }
    Ok(())
}

impl fmt::Display for Packet {
    /// A dig like dump of every header field and section.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = &self.header;
        writeln!(
            f,
            ";; ->>HEADER<<- opcode: {}, status: {}, id: {}",
            header.opcode, header.response_code, header.id
        )?;
        writeln!(
            f,
            ";; flags: {}; QUERY: {}, ANSWER: {}, AUTHORITY: {}, ADDITIONAL: {}",
            header.flags().join(" "),
            header.question_entries,
            header.answer_entries,
            header.authority_entries,
            header.additional_entries
        )?;
        if !self.questions.is_empty() {
            writeln!(f)?;
            writeln!(f, ";; QUESTION SECTION:")?;
            for question in &self.questions {
                writeln!(
                    f,
                    ";{}\t\t{}\t{}",
                    question.name(),
                    question.q_class(),
                    question.q_type()
                )?;
            }
        }
        write_section(f, "ANSWER", &self.answers)?;
        write_section(f, "AUTHORITY", &self.authority)?;
        write_section(f, "ADDITIONAL", &self.additional)
    }
}
