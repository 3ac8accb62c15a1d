use std::{fmt, str::FromStr, sync::Arc};

use bytes::BufMut;
use thiserror::Error;

use super::{
    label::{Label, LabelError, LabelParseResult},
    FromPacketBytes, WriteToPacket,
};

const MAX_NAME_SIZE: usize = 255;

/// A domain name as a list of labels, without the root label. Cloning is cheap.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct DomainName(Arc<[Label]>);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainNameError {
    #[error("The domain name takes up {0} bytes but at most {MAX_NAME_SIZE} are allowed")]
    NameTooLarge(usize),
    #[error("The root domain name can not be used here")]
    Root,
    #[error(transparent)]
    Label(#[from] LabelError),
    #[error("The label pointer {0:#x} points outside of the message")]
    IllegalLabelPointer(usize),
    #[error("The label pointers of the domain name form a loop")]
    CyclicPointers,
}

impl DomainName {
    pub fn root() -> Self {
        Self(Arc::from(Vec::new()))
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn labels(&self) -> &[Label] {
        &self.0
    }
}

impl FromStr for DomainName {
    type Err = DomainNameError;

    /// Parses a host name such as `cloud99p.org` or `cloud99p.org.`. The root name is rejected as
    /// it is never a useful question for the probe.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_suffix('.').unwrap_or(s);
        if s.is_empty() {
            return Err(DomainNameError::Root);
        }
        let labels = s
            .split('.')
            .map(Label::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        let name = Self(Arc::from(labels));
        let size = name.len_in_packet();
        if size > MAX_NAME_SIZE {
            return Err(DomainNameError::NameTooLarge(size));
        }
        Ok(name)
    }
}

impl FromPacketBytes for DomainName {
    type Error = DomainNameError;

    fn parse(buffer: &[u8], offset: usize) -> Result<(Self, usize), Self::Error> {
        let mut cursor = offset;
        let mut len = 1;
        let mut size = 0;
        let mut labels = Vec::new();
        let mut seen_pointers = Vec::new();
        loop {
            match Label::try_parse(buffer, cursor)? {
                (label_size, LabelParseResult::Label(label)) => {
                    cursor += label_size;
                    if seen_pointers.is_empty() {
                        size += label_size;
                    }
                    len += label_size;
                    if len > MAX_NAME_SIZE {
                        return Err(DomainNameError::NameTooLarge(len));
                    }
                    labels.push(label);
                }
                (pointer_size, LabelParseResult::Pointer(pointer)) => {
                    if pointer >= buffer.len() {
                        return Err(DomainNameError::IllegalLabelPointer(pointer));
                    }
                    if seen_pointers.is_empty() {
                        size += pointer_size;
                    }
                    if seen_pointers.contains(&pointer) {
                        return Err(DomainNameError::CyclicPointers);
                    }
                    seen_pointers.push(pointer);
                    cursor = pointer;
                }
                (end_size, LabelParseResult::End) => {
                    if seen_pointers.is_empty() {
                        size += end_size;
                    }
                    break;
                }
            }
        }
        Ok((Self(Arc::from(labels)), size))
    }
}

impl WriteToPacket for DomainName {
    fn len_in_packet(&self) -> usize {
        1 + self.0.iter().map(|label| label.len() + 1).sum::<usize>()
    }

    /// Writes the name uncompressed.
    fn write_into<B: BufMut>(&self, buffer: &mut B) {
        for label in self.0.iter() {
            buffer.put_u8(label.len() as u8);
            buffer.put_slice(label.as_bytes());
        }
        buffer.put_u8(0);
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str(".");
        }
        for label in self.0.iter() {
            write!(f, "{label}.")?;
        }
        Ok(())
    }
}
