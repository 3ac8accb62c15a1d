use std::{fmt, hash::Hash};

use thiserror::Error;

pub const MAX_LABEL_SIZE: usize = 63;

/// A single label of a domain name. Labels read from the wire are kept as the raw bytes the
/// server sent; labels built from text are validated as host name labels.
#[derive(Debug, Clone)]
pub struct Label(Box<[u8]>);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LabelError {
    #[error("Expected a label length field but the buffer ended")]
    NoLengthField,
    #[error("The label is {0} bytes long but at most {MAX_LABEL_SIZE} bytes are allowed")]
    LabelTooLarge(usize),
    #[error("Empty labels are not allowed inside a domain name")]
    Empty,
    #[error("The amount of remaining bytes in the buffer ({remaining_len}) is not enough for the label ({expected_len})")]
    BufferTooSmall {
        remaining_len: usize,
        expected_len: usize,
    },
    #[error(
        "The character code of {0:#04x} is not allowed in a label. Expected A-Z, a-z, 0-9, - and _."
    )]
    IllegalLabelChar(u8),
    #[error("A label may not start or end with a hyphen")]
    HyphenAtEdge,
    #[error("The length field {0:#010b} uses a reserved label type")]
    ReservedLengthBits(u8),
}

#[derive(Debug)]
pub enum LabelParseResult {
    Label(Label),
    Pointer(usize),
    End,
}

impl Label {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Reads the label, pointer or terminator at `offset`. Returns the amount of bytes it takes
    /// up in the buffer alongside the result.
    pub fn try_parse(buffer: &[u8], offset: usize) -> Result<(usize, LabelParseResult), LabelError> {
        use LabelError::*;
        use LabelParseResult::*;

        let Some(&len) = buffer.get(offset) else {
            return Err(NoLengthField);
        };
        match len & 0xc0 {
            0x00 if len == 0 => Ok((1, End)),
            0x00 => {
                let len = len as usize;
                if offset + 1 + len > buffer.len() {
                    return Err(BufferTooSmall {
                        remaining_len: buffer.len() - offset - 1,
                        expected_len: len,
                    });
                }
                Ok((
                    1 + len,
                    Label(Self(Box::from(&buffer[offset + 1..offset + 1 + len]))),
                ))
            }
            0xc0 => {
                let pointer_lower = *buffer.get(offset + 1).ok_or(BufferTooSmall {
                    remaining_len: buffer.len() - offset,
                    expected_len: 2,
                })? as usize;
                Ok((2, Pointer((((len & 0x3f) as usize) << 8) | pointer_lower)))
            }
            _ => Err(ReservedLengthBits(len)),
        }
    }

    const fn validate_label(label_bytes: &[u8]) -> Result<(), LabelError> {
        use LabelError::*;

        if label_bytes.is_empty() {
            return Err(Empty);
        }
        if label_bytes.len() > MAX_LABEL_SIZE {
            return Err(LabelTooLarge(label_bytes.len()));
        }
        let mut i = 0;
        while i < label_bytes.len() {
            match label_bytes[i] {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' => {}
                b'-' if i != 0 && i + 1 != label_bytes.len() => {}
                b'-' => return Err(HyphenAtEdge),
                c => return Err(IllegalLabelChar(c)),
            }
            i += 1;
        }

        Ok(())
    }

    /// Builds a label from a single dot free piece of a host name.
    pub fn from_str(str: &str) -> Result<Self, LabelError> {
        Self::validate_label(str.as_bytes())?;
        Ok(Self(Box::from(str.as_bytes())))
    }
}

impl Hash for Label {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for c in self.0.iter() {
            state.write_u8(c.to_ascii_lowercase());
        }
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for Label {}

impl fmt::Display for Label {
    /// Prints the label in master file notation, escaping dots, backslashes and anything that is
    /// not printable ASCII.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &c in self.0.iter() {
            match c {
                b'.' | b'\\' | b'"' => write!(f, "\\{}", c as char)?,
                0x21..=0x7e => write!(f, "{}", c as char)?,
                c => write!(f, "\\{c:03}")?,
            }
        }
        Ok(())
    }
}
