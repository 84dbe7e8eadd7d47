//! Minimal bencode codec with byte-span tracking for the `info` dictionary.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::error::{DecodeError, DecodeResult};

const MAX_DEPTH: usize = 64;
const INFO_KEY: &[u8] = b"info";

/// A decoded bencode value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// `i<digits>e`
    Integer(i64),
    /// `<len>:<bytes>`
    Bytes(Vec<u8>),
    /// `l<values>e`
    List(Vec<Self>),
    /// `d<key><value>...e`, keys kept in canonical (sorted) order.
    Dict(BTreeMap<Vec<u8>, Self>),
}

impl Value {
    /// Convenience constructor for byte strings.
    #[must_use]
    pub fn bytes(value: impl AsRef<[u8]>) -> Self {
        Self::Bytes(value.as_ref().to_vec())
    }

    /// Build a dictionary from `(key, value)` pairs.
    #[must_use]
    pub fn dict<K, I>(entries: I) -> Self
    where
        K: AsRef<[u8]>,
        I: IntoIterator<Item = (K, Self)>,
    {
        Self::Dict(
            entries
                .into_iter()
                .map(|(key, value)| (key.as_ref().to_vec(), value))
                .collect(),
        )
    }

    /// Integer payload, if this is an integer.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Raw byte payload, if this is a byte string.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(value) => Some(value),
            _ => None,
        }
    }

    /// UTF-8 view of a byte string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    /// List items, if this is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Dictionary entries, if this is a dictionary.
    #[must_use]
    pub const fn as_dict(&self) -> Option<&BTreeMap<Vec<u8>, Self>> {
        match self {
            Self::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up `key` when this value is a dictionary.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_dict().and_then(|entries| entries.get(key.as_bytes()))
    }

    /// Canonical bencoding of this value.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Self::Integer(value) => {
                out.push(b'i');
                out.extend_from_slice(value.to_string().as_bytes());
                out.push(b'e');
            }
            Self::Bytes(bytes) => encode_bytes(bytes, out),
            Self::List(items) => {
                out.push(b'l');
                for item in items {
                    item.encode_into(out);
                }
                out.push(b'e');
            }
            Self::Dict(entries) => {
                out.push(b'd');
                for (key, value) in entries {
                    encode_bytes(key, out);
                    value.encode_into(out);
                }
                out.push(b'e');
            }
        }
    }
}

fn encode_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(bytes.len().to_string().as_bytes());
    out.push(b':');
    out.extend_from_slice(bytes);
}

/// Root value plus the raw span of its top-level `info` entry.
#[derive(Debug, Clone)]
pub(crate) struct Document {
    pub(crate) root: Value,
    pub(crate) info_span: Option<Range<usize>>,
}

/// Parse a complete bencoded payload. Trailing bytes are rejected.
///
/// # Errors
///
/// Returns [`DecodeError::Truncated`] when input ends early and
/// [`DecodeError::Malformed`] for any grammar violation.
pub fn parse(input: &[u8]) -> DecodeResult<Value> {
    parse_document(input).map(|document| document.root)
}

pub(crate) fn parse_document(input: &[u8]) -> DecodeResult<Document> {
    let mut parser = Parser {
        input,
        pos: 0,
        info_span: None,
    };
    let root = parser.value(0)?;
    if parser.pos != input.len() {
        return Err(DecodeError::syntax(parser.pos, "trailing data after root value"));
    }
    Ok(Document {
        root,
        info_span: parser.info_span,
    })
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    info_span: Option<Range<usize>>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> DecodeResult<u8> {
        self.input
            .get(self.pos)
            .copied()
            .ok_or(DecodeError::Truncated { offset: self.pos })
    }

    fn value(&mut self, depth: usize) -> DecodeResult<Value> {
        if depth > MAX_DEPTH {
            return Err(DecodeError::syntax(self.pos, "nesting too deep"));
        }
        match self.peek()? {
            b'i' => self.integer(),
            b'l' => self.list(depth),
            b'd' => self.dict(depth),
            b'0'..=b'9' => self.byte_string().map(Value::Bytes),
            _ => Err(DecodeError::syntax(self.pos, "unexpected token")),
        }
    }

    fn integer(&mut self) -> DecodeResult<Value> {
        let start = self.pos;
        self.pos += 1;
        let digits = self.take_until(b'e')?;
        let text = std::str::from_utf8(digits)
            .map_err(|_| DecodeError::syntax(start, "integer is not ascii"))?;
        let unsigned = text.strip_prefix('-').unwrap_or(text);
        if unsigned.is_empty() || !unsigned.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(DecodeError::syntax(start, "invalid integer"));
        }
        if (unsigned.len() > 1 && unsigned.starts_with('0')) || text == "-0" {
            return Err(DecodeError::syntax(start, "non-canonical integer"));
        }
        text.parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| DecodeError::syntax(start, "integer out of range"))
    }

    fn byte_string(&mut self) -> DecodeResult<Vec<u8>> {
        let start = self.pos;
        let digits = self.take_until(b':')?;
        if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
            return Err(DecodeError::syntax(start, "invalid string length"));
        }
        if digits.len() > 1 && digits[0] == b'0' {
            return Err(DecodeError::syntax(start, "non-canonical string length"));
        }
        let len = std::str::from_utf8(digits)
            .ok()
            .and_then(|text| text.parse::<usize>().ok())
            .ok_or(DecodeError::syntax(start, "string length out of range"))?;
        let end = self
            .pos
            .checked_add(len)
            .ok_or(DecodeError::syntax(start, "string length out of range"))?;
        let bytes = self
            .input
            .get(self.pos..end)
            .ok_or(DecodeError::Truncated {
                offset: self.input.len(),
            })?
            .to_vec();
        self.pos = end;
        Ok(bytes)
    }

    fn list(&mut self, depth: usize) -> DecodeResult<Value> {
        self.pos += 1;
        let mut items = Vec::new();
        while self.peek()? != b'e' {
            items.push(self.value(depth + 1)?);
        }
        self.pos += 1;
        Ok(Value::List(items))
    }

    fn dict(&mut self, depth: usize) -> DecodeResult<Value> {
        self.pos += 1;
        let mut entries = BTreeMap::new();
        while self.peek()? != b'e' {
            let key_offset = self.pos;
            if !self.peek()?.is_ascii_digit() {
                return Err(DecodeError::syntax(key_offset, "dictionary key must be a string"));
            }
            let key = self.byte_string()?;
            let value_start = self.pos;
            let value = self.value(depth + 1)?;
            if depth == 0 && key == INFO_KEY {
                self.info_span = Some(value_start..self.pos);
            }
            if entries.insert(key, value).is_some() {
                return Err(DecodeError::syntax(key_offset, "duplicate dictionary key"));
            }
        }
        self.pos += 1;
        Ok(Value::Dict(entries))
    }

    fn take_until(&mut self, terminator: u8) -> DecodeResult<&'a [u8]> {
        let input = self.input;
        let rest = &input[self.pos..];
        let len = rest
            .iter()
            .position(|byte| *byte == terminator)
            .ok_or(DecodeError::Truncated {
                offset: self.input.len(),
            })?;
        let slice = &rest[..len];
        self.pos += len + 1;
        Ok(slice)
    }
}
