use super::*;
use header::{Argument, MajorType};
use thiserror::Error;

pub use super::decode_seq::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Empty buffer")]
    EmptyBuffer,

    #[error("Not enough data for encoded value")]
    NotEnoughData,

    #[error("Invalid minor-type value {0}")]
    MalformedInput(u8),

    #[error("Unsupported {0:?} value")]
    Unsupported(MajorType),

    #[error("Chunked string contains an invalid chunk")]
    InvalidChunk,

    #[error(transparent)]
    InvalidUtf8(#[from] core::str::Utf8Error),

    #[error("Map has key but no value")]
    PartialMap,

    #[error("Maximum recursion depth reached")]
    MaxRecursion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Simple {
    False,
    True,
    Null,
    Undefined,
    /// Values 24..=31 encoded in a trailing byte, which RFC 8949 forbids.
    Reserved(u8),
    Unassigned(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    Bytes,
    Text,
}

impl From<StringKind> for MajorType {
    fn from(kind: StringKind) -> Self {
        match kind {
            StringKind::Bytes => MajorType::ByteString,
            StringKind::Text => MajorType::TextString,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Integer(i64),
    Bytes(&'a [u8]),
    Text(&'a str),
    /// An indefinite-length byte string, as a sequence of definite chunks.
    ByteStream(Array<'a>),
    /// An indefinite-length text string, as a sequence of definite chunks.
    TextStream(Array<'a>),
    Array(Array<'a>),
    Map(Map<'a>),
    Simple(Simple),
    Float(f32),
}

impl Value<'_> {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "Integer",
            Value::Bytes(_) => "Byte String",
            Value::Text(_) => "Text String",
            Value::ByteStream(_) => "Indefinite Length Byte String",
            Value::TextStream(_) => "Indefinite Length Text String",
            Value::Array(_) => "Array",
            Value::Map(_) => "Map",
            Value::Simple(_) => "Simple Value",
            Value::Float(_) => "Float",
        }
    }

    /// Narrows an integer value into `T`, if it fits.
    pub fn as_integer<T>(&self) -> Option<T>
    where
        T: num_traits::FromPrimitive,
    {
        match self {
            Value::Integer(v) => T::from_i64(*v),
            _ => None,
        }
    }
}

/// A single parsed item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Item<'a> {
    pub value: Value<'a>,
    /// The length of the initial byte plus its argument bytes.
    pub header_len: usize,
    /// The offset just past the item, relative to the start of the parsed
    /// span. `None` when the item contains other items, as the end is only
    /// known once they have been traversed.
    pub next: Option<usize>,
}

impl Item<'_> {
    /// Returns the full encoded length of the item, traversing any contained
    /// items if needed. Scalars without a `next` are measured from their
    /// header and payload.
    pub fn end(&self, max_recursion: usize) -> Result<usize, Error> {
        if let Some(next) = self.next {
            return Ok(next);
        }
        let inner = match &self.value {
            Value::Array(a) => a.skip(max_recursion)?,
            Value::Map(m) => m.skip(max_recursion)?,
            Value::ByteStream(c) => traverse_indefinite_string(c, StringKind::Bytes, |_| {})?,
            Value::TextStream(c) => traverse_indefinite_string(c, StringKind::Text, |_| {})?,
            Value::Bytes(b) => b.len(),
            Value::Text(s) => s.len(),
            Value::Integer(_) | Value::Simple(_) | Value::Float(_) => 0,
        };
        Ok(self.header_len + inner)
    }
}

fn fixed_len(argument: &Argument, data_len: usize) -> Result<usize, Error> {
    argument
        .value()
        .and_then(|v| usize::try_from(v).ok())
        .filter(|v| *v <= data_len)
        .ok_or(Error::NotEnoughData)
}

fn parse_simple(argument: Argument) -> Result<Value<'static>, Error> {
    match argument {
        Argument::Inline(20) => Ok(Value::Simple(Simple::False)),
        Argument::Inline(21) => Ok(Value::Simple(Simple::True)),
        Argument::Inline(22) => Ok(Value::Simple(Simple::Null)),
        Argument::Inline(23) => Ok(Value::Simple(Simple::Undefined)),
        Argument::Inline(v) => {
            trace!("Parsing unassigned simple value {v}");
            Ok(Value::Simple(Simple::Unassigned(v)))
        }
        Argument::Extended1(v) if v < 32 => {
            trace!("Parsing reserved simple value {v}");
            Ok(Value::Simple(Simple::Reserved(v)))
        }
        Argument::Extended1(v) => {
            trace!("Parsing unassigned simple value {v}");
            Ok(Value::Simple(Simple::Unassigned(v)))
        }
        Argument::Extended2(bits) => Ok(Value::Float(float::f16_to_f32(bits))),
        Argument::Extended4(bits) => Ok(Value::Float(f32::from_bits(bits))),
        Argument::Extended8(bits) => Ok(Value::Float(float::f64_to_f32(f64::from_bits(bits)))),
        Argument::Indefinite => Err(Error::MalformedInput(31)),
        Argument::Malformed(v) => Err(Error::MalformedInput(v)),
    }
}

/// Parses the single item at the start of `data`.
///
/// Scalars are fully parsed. Arrays, maps and indefinite-length strings only
/// have their header parsed; their contents are visited with
/// [`traverse_array`], [`traverse_map`] and [`traverse_indefinite_string`],
/// which also determine where they end.
pub fn parse(data: &[u8]) -> Result<Item<'_>, Error> {
    let Some(initial_byte) = data.first() else {
        return Err(Error::EmptyBuffer);
    };
    let major_type = header::decode_major_type(*initial_byte);
    let argument = header::decode_argument(data)?;
    if let Argument::Malformed(v) = argument {
        return Err(Error::MalformedInput(v));
    }
    if argument == Argument::Indefinite && !major_type.allows_indefinite() {
        return Err(Error::MalformedInput(31));
    }

    let header_len = argument.size() + 1;
    let rest = &data[header_len..];

    let (value, next) = match (major_type, argument) {
        (MajorType::UnsignedInteger, argument) => match argument.value().map(i64::try_from) {
            Some(Ok(v)) => (Value::Integer(v), Some(header_len)),
            _ => return Err(Error::Unsupported(major_type)),
        },
        (MajorType::NegativeInteger, argument) => match argument.value().map(i64::try_from) {
            Some(Ok(v)) => (Value::Integer(-1 - v), Some(header_len)),
            _ => return Err(Error::Unsupported(major_type)),
        },
        (MajorType::ByteString, Argument::Indefinite) => {
            (Value::ByteStream(Array::new(rest, None)), None)
        }
        (MajorType::TextString, Argument::Indefinite) => {
            (Value::TextStream(Array::new(rest, None)), None)
        }
        (MajorType::ByteString | MajorType::TextString, argument) => {
            let len = fixed_len(&argument, rest.len())?;
            let bytes = &rest[..len];
            let value = if major_type == MajorType::ByteString {
                Value::Bytes(bytes)
            } else {
                Value::Text(core::str::from_utf8(bytes)?)
            };
            (value, Some(header_len + len))
        }
        (MajorType::Array, argument) => (Value::Array(Array::new(rest, argument.value())), None),
        (MajorType::Map, argument) => (Value::Map(Map::new(rest, argument.value())), None),
        (MajorType::Simple, argument) => (parse_simple(argument)?, Some(header_len)),
        (MajorType::Tag, _) => return Err(Error::Unsupported(major_type)),
    };
    Ok(Item {
        value,
        header_len,
        next,
    })
}
