/*!
The initial byte of every CBOR data item, and its argument.

Every item starts with a single byte holding the 3-bit major type and a 5-bit
additional-information field, optionally followed by 1, 2, 4 or 8 big-endian
argument bytes. See [RFC 8949, section 3](https://www.rfc-editor.org/rfc/rfc8949.html#section-3).
*/

use super::*;

/// The break stop code that terminates indefinite-length items.
pub const BREAK: u8 = 0xFF;

const INDEFINITE: u8 = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MajorType {
    UnsignedInteger = 0,
    NegativeInteger = 1,
    ByteString = 2,
    TextString = 3,
    Array = 4,
    Map = 5,
    Tag = 6,
    Simple = 7,
}

impl MajorType {
    /// Returns true if the major type may carry the indefinite-length marker.
    pub fn allows_indefinite(&self) -> bool {
        matches!(
            self,
            Self::ByteString | Self::TextString | Self::Array | Self::Map
        )
    }
}

impl From<u8> for MajorType {
    fn from(initial_byte: u8) -> Self {
        match initial_byte >> 5 {
            0 => Self::UnsignedInteger,
            1 => Self::NegativeInteger,
            2 => Self::ByteString,
            3 => Self::TextString,
            4 => Self::Array,
            5 => Self::Map,
            6 => Self::Tag,
            _ => Self::Simple,
        }
    }
}

/// The decoded additional-information field of an initial byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Argument {
    /// Values 0..=23, held in the initial byte itself.
    Inline(u8),
    Extended1(u8),
    Extended2(u16),
    Extended4(u32),
    Extended8(u64),
    /// The indefinite-length marker (31).
    Indefinite,
    /// One of the reserved values 28..=30.
    Malformed(u8),
}

impl Argument {
    /// The number of argument bytes following the initial byte.
    pub fn size(&self) -> usize {
        match self {
            Self::Extended1(_) => 1,
            Self::Extended2(_) => 2,
            Self::Extended4(_) => 4,
            Self::Extended8(_) => 8,
            Self::Inline(_) | Self::Indefinite | Self::Malformed(_) => 0,
        }
    }

    /// The numeric value of a fixed-width argument.
    pub fn value(&self) -> Option<u64> {
        match *self {
            Self::Inline(v) | Self::Extended1(v) => Some(v as u64),
            Self::Extended2(v) => Some(v as u64),
            Self::Extended4(v) => Some(v as u64),
            Self::Extended8(v) => Some(v),
            Self::Indefinite | Self::Malformed(_) => None,
        }
    }
}

pub fn decode_major_type(initial_byte: u8) -> MajorType {
    initial_byte.into()
}

/// Decodes the argument of the item starting at `data[0]`.
///
/// The trailing argument bytes are bounds-checked against `data`, so a
/// truncated header reports [`decode::Error::NotEnoughData`] rather than
/// reading past the end of the span.
pub fn decode_argument(data: &[u8]) -> Result<Argument, decode::Error> {
    let Some(initial_byte) = data.first() else {
        return Err(decode::Error::EmptyBuffer);
    };
    let trailing = &data[1..];
    match initial_byte & 0x1F {
        v @ 0..=23 => Ok(Argument::Inline(v)),
        24 => trailing
            .first()
            .map(|v| Argument::Extended1(*v))
            .ok_or(decode::Error::NotEnoughData),
        25 => Ok(Argument::Extended2(u16::from_be_bytes(be_bytes(
            trailing,
        )?))),
        26 => Ok(Argument::Extended4(u32::from_be_bytes(be_bytes(
            trailing,
        )?))),
        27 => Ok(Argument::Extended8(u64::from_be_bytes(be_bytes(
            trailing,
        )?))),
        INDEFINITE => Ok(Argument::Indefinite),
        v => Ok(Argument::Malformed(v)),
    }
}

fn be_bytes<const N: usize>(data: &[u8]) -> Result<[u8; N], decode::Error> {
    data.get(..N)
        .and_then(|b| b.try_into().ok())
        .ok_or(decode::Error::NotEnoughData)
}

/// The size of the shortest header able to carry `len`.
pub fn encoded_header_len(len: u64) -> usize {
    if len < 24 {
        1
    } else if len <= u8::MAX as u64 {
        2
    } else if len <= u16::MAX as u64 {
        3
    } else if len <= u32::MAX as u64 {
        5
    } else {
        9
    }
}

/// Writes the shortest header for `len` under `major_type`, returning the
/// number of bytes written.
pub fn encode_length_header(
    len: u64,
    major_type: MajorType,
    dest: &mut [u8],
) -> Result<usize, encode::Error> {
    let header_len = encoded_header_len(len);
    let Some(dest) = dest.get_mut(..header_len) else {
        return Err(encode::Error::BufferOverflow);
    };
    let major = (major_type as u8) << 5;
    match header_len {
        1 => dest[0] = major | (len as u8),
        2 => {
            dest[0] = major | 24;
            dest[1] = len as u8;
        }
        3 => {
            dest[0] = major | 25;
            dest[1..].copy_from_slice(&(len as u16).to_be_bytes());
        }
        5 => {
            dest[0] = major | 26;
            dest[1..].copy_from_slice(&(len as u32).to_be_bytes());
        }
        _ => {
            dest[0] = major | 27;
            dest[1..].copy_from_slice(&len.to_be_bytes());
        }
    }
    Ok(header_len)
}

pub fn encode_indefinite_header(
    major_type: MajorType,
    dest: &mut [u8],
) -> Result<usize, encode::Error> {
    if !major_type.allows_indefinite() {
        return Err(encode::Error::Unsupported);
    }
    emit_byte(((major_type as u8) << 5) | INDEFINITE, dest)
}

pub fn encode_break(dest: &mut [u8]) -> Result<usize, encode::Error> {
    emit_byte(BREAK, dest)
}

fn emit_byte(b: u8, dest: &mut [u8]) -> Result<usize, encode::Error> {
    let Some(d) = dest.first_mut() else {
        return Err(encode::Error::BufferOverflow);
    };
    *d = b;
    Ok(1)
}
