use super::*;
use core::ops::Range;
use decode::{Simple, Value};
use header::MajorType;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("Not enough space in output buffer")]
    BufferOverflow,

    #[error("Value cannot be encoded")]
    Unsupported,

    #[error("Array or map has no contents to encode")]
    UnknownSize,

    #[error("Definite length sequence has {actual} items, expected {expected}")]
    LengthMismatch { expected: u64, actual: u64 },
}

/// Writes a value of a shape only known at runtime straight into the output.
///
/// `encode` is given the whole of the remaining output buffer, and returns
/// the number of bytes it wrote from the start of it.
pub trait CustomEncoder {
    fn encode(&self, dest: &mut [u8]) -> Result<usize, Error>;
}

impl<F> CustomEncoder for F
where
    F: Fn(&mut [u8]) -> Result<usize, Error>,
{
    fn encode(&self, dest: &mut [u8]) -> Result<usize, Error> {
        self(dest)
    }
}

pub type Pair<'a> = (Descriptor<'a>, Descriptor<'a>);

/// A description of a value to encode.
#[derive(Clone, Copy)]
pub enum Descriptor<'a> {
    Integer(i64),
    Bytes(&'a [u8]),
    Text(&'a str),
    Simple(Simple),
    /// Single precision, the working precision of parsed floats.
    Float(f32),
    /// Narrowed to half precision, rounding to nearest.
    Float16(f32),
    /// Widened to double precision.
    Float64(f32),
    /// A parsed array: it says where items are, not what to write, so
    /// encoding it fails with [`Error::UnknownSize`].
    Array(decode::Array<'a>),
    /// A parsed map, see [`Descriptor::Array`].
    Map(decode::Map<'a>),
    Values(&'a [Descriptor<'a>]),
    Pairs(&'a [Pair<'a>]),
    ValuesIndefinite(&'a [Descriptor<'a>]),
    PairsIndefinite(&'a [Pair<'a>]),
    ByteChunks(&'a [&'a [u8]]),
    TextChunks(&'a [&'a str]),
    Custom(&'a dyn CustomEncoder),
}

/// Encodes `descriptor` at the start of `dest`, returning the number of bytes
/// written.
///
/// Nothing is written past the end of `dest`. On error, items already
/// completed before the failing one are left in place.
pub fn encode(descriptor: &Descriptor, dest: &mut [u8]) -> Result<usize, Error> {
    let mut e = Encoder::new(dest);
    e.emit(descriptor)?;
    Ok(e.offset())
}

/// Writes a sequence of items into a fixed-size buffer.
pub struct Encoder<'b> {
    data: &'b mut [u8],
    offset: usize,
}

impl<'b> Encoder<'b> {
    pub fn new(data: &'b mut [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Returns the bytes written so far.
    pub fn build(self) -> &'b [u8] {
        let Self { data, offset } = self;
        &data[..offset]
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn reserve(&mut self, len: usize) -> Result<&mut [u8], Error> {
        let remaining = self.remaining();
        match self.data[self.offset..].get_mut(..len) {
            Some(dest) => Ok(dest),
            None => {
                debug!("Output buffer overflow: {len} bytes needed, {remaining} remaining");
                Err(Error::BufferOverflow)
            }
        }
    }

    fn emit_extend(&mut self, b: &[u8]) -> Result<Range<usize>, Error> {
        self.reserve(b.len())?.copy_from_slice(b);
        let start = self.offset;
        self.offset += b.len();
        Ok(start..self.offset)
    }

    fn emit_uint_minor(&mut self, major_type: MajorType, val: u64) -> Result<(), Error> {
        let dest = self.reserve(header::encoded_header_len(val))?;
        let len = header::encode_length_header(val, major_type, dest)?;
        self.offset += len;
        Ok(())
    }

    fn emit_integer(&mut self, val: i64) -> Result<(), Error> {
        if val >= 0 {
            self.emit_uint_minor(MajorType::UnsignedInteger, val as u64)
        } else {
            self.emit_uint_minor(MajorType::NegativeInteger, (-1 - val) as u64)
        }
    }

    fn emit_string(&mut self, major_type: MajorType, b: &[u8]) -> Result<Range<usize>, Error> {
        // Check for the whole item up front, so nothing is written on failure
        let len = b.len() as u64;
        self.reserve(header::encoded_header_len(len) + b.len())?;
        self.emit_uint_minor(major_type, len)?;
        self.emit_extend(b)
    }

    fn emit_simple(&mut self, value: Simple) -> Result<(), Error> {
        let minor = match value {
            Simple::False => 20,
            Simple::True => 21,
            Simple::Null => 22,
            Simple::Undefined => 23,
            Simple::Reserved(_) | Simple::Unassigned(_) => return Err(Error::Unsupported),
        };
        self.emit_extend(&[(7 << 5) | minor]).map(|_| ())
    }

    fn emit_float(&mut self, value: f32) -> Result<(), Error> {
        let mut b = [(7 << 5) | 26, 0, 0, 0, 0];
        b[1..].copy_from_slice(&value.to_be_bytes());
        self.emit_extend(&b).map(|_| ())
    }

    fn emit_float16(&mut self, value: f32) -> Result<(), Error> {
        let mut b = [(7 << 5) | 25, 0, 0];
        b[1..].copy_from_slice(&float::f32_to_f16(value).to_be_bytes());
        self.emit_extend(&b).map(|_| ())
    }

    fn emit_float64(&mut self, value: f32) -> Result<(), Error> {
        let mut b = [(7 << 5) | 27, 0, 0, 0, 0, 0, 0, 0, 0];
        b[1..].copy_from_slice(&float::f32_to_f64(value).to_be_bytes());
        self.emit_extend(&b).map(|_| ())
    }

    fn emit_custom(&mut self, custom: &dyn CustomEncoder) -> Result<(), Error> {
        let dest = &mut self.data[self.offset..];
        let len = custom.encode(dest)?;
        if len > dest.len() {
            return Err(Error::BufferOverflow);
        }
        self.offset += len;
        Ok(())
    }

    /// Writes a complete byte string, returning the range of the payload.
    pub fn emit_bytes(&mut self, value: &[u8]) -> Result<Range<usize>, Error> {
        self.emit_string(MajorType::ByteString, value)
    }

    /// Writes a complete text string, returning the range of the payload.
    pub fn emit_text(&mut self, value: &str) -> Result<Range<usize>, Error> {
        self.emit_string(MajorType::TextString, value.as_bytes())
    }

    pub fn emit(&mut self, value: &Descriptor) -> Result<(), Error> {
        match value {
            Descriptor::Integer(v) => self.emit_integer(*v),
            Descriptor::Bytes(b) => self.emit_bytes(b).map(|_| ()),
            Descriptor::Text(s) => self.emit_text(s).map(|_| ()),
            Descriptor::Simple(s) => self.emit_simple(*s),
            Descriptor::Float(v) => self.emit_float(*v),
            Descriptor::Float16(v) => self.emit_float16(*v),
            Descriptor::Float64(v) => self.emit_float64(*v),
            Descriptor::Array(_) | Descriptor::Map(_) => Err(Error::UnknownSize),
            Descriptor::Values(values) => self.emit_values(Some(values.len() as u64), values),
            Descriptor::ValuesIndefinite(values) => self.emit_values(None, values),
            Descriptor::Pairs(pairs) => self.emit_pairs(Some(pairs.len() as u64), pairs),
            Descriptor::PairsIndefinite(pairs) => self.emit_pairs(None, pairs),
            Descriptor::ByteChunks(chunks) => self.emit_byte_stream(|s| {
                chunks.iter().try_for_each(|chunk| s.emit(chunk))
            }),
            Descriptor::TextChunks(chunks) => self.emit_text_stream(|s| {
                chunks.iter().try_for_each(|chunk| s.emit(chunk))
            }),
            Descriptor::Custom(custom) => self.emit_custom(*custom),
        }
    }

    fn emit_values(&mut self, count: Option<u64>, values: &[Descriptor]) -> Result<(), Error> {
        self.emit_array(count, |a| values.iter().try_for_each(|value| a.emit(value)))
    }

    fn emit_pairs(&mut self, count: Option<u64>, pairs: &[Pair]) -> Result<(), Error> {
        self.emit_map(count, |m| {
            pairs.iter().try_for_each(|(key, value)| {
                m.emit(key)?;
                m.emit(value)
            })
        })
    }

    /// Writes an array of `count` items, or an indefinite-length array if
    /// `count` is `None`, with the items written by `f`.
    pub fn emit_array<F>(&mut self, count: Option<u64>, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Array<'_, 'b>) -> Result<(), Error>,
    {
        let mut a = Array::new(self, count)?;
        f(&mut a)?;
        a.end()
    }

    /// Writes a map of `count` pairs, or an indefinite-length map if `count`
    /// is `None`. `f` writes keys and values alternately.
    pub fn emit_map<F>(&mut self, count: Option<u64>, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Map<'_, 'b>) -> Result<(), Error>,
    {
        let mut m = Map::new(self, count)?;
        f(&mut m)?;
        m.end()
    }

    pub fn emit_byte_stream<F>(&mut self, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut ByteStream<'_, 'b>) -> Result<(), Error>,
    {
        self.emit_indefinite_header(MajorType::ByteString)?;
        f(&mut ByteStream { encoder: self })?;
        self.emit_break()
    }

    pub fn emit_text_stream<F>(&mut self, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut TextStream<'_, 'b>) -> Result<(), Error>,
    {
        self.emit_indefinite_header(MajorType::TextString)?;
        f(&mut TextStream { encoder: self })?;
        self.emit_break()
    }

    fn emit_indefinite_header(&mut self, major_type: MajorType) -> Result<(), Error> {
        // Room for the header and the closing break
        self.reserve(2)?;
        let len = header::encode_indefinite_header(major_type, self.reserve(1)?)?;
        self.offset += len;
        Ok(())
    }

    fn emit_break(&mut self) -> Result<(), Error> {
        let len = header::encode_break(self.reserve(1)?)?;
        self.offset += len;
        Ok(())
    }
}

pub struct ByteStream<'e, 'b> {
    encoder: &'e mut Encoder<'b>,
}

impl ByteStream<'_, '_> {
    pub fn emit(&mut self, chunk: &[u8]) -> Result<(), Error> {
        self.encoder.emit_bytes(chunk).map(|_| ())
    }
}

pub struct TextStream<'e, 'b> {
    encoder: &'e mut Encoder<'b>,
}

impl TextStream<'_, '_> {
    pub fn emit(&mut self, chunk: &str) -> Result<(), Error> {
        self.encoder.emit_text(chunk).map(|_| ())
    }
}

pub struct Sequence<'e, 'b, const D: usize> {
    encoder: &'e mut Encoder<'b>,
    start: usize,
    count: Option<u64>,
    idx: u64,
}

pub type Array<'e, 'b> = Sequence<'e, 'b, 1>;
pub type Map<'e, 'b> = Sequence<'e, 'b, 2>;

impl<'e, 'b, const D: usize> Sequence<'e, 'b, D> {
    fn new(encoder: &'e mut Encoder<'b>, count: Option<u64>) -> Result<Self, Error> {
        let start = encoder.offset();
        let major_type = if D == 1 {
            MajorType::Array
        } else {
            MajorType::Map
        };
        let count = match count {
            Some(count) => {
                encoder.emit_uint_minor(major_type, count)?;
                Some(count.checked_mul(D as u64).ok_or(Error::Unsupported)?)
            }
            None => {
                encoder.emit_indefinite_header(major_type)?;
                None
            }
        };
        Ok(Self {
            encoder,
            start,
            count,
            idx: 0,
        })
    }

    /// The number of bytes written since the start of the sequence header.
    pub fn offset(&self) -> usize {
        self.encoder.offset() - self.start
    }

    fn next_field(&mut self) -> Result<&mut Encoder<'b>, Error> {
        self.idx += 1;
        match self.count {
            Some(count) if self.idx > count => Err(Error::LengthMismatch {
                expected: count,
                actual: self.idx,
            }),
            _ => Ok(&mut *self.encoder),
        }
    }

    fn end(self) -> Result<(), Error> {
        match self.count {
            None => self.encoder.emit_break(),
            Some(count) if self.idx != count => Err(Error::LengthMismatch {
                expected: count,
                actual: self.idx,
            }),
            Some(_) => Ok(()),
        }
    }

    pub fn emit(&mut self, value: &Descriptor) -> Result<(), Error> {
        self.next_field()?.emit(value)
    }

    pub fn emit_bytes(&mut self, value: &[u8]) -> Result<Range<usize>, Error> {
        self.next_field()?.emit_bytes(value)
    }

    pub fn emit_text(&mut self, value: &str) -> Result<Range<usize>, Error> {
        self.next_field()?.emit_text(value)
    }

    pub fn emit_array<F>(&mut self, count: Option<u64>, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Array<'_, 'b>) -> Result<(), Error>,
    {
        self.next_field()?.emit_array(count, f)
    }

    pub fn emit_map<F>(&mut self, count: Option<u64>, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Map<'_, 'b>) -> Result<(), Error>,
    {
        self.next_field()?.emit_map(count, f)
    }

    pub fn emit_byte_stream<F>(&mut self, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut ByteStream<'_, 'b>) -> Result<(), Error>,
    {
        self.next_field()?.emit_byte_stream(f)
    }

    pub fn emit_text_stream<F>(&mut self, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut TextStream<'_, 'b>) -> Result<(), Error>,
    {
        self.next_field()?.emit_text_stream(f)
    }
}

macro_rules! impl_int_descriptor {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Descriptor<'_> {
                fn from(value: $ty) -> Self {
                    Descriptor::Integer(value.into())
                }
            }
        )*
    };
}

impl_int_descriptor!(u8, u16, u32, i8, i16, i32, i64);

impl From<bool> for Descriptor<'_> {
    fn from(value: bool) -> Self {
        Descriptor::Simple(if value { Simple::True } else { Simple::False })
    }
}

impl From<f32> for Descriptor<'_> {
    fn from(value: f32) -> Self {
        Descriptor::Float(value)
    }
}

impl<'a> From<&'a str> for Descriptor<'a> {
    fn from(value: &'a str) -> Self {
        Descriptor::Text(value)
    }
}

impl<'a> From<&'a [u8]> for Descriptor<'a> {
    fn from(value: &'a [u8]) -> Self {
        Descriptor::Bytes(value)
    }
}

impl<'a> From<Value<'a>> for Descriptor<'a> {
    fn from(value: Value<'a>) -> Self {
        match value {
            Value::Integer(v) => Descriptor::Integer(v),
            Value::Bytes(b) => Descriptor::Bytes(b),
            Value::Text(s) => Descriptor::Text(s),
            Value::ByteStream(a) | Value::TextStream(a) | Value::Array(a) => Descriptor::Array(a),
            Value::Map(m) => Descriptor::Map(m),
            Value::Simple(s) => Descriptor::Simple(s),
            Value::Float(v) => Descriptor::Float(v),
        }
    }
}

#[cfg(test)]
mod test {
    #[test]
    fn test_slice_encode() {
        use super::*;
        use hex_literal::hex;

        let mut buf = [0u8; 8];
        let len = encode(
            &Descriptor::Values(&[1.into(), 2.into(), 3.into()]),
            &mut buf,
        )
        .unwrap();
        assert_eq!(buf[..len], hex!("83010203"));
    }
}
