use super::decode::*;
use super::*;
use header::{BREAK, MajorType};

/// A lazily-parsed array (`D == 1`) or map (`D == 2`).
///
/// Only the header has been parsed: `data` runs from the first contained
/// byte to the end of the enclosing buffer, because where the sequence ends
/// is unknown until every item in it has been walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sequence<'a, const D: usize> {
    data: &'a [u8],
    count: Option<u64>,
}

pub type Array<'a> = Sequence<'a, 1>;
pub type Map<'a> = Sequence<'a, 2>;

impl<'a, const D: usize> Sequence<'a, D> {
    pub(super) fn new(data: &'a [u8], count: Option<u64>) -> Self {
        Self { data, count }
    }

    /// The declared number of entries (items, or key/value pairs), or `None`
    /// for an indefinite-length sequence.
    pub fn len(&self) -> Option<u64> {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == Some(0)
    }

    pub fn is_definite(&self) -> bool {
        self.count.is_some()
    }

    /// The bytes from the first contained item to the end of the parsed span.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// The most bytes the contents could occupy.
    pub fn max_size(&self) -> usize {
        self.data.len()
    }

    /// Walks the sequence without visiting anything, returning the offset
    /// just past its end, relative to [`data`](Self::data).
    pub fn skip(&self, max_recursion: usize) -> Result<usize, Error> {
        self.walk(max_recursion, |_| {})
    }

    fn parse_item(&self, offset: usize) -> Result<Item<'a>, Error> {
        match self.data.get(offset..).map(parse) {
            Some(Err(Error::EmptyBuffer)) | None => Err(Error::NotEnoughData),
            Some(r) => r,
        }
    }

    /// Visits every contained item in document order. Map keys and values
    /// are visited alternately.
    fn walk<F>(&self, max_recursion: usize, mut f: F) -> Result<usize, Error>
    where
        F: FnMut(&Item<'a>),
    {
        if max_recursion == 0 {
            return Err(Error::MaxRecursion);
        }
        let count = match self.count {
            Some(count) => Some(count.checked_mul(D as u64).ok_or(Error::NotEnoughData)?),
            None => None,
        };

        let mut offset = 0;
        let mut parsed = 0u64;
        loop {
            match count {
                Some(count) if parsed >= count => return Ok(offset),
                Some(_) => {}
                None => match self.data.get(offset) {
                    None => return Err(Error::NotEnoughData),
                    Some(&BREAK) if parsed % D as u64 != 0 => return Err(Error::PartialMap),
                    Some(&BREAK) => return Ok(offset + 1),
                    Some(_) => {}
                },
            }

            let item = self.parse_item(offset).inspect_err(|e| {
                debug!("Failed to parse item {parsed} at offset {offset}: {e}");
            })?;
            f(&item);
            offset += item.end(max_recursion - 1)?;
            parsed += 1;
        }
    }
}

/// Calls `f` for each item of `array` in order, returning the offset just
/// past the end of the array, relative to [`Sequence::data`].
///
/// Items that are themselves containers are passed to `f` unexpanded, and
/// then skipped. Traversal stops at the first item that fails to parse.
pub fn traverse_array<'a, F>(array: &Array<'a>, max_recursion: usize, f: F) -> Result<usize, Error>
where
    F: FnMut(&Item<'a>),
{
    array.walk(max_recursion, f)
}

/// Calls `f` for each key/value pair of `map` in order, returning the offset
/// just past the end of the map, relative to [`Sequence::data`].
pub fn traverse_map<'a, F>(map: &Map<'a>, max_recursion: usize, mut f: F) -> Result<usize, Error>
where
    F: FnMut(&Item<'a>, &Item<'a>),
{
    let mut key = None;
    map.walk(max_recursion, |item| match key.take() {
        None => key = Some(*item),
        Some(key) => f(&key, item),
    })
}

/// Calls `f` for each chunk of an indefinite-length string, returning the
/// offset just past the terminating break, relative to [`Sequence::data`].
///
/// Every chunk must be a definite-length string of `kind`.
pub fn traverse_indefinite_string<'a, F>(
    chunks: &Array<'a>,
    kind: StringKind,
    mut f: F,
) -> Result<usize, Error>
where
    F: FnMut(&Item<'a>),
{
    if chunks.is_definite() {
        return Err(Error::InvalidChunk);
    }
    let mut offset = 0;
    loop {
        match chunks.data.get(offset) {
            None => return Err(Error::NotEnoughData),
            Some(&BREAK) => return Ok(offset + 1),
            Some(b) if MajorType::from(*b) != kind.into() => return Err(Error::InvalidChunk),
            Some(_) => {}
        }

        let chunk = chunks.parse_item(offset)?;
        let Some(next) = chunk.next else {
            debug!("{} found as a chunk of a chunked string", chunk.value.type_name());
            return Err(Error::InvalidChunk);
        };
        f(&chunk);
        offset += next;
    }
}
