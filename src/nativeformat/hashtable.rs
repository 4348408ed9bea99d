//! Reader for the NativeFormat perfect hashtable.
//!
//! # Layout
//!
//! ```text
//! [header: u8][bucket index: (mask + 2) × {1,2,4} bytes][entries ...]
//!             ^ base offset
//! ```
//!
//! The header byte stores the bucket count as `1 << (h >> 2)` and the width of a bucket index
//! entry as `h & 3` (0, 1 or 2 meaning 1, 2 or 4 bytes). Bucket `i` spans the entry bytes from
//! `index[i]` to `index[i + 1]`, both relative to the base offset. Every entry is a key byte (the
//! low byte of the element's hashcode) followed by a signed relative offset to the element.
//! Entries within a bucket are sorted by key byte, which lets a lookup stop at the first larger
//! key.
//!
//! # Examples
//!
//! ```rust
//! use aotscope::nativeformat::{NativeHashtable, NativeParser, NativeReader};
//!
//! // one bucket, 1-byte index, one entry with key 0x34 pointing at the byte after it
//! let bytes = [0x00, 0x02, 0x04, 0x34, 0x02, 0x2A];
//! let reader = NativeReader::from_slice(&bytes, 0x1000);
//! let table = NativeHashtable::new(NativeParser::new(reader, 0))?;
//!
//! let mut matches = table.lookup(0x1234)?;
//! let mut element = matches.next().unwrap()?;
//! assert_eq!(element.get_unsigned()?, 21);
//! assert!(matches.next().is_none());
//! # Ok::<(), aotscope::Error>(())
//! ```

use crate::{
    nativeformat::{NativeParser, NativeReader},
    Result,
};

/// A perfect hashtable rooted at a header byte inside a [`NativeReader`].
#[derive(Debug, Clone, Copy)]
pub struct NativeHashtable<'a> {
    reader: NativeReader<'a>,
    base_offset: u32,
    bucket_mask: u32,
    entry_index_size: u8,
}

impl<'a> NativeHashtable<'a> {
    /// Reads the table header at the parser's position.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BadFormat`] if the bucket shift exceeds 31 or the entry index
    /// size is the reserved value 3, and [`crate::Error::OutOfRange`] if the header byte is
    /// outside the reader.
    pub fn new(mut parser: NativeParser<'a>) -> Result<NativeHashtable<'a>> {
        let header = parser.get_u8()?;

        let buckets_shift = u32::from(header >> 2);
        if buckets_shift > 31 {
            return Err(bad_format_error!(
                "Hashtable at 0x{:x} has bucket shift {}",
                parser.address(),
                buckets_shift
            ));
        }

        let entry_index_size = header & 3;
        if entry_index_size > 2 {
            return Err(bad_format_error!(
                "Hashtable at 0x{:x} has invalid entry index size {} (header 0x{:02x})",
                parser.address(),
                entry_index_size,
                header
            ));
        }

        Ok(NativeHashtable {
            reader: parser.reader(),
            base_offset: parser.offset(),
            bucket_mask: ((1u64 << buckets_shift) - 1) as u32,
            entry_index_size,
        })
    }

    /// `bucket_count - 1`
    #[must_use]
    pub fn bucket_mask(&self) -> u32 {
        self.bucket_mask
    }

    /// Width in bytes of one bucket index entry
    #[must_use]
    pub fn entry_index_width(&self) -> u32 {
        1 << self.entry_index_size
    }

    /// Offset of the bucket index, just past the header byte
    #[must_use]
    pub fn base_offset(&self) -> u32 {
        self.base_offset
    }

    /// The reader the table lives in
    #[must_use]
    pub fn reader(&self) -> NativeReader<'a> {
        self.reader
    }

    fn read_entry_index(&self, offset: u32) -> Result<u32> {
        match self.entry_index_size {
            0 => Ok(u32::from(self.reader.read_u8(offset)?)),
            1 => Ok(u32::from(self.reader.read_u16(offset)?)),
            _ => self.reader.read_u32(offset),
        }
    }

    /// Returns a parser at the first entry of `bucket` and the offset just past its last entry.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfRange`] if the bucket index is outside the reader.
    pub fn bucket_range(&self, bucket: u32) -> Result<(NativeParser<'a>, u32)> {
        let width = self.entry_index_width();
        let bucket_offset = self
            .base_offset
            .wrapping_add(bucket.wrapping_mul(width));

        let start = self.read_entry_index(bucket_offset)?;
        let end = self.read_entry_index(bucket_offset.wrapping_add(width))?;

        Ok((
            NativeParser::new(self.reader, self.base_offset.wrapping_add(start)),
            self.base_offset.wrapping_add(end),
        ))
    }

    /// Returns the elements whose hashcode selects the same bucket and shares the low byte.
    ///
    /// Several elements may match one hashcode; callers compare the decoded element to pick
    /// the one they want.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfRange`] if the bucket index is outside the reader.
    pub fn lookup(&self, hashcode: u32) -> Result<Lookup<'a>> {
        let bucket = (hashcode >> 8) & self.bucket_mask;
        let (parser, end_offset) = self.bucket_range(bucket)?;

        Ok(Lookup {
            parser,
            end_offset,
            low_hashcode: hashcode as u8,
            done: false,
        })
    }

    /// Enumerates every element of the table, bucket by bucket, in stored order.
    #[must_use]
    pub fn all_entries(&self) -> AllEntries<'a> {
        AllEntries {
            table: *self,
            bucket: 0,
            current: None,
            done: false,
        }
    }
}

/// Iterator over the elements matching one hashcode, see [`NativeHashtable::lookup`].
///
/// Yields a parser positioned at each matching element. Stops at the end of the bucket or at
/// the first entry whose key byte is larger than the one searched for. An error ends the
/// iteration.
#[derive(Debug, Clone)]
pub struct Lookup<'a> {
    parser: NativeParser<'a>,
    end_offset: u32,
    low_hashcode: u8,
    done: bool,
}

impl<'a> Lookup<'a> {
    fn advance(&mut self) -> Result<Option<NativeParser<'a>>> {
        while self.parser.offset() < self.end_offset {
            let key = self.parser.get_u8()?;

            if key == self.low_hashcode {
                return self.parser.get_parser_from_relative_offset().map(Some);
            }

            if key > self.low_hashcode {
                return Ok(None);
            }

            self.parser.skip_integer()?;
        }

        Ok(None)
    }
}

impl<'a> Iterator for Lookup<'a> {
    type Item = Result<NativeParser<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.advance() {
            Ok(Some(parser)) => Some(Ok(parser)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(error) => {
                self.done = true;
                Some(Err(error))
            }
        }
    }
}

impl std::iter::FusedIterator for Lookup<'_> {}

/// Single-pass walk over every element of a table, see [`NativeHashtable::all_entries`].
///
/// All position state lives in the iterator; creating a second one starts over from bucket 0.
#[derive(Debug, Clone)]
pub struct AllEntries<'a> {
    table: NativeHashtable<'a>,
    bucket: u32,
    current: Option<(NativeParser<'a>, u32)>,
    done: bool,
}

impl<'a> AllEntries<'a> {
    fn advance(&mut self) -> Result<Option<NativeParser<'a>>> {
        loop {
            let (mut parser, end_offset) = match self.current.take() {
                Some(current) => current,
                None => self.table.bucket_range(self.bucket)?,
            };

            if parser.offset() < end_offset {
                // key byte
                parser.get_u8()?;
                let element = parser.get_parser_from_relative_offset()?;
                self.current = Some((parser, end_offset));
                return Ok(Some(element));
            }

            if self.bucket >= self.table.bucket_mask {
                return Ok(None);
            }

            self.bucket += 1;
        }
    }
}

impl<'a> Iterator for AllEntries<'a> {
    type Item = Result<NativeParser<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.advance() {
            Ok(Some(parser)) => Some(Ok(parser)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(error) => {
                self.done = true;
                Some(Err(error))
            }
        }
    }
}

impl std::iter::FusedIterator for AllEntries<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test::HashtableBuilder, Error};

    fn table(bytes: &[u8]) -> NativeHashtable<'_> {
        NativeHashtable::new(NativeParser::new(NativeReader::from_slice(bytes, 0x8000), 0))
            .unwrap()
    }

    fn ids<'a>(iter: impl Iterator<Item = Result<NativeParser<'a>>>) -> Vec<u32> {
        iter.map(|parser| parser.unwrap().get_unsigned().unwrap())
            .collect()
    }

    #[test]
    fn header_decoding() {
        let bytes = [(4 << 2) | 1, 0, 0];
        let table = table(&bytes);
        assert_eq!(table.bucket_mask(), 15);
        assert_eq!(table.entry_index_width(), 2);
        assert_eq!(table.base_offset(), 1);

        let bytes = [(31 << 2) | 2];
        let table = NativeHashtable::new(NativeParser::new(
            NativeReader::from_slice(&bytes, 0),
            0,
        ))
        .unwrap();
        assert_eq!(table.bucket_mask(), 0x7FFF_FFFF);
        assert_eq!(table.entry_index_width(), 4);
    }

    #[test]
    fn invalid_headers() {
        for header in [0x03u8, (32 << 2), 0xFF] {
            let bytes = [header, 0, 0, 0, 0, 0, 0, 0, 0];
            let result =
                NativeHashtable::new(NativeParser::new(NativeReader::from_slice(&bytes, 0), 0));
            assert!(matches!(result, Err(Error::BadFormat { .. })), "{header:#x}");
        }
    }

    #[test]
    fn bucket_range_is_relative_to_base() {
        let bytes = HashtableBuilder::new(1, 1)
            .entry(0x0010, 1)
            .entry(0x0020, 2)
            .entry(0x0110, 3)
            .build();
        let table = table(&bytes);

        let (parser, end) = table.bucket_range(0).unwrap();
        // header + 3 two-byte index entries
        assert_eq!(parser.offset(), 7);
        assert_eq!(end, 7 + 2 * 6);

        let (parser, end) = table.bucket_range(1).unwrap();
        assert_eq!(parser.offset(), 7 + 2 * 6);
        assert_eq!(end, 7 + 3 * 6);
    }

    #[test]
    fn lookup_matches_bucket_and_low_byte() {
        let entries = [
            (0x0000_0011u32, 1u32),
            (0x0000_0122, 2),
            (0x0000_0222, 3),
            (0x0000_0311, 4),
            (0x0000_0033, 5),
            (0x0000_0433, 6),
        ];
        for size in 0..3 {
            let mut builder = HashtableBuilder::new(2, size);
            for (hash, id) in entries {
                builder = builder.entry(hash, id);
            }
            let bytes = builder.build();
            let table = table(&bytes);

            for (hash, id) in entries {
                let found = ids(table.lookup(hash).unwrap());
                let expected: Vec<u32> = entries
                    .iter()
                    .filter(|(other, _)| {
                        other & 0xFF == hash & 0xFF && (other >> 8) & 3 == (hash >> 8) & 3
                    })
                    .map(|(_, id)| *id)
                    .collect();
                assert_eq!(found, expected, "hash {hash:#x}");
                assert!(found.contains(&id));
            }

            assert!(ids(table.lookup(0x0000_0012).unwrap()).is_empty());
            assert!(ids(table.lookup(0x0000_01FF).unwrap()).is_empty());
        }
    }

    #[test]
    fn lookup_returns_every_duplicate() {
        let bytes = HashtableBuilder::new(0, 0)
            .entry(0x42, 7)
            .entry(0x42, 8)
            .entry(0x43, 9)
            .build();
        let table = table(&bytes);

        assert_eq!(ids(table.lookup(0x42).unwrap()), [7, 8]);
        assert_eq!(ids(table.lookup(0x43).unwrap()), [9]);
    }

    #[test]
    fn lookup_stops_at_larger_key() {
        // stored unsorted: 0x50 precedes 0x10, so 0x10 is unreachable
        let bytes = HashtableBuilder::new(0, 0)
            .entry(0x05, 1)
            .entry(0x50, 2)
            .entry(0x10, 3)
            .unsorted()
            .build();
        let table = table(&bytes);

        assert_eq!(ids(table.lookup(0x05).unwrap()), [1]);
        assert_eq!(ids(table.lookup(0x50).unwrap()), [2]);
        assert!(ids(table.lookup(0x10).unwrap()).is_empty());
    }

    #[test]
    fn lookup_does_not_wrap_into_next_bucket() {
        let bytes = HashtableBuilder::new(1, 0)
            .entry(0x0001, 1)
            .entry(0x0102, 2)
            .build();
        let table = table(&bytes);

        assert!(ids(table.lookup(0x0002).unwrap()).is_empty());
        assert_eq!(ids(table.lookup(0x0102).unwrap()), [2]);
    }

    #[test]
    fn all_entries_in_bucket_order() {
        let bytes = HashtableBuilder::new(2, 1)
            .entry(0x0300, 30)
            .entry(0x0001, 1)
            .entry(0x0200, 20)
            .entry(0x0000, 0)
            .entry(0x0302, 32)
            .build();
        let table = table(&bytes);

        assert_eq!(ids(table.all_entries()), [0, 1, 20, 30, 32]);

        let mut entries = table.all_entries();
        assert_eq!(entries.by_ref().count(), 5);
        assert!(entries.next().is_none());
    }

    #[test]
    fn all_entries_empty_table() {
        let bytes = HashtableBuilder::new(3, 2).build();
        let table = table(&bytes);
        assert_eq!(table.all_entries().count(), 0);
    }

    #[test]
    fn all_entries_fuses_after_error() {
        // two buckets claimed but the index is truncated after the first range
        let bytes = [(1 << 2), 0, 0];
        let table = table(&bytes);

        let mut entries = table.all_entries();
        assert!(matches!(entries.next(), Some(Err(Error::OutOfRange { .. }))));
        assert!(entries.next().is_none());
    }

    #[test]
    fn lookup_truncated_index_fails() {
        let bytes = [(1 << 2) | 2, 0, 0];
        let table = table(&bytes);
        assert!(table.lookup(0).is_err());
    }
}
