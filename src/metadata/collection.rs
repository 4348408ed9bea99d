//! Handle and primitive collections.
//!
//! A collection is stored inline in its owning record as a `count` varint followed by the
//! elements. The decoded value only remembers where the collection starts, so reaching element
//! `n` replays the walk from the start. That makes [`HandleCollection::get`] O(n), which is a
//! property of the wire format.

use std::{fmt, iter::FusedIterator, marker::PhantomData};

use crate::{
    metadata::{handle::DecodeHandle, primitives::MetadataPrimitive},
    nativeformat::{NativeParser, NativeReader},
    Result,
};

/// A collection of handles, each stored as one varint.
pub struct HandleCollection<'a, H> {
    reader: NativeReader<'a>,
    offset: u32,
    _marker: PhantomData<H>,
}

impl<'a, H: DecodeHandle> HandleCollection<'a, H> {
    /// Reads a collection at the parser position and steps the parser past it.
    ///
    /// Elements are only skipped here; they are decoded when the collection is iterated.
    ///
    /// # Errors
    ///
    /// Propagates varint errors from the count or any element.
    pub fn read(parser: &mut NativeParser<'a>) -> Result<Self> {
        let offset = parser.offset();
        let count = parser.get_unsigned()?;
        for _ in 0..count {
            parser.skip_integer()?;
        }

        Ok(HandleCollection {
            reader: parser.reader(),
            offset,
            _marker: PhantomData,
        })
    }

    /// Offset of the count varint
    #[must_use]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Number of elements.
    ///
    /// # Errors
    ///
    /// Propagates varint errors.
    pub fn count(&self) -> Result<u32> {
        NativeParser::new(self.reader, self.offset).get_unsigned()
    }

    /// True if the collection has no elements.
    ///
    /// # Errors
    ///
    /// Propagates varint errors.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.count()? == 0)
    }

    /// Lazily decodes the elements in stored order.
    ///
    /// # Errors
    ///
    /// Propagates varint errors from the count.
    pub fn iter(&self) -> Result<HandleCollectionIter<'a, H>> {
        let mut parser = NativeParser::new(self.reader, self.offset);
        let remaining = parser.get_unsigned()?;
        Ok(HandleCollectionIter {
            parser,
            remaining,
            _marker: PhantomData,
        })
    }

    /// Decodes element `index` by walking from the start, or `None` past the end.
    ///
    /// # Errors
    ///
    /// Propagates varint errors and handle validation errors of the element.
    pub fn get(&self, index: u32) -> Result<Option<H>> {
        let mut parser = NativeParser::new(self.reader, self.offset);
        let count = parser.get_unsigned()?;
        if index >= count {
            return Ok(None);
        }

        for _ in 0..index {
            parser.skip_integer()?;
        }
        H::decode(&mut parser).map(Some)
    }
}

impl<H> Clone for HandleCollection<'_, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H> Copy for HandleCollection<'_, H> {}

impl<H> fmt::Debug for HandleCollection<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandleCollection(0x{:x})", self.offset)
    }
}

/// Iterator over a [`HandleCollection`]. Stops after the first error.
pub struct HandleCollectionIter<'a, H> {
    parser: NativeParser<'a>,
    remaining: u32,
    _marker: PhantomData<H>,
}

impl<H: DecodeHandle> Iterator for HandleCollectionIter<'_, H> {
    type Item = Result<H>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        match H::decode(&mut self.parser) {
            Ok(handle) => {
                self.remaining -= 1;
                Some(Ok(handle))
            }
            Err(error) => {
                self.remaining = 0;
                Some(Err(error))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining as usize))
    }
}

impl<H: DecodeHandle> FusedIterator for HandleCollectionIter<'_, H> {}

/// A collection of fixed-width primitives.
pub struct PrimitiveCollection<'a, T> {
    reader: NativeReader<'a>,
    offset: u32,
    _marker: PhantomData<T>,
}

impl<'a, T: MetadataPrimitive> PrimitiveCollection<'a, T> {
    /// Reads a collection at the parser position and steps the parser past its elements.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfRange`] if the elements run past the reader.
    pub fn read(parser: &mut NativeParser<'a>) -> Result<Self> {
        let offset = parser.offset();
        let reader = parser.reader();
        let count = parser.get_unsigned()?;
        let data = parser.offset();

        let Some(length) = count.checked_mul(T::SIZE) else {
            return Err(out_of_range_error!(reader, data, u32::MAX));
        };
        let Some(end) = data.checked_add(length) else {
            return Err(out_of_range_error!(reader, data, length));
        };
        if length > 0 {
            reader.ensure_offset_in_range(data, length - 1)?;
        }
        parser.seek(end);

        Ok(PrimitiveCollection {
            reader,
            offset,
            _marker: PhantomData,
        })
    }

    /// Offset of the count varint
    #[must_use]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Number of elements.
    ///
    /// # Errors
    ///
    /// Propagates varint errors.
    pub fn count(&self) -> Result<u32> {
        NativeParser::new(self.reader, self.offset).get_unsigned()
    }

    /// True if the collection has no elements.
    ///
    /// # Errors
    ///
    /// Propagates varint errors.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.count()? == 0)
    }

    /// Lazily reads the elements in stored order.
    ///
    /// # Errors
    ///
    /// Propagates varint errors from the count.
    pub fn iter(&self) -> Result<PrimitiveCollectionIter<'a, T>> {
        let mut parser = NativeParser::new(self.reader, self.offset);
        let remaining = parser.get_unsigned()?;
        Ok(PrimitiveCollectionIter {
            parser,
            remaining,
            _marker: PhantomData,
        })
    }

    /// Reads element `index`, or `None` past the end.
    ///
    /// # Errors
    ///
    /// Propagates reader errors.
    pub fn get(&self, index: u32) -> Result<Option<T>> {
        let mut parser = NativeParser::new(self.reader, self.offset);
        let count = parser.get_unsigned()?;
        if index >= count {
            return Ok(None);
        }

        parser.seek(parser.offset() + index * T::SIZE);
        T::read_element(&mut parser).map(Some)
    }

    /// Collects every element.
    ///
    /// # Errors
    ///
    /// Propagates reader errors.
    pub fn to_vec(&self) -> Result<Vec<T>> {
        self.iter()?.collect()
    }
}

impl<T> Clone for PrimitiveCollection<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PrimitiveCollection<'_, T> {}

impl<T> fmt::Debug for PrimitiveCollection<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrimitiveCollection(0x{:x})", self.offset)
    }
}

/// Iterator over a [`PrimitiveCollection`]. Stops after the first error.
pub struct PrimitiveCollectionIter<'a, T> {
    parser: NativeParser<'a>,
    remaining: u32,
    _marker: PhantomData<T>,
}

impl<T: MetadataPrimitive> Iterator for PrimitiveCollectionIter<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        match T::read_element(&mut self.parser) {
            Ok(value) => {
                self.remaining -= 1;
                Some(Ok(value))
            }
            Err(error) => {
                self.remaining = 0;
                Some(Err(error))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining as usize))
    }
}

impl<T: MetadataPrimitive> FusedIterator for PrimitiveCollectionIter<'_, T> {}

/// Raw bytes, such as public keys and module version ids
pub type ByteCollection<'a> = PrimitiveCollection<'a, u8>;
