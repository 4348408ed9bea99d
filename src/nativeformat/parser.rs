//! Cursor over a [`NativeReader`].

use crate::{
    file::io::NativeIO,
    nativeformat::{
        primitives::{
            decode_signed, decode_signed_long, decode_unsigned, decode_unsigned_long,
            skip_integer,
        },
        NativeReader,
    },
    Result,
};

/// A reader plus a read position.
///
/// Every `get_*` method decodes at the current position and advances it by the number of bytes
/// consumed. Parsers are single-owner; a routine that needs its own position derives a new
/// parser (see [`NativeParser::get_parser_from_relative_offset`]) or clones this one.
///
/// # Examples
///
/// ```rust
/// use aotscope::nativeformat::{NativeParser, NativeReader};
///
/// // unsigned 5, a skipped zero, then a delta of -2 back to position 0
/// let bytes = [0x0A, 0x00, 0xFC];
/// let mut parser = NativeParser::new(NativeReader::from_slice(&bytes, 0x1000), 0);
///
/// assert_eq!(parser.get_unsigned()?, 5);
/// parser.skip_integer()?;
/// let target = parser.get_parser_from_relative_offset()?;
/// assert_eq!(target.offset(), 0);
/// assert_eq!(target.address(), 0x1000);
/// # Ok::<(), aotscope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct NativeParser<'a> {
    reader: NativeReader<'a>,
    offset: u32,
}

impl<'a> NativeParser<'a> {
    /// Creates a parser over `reader` positioned at `offset`.
    #[must_use]
    pub fn new(reader: NativeReader<'a>, offset: u32) -> NativeParser<'a> {
        NativeParser { reader, offset }
    }

    /// The reader this parser walks.
    #[must_use]
    pub fn reader(&self) -> NativeReader<'a> {
        self.reader
    }

    /// Current position, relative to the reader base.
    #[must_use]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Moves the position to `offset`.
    pub fn seek(&mut self, offset: u32) {
        self.offset = offset;
    }

    /// Absolute address of the current position.
    #[must_use]
    pub fn address(&self) -> u64 {
        self.reader.address(self.offset)
    }

    /// Reads one raw byte.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfRange`] at the end of the reader.
    pub fn get_u8(&mut self) -> Result<u8> {
        let value = self.reader.read_u8(self.offset)?;
        self.offset += 1;
        Ok(value)
    }

    /// Reads one raw little-endian primitive.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfRange`] if the value extends past the reader.
    pub fn get_raw<T: NativeIO>(&mut self) -> Result<T> {
        let value = self.reader.read_raw::<T>(self.offset)?;
        self.offset += std::mem::size_of::<T>() as u32;
        Ok(value)
    }

    /// Reads one raw little-endian `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfRange`] if the value extends past the reader.
    pub fn get_u32(&mut self) -> Result<u32> {
        self.get_raw()
    }

    /// Decodes an unsigned varint.
    ///
    /// # Errors
    ///
    /// See [`crate::nativeformat::decode_unsigned`].
    pub fn get_unsigned(&mut self) -> Result<u32> {
        let (offset, value) = decode_unsigned(&self.reader, self.offset)?;
        self.offset = offset;
        Ok(value)
    }

    /// Decodes a signed varint.
    ///
    /// # Errors
    ///
    /// See [`crate::nativeformat::decode_signed`].
    pub fn get_signed(&mut self) -> Result<i32> {
        let (offset, value) = decode_signed(&self.reader, self.offset)?;
        self.offset = offset;
        Ok(value)
    }

    /// Decodes an unsigned 64-bit varint.
    ///
    /// # Errors
    ///
    /// See [`crate::nativeformat::decode_unsigned_long`].
    pub fn get_unsigned_long(&mut self) -> Result<u64> {
        let (offset, value) = decode_unsigned_long(&self.reader, self.offset)?;
        self.offset = offset;
        Ok(value)
    }

    /// Decodes a signed 64-bit varint.
    ///
    /// # Errors
    ///
    /// See [`crate::nativeformat::decode_signed_long`].
    pub fn get_signed_long(&mut self) -> Result<i64> {
        let (offset, value) = decode_signed_long(&self.reader, self.offset)?;
        self.offset = offset;
        Ok(value)
    }

    /// Steps over one varint of any width without decoding it.
    ///
    /// # Errors
    ///
    /// See [`crate::nativeformat::skip_integer`].
    pub fn skip_integer(&mut self) -> Result<()> {
        self.offset = skip_integer(&self.reader, self.offset)?;
        Ok(())
    }

    /// Decodes a signed delta and returns it added to the position the delta started at.
    ///
    /// The addition wraps in 32 bits; negative results surface as `OutOfRange` on the next
    /// read through the reader.
    ///
    /// # Errors
    ///
    /// See [`crate::nativeformat::decode_signed`].
    pub fn get_relative_offset(&mut self) -> Result<u32> {
        let position = self.offset;
        let delta = self.get_signed()?;
        Ok(position.wrapping_add(delta as u32))
    }

    /// Decodes a relative offset and returns a new parser over the same reader positioned at it.
    ///
    /// # Errors
    ///
    /// See [`crate::nativeformat::decode_signed`].
    pub fn get_parser_from_relative_offset(&mut self) -> Result<NativeParser<'a>> {
        let offset = self.get_relative_offset()?;
        Ok(NativeParser::new(self.reader, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{encode_signed, encode_unsigned};

    #[test]
    fn sequential_fields() {
        let mut bytes = Vec::new();
        bytes.push(0x42);
        bytes.extend(encode_unsigned(0x4000));
        bytes.extend(encode_signed(-8193));
        bytes.extend(0xDEAD_DFFDu32.to_le_bytes());
        bytes.extend([0x1F, 1, 0, 0, 0, 0, 0, 0, 0x80]);

        let mut parser = NativeParser::new(NativeReader::from_slice(&bytes, 0x2000), 0);
        assert_eq!(parser.get_u8().unwrap(), 0x42);
        assert_eq!(parser.get_unsigned().unwrap(), 0x4000);
        assert_eq!(parser.get_signed().unwrap(), -8193);
        assert_eq!(parser.get_u32().unwrap(), 0xDEAD_DFFD);
        assert_eq!(parser.get_signed_long().unwrap(), i64::MIN + 1);
        assert_eq!(parser.offset() as usize, bytes.len());
        assert!(parser.get_u8().is_err());
    }

    #[test]
    fn relative_offset_is_measured_from_delta_start() {
        let mut bytes = vec![0u8; 0x40];
        // delta +0x10 stored at 0x20
        bytes[0x20] = 0x20;
        // delta -0x20 stored at 0x21
        bytes[0x21] = encode_signed(-0x20)[0];

        let reader = NativeReader::from_slice(&bytes, 0x1000);
        let mut parser = NativeParser::new(reader, 0x20);
        assert_eq!(parser.get_relative_offset().unwrap(), 0x30);
        assert_eq!(parser.offset(), 0x21);

        let target = parser.get_parser_from_relative_offset().unwrap();
        assert_eq!(target.offset(), 0x01);
        assert_eq!(target.address(), 0x1001);
        assert_eq!(parser.offset(), 0x22);
    }

    #[test]
    fn relative_offset_before_start_wraps() {
        // delta -2 at offset 0
        let bytes = [0xFC, 0x00];
        let mut parser = NativeParser::new(NativeReader::from_slice(&bytes, 0), 0);
        let mut target = parser.get_parser_from_relative_offset().unwrap();
        assert_eq!(target.offset(), 0xFFFF_FFFE);
        assert!(target.get_u8().is_err());
    }

    #[test]
    fn derived_parsers_are_independent() {
        let bytes = [0x02, 0x04, 0x06];
        let mut parser = NativeParser::new(NativeReader::from_slice(&bytes, 0), 0);
        let mut copy = parser.clone();

        assert_eq!(copy.get_unsigned().unwrap(), 1);
        assert_eq!(copy.get_unsigned().unwrap(), 2);
        assert_eq!(parser.offset(), 0);
        assert_eq!(parser.get_unsigned().unwrap(), 1);
    }
}
