//! The NativeFormat variable-length integer codec.
//!
//! Integers are stored with their width encoded in the low bits of the first byte:
//!
//! | First byte    | Width | Value bits                                               |
//! |---------------|-------|----------------------------------------------------------|
//! | `xxxxxxx0`    | 1     | `b0 >> 1`                                                |
//! | `xxxxxx01`    | 2     | `(b0 >> 2) \| b1 << 6`                                   |
//! | `xxxxx011`    | 3     | `(b0 >> 3) \| b1 << 5 \| b2 << 13`                       |
//! | `xxxx0111`    | 4     | `(b0 >> 4) \| b1 << 4 \| b2 << 12 \| b3 << 20`           |
//! | `xxx01111`    | 5     | the following four bytes, little-endian                  |
//! | `xx011111`    | 9     | 64-bit forms only: the following eight bytes             |
//!
//! Signed values sign-extend only the most significant byte of each form. Every function takes
//! the offset to decode at and returns the offset just past the encoded value, so callers can
//! thread positions without shared mutable state.

use crate::{nativeformat::NativeReader, Error::MalformedEncoding, Result};

fn malformed(reader: &NativeReader, offset: u32, tag: u8) -> crate::Error {
    MalformedEncoding {
        address: reader.address(offset),
        tag,
    }
}

/// Decodes an unsigned varint at `offset`, returning `(new_offset, value)`.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfRange`] if the encoding runs past the reader, or
/// [`crate::Error::MalformedEncoding`] if the tag byte has its low five bits set.
pub fn decode_unsigned(reader: &NativeReader, offset: u32) -> Result<(u32, u32)> {
    let b = u32::from(reader.read_u8(offset)?);
    let byte = |i: u32| -> Result<u32> { Ok(u32::from(reader.read_u8(offset.wrapping_add(i))?)) };

    if b & 1 == 0 {
        Ok((offset + 1, b >> 1))
    } else if b & 2 == 0 {
        Ok((offset + 2, (b >> 2) | (byte(1)? << 6)))
    } else if b & 4 == 0 {
        Ok((offset + 3, (b >> 3) | (byte(1)? << 5) | (byte(2)? << 13)))
    } else if b & 8 == 0 {
        let value = (b >> 4) | (byte(1)? << 4) | (byte(2)? << 12) | (byte(3)? << 20);
        Ok((offset + 4, value))
    } else if b & 16 == 0 {
        Ok((offset + 5, reader.read_u32(offset.wrapping_add(1))?))
    } else {
        Err(malformed(reader, offset, b as u8))
    }
}

/// Decodes a signed varint at `offset`, returning `(new_offset, value)`.
///
/// The first byte always contributes its bits unsigned; only the last byte of the 2, 3 and 4
/// byte forms is sign-extended. The 1-byte form shifts the byte arithmetically and the 5-byte
/// form is a raw `i32`.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfRange`] if the encoding runs past the reader, or
/// [`crate::Error::MalformedEncoding`] if the tag byte has its low five bits set.
pub fn decode_signed(reader: &NativeReader, offset: u32) -> Result<(u32, i32)> {
    let tag = reader.read_u8(offset)?;
    let b = i32::from(tag);
    let unsigned = |i: u32| -> Result<i32> { Ok(i32::from(reader.read_u8(offset.wrapping_add(i))?)) };
    let signed =
        |i: u32| -> Result<i32> { Ok(i32::from(reader.read_u8(offset.wrapping_add(i))? as i8)) };

    if b & 1 == 0 {
        Ok((offset + 1, i32::from(tag as i8) >> 1))
    } else if b & 2 == 0 {
        Ok((offset + 2, (b >> 2) | (signed(1)? << 6)))
    } else if b & 4 == 0 {
        Ok((offset + 3, (b >> 3) | (unsigned(1)? << 5) | (signed(2)? << 13)))
    } else if b & 8 == 0 {
        let value = (b >> 4) | (unsigned(1)? << 4) | (unsigned(2)? << 12) | (signed(3)? << 20);
        Ok((offset + 4, value))
    } else if b & 16 == 0 {
        Ok((offset + 5, reader.read_u32(offset.wrapping_add(1))? as i32))
    } else {
        Err(malformed(reader, offset, tag))
    }
}

/// Decodes an unsigned 64-bit varint at `offset`, returning `(new_offset, value)`.
///
/// Tags whose low five bits are not all set defer to [`decode_unsigned`]. A tag of the form
/// `xx011111` is followed by a raw little-endian `u64`.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfRange`] if the encoding runs past the reader, or
/// [`crate::Error::MalformedEncoding`] for the reserved `xx111111` tag.
pub fn decode_unsigned_long(reader: &NativeReader, offset: u32) -> Result<(u32, u64)> {
    let tag = reader.read_u8(offset)?;
    if tag & 31 != 31 {
        let (next, value) = decode_unsigned(reader, offset)?;
        Ok((next, u64::from(value)))
    } else if tag & 32 == 0 {
        Ok((offset + 9, reader.read_u64(offset.wrapping_add(1))?))
    } else {
        Err(malformed(reader, offset, tag))
    }
}

/// Decodes a signed 64-bit varint at `offset`, returning `(new_offset, value)`.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfRange`] if the encoding runs past the reader, or
/// [`crate::Error::MalformedEncoding`] for the reserved `xx111111` tag.
pub fn decode_signed_long(reader: &NativeReader, offset: u32) -> Result<(u32, i64)> {
    let tag = reader.read_u8(offset)?;
    if tag & 31 != 31 {
        let (next, value) = decode_signed(reader, offset)?;
        Ok((next, i64::from(value)))
    } else if tag & 32 == 0 {
        Ok((offset + 9, reader.read_u64(offset.wrapping_add(1))? as i64))
    } else {
        Err(malformed(reader, offset, tag))
    }
}

/// Returns the offset just past the varint at `offset`, looking only at the tag byte.
///
/// Accepts the 9-byte 64-bit form as well, so it can step over any field regardless of width.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfRange`] if the tag byte is outside the reader, or
/// [`crate::Error::MalformedEncoding`] for the reserved `xx111111` tag.
pub fn skip_integer(reader: &NativeReader, offset: u32) -> Result<u32> {
    let tag = reader.read_u8(offset)?;

    let width = if tag & 1 == 0 {
        1
    } else if tag & 2 == 0 {
        2
    } else if tag & 4 == 0 {
        3
    } else if tag & 8 == 0 {
        4
    } else if tag & 16 == 0 {
        5
    } else if tag & 32 == 0 {
        9
    } else {
        return Err(malformed(reader, offset, tag));
    };

    Ok(offset.wrapping_add(width))
}
