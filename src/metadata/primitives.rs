//! Primitive field and element decoding.
//!
//! A primitive stored directly in a record goes through the varint codec (or a raw byte for
//! the one-byte types). The same primitive stored in a [`crate::metadata::PrimitiveCollection`]
//! is a raw little-endian element at a fixed stride of [`MetadataPrimitive::SIZE`] bytes.

use crate::{nativeformat::NativeParser, Result};

/// A primitive value that can appear in a metadata record or primitive collection.
pub trait MetadataPrimitive: Copy + Sized {
    /// Width of one element inside a primitive collection
    const SIZE: u32;

    /// Reads the value as a record field.
    ///
    /// # Errors
    ///
    /// Propagates reader and varint errors.
    fn read_field(parser: &mut NativeParser<'_>) -> Result<Self>;

    /// Reads the value as a collection element of [`MetadataPrimitive::SIZE`] bytes.
    ///
    /// # Errors
    ///
    /// Propagates reader errors.
    fn read_element(parser: &mut NativeParser<'_>) -> Result<Self>;
}

macro_rules! raw_primitive {
    ($($ty:ty => |$parser:ident| $field:expr),* $(,)?) => {
        $(
            impl MetadataPrimitive for $ty {
                const SIZE: u32 = std::mem::size_of::<$ty>() as u32;

                fn read_field($parser: &mut NativeParser<'_>) -> Result<Self> {
                    $field
                }

                fn read_element(parser: &mut NativeParser<'_>) -> Result<Self> {
                    parser.get_raw::<$ty>()
                }
            }
        )*
    };
}

raw_primitive! {
    u8 => |parser| parser.get_u8(),
    i8 => |parser| parser.get_raw::<i8>(),
    i16 => |parser| Ok(parser.get_signed()? as i16),
    u16 => |parser| Ok(parser.get_unsigned()? as u16),
    i32 => |parser| parser.get_signed(),
    u32 => |parser| parser.get_unsigned(),
    i64 => |parser| parser.get_signed_long(),
    u64 => |parser| parser.get_unsigned_long(),
    f32 => |parser| parser.get_raw::<f32>(),
    f64 => |parser| parser.get_raw::<f64>(),
}

impl MetadataPrimitive for bool {
    const SIZE: u32 = 1;

    fn read_field(parser: &mut NativeParser<'_>) -> Result<Self> {
        Ok(parser.get_u8()? != 0)
    }

    fn read_element(parser: &mut NativeParser<'_>) -> Result<Self> {
        Self::read_field(parser)
    }
}

/// UTF-16 code units. Lone surrogates decode to U+FFFD.
impl MetadataPrimitive for char {
    const SIZE: u32 = 2;

    fn read_field(parser: &mut NativeParser<'_>) -> Result<Self> {
        Ok(utf16_unit(parser.get_unsigned()? as u16))
    }

    fn read_element(parser: &mut NativeParser<'_>) -> Result<Self> {
        Ok(utf16_unit(parser.get_raw::<u16>()?))
    }
}

fn utf16_unit(unit: u16) -> char {
    char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// Reads a length-prefixed UTF-8 string. Invalid sequences are replaced, never rejected.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfRange`] if the declared length runs past the reader.
pub fn read_string(parser: &mut NativeParser<'_>) -> Result<String> {
    let length = parser.get_unsigned()?;
    let start = parser.offset();
    let reader = parser.reader();

    let Some(end) = start.checked_add(length) else {
        return Err(out_of_range_error!(reader, start, length));
    };
    if length > 0 {
        reader.ensure_offset_in_range(start, length - 1)?;
    }

    let bytes = &reader.data()[start as usize..end as usize];
    parser.seek(end);
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        nativeformat::NativeReader,
        test::{encode_signed, encode_unsigned},
    };

    #[test]
    fn fields_use_the_varint_codec() {
        let mut bytes = vec![0x01, 0xFF];
        bytes.extend(encode_signed(-300));
        bytes.extend(encode_unsigned(0xFFFF));
        bytes.extend(encode_unsigned(0x41));

        let mut parser = NativeParser::new(NativeReader::from_slice(&bytes, 0), 0);
        assert!(bool::read_field(&mut parser).unwrap());
        assert_eq!(i8::read_field(&mut parser).unwrap(), -1);
        assert_eq!(i16::read_field(&mut parser).unwrap(), -300);
        assert_eq!(u16::read_field(&mut parser).unwrap(), 0xFFFF);
        assert_eq!(char::read_field(&mut parser).unwrap(), 'A');
        assert_eq!(parser.offset() as usize, bytes.len());
    }

    #[test]
    fn elements_are_raw_at_fixed_stride() {
        let mut bytes = Vec::new();
        bytes.extend(0x1234u16.to_le_bytes());
        bytes.extend((-2i32).to_le_bytes());
        bytes.extend(0x0042u16.to_le_bytes());
        bytes.extend(0xD800u16.to_le_bytes());

        let mut parser = NativeParser::new(NativeReader::from_slice(&bytes, 0), 0);
        assert_eq!(u16::read_element(&mut parser).unwrap(), 0x1234);
        assert_eq!(i32::read_element(&mut parser).unwrap(), -2);
        assert_eq!(char::read_element(&mut parser).unwrap(), 'B');
        assert_eq!(
            char::read_element(&mut parser).unwrap(),
            char::REPLACEMENT_CHARACTER
        );
        assert_eq!(parser.offset(), 10);
    }

    #[test]
    fn strings() {
        let mut bytes = encode_unsigned(5);
        bytes.extend_from_slice(b"Hello");
        bytes.extend(encode_unsigned(2));
        bytes.extend_from_slice(&[0xC3, 0x28]);
        bytes.push(0);

        let mut parser = NativeParser::new(NativeReader::from_slice(&bytes, 0), 0);
        assert_eq!(read_string(&mut parser).unwrap(), "Hello");
        assert_eq!(read_string(&mut parser).unwrap(), "\u{FFFD}(");
        assert_eq!(read_string(&mut parser).unwrap(), "");
        assert_eq!(parser.offset() as usize, bytes.len());
    }

    #[test]
    fn truncated_string() {
        let mut bytes = encode_unsigned(10);
        bytes.extend_from_slice(b"abc");

        let mut parser = NativeParser::new(NativeReader::from_slice(&bytes, 0), 0);
        assert!(read_string(&mut parser).is_err());
    }
}
