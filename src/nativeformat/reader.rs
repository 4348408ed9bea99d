//! Bounds-checked byte-range view over the image.

use crate::{
    file::io::{read_le, NativeIO},
    Image, Result,
};

/// An immutable view of `size` bytes of the image starting at `base`.
///
/// All multi-byte reads are little-endian and checked against the declared size, including the
/// trailing bytes a multi-byte value needs. Many readers may alias the same bytes with
/// different bases; copying a reader is free.
///
/// # Examples
///
/// ```rust
/// use aotscope::nativeformat::NativeReader;
///
/// let bytes = [0x52, 0x54, 0x52, 0x00, 0xFF];
/// let reader = NativeReader::from_slice(&bytes, 0x1000);
///
/// assert_eq!(reader.read_u32(0)?, 0x0052_5452);
/// assert!(reader.read_u32(2).is_err());
/// assert_eq!(reader.address(4), 0x1004);
/// # Ok::<(), aotscope::Error>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct NativeReader<'a> {
    data: &'a [u8],
    base: u64,
}

impl<'a> NativeReader<'a> {
    /// Creates a reader over `size` bytes of `image` starting at `base`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unmapped`] if the range is not backed by a single region.
    pub fn new(image: &'a Image, base: u64, size: u32) -> Result<NativeReader<'a>> {
        let data = image.read_bytes(base, size as usize)?;
        Ok(NativeReader { data, base })
    }

    /// Creates a reader directly over `data`, pretending it lives at `base`.
    ///
    /// Inputs larger than 4 GiB are truncated to the addressable `u32` range.
    #[must_use]
    pub fn from_slice(data: &'a [u8], base: u64) -> NativeReader<'a> {
        let len = data.len().min(u32::MAX as usize);
        NativeReader {
            data: &data[..len],
            base,
        }
    }

    /// Absolute address of offset zero
    #[must_use]
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Declared size in bytes
    #[must_use]
    pub fn size(&self) -> u32 {
        // from_slice and new both cap the length to u32
        self.data.len() as u32
    }

    /// Absolute address of `offset`
    #[must_use]
    pub fn address(&self, offset: u32) -> u64 {
        self.base.wrapping_add(u64::from(offset))
    }

    /// The underlying bytes
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Fails unless `offset` through `offset + look_ahead` lie within the reader.
    ///
    /// Offsets that are negative when interpreted as `i32` are always rejected, which catches
    /// relative jumps that went backwards past the start.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfRange`] on violation.
    pub fn ensure_offset_in_range(&self, offset: u32, look_ahead: u32) -> Result<()> {
        if (offset as i32) < 0 || u64::from(offset) + u64::from(look_ahead) >= u64::from(self.size())
        {
            return Err(out_of_range_error!(self, offset, look_ahead));
        }

        Ok(())
    }

    fn read<T: NativeIO>(&self, offset: u32) -> Result<T> {
        let len = std::mem::size_of::<T>();
        self.ensure_offset_in_range(offset, len as u32 - 1)?;

        let start = offset as usize;
        read_le(&self.data[start..start + len])
    }

    /// Reads a byte at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfRange`] if the byte is outside the reader.
    pub fn read_u8(&self, offset: u32) -> Result<u8> {
        self.read(offset)
    }

    /// Reads a little-endian `u16` at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfRange`] if the value is outside the reader.
    pub fn read_u16(&self, offset: u32) -> Result<u16> {
        self.read(offset)
    }

    /// Reads a little-endian `u32` at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfRange`] if the value is outside the reader.
    pub fn read_u32(&self, offset: u32) -> Result<u32> {
        self.read(offset)
    }

    /// Reads a little-endian `u64` at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfRange`] if the value is outside the reader.
    pub fn read_u64(&self, offset: u32) -> Result<u64> {
        self.read(offset)
    }

    /// Reads a raw little-endian primitive of any [`NativeIO`] type at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfRange`] if the value is outside the reader.
    pub fn read_raw<T: NativeIO>(&self, offset: u32) -> Result<T> {
        self.read(offset)
    }
}
