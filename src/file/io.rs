//! Little-endian primitive reading and writing over byte buffers.
//!
//! Every multi-byte quantity in a NativeAOT module is stored little-endian: section table rows,
//! raw `u32` fields inside the native format, relative pointers and the fixed-stride elements
//! of metadata primitive collections. This module provides the bounds-checked helpers used for
//! all of them.
//!
//! # Key Components
//!
//! - [`crate::file::io::NativeIO`] - Trait implemented by every primitive that can be read raw
//! - [`crate::file::io::read_le`] - Read a value from the start of a buffer
//! - [`crate::file::io::read_le_at`] - Read a value at an offset and advance the offset
//! - [`crate::file::io::write_le_at`] - Write a value at an offset and advance the offset
//!
//! # Examples
//!
//! ```rust,ignore
//! use aotscope::file::io::{read_le_at, write_le_at};
//!
//! let mut buffer = [0u8; 8];
//! let mut offset = 0;
//! write_le_at(&mut buffer, &mut offset, 0xDEAD_DFFDu32)?;
//! write_le_at(&mut buffer, &mut offset, -1i32)?;
//!
//! let mut offset = 0;
//! assert_eq!(read_le_at::<u32>(&buffer, &mut offset)?, 0xDEAD_DFFD);
//! assert_eq!(read_le_at::<i32>(&buffer, &mut offset)?, -1);
//! # Ok::<(), aotscope::Error>(())
//! ```

use crate::{Error::OutOfBounds, Result};

/// Trait for primitives that have a fixed-size little-endian representation.
///
/// The `Bytes` associated type is the exact byte array for the primitive, which lets the
/// generic helpers below convert slices without any intermediate allocation.
pub trait NativeIO: Sized + Copy {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_native_io {
    ($($ty:ty),*) => {
        $(
            impl NativeIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_native_io!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Safely reads a value of type `T` in little-endian byte order from the start of a buffer.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if the buffer is shorter than `T`.
pub fn read_le<T: NativeIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a value of type `T` in little-endian byte order at `offset`, then advances
/// `offset` past the value.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if fewer than `size_of::<T>()` bytes remain.
pub fn read_le_at<T: NativeIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };

    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}

/// Safely writes `value` in little-endian byte order at `offset`, then advances `offset`
/// past the written bytes.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if the buffer cannot hold the value at `offset`.
pub fn write_le_at<T: NativeIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let bytes = value.to_le_bytes();
    let bytes = bytes.as_ref();

    let Some(end) = offset.checked_add(bytes.len()) else {
        return Err(OutOfBounds);
    };

    if end > data.len() {
        return Err(OutOfBounds);
    }

    data[*offset..end].copy_from_slice(bytes);
    *offset = end;

    Ok(())
}
