use thiserror::Error;

use crate::metadata::handle::HandleType;

macro_rules! bad_format_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::BadFormat {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::BadFormat {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! corrupt_patch_error {
    ($address:expr, $fmt:expr) => {
        crate::Error::CorruptPatchStream {
            address: $address,
            message: $fmt.to_string(),
        }
    };

    ($address:expr, $fmt:expr, $($arg:tt)*) => {
        crate::Error::CorruptPatchStream {
            address: $address,
            message: format!($fmt, $($arg)*),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every decoder in this crate is deterministic and works on already-resident memory, so none
/// of these errors is retried internally. A failure aborts the current top-level operation
/// (decoding a record, walking a hashtable, rehydrating a section) without touching state that
/// belongs to unrelated operations.
///
/// # Error Categories
///
/// ## Decoding Errors
/// - [`Error::OutOfRange`] - A read exceeded the declared size of a [`crate::nativeformat::NativeReader`]
/// - [`Error::Unmapped`] - An absolute address is not backed by any region of the [`crate::Image`]
/// - [`Error::MalformedEncoding`] - A variable-length integer used the reserved tag pattern
/// - [`Error::BadFormat`] - A header field violates its documented invariants
/// - [`Error::TypeMismatch`] - A handle carries a different tag than the one requested
///
/// ## Module Errors
/// - [`Error::SectionNotFound`] - The module section table does not contain the requested id
/// - [`Error::CorruptPatchStream`] - The dehydrated data command stream is inconsistent
/// - [`Error::RegionOverlap`] - A new region collides with an already mapped one
///
/// ## I/O and External Errors
/// - [`Error::OutOfBounds`] - A raw file read went past the end of the input
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::GoblinErr`] - PE/ELF parsing errors from goblin crate
///
/// # Examples
///
/// ```rust,no_run
/// use aotscope::{Error, AotObject};
/// use std::path::Path;
///
/// match AotObject::from_file(Path::new("app.exe")) {
///     Ok(object) => println!("{} sections", object.header().sections().len()),
///     Err(Error::SectionNotFound(id)) => eprintln!("missing section {}", id),
///     Err(Error::BadFormat { message, file, line }) => {
///         eprintln!("Bad format: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    // Decoding Errors
    /// A read exceeded the declared bounds of a reader.
    ///
    /// Raised whenever `offset + look_ahead` is not strictly below the reader size, or the
    /// offset interpreted as a signed 32-bit value is negative.
    #[error("Offset 0x{offset:x} (+{look_ahead}) is out of range for reader at 0x{base:x} with size 0x{size:x}")]
    OutOfRange {
        /// Absolute base address of the reader
        base: u64,
        /// Offset relative to `base` that was requested
        offset: u32,
        /// Number of trailing bytes required after `offset`
        look_ahead: u32,
        /// Declared size of the reader
        size: u32,
    },

    /// An absolute address is not covered by any region of the image.
    #[error("Address 0x{address:x} (+{len}) is not backed by any mapped region")]
    Unmapped {
        /// The absolute address that was requested
        address: u64,
        /// The number of bytes that were requested
        len: usize,
    },

    /// A variable-length integer uses a reserved tag pattern.
    ///
    /// The low five bits of the tag byte being all set is invalid for the 32-bit decoders.
    #[error("Malformed integer encoding at 0x{address:x} - tag byte 0x{tag:02x}")]
    MalformedEncoding {
        /// Absolute address of the tag byte
        address: u64,
        /// The observed tag byte
        tag: u8,
    },

    /// A header or record violates documented format invariants.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("BadFormat - {file}:{line}: {message}")]
    BadFormat {
        /// The message to be printed for the BadFormat error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A handle does not carry the expected tag.
    ///
    /// Callers decoding polymorphic fields use this to fall back to another interpretation.
    #[error("Handle 0x{value:08x} has tag 0x{found:02x}, expected {expected}")]
    TypeMismatch {
        /// The handle kind that was requested
        expected: HandleType,
        /// The raw tag byte that was found
        found: u8,
        /// The full raw handle value
        value: u32,
    },

    // Module Errors
    /// The requested section id is not present in the module section table.
    #[error("Section {0} not found in the module section table")]
    SectionNotFound(u32),

    /// The dehydrated data stream is inconsistent.
    ///
    /// Rehydration aborts, and the destination region must be treated as absent.
    #[error("Corrupt patch stream at 0x{address:x}: {message}")]
    CorruptPatchStream {
        /// Absolute address at which the inconsistency was detected
        address: u64,
        /// Description of the failure
        message: String,
    },

    /// A region could not be mapped because it overlaps an existing one.
    #[error("Region at 0x{start:x} with size 0x{size:x} overlaps an existing region")]
    RegionOverlap {
        /// Start address of the rejected region
        start: u64,
        /// Size of the rejected region
        size: usize,
    },

    /// A file-level read went past the end of the input.
    #[error("Out of bounds read")]
    OutOfBounds,

    /// This file type is not supported.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    // I/O and External Errors
    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Error from the goblin crate during PE/ELF parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}
