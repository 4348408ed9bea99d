//! The NativeFormat encoding used by every NativeAOT reflection blob.
//!
//! NativeFormat is a compact, position-dependent serialization: integers are variable-length,
//! references between records are signed offsets relative to where they are stored, and lookup
//! structures are perfect hashtables keyed by type or method hashcodes. The same primitives back
//! the embedded metadata, the type and invoke maps and the stack trace tables.
//!
//! # Key Components
//!
//! - [`crate::nativeformat::NativeReader`] - Bounds-checked view of a byte range of the image
//! - [`crate::nativeformat::NativeParser`] - A reader plus a position, the cursor every decoder uses
//! - [`crate::nativeformat::NativeHashtable`] - Perfect hashtable reader with lookup and enumeration
//! - [`crate::nativeformat::decode_unsigned`] and friends - The varint codec
//!
//! # Examples
//!
//! ```rust
//! use aotscope::nativeformat::{NativeParser, NativeReader};
//!
//! let bytes = [0x01, 0x02, 0x80];
//! let mut parser = NativeParser::new(NativeReader::from_slice(&bytes, 0x1000), 0);
//! assert_eq!(parser.get_unsigned()?, 128);
//! assert_eq!(parser.get_signed()?, -64);
//! # Ok::<(), aotscope::Error>(())
//! ```

mod hashtable;
mod parser;
mod primitives;
mod reader;

pub use hashtable::{AllEntries, Lookup, NativeHashtable};
pub use parser::NativeParser;
pub use primitives::{
    decode_signed, decode_signed_long, decode_unsigned, decode_unsigned_long, skip_integer,
};
pub use reader::NativeReader;
