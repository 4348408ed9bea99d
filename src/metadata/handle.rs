//! Metadata handles: an 8-bit kind tag over a 24-bit offset.
//!
//! Every reference between metadata records is a [`Handle`]. It is decoded once, as a tagged
//! union, and then refined into a typed view such as [`TypeDefinitionHandle`] when the field it
//! was read from has a fixed kind. Refinement only validates the tag; it never re-parses.
//!
//! # Examples
//!
//! ```rust
//! use aotscope::metadata::{Handle, HandleType, TypeDefinitionHandle, TypedHandle};
//!
//! let handle = Handle::from_raw(0x3A00_0120)?;
//! assert_eq!(handle.kind(), HandleType::TypeDefinition);
//! assert_eq!(handle.offset(), 0x120);
//!
//! let typed = TypeDefinitionHandle::try_from(handle)?;
//! assert_eq!(typed.offset(), 0x120);
//!
//! let scope = Handle::from_raw(0x3800_0010)?;
//! assert!(TypeDefinitionHandle::try_from(scope).is_err());
//! # Ok::<(), aotscope::Error>(())
//! ```

use std::fmt;

use strum::{Display, EnumCount, EnumIter, FromRepr};

use crate::{nativeformat::NativeParser, Error, Result};

/// The kind tag stored in the top byte of a raw handle value.
///
/// The numbering is fixed by the metadata writer of the NativeAOT toolchain and must not be
/// reordered.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Display, EnumIter, EnumCount, FromRepr,
)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum HandleType {
    #[default]
    Null = 0x00,
    ArraySignature = 0x01,
    ByReferenceSignature = 0x02,
    ConstantBooleanArray = 0x03,
    ConstantBooleanValue = 0x04,
    ConstantByteArray = 0x05,
    ConstantByteValue = 0x06,
    ConstantCharArray = 0x07,
    ConstantCharValue = 0x08,
    ConstantDoubleArray = 0x09,
    ConstantDoubleValue = 0x0A,
    ConstantEnumArray = 0x0B,
    ConstantEnumValue = 0x0C,
    ConstantHandleArray = 0x0D,
    ConstantInt16Array = 0x0E,
    ConstantInt16Value = 0x0F,
    ConstantInt32Array = 0x10,
    ConstantInt32Value = 0x11,
    ConstantInt64Array = 0x12,
    ConstantInt64Value = 0x13,
    ConstantReferenceValue = 0x14,
    ConstantSByteArray = 0x15,
    ConstantSByteValue = 0x16,
    ConstantSingleArray = 0x17,
    ConstantSingleValue = 0x18,
    ConstantStringArray = 0x19,
    ConstantStringValue = 0x1A,
    ConstantUInt16Array = 0x1B,
    ConstantUInt16Value = 0x1C,
    ConstantUInt32Array = 0x1D,
    ConstantUInt32Value = 0x1E,
    ConstantUInt64Array = 0x1F,
    ConstantUInt64Value = 0x20,
    CustomAttribute = 0x21,
    Event = 0x22,
    Field = 0x23,
    FieldSignature = 0x24,
    FunctionPointerSignature = 0x25,
    GenericParameter = 0x26,
    MemberReference = 0x27,
    Method = 0x28,
    MethodInstantiation = 0x29,
    MethodSemantics = 0x2A,
    MethodSignature = 0x2B,
    MethodTypeVariableSignature = 0x2C,
    ModifiedType = 0x2D,
    NamedArgument = 0x2E,
    NamespaceDefinition = 0x2F,
    NamespaceReference = 0x30,
    Parameter = 0x31,
    PointerSignature = 0x32,
    Property = 0x33,
    PropertySignature = 0x34,
    QualifiedField = 0x35,
    QualifiedMethod = 0x36,
    SZArraySignature = 0x37,
    ScopeDefinition = 0x38,
    ScopeReference = 0x39,
    TypeDefinition = 0x3A,
    TypeForwarder = 0x3B,
    TypeInstantiationSignature = 0x3C,
    TypeReference = 0x3D,
    TypeSpecification = 0x3E,
    TypeVariableSignature = 0x3F,
}

/// An untyped metadata handle.
///
/// The offset is relative to the start of the metadata blob the handle was read from. A handle
/// with offset zero is null regardless of its tag, since offset zero is the blob signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Handle {
    kind: HandleType,
    offset: u32,
}

impl Handle {
    /// Builds a handle from its parts. `offset` is truncated to 24 bits.
    #[must_use]
    pub fn new(kind: HandleType, offset: u32) -> Handle {
        Handle {
            kind,
            offset: offset & 0x00FF_FFFF,
        }
    }

    /// Splits a raw 32-bit value into tag and offset.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BadFormat`] if the tag byte is not a known [`HandleType`].
    pub fn from_raw(value: u32) -> Result<Handle> {
        let tag = (value >> 24) as u8;
        let kind = HandleType::from_repr(tag)
            .ok_or_else(|| bad_format_error!("Unknown handle type 0x{:02x} in 0x{:08x}", tag, value))?;

        Ok(Handle::new(kind, value))
    }

    /// Decodes one handle at the parser position.
    ///
    /// # Errors
    ///
    /// Propagates varint decoding errors and unknown tags.
    pub fn read(parser: &mut NativeParser<'_>) -> Result<Handle> {
        Handle::from_raw(parser.get_unsigned()?)
    }

    /// The raw `(kind << 24) | offset` value
    #[must_use]
    pub fn raw(&self) -> u32 {
        (u32::from(self.kind as u8) << 24) | self.offset
    }

    /// The kind tag
    #[must_use]
    pub fn kind(&self) -> HandleType {
        self.kind
    }

    /// Offset into the metadata blob
    #[must_use]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// True for the `Null` kind or a zero offset.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.kind == HandleType::Null || self.offset == 0
    }

    /// Checks that this handle is of `kind` or `Null`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TypeMismatch`] carrying the expected kind, the observed tag and
    /// the raw value.
    pub fn expect_kind(&self, kind: HandleType) -> Result<()> {
        if self.kind == kind || self.kind == HandleType::Null {
            return Ok(());
        }

        Err(Error::TypeMismatch {
            expected: kind,
            found: self.kind as u8,
            value: self.raw(),
        })
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}, 0x{:06x})", self.kind, self.offset)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.raw())
    }
}

/// Anything that can be decoded from a single handle varint.
///
/// Implemented by [`Handle`] for polymorphic fields and by every typed handle.
pub trait DecodeHandle: Copy + Sized {
    /// Decodes one value at the parser position.
    ///
    /// # Errors
    ///
    /// Propagates decoding errors; typed handles also fail with
    /// [`crate::Error::TypeMismatch`].
    fn decode(parser: &mut NativeParser<'_>) -> Result<Self>;
}

impl DecodeHandle for Handle {
    fn decode(parser: &mut NativeParser<'_>) -> Result<Self> {
        Handle::read(parser)
    }
}

/// A [`Handle`] refined to one [`HandleType`].
pub trait TypedHandle: Copy + Sized {
    /// The kind this refinement accepts (besides `Null`)
    const KIND: HandleType;

    /// Wraps `handle` without validating its tag.
    fn from_handle_unchecked(handle: Handle) -> Self;

    /// The underlying untyped handle
    fn handle(&self) -> Handle;

    /// Offset into the metadata blob
    fn offset(&self) -> u32 {
        self.handle().offset()
    }

    /// See [`Handle::is_null`]
    fn is_null(&self) -> bool {
        self.handle().is_null()
    }
}

macro_rules! typed_handles {
    ($($name:ident => $kind:ident),* $(,)?) => {
        $(
            typed_handle!($name, $kind);

            impl DecodeHandle for $name {
                fn decode(parser: &mut NativeParser<'_>) -> Result<Self> {
                    $name::try_from(Handle::read(parser)?)
                }
            }
        )*
    };
}

typed_handles! {
    ConstantStringArrayHandle => ConstantStringArray,
    ConstantStringValueHandle => ConstantStringValue,
    CustomAttributeHandle => CustomAttribute,
    EventHandle => Event,
    FieldHandle => Field,
    GenericParameterHandle => GenericParameter,
    MethodHandle => Method,
    MethodSignatureHandle => MethodSignature,
    NamespaceDefinitionHandle => NamespaceDefinition,
    NamespaceReferenceHandle => NamespaceReference,
    ParameterHandle => Parameter,
    PropertyHandle => Property,
    QualifiedMethodHandle => QualifiedMethod,
    ScopeDefinitionHandle => ScopeDefinition,
    ScopeReferenceHandle => ScopeReference,
    TypeDefinitionHandle => TypeDefinition,
    TypeForwarderHandle => TypeForwarder,
    TypeReferenceHandle => TypeReference,
    TypeSpecificationHandle => TypeSpecification,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{nativeformat::NativeReader, test::encode_unsigned};
    use strum::IntoEnumIterator;

    #[test]
    fn raw_split() {
        let handle = Handle::from_raw(0x2800_1234).unwrap();
        assert_eq!(handle.kind(), HandleType::Method);
        assert_eq!(handle.offset(), 0x1234);
        assert_eq!(handle.raw(), 0x2800_1234);
        assert!(!handle.is_null());
        assert_eq!(format!("{handle}"), "0x28001234");
    }

    #[test]
    fn unknown_tag_is_bad_format() {
        assert!(matches!(
            Handle::from_raw(0x4000_0001),
            Err(Error::BadFormat { .. })
        ));
    }

    #[test]
    fn tags_are_contiguous() {
        assert_eq!(HandleType::COUNT, 0x40);
        for (index, kind) in HandleType::iter().enumerate() {
            assert_eq!(kind as usize, index);
        }
        assert_eq!(HandleType::TypeDefinition as u8, 0x3A);
        assert_eq!(HandleType::ConstantStringValue as u8, 0x1A);
        assert_eq!(HandleType::ScopeDefinition as u8, 0x38);
    }

    #[test]
    fn typed_view_rejects_other_kinds() {
        let scope = Handle::new(HandleType::ScopeDefinition, 0x40);
        match TypeDefinitionHandle::try_from(scope) {
            Err(Error::TypeMismatch {
                expected,
                found,
                value,
            }) => {
                assert_eq!(expected, HandleType::TypeDefinition);
                assert_eq!(found, 0x38);
                assert_eq!(value, 0x3800_0040);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn typed_view_accepts_null_and_retags() {
        // typed record fields are stored as bare offsets
        let bare = Handle::from_raw(0x0000_0040).unwrap();
        let typed = TypeDefinitionHandle::try_from(bare).unwrap();
        assert_eq!(typed.handle().kind(), HandleType::TypeDefinition);
        assert_eq!(typed.offset(), 0x40);
        assert!(!typed.is_null());

        let null = TypeDefinitionHandle::try_from(Handle::default()).unwrap();
        assert!(null.is_null());
    }

    #[test]
    fn decode_from_parser() {
        let mut bytes = encode_unsigned(0x2B00_0077);
        bytes.extend(encode_unsigned(0x3A00_0001));

        let mut parser = NativeParser::new(NativeReader::from_slice(&bytes, 0), 0);
        let signature = MethodSignatureHandle::decode(&mut parser).unwrap();
        assert_eq!(signature.offset(), 0x77);

        assert!(MethodHandle::decode(&mut parser).is_err());
        assert_eq!(parser.offset() as usize, bytes.len());
    }
}
