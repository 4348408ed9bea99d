//! Record layouts as data.
//!
//! The typed records in [`crate::metadata::records`] cover the kinds this crate interprets. Every
//! other kind with a known layout is described here as an ordered list of [`FieldDef`]s, and
//! [`RawRecord::decode`] walks any of them with the same primitives the typed records use.
//!
//! # Examples
//!
//! ```rust,ignore
//! let record = RawRecord::decode(reader, handle)?;
//! if let Some(FieldValue::String(name)) = record.field("Name") {
//!     println!("{}", name);
//! }
//! ```

use std::fmt;

use crate::{
    metadata::{
        collection::{ByteCollection, HandleCollection},
        handle::{Handle, HandleType},
        primitives::{read_string, MetadataPrimitive},
    },
    nativeformat::{NativeParser, NativeReader},
    Result,
};

/// How one field is stored.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FieldKind {
    /// Unsigned varint (also flags and enums)
    Unsigned,
    /// Signed varint
    Signed,
    /// Unsigned 64-bit varint
    UnsignedLong,
    /// Signed 64-bit varint
    SignedLong,
    /// Raw byte
    Byte,
    /// Raw signed byte
    SByte,
    /// Raw byte, non-zero is true
    Boolean,
    /// UTF-16 code unit as an unsigned varint
    Char,
    /// Raw little-endian `f32`
    Single,
    /// Raw little-endian `f64`
    Double,
    /// Length-prefixed UTF-8
    String,
    /// Handle of a fixed kind (or null)
    Handle(HandleType),
    /// Handle of any kind
    AnyHandle,
    /// Collection of handles
    HandleCollection,
    /// Collection of raw bytes
    ByteCollection,
    /// Collection of fixed-width primitives of the given width
    PrimitiveCollection(u32),
}

/// One named field of a record layout.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FieldDef {
    /// Field name as used by the metadata writer
    pub name: &'static str,
    /// Storage kind
    pub kind: FieldKind,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldDef {
    FieldDef { name, kind }
}

use FieldKind::{
    AnyHandle, Boolean, Byte, ByteCollection as Bytes, Char, Double, HandleCollection as Handles,
    SByte, Signed, SignedLong, Single, Unsigned, UnsignedLong,
};

const CSV: FieldKind = FieldKind::Handle(HandleType::ConstantStringValue);
const STRING: FieldKind = FieldKind::String;

const SCOPE_DEFINITION: &[FieldDef] = &[
    field("Flags", Unsigned),
    field("Name", CSV),
    field("HashAlgorithm", Unsigned),
    field("MajorVersion", Unsigned),
    field("MinorVersion", Unsigned),
    field("BuildNumber", Unsigned),
    field("RevisionNumber", Unsigned),
    field("PublicKey", Bytes),
    field("Culture", CSV),
    field("RootNamespaceDefinition", FieldKind::Handle(HandleType::NamespaceDefinition)),
    field("EntryPoint", FieldKind::Handle(HandleType::QualifiedMethod)),
    field("GlobalModuleType", FieldKind::Handle(HandleType::TypeDefinition)),
    field("CustomAttributes", Handles),
    field("ModuleName", CSV),
    field("Mvid", Bytes),
    field("ModuleCustomAttributes", Handles),
];

const SCOPE_REFERENCE: &[FieldDef] = &[
    field("Flags", Unsigned),
    field("Name", CSV),
    field("MajorVersion", Unsigned),
    field("MinorVersion", Unsigned),
    field("BuildNumber", Unsigned),
    field("RevisionNumber", Unsigned),
    field("PublicKeyOrToken", Bytes),
    field("Culture", CSV),
];

const NAMESPACE_DEFINITION: &[FieldDef] = &[
    field("ParentScopeOrNamespace", AnyHandle),
    field("Name", CSV),
    field("TypeDefinitions", Handles),
    field("TypeForwarders", Handles),
    field("NamespaceDefinitions", Handles),
];

const NAMESPACE_REFERENCE: &[FieldDef] = &[
    field("ParentScopeOrNamespace", AnyHandle),
    field("Name", CSV),
];

const TYPE_DEFINITION: &[FieldDef] = &[
    field("Flags", Unsigned),
    field("BaseType", AnyHandle),
    field("NamespaceDefinition", FieldKind::Handle(HandleType::NamespaceDefinition)),
    field("Name", CSV),
    field("Size", Unsigned),
    field("PackingSize", Unsigned),
    field("EnclosingType", FieldKind::Handle(HandleType::TypeDefinition)),
    field("NestedTypes", Handles),
    field("Methods", Handles),
    field("Fields", Handles),
    field("Properties", Handles),
    field("Events", Handles),
    field("GenericParameters", Handles),
    field("Interfaces", Handles),
    field("CustomAttributes", Handles),
];

const TYPE_REFERENCE: &[FieldDef] = &[
    field("ParentNamespaceOrType", AnyHandle),
    field("TypeName", CSV),
];

const TYPE_SPECIFICATION: &[FieldDef] = &[field("Signature", AnyHandle)];

const TYPE_FORWARDER: &[FieldDef] = &[
    field("Scope", FieldKind::Handle(HandleType::ScopeReference)),
    field("Name", CSV),
    field("NestedTypes", Handles),
    field("CustomAttributes", Handles),
];

const METHOD: &[FieldDef] = &[
    field("Flags", Unsigned),
    field("ImplFlags", Unsigned),
    field("Name", CSV),
    field("Signature", FieldKind::Handle(HandleType::MethodSignature)),
    field("Parameters", Handles),
    field("GenericParameters", Handles),
    field("CustomAttributes", Handles),
];

const QUALIFIED_METHOD: &[FieldDef] = &[
    field("Method", FieldKind::Handle(HandleType::Method)),
    field("EnclosingType", FieldKind::Handle(HandleType::TypeDefinition)),
];

const METHOD_SIGNATURE: &[FieldDef] = &[
    field("CallingConvention", Unsigned),
    field("GenericParameterCount", Signed),
    field("ReturnType", AnyHandle),
    field("Parameters", Handles),
    field("VarArgParameters", Handles),
];

const FIELD: &[FieldDef] = &[
    field("Flags", Unsigned),
    field("Name", CSV),
    field("Signature", FieldKind::Handle(HandleType::FieldSignature)),
    field("DefaultValue", AnyHandle),
    field("Offset", Unsigned),
    field("CustomAttributes", Handles),
];

const FIELD_SIGNATURE: &[FieldDef] = &[field("Type", AnyHandle)];

const PARAMETER: &[FieldDef] = &[
    field("Flags", Unsigned),
    field("Sequence", Unsigned),
    field("Name", CSV),
    field("DefaultValue", AnyHandle),
    field("CustomAttributes", Handles),
];

const MEMBER_REFERENCE: &[FieldDef] = &[
    field("Parent", AnyHandle),
    field("Name", CSV),
    field("Signature", AnyHandle),
    field("CustomAttributes", Handles),
];

const SIGNATURE_TYPE: &[FieldDef] = &[field("Type", AnyHandle)];
const SZARRAY_SIGNATURE: &[FieldDef] = &[field("ElementType", AnyHandle)];
const TYPE_VARIABLE_SIGNATURE: &[FieldDef] = &[field("Number", Signed)];

const TYPE_INSTANTIATION_SIGNATURE: &[FieldDef] = &[
    field("GenericType", AnyHandle),
    field("GenericTypeArguments", Handles),
];

const CONSTANT_STRING_VALUE: &[FieldDef] = &[field("Value", STRING)];
const CONSTANT_STRING_ARRAY: &[FieldDef] = &[field("Value", Handles)];
const CONSTANT_BOOLEAN_VALUE: &[FieldDef] = &[field("Value", Boolean)];
const CONSTANT_BYTE_VALUE: &[FieldDef] = &[field("Value", Byte)];
const CONSTANT_SBYTE_VALUE: &[FieldDef] = &[field("Value", SByte)];
const CONSTANT_CHAR_VALUE: &[FieldDef] = &[field("Value", Char)];
const CONSTANT_INT16_VALUE: &[FieldDef] = &[field("Value", Signed)];
const CONSTANT_UINT16_VALUE: &[FieldDef] = &[field("Value", Unsigned)];
const CONSTANT_INT32_VALUE: &[FieldDef] = &[field("Value", Signed)];
const CONSTANT_UINT32_VALUE: &[FieldDef] = &[field("Value", Unsigned)];
const CONSTANT_INT64_VALUE: &[FieldDef] = &[field("Value", SignedLong)];
const CONSTANT_UINT64_VALUE: &[FieldDef] = &[field("Value", UnsignedLong)];
const CONSTANT_SINGLE_VALUE: &[FieldDef] = &[field("Value", Single)];
const CONSTANT_DOUBLE_VALUE: &[FieldDef] = &[field("Value", Double)];
const CONSTANT_BYTE_ARRAY: &[FieldDef] = &[field("Value", Bytes)];
const CONSTANT_INT32_ARRAY: &[FieldDef] = &[field("Value", FieldKind::PrimitiveCollection(4))];

/// Layout of `kind`, or `None` if no layout is tabled for it.
#[must_use]
pub fn layout(kind: HandleType) -> Option<&'static [FieldDef]> {
    let fields = match kind {
        HandleType::ScopeDefinition => SCOPE_DEFINITION,
        HandleType::ScopeReference => SCOPE_REFERENCE,
        HandleType::NamespaceDefinition => NAMESPACE_DEFINITION,
        HandleType::NamespaceReference => NAMESPACE_REFERENCE,
        HandleType::TypeDefinition => TYPE_DEFINITION,
        HandleType::TypeReference => TYPE_REFERENCE,
        HandleType::TypeSpecification => TYPE_SPECIFICATION,
        HandleType::TypeForwarder => TYPE_FORWARDER,
        HandleType::Method => METHOD,
        HandleType::QualifiedMethod => QUALIFIED_METHOD,
        HandleType::MethodSignature => METHOD_SIGNATURE,
        HandleType::Field => FIELD,
        HandleType::FieldSignature => FIELD_SIGNATURE,
        HandleType::Parameter => PARAMETER,
        HandleType::MemberReference => MEMBER_REFERENCE,
        HandleType::PointerSignature | HandleType::ByReferenceSignature => SIGNATURE_TYPE,
        HandleType::SZArraySignature => SZARRAY_SIGNATURE,
        HandleType::TypeVariableSignature | HandleType::MethodTypeVariableSignature => {
            TYPE_VARIABLE_SIGNATURE
        }
        HandleType::TypeInstantiationSignature => TYPE_INSTANTIATION_SIGNATURE,
        HandleType::ConstantStringValue => CONSTANT_STRING_VALUE,
        HandleType::ConstantStringArray => CONSTANT_STRING_ARRAY,
        HandleType::ConstantBooleanValue => CONSTANT_BOOLEAN_VALUE,
        HandleType::ConstantByteValue => CONSTANT_BYTE_VALUE,
        HandleType::ConstantSByteValue => CONSTANT_SBYTE_VALUE,
        HandleType::ConstantCharValue => CONSTANT_CHAR_VALUE,
        HandleType::ConstantInt16Value => CONSTANT_INT16_VALUE,
        HandleType::ConstantUInt16Value => CONSTANT_UINT16_VALUE,
        HandleType::ConstantInt32Value => CONSTANT_INT32_VALUE,
        HandleType::ConstantUInt32Value => CONSTANT_UINT32_VALUE,
        HandleType::ConstantInt64Value => CONSTANT_INT64_VALUE,
        HandleType::ConstantUInt64Value => CONSTANT_UINT64_VALUE,
        HandleType::ConstantSingleValue => CONSTANT_SINGLE_VALUE,
        HandleType::ConstantDoubleValue => CONSTANT_DOUBLE_VALUE,
        HandleType::ConstantByteArray => CONSTANT_BYTE_ARRAY,
        HandleType::ConstantInt32Array => CONSTANT_INT32_ARRAY,
        _ => return None,
    };
    Some(fields)
}

/// One decoded field value.
#[derive(Clone, Debug)]
pub enum FieldValue<'a> {
    /// See [`FieldKind::Unsigned`]
    Unsigned(u32),
    /// See [`FieldKind::Signed`]
    Signed(i32),
    /// See [`FieldKind::UnsignedLong`]
    UnsignedLong(u64),
    /// See [`FieldKind::SignedLong`]
    SignedLong(i64),
    /// See [`FieldKind::Byte`]
    Byte(u8),
    /// See [`FieldKind::SByte`]
    SByte(i8),
    /// See [`FieldKind::Boolean`]
    Boolean(bool),
    /// See [`FieldKind::Char`]
    Char(char),
    /// See [`FieldKind::Single`]
    Single(f32),
    /// See [`FieldKind::Double`]
    Double(f64),
    /// See [`FieldKind::String`]
    String(String),
    /// See [`FieldKind::Handle`] and [`FieldKind::AnyHandle`]
    Handle(Handle),
    /// See [`FieldKind::HandleCollection`]
    Handles(HandleCollection<'a, Handle>),
    /// See [`FieldKind::ByteCollection`]
    Bytes(ByteCollection<'a>),
    /// See [`FieldKind::PrimitiveCollection`]: offset of the count and element width
    Primitives {
        /// Offset of the count varint
        offset: u32,
        /// Element width
        size: u32,
    },
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Unsigned(value) => write!(f, "0x{value:x}"),
            FieldValue::Signed(value) => write!(f, "{value}"),
            FieldValue::UnsignedLong(value) => write!(f, "0x{value:x}"),
            FieldValue::SignedLong(value) => write!(f, "{value}"),
            FieldValue::Byte(value) => write!(f, "0x{value:02x}"),
            FieldValue::SByte(value) => write!(f, "{value}"),
            FieldValue::Boolean(value) => write!(f, "{value}"),
            FieldValue::Char(value) => write!(f, "{value:?}"),
            FieldValue::Single(value) => write!(f, "{value}"),
            FieldValue::Double(value) => write!(f, "{value}"),
            FieldValue::String(value) => write!(f, "{value:?}"),
            FieldValue::Handle(handle) => write!(f, "{handle}"),
            FieldValue::Handles(collection) => write!(f, "{collection:?}"),
            FieldValue::Bytes(collection) => write!(f, "{collection:?}"),
            FieldValue::Primitives { offset, size } => {
                write!(f, "PrimitiveCollection(0x{offset:x}, {size})")
            }
        }
    }
}

/// A record decoded through its [`layout`].
#[derive(Clone, Debug)]
pub struct RawRecord<'a> {
    /// The handle the record was read from
    pub handle: Handle,
    /// Fields in stored order
    pub fields: Vec<(&'static str, FieldValue<'a>)>,
    /// Offset just past the last field
    pub end: u32,
}

impl<'a> RawRecord<'a> {
    /// Decodes the record `handle` points at.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BadFormat`] for kinds without a layout and propagates field
    /// decoding errors, including [`crate::Error::TypeMismatch`] on typed handle fields.
    pub fn decode(reader: NativeReader<'a>, handle: Handle) -> Result<RawRecord<'a>> {
        let Some(fields) = layout(handle.kind()) else {
            return Err(bad_format_error!("No record layout for {}", handle.kind()));
        };

        let mut parser = NativeParser::new(reader, handle.offset());
        let mut values = Vec::with_capacity(fields.len());
        for def in fields {
            values.push((def.name, decode_field(&mut parser, def.kind)?));
        }

        Ok(RawRecord {
            handle,
            fields: values,
            end: parser.offset(),
        })
    }

    /// The first field called `name`
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldValue<'a>> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }
}

fn decode_field<'a>(parser: &mut NativeParser<'a>, kind: FieldKind) -> Result<FieldValue<'a>> {
    Ok(match kind {
        FieldKind::Unsigned => FieldValue::Unsigned(parser.get_unsigned()?),
        FieldKind::Signed => FieldValue::Signed(parser.get_signed()?),
        FieldKind::UnsignedLong => FieldValue::UnsignedLong(parser.get_unsigned_long()?),
        FieldKind::SignedLong => FieldValue::SignedLong(parser.get_signed_long()?),
        FieldKind::Byte => FieldValue::Byte(u8::read_field(parser)?),
        FieldKind::SByte => FieldValue::SByte(i8::read_field(parser)?),
        FieldKind::Boolean => FieldValue::Boolean(bool::read_field(parser)?),
        FieldKind::Char => FieldValue::Char(char::read_field(parser)?),
        FieldKind::Single => FieldValue::Single(f32::read_field(parser)?),
        FieldKind::Double => FieldValue::Double(f64::read_field(parser)?),
        FieldKind::String => FieldValue::String(read_string(parser)?),
        FieldKind::Handle(expected) => {
            let handle = Handle::read(parser)?;
            handle.expect_kind(expected)?;
            FieldValue::Handle(Handle::new(expected, handle.offset()))
        }
        FieldKind::AnyHandle => FieldValue::Handle(Handle::read(parser)?),
        FieldKind::HandleCollection => FieldValue::Handles(HandleCollection::read(parser)?),
        FieldKind::ByteCollection => FieldValue::Bytes(ByteCollection::read(parser)?),
        FieldKind::PrimitiveCollection(size) => {
            let offset = parser.offset();
            let count = parser.get_unsigned()?;
            let end = count
                .checked_mul(size)
                .and_then(|length| parser.offset().checked_add(length))
                .ok_or_else(|| bad_format_error!("Primitive collection of {} elements", count))?;
            parser.seek(end);
            FieldValue::Primitives { offset, size }
        }
    })
}
