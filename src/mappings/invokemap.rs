use bitflags::bitflags;
use strum::{Display, FromRepr};

use crate::{
    metadata::{Handle, HandleType, MethodHandle, TypedHandle},
    nativeformat::{NativeHashtable, NativeParser},
    runtime::{ExternalReferencesTable, RuntimeTypeHandle},
    Result,
};

/// Mask selecting the calling convention bits of [`InvokeTableFlags`]
pub const CALLING_CONVENTION_MASK: u32 = 0x7000;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
    /// Flags leading every invoke map entry
    pub struct InvokeTableFlags : u32 {
        /// The method is invoked through a virtual slot
        const HAS_VIRTUAL_INVOKE = 0x0001;
        /// Generic method instantiation
        const IS_GENERIC_METHOD = 0x0002;
        /// The method field is a metadata handle rather than a name-and-signature
        const HAS_METADATA_HANDLE = 0x0004;
        /// Parameterless constructor
        const IS_DEFAULT_CONSTRUCTOR = 0x0008;
        /// Needs an instantiation argument; the declaring type is not usable directly
        const REQUIRES_INST_ARG = 0x0010;
        /// The entry carries a callable entry point
        const HAS_ENTRYPOINT = 0x0020;
        /// Universal canonical code
        const IS_UNIVERSAL_CANONICAL_ENTRY = 0x0040;
        /// Parameters are interpreted at runtime; no dynamic invoke stub follows
        const NEEDS_PARAMETER_INTERPRETATION = 0x0080;
    }
}

/// Calling convention encoded in [`CALLING_CONVENTION_MASK`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, FromRepr)]
#[repr(u32)]
#[allow(missing_docs)]
pub enum CallingConvention {
    Default = 0x0000,
    Cdecl = 0x1000,
    Winapi = 0x2000,
    StdCall = 0x3000,
    ThisCall = 0x4000,
    FastCall = 0x5000,
}

impl InvokeTableFlags {
    /// Decodes the flags varint, keeping unknown bits.
    ///
    /// # Errors
    ///
    /// Propagates varint decoding errors.
    pub fn read(parser: &mut NativeParser<'_>) -> Result<Self> {
        Ok(Self::from_bits_retain(parser.get_unsigned()?))
    }

    /// The calling convention, if the bits hold a known value
    #[must_use]
    pub fn calling_convention(&self) -> Option<CallingConvention> {
        CallingConvention::from_repr(self.bits() & CALLING_CONVENTION_MASK)
    }
}

/// An invoke map entry with an entry point.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct InvokeMapEntry {
    /// Entry flags
    pub flags: InvokeTableFlags,
    /// The method, when the entry carries a metadata handle
    pub method: Option<MethodHandle>,
    /// The raw method field: a handle offset or a name-and-signature reference
    pub method_raw: u32,
    /// The declaring type, unless the entry requires an instantiation argument
    pub declaring_type: Option<RuntimeTypeHandle>,
    /// Address of the compiled method body
    pub entry_point: u64,
}

/// The `InvokeMap` blob: reflection-invokable methods and their entry points.
#[derive(Clone, Copy, Debug)]
pub struct InvokeMap<'a> {
    table: NativeHashtable<'a>,
    externals: ExternalReferencesTable<'a>,
}

impl<'a> InvokeMap<'a> {
    /// Combines the invoke map hashtable with the external reference table it indexes into.
    #[must_use]
    pub fn new(
        table: NativeHashtable<'a>,
        externals: ExternalReferencesTable<'a>,
    ) -> InvokeMap<'a> {
        InvokeMap { table, externals }
    }

    /// Every entry that has an entry point, in table order.
    pub fn entries(&self) -> impl Iterator<Item = Result<InvokeMapEntry>> + 'a {
        let externals = self.externals;
        self.table
            .all_entries()
            .filter_map(move |parser| match parser {
                Ok(parser) => Self::entry(&externals, parser).transpose(),
                Err(error) => Some(Err(error)),
            })
    }

    fn entry(
        externals: &ExternalReferencesTable<'a>,
        mut parser: NativeParser<'a>,
    ) -> Result<Option<InvokeMapEntry>> {
        let flags = InvokeTableFlags::read(&mut parser)?;
        if !flags.contains(InvokeTableFlags::HAS_ENTRYPOINT) {
            return Ok(None);
        }

        let method_raw = parser.get_unsigned()?;
        let declaring_raw = parser.get_unsigned()?;
        let entry_point = externals.address(parser.get_unsigned()?)?;

        if !flags.contains(InvokeTableFlags::NEEDS_PARAMETER_INTERPRETATION) {
            // dynamic invoke stub
            parser.skip_integer()?;
        }

        let declaring_type = if flags.contains(InvokeTableFlags::REQUIRES_INST_ARG) {
            None
        } else {
            Some(RuntimeTypeHandle(externals.address(declaring_raw)?))
        };

        let method = flags.contains(InvokeTableFlags::HAS_METADATA_HANDLE).then(|| {
            MethodHandle::from_handle_unchecked(Handle::new(HandleType::Method, method_raw))
        });

        Ok(Some(InvokeMapEntry {
            flags,
            method,
            method_raw,
            declaring_type,
            entry_point,
        }))
    }
}
