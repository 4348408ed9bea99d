//! Attribute flag sets stored in metadata records.
//!
//! All of them are written as unsigned varints. Unknown bits are kept (`from_bits_retain`) so a
//! newer toolchain's flags survive a round through these types.

use bitflags::bitflags;
use strum::{Display, FromRepr};

use crate::{nativeformat::NativeParser, Result};

/// Mask for the member access bits of [`MethodAttributes`]
pub const METHOD_ACCESS_MASK: u32 = 0x0007;
/// Mask for the code type bits of [`MethodImplAttributes`]
pub const METHOD_IMPL_CODE_TYPE_MASK: u32 = 0x0003;
/// Mask for the visibility bits of [`TypeAttributes`]
pub const TYPE_VISIBILITY_MASK: u32 = 0x0000_0007;
/// Mask for the layout bits of [`TypeAttributes`]
pub const TYPE_LAYOUT_MASK: u32 = 0x0000_0018;
/// Mask for the string format bits of [`TypeAttributes`]
pub const TYPE_STRING_FORMAT_MASK: u32 = 0x0003_0000;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
    /// Method attributes (`System.Reflection.MethodAttributes`)
    pub struct MethodAttributes : u32 {
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by sub-types only in this assembly
        const FAM_AND_ASSEM = 0x0002;
        /// Accessible by anyone in the assembly
        const ASSEMBLY = 0x0003;
        /// Accessible only by type and sub-types
        const FAMILY = 0x0004;
        /// Accessible by sub-types anywhere, plus anyone in the assembly
        const FAM_OR_ASSEM = 0x0005;
        /// Accessible by anyone
        const PUBLIC = 0x0006;
        /// Managed method exported to unmanaged code
        const UNMANAGED_EXPORT = 0x0008;
        /// Defined on the type, not per instance
        const STATIC = 0x0010;
        /// Cannot be overridden
        const FINAL = 0x0020;
        /// Virtual
        const VIRTUAL = 0x0040;
        /// Hides by name and signature
        const HIDE_BY_SIG = 0x0080;
        /// Always gets a new vtable slot
        const NEW_SLOT = 0x0100;
        /// Overridable only where accessible
        const CHECK_ACCESS_ON_OVERRIDE = 0x0200;
        /// No implementation
        const ABSTRACT = 0x0400;
        /// Special name
        const SPECIAL_NAME = 0x0800;
        /// Runtime-checked special name
        const RT_SPECIAL_NAME = 0x1000;
        /// Forwarded through P/Invoke
        const PINVOKE_IMPL = 0x2000;
        /// Has security attached
        const HAS_SECURITY = 0x4000;
        /// Calls a method containing security code
        const REQUIRE_SEC_OBJECT = 0x8000;
    }
}

impl MethodAttributes {
    /// Reads the flags as an unsigned varint.
    ///
    /// # Errors
    ///
    /// Propagates varint errors.
    pub fn read(parser: &mut NativeParser<'_>) -> Result<Self> {
        Ok(Self::from_bits_retain(parser.get_unsigned()?))
    }

    /// The member access value (0 to 6)
    #[must_use]
    pub fn access(&self) -> u32 {
        self.bits() & METHOD_ACCESS_MASK
    }

    /// True for public methods
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.access() == Self::PUBLIC.bits()
    }
}

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
    /// Method implementation attributes (`System.Reflection.MethodImplAttributes`)
    pub struct MethodImplAttributes : u32 {
        /// Native code
        const NATIVE = 0x0001;
        /// OPTIL code
        const OPTIL = 0x0002;
        /// Provided by the runtime
        const RUNTIME = 0x0003;
        /// Unmanaged code
        const UNMANAGED = 0x0004;
        /// Must not be inlined
        const NO_INLINING = 0x0008;
        /// Declared but not defined
        const FORWARD_REF = 0x0010;
        /// Single-threaded through the body
        const SYNCHRONIZED = 0x0020;
        /// Must not be optimized
        const NO_OPTIMIZATION = 0x0040;
        /// Signature exported exactly as declared
        const PRESERVE_SIG = 0x0080;
        /// Inline if possible
        const AGGRESSIVE_INLINING = 0x0100;
        /// Hot code
        const AGGRESSIVE_OPTIMIZATION = 0x0200;
        /// Internal call
        const INTERNAL_CALL = 0x1000;
    }
}

impl MethodImplAttributes {
    /// Reads the flags as an unsigned varint.
    ///
    /// # Errors
    ///
    /// Propagates varint errors.
    pub fn read(parser: &mut NativeParser<'_>) -> Result<Self> {
        Ok(Self::from_bits_retain(parser.get_unsigned()?))
    }

    /// The code type value (IL, native, OPTIL or runtime)
    #[must_use]
    pub fn code_type(&self) -> u32 {
        self.bits() & METHOD_IMPL_CODE_TYPE_MASK
    }
}

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
    /// Assembly flags of a scope definition or reference
    pub struct AssemblyFlags : u32 {
        /// The public key field holds a full key rather than a token
        const PUBLIC_KEY = 0x0001;
        /// The assembly can be retargeted
        const RETARGETABLE = 0x0100;
        /// Mask for the content type
        const CONTENT_TYPE_MASK = 0x0E00;
    }
}

impl AssemblyFlags {
    /// Reads the flags as an unsigned varint.
    ///
    /// # Errors
    ///
    /// Propagates varint errors.
    pub fn read(parser: &mut NativeParser<'_>) -> Result<Self> {
        Ok(Self::from_bits_retain(parser.get_unsigned()?))
    }
}

/// Hash algorithm of a scope definition
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, FromRepr)]
#[repr(u32)]
pub enum AssemblyHashAlgorithm {
    /// No hash
    None = 0x0000,
    /// Reserved (MD5)
    Reserved = 0x8003,
    /// SHA-1
    SHA1 = 0x8004,
}

impl AssemblyHashAlgorithm {
    /// Reads the value as an unsigned varint.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BadFormat`] for values outside the enumeration.
    pub fn read(parser: &mut NativeParser<'_>) -> Result<Self> {
        let value = parser.get_unsigned()?;
        Self::from_repr(value)
            .ok_or_else(|| bad_format_error!("Unknown assembly hash algorithm 0x{:x}", value))
    }
}

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
    /// Type attributes (`System.Reflection.TypeAttributes`)
    pub struct TypeAttributes : u32 {
        /// Public top-level type
        const PUBLIC = 0x0000_0001;
        /// Nested, public
        const NESTED_PUBLIC = 0x0000_0002;
        /// Nested, private
        const NESTED_PRIVATE = 0x0000_0003;
        /// Nested, family
        const NESTED_FAMILY = 0x0000_0004;
        /// Nested, assembly
        const NESTED_ASSEMBLY = 0x0000_0005;
        /// Nested, family and assembly
        const NESTED_FAM_AND_ASSEM = 0x0000_0006;
        /// Nested, family or assembly
        const NESTED_FAM_OR_ASSEM = 0x0000_0007;
        /// Fields laid out in declaration order
        const SEQUENTIAL_LAYOUT = 0x0000_0008;
        /// Fields laid out at explicit offsets
        const EXPLICIT_LAYOUT = 0x0000_0010;
        /// Interface
        const INTERFACE = 0x0000_0020;
        /// Abstract
        const ABSTRACT = 0x0000_0080;
        /// Sealed
        const SEALED = 0x0000_0100;
        /// Special name
        const SPECIAL_NAME = 0x0000_0400;
        /// Runtime-checked special name
        const RT_SPECIAL_NAME = 0x0000_0800;
        /// Imported
        const IMPORT = 0x0000_1000;
        /// Serializable
        const SERIALIZABLE = 0x0000_2000;
        /// Windows Runtime type
        const WINDOWS_RUNTIME = 0x0000_4000;
        /// Unicode strings for interop
        const UNICODE_CLASS = 0x0001_0000;
        /// Automatic string format for interop
        const AUTO_CLASS = 0x0002_0000;
        /// Has security attached
        const HAS_SECURITY = 0x0004_0000;
        /// Static fields may be initialized lazily
        const BEFORE_FIELD_INIT = 0x0010_0000;
        /// Non-standard string encoding bits
        const CUSTOM_FORMAT_MASK = 0x00C0_0000;
    }
}

impl TypeAttributes {
    /// Reads the flags as an unsigned varint.
    ///
    /// # Errors
    ///
    /// Propagates varint errors.
    pub fn read(parser: &mut NativeParser<'_>) -> Result<Self> {
        Ok(Self::from_bits_retain(parser.get_unsigned()?))
    }

    /// The visibility value (0 to 7)
    #[must_use]
    pub fn visibility(&self) -> u32 {
        self.bits() & TYPE_VISIBILITY_MASK
    }

    /// True if the visibility is one of the nested kinds
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.visibility() >= Self::NESTED_PUBLIC.bits()
    }

    /// True for interfaces
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.contains(Self::INTERFACE)
    }
}
