use std::fmt;

use crate::{image::Image, Result};

/// `MethodTable` flag marking an instantiated generic type
pub const IS_GENERIC_FLAG: u32 = 0x0200_0000;

/// Set when optional fields are stored as absolute pointers instead of relative ones
const HAS_ABSOLUTE_POINTERS: u32 = 0x0008_0000;

/// Flags that each add one optional slot in front of the generic definition
const OPTIONAL_SLOT_FLAGS: [u32; 4] = [0x0004_0000, 0x0010_0000, 0x0100_0000, 0x0040_0000];

const NUM_VTABLE_SLOTS_OFFSET: u64 = 0x10;
const NUM_INTERFACES_OFFSET: u64 = 0x12;
const HASH_CODE_OFFSET: u64 = 0x14;

/// A type as the runtime sees it: the address of its `MethodTable`.
///
/// Equality is address equality.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct RuntimeTypeHandle(pub u64);

impl RuntimeTypeHandle {
    /// Address of the `MethodTable`
    #[must_use]
    pub fn address(&self) -> u64 {
        self.0
    }

    /// The hash code stored in the `MethodTable`, used as the type map key.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unmapped`] if the `MethodTable` is not mapped.
    pub fn hash_code(&self, image: &Image) -> Result<u32> {
        image.read_u32(self.0 + HASH_CODE_OFFSET)
    }

    /// The `MethodTable` flags word.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unmapped`] if the `MethodTable` is not mapped.
    pub fn flags(&self, image: &Image) -> Result<u32> {
        image.read_u32(self.0)
    }

    /// True for instantiated generic types.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unmapped`] if the `MethodTable` is not mapped.
    pub fn is_generic(&self, image: &Image) -> Result<bool> {
        Ok(self.flags(image)? & IS_GENERIC_FLAG != 0)
    }

    /// The open generic type this instantiation was made from.
    ///
    /// The slot sits after the vtable and interface map, shifted by one slot for every optional
    /// field present. A set low bit marks an indirection cell.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unmapped`] if any part of the `MethodTable` chain is not mapped.
    pub fn generic_definition(&self, image: &Image) -> Result<RuntimeTypeHandle> {
        let flags = self.flags(image)?;
        let vtable_slots = u64::from(image.read_u16(self.0 + NUM_VTABLE_SLOTS_OFFSET)?);
        let interfaces = u64::from(image.read_u16(self.0 + NUM_INTERFACES_OFFSET)?);
        let optional = OPTIONAL_SLOT_FLAGS
            .iter()
            .filter(|flag| flags & **flag != 0)
            .count() as u64;

        if flags & HAS_ABSOLUTE_POINTERS == 0 {
            let slot = self.0 + (interfaces << 3) + (vtable_slots << 3) + 0x20 + optional * 4;
            let value = image.read_u32(slot)?;
            if value & 1 != 0 {
                let cell = slot.wrapping_add_signed(i64::from((value & !1) as i32));
                return Ok(RuntimeTypeHandle(image.read_u64(cell)?));
            }
            return Ok(RuntimeTypeHandle(
                slot.wrapping_add_signed(i64::from(value as i32)),
            ));
        }

        let slot = self.0 + (interfaces << 3) + (vtable_slots << 3) + 0x28 + optional * 8;
        let value = image.read_u64(slot)?;
        if value & 1 != 0 {
            return Ok(RuntimeTypeHandle(image.read_u64(value - 1)?));
        }
        Ok(RuntimeTypeHandle(value))
    }

    /// The generic definition for generic instantiations, the type itself otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unmapped`] if the `MethodTable` is not mapped.
    pub fn type_definition(&self, image: &Image) -> Result<RuntimeTypeHandle> {
        if self.is_generic(image)? {
            self.generic_definition(image)
        } else {
            Ok(*self)
        }
    }
}

impl fmt::Display for RuntimeTypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}
