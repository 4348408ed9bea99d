use crate::{
    image::Image,
    metadata::{Handle, HandleType, TypeDefinitionHandle, TypedHandle},
    nativeformat::{NativeHashtable, NativeParser},
    runtime::{ExternalReferencesTable, RuntimeTypeHandle},
    Result,
};

/// One element of the type map.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TypeMapEntry {
    /// The runtime type
    pub runtime_type: RuntimeTypeHandle,
    /// The metadata describing it, usually a type definition
    pub handle: Handle,
}

/// The `TypeMap` blob: runtime type handle to metadata handle.
///
/// Keys are the hash codes stored in each `MethodTable`; elements are an external reference
/// index followed by a raw handle.
#[derive(Clone, Copy, Debug)]
pub struct TypeMap<'a> {
    image: &'a Image,
    table: NativeHashtable<'a>,
    externals: ExternalReferencesTable<'a>,
}

impl<'a> TypeMap<'a> {
    /// Combines the type map hashtable with the external reference table it indexes into.
    #[must_use]
    pub fn new(
        image: &'a Image,
        table: NativeHashtable<'a>,
        externals: ExternalReferencesTable<'a>,
    ) -> TypeMap<'a> {
        TypeMap {
            image,
            table,
            externals,
        }
    }

    /// The type definition of `runtime_type`, if the map has one.
    ///
    /// Generic instantiations are not in the map; pass
    /// [`RuntimeTypeHandle::type_definition`] for those.
    ///
    /// # Errors
    ///
    /// Propagates hashtable, external reference and handle decoding errors.
    pub fn lookup(
        &self,
        runtime_type: RuntimeTypeHandle,
    ) -> Result<Option<TypeDefinitionHandle>> {
        let hash_code = runtime_type.hash_code(self.image)?;

        for parser in self.table.lookup(hash_code)? {
            let mut parser = parser?;
            let index = parser.get_unsigned()?;
            if self.externals.address(index)? != runtime_type.address() {
                continue;
            }

            let handle = Handle::from_raw(parser.get_unsigned()?)?;
            if handle.kind() == HandleType::TypeDefinition {
                return Ok(Some(TypeDefinitionHandle::from_handle_unchecked(handle)));
            }
        }

        Ok(None)
    }

    /// Every element of the map in table order.
    pub fn entries(&self) -> impl Iterator<Item = Result<TypeMapEntry>> + 'a {
        let externals = self.externals;
        self.table
            .all_entries()
            .map(move |parser| Self::entry(&externals, parser?))
    }

    fn entry(
        externals: &ExternalReferencesTable<'a>,
        mut parser: NativeParser<'a>,
    ) -> Result<TypeMapEntry> {
        let runtime_type = RuntimeTypeHandle(externals.address(parser.get_unsigned()?)?);
        let handle = Handle::from_raw(parser.get_unsigned()?)?;
        Ok(TypeMapEntry {
            runtime_type,
            handle,
        })
    }
}
