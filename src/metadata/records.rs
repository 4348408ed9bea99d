//! Typed metadata records.
//!
//! Each record is a fixed sequence of fields read through one [`NativeParser`] positioned at the
//! handle's offset. The field order is the on-disk order and must not change.

use crate::{
    metadata::{
        collection::{ByteCollection, HandleCollection},
        flags::{
            AssemblyFlags, AssemblyHashAlgorithm, MethodAttributes, MethodImplAttributes,
            TypeAttributes,
        },
        handle::{
            ConstantStringValueHandle, CustomAttributeHandle, DecodeHandle, EventHandle,
            FieldHandle, GenericParameterHandle, Handle, MethodHandle, MethodSignatureHandle,
            NamespaceDefinitionHandle, ParameterHandle, PropertyHandle, QualifiedMethodHandle,
            ScopeDefinitionHandle, TypeDefinitionHandle, TypeForwarderHandle,
            TypeReferenceHandle, TypedHandle,
        },
        primitives::{read_string, MetadataPrimitive},
    },
    nativeformat::{NativeParser, NativeReader},
    Result,
};

/// A record that can be decoded from its typed handle.
pub trait Record<'a>: Sized {
    /// The handle kind pointing at this record
    type Handle: TypedHandle;

    /// Decodes the record at `handle`.
    ///
    /// # Errors
    ///
    /// Propagates any field decoding error.
    fn read(reader: NativeReader<'a>, handle: Self::Handle) -> Result<Self>;
}

/// An assembly and its single module.
#[derive(Debug, Clone)]
pub struct ScopeDefinition<'a> {
    /// Handle this record was read from
    pub handle: ScopeDefinitionHandle,
    /// Assembly flags
    pub flags: AssemblyFlags,
    /// Assembly simple name
    pub name: ConstantStringValueHandle,
    /// Hash algorithm
    pub hash_algorithm: AssemblyHashAlgorithm,
    /// Version, major part
    pub major_version: u16,
    /// Version, minor part
    pub minor_version: u16,
    /// Version, build part
    pub build_number: u16,
    /// Version, revision part
    pub revision_number: u16,
    /// Public key blob
    pub public_key: ByteCollection<'a>,
    /// Culture name
    pub culture: ConstantStringValueHandle,
    /// The unnamed root namespace
    pub root_namespace_definition: NamespaceDefinitionHandle,
    /// Assembly entry point
    pub entry_point: QualifiedMethodHandle,
    /// The `<Module>` type
    pub global_module_type: TypeDefinitionHandle,
    /// Assembly-level attributes
    pub custom_attributes: HandleCollection<'a, CustomAttributeHandle>,
    /// Module file name
    pub module_name: ConstantStringValueHandle,
    /// Module version id bytes
    pub mvid: ByteCollection<'a>,
    /// Module-level attributes
    pub module_custom_attributes: HandleCollection<'a, CustomAttributeHandle>,
}

impl<'a> Record<'a> for ScopeDefinition<'a> {
    type Handle = ScopeDefinitionHandle;

    fn read(reader: NativeReader<'a>, handle: ScopeDefinitionHandle) -> Result<Self> {
        let mut parser = NativeParser::new(reader, handle.offset());
        Ok(ScopeDefinition {
            handle,
            flags: AssemblyFlags::read(&mut parser)?,
            name: ConstantStringValueHandle::decode(&mut parser)?,
            hash_algorithm: AssemblyHashAlgorithm::read(&mut parser)?,
            major_version: u16::read_field(&mut parser)?,
            minor_version: u16::read_field(&mut parser)?,
            build_number: u16::read_field(&mut parser)?,
            revision_number: u16::read_field(&mut parser)?,
            public_key: ByteCollection::read(&mut parser)?,
            culture: ConstantStringValueHandle::decode(&mut parser)?,
            root_namespace_definition: NamespaceDefinitionHandle::decode(&mut parser)?,
            entry_point: QualifiedMethodHandle::decode(&mut parser)?,
            global_module_type: TypeDefinitionHandle::decode(&mut parser)?,
            custom_attributes: HandleCollection::read(&mut parser)?,
            module_name: ConstantStringValueHandle::decode(&mut parser)?,
            mvid: ByteCollection::read(&mut parser)?,
            module_custom_attributes: HandleCollection::read(&mut parser)?,
        })
    }
}

impl ScopeDefinition<'_> {
    /// The module version id, if the blob holds exactly 16 bytes.
    ///
    /// # Errors
    ///
    /// Propagates reader errors.
    pub fn mvid(&self) -> Result<Option<uguid::Guid>> {
        let bytes = self.mvid.to_vec()?;
        Ok(<[u8; 16]>::try_from(bytes.as_slice())
            .ok()
            .map(uguid::Guid::from_bytes))
    }

    /// The `major.minor.build.revision` version
    #[must_use]
    pub fn version(&self) -> (u16, u16, u16, u16) {
        (
            self.major_version,
            self.minor_version,
            self.build_number,
            self.revision_number,
        )
    }
}

/// A namespace inside a scope.
#[derive(Debug, Clone)]
pub struct NamespaceDefinition<'a> {
    /// Handle this record was read from
    pub handle: NamespaceDefinitionHandle,
    /// The owning scope definition (for root namespaces) or namespace definition
    pub parent_scope_or_namespace: Handle,
    /// Last segment of the namespace name; null for the root namespace
    pub name: ConstantStringValueHandle,
    /// Types declared directly in this namespace
    pub type_definitions: HandleCollection<'a, TypeDefinitionHandle>,
    /// Types forwarded from this namespace
    pub type_forwarders: HandleCollection<'a, TypeForwarderHandle>,
    /// Child namespaces
    pub namespace_definitions: HandleCollection<'a, NamespaceDefinitionHandle>,
}

impl<'a> Record<'a> for NamespaceDefinition<'a> {
    type Handle = NamespaceDefinitionHandle;

    fn read(reader: NativeReader<'a>, handle: NamespaceDefinitionHandle) -> Result<Self> {
        let mut parser = NativeParser::new(reader, handle.offset());
        Ok(NamespaceDefinition {
            handle,
            parent_scope_or_namespace: Handle::read(&mut parser)?,
            name: ConstantStringValueHandle::decode(&mut parser)?,
            type_definitions: HandleCollection::read(&mut parser)?,
            type_forwarders: HandleCollection::read(&mut parser)?,
            namespace_definitions: HandleCollection::read(&mut parser)?,
        })
    }
}

/// A type declared in this module.
#[derive(Debug, Clone)]
pub struct TypeDefinition<'a> {
    /// Handle this record was read from
    pub handle: TypeDefinitionHandle,
    /// Type attributes
    pub flags: TypeAttributes,
    /// Base type: a definition, reference or specification, or null
    pub base_type: Handle,
    /// Declaring namespace
    pub namespace_definition: NamespaceDefinitionHandle,
    /// Simple name
    pub name: ConstantStringValueHandle,
    /// Explicit class size
    pub size: u32,
    /// Explicit packing size
    pub packing_size: u16,
    /// Enclosing type for nested types
    pub enclosing_type: TypeDefinitionHandle,
    /// Nested types
    pub nested_types: HandleCollection<'a, TypeDefinitionHandle>,
    /// Methods
    pub methods: HandleCollection<'a, MethodHandle>,
    /// Fields
    pub fields: HandleCollection<'a, FieldHandle>,
    /// Properties
    pub properties: HandleCollection<'a, PropertyHandle>,
    /// Events
    pub events: HandleCollection<'a, EventHandle>,
    /// Generic parameters
    pub generic_parameters: HandleCollection<'a, GenericParameterHandle>,
    /// Implemented interfaces (definitions, references or specifications)
    pub interfaces: HandleCollection<'a, Handle>,
    /// Custom attributes
    pub custom_attributes: HandleCollection<'a, CustomAttributeHandle>,
}

impl<'a> Record<'a> for TypeDefinition<'a> {
    type Handle = TypeDefinitionHandle;

    fn read(reader: NativeReader<'a>, handle: TypeDefinitionHandle) -> Result<Self> {
        let mut parser = NativeParser::new(reader, handle.offset());
        Ok(TypeDefinition {
            handle,
            flags: TypeAttributes::read(&mut parser)?,
            base_type: Handle::read(&mut parser)?,
            namespace_definition: NamespaceDefinitionHandle::decode(&mut parser)?,
            name: ConstantStringValueHandle::decode(&mut parser)?,
            size: u32::read_field(&mut parser)?,
            packing_size: u16::read_field(&mut parser)?,
            enclosing_type: TypeDefinitionHandle::decode(&mut parser)?,
            nested_types: HandleCollection::read(&mut parser)?,
            methods: HandleCollection::read(&mut parser)?,
            fields: HandleCollection::read(&mut parser)?,
            properties: HandleCollection::read(&mut parser)?,
            events: HandleCollection::read(&mut parser)?,
            generic_parameters: HandleCollection::read(&mut parser)?,
            interfaces: HandleCollection::read(&mut parser)?,
            custom_attributes: HandleCollection::read(&mut parser)?,
        })
    }
}

/// A method declared on a [`TypeDefinition`].
#[derive(Debug, Clone)]
pub struct Method<'a> {
    /// Handle this record was read from
    pub handle: MethodHandle,
    /// Method attributes
    pub flags: MethodAttributes,
    /// Implementation attributes
    pub impl_flags: MethodImplAttributes,
    /// Name
    pub name: ConstantStringValueHandle,
    /// Signature
    pub signature: MethodSignatureHandle,
    /// Parameters
    pub parameters: HandleCollection<'a, ParameterHandle>,
    /// Generic parameters
    pub generic_parameters: HandleCollection<'a, GenericParameterHandle>,
    /// Custom attributes
    pub custom_attributes: HandleCollection<'a, CustomAttributeHandle>,
}

impl<'a> Record<'a> for Method<'a> {
    type Handle = MethodHandle;

    fn read(reader: NativeReader<'a>, handle: MethodHandle) -> Result<Self> {
        let mut parser = NativeParser::new(reader, handle.offset());
        Ok(Method {
            handle,
            flags: MethodAttributes::read(&mut parser)?,
            impl_flags: MethodImplAttributes::read(&mut parser)?,
            name: ConstantStringValueHandle::decode(&mut parser)?,
            signature: MethodSignatureHandle::decode(&mut parser)?,
            parameters: HandleCollection::read(&mut parser)?,
            generic_parameters: HandleCollection::read(&mut parser)?,
            custom_attributes: HandleCollection::read(&mut parser)?,
        })
    }
}

/// A method together with the type that declares it.
#[derive(Debug, Clone, Copy)]
pub struct QualifiedMethod {
    /// Handle this record was read from
    pub handle: QualifiedMethodHandle,
    /// The method
    pub method: MethodHandle,
    /// Its declaring type
    pub enclosing_type: TypeDefinitionHandle,
}

impl<'a> Record<'a> for QualifiedMethod {
    type Handle = QualifiedMethodHandle;

    fn read(reader: NativeReader<'a>, handle: QualifiedMethodHandle) -> Result<Self> {
        let mut parser = NativeParser::new(reader, handle.offset());
        Ok(QualifiedMethod {
            handle,
            method: MethodHandle::decode(&mut parser)?,
            enclosing_type: TypeDefinitionHandle::decode(&mut parser)?,
        })
    }
}

/// A reference to a type in another scope.
#[derive(Debug, Clone, Copy)]
pub struct TypeReference {
    /// Handle this record was read from
    pub handle: TypeReferenceHandle,
    /// A namespace reference, or a type reference for nested types
    pub parent_namespace_or_type: Handle,
    /// Simple name
    pub type_name: ConstantStringValueHandle,
}

impl<'a> Record<'a> for TypeReference {
    type Handle = TypeReferenceHandle;

    fn read(reader: NativeReader<'a>, handle: TypeReferenceHandle) -> Result<Self> {
        let mut parser = NativeParser::new(reader, handle.offset());
        Ok(TypeReference {
            handle,
            parent_namespace_or_type: Handle::read(&mut parser)?,
            type_name: ConstantStringValueHandle::decode(&mut parser)?,
        })
    }
}

/// A string constant. Names of every other record point here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantStringValue {
    /// Handle this record was read from
    pub handle: ConstantStringValueHandle,
    /// Decoded text; empty for the null handle
    pub value: String,
}

impl<'a> Record<'a> for ConstantStringValue {
    type Handle = ConstantStringValueHandle;

    fn read(reader: NativeReader<'a>, handle: ConstantStringValueHandle) -> Result<Self> {
        if handle.is_null() {
            return Ok(ConstantStringValue {
                handle,
                value: String::new(),
            });
        }

        let mut parser = NativeParser::new(reader, handle.offset());
        Ok(ConstantStringValue {
            handle,
            value: read_string(&mut parser)?,
        })
    }
}
