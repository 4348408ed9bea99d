use std::{
    collections::{HashSet, VecDeque},
    sync::Arc,
};

use dashmap::DashMap;

use crate::{
    metadata::{
        collection::HandleCollection,
        handle::{
            ConstantStringValueHandle, Handle, HandleType, MethodHandle, NamespaceDefinitionHandle,
            QualifiedMethodHandle, ScopeDefinitionHandle, TypeDefinitionHandle, TypeReferenceHandle,
            TypedHandle,
        },
        primitives::read_string,
        records::{
            Method, NamespaceDefinition, QualifiedMethod, Record, ScopeDefinition,
            TypeDefinition, TypeReference,
        },
        schema::RawRecord,
    },
    nativeformat::{NativeParser, NativeReader},
    Result,
};

/// Signature at offset 0 of every metadata blob
pub const METADATA_SIGNATURE: u32 = 0xDEAD_DFFD;

/// Longest namespace or enclosing-type chain followed before the blob is considered cyclic
const MAX_NESTING: usize = 256;

/// Entry point for the embedded metadata of a module.
///
/// Holds the blob reader, the scope definition collection that follows the signature, and a
/// cache of decoded strings. Names are decoded once and then shared as `Arc<str>`; the cache is
/// safe to use from several threads.
///
/// # Examples
///
/// ```rust,no_run
/// use aotscope::AotObject;
/// use std::path::Path;
///
/// let object = AotObject::from_file(Path::new("app.exe"))?;
/// let metadata = object.metadata()?;
/// for handle in metadata.all_type_definitions()? {
///     println!("{}", metadata.full_type_name(handle)?);
/// }
/// # Ok::<(), aotscope::Error>(())
/// ```
pub struct MetadataReader<'a> {
    reader: NativeReader<'a>,
    scope_definitions: HandleCollection<'a, ScopeDefinitionHandle>,
    strings: DashMap<u32, Arc<str>>,
}

impl<'a> MetadataReader<'a> {
    /// Validates the blob signature and reads the scope definition collection.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BadFormat`] if the signature does not match, and propagates
    /// reader errors for truncated blobs.
    pub fn new(reader: NativeReader<'a>) -> Result<MetadataReader<'a>> {
        let signature = reader.read_u32(0)?;
        if signature != METADATA_SIGNATURE {
            return Err(bad_format_error!(
                "Invalid metadata signature 0x{:08x} at 0x{:x}",
                signature,
                reader.base()
            ));
        }

        let mut parser = NativeParser::new(reader, 4);
        let scope_definitions = HandleCollection::read(&mut parser)?;

        Ok(MetadataReader {
            reader,
            scope_definitions,
            strings: DashMap::new(),
        })
    }

    /// The reader over the whole blob
    #[must_use]
    pub fn reader(&self) -> NativeReader<'a> {
        self.reader
    }

    /// Scope definitions (one per assembly compiled into the module)
    #[must_use]
    pub fn scope_definitions(&self) -> HandleCollection<'a, ScopeDefinitionHandle> {
        self.scope_definitions
    }

    /// Decodes the record `handle` points at.
    ///
    /// # Errors
    ///
    /// Propagates record decoding errors.
    pub fn get<R: Record<'a>>(&self, handle: R::Handle) -> Result<R> {
        R::read(self.reader, handle)
    }

    /// See [`ScopeDefinition`]
    ///
    /// # Errors
    ///
    /// Propagates record decoding errors.
    pub fn scope_definition(&self, handle: ScopeDefinitionHandle) -> Result<ScopeDefinition<'a>> {
        self.get(handle)
    }

    /// See [`NamespaceDefinition`]
    ///
    /// # Errors
    ///
    /// Propagates record decoding errors.
    pub fn namespace_definition(
        &self,
        handle: NamespaceDefinitionHandle,
    ) -> Result<NamespaceDefinition<'a>> {
        self.get(handle)
    }

    /// See [`TypeDefinition`]
    ///
    /// # Errors
    ///
    /// Propagates record decoding errors.
    pub fn type_definition(&self, handle: TypeDefinitionHandle) -> Result<TypeDefinition<'a>> {
        self.get(handle)
    }

    /// See [`Method`]
    ///
    /// # Errors
    ///
    /// Propagates record decoding errors.
    pub fn method(&self, handle: MethodHandle) -> Result<Method<'a>> {
        self.get(handle)
    }

    /// See [`QualifiedMethod`]
    ///
    /// # Errors
    ///
    /// Propagates record decoding errors.
    pub fn qualified_method(&self, handle: QualifiedMethodHandle) -> Result<QualifiedMethod> {
        self.get(handle)
    }

    /// See [`TypeReference`]
    ///
    /// # Errors
    ///
    /// Propagates record decoding errors.
    pub fn type_reference(&self, handle: TypeReferenceHandle) -> Result<TypeReference> {
        self.get(handle)
    }

    /// Decodes any record kind with a tabled layout.
    ///
    /// # Errors
    ///
    /// See [`RawRecord::decode`].
    pub fn raw_record(&self, handle: Handle) -> Result<RawRecord<'a>> {
        RawRecord::decode(self.reader, handle)
    }

    /// The text of a string constant; the null handle is the empty string.
    ///
    /// # Errors
    ///
    /// Propagates reader errors from the first decode of this string.
    pub fn string(&self, handle: ConstantStringValueHandle) -> Result<Arc<str>> {
        if handle.is_null() {
            return Ok(Arc::from(""));
        }

        if let Some(cached) = self.strings.get(&handle.offset()) {
            return Ok(cached.clone());
        }

        let mut parser = NativeParser::new(self.reader, handle.offset());
        let value: Arc<str> = Arc::from(read_string(&mut parser)?);
        self.strings.insert(handle.offset(), value.clone());
        Ok(value)
    }

    /// Every type definition of every scope: namespaces breadth first, each type followed by
    /// its nested types.
    ///
    /// # Errors
    ///
    /// Propagates record decoding errors.
    pub fn all_type_definitions(&self) -> Result<Vec<TypeDefinitionHandle>> {
        let mut namespaces = VecDeque::new();
        for scope in self.scope_definitions.iter()? {
            let scope = self.scope_definition(scope?)?;
            if !scope.root_namespace_definition.is_null() {
                namespaces.push_back(scope.root_namespace_definition);
            }
        }

        let mut seen_namespaces = HashSet::new();
        let mut seen_types = HashSet::new();
        let mut types = Vec::new();
        while let Some(handle) = namespaces.pop_front() {
            if !seen_namespaces.insert(handle.offset()) {
                continue;
            }

            let namespace = self.namespace_definition(handle)?;
            for child in namespace.namespace_definitions.iter()? {
                let child = child?;
                if !child.is_null() {
                    namespaces.push_back(child);
                }
            }

            let mut pending: Vec<TypeDefinitionHandle> = Vec::new();
            for definition in namespace.type_definitions.iter()? {
                pending.push(definition?);
            }
            pending.reverse();

            while let Some(definition) = pending.pop() {
                if definition.is_null() || !seen_types.insert(definition.offset()) {
                    continue;
                }
                types.push(definition);

                let record = self.type_definition(definition)?;
                let mut nested = Vec::new();
                for inner in record.nested_types.iter()? {
                    nested.push(inner?);
                }
                pending.extend(nested.into_iter().rev());
            }
        }

        Ok(types)
    }

    /// The dotted name of a namespace, empty for a root namespace.
    ///
    /// # Errors
    ///
    /// Propagates record decoding errors; a cyclic parent chain is
    /// [`crate::Error::BadFormat`].
    pub fn namespace_name(&self, handle: NamespaceDefinitionHandle) -> Result<String> {
        let mut segments = Vec::new();
        let mut current = handle;

        for _ in 0..MAX_NESTING {
            if current.is_null() {
                break;
            }

            let namespace = self.namespace_definition(current)?;
            let name = self.string(namespace.name)?;
            if !name.is_empty() {
                segments.push(name);
            }

            let parent = namespace.parent_scope_or_namespace;
            if parent.kind() != HandleType::NamespaceDefinition {
                segments.reverse();
                return Ok(segments.join("."));
            }
            current = NamespaceDefinitionHandle::try_from(parent)?;
        }

        if current.is_null() {
            segments.reverse();
            return Ok(segments.join("."));
        }
        Err(bad_format_error!(
            "Namespace chain of 0x{:x} does not terminate",
            handle.offset()
        ))
    }

    /// The simple name of a type.
    ///
    /// # Errors
    ///
    /// Propagates record decoding errors.
    pub fn type_name(&self, handle: TypeDefinitionHandle) -> Result<Arc<str>> {
        let definition = self.type_definition(handle)?;
        self.string(definition.name)
    }

    /// The namespace-qualified name of a type, with nested types joined by `+`.
    ///
    /// # Errors
    ///
    /// Propagates record decoding errors; a cyclic enclosing chain is
    /// [`crate::Error::BadFormat`].
    pub fn full_type_name(&self, handle: TypeDefinitionHandle) -> Result<String> {
        let mut names = Vec::new();
        let mut current = self.type_definition(handle)?;

        for _ in 0..MAX_NESTING {
            names.push(self.string(current.name)?);
            if current.enclosing_type.is_null() {
                let namespace = self.namespace_name(current.namespace_definition)?;
                names.reverse();
                let nested = names.join("+");
                if namespace.is_empty() {
                    return Ok(nested);
                }
                return Ok(format!("{namespace}.{nested}"));
            }
            current = self.type_definition(current.enclosing_type)?;
        }

        Err(bad_format_error!(
            "Enclosing type chain of 0x{:x} does not terminate",
            handle.offset()
        ))
    }

    /// The name of a method.
    ///
    /// # Errors
    ///
    /// Propagates record decoding errors.
    pub fn method_name(&self, handle: MethodHandle) -> Result<Arc<str>> {
        let method = self.method(handle)?;
        self.string(method.name)
    }
}
