//! Embedded reflection metadata.
//!
//! NativeAOT keeps a compact, NativeFormat-encoded copy of the managed metadata of every type
//! and method that is visible to reflection or stack traces. The blob starts with a signature,
//! followed by the collection of scope definitions; everything else is reached by following
//! handles from there.
//!
//! # Key Components
//!
//! - [`crate::metadata::Handle`] / [`crate::metadata::HandleType`] - Tagged references between records
//! - [`crate::metadata::TypedHandle`] - Refinements such as [`crate::metadata::TypeDefinitionHandle`]
//! - [`crate::metadata::HandleCollection`] / [`crate::metadata::PrimitiveCollection`] - Inline lists
//! - [`crate::metadata::records`] - Typed records for scopes, namespaces, types and methods
//! - [`crate::metadata::schema`] - Layout table and generic decoder for the remaining kinds
//! - [`crate::metadata::MetadataReader`] - Blob entry point with name resolution
//!
//! # Examples
//!
//! ```rust,no_run
//! use aotscope::AotObject;
//! use std::path::Path;
//!
//! let object = AotObject::from_file(Path::new("app.exe"))?;
//! let metadata = object.metadata()?;
//! for scope in metadata.scope_definitions().iter()? {
//!     let scope = metadata.scope_definition(scope?)?;
//!     println!("{} {:?}", metadata.string(scope.name)?, scope.version());
//! }
//! # Ok::<(), aotscope::Error>(())
//! ```

mod collection;
pub mod flags;
pub mod handle;
mod primitives;
mod reader;
pub mod records;
pub mod schema;

pub use collection::{
    ByteCollection, HandleCollection, HandleCollectionIter, PrimitiveCollection,
    PrimitiveCollectionIter,
};
pub use handle::{
    ConstantStringArrayHandle, ConstantStringValueHandle, CustomAttributeHandle, DecodeHandle,
    EventHandle, FieldHandle, GenericParameterHandle, Handle, HandleType, MethodHandle,
    MethodSignatureHandle, NamespaceDefinitionHandle, NamespaceReferenceHandle, ParameterHandle,
    PropertyHandle, QualifiedMethodHandle, ScopeDefinitionHandle, ScopeReferenceHandle,
    TypeDefinitionHandle, TypeForwarderHandle, TypeReferenceHandle, TypeSpecificationHandle,
    TypedHandle,
};
pub use primitives::{read_string, MetadataPrimitive};
pub use reader::{MetadataReader, METADATA_SIGNATURE};
pub use records::Record;
