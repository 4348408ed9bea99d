//! Consumers of the reflection mapping tables.
//!
//! The compiler emits several hashtables that tie runtime artifacts (`MethodTable` addresses,
//! method bodies) back to metadata handles. Combined with the external reference table and the
//! embedded metadata they recover type and method names for compiled code.
//!
//! # Key Components
//!
//! - [`crate::mappings::TypeMap`] - `MethodTable` to type definition
//! - [`crate::mappings::InvokeMap`] - Reflection-invokable methods and their entry points
//! - [`crate::mappings::StackTraceMap`] - Method bodies to stack trace names
//! - [`crate::mappings::resolve_entry_points`] - Named entry points from all three sources
//!
//! # Examples
//!
//! ```rust,no_run
//! use aotscope::AotObject;
//! use std::path::Path;
//!
//! let object = AotObject::from_file(Path::new("app.exe"))?;
//! for entry in object.method_entry_points()? {
//!     println!("0x{:x} {}", entry.address, entry);
//! }
//! # Ok::<(), aotscope::Error>(())
//! ```

mod invokemap;
mod stacktrace;
mod typemap;

use std::{fmt, sync::Arc};

pub use invokemap::{
    CallingConvention, InvokeMap, InvokeMapEntry, InvokeTableFlags, CALLING_CONVENTION_MASK,
};
pub use stacktrace::{StackTraceDataCommand, StackTraceEntries, StackTraceEntry, StackTraceMap};
pub use typemap::{TypeMap, TypeMapEntry};

use crate::{
    image::Image,
    metadata::{MetadataReader, MethodHandle, TypeDefinitionHandle},
    Result,
};

/// A compiled method with its resolved names.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MethodEntryPoint {
    /// Address of the method body
    pub address: u64,
    /// The method record
    pub method: MethodHandle,
    /// Method name
    pub name: Arc<str>,
    /// The declaring type definition, if the type map knows it
    pub declaring_type: Option<TypeDefinitionHandle>,
    /// Namespace-qualified name of the declaring type
    pub type_name: Option<String>,
}

impl fmt::Display for MethodEntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.type_name {
            Some(type_name) => write!(f, "{type_name}::{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Names every invoke map entry that carries a method handle.
///
/// The declaring type is reduced to its generic definition, looked up in the type map and
/// named from `metadata`. Entries without a method handle are skipped; a declaring type the
/// type map does not know leaves `type_name` empty.
///
/// # Errors
///
/// Propagates decoding errors from any of the tables.
pub fn resolve_entry_points(
    image: &Image,
    invoke_map: &InvokeMap<'_>,
    type_map: &TypeMap<'_>,
    metadata: &MetadataReader<'_>,
) -> Result<Vec<MethodEntryPoint>> {
    let mut entry_points = Vec::new();

    for entry in invoke_map.entries() {
        let entry = entry?;
        let Some(method) = entry.method else {
            continue;
        };

        let declaring_type = match entry.declaring_type {
            Some(runtime_type) => type_map.lookup(runtime_type.type_definition(image)?)?,
            None => None,
        };
        let type_name = declaring_type
            .map(|handle| metadata.full_type_name(handle))
            .transpose()?;

        entry_points.push(MethodEntryPoint {
            address: entry.entry_point,
            method,
            name: metadata.method_name(method)?,
            declaring_type,
            type_name,
        });
    }

    tracing::debug!("Resolved {} method entry points", entry_points.len());
    Ok(entry_points)
}
