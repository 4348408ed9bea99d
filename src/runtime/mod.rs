//! Runtime structures of a NativeAOT module.
//!
//! Everything here is reached from the `RTR` module header: the section table that locates
//! every other blob, the external reference table that mapping tables index into, and the
//! `MethodTable`-backed [`RuntimeTypeHandle`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use aotscope::{runtime::ReflectionMapBlob, AotObject};
//! use std::path::Path;
//!
//! let object = AotObject::from_file(Path::new("app.exe"))?;
//! for section in object.header().sections() {
//!     println!("{section}");
//! }
//! let externals = object.external_references()?;
//! println!("{} external references", externals.count());
//! let type_map = object.header().find_section(ReflectionMapBlob::TypeMap)?;
//! println!("type map at 0x{:x}", type_map.start);
//! # Ok::<(), aotscope::Error>(())
//! ```

mod externals;
mod header;
mod sections;
mod typehandle;

pub use externals::ExternalReferencesTable;
pub use header::{
    ModuleHeader, ModuleSection, DEFAULT_ENTRY_SIZE, MODULE_HEADER_SIGNATURE, MODULE_HEADER_SIZE,
};
pub use sections::{section_name, ReadyToRunSectionType, ReflectionMapBlob};
pub use typehandle::{RuntimeTypeHandle, IS_GENERIC_FLAG};
