// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # aotscope
//!
//! [![Crates.io](https://img.shields.io/crates/v/aotscope.svg)](https://crates.io/crates/aotscope)
//! [![Documentation](https://docs.rs/aotscope/badge.svg)](https://docs.rs/aotscope)
//! [![License](https://img.shields.io/badge/license-Apache--2.0-blue.svg)](https://github.com/BinFlip/aotscope/blob/main/LICENSE-APACHE)
//!
//! A cross-platform framework for reverse engineering .NET executables compiled ahead of time
//! with NativeAOT. Such binaries contain no CIL and no ECMA-335 metadata; what survives is a
//! compact NativeFormat encoding of reflection metadata, a set of mapping tables tying compiled
//! code back to it, and a compressed patch stream the runtime expands at startup.
//!
//! ## Features
//!
//! - **📦 Efficient memory access** - Memory-mapped input, zero-copy readers over the address space
//! - **🔍 NativeFormat decoding** - Varint codec, relative offsets and perfect hashtables
//! - **🧩 Reflection metadata** - Typed handles, collections and records with name resolution
//! - **🔧 Rehydration** - Offline replay of the `DehydratedData` patch stream
//! - **🗺️ Mapping tables** - Type map, invoke map and stack trace map consumers
//! - **🛡️ Memory safe** - Every read is bounds checked and reported through [`Error`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aotscope::prelude::*;
//!
//! let object = AotObject::from_file("app.exe".as_ref())?;
//! for entry in object.method_entry_points()? {
//!     println!("0x{:08x} {}", entry.address, entry);
//! }
//! # Ok::<(), aotscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`file`] - PE and ELF containers, memory-mapped or in memory
//! - [`image`] - The virtual address space every decoder reads from
//! - [`nativeformat`] - The NativeFormat primitives
//! - [`runtime`] - Module header, section table, external references and `MethodTable`s
//! - [`metadata`] - Embedded reflection metadata
//! - [`dehydrated`] - The `DehydratedData` patch engine
//! - [`mappings`] - Reflection mapping tables
//! - [`AotObject`] - Ties everything together for one loaded module
//!
//! ## Logging
//!
//! Loading and decoding emit [`tracing`] events. Install any subscriber to see them; without
//! one they cost nothing.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use aotscope::prelude::*;
///
/// let object = AotObject::from_file("app.exe".as_ref())?;
/// let metadata = object.metadata()?;
/// println!("{} types", metadata.all_type_definitions()?.len());
/// # Ok::<(), aotscope::Error>(())
/// ```
pub mod prelude;

pub mod file;

pub mod image;

pub mod nativeformat;

pub mod runtime;

pub mod metadata;

pub mod dehydrated;

pub mod mappings;

pub mod config;

mod aotobject;

/// `aotscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `aotscope` Error type
///
/// The main error type for all operations in this crate.
///
/// # Examples
///
/// ```rust,no_run
/// use aotscope::{AotObject, Error};
///
/// match AotObject::from_file(std::path::Path::new("app.exe")) {
///     Ok(object) => println!("{} sections", object.header().sections().len()),
///     Err(Error::NotSupported) => println!("Not a PE or ELF file"),
///     Err(Error::BadFormat { message, .. }) => println!("Not a NativeAOT module: {}", message),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;

/// Main entry point for working with NativeAOT binaries.
///
/// Loads a binary, locates its module header and hands out views over every table.
pub use aotobject::AotObject;

pub use config::LoadConfig;
pub use file::File;
pub use image::Image;
