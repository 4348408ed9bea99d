//! # aotscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the aotscope library. Import this module to get quick access to the essential
//! types for NativeAOT binary analysis.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all aotscope operations
pub use crate::Error;

/// The result type used throughout aotscope
pub use crate::Result;

/// Configuration for loading a module
pub use crate::LoadConfig;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Main entry point for NativeAOT binary analysis
pub use crate::AotObject;

/// Input containers and the mapped address space
pub use crate::{image::Region, File, Image};

// ================================================================================================
// NativeFormat
// ================================================================================================

/// Readers, parsers and hashtables over NativeFormat blobs
pub use crate::nativeformat::{NativeHashtable, NativeParser, NativeReader};

// ================================================================================================
// Runtime Structures
// ================================================================================================

/// Module header, sections and the tables they locate
pub use crate::runtime::{
    ExternalReferencesTable, ModuleHeader, ModuleSection, ReadyToRunSectionType,
    ReflectionMapBlob, RuntimeTypeHandle,
};

/// Rehydration results
pub use crate::dehydrated::{HydratedRegion, RehydratedData};

// ================================================================================================
// Metadata
// ================================================================================================

/// Handles and their kinds
pub use crate::metadata::{
    ConstantStringValueHandle, Handle, HandleType, MethodHandle, NamespaceDefinitionHandle,
    ScopeDefinitionHandle, TypeDefinitionHandle, TypedHandle,
};

/// The metadata reader and its collections
pub use crate::metadata::{HandleCollection, MetadataReader, PrimitiveCollection};

/// Typed records
pub use crate::metadata::records::{Method, NamespaceDefinition, ScopeDefinition, TypeDefinition};

/// Attribute flag sets
pub use crate::metadata::flags::{MethodAttributes, TypeAttributes};

// ================================================================================================
// Mapping Tables
// ================================================================================================

/// Reflection mapping tables and their entries
pub use crate::mappings::{
    InvokeMap, InvokeMapEntry, InvokeTableFlags, MethodEntryPoint, StackTraceEntry, StackTraceMap,
    TypeMap, TypeMapEntry,
};
