//! Section identifiers of the module header.
//!
//! Ids 100 to 299 are regular ReadyToRun sections. Ids 300 to 399 are reserved for the
//! read-only blobs of [`ReflectionMapBlob`], stored at `300 + blob id`.

use strum::{Display, EnumIter, FromRepr};

/// A section of the module header table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, EnumIter, FromRepr)]
#[repr(u32)]
#[allow(missing_docs)]
pub enum ReadyToRunSectionType {
    CompilerIdentifier = 100,
    ImportSections = 101,
    RuntimeFunctions = 102,
    MethodDefEntryPoints = 103,
    ExceptionInfo = 104,
    DebugInfo = 105,
    DelayLoadMethodCallThunks = 106,
    AvailableTypes = 108,
    InstanceMethodEntryPoints = 109,
    InliningInfo = 110,
    ProfileDataInfo = 111,
    ManifestMetadata = 112,
    AttributePresence = 113,
    InliningInfo2 = 114,
    ComponentAssemblies = 115,
    OwnerCompositeExecutable = 116,
    PgoInstrumentationData = 117,
    ManifestAssemblyMvids = 118,
    CrossModuleInlineInfo = 119,
    HotColdMap = 120,
    MethodIsGenericMap = 121,
    EnclosingTypeMap = 122,
    TypeGenericInfoMap = 123,

    StringTable = 200,
    GCStaticRegion = 201,
    ThreadStaticRegion = 202,
    TypeManagerIndirection = 204,
    EagerCctor = 205,
    FrozenObjectRegion = 206,
    DehydratedData = 207,
    ThreadStaticOffsetRegion = 208,
    ImportAddressTables = 212,
    ModuleInitializerList = 213,

    ReadonlyBlobRegionStart = 300,
    ReadonlyBlobRegionEnd = 399,
}

impl From<ReadyToRunSectionType> for u32 {
    fn from(section: ReadyToRunSectionType) -> Self {
        section as u32
    }
}

/// A read-only blob, with its section id already offset by 300.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, EnumIter, FromRepr)]
#[repr(u32)]
#[allow(missing_docs)]
pub enum ReflectionMapBlob {
    TypeMap = 301,
    ArrayMap = 302,
    PointerTypeMap = 303,
    FunctionPointerTypeMap = 304,
    InvokeMap = 306,
    VirtualInvokeMap = 307,
    CommonFixupsTable = 308,
    FieldAccessMap = 309,
    CCtorContextMap = 310,
    ByRefTypeMap = 311,
    EmbeddedMetadata = 313,
    UnboxingAndInstantiatingStubMap = 315,
    StructMarshallingStubMap = 316,
    DelegateMarshallingStubMap = 317,
    GenericVirtualMethodTable = 318,
    InterfaceGenericVirtualMethodTable = 319,
    TypeTemplateMap = 321,
    GenericMethodsTemplateMap = 322,
    BlobIdResourceIndex = 324,
    BlobIdResourceData = 325,
    BlobIdStackTraceEmbeddedMetadata = 326,
    BlobIdStackTraceMethodRvaToTokenMapping = 327,
    NativeLayoutInfo = 330,
    NativeReferences = 331,
    GenericsHashtable = 332,
    NativeStatics = 333,
    StaticsInfoHashtable = 334,
    GenericMethodsHashtable = 335,
    ExactMethodInstantiationsHashtable = 336,
}

impl From<ReflectionMapBlob> for u32 {
    fn from(blob: ReflectionMapBlob) -> Self {
        blob as u32
    }
}

/// Human readable name of a raw section id, if it is a known one
#[must_use]
pub fn section_name(id: u32) -> Option<String> {
    ReadyToRunSectionType::from_repr(id)
        .map(|section| section.to_string())
        .or_else(|| ReflectionMapBlob::from_repr(id).map(|blob| blob.to_string()))
}
