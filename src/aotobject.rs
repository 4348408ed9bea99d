//! The analysis context for a NativeAOT compiled module.
//!
//! [`AotObject`] loads a binary once, maps it into an [`Image`], locates the module header and
//! optionally rehydrates the dehydrated data section. Every other component is handed out as a
//! short-lived view that borrows from the object, so nothing is global and several objects can
//! be analysed side by side.
//!
//! # Examples
//!
//! ```rust,no_run
//! use aotscope::{AotObject, LoadConfig};
//! use std::path::Path;
//!
//! let object = AotObject::from_file_with_config(Path::new("app.exe"), LoadConfig::minimal())?;
//! let (major, minor) = object.header().version();
//! println!("Module header v{major}.{minor}");
//!
//! let metadata = object.metadata()?;
//! for handle in metadata.all_type_definitions()? {
//!     println!("{}", metadata.full_type_name(handle)?);
//! }
//! # Ok::<(), aotscope::Error>(())
//! ```

use std::{path::Path, sync::Arc};

use crate::{
    config::LoadConfig,
    dehydrated::{self, HydratedRegion},
    file::File,
    image::Image,
    mappings::{resolve_entry_points, InvokeMap, MethodEntryPoint, StackTraceMap, TypeMap},
    metadata::MetadataReader,
    nativeformat::{NativeHashtable, NativeParser, NativeReader},
    runtime::{
        ExternalReferencesTable, ModuleHeader, ModuleSection, ReadyToRunSectionType,
        ReflectionMapBlob,
    },
    Error, Result,
};

/// A loaded NativeAOT module.
///
/// Owns the address space and the module header. The views returned by the accessors borrow
/// from the object; a [`MetadataReader`] caches decoded strings, so keep one around instead of
/// calling [`AotObject::metadata`] repeatedly.
pub struct AotObject {
    /// The input the image was mapped from, `None` for synthetic images
    file: Option<Arc<File>>,
    image: Image,
    header: ModuleHeader,
    config: LoadConfig,
    hydrated: Option<HydratedRegion>,
}

impl AotObject {
    /// Loads a binary from disk with the default [`LoadConfig`].
    ///
    /// # Errors
    ///
    /// Returns file, format and header errors; see [`AotObject::from_image`].
    pub fn from_file(file: &Path) -> Result<Self> {
        Self::from_file_with_config(file, LoadConfig::default())
    }

    /// Loads a binary from disk.
    ///
    /// # Errors
    ///
    /// Returns file, format and header errors; see [`AotObject::from_image`].
    pub fn from_file_with_config(file: &Path, config: LoadConfig) -> Result<Self> {
        Self::load(Arc::new(File::from_file(file)?), config)
    }

    /// Loads a binary from a memory buffer with the default [`LoadConfig`].
    ///
    /// # Errors
    ///
    /// Returns format and header errors; see [`AotObject::from_image`].
    pub fn from_mem(data: Vec<u8>) -> Result<Self> {
        Self::from_mem_with_config(data, LoadConfig::default())
    }

    /// Loads a binary from a memory buffer.
    ///
    /// # Errors
    ///
    /// Returns format and header errors; see [`AotObject::from_image`].
    pub fn from_mem_with_config(data: Vec<u8>, config: LoadConfig) -> Result<Self> {
        Self::load(Arc::new(File::from_mem(data)?), config)
    }

    fn load(file: Arc<File>, config: LoadConfig) -> Result<Self> {
        let image = Image::from_file(&file)?;
        let mut object = Self::from_image(image, config)?;
        object.file = Some(file);
        Ok(object)
    }

    /// Builds the object over an already mapped address space.
    ///
    /// A failed automatic rehydration does not fail the load: it is logged and
    /// [`AotObject::hydrated`] stays `None`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BadFormat`] if the image holds no module header.
    pub fn from_image(image: Image, config: LoadConfig) -> Result<Self> {
        let header = ModuleHeader::locate(&image, &config)?;
        tracing::info!(
            "Loaded module header at 0x{:x} with {} sections",
            header.address(),
            header.sections().len()
        );

        let mut object = AotObject {
            file: None,
            image,
            header,
            config,
            hydrated: None,
        };

        if object.config.rehydrate {
            match object.rehydrate() {
                Ok(region) => tracing::info!(
                    "Rehydrated 0x{:x} bytes at 0x{:x}, {} pointer slots",
                    region.len,
                    region.start,
                    region.pointers.len()
                ),
                Err(error) => tracing::warn!("Rehydration failed: {}", error),
            }
        }

        Ok(object)
    }

    /// The input file, if the object was loaded from one
    #[must_use]
    pub fn file(&self) -> Option<&File> {
        self.file.as_deref()
    }

    /// The mapped address space
    #[must_use]
    pub fn image(&self) -> &Image {
        &self.image
    }

    /// The module header
    #[must_use]
    pub fn header(&self) -> &ModuleHeader {
        &self.header
    }

    /// The configuration the object was loaded with
    #[must_use]
    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// The section with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SectionNotFound`] if the header has no such row.
    pub fn section(&self, id: impl Into<u32>) -> Result<&ModuleSection> {
        self.header.find_section(id)
    }

    /// A reader over the section with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SectionNotFound`] or [`crate::Error::Unmapped`].
    pub fn section_reader(&self, id: impl Into<u32>) -> Result<NativeReader<'_>> {
        self.section(id)?.reader(&self.image)
    }

    /// The hashtable stored at the start of the section with the given id.
    ///
    /// # Errors
    ///
    /// Returns section errors and hashtable header decoding errors.
    pub fn hashtable(&self, id: impl Into<u32>) -> Result<NativeHashtable<'_>> {
        NativeHashtable::new(NativeParser::new(self.section_reader(id)?, 0))
    }

    /// The `CommonFixupsTable` the reflection maps index into.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SectionNotFound`] or [`crate::Error::Unmapped`].
    pub fn external_references(&self) -> Result<ExternalReferencesTable<'_>> {
        let section = self.section(ReflectionMapBlob::CommonFixupsTable)?;
        ExternalReferencesTable::new(&self.image, section)
    }

    /// The embedded reflection metadata.
    ///
    /// # Errors
    ///
    /// Returns section errors and [`crate::Error::BadFormat`] for a bad metadata header.
    pub fn metadata(&self) -> Result<MetadataReader<'_>> {
        MetadataReader::new(self.section_reader(ReflectionMapBlob::EmbeddedMetadata)?)
    }

    /// The metadata stack trace names resolve against.
    ///
    /// Uses the dedicated stack trace metadata blob when the module has one, the embedded
    /// metadata otherwise.
    ///
    /// # Errors
    ///
    /// See [`AotObject::metadata`].
    pub fn stack_trace_metadata(&self) -> Result<MetadataReader<'_>> {
        match self.section(ReflectionMapBlob::BlobIdStackTraceEmbeddedMetadata) {
            Ok(section) => MetadataReader::new(section.reader(&self.image)?),
            Err(Error::SectionNotFound(_)) => self.metadata(),
            Err(error) => Err(error),
        }
    }

    /// The type map.
    ///
    /// # Errors
    ///
    /// Returns section and hashtable errors.
    pub fn type_map(&self) -> Result<TypeMap<'_>> {
        Ok(TypeMap::new(
            &self.image,
            self.hashtable(ReflectionMapBlob::TypeMap)?,
            self.external_references()?,
        ))
    }

    /// The invoke map.
    ///
    /// # Errors
    ///
    /// Returns section and hashtable errors.
    pub fn invoke_map(&self) -> Result<InvokeMap<'_>> {
        Ok(InvokeMap::new(
            self.hashtable(ReflectionMapBlob::InvokeMap)?,
            self.external_references()?,
        ))
    }

    /// The method body to stack trace name mapping.
    ///
    /// # Errors
    ///
    /// Returns section errors and [`crate::Error::OutOfRange`] for a truncated blob.
    pub fn stack_trace_map(&self) -> Result<StackTraceMap<'_>> {
        StackTraceMap::new(
            self.section_reader(ReflectionMapBlob::BlobIdStackTraceMethodRvaToTokenMapping)?,
        )
    }

    /// The rehydrated region, if rehydration ran and succeeded
    #[must_use]
    pub fn hydrated(&self) -> Option<&HydratedRegion> {
        self.hydrated.as_ref()
    }

    /// Rehydrates the dehydrated data section into the image.
    ///
    /// Runs at most once; later calls return the region from the first success.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SectionNotFound`] for modules without dehydrated data, the
    /// decoding errors of [`crate::dehydrated::decode`] and [`crate::Error::RegionOverlap`].
    pub fn rehydrate(&mut self) -> Result<&HydratedRegion> {
        let region = match self.hydrated.take() {
            Some(region) => region,
            None => {
                let section = *self.section(ReadyToRunSectionType::DehydratedData)?;
                dehydrated::rehydrate(&mut self.image, &section, &self.config)?
            }
        };
        Ok(self.hydrated.insert(region))
    }

    /// Every reflection-invokable method with a metadata handle, named through the type map
    /// and the embedded metadata.
    ///
    /// # Errors
    ///
    /// Returns the errors of the invoke map, type map and metadata accessors.
    pub fn method_entry_points(&self) -> Result<Vec<MethodEntryPoint>> {
        let metadata = self.metadata()?;
        resolve_entry_points(
            &self.image,
            &self.invoke_map()?,
            &self.type_map()?,
            &metadata,
        )
    }
}
