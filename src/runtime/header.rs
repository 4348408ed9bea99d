use std::fmt;

use memchr::memmem;

use crate::{
    config::LoadConfig,
    image::{Image, Region},
    nativeformat::NativeReader,
    runtime::sections::section_name,
    Error, Result,
};

/// `RTR\0`, the module header signature
pub const MODULE_HEADER_SIGNATURE: &[u8; 4] = b"RTR\0";

/// Size of the fixed part of the module header
pub const MODULE_HEADER_SIZE: u64 = 16;

/// Size of one section row when the header leaves `entry_size` at zero
pub const DEFAULT_ENTRY_SIZE: u64 = 24;

/// One row of the module section table.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ModuleSection {
    /// Section id, see [`crate::runtime::ReadyToRunSectionType`] and
    /// [`crate::runtime::ReflectionMapBlob`]
    pub id: u32,
    /// Section flags
    pub flags: u32,
    /// First address of the section
    pub start: u64,
    /// Address past the end of the section
    pub end: u64,
}

impl ModuleSection {
    /// Length in bytes, zero for inverted ranges
    #[must_use]
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// True if the section has no bytes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A reader over the section bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BadFormat`] for sections larger than 4 GiB and
    /// [`crate::Error::Unmapped`] if the section is not backed by the image.
    pub fn reader<'a>(&self, image: &'a Image) -> Result<NativeReader<'a>> {
        let size = u32::try_from(self.len())
            .map_err(|_| bad_format_error!("Section {} is too large", self.id))?;
        NativeReader::new(image, self.start, size)
    }
}

impl fmt::Display for ModuleSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match section_name(self.id) {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "Section{}", self.id),
        }?;
        write!(f, " [0x{:x}..0x{:x})", self.start, self.end)
    }
}

/// The NativeAOT module header and its section table.
#[derive(Clone, Debug)]
pub struct ModuleHeader {
    address: u64,
    major_version: u16,
    minor_version: u16,
    flags: u32,
    entry_size: u8,
    entry_type: u8,
    sections: Vec<ModuleSection>,
}

impl ModuleHeader {
    /// Finds and parses the module header.
    ///
    /// The region named by [`LoadConfig::header_section`] is searched first, then every
    /// region. The first signature followed by a plausible header with a fully mapped section
    /// table wins.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BadFormat`] if no valid header exists.
    pub fn locate(image: &Image, config: &LoadConfig) -> Result<ModuleHeader> {
        let preferred = config
            .header_section
            .as_deref()
            .and_then(|name| image.region(name));

        if let Some(region) = preferred {
            if let Some(header) = Self::scan(image, region) {
                return Ok(header);
            }
            tracing::debug!(
                "No module header in {}, scanning every region",
                region.name()
            );
        }

        for region in image.regions() {
            if preferred.is_some_and(|preferred| preferred.start() == region.start()) {
                continue;
            }
            if let Some(header) = Self::scan(image, region) {
                return Ok(header);
            }
        }

        Err(bad_format_error!("No module header found"))
    }

    fn scan(image: &Image, region: &Region) -> Option<ModuleHeader> {
        let finder = memmem::Finder::new(MODULE_HEADER_SIGNATURE);
        for position in finder.find_iter(region.data()) {
            let address = region.start() + position as u64;
            match Self::parse(image, address) {
                Ok(header) => {
                    tracing::debug!(
                        "Module header v{}.{} at 0x{:x} with {} sections",
                        header.major_version,
                        header.minor_version,
                        address,
                        header.sections.len()
                    );
                    return Some(header);
                }
                Err(error) => {
                    tracing::trace!("Rejected header candidate at 0x{:x}: {}", address, error);
                }
            }
        }
        None
    }

    /// Parses a header at `address` without searching.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BadFormat`] if the signature, entry size or section count is
    /// implausible, and [`crate::Error::Unmapped`] if the section table is not mapped.
    pub fn parse(image: &Image, address: u64) -> Result<ModuleHeader> {
        if image.read_bytes(address, 4)? != MODULE_HEADER_SIGNATURE {
            return Err(bad_format_error!("Missing module header signature at 0x{:x}", address));
        }

        let major_version = image.read_u16(address + 4)?;
        let minor_version = image.read_u16(address + 6)?;
        let flags = image.read_u32(address + 8)?;
        let count = image.read_u16(address + 12)?;
        let entry_size = image.read_u8(address + 14)?;
        let entry_type = image.read_u8(address + 15)?;

        let stride = match u64::from(entry_size) {
            0 => DEFAULT_ENTRY_SIZE,
            size if size < DEFAULT_ENTRY_SIZE => {
                return Err(bad_format_error!("Section entry size {} is too small", size));
            }
            size => size,
        };
        if count == 0 {
            return Err(bad_format_error!("Module header at 0x{:x} has no sections", address));
        }

        let rows = address + MODULE_HEADER_SIZE;
        let table_len = stride * u64::from(count);
        if !image.is_mapped(rows, table_len as usize) {
            return Err(unmapped_error!(rows, table_len as usize));
        }

        let mut sections = Vec::with_capacity(usize::from(count));
        for index in 0..u64::from(count) {
            let row = rows + index * stride;
            sections.push(ModuleSection {
                id: image.read_u32(row)?,
                flags: image.read_u32(row + 4)?,
                start: image.read_u64(row + 8)?,
                end: image.read_u64(row + 16)?,
            });
        }

        Ok(ModuleHeader {
            address,
            major_version,
            minor_version,
            flags,
            entry_size,
            entry_type,
            sections,
        })
    }

    /// Address of the signature
    #[must_use]
    pub fn address(&self) -> u64 {
        self.address
    }

    /// `(major, minor)` format version
    #[must_use]
    pub fn version(&self) -> (u16, u16) {
        (self.major_version, self.minor_version)
    }

    /// Header flags
    #[must_use]
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Declared row size (zero means the default of 24)
    #[must_use]
    pub fn entry_size(&self) -> u8 {
        self.entry_size
    }

    /// Declared row type
    #[must_use]
    pub fn entry_type(&self) -> u8 {
        self.entry_type
    }

    /// All rows in stored order
    #[must_use]
    pub fn sections(&self) -> &[ModuleSection] {
        &self.sections
    }

    /// The first row with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SectionNotFound`] if no row has that id.
    pub fn find_section(&self, id: impl Into<u32>) -> Result<&ModuleSection> {
        let id = id.into();
        self.sections
            .iter()
            .find(|section| section.id == id)
            .ok_or(Error::SectionNotFound(id))
    }
}
