//! Executable container abstraction for NativeAOT binaries.
//!
//! NativeAOT produces ordinary platform executables: PE/COFF images on Windows and ELF shared
//! objects or executables everywhere else. This module hides the container format behind a
//! single [`crate::file::File`] type whose only job is to describe which byte ranges of the
//! input become which virtual address ranges once the loader maps the image.
//!
//! # Key Components
//!
//! - [`crate::file::File`] - Parsed container (PE or ELF) over any [`crate::file::Backend`]
//! - [`crate::file::Backend`] - Trait for different data sources (disk files, memory buffers)
//! - [`crate::file::SectionMapping`] - One loadable section with its file and virtual extents
//! - [`crate::file::io`] - Little-endian primitive helpers shared by every decoder
//!
//! # Examples
//!
//! ```rust,no_run
//! use aotscope::File;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("app.exe"))?;
//! for section in file.sections() {
//!     println!("{:<8} 0x{:x} (+0x{:x})", section.name, section.address, section.virtual_size);
//! }
//! # Ok::<(), aotscope::Error>(())
//! ```

pub mod io;

mod memory;
mod physical;

use std::path::Path;

use crate::{
    Error::{Empty, GoblinErr, NotSupported},
    Result,
};
use goblin::{
    elf::section_header::{SHF_ALLOC, SHF_TLS, SHT_NOBITS},
    Object,
};
use memory::Memory;
use ouroboros::self_referencing;
use physical::Physical;

/// Backend trait for file data sources.
///
/// This trait abstracts over the source of executable data, allowing for both in-memory and
/// on-disk representations. All implementations must be thread-safe.
pub trait Backend: Send + Sync {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;
}

/// The container format of a loaded [`File`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// A PE/COFF image (Windows)
    Pe,
    /// An ELF image (Linux, FreeBSD, Android)
    Elf,
}

/// A loadable section of the container.
///
/// `address` is the absolute virtual address the section occupies once mapped at the preferred
/// image base. The first `file_size` bytes come from the file at `file_offset`; the remainder
/// up to `virtual_size` is zero-initialised memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMapping {
    /// Section name, e.g. `.rdata` or `.data`
    pub name: String,
    /// Absolute virtual address of the first byte
    pub address: u64,
    /// Size of the section once mapped
    pub virtual_size: u64,
    /// Offset of the initialised bytes in the file
    pub file_offset: usize,
    /// Number of initialised bytes present in the file
    pub file_size: usize,
}

#[self_referencing]
/// Represents a loaded NativeAOT executable.
///
/// The container is parsed once with goblin and kept alongside the backing data, so that
/// section enumeration and raw slicing never have to re-parse the headers.
///
/// # Examples
///
/// ```rust,no_run
/// use aotscope::File;
/// use std::fs;
///
/// let data = fs::read("app.so")?;
/// let file = File::from_mem(data)?;
/// println!("{:?} image based at 0x{:x}", file.format(), file.imagebase());
/// # Ok::<(), aotscope::Error>(())
/// ```
pub struct File {
    /// The underlying data source (memory or file).
    data: Box<dyn Backend>,
    /// The parsed container, referencing the data.
    #[borrows(data)]
    #[not_covariant]
    object: Object<'this>,
}

impl File {
    /// Loads an executable from the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is empty, or is neither PE nor ELF.
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Loads an executable from a memory buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is empty or is neither PE nor ELF.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);

        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let data = Box::new(data);

        File::try_new(data, |data| {
            let data = data.as_ref();
            match Object::parse(data.data()) {
                Ok(Object::PE(pe)) => Ok(Object::PE(pe)),
                Ok(Object::Elf(elf)) => Ok(Object::Elf(elf)),
                Ok(_) => Err(NotSupported),
                Err(error) => Err(GoblinErr(error)),
            }
        })
    }

    /// Returns the total size of the loaded file in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns true if the file has a length of zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the container format.
    #[must_use]
    pub fn format(&self) -> Format {
        self.with_object(|object| match object {
            Object::Elf(_) => Format::Elf,
            _ => Format::Pe,
        })
    }

    /// Returns true if the container is a PE/COFF image.
    #[must_use]
    pub fn is_pe(&self) -> bool {
        self.format() == Format::Pe
    }

    /// Returns the preferred load address.
    ///
    /// ELF section addresses are already absolute, so this is zero for ELF inputs.
    #[must_use]
    pub fn imagebase(&self) -> u64 {
        self.with_object(|object| match object {
            #[allow(clippy::useless_conversion)]
            Object::PE(pe) => u64::try_from(pe.image_base).unwrap_or(0),
            _ => 0,
        })
    }

    /// Returns every loadable section, sorted by address.
    ///
    /// PE sections are rebased onto [`File::imagebase`]. ELF sections are only reported when
    /// they carry `SHF_ALLOC`; thread-local `NOBITS` templates are skipped because their
    /// addresses alias ordinary data.
    #[must_use]
    pub fn sections(&self) -> Vec<SectionMapping> {
        let imagebase = self.imagebase();

        let mut sections = self.with_object(|object| match object {
            Object::PE(pe) => pe
                .sections
                .iter()
                .map(|section| {
                    let virtual_size = if section.virtual_size == 0 {
                        section.size_of_raw_data
                    } else {
                        section.virtual_size
                    };

                    SectionMapping {
                        name: section.name().unwrap_or_default().to_string(),
                        address: imagebase + u64::from(section.virtual_address),
                        virtual_size: u64::from(virtual_size),
                        file_offset: section.pointer_to_raw_data as usize,
                        file_size: section.size_of_raw_data.min(virtual_size) as usize,
                    }
                })
                .collect::<Vec<_>>(),
            Object::Elf(elf) => elf
                .section_headers
                .iter()
                .filter(|header| {
                    header.sh_flags & u64::from(SHF_ALLOC) != 0
                        && header.sh_addr != 0
                        && !(header.sh_type == SHT_NOBITS
                            && header.sh_flags & u64::from(SHF_TLS) != 0)
                })
                .map(|header| SectionMapping {
                    name: elf
                        .shdr_strtab
                        .get_at(header.sh_name)
                        .unwrap_or_default()
                        .to_string(),
                    address: header.sh_addr,
                    virtual_size: header.sh_size,
                    file_offset: header.sh_offset as usize,
                    file_size: if header.sh_type == SHT_NOBITS {
                        0
                    } else {
                        header.sh_size as usize
                    },
                })
                .collect::<Vec<_>>(),
            _ => Vec::new(),
        });

        sections.sort_by_key(|section| section.address);
        sections
    }

    /// Returns the raw file contents.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.with_data(|data| data.data())
    }

    /// Returns a bounds-checked slice of the raw file contents.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the file.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.with_data(|data| data.data_slice(offset, len))
    }
}
