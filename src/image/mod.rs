//! The byte-addressable address space of a loaded module.
//!
//! Every decoder in this crate works on absolute virtual addresses, exactly as the runtime sees
//! them once the operating system loader has mapped the executable. [`crate::Image`] models that
//! address space as a sorted set of non-overlapping, named [`crate::image::Region`]s. The initial
//! regions come from the container sections; rehydration later fills the reserved destination
//! section in place (or registers a fresh region when none is reserved) so that every consumer
//! reads both uniformly.
//!
//! # Examples
//!
//! ```rust
//! use aotscope::Image;
//!
//! let mut image = Image::new();
//! image.map_region(".rdata", 0x1000, b"RTR\0".to_vec())?;
//! image.allocate_region(".hydrated", 0x4000, 0x10)?[0] = 0xAA;
//!
//! assert_eq!(image.read_u32(0x1000)?, 0x0052_5452);
//! assert_eq!(image.read_u8(0x4000)?, 0xAA);
//! assert!(image.contains(0x400F));
//! assert!(!image.contains(0x4010));
//! # Ok::<(), aotscope::Error>(())
//! ```

use crate::{
    file::{
        io::{read_le, NativeIO},
        File,
    },
    Error::RegionOverlap,
    Result,
};

/// A named, contiguous range of the address space.
#[derive(Debug, Clone)]
pub struct Region {
    name: String,
    start: u64,
    data: Vec<u8>,
}

impl Region {
    /// Region name (section name, or the name given at allocation)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute address of the first byte
    #[must_use]
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Absolute address one past the last byte
    #[must_use]
    pub fn end(&self) -> u64 {
        self.start + self.data.len() as u64
    }

    /// Size in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the region has no bytes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Region contents
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// True if `address` lies within `[start, end)`
    #[must_use]
    pub fn contains(&self, address: u64) -> bool {
        address >= self.start && address < self.end()
    }

    fn slice(&self, address: u64, len: usize) -> Option<&[u8]> {
        let offset = usize::try_from(address.checked_sub(self.start)?).ok()?;
        let end = offset.checked_add(len)?;
        self.data.get(offset..end)
    }

    fn slice_mut(&mut self, address: u64, len: usize) -> Option<&mut [u8]> {
        let offset = usize::try_from(address.checked_sub(self.start)?).ok()?;
        let end = offset.checked_add(len)?;
        self.data.get_mut(offset..end)
    }
}

/// The address space of one analysed module.
///
/// Once construction and rehydration are finished the image is only ever read, so it can be
/// shared freely between threads.
#[derive(Debug, Clone, Default)]
pub struct Image {
    base: u64,
    regions: Vec<Region>,
}

impl Image {
    /// Creates an empty address space.
    #[must_use]
    pub fn new() -> Image {
        Image::default()
    }

    /// Maps every loadable section of `file` at its virtual address.
    ///
    /// Sections are mapped with their virtual size; bytes beyond the initialised file data are
    /// zero. Sections that collide with an already mapped one are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if a section's file range lies outside the file.
    pub fn from_file(file: &File) -> Result<Image> {
        let mut image = Image {
            base: file.imagebase(),
            regions: Vec::new(),
        };

        for section in file.sections() {
            let Ok(size) = usize::try_from(section.virtual_size) else {
                tracing::debug!("skipping oversized section {}", section.name);
                continue;
            };

            let mut data = vec![0u8; size];
            let initialised = section.file_size.min(size);
            if initialised > 0 {
                data[..initialised]
                    .copy_from_slice(file.data_slice(section.file_offset, initialised)?);
            }

            if let Err(error) = image.map_region(&section.name, section.address, data) {
                tracing::debug!("skipping section {}: {}", section.name, error);
            }
        }

        Ok(image)
    }

    /// Preferred load address of the container, zero for synthetic images.
    #[must_use]
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Registers `data` as a new region starting at `start`.
    ///
    /// Empty regions are accepted but never contain any address.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::RegionOverlap`] if the new range intersects an existing region
    /// or wraps past the end of the address space.
    pub fn map_region(&mut self, name: &str, start: u64, data: Vec<u8>) -> Result<()> {
        let size = data.len();
        let Some(end) = start.checked_add(size as u64) else {
            return Err(RegionOverlap { start, size });
        };

        let index = self.regions.partition_point(|region| region.start < start);
        let overlaps_previous = index > 0 && self.regions[index - 1].end() > start;
        let overlaps_next = index < self.regions.len() && self.regions[index].start < end;
        if size > 0 && (overlaps_previous || overlaps_next) {
            return Err(RegionOverlap { start, size });
        }

        self.regions.insert(
            index,
            Region {
                name: name.to_string(),
                start,
                data,
            },
        );

        Ok(())
    }

    /// Registers a zero-initialised region of `size` bytes at `start` and returns it for writing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::RegionOverlap`] if the range intersects an existing region.
    pub fn allocate_region(&mut self, name: &str, start: u64, size: usize) -> Result<&mut [u8]> {
        self.map_region(name, start, vec![0u8; size])?;

        let index = self.regions.partition_point(|region| region.start < start);
        // map_region inserted at exactly this position
        Ok(self.regions[index].data.as_mut_slice())
    }

    /// Overwrites the bytes at `address` with `data`.
    ///
    /// The range must lie within a single existing region; the region keeps its name and
    /// extent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unmapped`] if `[address, address + data.len())` is not fully
    /// covered by one region.
    pub fn write_bytes(&mut self, address: u64, data: &[u8]) -> Result<()> {
        let index = self.regions.partition_point(|region| region.start <= address);
        let target = index
            .checked_sub(1)
            .and_then(|index| self.regions[index].slice_mut(address, data.len()))
            .ok_or(unmapped_error!(address, data.len()))?;

        target.copy_from_slice(data);
        Ok(())
    }

    /// All regions, sorted by start address.
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// The first region with the given name.
    #[must_use]
    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|region| region.name == name)
    }

    /// The region that contains `address`.
    #[must_use]
    pub fn region_containing(&self, address: u64) -> Option<&Region> {
        let index = self.regions.partition_point(|region| region.start <= address);
        if index == 0 {
            return None;
        }

        let region = &self.regions[index - 1];
        region.contains(address).then_some(region)
    }

    /// Lowest mapped address, zero if nothing is mapped.
    #[must_use]
    pub fn start(&self) -> u64 {
        self.regions.first().map_or(0, Region::start)
    }

    /// One past the highest mapped address, zero if nothing is mapped.
    #[must_use]
    pub fn end(&self) -> u64 {
        self.regions.iter().map(Region::end).max().unwrap_or(0)
    }

    /// True if `address` falls within `[start(), end())`.
    ///
    /// This is the coarse whole-image range test used by the pointer sweep; gaps between
    /// regions count as inside.
    #[must_use]
    pub fn contains(&self, address: u64) -> bool {
        address >= self.start() && address < self.end()
    }

    /// True if every byte of `[address, address + len)` is backed by a single region.
    #[must_use]
    pub fn is_mapped(&self, address: u64, len: usize) -> bool {
        self.region_containing(address)
            .and_then(|region| region.slice(address, len))
            .is_some()
    }

    /// Reads `len` bytes starting at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unmapped`] if the range is not fully covered by one region.
    pub fn read_bytes(&self, address: u64, len: usize) -> Result<&[u8]> {
        self.region_containing(address)
            .and_then(|region| region.slice(address, len))
            .ok_or(unmapped_error!(address, len))
    }

    /// Reads a little-endian primitive at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unmapped`] if the value is not fully mapped.
    pub fn read<T: NativeIO>(&self, address: u64) -> Result<T> {
        read_le(self.read_bytes(address, std::mem::size_of::<T>())?)
    }

    /// Reads a byte at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unmapped`] if the address is not mapped.
    pub fn read_u8(&self, address: u64) -> Result<u8> {
        self.read(address)
    }

    /// Reads a little-endian `u16` at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unmapped`] if the value is not fully mapped.
    pub fn read_u16(&self, address: u64) -> Result<u16> {
        self.read(address)
    }

    /// Reads a little-endian `u32` at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unmapped`] if the value is not fully mapped.
    pub fn read_u32(&self, address: u64) -> Result<u32> {
        self.read(address)
    }

    /// Reads a little-endian `i32` at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unmapped`] if the value is not fully mapped.
    pub fn read_i32(&self, address: u64) -> Result<i32> {
        self.read(address)
    }

    /// Reads a little-endian `u64` at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unmapped`] if the value is not fully mapped.
    pub fn read_u64(&self, address: u64) -> Result<u64> {
        self.read(address)
    }

    /// Resolves the 32-bit relative pointer stored at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unmapped`] if the displacement is not mapped.
    pub fn read_relative_pointer(&self, address: u64) -> Result<u64> {
        let delta = self.read_i32(address)?;
        Ok(address.wrapping_add_signed(i64::from(delta)))
    }
}
