use crate::{
    config::LoadConfig,
    dehydrated::command::{parse_command, DehydratedDataOpcode},
    image::{Image, Region},
    runtime::ModuleSection,
    Result,
};

/// Most bytes a destination outside every mapped region may receive.
pub const UNMAPPED_DESTINATION_LIMIT: usize = 16 << 20;

/// Output of a successful rehydration, before it is mapped into an [`Image`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RehydratedData {
    /// Address the data belongs at
    pub destination: u64,
    /// The rebuilt bytes
    pub data: Vec<u8>,
}

/// A rehydrated region that has been registered in the [`Image`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct HydratedRegion {
    /// First address of the region
    pub start: u64,
    /// Length of the region in bytes
    pub len: u64,
    /// Addresses of 8-byte slots whose value lands inside the image
    pub pointers: Vec<u64>,
}

impl HydratedRegion {
    /// Address past the end of the region
    #[must_use]
    pub fn end(&self) -> u64 {
        self.start + self.len
    }
}

/// Decodes a dehydrated data section into freshly allocated bytes.
///
/// The first four bytes of the section are a relative pointer to the destination. The command
/// stream follows and runs up to the section end, where the fixup table begins.
///
/// The output starts as `section.len()` zero bytes and may grow up to the destination's
/// capacity: the rest of the region containing the destination, or at most
/// [`UNMAPPED_DESTINATION_LIMIT`] bytes (and never into the next region) when the destination
/// is not mapped yet.
///
/// # Errors
///
/// Returns [`crate::Error::CorruptPatchStream`] for invalid opcodes, reads past the end of the
/// stream, writes past the destination capacity, unmapped fixups and relative pointers that
/// no longer fit 32 bits.
///
/// # Examples
///
/// ```rust,no_run
/// use aotscope::{dehydrated, runtime::ReadyToRunSectionType, AotObject, LoadConfig};
/// use std::path::Path;
///
/// let object = AotObject::from_file_with_config(Path::new("app.exe"), LoadConfig::minimal())?;
/// let section = object.header().find_section(ReadyToRunSectionType::DehydratedData)?;
/// let rehydrated = dehydrated::decode(object.image(), section)?;
/// println!("{} bytes at 0x{:x}", rehydrated.data.len(), rehydrated.destination);
/// # Ok::<(), aotscope::Error>(())
/// ```
pub fn decode(image: &Image, section: &ModuleSection) -> Result<RehydratedData> {
    let length = usize::try_from(section.len())
        .map_err(|_| corrupt_patch_error!(section.start, "Section is too large"))?;
    if length < 4 {
        return Err(corrupt_patch_error!(
            section.start,
            "Section of {} bytes has no destination pointer",
            length
        ));
    }

    let source = image.read_bytes(section.start, length)?;
    let destination = image.read_relative_pointer(section.start)?;

    let capacity = destination_capacity(image, destination);

    tracing::debug!(
        "Rehydrating 0x{:x}..0x{:x} into 0x{:x} (capacity 0x{:x})",
        section.start,
        section.end,
        destination,
        capacity
    );

    let mut state = Rehydrator {
        image,
        source,
        start: section.start,
        fixups: section.end,
        position: 4,
        destination,
        output: vec![0; length.min(capacity)],
        capacity,
        cursor: 0,
    };
    state.run()?;

    tracing::debug!(
        "Rehydrated {} bytes at 0x{:x}",
        state.output.len(),
        destination
    );

    Ok(RehydratedData {
        destination,
        data: state.output,
    })
}

/// Decodes `section` into the image and optionally sweeps the result for pointers.
///
/// Executables reserve the destination as an uninitialised section; the bytes are then written
/// into that region in place. A destination outside every region is mapped as a new region
/// named `config.hydrated_region_name`. The image is only modified once decoding has fully
/// succeeded.
///
/// # Errors
///
/// Returns the errors of [`decode`], and [`crate::Error::RegionOverlap`] if a new region would
/// collide with an existing one.
pub fn rehydrate(
    image: &mut Image,
    section: &ModuleSection,
    config: &LoadConfig,
) -> Result<HydratedRegion> {
    let RehydratedData { destination, data } = decode(image, section)?;
    let written = data.len();

    if image.region_containing(destination).is_some() {
        image.write_bytes(destination, &data)?;
    } else {
        image.map_region(&config.hydrated_region_name, destination, data)?;
    }

    let pointers = if config.sweep_pointers {
        match image.read_bytes(destination, written) {
            Ok(data) => sweep_pointers(image, data, destination),
            Err(_) => Vec::new(),
        }
    } else {
        Vec::new()
    };

    Ok(HydratedRegion {
        start: destination,
        len: written as u64,
        pointers,
    })
}

/// Scans `data` (located at `start`) in 8-byte strides and returns the address of every slot
/// whose little-endian value falls inside `[image.start(), image.end())`.
///
/// This is a heuristic: integers that happen to look like addresses are reported too. A
/// trailing partial slot is ignored.
#[must_use]
pub fn sweep_pointers(image: &Image, data: &[u8], start: u64) -> Vec<u64> {
    let pointers: Vec<u64> = data
        .chunks_exact(8)
        .enumerate()
        .filter_map(|(index, slot)| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(slot);
            image
                .contains(u64::from_le_bytes(bytes))
                .then_some(start + index as u64 * 8)
        })
        .collect();

    tracing::debug!(
        "Pointer sweep over 0x{:x}..0x{:x} tagged {} slots",
        start,
        start + data.len() as u64,
        pointers.len()
    );
    pointers
}

/// Bytes available at `destination`: the rest of its region, or the unmapped gap up to the
/// next region capped at [`UNMAPPED_DESTINATION_LIMIT`].
fn destination_capacity(image: &Image, destination: u64) -> usize {
    let available = match image.region_containing(destination) {
        Some(region) => region.end() - destination,
        None => image
            .regions()
            .iter()
            .map(Region::start)
            .find(|start| *start > destination)
            .map_or(u64::MAX, |next| next - destination)
            .min(UNMAPPED_DESTINATION_LIMIT as u64),
    };
    usize::try_from(available).unwrap_or(usize::MAX)
}

struct Rehydrator<'a> {
    image: &'a Image,
    source: &'a [u8],
    start: u64,
    fixups: u64,
    position: usize,
    destination: u64,
    output: Vec<u8>,
    capacity: usize,
    cursor: usize,
}

impl<'a> Rehydrator<'a> {
    fn run(&mut self) -> Result<()> {
        while self.position < self.source.len() {
            let address = self.address();
            let command = parse_command(&self.source[self.position..], address)?;
            self.position += command.size;

            let payload = command.payload as usize;
            match command.opcode {
                DehydratedDataOpcode::Copy => {
                    let data = self.take(payload)?;
                    self.write(data, address)?;
                }
                DehydratedDataOpcode::ZeroFill => {
                    let end = self.reserve(payload, address)?;
                    self.cursor = end;
                }
                DehydratedDataOpcode::PtrReloc => {
                    let target = self.fixup(command.payload, address)?;
                    self.write(&target.to_le_bytes(), address)?;
                }
                DehydratedDataOpcode::RelPtr32Reloc => {
                    let target = self.fixup(command.payload, address)?;
                    self.write_relative(target, address)?;
                }
                DehydratedDataOpcode::InlinePtrReloc => {
                    for _ in 0..payload {
                        let target = self.inline_pointer()?;
                        self.write(&target.to_le_bytes(), address)?;
                    }
                }
                DehydratedDataOpcode::InlineRelPtr32Reloc => {
                    for _ in 0..payload {
                        let target = self.inline_pointer()?;
                        self.write_relative(target, address)?;
                    }
                }
            }
        }

        Ok(())
    }

    fn address(&self) -> u64 {
        self.start + self.position as u64
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.position + len;
        if end > self.source.len() {
            return Err(corrupt_patch_error!(
                self.address(),
                "Read of {} bytes runs past the end of the stream at 0x{:x}",
                len,
                self.fixups
            ));
        }

        let source = self.source;
        let data = &source[self.position..end];
        self.position = end;
        Ok(data)
    }

    fn inline_pointer(&mut self) -> Result<u64> {
        let at = self.address();
        let bytes = self.take(4)?;
        let delta = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        Ok(at.wrapping_add_signed(i64::from(delta)))
    }

    fn fixup(&self, index: u32, address: u64) -> Result<u64> {
        let slot = self.fixups + u64::from(index) * 4;
        self.image.read_relative_pointer(slot).map_err(|_| {
            corrupt_patch_error!(address, "Fixup {} at 0x{:x} is not mapped", index, slot)
        })
    }

    /// Grows the zeroed output to cover `len` bytes at the cursor and returns their end.
    fn reserve(&mut self, len: usize, address: u64) -> Result<usize> {
        let end = self
            .cursor
            .checked_add(len)
            .filter(|end| *end <= self.capacity)
            .ok_or_else(|| {
                corrupt_patch_error!(
                    address,
                    "Write of {} bytes at 0x{:x} runs past the destination capacity of 0x{:x}",
                    len,
                    self.destination + self.cursor as u64,
                    self.capacity
                )
            })?;

        if end > self.output.len() {
            self.output.resize(end, 0);
        }
        Ok(end)
    }

    fn write(&mut self, data: &[u8], address: u64) -> Result<()> {
        let end = self.reserve(data.len(), address)?;
        self.output[self.cursor..end].copy_from_slice(data);
        self.cursor = end;
        Ok(())
    }

    fn write_relative(&mut self, target: u64, address: u64) -> Result<()> {
        let at = self.destination + self.cursor as u64;
        let delta = i32::try_from(target.wrapping_sub(at) as i64).map_err(|_| {
            corrupt_patch_error!(
                address,
                "Target 0x{:x} is out of 32-bit range from 0x{:x}",
                target,
                at
            )
        })?;
        self.write(&delta.to_le_bytes(), address)
    }
}
