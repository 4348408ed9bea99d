//! Builders that produce NativeAOT binary structures for unit tests.
//!
//! Every builder emits exactly the byte layout the runtime reads, so the decoders are tested
//! against data shaped like real modules rather than against themselves.

use crate::Image;

/// Encodes `value` in the shortest unsigned varint form.
pub fn encode_unsigned(value: u32) -> Vec<u8> {
    if value < 1 << 7 {
        vec![(value << 1) as u8]
    } else if value < 1 << 14 {
        vec![((value << 2) | 1) as u8, (value >> 6) as u8]
    } else if value < 1 << 21 {
        vec![
            ((value << 3) | 3) as u8,
            (value >> 5) as u8,
            (value >> 13) as u8,
        ]
    } else if value < 1 << 28 {
        vec![
            ((value << 4) | 7) as u8,
            (value >> 4) as u8,
            (value >> 12) as u8,
            (value >> 20) as u8,
        ]
    } else {
        let mut bytes = vec![0x0F];
        bytes.extend(value.to_le_bytes());
        bytes
    }
}

/// Encodes `value` in the shortest signed varint form.
pub fn encode_signed(value: i32) -> Vec<u8> {
    let fits = |bits: u32| value >= -(1 << (bits - 1)) && value < (1 << (bits - 1));

    if fits(7) {
        vec![(value << 1) as u8]
    } else if fits(14) {
        vec![((value << 2) | 1) as u8, (value >> 6) as u8]
    } else if fits(21) {
        vec![
            ((value << 3) | 3) as u8,
            (value >> 5) as u8,
            (value >> 13) as u8,
        ]
    } else if fits(28) {
        vec![
            ((value << 4) | 7) as u8,
            (value >> 4) as u8,
            (value >> 12) as u8,
            (value >> 20) as u8,
        ]
    } else {
        let mut bytes = vec![0x0F];
        bytes.extend(value.to_le_bytes());
        bytes
    }
}

/// Encodes `value` in the fixed 5-byte form, useful when a value has to be patched later.
pub fn encode_fixed(value: u32) -> [u8; 5] {
    let bytes = value.to_le_bytes();
    [0x0F, bytes[0], bytes[1], bytes[2], bytes[3]]
}

/// Builds a NativeFormat hashtable whose elements are placed after the entry area.
///
/// Relative offsets are always stored in the 5-byte signed form so entry sizes are fixed.
pub struct HashtableBuilder {
    buckets_shift: u8,
    entry_index_size: u8,
    entries: Vec<(u32, Vec<u8>)>,
    sorted: bool,
}

impl HashtableBuilder {
    pub fn new(buckets_shift: u8, entry_index_size: u8) -> HashtableBuilder {
        HashtableBuilder {
            buckets_shift,
            entry_index_size,
            entries: Vec::new(),
            sorted: true,
        }
    }

    /// An element consisting of a single unsigned varint `id`
    pub fn entry(self, hashcode: u32, id: u32) -> HashtableBuilder {
        self.entry_bytes(hashcode, encode_unsigned(id))
    }

    pub fn entry_bytes(mut self, hashcode: u32, element: Vec<u8>) -> HashtableBuilder {
        self.entries.push((hashcode, element));
        self
    }

    /// Keep entries in insertion order inside each bucket
    pub fn unsorted(mut self) -> HashtableBuilder {
        self.sorted = false;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mask = (1u32 << self.buckets_shift) - 1;
        let width = 1usize << self.entry_index_size;

        let mut buckets: Vec<Vec<&(u32, Vec<u8>)>> = vec![Vec::new(); mask as usize + 1];
        for entry in &self.entries {
            buckets[((entry.0 >> 8) & mask) as usize].push(entry);
        }
        if self.sorted {
            for bucket in &mut buckets {
                bucket.sort_by_key(|(hashcode, _)| *hashcode as u8);
            }
        }

        const ENTRY_SIZE: usize = 6;
        let base = 1usize;
        let index_size = (mask as usize + 2) * width;
        let entries_start = base + index_size;
        let elements_start = entries_start + self.entries.len() * ENTRY_SIZE;

        let mut bytes = vec![(self.buckets_shift << 2) | self.entry_index_size];

        let mut relative = index_size;
        let mut boundaries = vec![relative];
        for bucket in &buckets {
            relative += bucket.len() * ENTRY_SIZE;
            boundaries.push(relative);
        }
        for boundary in boundaries {
            let bytes_le = (boundary as u32).to_le_bytes();
            bytes.extend_from_slice(&bytes_le[..width]);
        }

        let mut elements = Vec::new();
        for entry in buckets.iter().flatten() {
            let delta_position = bytes.len() + 1;
            let element_position = elements_start + elements.len();
            bytes.push(entry.0 as u8);
            let delta = element_position as i32 - delta_position as i32;
            bytes.extend(encode_fixed(delta as u32));
            elements.extend_from_slice(&entry.1);
        }

        bytes.extend(elements);
        bytes
    }
}

/// Builds a dehydrated data section: the relative pointer to the destination, the command
/// stream and the trailing fixup table.
pub struct PatchStreamBuilder {
    commands: Vec<Command>,
    fixups: Vec<u64>,
}

enum Command {
    Copy(Vec<u8>),
    ZeroFill(u32),
    RelPtr32Reloc(u32),
    PtrReloc(u32),
    InlineRelPtr32Reloc(Vec<u64>),
    InlinePtrReloc(Vec<u64>),
    Raw(Vec<u8>),
}

/// Encodes one command byte plus its extra payload bytes.
pub fn encode_command(opcode: u8, payload: u32) -> Vec<u8> {
    const MAX_SHORT_PAYLOAD: u32 = 28;

    if payload <= MAX_SHORT_PAYLOAD {
        return vec![((payload as u8) << 3) | opcode];
    }

    let extra = payload - MAX_SHORT_PAYLOAD;
    let count = if extra < 1 << 8 {
        1
    } else if extra < 1 << 16 {
        2
    } else {
        3
    };

    let mut bytes = vec![(((MAX_SHORT_PAYLOAD + count) as u8) << 3) | opcode];
    bytes.extend_from_slice(&extra.to_le_bytes()[..count as usize]);
    bytes
}

impl PatchStreamBuilder {
    pub fn new() -> PatchStreamBuilder {
        PatchStreamBuilder {
            commands: Vec::new(),
            fixups: Vec::new(),
        }
    }

    pub fn copy(mut self, data: &[u8]) -> Self {
        self.commands.push(Command::Copy(data.to_vec()));
        self
    }

    pub fn zero_fill(mut self, count: u32) -> Self {
        self.commands.push(Command::ZeroFill(count));
        self
    }

    pub fn rel_ptr32_reloc(mut self, fixup: u32) -> Self {
        self.commands.push(Command::RelPtr32Reloc(fixup));
        self
    }

    pub fn ptr_reloc(mut self, fixup: u32) -> Self {
        self.commands.push(Command::PtrReloc(fixup));
        self
    }

    pub fn inline_rel_ptr32_reloc(mut self, targets: &[u64]) -> Self {
        self.commands
            .push(Command::InlineRelPtr32Reloc(targets.to_vec()));
        self
    }

    pub fn inline_ptr_reloc(mut self, targets: &[u64]) -> Self {
        self.commands.push(Command::InlinePtrReloc(targets.to_vec()));
        self
    }

    /// Arbitrary bytes appended to the command stream
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.commands.push(Command::Raw(bytes.to_vec()));
        self
    }

    pub fn fixup(mut self, target: u64) -> Self {
        self.fixups.push(target);
        self
    }

    /// Emits the section for a stream located at `start` that rehydrates into `destination`.
    ///
    /// Returns the section bytes and the stream length (the section `end - start`); the fixup
    /// table follows the stream.
    pub fn build(&self, start: u64, destination: u64) -> (Vec<u8>, u64) {
        let rel = |bytes: &Vec<u8>, target: u64| -> [u8; 4] {
            let at = start + bytes.len() as u64;
            (target.wrapping_sub(at) as i32).to_le_bytes()
        };

        let mut bytes = Vec::new();
        let header = rel(&bytes, destination);
        bytes.extend(header);

        for command in &self.commands {
            match command {
                Command::Copy(data) => {
                    bytes.extend(encode_command(0, data.len() as u32));
                    bytes.extend(data);
                }
                Command::ZeroFill(count) => bytes.extend(encode_command(1, *count)),
                Command::RelPtr32Reloc(fixup) => bytes.extend(encode_command(2, *fixup)),
                Command::PtrReloc(fixup) => bytes.extend(encode_command(3, *fixup)),
                Command::InlineRelPtr32Reloc(targets) | Command::InlinePtrReloc(targets) => {
                    let opcode = if matches!(command, Command::InlineRelPtr32Reloc(_)) {
                        4
                    } else {
                        5
                    };
                    bytes.extend(encode_command(opcode, targets.len() as u32));
                    for target in targets {
                        let value = rel(&bytes, *target);
                        bytes.extend(value);
                    }
                }
                Command::Raw(raw) => bytes.extend(raw),
            }
        }

        let length = bytes.len() as u64;
        for target in &self.fixups {
            let value = rel(&bytes, *target);
            bytes.extend(value);
        }

        (bytes, length)
    }
}

/// Builds a NativeFormat metadata blob.
///
/// Handles that point forward are written in the fixed 5-byte form and patched once the target
/// offset is known.
pub struct MetadataBuilder {
    data: Vec<u8>,
}

impl MetadataBuilder {
    /// Starts a blob with the signature and a scope collection of `scopes` placeholders.
    ///
    /// Returns the builder and the positions of the scope placeholders.
    pub fn new(scopes: usize) -> (MetadataBuilder, Vec<usize>) {
        let mut builder = MetadataBuilder {
            data: 0xDEAD_DFFDu32.to_le_bytes().to_vec(),
        };
        builder.unsigned(scopes as u32);
        let positions = (0..scopes).map(|_| builder.placeholder()).collect();
        (builder, positions)
    }

    pub fn position(&self) -> u32 {
        self.data.len() as u32
    }

    pub fn unsigned(&mut self, value: u32) -> &mut Self {
        self.data.extend(encode_unsigned(value));
        self
    }

    pub fn signed(&mut self, value: i32) -> &mut Self {
        self.data.extend(encode_signed(value));
        self
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.data.extend_from_slice(bytes);
        self
    }

    pub fn string(&mut self, value: &str) -> &mut Self {
        self.unsigned(value.len() as u32);
        self.raw(value.as_bytes())
    }

    /// A raw handle value `(kind << 24) | offset`
    pub fn handle(&mut self, kind: u8, offset: u32) -> &mut Self {
        self.unsigned((u32::from(kind) << 24) | offset)
    }

    /// A fixed-width zero to be patched later; returns its position.
    pub fn placeholder(&mut self) -> usize {
        let position = self.data.len();
        self.data.extend(encode_fixed(0));
        position
    }

    pub fn patch(&mut self, position: usize, value: u32) {
        self.data[position..position + 5].copy_from_slice(&encode_fixed(value));
    }

    /// A collection of `count` placeholders; returns their positions.
    pub fn placeholder_collection(&mut self, count: usize) -> Vec<usize> {
        self.unsigned(count as u32);
        (0..count).map(|_| self.placeholder()).collect()
    }

    /// Writes a ConstantStringValue record and returns its offset.
    pub fn constant_string(&mut self, value: &str) -> u32 {
        let offset = self.position();
        self.string(value);
        offset
    }

    pub fn build(self) -> Vec<u8> {
        self.data
    }
}

/// Builds an [`Image`] containing an `RTR` module header in `.rdata` plus one region per
/// section.
pub struct ModuleBuilder {
    rdata_address: u64,
    sections: Vec<(u32, u64, Vec<u8>, u64)>,
    regions: Vec<(String, u64, Vec<u8>)>,
    entry_size: u8,
}

impl ModuleBuilder {
    pub fn new() -> ModuleBuilder {
        ModuleBuilder {
            rdata_address: 0x1000,
            sections: Vec::new(),
            regions: Vec::new(),
            entry_size: 24,
        }
    }

    /// A section of the module header with its data mapped at `address`
    pub fn section(self, id: u32, address: u64, data: Vec<u8>) -> Self {
        let length = data.len() as u64;
        self.section_with_length(id, address, data, length)
    }

    /// A section whose declared length is shorter than the mapped data, as for dehydrated data
    /// followed by its fixup table
    pub fn section_with_length(mut self, id: u32, address: u64, data: Vec<u8>, length: u64) -> Self {
        self.sections.push((id, address, data, length));
        self
    }

    /// A plain region that is not listed in the module header
    pub fn region(mut self, name: &str, address: u64, data: Vec<u8>) -> Self {
        self.regions.push((name.to_string(), address, data));
        self
    }

    pub fn entry_size(mut self, entry_size: u8) -> Self {
        self.entry_size = entry_size;
        self
    }

    /// The `.rdata` bytes: some padding, the header, then the section rows.
    pub fn header_bytes(&self) -> Vec<u8> {
        let mut rdata = vec![0x90; 0x20];
        rdata.extend_from_slice(b"RTR\0");
        rdata.extend(9u16.to_le_bytes());
        rdata.extend(2u16.to_le_bytes());
        rdata.extend(0u32.to_le_bytes());
        rdata.extend((self.sections.len() as u16).to_le_bytes());
        rdata.push(self.entry_size);
        rdata.push(1);

        for (id, address, _, length) in &self.sections {
            let mut row = Vec::new();
            row.extend(id.to_le_bytes());
            row.extend(0u32.to_le_bytes());
            row.extend(address.to_le_bytes());
            row.extend((address + length).to_le_bytes());
            row.resize(usize::from(self.entry_size).max(24), 0);
            rdata.extend(row);
        }

        rdata.resize(rdata.len() + 0x20, 0);
        rdata
    }

    pub fn build(&self) -> Image {
        let mut image = Image::new();
        image
            .map_region(".rdata", self.rdata_address, self.header_bytes())
            .unwrap();
        for (id, address, data, _) in &self.sections {
            image
                .map_region(&format!("section{id}"), *address, data.clone())
                .unwrap();
        }
        for (name, address, data) in &self.regions {
            image.map_region(name, *address, data.clone()).unwrap();
        }
        image
    }
}

/// Builds a minimal PE32+ image with the given sections.
pub struct PeBuilder {
    image_base: u64,
    sections: Vec<(String, u32, Vec<u8>, u32)>,
}

impl PeBuilder {
    pub fn new(image_base: u64) -> PeBuilder {
        PeBuilder {
            image_base,
            sections: Vec::new(),
        }
    }

    /// A section at `rva` with initialised `data` and `virtual_size` bytes once mapped
    pub fn section(mut self, name: &str, rva: u32, data: Vec<u8>, virtual_size: u32) -> Self {
        self.sections
            .push((name.to_string(), rva, data, virtual_size));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        const FILE_ALIGNMENT: u32 = 0x200;
        const HEADERS_SIZE: u32 = 0x400;

        let align = |value: u32, alignment: u32| value.div_ceil(alignment) * alignment;

        let size_of_image = self
            .sections
            .iter()
            .map(|(_, rva, _, size)| align(rva + size, 0x1000))
            .max()
            .unwrap_or(0x1000);

        let mut pe = vec![0u8; HEADERS_SIZE as usize];
        pe[0..2].copy_from_slice(b"MZ");
        pe[0x3C..0x40].copy_from_slice(&0x80u32.to_le_bytes());
        pe[0x80..0x84].copy_from_slice(b"PE\0\0");

        let mut coff = Vec::new();
        coff.extend(0x8664u16.to_le_bytes());
        coff.extend((self.sections.len() as u16).to_le_bytes());
        coff.extend(0u32.to_le_bytes());
        coff.extend(0u32.to_le_bytes());
        coff.extend(0u32.to_le_bytes());
        coff.extend(0xF0u16.to_le_bytes());
        coff.extend(0x0022u16.to_le_bytes());

        let mut optional = Vec::new();
        optional.extend(0x20Bu16.to_le_bytes());
        optional.extend([14, 0]);
        optional.extend(0u32.to_le_bytes());
        optional.extend(0u32.to_le_bytes());
        optional.extend(0u32.to_le_bytes());
        optional.extend(0u32.to_le_bytes());
        optional.extend(0x1000u32.to_le_bytes());
        optional.extend(self.image_base.to_le_bytes());
        optional.extend(0x1000u32.to_le_bytes());
        optional.extend(FILE_ALIGNMENT.to_le_bytes());
        for value in [6u16, 0, 0, 0, 6, 0] {
            optional.extend(value.to_le_bytes());
        }
        optional.extend(0u32.to_le_bytes());
        optional.extend(size_of_image.to_le_bytes());
        optional.extend(HEADERS_SIZE.to_le_bytes());
        optional.extend(0u32.to_le_bytes());
        optional.extend(3u16.to_le_bytes());
        optional.extend(0x8160u16.to_le_bytes());
        for value in [0x10_0000u64, 0x1000, 0x10_0000, 0x1000] {
            optional.extend(value.to_le_bytes());
        }
        optional.extend(0u32.to_le_bytes());
        optional.extend(16u32.to_le_bytes());
        optional.resize(0xF0, 0);

        let mut table = Vec::new();
        let mut raw = Vec::new();
        for (name, rva, data, virtual_size) in &self.sections {
            let mut name_bytes = [0u8; 8];
            let len = name.len().min(8);
            name_bytes[..len].copy_from_slice(&name.as_bytes()[..len]);

            let raw_size = align(data.len() as u32, FILE_ALIGNMENT);
            let raw_pointer = HEADERS_SIZE + raw.len() as u32;

            table.extend(name_bytes);
            table.extend(virtual_size.to_le_bytes());
            table.extend(rva.to_le_bytes());
            table.extend(raw_size.to_le_bytes());
            table.extend(raw_pointer.to_le_bytes());
            table.extend([0u8; 12]);
            table.extend(0x4000_0040u32.to_le_bytes());

            raw.extend(data);
            raw.resize(raw.len() + (raw_size as usize - data.len()), 0);
        }

        let mut offset = 0x84;
        for chunk in [&coff, &optional, &table] {
            pe[offset..offset + chunk.len()].copy_from_slice(chunk);
            offset += chunk.len();
        }

        pe.extend(raw);
        pe
    }
}
