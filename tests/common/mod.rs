//! Encoders and a PE writer for building synthetic NativeAOT modules in integration tests.
#![allow(dead_code)]

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

/// The fixed 5-byte varint form
pub fn encode_fixed(value: u32) -> [u8; 5] {
    let bytes = value.to_le_bytes();
    [0x0F, bytes[0], bytes[1], bytes[2], bytes[3]]
}

pub fn encode_values(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|value| encode_unsigned(*value)).collect()
}

/// 32-bit relative pointers to `targets`, stored back to back at `start`
pub fn relative_pointers(start: u64, targets: &[u64]) -> Vec<u8> {
    let mut data = Vec::new();
    for target in targets {
        let slot = start + data.len() as u64;
        data.extend((target.wrapping_sub(slot) as i32).to_le_bytes());
    }
    data
}

/// A NativeFormat hashtable with one byte wide bucket offsets
pub fn hashtable(buckets_shift: u8, entries: &[(u32, Vec<u8>)]) -> Vec<u8> {
    const ENTRY_SIZE: usize = 6;

    let mask = (1u32 << buckets_shift) - 1;
    let mut buckets: Vec<Vec<&(u32, Vec<u8>)>> = vec![Vec::new(); mask as usize + 1];
    for entry in entries {
        buckets[((entry.0 >> 8) & mask) as usize].push(entry);
    }
    for bucket in &mut buckets {
        bucket.sort_by_key(|(hashcode, _)| *hashcode as u8);
    }

    let index_size = mask as usize + 2;
    let elements_start = 1 + index_size + entries.len() * ENTRY_SIZE;

    let mut bytes = vec![buckets_shift << 2];
    let mut boundary = index_size;
    bytes.push(boundary as u8);
    for bucket in &buckets {
        boundary += bucket.len() * ENTRY_SIZE;
        bytes.push(boundary as u8);
    }

    let mut elements = Vec::new();
    for (hashcode, element) in buckets.iter().flatten() {
        let delta_position = bytes.len() + 1;
        let element_position = elements_start + elements.len();
        bytes.push(*hashcode as u8);
        bytes.extend(encode_fixed((element_position as i32 - delta_position as i32) as u32));
        elements.extend_from_slice(element);
    }

    bytes.extend(elements);
    bytes
}

/// A NativeFormat metadata blob under construction
pub struct MetadataBuilder {
    data: Vec<u8>,
}

impl MetadataBuilder {
    /// Signature plus a single scope placeholder; returns the placeholder position
    pub fn new() -> (MetadataBuilder, usize) {
        let mut builder = MetadataBuilder {
            data: 0xDEAD_DFFDu32.to_le_bytes().to_vec(),
        };
        builder.unsigned(1);
        let scope = builder.placeholder();
        (builder, scope)
    }

    pub fn position(&self) -> u32 {
        self.data.len() as u32
    }

    pub fn unsigned(&mut self, value: u32) -> &mut Self {
        self.data.extend(encode_unsigned(value));
        self
    }

    pub fn zeros(&mut self, count: usize) -> &mut Self {
        for _ in 0..count {
            self.unsigned(0);
        }
        self
    }

    pub fn placeholder(&mut self) -> usize {
        let position = self.data.len();
        self.data.extend(encode_fixed(0));
        position
    }

    pub fn patch(&mut self, position: usize, value: u32) {
        self.data[position..position + 5].copy_from_slice(&encode_fixed(value));
    }

    pub fn string(&mut self, value: &str) -> u32 {
        let offset = self.position();
        self.unsigned(value.len() as u32);
        self.data.extend_from_slice(value.as_bytes());
        offset
    }

    pub fn build(self) -> Vec<u8> {
        self.data
    }
}

/// Encodes one dehydrated data command byte with a short payload
pub fn command(opcode: u8, payload: u8) -> u8 {
    (payload << 3) | opcode
}

/// Writes a minimal PE32+ executable.
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
        coff.extend([0u8; 12]);
        coff.extend(0xF0u16.to_le_bytes());
        coff.extend(0x0022u16.to_le_bytes());

        let mut optional = Vec::new();
        optional.extend(0x20Bu16.to_le_bytes());
        optional.extend([14, 0]);
        optional.extend([0u8; 16]);
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
