//! Benchmarks for the dehydrated data engine.
//!
//! - Decoding a stream that mixes copies, zero fills and relocations
//! - Sweeping the rehydrated bytes for pointers

extern crate aotscope;

use aotscope::{
    dehydrated::{decode, sweep_pointers},
    runtime::ModuleSection,
    Image,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

const STREAM: u64 = 0x10_0000;
const DESTINATION: u64 = 0x20_0000;
const TARGETS: u64 = 0x1000;

/// A section producing `blocks` `MethodTable`-like blocks of 48 bytes each.
fn dehydrated_section(blocks: u32) -> (Image, ModuleSection) {
    let rel = |bytes: &Vec<u8>, target: u64| -> [u8; 4] {
        let at = STREAM + bytes.len() as u64;
        (target.wrapping_sub(at) as i32).to_le_bytes()
    };

    let mut bytes = Vec::new();
    let header = rel(&bytes, DESTINATION);
    bytes.extend(header);

    for block in 0..blocks {
        // copy 16 bytes, zero 8, one pointer fixup, one inline pointer, 8 more zeros
        bytes.push(16 << 3);
        bytes.extend(block.to_le_bytes().repeat(4));
        bytes.push((8 << 3) | 1);
        bytes.push((((block % 4) as u8) << 3) | 3);
        bytes.push((1 << 3) | 5);
        let inline = rel(&bytes, TARGETS + u64::from(block % 64) * 8);
        bytes.extend(inline);
        bytes.push((8 << 3) | 1);
    }

    let end = STREAM + bytes.len() as u64;
    for fixup in 0..4u64 {
        let value = rel(&bytes, TARGETS + fixup * 0x40);
        bytes.extend(value);
    }

    let mut image = Image::new();
    image.map_region(".targets", TARGETS, vec![0; 0x1000]).unwrap();
    image.map_region(".dehydrated", STREAM, bytes).unwrap();

    let section = ModuleSection {
        id: 207,
        flags: 0,
        start: STREAM,
        end,
    };
    (image, section)
}

fn bench_decode(c: &mut Criterion) {
    let (image, section) = dehydrated_section(1024);

    c.bench_function("rehydrate_decode_1024_blocks", |b| {
        b.iter(|| {
            let data = decode(black_box(&image), black_box(&section)).unwrap();
            black_box(data)
        });
    });
}

fn bench_sweep(c: &mut Criterion) {
    let (image, section) = dehydrated_section(1024);
    let rehydrated = decode(&image, &section).unwrap();

    c.bench_function("pointer_sweep_1024_blocks", |b| {
        b.iter(|| {
            let pointers = sweep_pointers(
                black_box(&image),
                black_box(&rehydrated.data),
                rehydrated.destination,
            );
            black_box(pointers)
        });
    });
}

criterion_group!(benches, bench_decode, bench_sweep);
criterion_main!(benches);
