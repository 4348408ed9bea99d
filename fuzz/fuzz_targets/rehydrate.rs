#![no_main]

use libfuzzer_sys::fuzz_target;
use aotscope::{dehydrated::decode, runtime::ModuleSection, Image};

fuzz_target!(|data: &[u8]| {
    // the stream covers the input; whatever follows it up to 64 bytes serves as fixups
    let end = 0x1000 + data.len().saturating_sub(64) as u64;
    let mut image = Image::new();
    if image.map_region(".dehydrated", 0x1000, data.to_vec()).is_err() {
        return;
    }
    let section = ModuleSection {
        id: 207,
        flags: 0,
        start: 0x1000,
        end,
    };
    let _ = decode(&image, &section);
});
