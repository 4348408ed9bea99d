#![no_main]

use libfuzzer_sys::fuzz_target;
use aotscope::AotObject;

fuzz_target!(|data: &[u8]| {
    if let Ok(object) = AotObject::from_mem(data.to_vec()) {
        let _ = object.method_entry_points();
        if let Ok(map) = object.stack_trace_map() {
            for _ in map.entries() {}
        }
    }
});
