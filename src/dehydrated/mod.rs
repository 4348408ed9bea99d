//! Rehydration of the `DehydratedData` section.
//!
//! NativeAOT compresses large, mostly pointer-filled data structures (`MethodTable`s, frozen
//! objects) into a byte-oriented patch stream. At startup the runtime replays that stream into
//! a freshly allocated region. This module replays it offline so the rebuilt structures can be
//! read through the same [`crate::Image`] as everything else.
//!
//! The section starts with a relative pointer to the destination, followed by the command
//! stream. A table of relative pointers (the fixups) sits directly after the section end.
//!
//! # Key Components
//!
//! - [`crate::dehydrated::parse_command`] - Decodes one command byte plus its payload
//! - [`crate::dehydrated::decode`] - Replays a stream into owned bytes
//! - [`crate::dehydrated::rehydrate`] - Replays into the reserved destination section or a new region
//! - [`crate::dehydrated::sweep_pointers`] - Tags pointer-looking slots of a region

mod command;
mod engine;

pub use command::{
    parse_command, DehydratedDataCommand, DehydratedDataOpcode, DEHYDRATED_DATA_COMMAND_MASK,
    DEHYDRATED_DATA_COMMAND_PAYLOAD_SHIFT, MAX_EXTRA_PAYLOAD_BYTES, MAX_RAW_SHORT_PAYLOAD,
    MAX_SHORT_PAYLOAD,
};
pub use engine::{
    decode, rehydrate, sweep_pointers, HydratedRegion, RehydratedData, UNMAPPED_DESTINATION_LIMIT,
};
