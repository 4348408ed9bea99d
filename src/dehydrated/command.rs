use strum::{Display, FromRepr};

use crate::Result;

/// Mask selecting the opcode bits of a command byte
pub const DEHYDRATED_DATA_COMMAND_MASK: u8 = 0x07;
/// Shift applied to a command byte to obtain the inline payload
pub const DEHYDRATED_DATA_COMMAND_PAYLOAD_SHIFT: u8 = 3;
/// Largest payload the five payload bits can hold
pub const MAX_RAW_SHORT_PAYLOAD: u32 = (1 << (8 - DEHYDRATED_DATA_COMMAND_PAYLOAD_SHIFT)) - 1;
/// Number of extra payload bytes at most
pub const MAX_EXTRA_PAYLOAD_BYTES: u32 = 3;
/// Largest payload stored inline; values above select 1 to 3 extra bytes
pub const MAX_SHORT_PAYLOAD: u32 = MAX_RAW_SHORT_PAYLOAD - MAX_EXTRA_PAYLOAD_BYTES;

/// Patch stream opcodes
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, FromRepr)]
#[repr(u8)]
pub enum DehydratedDataOpcode {
    /// Copy `payload` bytes from the stream
    Copy = 0x00,
    /// Skip `payload` zero bytes
    ZeroFill = 0x01,
    /// Write fixup `payload` as a 32-bit pointer relative to the write position
    RelPtr32Reloc = 0x02,
    /// Write fixup `payload` as an absolute 64-bit pointer
    PtrReloc = 0x03,
    /// Re-encode `payload` inline relative pointers as 32-bit relative pointers
    InlineRelPtr32Reloc = 0x04,
    /// Write `payload` inline relative pointers as absolute 64-bit pointers
    InlinePtrReloc = 0x05,
}

/// One decoded command.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DehydratedDataCommand {
    /// The operation
    pub opcode: DehydratedDataOpcode,
    /// Byte count, fixup index or pointer count depending on the opcode
    pub payload: u32,
    /// Encoded size of the command, 1 to 4 bytes
    pub size: usize,
}

/// Decodes the command at the start of `data`; `address` is only used for error reporting.
///
/// # Errors
///
/// Returns [`crate::Error::CorruptPatchStream`] for the unassigned opcodes 6 and 7, and when the
/// extra payload bytes run past the end of `data`.
pub fn parse_command(data: &[u8], address: u64) -> Result<DehydratedDataCommand> {
    let Some(&byte) = data.first() else {
        return Err(corrupt_patch_error!(address, "Command past the end of the stream"));
    };

    let opcode = DehydratedDataOpcode::from_repr(byte & DEHYDRATED_DATA_COMMAND_MASK)
        .ok_or_else(|| {
            corrupt_patch_error!(
                address,
                "Invalid opcode {} in command byte 0x{:02x}",
                byte & DEHYDRATED_DATA_COMMAND_MASK,
                byte
            )
        })?;

    let mut payload = u32::from(byte >> DEHYDRATED_DATA_COMMAND_PAYLOAD_SHIFT);
    let mut size = 1;
    if payload > MAX_SHORT_PAYLOAD {
        let extra = (payload - MAX_SHORT_PAYLOAD) as usize;
        let bytes = data.get(1..=extra).ok_or_else(|| {
            corrupt_patch_error!(address, "Truncated payload ({} extra bytes)", extra)
        })?;

        payload = bytes
            .iter()
            .rev()
            .fold(0u32, |value, byte| (value << 8) | u32::from(*byte))
            + MAX_SHORT_PAYLOAD;
        size += extra;
    }

    Ok(DehydratedDataCommand {
        opcode,
        payload,
        size,
    })
}
