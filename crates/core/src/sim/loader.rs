//! Program loading.
//!
//! This module loads guest programs into simulator memory. It performs:
//! 1. **ELF Loading:** Parses an AArch64 ELF executable with `object` and
//!    copies each loadable segment to its virtual address.
//! 2. **Flat Loading:** Copies a raw binary to a caller-chosen address.
//! 3. **File Reading:** Disk access with error propagation for the CLI.

use object::{Object, ObjectSegment};

use crate::common::error::SimError;
use crate::mem::Memory;

/// Reads a program file from disk.
///
/// # Errors
///
/// Returns [`SimError::Io`] when the file cannot be read.
pub fn read_file(path: &str) -> Result<Vec<u8>, SimError> {
    Ok(std::fs::read(path)?)
}

/// Loads an ELF image, returning its entry point.
///
/// # Errors
///
/// Returns [`SimError::Elf`] when the image cannot be parsed.
pub fn load_elf(mem: &mut Memory, bytes: &[u8]) -> Result<u64, SimError> {
    let file = object::File::parse(bytes)?;
    for segment in file.segments() {
        let data = segment.data()?;
        if !data.is_empty() {
            mem.load_bytes(segment.address(), data);
        }
    }
    Ok(file.entry())
}

/// Loads a flat binary at `addr`.
pub fn load_flat(mem: &mut Memory, addr: u64, bytes: &[u8]) {
    mem.load_bytes(addr, bytes);
}

/// True when the bytes carry the ELF magic.
pub fn is_elf(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && bytes[..4] == [0x7F, b'E', b'L', b'F']
}
