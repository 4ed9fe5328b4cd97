//! Loader Tests.
//!
//! Verifies flat loading, ELF detection, and file reading.

use a64sim_core::mem::Memory;
use a64sim_core::sim::loader::{is_elf, load_flat, read_file};
use std::io::Write;

#[test]
fn flat_loading_copies_bytes() {
    let mut mem = Memory::new();
    load_flat(&mut mem, 0x1000, &[0xE0, 0x29, 0x00, 0x91]);
    assert_eq!(mem.read_u32(0x1000), 0x910029E0);
}

#[test]
fn elf_magic_detection() {
    assert!(is_elf(&[0x7F, b'E', b'L', b'F', 2, 1, 1]));
    assert!(!is_elf(&[0x7F, b'E', b'L']), "truncated header");
    assert!(!is_elf(&[0, 0, 0, 0]));
    assert!(!is_elf(&[]));
}

#[test]
fn read_file_round_trips() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(&[1, 2, 3, 4]).expect("write");
    let path = file.path().to_string_lossy().into_owned();
    let bytes = read_file(&path).expect("read back");
    assert_eq!(bytes, vec![1, 2, 3, 4]);
}

#[test]
fn read_file_missing_is_an_error() {
    assert!(read_file("/nonexistent/a64sim-test-program").is_err());
}

#[test]
fn malformed_elf_is_an_error() {
    let mut mem = Memory::new();
    let bogus = [0x7F, b'E', b'L', b'F', 0xFF, 0xFF, 0xFF, 0xFF];
    assert!(a64sim_core::sim::loader::load_elf(&mut mem, &bogus).is_err());
}
