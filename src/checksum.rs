//! Additive frame checksum.
//!
//! The module's firmware calls this field "CRC" but it is a plain additive
//! sum modulo 256 over the bytes between the start marker and the checksum
//! slot. The additive behavior must be kept exactly for wire compatibility.

/// Compute the checksum of a frame: wrapping sum of bytes `1..len-3`.
///
/// The range excludes the start marker, the checksum slot itself and the
/// two terminator bytes. Callers must pass a frame of at least 6 bytes.
pub(crate) fn checksum(frame: &[u8]) -> u8 {
    debug_assert!(frame.len() >= 6);
    frame[1..frame.len() - 3]
        .iter()
        .fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Stamp an outgoing frame: write the checksum into slot `len-3`.
pub(crate) fn stamp(frame: &mut [u8]) {
    let value = checksum(frame);
    let slot = frame.len() - 3;
    frame[slot] = value;
}

/// Validate an incoming frame against its stored checksum byte.
pub(crate) fn verify(frame: &[u8]) -> bool {
    frame[frame.len() - 3] == checksum(frame)
}
