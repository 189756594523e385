//! Value types for reader operations

use crate::error::DeviceFault;

/// A tag report decoded from an inventory or single-query frame
#[derive(Debug, Clone)]
pub struct Tag {
    /// EPC rendered as uppercase hex
    pub epc: String,
    /// PC value (byte 3 of the report frame)
    pub pc: u16,
    /// Antenna index the tag was seen on
    pub ant: u8,
    /// Decoded signal strength
    pub rssi: f32,
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.epc == other.epc
    }
}

/// Reader power configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerOption {
    pub read_power: u8,
    pub write_power: u8,
    /// Open-loop flag reported by the module
    pub is_loop: bool,
}

/// Result of a filtered tag data query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInfo {
    /// Queried data rendered as uppercase hex
    pub epc: String,
    /// Antenna index the tag was read on
    pub ant: u8,
}

/// Result of a tag write operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteTagResult {
    /// Antenna index the write went through
    pub ant: u8,
    pub is_success: bool,
}

/// Tag filter selector for query/write operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FilterType {
    Epc = 0x00,
    Tid = 0x01,
}

/// Serial baud rate indices understood by the module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BaudRate {
    B9600 = 0,
    B19200 = 1,
    B38400 = 2,
    B57600 = 3,
    B115200 = 4,
}

/// Connection/read state snapshot, maintained by the connection task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReaderState {
    pub connected: bool,
    pub reading: bool,
}

/// Ambient notifications emitted by the reader.
///
/// `Run` fires when continuous inventory starts; `Wait` when the module
/// reports it found no tag (`0xFE` frame). Device faults and transport
/// errors are notifications, not command results — a pending command is
/// unaffected by them.
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderEvent {
    Opened,
    Closed,
    Run,
    Wait,
    Device(DeviceFault),
    Transport(String),
}

/// Convert bytes to an uppercase hex string
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

/// Parse a hex string into bytes; a trailing odd nibble is ignored
pub fn hex_to_bytes(data: &str) -> Vec<u8> {
    let chars: Vec<char> = data.chars().collect();
    let mut value = Vec::with_capacity(chars.len() / 2);
    for pair in chars.chunks_exact(2) {
        let s: String = pair.iter().collect();
        if let Ok(byte) = u8::from_str_radix(&s, 16) {
            value.push(byte);
        }
    }
    value
}
