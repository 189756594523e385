//! Error types for reader operations

use thiserror::Error;

/// Errors that can occur while talking to the reader module
#[derive(Debug, Error)]
pub enum R2000Error {
    /// Transport layer error (serial port, UART, etc.)
    #[error("transport error: {0}")]
    Transport(String),
    /// Invalid parameter passed to a function; rejected before any bytes are sent
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// The reader returned a response that could not be decoded, or rejected the operation
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// A command was issued while the connection is closed
    #[error("reader is not connected")]
    NotConnected,
    /// The connection was closed while the response was still pending
    #[error("connection closed before the response arrived")]
    Closed,
}

/// Fault category reported by the module in an `0xFF` frame.
///
/// Faults are surfaced as [`ReaderEvent::Device`](crate::ReaderEvent::Device)
/// notifications; they never resolve a pending command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeviceFault {
    #[error("checksum mismatch")]
    ChecksumMismatch,
    #[error("over-temperature")]
    OverTemperature,
    #[error("excess reflection")]
    ExcessReflection,
    #[error("other device fault")]
    Other,
}

impl DeviceFault {
    /// Map the sub-code found at byte 3 of an `0xFF` frame.
    pub(crate) fn from_code(code: u8) -> Self {
        match code {
            1 => DeviceFault::ChecksumMismatch,
            2 => DeviceFault::OverTemperature,
            3 => DeviceFault::ExcessReflection,
            _ => DeviceFault::Other,
        }
    }
}
