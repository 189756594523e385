//! Async driver for R2000-based UHF RFID reader modules over a serial byte
//! stream.
//!
//! The driver turns the module's raw, possibly-fragmented byte stream into
//! validated frames, correlates each command with its matching response by
//! response code, and exposes continuous inventory as a tag stream that runs
//! concurrently with ordinary request/response commands.
//!
//! # Features
//!
//! - `serial` - Serial port transport for desktop using the serialport crate
//!
//! # Example
//!
//! ```ignore
//! use r2000_rfid::{R2000, SerialTransport};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = SerialTransport::new("/dev/ttyUSB0", 115200)?;
//! let (reader, mut events) = R2000::open(transport);
//!
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         println!("{:?}", event);
//!     }
//! });
//!
//! println!("firmware: {}", reader.firmware_version().await?);
//!
//! let mut tags = reader.start_inventory().await?;
//! while let Some(tag) = tags.recv().await {
//!     println!("EPC {} RSSI {} ANT {}", tag.epc, tag.rssi, tag.ant);
//! }
//! # Ok(())
//! # }
//! ```

mod checksum;
mod commands;
mod error;
mod frame;
mod reader;
mod router;
mod transport;
mod types;

#[cfg(feature = "serial")]
mod serial;

// Re-exports
pub use error::{DeviceFault, R2000Error};
pub use reader::{R2000, TagStream};
pub use transport::RfidTransport;
pub use types::{
    BaudRate, FilterType, PowerOption, ReaderEvent, ReaderState, Tag, TagInfo, WriteTagResult,
    bytes_to_hex, hex_to_bytes,
};

#[cfg(feature = "serial")]
pub use serial::SerialTransport;
