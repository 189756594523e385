/// Trait for reader communication backends.
/// Implement this trait for different transports (serial port, UART, TCP bridge, etc.)
///
/// The connection moves the transport onto a dedicated pump thread, which is
/// the only place `write` and `read` are ever called — implementations do not
/// need to be thread-safe beyond being `Send`.
pub trait RfidTransport: Send + 'static {
    /// Error type for transport operations
    type Error: std::fmt::Debug + Send;

    /// Write data to the transport
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Read data from the transport, waiting at most `timeout_ms`.
    /// A timeout with nothing received must return `Ok(0)`, not an error.
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error>;

    /// Clear the input buffer
    fn clear_input(&mut self) -> Result<(), Self::Error>;
}
