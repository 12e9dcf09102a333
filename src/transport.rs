/// Byte-level link to the reader.
/// Implement this trait for each physical backend (serial port, test doubles, etc.)
pub trait RfidTransport {
    /// Error type for transport operations
    type Error: std::fmt::Debug;

    /// Write a complete command frame
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Read whatever bytes are available, waiting at most `timeout_ms`.
    /// Returning `Ok(0)` means nothing arrived in time.
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error>;

    /// Drop any stale bytes waiting in the input buffer
    fn clear_input(&mut self) -> Result<(), Self::Error>;
}
