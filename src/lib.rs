//! Response decoding for serial UHF RFID readers.
//!
//! The reader answers each command with one or more length-prefixed frames.
//! [`ResponsePacket`] validates a single frame, the `codec` module decodes the
//! two tag record layouts found in inventory and buffer-dump payloads, and
//! [`TagInventoryResult`] / [`TagBufferResult`] fold the frames of one command
//! into a tag collection. [`SerialReader`] drives a reader over any
//! [`RfidTransport`].
//!
//! # Features
//!
//! - `serial` - Serial port transport for desktop using serialport crate
//!
//! # Example
//!
//! ```ignore
//! use uhf_serial_reader::{SerialReader, SerialTransport, TagInventoryParams};
//!
//! let transport = SerialTransport::new("/dev/ttyUSB0", 57600)?;
//! let mut reader = SerialReader::new(transport);
//!
//! for tag in reader.tag_inventory(&TagInventoryParams::default())?.tags() {
//!     println!("{} on antenna {} (rssi {})", tag.tag_id, tag.antenna, tag.rssi);
//! }
//! ```

mod checksum;
pub mod codec;
mod inventory;
mod packet;
mod reader;
mod transport;
mod types;

#[cfg(feature = "serial")]
mod serial;

// Re-exports
pub use inventory::{TagBufferResult, TagInventoryResult};
pub use packet::ResponsePacket;
pub use reader::SerialReader;
pub use transport::RfidTransport;
pub use types::{
    Antenna, EpcLength, FirmwareVersion, ReaderCommand, ReaderError, ReaderInfo, SessionValue,
    Tag, TagInventoryParams, status,
};

#[cfg(feature = "serial")]
pub use serial::SerialTransport;
