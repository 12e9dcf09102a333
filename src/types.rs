//! Types shared by the packet, codec and reader layers

use chrono::{DateTime, Utc};
use std::time::Duration;

/// A single RFID tag observation decoded from a reader response.
///
/// Two observations are equal only if every field matches; compare
/// `tag_id` to ask whether they saw the same EPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// EPC rendered as uppercase hex, two digits per byte
    pub tag_id: String,
    pub rssi: u8,
    pub read_count: u8,
    /// 0-based antenna number
    pub antenna: u8,
    pub discovery_time: DateTime<Utc>,
    pub last_seen_time: DateTime<Utc>,
}

/// Command codes understood by the reader
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderCommand {
    TagInventory = 0x01,
    TagInventoryWithMemoryBuffer = 0x18,
    GetReaderInformation = 0x21,
    SetInventoryScanInterval = 0x25,
    SetRfPower = 0x2F,
    GetReaderSerialNumber = 0x4C,
    SetEpcLengthForBufferOperations = 0x70,
    GetEpcLengthForBufferOperations = 0x71,
    GetTagsFromBuffer = 0x72,
    ClearBuffer = 0x73,
    GetNumberOfTagsInBuffer = 0x74,
}

impl ReaderCommand {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::TagInventory),
            0x18 => Some(Self::TagInventoryWithMemoryBuffer),
            0x21 => Some(Self::GetReaderInformation),
            0x25 => Some(Self::SetInventoryScanInterval),
            0x2F => Some(Self::SetRfPower),
            0x4C => Some(Self::GetReaderSerialNumber),
            0x70 => Some(Self::SetEpcLengthForBufferOperations),
            0x71 => Some(Self::GetEpcLengthForBufferOperations),
            0x72 => Some(Self::GetTagsFromBuffer),
            0x73 => Some(Self::ClearBuffer),
            0x74 => Some(Self::GetNumberOfTagsInBuffer),
            _ => None,
        }
    }
}

/// Response status codes.
///
/// Kept as raw bytes: readers report error codes outside this set and those
/// must reach the caller untouched.
pub mod status {
    pub const SUCCESS: u8 = 0x00;
    pub const INVENTORY_COMPLETE: u8 = 0x01;
    pub const INVENTORY_TIMEOUT: u8 = 0x02;
    pub const INVENTORY_MORE_FRAMES_PENDING: u8 = 0x03;
    pub const INVENTORY_BUFFER_OVERFLOW: u8 = 0x04;
    pub const INVENTORY_STATISTICS_DELIVERY: u8 = 0x26;
}

/// Antenna selector as reported by the reader: exactly one bit set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Antenna {
    Antenna1,
    Antenna2,
    Antenna3,
    Antenna4,
    Antenna5,
    Antenna6,
    Antenna7,
    Antenna8,
}

impl Antenna {
    /// Map a one-hot flag byte to an antenna. Zero or multi-bit flags yield `None`.
    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            0x01 => Some(Self::Antenna1),
            0x02 => Some(Self::Antenna2),
            0x04 => Some(Self::Antenna3),
            0x08 => Some(Self::Antenna4),
            0x10 => Some(Self::Antenna5),
            0x20 => Some(Self::Antenna6),
            0x40 => Some(Self::Antenna7),
            0x80 => Some(Self::Antenna8),
            _ => None,
        }
    }

    pub fn flag(self) -> u8 {
        1 << self.number()
    }

    /// 0-based antenna number
    pub fn number(self) -> u8 {
        match self {
            Self::Antenna1 => 0,
            Self::Antenna2 => 1,
            Self::Antenna3 => 2,
            Self::Antenna4 => 3,
            Self::Antenna5 => 4,
            Self::Antenna6 => 5,
            Self::Antenna7 => 6,
            Self::Antenna8 => 7,
        }
    }
}

/// Gen2 inventory session
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionValue {
    #[default]
    S0 = 0x00,
    S1 = 0x01,
    S2 = 0x02,
    S3 = 0x03,
}

/// Parameters for the inventory commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagInventoryParams {
    /// Initial Q value (0-15)
    pub q_value: u8,
    pub session: SessionValue,
}

impl Default for TagInventoryParams {
    fn default() -> Self {
        Self {
            q_value: 4,
            session: SessionValue::S0,
        }
    }
}

/// Longest EPC the reader keeps per buffered tag
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpcLength {
    UpTo128Bits = 0x00,
    UpTo496Bits = 0x01,
}

impl EpcLength {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::UpTo128Bits),
            0x01 => Some(Self::UpTo496Bits),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
}

/// Reader configuration as reported by GetReaderInformation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderInfo {
    pub firmware_version: FirmwareVersion,
    /// Model code
    pub model: u8,
    /// Air protocol flags, see `supports_iso18000_6c` / `supports_iso18000_6b`
    pub supported_protocols: u8,
    /// Band bits (7-6) and highest channel (5-0)
    pub max_frequency: u8,
    /// Band bits (7-6) and lowest channel (5-0)
    pub min_frequency: u8,
    /// RF output power in dBm
    pub rf_power: u8,
    pub inventory_scan_interval: Duration,
    /// Enabled antennas, one bit per antenna
    pub antenna_configuration: u8,
    pub beep_enabled: bool,
    pub antenna_check: bool,
}

impl ReaderInfo {
    pub const DATA_LENGTH: u16 = 12;
    const SCAN_INTERVAL_UNIT_MS: u64 = 100;
    const PROTOCOL_6B: u8 = 0b01;
    const PROTOCOL_6C: u8 = 0b10;

    // version major, version minor, model, protocols, max freq, min freq,
    // power, scan interval, antennas, beep, reserved, antenna check
    pub(crate) fn from_payload(payload: &[u8]) -> Result<Self, ReaderError> {
        let bytes: &[u8; 12] = payload.try_into().map_err(|_| {
            ReaderError::MalformedPacket(format!(
                "reader information needs {} bytes, got {}",
                Self::DATA_LENGTH,
                payload.len()
            ))
        })?;

        Ok(Self {
            firmware_version: FirmwareVersion {
                major: bytes[0],
                minor: bytes[1],
            },
            model: bytes[2],
            supported_protocols: bytes[3],
            max_frequency: bytes[4],
            min_frequency: bytes[5],
            rf_power: bytes[6],
            inventory_scan_interval: Duration::from_millis(
                bytes[7] as u64 * Self::SCAN_INTERVAL_UNIT_MS,
            ),
            antenna_configuration: bytes[8],
            beep_enabled: bytes[9] != 0,
            antenna_check: bytes[11] != 0,
        })
    }

    pub fn supports_iso18000_6c(&self) -> bool {
        self.supported_protocols & Self::PROTOCOL_6C != 0
    }

    pub fn supports_iso18000_6b(&self) -> bool {
        self.supported_protocols & Self::PROTOCOL_6B != 0
    }

    /// Antennas enabled in `antenna_configuration`, lowest first
    pub fn antennas(&self) -> Vec<Antenna> {
        (0..8u8)
            .filter_map(|bit| Antenna::from_flag(self.antenna_configuration & (1 << bit)))
            .collect()
    }
}

/// Errors that can occur while talking to the reader or decoding its replies
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// Transport layer error (serial port, etc.)
    #[error("transport error: {0}")]
    Transport(String),

    /// Invalid parameter passed to a function
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No complete frame arrived before the response timeout
    #[error("timed out waiting for response")]
    Timeout,

    /// Frame checksum does not match its contents
    #[error("checksum mismatch: expected {expected:#06x}, calculated {calculated:#06x}")]
    ChecksumMismatch { expected: u16, calculated: u16 },

    /// Command/status pair not recognized by the current operation
    #[error("unexpected response: command {command:#04x}, status {status:#04x}")]
    UnexpectedResponse { command: u8, status: u8 },

    /// Frame too short or a declared length disagrees with the bytes present
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    /// Reader reported a non-zero status for a success-checked command
    #[error("command {command:#04x} failed with status {status:#04x}")]
    CommandExecutionFailed { command: u8, status: u8 },

    /// Inventory statistics frames are not decoded
    #[error("inventory statistics frames are not supported")]
    UnsupportedStatisticsFrame,

    /// Antenna selector byte is zero or has more than one bit set
    #[error("invalid antenna flag: {0:#04x}")]
    InvalidAntenna(u8),
}

/// Convert bytes to uppercase hex string
pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}
