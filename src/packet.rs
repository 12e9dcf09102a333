//! Validated view over a single response frame
//!
//! Frame layout:
//!
//! | Offset | Field |
//! |---|---|
//! | 0 | length (`data_length + 5`) |
//! | 1 | address |
//! | 2 | command |
//! | 3 | status |
//! | 4.. | payload, `length - 5` bytes |
//!
//! Frames read off the wire are followed by a CRC trailer which the
//! transport has already checked; it is kept in `raw` but never interpreted.

use chrono::{DateTime, Utc};

use crate::types::{ReaderCommand, ReaderError, ReaderInfo, status};

pub struct ResponsePacket {
    raw: Vec<u8>,
    expected_command: ReaderCommand,
    captured_at: DateTime<Utc>,
}

impl ResponsePacket {
    pub const HEADER_LEN: usize = 5;
    pub const DATA_OFFSET: usize = 4;

    /// Wrap a raw frame. The buffer must hold exactly `length` bytes, or
    /// `length + 1` when the wire CRC is still attached.
    pub fn new(
        expected_command: ReaderCommand,
        raw: Vec<u8>,
        captured_at: DateTime<Utc>,
    ) -> Result<Self, ReaderError> {
        if raw.len() < Self::HEADER_LEN {
            return Err(ReaderError::MalformedPacket(format!(
                "frame has {} bytes, header needs {}",
                raw.len(),
                Self::HEADER_LEN
            )));
        }

        let length = raw[0] as usize;
        if length < Self::HEADER_LEN {
            return Err(ReaderError::MalformedPacket(format!(
                "declared length {} is shorter than the header",
                length
            )));
        }
        if raw.len() != length && raw.len() != length + 1 {
            return Err(ReaderError::MalformedPacket(format!(
                "declared length {} but frame has {} bytes",
                length,
                raw.len()
            )));
        }

        Ok(Self {
            raw,
            expected_command,
            captured_at,
        })
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn expected_command(&self) -> ReaderCommand {
        self.expected_command
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn length(&self) -> u8 {
        self.raw[0]
    }

    pub fn address(&self) -> u8 {
        self.raw[1]
    }

    pub fn command(&self) -> u8 {
        self.raw[2]
    }

    pub fn status(&self) -> u8 {
        self.raw[3]
    }

    pub fn data_length(&self) -> u16 {
        u16::from(self.length()) - Self::HEADER_LEN as u16
    }

    pub fn payload(&self) -> &[u8] {
        let end = Self::DATA_OFFSET + self.data_length() as usize;
        &self.raw[Self::DATA_OFFSET..end]
    }

    /// Check that this frame answers the expected command and, if given,
    /// carries exactly `expected_data_length` payload bytes.
    pub fn validate(&self, expected_data_length: Option<u16>) -> Result<(), ReaderError> {
        if self.command() != self.expected_command.code() {
            return Err(ReaderError::UnexpectedResponse {
                command: self.command(),
                status: self.status(),
            });
        }
        match expected_data_length {
            Some(expected) if self.data_length() != expected => {
                Err(ReaderError::MalformedPacket(format!(
                    "expected {} data bytes, got {}",
                    expected,
                    self.data_length()
                )))
            }
            _ => Ok(()),
        }
    }

    /// For set-style commands whose success reply carries no payload
    pub fn check_success(&self) -> Result<(), ReaderError> {
        self.check_success_with(0)
    }

    /// Like `check_success`, for replies carrying exactly `data_length` bytes
    pub fn check_success_with(&self, data_length: u16) -> Result<(), ReaderError> {
        self.validate(Some(data_length))?;
        if self.status() != status::SUCCESS {
            return Err(ReaderError::CommandExecutionFailed {
                command: self.command(),
                status: self.status(),
            });
        }
        Ok(())
    }

    /// Decode a GetReaderInformation reply
    pub fn reader_info(&self) -> Result<ReaderInfo, ReaderError> {
        self.validate(Some(ReaderInfo::DATA_LENGTH))?;
        ReaderInfo::from_payload(self.payload())
    }

    /// Big-endian u32 at a payload offset
    pub fn read_u32_be(&self, offset: usize) -> Result<u32, ReaderError> {
        let bytes = self.payload_bytes::<4>(offset)?;
        Ok(u32::from_be_bytes(bytes))
    }

    /// Big-endian u16 at a payload offset
    pub fn read_u16_be(&self, offset: usize) -> Result<u16, ReaderError> {
        let bytes = self.payload_bytes::<2>(offset)?;
        Ok(u16::from_be_bytes(bytes))
    }

    fn payload_bytes<const N: usize>(&self, offset: usize) -> Result<[u8; N], ReaderError> {
        self.payload()
            .get(offset..offset + N)
            .and_then(|slice| slice.try_into().ok())
            .ok_or_else(|| {
                ReaderError::MalformedPacket(format!(
                    "{} bytes at offset {} exceed payload of {} bytes",
                    N,
                    offset,
                    self.data_length()
                ))
            })
    }
}

impl std::fmt::Debug for ResponsePacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponsePacket")
            .field("command", &format_args!("{:#04x}", self.command()))
            .field("status", &format_args!("{:#04x}", self.status()))
            .field("payload", &format_args!("{:02X?}", self.payload()))
            .field("captured_at", &self.captured_at)
            .finish()
    }
}
