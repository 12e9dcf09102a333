//! CRC-16 used on every frame exchanged with the reader.
//!
//! Preset 0xFFFF, polynomial 0x8408 (reflected 0x1021), no final XOR,
//! transmitted low byte first. This is CRC-16/MCRF4XX in the `crc` catalog.

use crc::{CRC_16_MCRF4XX, Crc};

use crate::types::ReaderError;

const FRAME_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_MCRF4XX);

/// CRC over a frame body (everything before the two CRC bytes)
#[inline]
pub fn frame_crc(data: &[u8]) -> u16 {
    FRAME_CRC.checksum(data)
}

/// Split a complete frame into body and trailing CRC and check they agree
pub fn verify_frame(frame: &[u8]) -> Result<(), ReaderError> {
    let Some(split) = frame.len().checked_sub(2) else {
        return Err(ReaderError::MalformedPacket(
            "frame too short for CRC".into(),
        ));
    };
    let (body, trailer) = frame.split_at(split);
    let expected = u16::from_le_bytes([trailer[0], trailer[1]]);
    let calculated = frame_crc(body);
    if expected == calculated {
        Ok(())
    } else {
        Err(ReaderError::ChecksumMismatch {
            expected,
            calculated,
        })
    }
}
