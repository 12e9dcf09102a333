//! Tag record decoders.
//!
//! The reader uses two unrelated record layouts, one for buffer dumps and one
//! for live inventory. Each decoder takes the packet payload and a cursor and
//! returns the tag plus the number of bytes it consumed.

use chrono::{DateTime, Utc};

use crate::types::{Antenna, ReaderError, Tag, bytes_to_hex};

const EPC_PLUS_TID: u8 = 0b1000_0000;
const RECORD_LENGTH: u8 = 0b0111_1111;

/// Decode one buffer-dump record:
/// antenna flag, EPC length, EPC, RSSI, read count.
pub fn decode_buffer_record(
    payload: &[u8],
    offset: usize,
    seen_at: DateTime<Utc>,
) -> Result<(Tag, usize), ReaderError> {
    let antenna = antenna_number(byte_at(payload, offset)?)?;
    let epc_len = byte_at(payload, offset + 1)? as usize;
    let epc = bytes_at(payload, offset + 2, epc_len)?;
    let rssi = byte_at(payload, offset + 2 + epc_len)?;
    let read_count = byte_at(payload, offset + 3 + epc_len)?;

    let tag = Tag {
        tag_id: bytes_to_hex(epc),
        rssi,
        read_count,
        antenna,
        discovery_time: seen_at,
        last_seen_time: seen_at,
    };
    Ok((tag, epc_len + 4))
}

/// Decode one inventory record: a length byte whose high bit marks an
/// EPC+TID record, the record body, then RSSI. The antenna comes from the
/// packet, not the record.
///
/// For EPC+TID records the EPC is the first `length / 2` bytes; the TID
/// remainder is skipped.
pub fn decode_inventory_record(
    payload: &[u8],
    offset: usize,
    antenna: u8,
    seen_at: DateTime<Utc>,
) -> Result<(Tag, usize), ReaderError> {
    let flags = byte_at(payload, offset)?;
    let length = (flags & RECORD_LENGTH) as usize;
    let epc_len = if flags & EPC_PLUS_TID != 0 {
        length / 2
    } else {
        length
    };

    // body must be present in full even though only the EPC part is kept
    bytes_at(payload, offset + 1, length)?;
    let epc = bytes_at(payload, offset + 1, epc_len)?;
    let rssi = byte_at(payload, offset + length + 1)?;

    let tag = Tag {
        tag_id: bytes_to_hex(epc),
        rssi,
        read_count: 1,
        antenna,
        discovery_time: seen_at,
        last_seen_time: seen_at,
    };
    Ok((tag, length + 2))
}

/// 0-based antenna number for a one-hot selector byte
pub fn antenna_number(flag: u8) -> Result<u8, ReaderError> {
    Antenna::from_flag(flag)
        .map(Antenna::number)
        .ok_or(ReaderError::InvalidAntenna(flag))
}

pub(crate) fn byte_at(payload: &[u8], offset: usize) -> Result<u8, ReaderError> {
    payload.get(offset).copied().ok_or_else(|| {
        ReaderError::MalformedPacket(format!(
            "offset {} is past the end of a {} byte payload",
            offset,
            payload.len()
        ))
    })
}

fn bytes_at(payload: &[u8], offset: usize, len: usize) -> Result<&[u8], ReaderError> {
    payload.get(offset..offset + len).ok_or_else(|| {
        ReaderError::MalformedPacket(format!(
            "record needs bytes {}..{} of a {} byte payload",
            offset,
            offset + len,
            payload.len()
        ))
    })
}
