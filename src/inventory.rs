//! Folding the response frames of one command into a tag collection.
//!
//! The caller owns the continuation loop: these types only consume whatever
//! ordered, finite sequence of packets they are given. A failure in any packet
//! fails the whole result.

use crate::codec::{antenna_number, byte_at, decode_buffer_record, decode_inventory_record};
use crate::packet::ResponsePacket;
use crate::types::{ReaderCommand, ReaderError, Tag, status};

/// Tags from a live inventory, or buffer counters from a buffered inventory
#[derive(Debug, Clone, Default)]
pub struct TagInventoryResult {
    tags: Vec<Tag>,
    tags_in_buffer: u16,
    tags_in_last_inventory: u16,
}

impl TagInventoryResult {
    pub fn from_packets<'a, I>(packets: I) -> Result<Self, ReaderError>
    where
        I: IntoIterator<Item = &'a ResponsePacket>,
    {
        let mut result = Self::default();
        for packet in packets {
            let command = ReaderCommand::from_code(packet.command());
            match (command, packet.status()) {
                (
                    Some(ReaderCommand::TagInventory),
                    status::INVENTORY_TIMEOUT
                    | status::INVENTORY_MORE_FRAMES_PENDING
                    | status::INVENTORY_BUFFER_OVERFLOW
                    | status::INVENTORY_COMPLETE,
                ) => result.read_inventory_block(packet)?,
                (Some(ReaderCommand::TagInventory), status::INVENTORY_STATISTICS_DELIVERY) => {
                    return Err(ReaderError::UnsupportedStatisticsFrame);
                }
                (Some(ReaderCommand::TagInventoryWithMemoryBuffer), status::SUCCESS) => {
                    result.read_buffer_counters(packet)?
                }
                _ => {
                    return Err(ReaderError::UnexpectedResponse {
                        command: packet.command(),
                        status: packet.status(),
                    });
                }
            }
        }
        Ok(result)
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn into_tags(self) -> Vec<Tag> {
        self.tags
    }

    /// Tags held by the reader buffer after a buffered inventory
    pub fn tags_in_buffer(&self) -> u16 {
        self.tags_in_buffer
    }

    /// Tags seen by the last buffered inventory round
    pub fn tags_in_last_inventory(&self) -> u16 {
        self.tags_in_last_inventory
    }

    // antenna flag, record count, records
    fn read_inventory_block(&mut self, packet: &ResponsePacket) -> Result<(), ReaderError> {
        let payload = packet.payload();
        let antenna = antenna_number(byte_at(payload, 0)?)?;
        let count = byte_at(payload, 1)?;

        let mut offset = 2;
        for _ in 0..count {
            let (tag, consumed) =
                decode_inventory_record(payload, offset, antenna, packet.captured_at())?;
            self.tags.push(tag);
            offset += consumed;
        }
        Ok(())
    }

    fn read_buffer_counters(&mut self, packet: &ResponsePacket) -> Result<(), ReaderError> {
        self.tags_in_buffer = packet.read_u16_be(0)?;
        self.tags_in_last_inventory = packet.read_u16_be(2)?;
        Ok(())
    }
}

/// Tags dumped from the reader's memory buffer
#[derive(Debug, Clone, Default)]
pub struct TagBufferResult {
    tags: Vec<Tag>,
}

impl TagBufferResult {
    pub fn from_packets<'a, I>(packets: I) -> Result<Self, ReaderError>
    where
        I: IntoIterator<Item = &'a ResponsePacket>,
    {
        let mut result = Self::default();
        for packet in packets {
            match (ReaderCommand::from_code(packet.command()), packet.status()) {
                (
                    Some(ReaderCommand::GetTagsFromBuffer),
                    status::INVENTORY_MORE_FRAMES_PENDING | status::INVENTORY_COMPLETE,
                ) => result.read_buffer_block(packet)?,
                _ => {
                    return Err(ReaderError::UnexpectedResponse {
                        command: packet.command(),
                        status: packet.status(),
                    });
                }
            }
        }
        Ok(result)
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn into_tags(self) -> Vec<Tag> {
        self.tags
    }

    // record count, records
    fn read_buffer_block(&mut self, packet: &ResponsePacket) -> Result<(), ReaderError> {
        let payload = packet.payload();
        let count = byte_at(payload, 0)?;

        let mut offset = 1;
        for _ in 0..count {
            let (tag, consumed) = decode_buffer_record(payload, offset, packet.captured_at())?;
            self.tags.push(tag);
            offset += consumed;
        }
        Ok(())
    }
}
