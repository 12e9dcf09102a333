use chrono::Utc;
use log::{debug, error, warn};
use std::time::{Duration, Instant};

use crate::checksum::{frame_crc, verify_frame};
use crate::inventory::{TagBufferResult, TagInventoryResult};
use crate::packet::ResponsePacket;
use crate::transport::RfidTransport;
use crate::types::{
    EpcLength, ReaderCommand, ReaderError, ReaderInfo, TagInventoryParams, status,
};

pub struct SerialReader<T: RfidTransport> {
    transport: T,
    address: u8,
    response_timeout: Duration,
    pending: Vec<u8>,
}

impl<T: RfidTransport> SerialReader<T> {
    /// Any reader on the link answers this address
    pub const BROADCAST_ADDRESS: u8 = 0xFF;
    const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(1000);
    const READ_TIMEOUT_MS: u32 = 50;
    // address, command, status, crc lsb, crc msb
    const MIN_RESPONSE_LEN: u8 = 5;

    const MAX_RF_POWER: u8 = 30;
    const MAX_Q_VALUE: u8 = 15;
    const SCAN_INTERVAL_UNIT_MS: u128 = 100;
    const MIN_SCAN_INTERVAL_MS: u128 = 300;
    const MAX_SCAN_INTERVAL_MS: u128 = 25_500;

    /// Create a reader talking to whichever device answers the broadcast address
    pub fn new(transport: T) -> Self {
        Self::with_address(transport, Self::BROADCAST_ADDRESS)
    }

    pub fn with_address(transport: T, address: u8) -> Self {
        Self {
            transport,
            address,
            response_timeout: Self::DEFAULT_RESPONSE_TIMEOUT,
            pending: Vec::new(),
        }
    }

    /// How long to wait for each response frame
    pub fn set_response_timeout(&mut self, timeout: Duration) {
        self.response_timeout = timeout;
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Get the reader's serial number
    pub fn get_serial_number(&mut self) -> Result<u32, ReaderError> {
        let packet = self.exec(ReaderCommand::GetReaderSerialNumber, &[])?;
        packet.check_success_with(4)?;
        packet.read_u32_be(0)
    }

    /// Get firmware version, model and current configuration
    pub fn get_reader_info(&mut self) -> Result<ReaderInfo, ReaderError> {
        let packet = self.exec(ReaderCommand::GetReaderInformation, &[])?;
        packet.check_success_with(ReaderInfo::DATA_LENGTH)?;
        packet.reader_info()
    }

    /// Set RF output power in dBm (0-30)
    pub fn set_rf_power(&mut self, power_dbm: u8) -> Result<(), ReaderError> {
        if power_dbm > Self::MAX_RF_POWER {
            return Err(ReaderError::InvalidParameter(format!(
                "RF power must be at most {} dBm, got {}",
                Self::MAX_RF_POWER,
                power_dbm
            )));
        }

        self.exec(ReaderCommand::SetRfPower, &[power_dbm])?
            .check_success()
    }

    /// Set the inventory scan interval (300ms to 25.5s, in whole 100ms steps)
    pub fn set_inventory_scan_interval(&mut self, interval: Duration) -> Result<(), ReaderError> {
        let millis = interval.as_millis();
        if !(Self::MIN_SCAN_INTERVAL_MS..=Self::MAX_SCAN_INTERVAL_MS).contains(&millis) {
            return Err(ReaderError::InvalidParameter(format!(
                "Scan interval must be between {} and {} ms, got {}",
                Self::MIN_SCAN_INTERVAL_MS,
                Self::MAX_SCAN_INTERVAL_MS,
                millis
            )));
        }
        if interval.as_nanos() % (Self::SCAN_INTERVAL_UNIT_MS * 1_000_000) != 0 {
            return Err(ReaderError::InvalidParameter(format!(
                "Scan interval must be a multiple of {} ms, got {:?}",
                Self::SCAN_INTERVAL_UNIT_MS,
                interval
            )));
        }

        let units = (millis / Self::SCAN_INTERVAL_UNIT_MS) as u8;
        self.exec(ReaderCommand::SetInventoryScanInterval, &[units])?
            .check_success()
    }

    /// Clear the reader's tag buffer
    pub fn clear_buffer(&mut self) -> Result<(), ReaderError> {
        self.exec(ReaderCommand::ClearBuffer, &[])?.check_success()
    }

    /// Number of tags currently held in the reader's buffer
    pub fn get_number_of_tags_in_buffer(&mut self) -> Result<u16, ReaderError> {
        let packet = self.exec(ReaderCommand::GetNumberOfTagsInBuffer, &[])?;
        packet.check_success_with(2)?;
        packet.read_u16_be(0)
    }

    /// Set how much EPC the reader stores per tag in its buffer
    pub fn set_epc_length_for_buffer_operations(
        &mut self,
        length: EpcLength,
    ) -> Result<(), ReaderError> {
        self.exec(ReaderCommand::SetEpcLengthForBufferOperations, &[length as u8])?
            .check_success()
    }

    pub fn get_epc_length_for_buffer_operations(&mut self) -> Result<EpcLength, ReaderError> {
        let packet = self.exec(ReaderCommand::GetEpcLengthForBufferOperations, &[])?;
        packet.check_success_with(1)?;
        let code = packet.payload()[0];
        EpcLength::from_code(code).ok_or_else(|| {
            ReaderError::MalformedPacket(format!("unknown EPC length code {:#04x}", code))
        })
    }

    /// Run a live inventory and collect every tag reported across all frames
    pub fn tag_inventory(
        &mut self,
        params: &TagInventoryParams,
    ) -> Result<TagInventoryResult, ReaderError> {
        let packets = self.exec_multi(ReaderCommand::TagInventory, &Self::inventory_params(params)?)?;
        TagInventoryResult::from_packets(&packets)
    }

    /// Run an inventory that stores tags in the reader's buffer.
    ///
    /// The result carries only the buffer counters; fetch the tags with
    /// `get_tags_from_buffer()`.
    pub fn tag_inventory_with_memory_buffer(
        &mut self,
        params: &TagInventoryParams,
    ) -> Result<TagInventoryResult, ReaderError> {
        let packets = self.exec_multi(
            ReaderCommand::TagInventoryWithMemoryBuffer,
            &Self::inventory_params(params)?,
        )?;
        TagInventoryResult::from_packets(&packets)
    }

    /// Dump the tags stored in the reader's buffer
    pub fn get_tags_from_buffer(&mut self) -> Result<TagBufferResult, ReaderError> {
        let packets = self.exec_multi(ReaderCommand::GetTagsFromBuffer, &[])?;
        TagBufferResult::from_packets(&packets)
    }

    fn inventory_params(params: &TagInventoryParams) -> Result<[u8; 2], ReaderError> {
        if params.q_value > Self::MAX_Q_VALUE {
            return Err(ReaderError::InvalidParameter(format!(
                "Q value must be at most {}, got {}",
                Self::MAX_Q_VALUE,
                params.q_value
            )));
        }
        Ok([params.q_value, params.session as u8])
    }

    /// Send a command and read its single reply frame
    fn exec(&mut self, command: ReaderCommand, params: &[u8]) -> Result<ResponsePacket, ReaderError> {
        self.send(command, params)?;
        self.read_packet(command)
    }

    /// Send a command and keep reading while the reader says more frames follow
    fn exec_multi(
        &mut self,
        command: ReaderCommand,
        params: &[u8],
    ) -> Result<Vec<ResponsePacket>, ReaderError> {
        self.send(command, params)?;

        let mut packets = Vec::new();
        loop {
            let packet = self.read_packet(command)?;
            let more = packet.command() == command.code()
                && packet.status() == status::INVENTORY_MORE_FRAMES_PENDING;
            packets.push(packet);
            if !more {
                break;
            }
        }
        debug!("{:?} answered with {} frame(s)", command, packets.len());
        Ok(packets)
    }

    fn send(&mut self, command: ReaderCommand, params: &[u8]) -> Result<(), ReaderError> {
        self.pending.clear();
        self.transport
            .clear_input()
            .map_err(|e| ReaderError::Transport(format!("{:?}", e)))?;

        let cmd = Self::create_command(self.address, command.code(), params);
        debug!("Sending command: {:02X?}", cmd);
        let written = self
            .transport
            .write(&cmd)
            .map_err(|e| ReaderError::Transport(format!("{:?}", e)))?;
        debug!("Wrote {} bytes", written);
        Ok(())
    }

    fn read_packet(&mut self, expected: ReaderCommand) -> Result<ResponsePacket, ReaderError> {
        let deadline = Instant::now() + self.response_timeout;

        loop {
            if let Some(frame) = self.take_frame() {
                debug!("Received frame: {:02X?}", frame);
                return ResponsePacket::new(expected, frame, Utc::now());
            }
            if Instant::now() >= deadline {
                return Err(ReaderError::Timeout);
            }

            let mut temp_buf = [0u8; 256];
            match self.transport.read(&mut temp_buf, Self::READ_TIMEOUT_MS) {
                Ok(bytes_read) if bytes_read > 0 => {
                    self.pending.extend_from_slice(&temp_buf[..bytes_read]);
                }
                Ok(_) => std::thread::sleep(Duration::from_millis(10)),
                Err(e) => {
                    error!("Read error: {:?}", e);
                    return Err(ReaderError::Transport(format!("{:?}", e)));
                }
            }
        }
    }

    /// Pop the first complete, checksum-verified frame off the pending bytes.
    /// Bytes in front of it are noise and get dropped.
    fn take_frame(&mut self) -> Option<Vec<u8>> {
        let (start, end) = (0..self.pending.len()).find_map(|start| {
            let length = self.pending[start];
            let end = start + length as usize + 1;
            let candidate = self.pending.get(start..end)?;
            (length >= Self::MIN_RESPONSE_LEN && verify_frame(candidate).is_ok())
                .then_some((start, end))
        })?;

        if start > 0 {
            warn!("Dropping {} bytes before frame: {:02X?}", start, &self.pending[..start]);
        }
        let frame: Vec<u8> = self.pending.drain(..end).skip(start).collect();
        Some(frame)
    }

    /// Build a command frame: length, address, command, params, CRC-16 (LSB first).
    /// The length byte counts every byte after itself.
    pub(crate) fn create_command(address: u8, command: u8, params: &[u8]) -> Vec<u8> {
        let length = (params.len() + 4) as u8;

        let mut cmd = vec![length, address, command];
        cmd.extend_from_slice(params);
        let crc = frame_crc(&cmd);
        cmd.extend_from_slice(&crc.to_le_bytes());
        cmd
    }
}
