//! Packet framing
//!
//! Every message exchanged with the target starts with an 8-byte header:
//! - 2 bytes: total packet length, header included
//! - 2 bytes: packet type
//! - 1 byte:  response type
//! - 3 bytes: reserved (zero)
//!
//! Multi-byte header fields are written in the target's byte order. The
//! payload follows the header unmodified; per-field normalization is the
//! caller's job (see [`PayloadWriter`]).

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use super::byte_order::{normalize, ByteOrderNormalize};
use super::{CommError, HEADER_SIZE, MAX_TX_PACKET_SIZE};

/// Kind of message on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum PacketType {
    /// Read the current self-test status packet
    GetSelfTestPacket = 0x01,
    /// Read a data stream's configuration
    GetStreamInformation = 0x02,
    /// Read a variable's dictionary entry
    GetVariableInformation = 0x03,
    /// Read the variable assigned to a chart channel
    GetChartIndex = 0x04,
    /// Read a datalog buffer
    GetDatalogBuffer = 0x05,
    /// Read fault log entries
    GetFaultData = 0x06,
    /// Read the history of one fault
    GetFaultHistory = 0x07,
    /// Switch the active event log
    ChangeEventLog = 0x08,
    /// Read the watch element values
    UpdateWatchElements = 0x09,
    /// Write a variable
    SendVariableValue = 0x10,
    /// Assign the car identifier
    SetCarId = 0x11,
    /// Route a variable to a chart channel
    SetChartIndex = 0x12,
    /// Select the chart recorder mode
    SetChartMode = 0x13,
    /// Set a chart variable's scale
    SetChartScale = 0x14,
    /// Enable or disable a fault
    SetFaultFlag = 0x15,
    /// Turn fault logging on or off
    SetFaultLog = 0x16,
    /// Configure a data stream
    SetStreamInformation = 0x17,
    /// Set the real-time clock
    SetTimeDate = 0x18,
    /// Choose the watched variables
    SetWatchElements = 0x19,
    /// Self-test command, see [`SelfTestCommandId`](super::SelfTestCommandId)
    SelfTestCommand = 0x20,
    /// Enter self-test mode
    StartSelfTestTask = 0x21,
    /// Leave self-test mode
    ExitSelfTestTask = 0x22,
}

impl PacketType {
    const ALL: [PacketType; 22] = [
        PacketType::GetSelfTestPacket,
        PacketType::GetStreamInformation,
        PacketType::GetVariableInformation,
        PacketType::GetChartIndex,
        PacketType::GetDatalogBuffer,
        PacketType::GetFaultData,
        PacketType::GetFaultHistory,
        PacketType::ChangeEventLog,
        PacketType::UpdateWatchElements,
        PacketType::SendVariableValue,
        PacketType::SetCarId,
        PacketType::SetChartIndex,
        PacketType::SetChartMode,
        PacketType::SetChartScale,
        PacketType::SetFaultFlag,
        PacketType::SetFaultLog,
        PacketType::SetStreamInformation,
        PacketType::SetTimeDate,
        PacketType::SetWatchElements,
        PacketType::SelfTestCommand,
        PacketType::StartSelfTestTask,
        PacketType::ExitSelfTestTask,
    ];

    /// Wire code of this packet type
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Look up a packet type by wire code
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.code() == code)
    }
}

/// What the target sends back for a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ResponseType {
    /// Acknowledgement only
    CommandResponse = 0x01,
    /// Acknowledgement carrying a data payload
    DataResponse = 0x02,
}

impl ResponseType {
    /// Wire code of this response type
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Look up a response type by wire code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(ResponseType::CommandResponse),
            0x02 => Some(ResponseType::DataResponse),
            _ => None,
        }
    }
}

/// Decoded packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Total packet length including the header
    pub length: u16,
    /// Message kind
    pub packet_type: PacketType,
    /// Expected or carried response kind
    pub response_type: ResponseType,
}

impl PacketHeader {
    /// Encode the header in the target's byte order
    pub fn to_bytes(&self, target_is_big_endian: bool) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        LittleEndian::write_u16(&mut bytes[0..2], normalize(self.length, target_is_big_endian));
        LittleEndian::write_u16(
            &mut bytes[2..4],
            normalize(self.packet_type.code(), target_is_big_endian),
        );
        bytes[4] = self.response_type.code();
        bytes
    }

    /// Decode a header received from the target
    pub fn parse(data: &[u8], target_is_big_endian: bool) -> Result<Self, CommError> {
        if data.len() < HEADER_SIZE {
            return Err(CommError::BadResponse(format!(
                "header truncated to {} bytes",
                data.len()
            )));
        }

        let length = normalize(LittleEndian::read_u16(&data[0..2]), target_is_big_endian);
        if (length as usize) < HEADER_SIZE {
            return Err(CommError::BadResponse(format!(
                "declared packet length {} is shorter than the header",
                length
            )));
        }

        let code = normalize(LittleEndian::read_u16(&data[2..4]), target_is_big_endian);
        let packet_type = PacketType::from_code(code)
            .ok_or_else(|| CommError::BadResponse(format!("unknown packet type {:#06x}", code)))?;

        let response_type = ResponseType::from_code(data[4]).ok_or_else(|| {
            CommError::BadResponse(format!("unknown response type {:#04x}", data[4]))
        })?;

        Ok(Self {
            length,
            packet_type,
            response_type,
        })
    }

    /// Number of payload bytes following the header.
    ///
    /// Zero for a hand-built header whose length does not cover the header itself.
    pub fn payload_len(&self) -> usize {
        (self.length as usize).saturating_sub(HEADER_SIZE)
    }
}

/// Prefix `payload` with a header, producing the complete outbound packet.
///
/// Fails fast when the framed packet would exceed [`MAX_TX_PACKET_SIZE`].
pub fn frame(
    payload: &[u8],
    packet_type: PacketType,
    response_type: ResponseType,
    target_is_big_endian: bool,
) -> Result<Vec<u8>, CommError> {
    let size = HEADER_SIZE + payload.len();
    if size > MAX_TX_PACKET_SIZE {
        return Err(CommError::PacketTooLarge {
            size,
            max: MAX_TX_PACKET_SIZE,
        });
    }

    let header = PacketHeader {
        length: size as u16,
        packet_type,
        response_type,
    };

    let mut bytes = Vec::with_capacity(size);
    bytes.extend_from_slice(&header.to_bytes(target_is_big_endian));
    bytes.extend_from_slice(payload);
    Ok(bytes)
}

/// Builder for request payloads.
///
/// Every multi-byte field is normalized to the target's byte order as it is
/// written, so stored request values are never touched.
pub struct PayloadWriter {
    payload: Vec<u8>,
    big_endian: bool,
}

impl PayloadWriter {
    /// Create a writer for a target with the given byte order
    pub fn new(target_is_big_endian: bool) -> Self {
        Self {
            payload: Vec::new(),
            big_endian: target_is_big_endian,
        }
    }

    /// Add a single byte
    pub fn u8(mut self, value: u8) -> Self {
        self.payload.push(value);
        self
    }

    /// Add a 16-bit unsigned value
    pub fn u16(mut self, value: u16) -> Self {
        let mut buf = [0u8; 2];
        LittleEndian::write_u16(&mut buf, self.norm(value));
        self.payload.extend_from_slice(&buf);
        self
    }

    /// Add a 16-bit signed value
    pub fn i16(mut self, value: i16) -> Self {
        let mut buf = [0u8; 2];
        LittleEndian::write_i16(&mut buf, self.norm(value));
        self.payload.extend_from_slice(&buf);
        self
    }

    /// Add a 32-bit unsigned value
    pub fn u32(mut self, value: u32) -> Self {
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, self.norm(value));
        self.payload.extend_from_slice(&buf);
        self
    }

    /// Add a 32-bit signed value
    pub fn i32(mut self, value: i32) -> Self {
        let mut buf = [0u8; 4];
        LittleEndian::write_i32(&mut buf, self.norm(value));
        self.payload.extend_from_slice(&buf);
        self
    }

    /// Add raw bytes (strings, pre-encoded fields)
    pub fn bytes(mut self, data: &[u8]) -> Self {
        self.payload.extend_from_slice(data);
        self
    }

    /// Finish and return the payload
    pub fn build(self) -> Vec<u8> {
        self.payload
    }

    fn norm<T: ByteOrderNormalize>(&self, value: T) -> T {
        normalize(value, self.big_endian)
    }
}
