#![allow(dead_code)]

use std::collections::VecDeque;

use vcu_comm::protocol::{CommDevice, CommError, PacketHeader, PacketType, ResponseType};

/// Canned reaction of the mock target to one receive call
pub enum Reply {
    Ack,
    Data(Vec<u8>),
    Timeout,
    Disconnected,
}

/// Scripted device: records every packet sent and answers receives in order
pub struct MockDevice {
    pub big_endian: bool,
    pub sent: Vec<Vec<u8>>,
    replies: VecDeque<Reply>,
}

impl MockDevice {
    pub fn new(big_endian: bool) -> Self {
        Self {
            big_endian,
            sent: Vec::new(),
            replies: VecDeque::new(),
        }
    }

    pub fn reply(mut self, reply: Reply) -> Self {
        self.replies.push_back(reply);
        self
    }

    pub fn pending_replies(&self) -> usize {
        self.replies.len()
    }

    /// Packet type of the n-th packet sent
    pub fn sent_type(&self, index: usize) -> PacketType {
        PacketHeader::parse(&self.sent[index], self.big_endian)
            .expect("sent packet has a valid header")
            .packet_type
    }

    fn next(&mut self) -> Reply {
        self.replies.pop_front().unwrap_or(Reply::Timeout)
    }
}

impl CommDevice for MockDevice {
    fn is_target_big_endian(&self) -> bool {
        self.big_endian
    }

    fn send_data_to_target(&mut self, data: &[u8]) -> Result<(), CommError> {
        self.sent.push(data.to_vec());
        Ok(())
    }

    fn receive_target_acknowledge(&mut self) -> Result<(), CommError> {
        match self.next() {
            Reply::Ack => Ok(()),
            Reply::Data(_) => Err(CommError::BadResponse("expected acknowledgement".into())),
            Reply::Timeout => Err(CommError::Timeout),
            Reply::Disconnected => Err(CommError::Disconnected),
        }
    }

    fn receive_target_data_packet(&mut self, rx: &mut [u8]) -> Result<usize, CommError> {
        match self.next() {
            Reply::Data(bytes) => {
                rx[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
            Reply::Ack => Err(CommError::BadResponse("expected data".into())),
            Reply::Timeout => Err(CommError::Timeout),
            Reply::Disconnected => Err(CommError::Disconnected),
        }
    }
}

/// Builder for self-test status packets as the target would send them
pub struct SelfTestPacket {
    bytes: Vec<u8>,
    big_endian: bool,
}

impl SelfTestPacket {
    pub fn new(big_endian: bool) -> Self {
        Self {
            bytes: vec![0u8; 128],
            big_endian,
        }
    }

    fn put_u16(&mut self, offset: usize, value: u16) {
        let raw = if self.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        self.bytes[offset..offset + 2].copy_from_slice(&raw);
    }

    fn put_u32(&mut self, offset: usize, value: u32) {
        let raw = if self.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        self.bytes[offset..offset + 4].copy_from_slice(&raw);
    }

    pub fn valid(mut self, valid: u8) -> Self {
        self.bytes[8] = valid;
        self
    }

    pub fn mode(mut self, mode: u8) -> Self {
        self.bytes[9] = mode;
        self
    }

    pub fn truck_information(mut self, info: u16) -> Self {
        self.put_u16(10, info);
        self
    }

    pub fn test_id(mut self, id: u16) -> Self {
        self.put_u16(12, id);
        self
    }

    pub fn test_case(mut self, case: u8) -> Self {
        self.bytes[15] = case;
        self
    }

    pub fn variable_count(mut self, count: u8) -> Self {
        self.bytes[16] = count;
        self
    }

    pub fn test_result(mut self, result: u8) -> Self {
        self.bytes[17] = result;
        self
    }

    /// Result and reason codes of a special message
    pub fn special(mut self, result: i16, reason: i16) -> Self {
        self.put_u16(12, result as u16);
        self.put_u16(15, reason as u16);
        self
    }

    /// Interactive variable `index` with raw 32-bit value bits
    pub fn variable(mut self, index: usize, bits: u32, tag: u8, var_type: u8) -> Self {
        let base = 28 + index * 6;
        if self.bytes.len() < base + 6 {
            self.bytes.resize(base + 6, 0);
        }
        self.put_u32(base, bits);
        self.bytes[base + 4] = tag;
        self.bytes[base + 5] = var_type;
        self
    }

    /// Complete packet with a data-response header in front
    pub fn build(mut self) -> Vec<u8> {
        let header = PacketHeader {
            length: self.bytes.len() as u16,
            packet_type: PacketType::GetSelfTestPacket,
            response_type: ResponseType::DataResponse,
        };
        self.bytes[..8].copy_from_slice(&header.to_bytes(self.big_endian));
        self.bytes
    }
}
