//! Transport devices
//!
//! [`CommDevice`] is the seam between the transaction layer and whatever
//! carries the bytes. [`ChannelDevice`] implements it on top of any
//! [`CommunicationChannel`], reading framed responses with a deadline.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use super::packet::{PacketHeader, ResponseType};
use super::stream::CommunicationChannel;
use super::{CommError, HEADER_SIZE};

/// Send/receive primitives of a transport to the target
pub trait CommDevice {
    /// Byte order of the embedded target
    fn is_target_big_endian(&self) -> bool;

    /// Write a complete packet to the target
    fn send_data_to_target(&mut self, data: &[u8]) -> Result<(), CommError>;

    /// Wait for the target to acknowledge a command
    fn receive_target_acknowledge(&mut self) -> Result<(), CommError>;

    /// Read one response packet, header included, into `rx`.
    /// Returns the number of bytes received.
    fn receive_target_data_packet(&mut self, rx: &mut [u8]) -> Result<usize, CommError>;
}

impl<D: CommDevice + ?Sized> CommDevice for Box<D> {
    fn is_target_big_endian(&self) -> bool {
        (**self).is_target_big_endian()
    }

    fn send_data_to_target(&mut self, data: &[u8]) -> Result<(), CommError> {
        (**self).send_data_to_target(data)
    }

    fn receive_target_acknowledge(&mut self) -> Result<(), CommError> {
        (**self).receive_target_acknowledge()
    }

    fn receive_target_data_packet(&mut self, rx: &mut [u8]) -> Result<usize, CommError> {
        (**self).receive_target_data_packet(rx)
    }
}

/// Framed packet exchange over a byte channel
pub struct ChannelDevice {
    channel: Box<dyn CommunicationChannel>,
    target_is_big_endian: bool,
    timeout: Duration,
    poll_interval: Duration,
    tx_bytes: u64,
    rx_bytes: u64,
    tx_packets: u64,
    rx_packets: u64,
}

impl ChannelDevice {
    /// Device over `channel`, waiting at most `timeout` for each response
    pub fn new(
        channel: Box<dyn CommunicationChannel>,
        target_is_big_endian: bool,
        timeout: Duration,
    ) -> Self {
        Self {
            channel,
            target_is_big_endian,
            timeout,
            poll_interval: Duration::from_millis(2),
            tx_bytes: 0,
            rx_bytes: 0,
            tx_packets: 0,
            rx_packets: 0,
        }
    }

    /// Response timeout applied to each receive
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get cumulative tx/rx bytes and packet counters
    pub fn get_counters(&self) -> (u64, u64, u64, u64) {
        (
            self.tx_bytes,
            self.rx_bytes,
            self.tx_packets,
            self.rx_packets,
        )
    }

    /// Read exactly `buf.len()` bytes or fail once the deadline passes.
    ///
    /// Polls `bytes_to_read()` so a quiet link never parks us in a blocking read.
    fn read_exact_timeout(&mut self, buf: &mut [u8], deadline: Instant) -> Result<(), CommError> {
        let mut offset = 0;

        while offset < buf.len() {
            if Instant::now() > deadline {
                tracing::debug!(
                    "read_exact_timeout: timed out after reading {} of {} bytes",
                    offset,
                    buf.len()
                );
                return Err(CommError::Timeout);
            }

            let available = self.channel.bytes_to_read().map_err(CommError::from_io)? as usize;
            if available == 0 {
                std::thread::sleep(self.poll_interval);
                continue;
            }

            let to_read = available.min(buf.len() - offset);
            match self.channel.read(&mut buf[offset..offset + to_read]) {
                Ok(0) => return Err(CommError::Disconnected),
                Ok(n) => {
                    tracing::trace!("read {} bytes: {:02x?}", n, &buf[offset..offset + n]);
                    offset += n;
                }
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::TimedOut
                        || e.kind() == std::io::ErrorKind::WouldBlock =>
                {
                    continue;
                }
                Err(e) => return Err(CommError::from_io(e)),
            }
        }

        self.rx_bytes = self.rx_bytes.saturating_add(buf.len() as u64);
        Ok(())
    }

    fn read_header(&mut self, rx: &mut [u8], deadline: Instant) -> Result<PacketHeader, CommError> {
        self.read_exact_timeout(&mut rx[..HEADER_SIZE], deadline)?;
        PacketHeader::parse(&rx[..HEADER_SIZE], self.target_is_big_endian)
    }
}

impl CommDevice for ChannelDevice {
    fn is_target_big_endian(&self) -> bool {
        self.target_is_big_endian
    }

    fn send_data_to_target(&mut self, data: &[u8]) -> Result<(), CommError> {
        // stale bytes would be taken for the response
        self.channel
            .clear_input_buffer()
            .map_err(CommError::from_io)?;

        tracing::trace!("sending {} bytes: {:02x?}", data.len(), data);
        self.channel.write_all(data).map_err(CommError::from_io)?;
        self.channel.flush().map_err(CommError::from_io)?;

        self.tx_bytes = self.tx_bytes.saturating_add(data.len() as u64);
        self.tx_packets = self.tx_packets.saturating_add(1);
        Ok(())
    }

    fn receive_target_acknowledge(&mut self) -> Result<(), CommError> {
        let deadline = Instant::now() + self.timeout;
        let mut rx = [0u8; HEADER_SIZE];
        let header = self.read_header(&mut rx, deadline)?;

        if header.response_type != ResponseType::CommandResponse {
            return Err(CommError::BadResponse(format!(
                "expected acknowledgement, got {:?}",
                header.response_type
            )));
        }
        if header.payload_len() != 0 {
            return Err(CommError::BadResponse(format!(
                "acknowledgement carries {} unexpected payload bytes",
                header.payload_len()
            )));
        }

        self.rx_packets = self.rx_packets.saturating_add(1);
        Ok(())
    }

    fn receive_target_data_packet(&mut self, rx: &mut [u8]) -> Result<usize, CommError> {
        if rx.len() < HEADER_SIZE {
            return Err(CommError::BadResponse(format!(
                "receive buffer of {} bytes cannot hold a header",
                rx.len()
            )));
        }

        let deadline = Instant::now() + self.timeout;
        let header = self.read_header(rx, deadline)?;

        if header.response_type != ResponseType::DataResponse {
            return Err(CommError::BadResponse(format!(
                "expected data response, got {:?}",
                header.response_type
            )));
        }

        let total = header.length as usize;
        if total > rx.len() {
            return Err(CommError::BadResponse(format!(
                "response of {} bytes exceeds buffer capacity {}",
                total,
                rx.len()
            )));
        }

        self.read_exact_timeout(&mut rx[HEADER_SIZE..total], deadline)?;
        self.rx_packets = self.rx_packets.saturating_add(1);
        tracing::debug!(
            "received {:?} response, {} bytes",
            header.packet_type,
            total
        );
        Ok(total)
    }
}
