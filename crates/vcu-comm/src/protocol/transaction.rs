//! Request/response transactions
//!
//! Two transaction shapes exist: a command (send, await acknowledgement) and
//! a data request (send, await a response packet). Nothing here retries;
//! device errors are handed back exactly as the device reported them.

use super::device::CommDevice;
use super::packet::{frame, PacketHeader, PacketType, ResponseType};
use super::requests::CommRequest;
use super::{CommError, RESPONSE_BUFFER_SIZE};

/// Fixed-capacity receive buffer, reused across transactions.
///
/// Each data request clears it before the device fills it, so nothing from a
/// previous transaction survives.
pub struct ResponseBuffer {
    data: Box<[u8; RESPONSE_BUFFER_SIZE]>,
    len: usize,
}

impl ResponseBuffer {
    /// Empty, zero-filled buffer
    pub fn new() -> Self {
        Self {
            data: Box::new([0u8; RESPONSE_BUFFER_SIZE]),
            len: 0,
        }
    }

    /// Full buffer; offsets into a response are absolute from the header start
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..]
    }

    /// Bytes filled by the last transaction
    pub fn received(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Number of bytes filled by the last transaction
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the last transaction filled nothing
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Largest response the buffer holds
    pub fn capacity(&self) -> usize {
        RESPONSE_BUFFER_SIZE
    }

    fn reset(&mut self) -> &mut [u8] {
        self.data.fill(0);
        self.len = 0;
        &mut self.data[..]
    }
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<[u8]> for ResponseBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Send a request and wait for the target's acknowledgement
pub fn send_command<D, R>(device: &mut D, request: &R) -> Result<(), CommError>
where
    D: CommDevice + ?Sized,
    R: CommRequest + ?Sized,
{
    let bytes = request.to_bytes(device.is_target_big_endian())?;
    tracing::debug!("command {:?}, {} bytes", request.packet_type(), bytes.len());
    device.send_data_to_target(&bytes)?;
    device.receive_target_acknowledge()
}

/// Send a payload-less command and wait for the acknowledgement
pub fn send_command_type<D>(device: &mut D, packet_type: PacketType) -> Result<(), CommError>
where
    D: CommDevice + ?Sized,
{
    let bytes = frame(
        &[],
        packet_type,
        ResponseType::CommandResponse,
        device.is_target_big_endian(),
    )?;
    tracing::debug!("command {:?}", packet_type);
    device.send_data_to_target(&bytes)?;
    device.receive_target_acknowledge()
}

/// Send a payload-less data request and read the response into `rx`
pub fn send_data_request<D>(
    device: &mut D,
    packet_type: PacketType,
    rx: &mut ResponseBuffer,
) -> Result<(), CommError>
where
    D: CommDevice + ?Sized,
{
    let bytes = frame(
        &[],
        packet_type,
        ResponseType::DataResponse,
        device.is_target_big_endian(),
    )?;
    tracing::debug!("data request {:?}", packet_type);
    exchange(device, &bytes, packet_type, rx)
}

/// Send a data request carrying a payload and read the response into `rx`
pub fn send_data_request_with<D, R>(
    device: &mut D,
    request: &R,
    rx: &mut ResponseBuffer,
) -> Result<(), CommError>
where
    D: CommDevice + ?Sized,
    R: CommRequest + ?Sized,
{
    let bytes = request.to_bytes(device.is_target_big_endian())?;
    tracing::debug!(
        "data request {:?}, {} bytes",
        request.packet_type(),
        bytes.len()
    );
    exchange(device, &bytes, request.packet_type(), rx)
}

/// Run `request` with the transaction shape its response type calls for.
///
/// For command requests `rx` is left untouched.
pub fn execute<D, R>(device: &mut D, request: &R, rx: &mut ResponseBuffer) -> Result<(), CommError>
where
    D: CommDevice + ?Sized,
    R: CommRequest + ?Sized,
{
    match request.response_type() {
        ResponseType::CommandResponse => send_command(device, request),
        ResponseType::DataResponse => send_data_request_with(device, request, rx),
    }
}

/// Send `bytes` and accept only a response to the same packet type
fn exchange<D>(
    device: &mut D,
    bytes: &[u8],
    expected: PacketType,
    rx: &mut ResponseBuffer,
) -> Result<(), CommError>
where
    D: CommDevice + ?Sized,
{
    device.send_data_to_target(bytes)?;
    let received = device.receive_target_data_packet(rx.reset())?;

    let header = PacketHeader::parse(&rx.data[..], device.is_target_big_endian())?;
    if header.packet_type != expected {
        rx.reset();
        return Err(CommError::BadResponse(format!(
            "expected response to {:?}, got {:?}",
            expected, header.packet_type
        )));
    }

    rx.len = received.min(RESPONSE_BUFFER_SIZE);
    Ok(())
}
