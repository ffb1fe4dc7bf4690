//! PTU Protocol Communication
//!
//! Implements the binary packet protocol spoken between the PTU workstation
//! and the embedded vehicle control unit.
//!
//! Every packet is an 8-byte header followed by a request-specific payload.
//! Multi-byte fields travel in the target's byte order.

pub mod byte_order;
pub mod device;
mod error;
pub mod packet;
pub mod requests;
pub mod serial;
pub mod stream;
pub mod transaction;

pub use byte_order::{normalize, ByteOrderNormalize};
pub use device::{ChannelDevice, CommDevice};
pub use error::CommError;
pub use packet::{frame, PacketHeader, PacketType, PayloadWriter, ResponseType};
pub use requests::*;
pub use stream::{CommunicationChannel, SerialChannel, TcpChannel};
pub use transaction::{
    execute, send_command, send_command_type, send_data_request, send_data_request_with,
    ResponseBuffer,
};

/// Default baud rate for the serial link
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Default timeout for responses in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Size of the header that precedes every packet
pub const HEADER_SIZE: usize = 8;

/// Largest outbound packet, header included
pub const MAX_TX_PACKET_SIZE: usize = 1024;

/// Capacity of the receive buffer used for data requests
pub const RESPONSE_BUFFER_SIZE: usize = 4096;
