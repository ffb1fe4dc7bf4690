//! Communication errors

use thiserror::Error;

/// Errors surfaced across the transaction boundary
#[derive(Error, Debug)]
pub enum CommError {
    /// The target did not answer before the deadline
    #[error("No response from target before timeout")]
    Timeout,

    /// The link closed underneath the transaction
    #[error("Connection to target lost")]
    Disconnected,

    /// Malformed, truncated or unexpected response
    #[error("Bad response from target: {0}")]
    BadResponse(String),

    /// Self-test response in the wrong message mode
    #[error("Unexpected message mode: expected {expected}, got {actual}")]
    UnexpectedMode {
        /// Mode the operation requires
        expected: u8,
        /// Mode the target reported
        actual: u8,
    },

    /// Self-test response whose valid flag is not set
    #[error("Target reported an invalid result (valid flag {0})")]
    InvalidResult(u8),

    /// Framed request above the outbound size limit
    #[error("Packet too large: {size} bytes exceeds {max}")]
    PacketTooLarge {
        /// Framed size in bytes
        size: usize,
        /// Largest allowed size
        max: usize,
    },

    /// List argument too long to fit in one request
    #[error("List too long: {len} entries exceeds {max}")]
    ListTooLong {
        /// Entries supplied
        len: usize,
        /// Most entries that fit
        max: usize,
    },

    /// Serial port could not be opened or configured
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Any other I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CommError {
    /// True for the malformed or unexpected response class
    pub fn is_bad_response(&self) -> bool {
        matches!(
            self,
            CommError::BadResponse(_) | CommError::UnexpectedMode { .. }
        )
    }

    /// Map an I/O error from a channel read or write onto the transport taxonomy
    pub(crate) fn from_io(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => CommError::Timeout,
            ErrorKind::UnexpectedEof
            | ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected => CommError::Disconnected,
            _ => CommError::Io(e),
        }
    }
}
