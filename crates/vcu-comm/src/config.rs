//! Transport configuration
//!
//! Describes how to reach the target and in which byte order it speaks.
//! Stored as JSON, e.g.
//!
//! ```json
//! {
//!   "transport": { "kind": "tcp", "host": "192.168.0.10", "port": 5050 },
//!   "endianness": "big",
//!   "timeout_ms": 2000
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::protocol::serial::{clear_buffers, configure_port, open_port};
use crate::protocol::{
    ChannelDevice, CommError, CommunicationChannel, SerialChannel, TcpChannel, DEFAULT_BAUD_RATE,
    DEFAULT_TIMEOUT_MS,
};

/// Errors loading or saving a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a valid configuration
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Byte order of the embedded target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    /// Least significant byte first
    #[default]
    Little,
    /// Most significant byte first
    Big,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

/// Physical link to the target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportKind {
    /// Serial port
    Serial {
        /// Port name, e.g. `COM3` or `/dev/ttyUSB0`
        port_name: String,
        /// Line speed, 115200 when omitted
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
    },
    /// TCP/IP connection
    Tcp {
        /// Host name or address of the target
        host: String,
        /// TCP port of the target
        port: u16,
    },
}

/// Everything needed to open a device to the target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// How the target is reached
    pub transport: TransportKind,
    /// Byte order of the target
    pub endianness: Endianness,
    /// Response timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Serial {
                port_name: String::new(),
                baud_rate: DEFAULT_BAUD_RATE,
            },
            endianness: Endianness::Little,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl TransportConfig {
    /// Parse a configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// True when the target is big-endian
    pub fn target_is_big_endian(&self) -> bool {
        self.endianness == Endianness::Big
    }

    /// Response timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Open the configured link and wrap it in a device
    pub fn open(&self) -> Result<ChannelDevice, CommError> {
        let timeout = self.timeout();
        let mut channel: Box<dyn CommunicationChannel> = match &self.transport {
            TransportKind::Serial {
                port_name,
                baud_rate,
            } => {
                tracing::debug!("opening serial port {} at {} baud", port_name, baud_rate);
                let mut port = open_port(port_name, Some(*baud_rate), timeout)?;
                configure_port(port.as_mut())?;
                clear_buffers(port.as_mut())?;
                Box::new(SerialChannel::new(port))
            }
            TransportKind::Tcp { host, port } => {
                tracing::debug!("connecting to {}:{}", host, port);
                let addr = (host.as_str(), *port)
                    .to_socket_addrs()?
                    .next()
                    .ok_or_else(|| {
                        CommError::Io(std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            format!("no address for {}", host),
                        ))
                    })?;
                let stream = TcpStream::connect_timeout(&addr, timeout).map_err(CommError::from_io)?;
                stream.set_nodelay(true)?;
                Box::new(TcpChannel::new(stream))
            }
        };

        channel.set_timeout(timeout)?;
        Ok(ChannelDevice::new(
            channel,
            self.target_is_big_endian(),
            timeout,
        ))
    }
}
