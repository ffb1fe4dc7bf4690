//! Byte channels to the target
//!
//! A [`CommunicationChannel`] is the raw byte pipe underneath
//! [`ChannelDevice`](super::ChannelDevice). Besides reading and writing it
//! must be able to:
//!
//! - discard stale input, which the device does before every send so a late
//!   reply to an earlier request is never taken for the next response;
//! - report how many bytes are waiting, so reads can be polled against a
//!   deadline instead of blocking.
//!
//! A peer that has closed the link is reported by `bytes_to_read` as
//! [`io::ErrorKind::UnexpectedEof`], which the device turns into
//! [`CommError::Disconnected`](super::CommError::Disconnected).

use serialport::{ClearBuffer, SerialPort};
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

/// Byte channel to the target (serial or TCP)
pub trait CommunicationChannel: Read + Write + Send {
    /// Apply `timeout` to blocking reads and writes
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// Drop everything received but not yet read
    fn clear_input_buffer(&mut self) -> io::Result<()>;

    /// Bytes ready to read without blocking.
    ///
    /// Fails with `UnexpectedEof` once the peer has closed the link.
    fn bytes_to_read(&mut self) -> io::Result<u32>;
}

/// Serial link to the target
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    /// Wrap an opened and configured port (see [`super::serial`])
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Read for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl CommunicationChannel for SerialChannel {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.port.set_timeout(timeout).map_err(io::Error::other)
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.port
            .clear(ClearBuffer::Input)
            .map_err(io::Error::other)
    }

    fn bytes_to_read(&mut self) -> io::Result<u32> {
        self.port.bytes_to_read().map_err(io::Error::other)
    }
}

/// TCP/IP link to the target
pub struct TcpChannel {
    stream: TcpStream,
}

impl TcpChannel {
    /// Wrap a connected stream
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }

    /// Run `op` with the socket switched to nonblocking, restoring it afterwards
    fn nonblocking<T>(&mut self, op: impl FnOnce(&TcpStream) -> io::Result<T>) -> io::Result<T> {
        self.stream.set_nonblocking(true)?;
        let result = op(&self.stream);
        self.stream.set_nonblocking(false)?;
        result
    }
}

impl Read for TcpChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for TcpChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl CommunicationChannel for TcpChannel {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.stream.set_read_timeout(Some(timeout))?;
        self.stream.set_write_timeout(Some(timeout))
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.nonblocking(|mut stream| {
            let mut scratch = [0u8; 1024];
            loop {
                match stream.read(&mut scratch) {
                    // EOF is left for the next receive to report
                    Ok(0) => return Ok(()),
                    Ok(_) => continue,
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                    Err(e) => return Err(e),
                }
            }
        })
    }

    fn bytes_to_read(&mut self) -> io::Result<u32> {
        self.nonblocking(|stream| {
            // peek() reports min(available, buffer size)
            let mut scratch = [0u8; 8192];
            match stream.peek(&mut scratch) {
                Ok(0) => Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "peer closed the connection",
                )),
                Ok(n) => Ok(n as u32),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
                Err(e) => Err(e),
            }
        })
    }
}
