//! Serial port handling
//!
//! Opens and configures the serial link to the target.

use serialport::SerialPort;
use std::time::Duration;

use super::{CommError, DEFAULT_BAUD_RATE};

/// Open a serial port with the given read timeout
pub fn open_port(
    name: &str,
    baud_rate: Option<u32>,
    timeout: Duration,
) -> Result<Box<dyn SerialPort>, CommError> {
    let baud = baud_rate.unwrap_or(DEFAULT_BAUD_RATE);

    serialport::new(name, baud)
        .timeout(timeout)
        .open()
        .map_err(|e| CommError::Serial(e.to_string()))
}

/// Configure a serial port for target communication (8N1, no flow control)
pub fn configure_port(port: &mut dyn SerialPort) -> Result<(), CommError> {
    port.set_data_bits(serialport::DataBits::Eight)
        .map_err(|e| CommError::Serial(e.to_string()))?;
    port.set_parity(serialport::Parity::None)
        .map_err(|e| CommError::Serial(e.to_string()))?;
    port.set_stop_bits(serialport::StopBits::One)
        .map_err(|e| CommError::Serial(e.to_string()))?;
    port.set_flow_control(serialport::FlowControl::None)
        .map_err(|e| CommError::Serial(e.to_string()))?;

    // Keep DTR asserted; some adapters reset the target when it toggles
    if let Err(e) = port.write_data_terminal_ready(true) {
        tracing::debug!("configure_port: failed to set DTR high: {} (continuing)", e);
    }

    Ok(())
}

/// Clear the serial port buffers
pub fn clear_buffers(port: &mut dyn SerialPort) -> Result<(), CommError> {
    port.clear(serialport::ClearBuffer::All)
        .map_err(|e| CommError::Serial(e.to_string()))
}
