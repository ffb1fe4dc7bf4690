//! # VCU Comm
//!
//! Wire protocol layer between the PTU workstation and an embedded vehicle
//! control unit, over serial or TCP/IP.
//!
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Byte order normalization for big- and little-endian targets
//! - Packet framing and typed request marshaling
//! - Command and data-request transactions over a transport device
//! - Self-test control and response decoding
//!
//! ## Example
//!
//! ```rust,ignore
//! use vcu_comm::{config::TransportConfig, self_test::SelfTestMarshal};
//!
//! let config = TransportConfig::from_file("target.json")?;
//! let mut self_test = SelfTestMarshal::new(config.open()?);
//!
//! let started = self_test.start_self_test_task()?;
//! println!("start: result {} reason {}", started.result, started.reason);
//!
//! let status = self_test.get_self_test_result()?;
//! for variable in &status.variables {
//!     println!("tag {}: {}", variable.tag, variable.value);
//! }
//! ```

pub mod config;
pub mod protocol;
pub mod self_test;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Endianness, TransportConfig, TransportKind};
    pub use crate::protocol::{
        execute, send_command, send_command_type, send_data_request, send_data_request_with,
        ChannelDevice, CommDevice, CommError, CommRequest, PacketType, ResponseBuffer,
        ResponseType,
    };
    pub use crate::self_test::{
        InteractiveVariable, MessageMode, SelfTestMarshal, SelfTestResult, SpecialMessage,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
