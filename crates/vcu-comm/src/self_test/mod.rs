//! Self-test subsystem
//!
//! Command helpers for the target's self-test task and the decoder for its
//! status packets.

pub mod decode;
mod marshal;

pub use decode::{
    decode_self_test, decode_special_message, InteractiveVariable, MessageMode, SelfTestResult,
    SpecialMessage, VariableType, MAX_SELF_TEST_VARIABLES,
};
pub use marshal::{SelfTestMarshal, SELF_TEST_SETTLE_DELAY};
