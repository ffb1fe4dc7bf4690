//! Self-test response decoding
//!
//! Response layout (offsets from the start of the packet, header included):
//!
//! | Offset | Width | Field |
//! |--------|-------|-------|
//! | 8      | 1     | valid flag |
//! | 9      | 1     | message mode |
//! | 10     | 2     | truck information |
//! | 12     | 2     | test id (special message: result code) |
//! | 15     | 1     | test case (special message: 2-byte reason code) |
//! | 16     | 1     | variable count |
//! | 17     | 1     | test result |
//! | 28     | 6 × n | interactive variables: 4-byte value, tag, type |

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::protocol::{normalize, CommError};

/// Most interactive variables decoded from one response
pub const MAX_SELF_TEST_VARIABLES: usize = 16;

const VALID_OFFSET: usize = 8;
const MODE_OFFSET: usize = 9;
const TRUCK_INFO_OFFSET: usize = 10;
const TEST_ID_OFFSET: usize = 12;
const TEST_CASE_OFFSET: usize = 15;
const VAR_COUNT_OFFSET: usize = 16;
const TEST_RESULT_OFFSET: usize = 17;

const RESULT_CODE_OFFSET: usize = 12;
const REASON_CODE_OFFSET: usize = 15;

const FIRST_VALUE_OFFSET: usize = 28;
const FIRST_TAG_OFFSET: usize = 32;
const FIRST_TYPE_OFFSET: usize = 33;
const VARIABLE_STRIDE: usize = 6;

/// Smallest buffer holding every header field
const MIN_RESPONSE_LEN: usize = TEST_RESULT_OFFSET + 1;

/// Wire value of the valid flag for a usable response
const VALID: u8 = 1;

/// How the target framed a self-test response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageMode {
    /// Result/reason pair only
    Special,
    /// Live per-variable readings
    Interactive,
    /// Any mode this layer does not interpret
    Other(u8),
}

impl MessageMode {
    const SPECIAL: u8 = 4;
    const INTERACTIVE: u8 = 5;

    /// Mode for a wire value
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            Self::SPECIAL => MessageMode::Special,
            Self::INTERACTIVE => MessageMode::Interactive,
            other => MessageMode::Other(other),
        }
    }

    /// Wire value of this mode
    pub fn raw(self) -> u8 {
        match self {
            MessageMode::Special => Self::SPECIAL,
            MessageMode::Interactive => Self::INTERACTIVE,
            MessageMode::Other(raw) => raw,
        }
    }
}

/// Width and signedness of an interactive variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum VariableType {
    /// Unsigned 8-bit
    Uint8 = 0,
    /// Unsigned 16-bit
    Uint16 = 1,
    /// Unsigned 32-bit
    Uint32 = 2,
    /// Signed 8-bit
    Int8 = 3,
    /// Signed 16-bit
    Int16 = 4,
    /// Signed 32-bit
    Int32 = 5,
}

impl VariableType {
    /// Type for a wire tag, `None` when unknown
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(VariableType::Uint8),
            1 => Some(VariableType::Uint16),
            2 => Some(VariableType::Uint32),
            3 => Some(VariableType::Int8),
            4 => Some(VariableType::Int16),
            5 => Some(VariableType::Int32),
            _ => None,
        }
    }

    /// True for the signed types
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            VariableType::Int8 | VariableType::Int16 | VariableType::Int32
        )
    }
}

/// One live reading from an interactive test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InteractiveVariable {
    /// Identifies the reading within the test
    pub tag: u8,
    /// Reading, widened from its wire type
    pub value: f64,
}

/// Decoded self-test status packet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfTestResult {
    /// Raw valid flag; 1 means the rest of the record is meaningful
    pub valid: u8,
    /// How the rest of the packet is laid out
    pub message_mode: MessageMode,
    /// Test being run
    pub test_id: u16,
    /// Step within the test
    pub test_case: u8,
    /// Outcome code reported by the target
    pub test_result: u8,
    /// Truck selection the test runs against
    pub truck_information: u16,
    /// Count as reported on the wire, before clamping
    pub variable_count: u8,
    /// At most [`MAX_SELF_TEST_VARIABLES`] entries
    pub variables: Vec<InteractiveVariable>,
}

impl SelfTestResult {
    /// True when the valid flag is set
    pub fn is_valid(&self) -> bool {
        self.valid == VALID
    }
}

/// Result/reason pair carried by a special message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialMessage {
    /// Result code
    pub result: i16,
    /// Reason code
    pub reason: i16,
}

fn read_u16(buffer: &[u8], offset: usize, big_endian: bool) -> u16 {
    normalize(LittleEndian::read_u16(&buffer[offset..offset + 2]), big_endian)
}

fn read_i16(buffer: &[u8], offset: usize, big_endian: bool) -> i16 {
    normalize(LittleEndian::read_i16(&buffer[offset..offset + 2]), big_endian)
}

fn ensure_len(buffer: &[u8], needed: usize) -> Result<(), CommError> {
    if buffer.len() < needed {
        return Err(CommError::BadResponse(format!(
            "self-test response needs {} bytes, got {}",
            needed,
            buffer.len()
        )));
    }
    Ok(())
}

/// Decode a self-test status packet.
///
/// Interactive variables are only read when the response is valid and in
/// interactive mode. The wire count is clamped to
/// [`MAX_SELF_TEST_VARIABLES`]; unknown variable types decode as `0.0`.
pub fn decode_self_test(buffer: &[u8], big_endian: bool) -> Result<SelfTestResult, CommError> {
    ensure_len(buffer, MIN_RESPONSE_LEN)?;

    let valid = buffer[VALID_OFFSET];
    let message_mode = MessageMode::from_raw(buffer[MODE_OFFSET]);
    let variable_count = buffer[VAR_COUNT_OFFSET];

    let mut result = SelfTestResult {
        valid,
        message_mode,
        test_id: read_u16(buffer, TEST_ID_OFFSET, big_endian),
        test_case: buffer[TEST_CASE_OFFSET],
        test_result: buffer[TEST_RESULT_OFFSET],
        truck_information: read_u16(buffer, TRUCK_INFO_OFFSET, big_endian),
        variable_count,
        variables: Vec::new(),
    };

    if message_mode != MessageMode::Interactive || valid != VALID {
        return Ok(result);
    }

    let count = (variable_count as usize).min(MAX_SELF_TEST_VARIABLES);
    if count < variable_count as usize {
        tracing::debug!(
            "self-test reported {} variables, decoding the first {}",
            variable_count,
            count
        );
    }
    ensure_len(buffer, FIRST_VALUE_OFFSET + count * VARIABLE_STRIDE)?;

    result.variables = (0..count)
        .map(|index| {
            let value_offset = FIRST_VALUE_OFFSET + index * VARIABLE_STRIDE;
            let tag = buffer[FIRST_TAG_OFFSET + index * VARIABLE_STRIDE];
            let raw_type = buffer[FIRST_TYPE_OFFSET + index * VARIABLE_STRIDE];
            let raw_value = &buffer[value_offset..value_offset + 4];

            // every value occupies 32 bits regardless of its declared width
            let value = match VariableType::from_raw(raw_type) {
                Some(t) if t.is_signed() => {
                    normalize(LittleEndian::read_i32(raw_value), big_endian) as f64
                }
                Some(_) => normalize(LittleEndian::read_u32(raw_value), big_endian) as f64,
                None => {
                    tracing::trace!("variable tag {} has unknown type {}", tag, raw_type);
                    0.0
                }
            };

            InteractiveVariable { tag, value }
        })
        .collect();

    Ok(result)
}

/// Decode the result/reason pair of a special message.
///
/// Fails with [`CommError::InvalidResult`] when the valid flag is not set and
/// with [`CommError::UnexpectedMode`] when the response is not a special message.
pub fn decode_special_message(buffer: &[u8], big_endian: bool) -> Result<SpecialMessage, CommError> {
    ensure_len(buffer, REASON_CODE_OFFSET + 2)?;

    let valid = buffer[VALID_OFFSET];
    if valid != VALID {
        return Err(CommError::InvalidResult(valid));
    }

    let mode = buffer[MODE_OFFSET];
    if MessageMode::from_raw(mode) != MessageMode::Special {
        return Err(CommError::UnexpectedMode {
            expected: MessageMode::SPECIAL,
            actual: mode,
        });
    }

    Ok(SpecialMessage {
        result: read_i16(buffer, RESULT_CODE_OFFSET, big_endian),
        reason: read_i16(buffer, REASON_CODE_OFFSET, big_endian),
    })
}
