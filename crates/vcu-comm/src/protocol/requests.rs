//! Outbound requests
//!
//! One type per command or query the PTU can send. Each type is bound to a
//! fixed packet/response type pair and serializes its fields in the order
//! the target firmware expects. Fields are captured by a single constructor
//! and never modified afterwards, so a request can be serialized again for
//! a retry.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use super::packet::{frame, PacketType, PayloadWriter, ResponseType};
use super::{CommError, HEADER_SIZE, MAX_TX_PACKET_SIZE};

/// Width of the car identifier field on the wire
pub const CAR_ID_LEN: usize = 11;

const MAX_PAYLOAD: usize = MAX_TX_PACKET_SIZE - HEADER_SIZE;

/// Most watch elements that fit in one outbound packet
pub const MAX_WATCH_ELEMENTS: usize = MAX_PAYLOAD / 2;

/// Most self-test ids that fit in one list update
pub const MAX_SELF_TEST_LIST: usize = (MAX_PAYLOAD - 7) / 2;

/// Most stream variables that fit in one stream configuration
pub const MAX_STREAM_VARIABLES: usize = (MAX_PAYLOAD - 6) / 4;

/// A request with a payload, bound to one packet/response type pair
pub trait CommRequest {
    /// Packet type this request is sent as
    fn packet_type(&self) -> PacketType;

    /// Whether the target answers with an acknowledgement or with data
    fn response_type(&self) -> ResponseType;

    /// Serialize the fields, normalized to the target's byte order
    fn payload(&self, target_is_big_endian: bool) -> Vec<u8>;

    /// Complete outbound packet: header followed by the payload
    fn to_bytes(&self, target_is_big_endian: bool) -> Result<Vec<u8>, CommError> {
        frame(
            &self.payload(target_is_big_endian),
            self.packet_type(),
            self.response_type(),
            target_is_big_endian,
        )
    }
}

fn check_list_len(len: usize, max: usize) -> Result<(), CommError> {
    if len > max {
        return Err(CommError::ListTooLong { len, max });
    }
    Ok(())
}

/// Switch the target to another event log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEventLogReq {
    new_event_log: i16,
}

impl ChangeEventLogReq {
    /// Request a switch to event log `new_event_log`
    pub fn new(new_event_log: i16) -> Self {
        Self { new_event_log }
    }
}

impl CommRequest for ChangeEventLogReq {
    fn packet_type(&self) -> PacketType {
        PacketType::ChangeEventLog
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::DataResponse
    }

    fn payload(&self, big_endian: bool) -> Vec<u8> {
        PayloadWriter::new(big_endian).i16(self.new_event_log).build()
    }
}

/// Query which variable a chart channel is showing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetChartIndexReq {
    chart_index: u8,
}

impl GetChartIndexReq {
    /// Query chart channel `chart_index`
    pub fn new(chart_index: u8) -> Self {
        Self { chart_index }
    }
}

impl CommRequest for GetChartIndexReq {
    fn packet_type(&self) -> PacketType {
        PacketType::GetChartIndex
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::DataResponse
    }

    fn payload(&self, big_endian: bool) -> Vec<u8> {
        PayloadWriter::new(big_endian).u8(self.chart_index).build()
    }
}

/// Fetch one datalog buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetDatalogBufferReq {
    datalog_index: u16,
}

impl GetDatalogBufferReq {
    /// Query datalog buffer `datalog_index`
    pub fn new(datalog_index: u16) -> Self {
        Self { datalog_index }
    }
}

impl CommRequest for GetDatalogBufferReq {
    fn packet_type(&self) -> PacketType {
        PacketType::GetDatalogBuffer
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::DataResponse
    }

    fn payload(&self, big_endian: bool) -> Vec<u8> {
        PayloadWriter::new(big_endian).u16(self.datalog_index).build()
    }
}

/// Fetch a run of fault log entries starting at `fault_index`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetFaultDataReq {
    fault_index: u32,
    number_of_faults: u16,
}

impl GetFaultDataReq {
    /// Query `number_of_faults` entries starting at `fault_index`
    pub fn new(fault_index: u32, number_of_faults: u16) -> Self {
        Self {
            fault_index,
            number_of_faults,
        }
    }
}

impl CommRequest for GetFaultDataReq {
    fn packet_type(&self) -> PacketType {
        PacketType::GetFaultData
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::DataResponse
    }

    fn payload(&self, big_endian: bool) -> Vec<u8> {
        PayloadWriter::new(big_endian)
            .u32(self.fault_index)
            .u16(self.number_of_faults)
            .build()
    }
}

/// Fetch the history of one fault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetFaultHistoryReq {
    task_id: u16,
    fault_id: u16,
}

impl GetFaultHistoryReq {
    /// Query the history of `fault_id` raised by `task_id`
    pub fn new(task_id: u16, fault_id: u16) -> Self {
        Self { task_id, fault_id }
    }
}

impl CommRequest for GetFaultHistoryReq {
    fn packet_type(&self) -> PacketType {
        PacketType::GetFaultHistory
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::DataResponse
    }

    fn payload(&self, big_endian: bool) -> Vec<u8> {
        PayloadWriter::new(big_endian)
            .u16(self.task_id)
            .u16(self.fault_id)
            .build()
    }
}

/// Query the configuration of a data stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetStreamInfoReq {
    stream_number: i16,
}

impl GetStreamInfoReq {
    /// Query stream `stream_number`
    pub fn new(stream_number: i16) -> Self {
        Self { stream_number }
    }
}

impl CommRequest for GetStreamInfoReq {
    fn packet_type(&self) -> PacketType {
        PacketType::GetStreamInformation
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::DataResponse
    }

    fn payload(&self, big_endian: bool) -> Vec<u8> {
        PayloadWriter::new(big_endian).i16(self.stream_number).build()
    }
}

/// Query a variable's dictionary entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetVariableInfoReq {
    dictionary_index: u16,
}

impl GetVariableInfoReq {
    /// Query the variable at `dictionary_index`
    pub fn new(dictionary_index: u16) -> Self {
        Self { dictionary_index }
    }
}

impl CommRequest for GetVariableInfoReq {
    fn packet_type(&self) -> PacketType {
        PacketType::GetVariableInformation
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::DataResponse
    }

    fn payload(&self, big_endian: bool) -> Vec<u8> {
        PayloadWriter::new(big_endian).u16(self.dictionary_index).build()
    }
}

/// Write a new value to a target variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendVariableReq {
    dictionary_index: i16,
    new_value: u32,
}

impl SendVariableReq {
    /// Write the raw 32-bit `new_value` to the variable at `dictionary_index`
    pub fn new(dictionary_index: i16, new_value: u32) -> Self {
        Self {
            dictionary_index,
            new_value,
        }
    }
}

impl CommRequest for SendVariableReq {
    fn packet_type(&self) -> PacketType {
        PacketType::SendVariableValue
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::CommandResponse
    }

    fn payload(&self, big_endian: bool) -> Vec<u8> {
        PayloadWriter::new(big_endian)
            .i16(self.dictionary_index)
            .u32(self.new_value)
            .build()
    }
}

/// Assign the car identifier.
///
/// The identifier is ASCII, NUL-padded to [`CAR_ID_LEN`] bytes and silently
/// truncated when longer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCarIdReq {
    car_id: [u8; CAR_ID_LEN],
}

impl SetCarIdReq {
    /// Car identifier from text; non-ASCII characters become `?`
    pub fn new(car_id: &str) -> Self {
        let mut field = [0u8; CAR_ID_LEN];
        for (slot, c) in field.iter_mut().zip(car_id.chars()) {
            *slot = if c.is_ascii() { c as u8 } else { b'?' };
        }
        Self { car_id: field }
    }

    /// Car identifier from a numeric id, written in decimal
    pub fn from_number(car_id: u16) -> Self {
        Self::new(&car_id.to_string())
    }

    /// The padded wire field
    pub fn car_id(&self) -> &[u8; CAR_ID_LEN] {
        &self.car_id
    }
}

impl CommRequest for SetCarIdReq {
    fn packet_type(&self) -> PacketType {
        PacketType::SetCarId
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::CommandResponse
    }

    fn payload(&self, big_endian: bool) -> Vec<u8> {
        PayloadWriter::new(big_endian).bytes(&self.car_id).build()
    }
}

/// Route a variable to a chart channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetChartIndexReq {
    chart_index: u8,
    variable_index: i16,
}

impl SetChartIndexReq {
    /// Show `variable_index` on chart channel `chart_index`
    pub fn new(chart_index: u8, variable_index: i16) -> Self {
        Self {
            chart_index,
            variable_index,
        }
    }
}

impl CommRequest for SetChartIndexReq {
    fn packet_type(&self) -> PacketType {
        PacketType::SetChartIndex
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::CommandResponse
    }

    // variable index goes first on the wire
    fn payload(&self, big_endian: bool) -> Vec<u8> {
        PayloadWriter::new(big_endian)
            .i16(self.variable_index)
            .u8(self.chart_index)
            .build()
    }
}

/// Change the chart recorder mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetChartModeReq {
    target_chart_mode: u8,
}

impl SetChartModeReq {
    /// Switch the chart recorder to `target_chart_mode`
    pub fn new(target_chart_mode: u8) -> Self {
        Self { target_chart_mode }
    }
}

impl CommRequest for SetChartModeReq {
    fn packet_type(&self) -> PacketType {
        PacketType::SetChartMode
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::CommandResponse
    }

    fn payload(&self, big_endian: bool) -> Vec<u8> {
        PayloadWriter::new(big_endian).u8(self.target_chart_mode).build()
    }
}

/// Set the full-scale range of a charted variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetChartScaleReq {
    dictionary_index: i16,
    max_scale: i32,
    min_scale: i32,
}

impl SetChartScaleReq {
    /// Scale the chart trace of `dictionary_index` between `min_scale` and `max_scale`
    pub fn new(dictionary_index: i16, max_scale: i32, min_scale: i32) -> Self {
        Self {
            dictionary_index,
            max_scale,
            min_scale,
        }
    }
}

impl CommRequest for SetChartScaleReq {
    fn packet_type(&self) -> PacketType {
        PacketType::SetChartScale
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::CommandResponse
    }

    fn payload(&self, big_endian: bool) -> Vec<u8> {
        PayloadWriter::new(big_endian)
            .i16(self.dictionary_index)
            .i32(self.max_scale)
            .i32(self.min_scale)
            .build()
    }
}

/// Enable or disable a fault and its datalog trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetFaultFlagReq {
    task_id: i16,
    fault_id: i16,
    enable: bool,
    datalog: bool,
}

impl SetFaultFlagReq {
    /// Set the enable and datalog flags of `fault_id` in `task_id`
    pub fn new(task_id: i16, fault_id: i16, enable: bool, datalog: bool) -> Self {
        Self {
            task_id,
            fault_id,
            enable,
            datalog,
        }
    }
}

impl CommRequest for SetFaultFlagReq {
    fn packet_type(&self) -> PacketType {
        PacketType::SetFaultFlag
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::CommandResponse
    }

    fn payload(&self, big_endian: bool) -> Vec<u8> {
        PayloadWriter::new(big_endian)
            .i16(self.task_id)
            .i16(self.fault_id)
            .u8(self.enable as u8)
            .u8(self.datalog as u8)
            .build()
    }
}

/// Turn fault logging on the target on or off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnableFaultLoggingReq {
    target_state: u8,
}

impl EnableFaultLoggingReq {
    /// Set fault logging to `target_state` (0 off, 1 on)
    pub fn new(target_state: u8) -> Self {
        Self { target_state }
    }
}

impl CommRequest for EnableFaultLoggingReq {
    fn packet_type(&self) -> PacketType {
        PacketType::SetFaultLog
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::CommandResponse
    }

    fn payload(&self, big_endian: bool) -> Vec<u8> {
        PayloadWriter::new(big_endian).u8(self.target_state).build()
    }
}

/// Configure the variables and sample rate of the data stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetStreamInfoReq {
    sample_rate: u16,
    variables: Vec<u16>,
}

impl SetStreamInfoReq {
    /// Fails with [`CommError::ListTooLong`] when the variables do not fit in one packet
    pub fn new(sample_rate: u16, variables: &[u16]) -> Result<Self, CommError> {
        check_list_len(variables.len(), MAX_STREAM_VARIABLES)?;
        Ok(Self {
            sample_rate,
            variables: variables.to_vec(),
        })
    }
}

impl CommRequest for SetStreamInfoReq {
    fn packet_type(&self) -> PacketType {
        PacketType::SetStreamInformation
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::CommandResponse
    }

    fn payload(&self, big_endian: bool) -> Vec<u8> {
        // count, number of samples (always 0 on request), sample rate
        let mut writer = PayloadWriter::new(big_endian)
            .u16(self.variables.len() as u16)
            .u16(0)
            .u16(self.sample_rate);
        for &variable in &self.variables {
            // variable type is filled in by the target
            writer = writer.u16(variable).u16(0);
        }
        writer.build()
    }
}

/// Set the target's real-time clock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetTimeDateReq {
    four_digit_year: bool,
    hour: u8,
    minute: u8,
    second: u8,
    year: u16,
    month: u8,
    day: u8,
}

impl SetTimeDateReq {
    /// Two-digit targets receive `year % 100`
    pub fn new(
        four_digit_year: bool,
        hour: u8,
        minute: u8,
        second: u8,
        year: u16,
        month: u8,
        day: u8,
    ) -> Self {
        let year = if four_digit_year { year } else { year % 100 };
        Self {
            four_digit_year,
            hour,
            minute,
            second,
            year,
            month,
            day,
        }
    }

    /// Build from a calendar timestamp
    pub fn from_datetime(timestamp: &NaiveDateTime, four_digit_year: bool) -> Self {
        Self::new(
            four_digit_year,
            timestamp.hour() as u8,
            timestamp.minute() as u8,
            timestamp.second() as u8,
            timestamp.year().clamp(0, u16::MAX as i32) as u16,
            timestamp.month() as u8,
            timestamp.day() as u8,
        )
    }
}

impl CommRequest for SetTimeDateReq {
    fn packet_type(&self) -> PacketType {
        PacketType::SetTimeDate
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::CommandResponse
    }

    fn payload(&self, big_endian: bool) -> Vec<u8> {
        let writer = PayloadWriter::new(big_endian)
            .u8(self.hour)
            .u8(self.minute)
            .u8(self.second);
        let writer = if self.four_digit_year {
            // 32-bit zero filler ahead of the year
            writer.u32(0).u16(self.year)
        } else {
            writer.u8(self.year as u8)
        };
        writer.u8(self.month).u8(self.day).build()
    }
}

/// Replace the list of watched variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetWatchElementsReq {
    watch_elements: Vec<i16>,
}

impl SetWatchElementsReq {
    /// Fails with [`CommError::ListTooLong`] when the elements do not fit in one packet
    pub fn new(watch_elements: &[i16]) -> Result<Self, CommError> {
        check_list_len(watch_elements.len(), MAX_WATCH_ELEMENTS)?;
        Ok(Self {
            watch_elements: watch_elements.to_vec(),
        })
    }
}

impl CommRequest for SetWatchElementsReq {
    fn packet_type(&self) -> PacketType {
        PacketType::SetWatchElements
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::CommandResponse
    }

    fn payload(&self, big_endian: bool) -> Vec<u8> {
        self.watch_elements
            .iter()
            .fold(PayloadWriter::new(big_endian), |w, &e| w.i16(e))
            .build()
    }
}

/// Poll watched variable values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateWatchElementsReq {
    force_full_update: bool,
}

impl UpdateWatchElementsReq {
    /// Read watch values; `force_full_update` asks for every element, not just changes
    pub fn new(force_full_update: bool) -> Self {
        Self { force_full_update }
    }
}

impl CommRequest for UpdateWatchElementsReq {
    fn packet_type(&self) -> PacketType {
        PacketType::UpdateWatchElements
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::DataResponse
    }

    fn payload(&self, big_endian: bool) -> Vec<u8> {
        PayloadWriter::new(big_endian)
            .u8(self.force_full_update as u8)
            .build()
    }
}

/// Self-test command identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SelfTestCommandId {
    /// Change the self-test mode
    UpdateMode = 0,
    /// Select a predefined test list
    SelectList = 1,
    /// Run the current test list
    ExecuteList = 2,
    /// Replace the test list
    UpdateList = 3,
    /// Stop the running sequence
    AbortSequence = 4,
    /// Confirm an operator prompt
    OperatorAcknowledge = 7,
    /// Set how often the list repeats
    UpdateLoopCount = 8,
}

/// Generic self-test command: `command`, `truck_id`, `data`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfTestCommand {
    command: SelfTestCommandId,
    truck_id: u8,
    data: u16,
}

impl SelfTestCommand {
    /// Command `command` with its truck selector and 16-bit argument
    pub fn new(command: SelfTestCommandId, truck_id: u8, data: u16) -> Self {
        Self {
            command,
            truck_id,
            data,
        }
    }

    /// Command identifier
    pub fn command(&self) -> SelfTestCommandId {
        self.command
    }
}

impl CommRequest for SelfTestCommand {
    fn packet_type(&self) -> PacketType {
        PacketType::SelfTestCommand
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::CommandResponse
    }

    fn payload(&self, big_endian: bool) -> Vec<u8> {
        PayloadWriter::new(big_endian)
            .u8(self.command as u8)
            .u8(self.truck_id)
            .u16(self.data)
            .build()
    }
}

/// Replace the list of self-tests to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfTestUpdateListReq {
    tests: Vec<i16>,
}

impl SelfTestUpdateListReq {
    /// Fails with [`CommError::ListTooLong`] when the list does not fit in one packet
    pub fn new(tests: &[i16]) -> Result<Self, CommError> {
        check_list_len(tests.len(), MAX_SELF_TEST_LIST)?;
        Ok(Self {
            tests: tests.to_vec(),
        })
    }

    /// Test ids in run order
    pub fn tests(&self) -> &[i16] {
        &self.tests
    }
}

impl CommRequest for SelfTestUpdateListReq {
    fn packet_type(&self) -> PacketType {
        PacketType::SelfTestCommand
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::CommandResponse
    }

    fn payload(&self, big_endian: bool) -> Vec<u8> {
        let writer = PayloadWriter::new(big_endian)
            .u8(SelfTestCommandId::UpdateList as u8)
            .u32(0)
            .i16(self.tests.len() as i16);
        self.tests
            .iter()
            .fold(writer, |w, &t| w.i16(t))
            .build()
    }
}
