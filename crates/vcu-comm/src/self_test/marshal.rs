//! Self-test control
//!
//! Each operation sends one fixed-shape request through the transaction
//! layer. Polling, delays between steps and retries are left to the caller;
//! the only built-in wait is the settle delay after starting the self-test
//! task, which gives the firmware time to switch modes.

use std::time::Duration;

use super::decode::{decode_self_test, decode_special_message, SelfTestResult, SpecialMessage};
use crate::protocol::{
    send_command, send_command_type, send_data_request, CommDevice, CommError, PacketType,
    ResponseBuffer, SelfTestCommand, SelfTestCommandId, SelfTestUpdateListReq,
};

/// Wait between starting the self-test task and reading its status
pub const SELF_TEST_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Drives the self-test task on the target
pub struct SelfTestMarshal<D: CommDevice> {
    device: D,
    rx: ResponseBuffer,
    settle_delay: Duration,
}

impl<D: CommDevice> SelfTestMarshal<D> {
    /// Drive the self-test task over `device` with the default settle delay
    pub fn new(device: D) -> Self {
        Self {
            device,
            rx: ResponseBuffer::new(),
            settle_delay: SELF_TEST_SETTLE_DELAY,
        }
    }

    /// Override the settle delay used by [`Self::start_self_test_task`]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// The underlying device
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Mutable access to the underlying device
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Give the device back
    pub fn into_device(self) -> D {
        self.device
    }

    /// Raw bytes of the most recent self-test response
    pub fn last_response(&self) -> &[u8] {
        self.rx.received()
    }

    /// Read the result/reason pair of a special message
    pub fn get_special_message(&mut self) -> Result<SpecialMessage, CommError> {
        send_data_request(&mut self.device, PacketType::GetSelfTestPacket, &mut self.rx)?;
        decode_special_message(self.rx.as_bytes(), self.device.is_target_big_endian())
    }

    /// Start the self-test task and report the target's answer
    pub fn start_self_test_task(&mut self) -> Result<SpecialMessage, CommError> {
        send_command_type(&mut self.device, PacketType::StartSelfTestTask)?;
        std::thread::sleep(self.settle_delay);
        self.get_special_message()
    }

    /// Leave the self-test task and report the target's answer
    pub fn exit_self_test_task(&mut self) -> Result<SpecialMessage, CommError> {
        send_command_type(&mut self.device, PacketType::ExitSelfTestTask)?;
        self.get_special_message()
    }

    /// Stop the running test sequence
    pub fn abort_sequence(&mut self) -> Result<(), CommError> {
        self.command(SelfTestCommandId::AbortSequence, 0, 0)
    }

    /// Confirm an operator prompt raised by an interactive test
    pub fn send_operator_acknowledge(&mut self) -> Result<(), CommError> {
        self.command(SelfTestCommandId::OperatorAcknowledge, 0, 0)
    }

    /// Replace the list of tests to run
    pub fn update_test_list(&mut self, tests: &[i16]) -> Result<(), CommError> {
        let request = SelfTestUpdateListReq::new(tests)?;
        send_command(&mut self.device, &request)
    }

    /// Select one of the target's predefined test lists
    pub fn run_predefined_tests(&mut self, test_id: i16) -> Result<(), CommError> {
        self.command(SelfTestCommandId::SelectList, 0, test_id as u16)
    }

    /// Set how many times the test list repeats
    pub fn update_loop_count(&mut self, loop_count: i16) -> Result<(), CommError> {
        self.command(SelfTestCommandId::UpdateLoopCount, 0, loop_count as u16)
    }

    /// Run the current list against the given truck selection
    pub fn execute_test_list(&mut self, truck_information: u8) -> Result<(), CommError> {
        self.command(SelfTestCommandId::ExecuteList, truck_information, 0)
    }

    /// Switch the self-test mode
    pub fn update_mode(&mut self, new_mode: i16) -> Result<(), CommError> {
        self.command(SelfTestCommandId::UpdateMode, 0, new_mode as u16)
    }

    /// Fetch and decode the current self-test status
    pub fn get_self_test_result(&mut self) -> Result<SelfTestResult, CommError> {
        send_data_request(&mut self.device, PacketType::GetSelfTestPacket, &mut self.rx)?;
        decode_self_test(self.rx.as_bytes(), self.device.is_target_big_endian())
    }

    fn command(&mut self, id: SelfTestCommandId, truck_id: u8, data: u16) -> Result<(), CommError> {
        send_command(&mut self.device, &SelfTestCommand::new(id, truck_id, data))
    }
}
