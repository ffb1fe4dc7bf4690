//! Wire layout of every outbound request

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use vcu_comm::protocol::*;

/// Split both payloads into fields of the given widths and check that every
/// big-endian field is the byte-reversed little-endian field.
fn assert_mirrored(request: &dyn CommRequest, widths: &[usize]) {
    let le = request.payload(false);
    let be = request.payload(true);
    assert_eq!(le.len(), widths.iter().sum::<usize>(), "payload length");
    assert_eq!(be.len(), le.len());

    let mut offset = 0;
    for &width in widths {
        let mut reversed = le[offset..offset + width].to_vec();
        reversed.reverse();
        assert_eq!(
            &be[offset..offset + width],
            reversed.as_slice(),
            "field at offset {} of {:?}",
            offset,
            request.packet_type()
        );
        offset += width;
    }
}

fn assert_binding(request: &dyn CommRequest, packet_type: PacketType, response_type: ResponseType) {
    assert_eq!(request.packet_type(), packet_type);
    assert_eq!(request.response_type(), response_type);

    for big_endian in [false, true] {
        let bytes = request.to_bytes(big_endian).unwrap();
        let header = PacketHeader::parse(&bytes, big_endian).unwrap();
        assert_eq!(header.packet_type, packet_type);
        assert_eq!(header.response_type, response_type);
        assert_eq!(header.length as usize, bytes.len());
        assert_eq!(&bytes[HEADER_SIZE..], request.payload(big_endian).as_slice());
    }
}

#[test]
fn test_change_event_log() {
    let req = ChangeEventLogReq::new(0x0102);
    assert_eq!(req.payload(false), vec![0x02, 0x01]);
    assert_mirrored(&req, &[2]);
    assert_binding(&req, PacketType::ChangeEventLog, ResponseType::DataResponse);
}

#[test]
fn test_get_chart_index() {
    let req = GetChartIndexReq::new(5);
    assert_eq!(req.payload(false), vec![5]);
    assert_eq!(req.payload(true), vec![5]);
    assert_binding(&req, PacketType::GetChartIndex, ResponseType::DataResponse);
}

#[test]
fn test_get_datalog_buffer() {
    let req = GetDatalogBufferReq::new(0x0A0B);
    assert_eq!(req.payload(false), vec![0x0B, 0x0A]);
    assert_mirrored(&req, &[2]);
    assert_binding(&req, PacketType::GetDatalogBuffer, ResponseType::DataResponse);
}

#[test]
fn test_get_fault_data() {
    let req = GetFaultDataReq::new(0x0102_0304, 0x0506);
    assert_eq!(req.payload(false), vec![0x04, 0x03, 0x02, 0x01, 0x06, 0x05]);
    assert_eq!(req.payload(true), vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
    assert_mirrored(&req, &[4, 2]);
    assert_binding(&req, PacketType::GetFaultData, ResponseType::DataResponse);
}

#[test]
fn test_get_fault_history() {
    let req = GetFaultHistoryReq::new(0x0001, 0x0203);
    // task id first, then fault id
    assert_eq!(req.payload(false), vec![0x01, 0x00, 0x03, 0x02]);
    assert_mirrored(&req, &[2, 2]);
    assert_binding(&req, PacketType::GetFaultHistory, ResponseType::DataResponse);
}

#[test]
fn test_get_stream_info() {
    let req = GetStreamInfoReq::new(-2);
    assert_eq!(req.payload(false), vec![0xFE, 0xFF]);
    assert_mirrored(&req, &[2]);
    assert_binding(&req, PacketType::GetStreamInformation, ResponseType::DataResponse);
}

#[test]
fn test_get_variable_info() {
    let req = GetVariableInfoReq::new(300);
    assert_eq!(req.payload(false), vec![0x2C, 0x01]);
    assert_mirrored(&req, &[2]);
    assert_binding(&req, PacketType::GetVariableInformation, ResponseType::DataResponse);
}

#[test]
fn test_send_variable() {
    let req = SendVariableReq::new(7, 0xAABB_CCDD);
    assert_eq!(req.payload(false), vec![7, 0, 0xDD, 0xCC, 0xBB, 0xAA]);
    assert_mirrored(&req, &[2, 4]);
    assert_binding(&req, PacketType::SendVariableValue, ResponseType::CommandResponse);
}

#[test]
fn test_set_car_id() {
    let req = SetCarIdReq::new("12345");
    assert_eq!(req.payload(false), b"12345\0\0\0\0\0\0".to_vec());
    // strings are never reordered
    assert_eq!(req.payload(true), req.payload(false));
    assert_binding(&req, PacketType::SetCarId, ResponseType::CommandResponse);

    assert_eq!(SetCarIdReq::new("ABCDEFGHIJK").payload(false), b"ABCDEFGHIJK".to_vec());
    assert_eq!(
        SetCarIdReq::new("ABCDEFGHIJKLMNO").payload(false),
        b"ABCDEFGHIJK".to_vec()
    );
}

#[test]
fn test_set_chart_index() {
    let req = SetChartIndexReq::new(3, 0x0102);
    // variable index precedes chart index
    assert_eq!(req.payload(false), vec![0x02, 0x01, 3]);
    assert_eq!(req.payload(true), vec![0x01, 0x02, 3]);
    assert_mirrored(&req, &[2, 1]);
    assert_binding(&req, PacketType::SetChartIndex, ResponseType::CommandResponse);
}

#[test]
fn test_set_chart_mode() {
    let req = SetChartModeReq::new(2);
    assert_eq!(req.payload(false), vec![2]);
    assert_binding(&req, PacketType::SetChartMode, ResponseType::CommandResponse);
}

#[test]
fn test_set_chart_scale() {
    let req = SetChartScaleReq::new(1, 1000, -1000);
    let le = req.payload(false);
    assert_eq!(&le[0..2], &1i16.to_le_bytes());
    assert_eq!(&le[2..6], &1000i32.to_le_bytes());
    assert_eq!(&le[6..10], &(-1000i32).to_le_bytes());
    assert_mirrored(&req, &[2, 4, 4]);
    assert_binding(&req, PacketType::SetChartScale, ResponseType::CommandResponse);
}

#[test]
fn test_set_fault_flag() {
    let req = SetFaultFlagReq::new(0x0011, 0x0022, true, false);
    // task id, fault id, enable, datalog
    assert_eq!(req.payload(false), vec![0x11, 0x00, 0x22, 0x00, 1, 0]);
    assert_eq!(req.payload(true), vec![0x00, 0x11, 0x00, 0x22, 1, 0]);
    assert_mirrored(&req, &[2, 2, 1, 1]);
    assert_binding(&req, PacketType::SetFaultFlag, ResponseType::CommandResponse);
}

#[test]
fn test_enable_fault_logging() {
    let req = EnableFaultLoggingReq::new(1);
    assert_eq!(req.payload(true), vec![1]);
    assert_binding(&req, PacketType::SetFaultLog, ResponseType::CommandResponse);
}

#[test]
fn test_set_stream_info() {
    let req = SetStreamInfoReq::new(50, &[0x0102, 0x0304]).unwrap();
    assert_eq!(
        req.payload(false),
        vec![
            2, 0, // count
            0, 0, // samples
            50, 0, // sample rate
            0x02, 0x01, 0, 0, // variable, type
            0x04, 0x03, 0, 0,
        ]
    );
    assert_mirrored(&req, &[2, 2, 2, 2, 2, 2, 2]);
    assert_binding(&req, PacketType::SetStreamInformation, ResponseType::CommandResponse);
}

#[test]
fn test_set_time_date_four_digit() {
    let req = SetTimeDateReq::new(true, 13, 45, 30, 2016, 3, 1);
    // hour, minute, second, 32-bit zero filler, year, month, day
    assert_eq!(req.payload(false), vec![13, 45, 30, 0, 0, 0, 0, 0xE0, 0x07, 3, 1]);
    assert_eq!(req.payload(true), vec![13, 45, 30, 0, 0, 0, 0, 0x07, 0xE0, 3, 1]);
    assert_mirrored(&req, &[1, 1, 1, 4, 2, 1, 1]);
    assert_binding(&req, PacketType::SetTimeDate, ResponseType::CommandResponse);
}

#[test]
fn test_set_time_date_two_digit() {
    let req = SetTimeDateReq::new(false, 8, 0, 5, 2016, 12, 31);
    assert_eq!(req.payload(false), vec![8, 0, 5, 16, 12, 31]);
    assert_eq!(req.payload(true), req.payload(false));
}

#[test]
fn test_set_time_date_from_datetime() {
    let timestamp = NaiveDate::from_ymd_opt(2024, 2, 29)
        .unwrap()
        .and_hms_opt(23, 59, 58)
        .unwrap();
    let req = SetTimeDateReq::from_datetime(&timestamp, true);
    assert_eq!(req, SetTimeDateReq::new(true, 23, 59, 58, 2024, 2, 29));
}

#[test]
fn test_set_watch_elements() {
    let req = SetWatchElementsReq::new(&[1, -1, 0x0203]).unwrap();
    assert_eq!(req.payload(false), vec![1, 0, 0xFF, 0xFF, 0x03, 0x02]);
    assert_mirrored(&req, &[2, 2, 2]);
    assert_binding(&req, PacketType::SetWatchElements, ResponseType::CommandResponse);

    let empty = SetWatchElementsReq::new(&[]).unwrap();
    assert!(empty.payload(false).is_empty());
}

#[test]
fn test_update_watch_elements() {
    assert_eq!(UpdateWatchElementsReq::new(true).payload(false), vec![1]);
    assert_eq!(UpdateWatchElementsReq::new(false).payload(true), vec![0]);
    assert_binding(
        &UpdateWatchElementsReq::new(true),
        PacketType::UpdateWatchElements,
        ResponseType::DataResponse,
    );
}

#[test]
fn test_self_test_command() {
    let req = SelfTestCommand::new(SelfTestCommandId::SelectList, 2, 0x0304);
    assert_eq!(req.payload(false), vec![1, 2, 0x04, 0x03]);
    assert_eq!(req.payload(true), vec![1, 2, 0x03, 0x04]);
    assert_mirrored(&req, &[1, 1, 2]);
    assert_binding(&req, PacketType::SelfTestCommand, ResponseType::CommandResponse);
}

#[test]
fn test_self_test_update_list() {
    let req = SelfTestUpdateListReq::new(&[10, 0x0102]).unwrap();
    // command id, 32-bit zero filler, count, tests
    assert_eq!(req.payload(false), vec![3, 0, 0, 0, 0, 2, 0, 10, 0, 0x02, 0x01]);
    assert_eq!(req.payload(true), vec![3, 0, 0, 0, 0, 0, 2, 0, 10, 0x01, 0x02]);
    assert_mirrored(&req, &[1, 4, 2, 2, 2]);
    assert_binding(&req, PacketType::SelfTestCommand, ResponseType::CommandResponse);
}

#[test]
fn test_list_too_long_is_rejected() {
    let tests = vec![1i16; MAX_SELF_TEST_LIST + 1];
    match SelfTestUpdateListReq::new(&tests) {
        Err(CommError::ListTooLong { len, max }) => {
            assert_eq!(len, MAX_SELF_TEST_LIST + 1);
            assert_eq!(max, MAX_SELF_TEST_LIST);
        }
        other => panic!("expected ListTooLong, got {:?}", other),
    }
}

#[test]
fn test_requests_are_reusable() {
    let req = SetFaultFlagReq::new(1, 2, true, true);
    let be_first = req.to_bytes(true).unwrap();
    let le = req.to_bytes(false).unwrap();
    let be_second = req.to_bytes(true).unwrap();
    assert_eq!(be_first, be_second);
    assert_ne!(be_first, le);
}
