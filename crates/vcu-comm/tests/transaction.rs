//! Transactions over a real TCP link to a fake target

mod common;

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use common::SelfTestPacket;
use pretty_assertions::assert_eq;
use vcu_comm::config::{Endianness, TransportConfig, TransportKind};
use vcu_comm::protocol::*;
use vcu_comm::self_test::{SelfTestMarshal, SpecialMessage};

/// What the fake target does after reading one request
enum Step {
    Reply(Vec<u8>),
    Silent,
    Close,
}

fn read_packet(stream: &mut TcpStream, big_endian: bool) -> Vec<u8> {
    let mut packet = vec![0u8; HEADER_SIZE];
    stream.read_exact(&mut packet).unwrap();
    let header = PacketHeader::parse(&packet, big_endian).unwrap();
    let mut payload = vec![0u8; header.payload_len()];
    stream.read_exact(&mut payload).unwrap();
    packet.extend(payload);
    packet
}

/// Serve one connection, answering each request per `script`; returns what it received
fn spawn_target(big_endian: bool, script: Vec<Step>) -> (u16, JoinHandle<Vec<Vec<u8>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut received = Vec::new();
        for step in script {
            received.push(read_packet(&mut stream, big_endian));
            match step {
                Step::Reply(bytes) => {
                    stream.write_all(&bytes).unwrap();
                    stream.flush().unwrap();
                }
                Step::Silent => thread::sleep(Duration::from_millis(300)),
                Step::Close => break,
            }
        }
        received
    });

    (port, handle)
}

fn open(port: u16, endianness: Endianness) -> ChannelDevice {
    TransportConfig {
        transport: TransportKind::Tcp {
            host: "127.0.0.1".into(),
            port,
        },
        endianness,
        timeout_ms: 150,
    }
    .open()
    .expect("connect to fake target")
}

fn ack(packet_type: PacketType, big_endian: bool) -> Vec<u8> {
    frame(&[], packet_type, ResponseType::CommandResponse, big_endian).unwrap()
}

#[test]
fn test_command_acknowledged() {
    let (port, target) = spawn_target(
        false,
        vec![Step::Reply(ack(PacketType::SetCarId, false))],
    );
    let mut device = open(port, Endianness::Little);

    let request = SetCarIdReq::new("TRAIN-7");
    send_command(&mut device, &request).unwrap();

    let received = target.join().unwrap();
    assert_eq!(received[0], request.to_bytes(false).unwrap());
}

#[test]
fn test_data_request_big_endian() {
    let packet = SelfTestPacket::new(true)
        .valid(1)
        .mode(4)
        .special(1, 1)
        .build();
    let (port, target) = spawn_target(true, vec![Step::Reply(packet.clone())]);
    let mut device = open(port, Endianness::Big);

    let mut rx = ResponseBuffer::new();
    send_data_request(&mut device, PacketType::GetSelfTestPacket, &mut rx).unwrap();
    assert_eq!(rx.received(), packet.as_slice());

    let received = target.join().unwrap();
    let header = PacketHeader::parse(&received[0], true).unwrap();
    assert_eq!(header.packet_type, PacketType::GetSelfTestPacket);
    assert_eq!(header.response_type, ResponseType::DataResponse);
    assert_eq!(received[0].len(), HEADER_SIZE);
}

#[test]
fn test_data_request_with_payload() {
    let response = frame(
        &[0xAA, 0xBB],
        PacketType::GetFaultData,
        ResponseType::DataResponse,
        false,
    )
    .unwrap();
    let (port, target) = spawn_target(false, vec![Step::Reply(response)]);
    let mut device = open(port, Endianness::Little);

    let mut rx = ResponseBuffer::new();
    let request = GetFaultDataReq::new(12, 4);
    execute(&mut device, &request, &mut rx).unwrap();
    assert_eq!(&rx.received()[HEADER_SIZE..], &[0xAA, 0xBB]);

    let received = target.join().unwrap();
    assert_eq!(&received[0][HEADER_SIZE..], &[12, 0, 0, 0, 4, 0]);
}

#[test]
fn test_silent_target_times_out() {
    let (port, target) = spawn_target(false, vec![Step::Silent]);
    let mut device = open(port, Endianness::Little);

    let err = send_command(&mut device, &SetChartModeReq::new(1)).unwrap_err();
    assert!(matches!(err, CommError::Timeout));
    target.join().unwrap();
}

#[test]
fn test_closed_link_is_disconnected() {
    let (port, target) = spawn_target(false, vec![Step::Close]);
    let mut device = open(port, Endianness::Little);

    let started = std::time::Instant::now();
    let err = send_command(&mut device, &SetChartModeReq::new(1)).unwrap_err();
    assert!(matches!(err, CommError::Disconnected), "got {:?}", err);
    assert!(started.elapsed() < device.timeout());
    target.join().unwrap();
}

#[test]
fn test_closed_link_during_data_request() {
    let (port, target) = spawn_target(true, vec![Step::Close]);
    let mut device = open(port, Endianness::Big);

    let mut rx = ResponseBuffer::new();
    let err = send_data_request(&mut device, PacketType::GetSelfTestPacket, &mut rx).unwrap_err();
    assert!(matches!(err, CommError::Disconnected), "got {:?}", err);
    target.join().unwrap();
}

#[test]
fn test_reply_to_other_query_is_bad_response() {
    let stale = frame(&[0; 4], PacketType::GetFaultData, ResponseType::DataResponse, false).unwrap();
    let (port, target) = spawn_target(false, vec![Step::Reply(stale)]);
    let mut device = open(port, Endianness::Little);

    let mut rx = ResponseBuffer::new();
    let err = send_data_request(&mut device, PacketType::GetSelfTestPacket, &mut rx).unwrap_err();
    assert!(err.is_bad_response(), "got {:?}", err);
    assert!(rx.is_empty());
    target.join().unwrap();
}

#[test]
fn test_wrong_response_kind_is_bad_response() {
    let data = frame(&[1], PacketType::SetChartMode, ResponseType::DataResponse, false).unwrap();
    let (port, target) = spawn_target(false, vec![Step::Reply(data)]);
    let mut device = open(port, Endianness::Little);

    let err = send_command(&mut device, &SetChartModeReq::new(1)).unwrap_err();
    assert!(err.is_bad_response());
    target.join().unwrap();
}

#[test]
fn test_self_test_start_over_tcp() {
    let status = SelfTestPacket::new(false)
        .valid(1)
        .mode(4)
        .special(1, 0)
        .build();
    let (port, target) = spawn_target(
        false,
        vec![
            Step::Reply(ack(PacketType::StartSelfTestTask, false)),
            Step::Reply(status),
        ],
    );

    let mut st = SelfTestMarshal::new(open(port, Endianness::Little))
        .with_settle_delay(Duration::from_millis(5));
    assert_eq!(
        st.start_self_test_task().unwrap(),
        SpecialMessage { result: 1, reason: 0 }
    );

    let (tx_bytes, rx_bytes, tx_packets, rx_packets) = st.device().get_counters();
    assert_eq!(tx_packets, 2);
    assert_eq!(rx_packets, 2);
    assert_eq!(tx_bytes, 2 * HEADER_SIZE as u64);
    assert_eq!(rx_bytes, (HEADER_SIZE + 128) as u64);

    let received = target.join().unwrap();
    assert_eq!(received.len(), 2);
}
