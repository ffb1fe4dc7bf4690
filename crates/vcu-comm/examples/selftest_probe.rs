//! Self-test probe
//!
//! Opens a link to the VCU, enters self-test mode, reads one status packet
//! and leaves self-test mode again.
//!
//! Usage:
//!   cargo run --example selftest_probe -- [OPTIONS]
//!
//! Options:
//!   --config PATH     Transport configuration JSON (default: vcu.json)
//!   --tcp HOST:PORT   Connect over TCP instead of the configured transport
//!   --big-endian      Target is big-endian (overrides the configuration)
//!   --list IDS        Comma-separated test ids to load and execute
//!
//! Set RUST_LOG=vcu_comm=trace to see every byte on the wire.

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;
use vcu_comm::prelude::*;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut config_path = "vcu.json".to_string();
    let mut tcp_target: Option<String> = None;
    let mut big_endian = false;
    let mut test_list: Vec<i16> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config_path = args[i].clone();
                }
            }
            "--tcp" => {
                i += 1;
                if i < args.len() {
                    tcp_target = Some(args[i].clone());
                }
            }
            "--big-endian" => {
                big_endian = true;
            }
            "--list" | "-l" => {
                i += 1;
                if i < args.len() {
                    test_list = args[i]
                        .split(',')
                        .map(|id| id.trim().parse::<i16>())
                        .collect::<Result<_, _>>()
                        .context("test ids must be 16-bit integers")?;
                }
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => bail!("unknown argument: {}", other),
        }
        i += 1;
    }

    let mut config = match &tcp_target {
        Some(_) => TransportConfig::default(),
        None => TransportConfig::from_file(&config_path)
            .with_context(|| format!("loading {}", config_path))?,
    };
    if let Some(target) = tcp_target {
        let (host, port) = target
            .rsplit_once(':')
            .context("--tcp expects HOST:PORT")?;
        config.transport = TransportKind::Tcp {
            host: host.to_string(),
            port: port.parse().context("invalid TCP port")?,
        };
    }
    if big_endian {
        config.endianness = Endianness::Big;
    }

    tracing::info!("opening {:?} ({:?})", config.transport, config.endianness);
    let device = config.open().context("opening link to target")?;
    let mut self_test = SelfTestMarshal::new(device);

    let status = self_test.start_self_test_task()?;
    tracing::info!(
        "self-test task started: result {} reason {}",
        status.result,
        status.reason
    );

    if !test_list.is_empty() {
        self_test.update_test_list(&test_list)?;
        self_test.execute_test_list(0)?;
        tracing::info!("executing {} test(s)", test_list.len());
    }

    match self_test.get_self_test_result() {
        Ok(result) => println!("{}", serde_json::to_string_pretty(&result)?),
        Err(e) => tracing::warn!("no self-test result: {}", e),
    }

    let status = self_test.exit_self_test_task()?;
    tracing::info!(
        "self-test task exited: result {} reason {}",
        status.result,
        status.reason
    );

    let (tx_bytes, rx_bytes, tx_packets, rx_packets) = self_test.device().get_counters();
    tracing::info!(
        "sent {} packets ({} bytes), received {} packets ({} bytes)",
        tx_packets,
        tx_bytes,
        rx_packets,
        rx_bytes
    );
    Ok(())
}

fn print_help() {
    println!(
        r#"VCU self-test probe

Usage: selftest_probe [OPTIONS]

Options:
  -c, --config PATH     Transport configuration JSON (default: vcu.json)
      --tcp HOST:PORT   Connect over TCP instead of the configured transport
      --big-endian      Target is big-endian
  -l, --list IDS        Comma-separated test ids to load and execute
  -h, --help            Show this help"#
    );
}
