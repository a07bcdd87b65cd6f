//! icmpcopy integration test harness.
//!
//! Tests in this file push real ICMP packets through the loopback
//! interface. Opening a raw socket requires root or CAP_NET_RAW:
//!
//!   sudo cargo test --test integration
//!
//! Without that privilege every test prints SKIP and returns.

use std::net::Ipv4Addr;
use std::sync::{mpsc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};

use icmpcopy_core::config::SocketConfig;
use icmpcopy_services::{RawIcmpSocket, ReceiveOptions, ReceiveReport};

mod loopback;

// ── Harness ───────────────────────────────────────────────────────────────────

/// Every raw ICMP socket on the host sees every loopback packet, so two
/// transfers in flight at once would read each other's signals.
static LOOPBACK_LOCK: Mutex<()> = Mutex::new(());

/// Serialize loopback transfers across tests.
pub fn loopback_lock() -> MutexGuard<'static, ()> {
    LOOPBACK_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// How long a test waits for the receiver before declaring the run lost.
pub const RECEIVE_DEADLINE: Duration = Duration::from_secs(10);

/// Socket settings for tests: loopback traffic arrives immediately, so a
/// short poll interval keeps the receiver responsive.
pub fn test_socket_config() -> SocketConfig {
    SocketConfig {
        recv_timeout_ms: 100,
        ..SocketConfig::default()
    }
}

/// Check whether raw ICMP sockets can be opened here.
/// Tests call this and skip gracefully if not.
pub fn raw_sockets_available() -> bool {
    match RawIcmpSocket::open(&test_socket_config()) {
        Ok(_) => true,
        Err(e) => {
            eprintln!("raw socket unavailable: {e}");
            false
        }
    }
}

/// Start a receiver on its own thread. The socket is opened before this
/// returns, so packets sent afterwards cannot be missed.
pub fn spawn_receiver() -> Result<mpsc::Receiver<Result<(ReceiveReport, Vec<u8>)>>> {
    let config = test_socket_config();
    let mut socket = RawIcmpSocket::open(&config).context("failed to open receiver socket")?;
    let options = ReceiveOptions::from(&config);

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut out = Vec::new();
        let result = icmpcopy_services::receive_stream(&mut socket, &mut out, &options)
            .map(|report| (report, out))
            .map_err(anyhow::Error::from);
        let _ = tx.send(result);
    });
    Ok(rx)
}

/// Wait for a spawned receiver to see the close signal.
pub fn wait_for_receiver(
    rx: mpsc::Receiver<Result<(ReceiveReport, Vec<u8>)>>,
) -> Result<(ReceiveReport, Vec<u8>)> {
    rx.recv_timeout(RECEIVE_DEADLINE)
        .context("receiver did not see the close signal in time")?
}

/// A sender socket pointed at loopback.
pub fn open_sender() -> Result<(RawIcmpSocket, Ipv4Addr)> {
    let socket = RawIcmpSocket::open(&test_socket_config()).context("failed to open sender socket")?;
    Ok((socket, Ipv4Addr::LOCALHOST))
}
