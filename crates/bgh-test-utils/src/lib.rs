//! Common test helpers and utilities for BGH tests
//!
//! This crate provides:
//! - Condition-based waiting (no hardcoded sleeps)
//! - Free port allocation
//! - Synthetic status frames
//! - [`MockDevice`], a simulated AC unit on loopback UDP

use bgh_core::codec::{
    CMD_FAN_OFFSET, CMD_MODE_OFFSET, CMD_TEMPERATURE_OFFSET, MIN_STATUS_LEN, MODE_SUFFIX,
    STATUS_REQUEST, TEMPERATURE_SUFFIX, WRITE_FRAME_LEN, WRITE_PADDING,
};
use bgh_core::{IDENTITY_LEN, IDENTITY_OFFSET};
use bytes::Bytes;
use parking_lot::Mutex;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tracing::debug;

/// Default test timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default condition check interval
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(10);

/// Identity every mock device reports unless told otherwise
pub const TEST_IDENTITY: [u8; IDENTITY_LEN] = [0xac, 0xcf, 0x23, 0x10, 0x20, 0x30];

/// Loopback address the mock device sends from
pub const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

// ============================================================================
// Port Allocation
// ============================================================================

/// Find an available UDP port for testing
pub fn find_available_udp_port() -> u16 {
    let socket = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.local_addr().unwrap().port()
}

// ============================================================================
// Condition-Based Waiting
// ============================================================================

/// Wait for a condition with timeout - condition-based, not time-based
pub async fn wait_for<F>(check: F, max_wait: Duration) -> bool
where
    F: Fn() -> bool,
{
    let start = Instant::now();
    while start.elapsed() < max_wait {
        if check() {
            return true;
        }
        tokio::time::sleep(DEFAULT_CHECK_INTERVAL).await;
    }
    check()
}

/// Wait for an atomic counter to reach a target value
pub async fn wait_for_count(counter: &AtomicU32, target: u32, max_wait: Duration) -> bool {
    wait_for(|| counter.load(Ordering::SeqCst) >= target, max_wait).await
}

// ============================================================================
// Frames
// ============================================================================

/// State a mock unit reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceState {
    pub mode: u8,
    pub fan: u8,
    /// Room temperature, hundredths of °C
    pub current: u16,
    /// Setpoint, hundredths of °C
    pub target: u16,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            mode: 1,
            fan: 2,
            current: 2500,
            target: 2300,
        }
    }
}

/// Build a status frame as the unit sends it
pub fn status_frame(identity: [u8; IDENTITY_LEN], state: DeviceState) -> Vec<u8> {
    let mut frame = vec![0u8; MIN_STATUS_LEN];
    frame[IDENTITY_OFFSET..IDENTITY_OFFSET + IDENTITY_LEN].copy_from_slice(&identity);
    frame[18] = state.mode;
    frame[19] = state.fan;
    frame[21..23].copy_from_slice(&state.current.to_le_bytes());
    frame[23..25].copy_from_slice(&state.target.to_le_bytes());
    frame
}

/// What a command received by the mock decodes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    StatusRequest,
    Mode { mode: u8, fan: u8 },
    Temperature { mode: u8, fan: u8, target: u16 },
    Unrecognized,
}

impl Command {
    pub fn parse(data: &[u8]) -> Self {
        if data == STATUS_REQUEST {
            return Command::StatusRequest;
        }
        if data.len() != WRITE_FRAME_LEN {
            return Command::Unrecognized;
        }

        let suffix = &data[WRITE_PADDING + IDENTITY_LEN..];
        let mode = data[CMD_MODE_OFFSET];
        let fan = data[CMD_FAN_OFFSET];
        if suffix[0] == MODE_SUFFIX[0] {
            Command::Mode { mode, fan }
        } else if suffix[0] == TEMPERATURE_SUFFIX[0] {
            let target =
                u16::from_le_bytes([data[CMD_TEMPERATURE_OFFSET], data[CMD_TEMPERATURE_OFFSET + 1]]);
            Command::Temperature { mode, fan, target }
        } else {
            Command::Unrecognized
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Command::Mode { .. } | Command::Temperature { .. })
    }
}

// ============================================================================
// Mock Device - RAII wrapper with proper cleanup
// ============================================================================

struct DeviceShared {
    identity: [u8; IDENTITY_LEN],
    state: Mutex<DeviceState>,
    commands: Mutex<Vec<Bytes>>,
    status_requests: AtomicU32,
    writes: AtomicU32,
    replies: AtomicBool,
    last_source: Mutex<Option<SocketAddr>>,
}

/// A simulated AC unit.
///
/// Listens on its own loopback command port, applies write commands to its
/// state, and answers status requests by sending a status frame to the
/// client's listen port. Stops on drop.
pub struct MockDevice {
    socket: Arc<UdpSocket>,
    client_addr: SocketAddr,
    shared: Arc<DeviceShared>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl MockDevice {
    /// Start a device that answers status requests, sending to `client_listen_port`
    pub async fn start(client_listen_port: u16) -> Self {
        Self::start_with(client_listen_port, TEST_IDENTITY, DeviceState::default()).await
    }

    /// Start a device that never answers status requests
    pub async fn silent(client_listen_port: u16) -> Self {
        let device = Self::start(client_listen_port).await;
        device.set_replies(false);
        device
    }

    pub async fn start_with(
        client_listen_port: u16,
        identity: [u8; IDENTITY_LEN],
        state: DeviceState,
    ) -> Self {
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let client_addr = SocketAddr::new(LOCALHOST, client_listen_port);
        let shared = Arc::new(DeviceShared {
            identity,
            state: Mutex::new(state),
            commands: Mutex::new(Vec::new()),
            status_requests: AtomicU32::new(0),
            writes: AtomicU32::new(0),
            replies: AtomicBool::new(true),
            last_source: Mutex::new(None),
        });

        let handle = tokio::spawn(serve(socket.clone(), client_addr, shared.clone()));

        Self {
            socket,
            client_addr,
            shared,
            handle: Some(handle),
        }
    }

    /// Port the client should send commands to
    pub fn port(&self) -> u16 {
        self.socket.local_addr().unwrap().port()
    }

    /// Enable or disable answering status requests
    pub fn set_replies(&self, enabled: bool) {
        self.shared.replies.store(enabled, Ordering::SeqCst);
    }

    pub fn state(&self) -> DeviceState {
        *self.shared.state.lock()
    }

    pub fn set_state(&self, state: DeviceState) {
        *self.shared.state.lock() = state;
    }

    /// Send an unsolicited status frame to the client
    pub async fn broadcast(&self) {
        let frame = status_frame(self.shared.identity, self.state());
        self.send_raw(&frame).await;
    }

    /// Send arbitrary bytes to the client from the device's address
    pub async fn send_raw(&self, data: &[u8]) {
        self.socket.send_to(data, self.client_addr).await.unwrap();
    }

    /// Every datagram received so far
    pub fn commands(&self) -> Vec<Command> {
        self.shared
            .commands
            .lock()
            .iter()
            .map(|data| Command::parse(data))
            .collect()
    }

    /// Raw bytes of every datagram received so far
    pub fn raw_commands(&self) -> Vec<Bytes> {
        self.shared.commands.lock().clone()
    }

    /// Source address of the most recent datagram
    pub fn last_source(&self) -> Option<SocketAddr> {
        *self.shared.last_source.lock()
    }

    pub fn status_requests(&self) -> u32 {
        self.shared.status_requests.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> u32 {
        self.shared.writes.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` status requests have arrived
    pub async fn wait_for_status_requests(&self, count: u32, max_wait: Duration) -> bool {
        wait_for_count(&self.shared.status_requests, count, max_wait).await
    }

    /// Wait until at least `count` write commands have arrived
    pub async fn wait_for_writes(&self, count: u32, max_wait: Duration) -> bool {
        wait_for_count(&self.shared.writes, count, max_wait).await
    }

    /// Stop the device explicitly (also happens on drop)
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn serve(socket: Arc<UdpSocket>, client_addr: SocketAddr, shared: Arc<DeviceShared>) {
    let mut buf = vec![0u8; 1024];

    loop {
        let Ok((len, from)) = socket.recv_from(&mut buf).await else {
            continue;
        };
        let data = Bytes::copy_from_slice(&buf[..len]);
        debug!("Mock device received {} bytes from {}", len, from);

        let command = Command::parse(&data);
        shared.commands.lock().push(data);
        *shared.last_source.lock() = Some(from);

        match command {
            Command::StatusRequest => {
                shared.status_requests.fetch_add(1, Ordering::SeqCst);
                if shared.replies.load(Ordering::SeqCst) {
                    let frame = status_frame(shared.identity, *shared.state.lock());
                    let _ = socket.send_to(&frame, client_addr).await;
                }
            }
            Command::Mode { mode, fan } => {
                let mut state = shared.state.lock();
                state.mode = mode;
                state.fan = fan;
                drop(state);
                shared.writes.fetch_add(1, Ordering::SeqCst);
            }
            Command::Temperature { mode, fan, target } => {
                let mut state = shared.state.lock();
                state.mode = mode;
                state.fan = fan;
                state.target = target;
                drop(state);
                shared.writes.fetch_add(1, Ordering::SeqCst);
            }
            Command::Unrecognized => {}
        }
    }
}

/// Send bytes to `port` on loopback from a different local address
pub async fn send_from(source: IpAddr, port: u16, data: &[u8]) {
    let socket = UdpSocket::bind(SocketAddr::new(source, 0)).await.unwrap();
    socket
        .send_to(data, SocketAddr::new(LOCALHOST, port))
        .await
        .unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse(&STATUS_REQUEST), Command::StatusRequest);

        let identity = bgh_core::DeviceIdentity::new(TEST_IDENTITY);
        let mode = bgh_core::encode_mode(&identity, 2, 3);
        assert_eq!(Command::parse(&mode), Command::Mode { mode: 2, fan: 3 });

        let temp = bgh_core::encode_temperature(&identity, 1, 1, 24.5);
        assert_eq!(
            Command::parse(&temp),
            Command::Temperature {
                mode: 1,
                fan: 1,
                target: 2450
            }
        );

        assert_eq!(Command::parse(&[1, 2, 3]), Command::Unrecognized);
    }

    #[test]
    fn test_status_frame_decodes() {
        let frame = status_frame(TEST_IDENTITY, DeviceState::default());
        let status = bgh_core::decode_status(&frame).unwrap();
        assert_eq!(status.mode, bgh_core::Mode::Cool);
        assert_eq!(status.target_temperature, 23.0);
    }
}
