//! Client configuration

use bgh_core::{DEFAULT_COMMAND_PORT, DEFAULT_LISTEN_PORT};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Silence tolerated before the broadcast loop starts polling
pub const DEFAULT_BROADCAST_TIMEOUT: Duration = Duration::from_secs(15);

/// Pause after each fallback status request
pub const DEFAULT_FALLBACK_SETTLE: Duration = Duration::from_millis(500);

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// How the background task keeps the cached status fresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionPolicy {
    /// Wait for unsolicited broadcasts; poll after a silent period until
    /// broadcasts come back
    BroadcastWithFallback {
        /// Silence tolerated before falling back to polling
        broadcast_timeout: Duration,
        /// Pause after each fallback status request
        fallback_settle: Duration,
    },
    /// Request status on a fixed interval
    Polling {
        interval: Duration,
    },
}

impl AcquisitionPolicy {
    pub fn broadcast() -> Self {
        AcquisitionPolicy::BroadcastWithFallback {
            broadcast_timeout: DEFAULT_BROADCAST_TIMEOUT,
            fallback_settle: DEFAULT_FALLBACK_SETTLE,
        }
    }

    pub fn polling() -> Self {
        AcquisitionPolicy::Polling {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Whether an out-of-band refresh waits for the reply itself.
    ///
    /// The broadcast loop is always listening and will pick the reply up.
    pub fn waits_for_reply(&self) -> bool {
        matches!(self, AcquisitionPolicy::Polling { .. })
    }
}

impl Default for AcquisitionPolicy {
    fn default() -> Self {
        Self::broadcast()
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Address of the AC unit; frames from anywhere else are discarded
    pub host: IpAddr,
    /// Device port commands are sent to
    pub command_port: u16,
    /// Local address the status socket binds to
    pub listen_addr: IpAddr,
    /// Local port the status socket binds to
    pub listen_port: u16,
    /// Fixed source port for the command socket
    pub source_port: Option<u16>,
    /// Bounded wait for a reply to a status request
    pub reply_timeout: Duration,
    /// Pause after a write command before refreshing status
    pub command_settle: Duration,
    /// How long a write command waits for the device identity
    pub identity_grace: Duration,
    /// Largest datagram accepted
    pub max_packet_size: usize,
    pub policy: AcquisitionPolicy,
}

impl ClientConfig {
    pub fn new(host: IpAddr) -> Self {
        Self {
            host,
            command_port: DEFAULT_COMMAND_PORT,
            listen_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            listen_port: DEFAULT_LISTEN_PORT,
            source_port: None,
            reply_timeout: Duration::from_secs(5),
            command_settle: Duration::from_millis(300),
            identity_grace: Duration::from_secs(2),
            max_packet_size: 1024,
            policy: AcquisitionPolicy::default(),
        }
    }

    pub fn command_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.command_port)
    }

    pub fn listen_socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_addr, self.listen_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("192.168.1.50".parse().unwrap());
        assert_eq!(config.command_addr().to_string(), "192.168.1.50:20910");
        assert_eq!(config.listen_socket_addr().to_string(), "0.0.0.0:20911");
        assert_eq!(config.policy, AcquisitionPolicy::broadcast());
        assert!(!config.policy.waits_for_reply());
        assert!(AcquisitionPolicy::polling().waits_for_reply());
    }
}
