//! Client builder pattern

use std::net::IpAddr;
use std::time::Duration;

use crate::config::{AcquisitionPolicy, ClientConfig};
use crate::error::{ClientError, Result};
use crate::BghClient;

/// Builder for BGH client
pub struct BghClientBuilder {
    config: ClientConfig,
}

impl BghClientBuilder {
    /// Create a new builder
    pub fn new(host: IpAddr) -> Self {
        Self {
            config: ClientConfig::new(host),
        }
    }

    /// Create a builder from a textual IP address
    pub fn from_host(host: &str) -> Result<Self> {
        let host = host
            .trim()
            .parse()
            .map_err(|_| ClientError::InvalidHost(host.to_string()))?;
        Ok(Self::new(host))
    }

    /// Start from an existing configuration
    pub fn from_config(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Set acquisition policy
    pub fn policy(mut self, policy: AcquisitionPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    /// Wait for broadcasts, polling after `broadcast_timeout` of silence
    pub fn broadcast(self, broadcast_timeout: Duration, fallback_settle: Duration) -> Self {
        self.policy(AcquisitionPolicy::BroadcastWithFallback {
            broadcast_timeout,
            fallback_settle,
        })
    }

    /// Poll on a fixed interval
    pub fn polling(self, interval: Duration) -> Self {
        self.policy(AcquisitionPolicy::Polling { interval })
    }

    /// Set the device's command port
    pub fn command_port(mut self, port: u16) -> Self {
        self.config.command_port = port;
        self
    }

    /// Set the local address the status socket binds to
    pub fn listen_addr(mut self, addr: IpAddr) -> Self {
        self.config.listen_addr = addr;
        self
    }

    /// Set the local port the status socket binds to
    pub fn listen_port(mut self, port: u16) -> Self {
        self.config.listen_port = port;
        self
    }

    /// Send commands from a fixed source port
    pub fn source_port(mut self, port: u16) -> Self {
        self.config.source_port = Some(port);
        self
    }

    /// Set the status reply timeout
    pub fn reply_timeout(mut self, timeout: Duration) -> Self {
        self.config.reply_timeout = timeout;
        self
    }

    /// Set the pause between a write command and the status refresh
    pub fn command_settle(mut self, settle: Duration) -> Self {
        self.config.command_settle = settle;
        self
    }

    /// Set how long write commands wait for the device identity
    pub fn identity_grace(mut self, grace: Duration) -> Self {
        self.config.identity_grace = grace;
        self
    }

    /// Set the largest accepted datagram
    pub fn max_packet_size(mut self, size: usize) -> Self {
        self.config.max_packet_size = size;
        self
    }

    /// Build without connecting
    pub fn build(self) -> BghClient {
        BghClient::new(self.config)
    }

    /// Build and connect
    pub async fn connect(self) -> Result<BghClient> {
        let client = self.build();
        client.connect().await?;
        Ok(client)
    }
}
