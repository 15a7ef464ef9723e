//! Main BGH client implementation

use bgh_core::{codec, DeviceIdentity, Mode, Status, MAX_TEMPERATURE, MIN_TEMPERATURE};
use bgh_transport::{CommandSender, StatusReceiver, UdpConfig};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::acquisition::{self, AcquisitionState};
use crate::builder::BghClientBuilder;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::state::{ClientState, Shadow};
use crate::subscription::StatusSubscription;

/// A client for one BGH air-conditioning unit
pub struct BghClient {
    state: Arc<ClientState>,

    /// Background acquisition task, present while connected
    task: Mutex<Option<JoinHandle<()>>>,
}

impl BghClient {
    /// Create a client (use builder for more options)
    pub fn new(config: ClientConfig) -> Self {
        Self {
            state: Arc::new(ClientState::new(config)),
            task: Mutex::new(None),
        }
    }

    /// Create a builder
    pub fn builder(host: IpAddr) -> BghClientBuilder {
        BghClientBuilder::new(host)
    }

    /// Connect with default settings (convenience method)
    pub async fn connect_to(host: &str) -> Result<Self> {
        BghClientBuilder::from_host(host)?.connect().await
    }

    pub fn config(&self) -> &ClientConfig {
        &self.state.config
    }

    /// Bind the sockets, start the background task and request a first status.
    ///
    /// On failure nothing is left bound.
    pub async fn connect(&self) -> Result<()> {
        let mut task = self.task.lock().await;
        if task.is_some() {
            return Err(ClientError::AlreadyConnected);
        }

        let config = &self.state.config;
        info!("Connecting to {} ({:?})", config.host, config.policy);

        let udp_config = UdpConfig {
            max_packet_size: config.max_packet_size,
            ..UdpConfig::default()
        };
        let receiver = StatusReceiver::bind_with_config(config.listen_socket_addr(), udp_config)
            .map_err(|e| {
                error!("Failed to create status socket: {}", e);
                ClientError::ConnectionFailed(e.to_string())
            })?;

        // The broadcast loop keeps one send socket for the connection's lifetime
        let persistent = !config.policy.waits_for_reply() || config.source_port.is_some();
        let sender = if persistent {
            CommandSender::persistent(config.command_addr(), config.source_port)
                .await
                .map_err(|e| {
                    error!("Failed to create command socket: {}", e);
                    ClientError::ConnectionFailed(e.to_string())
                })?
        } else {
            CommandSender::ephemeral(config.command_addr())
        };

        self.state.attach(receiver, sender).await;
        *task = Some(tokio::spawn(acquisition::run(Arc::clone(&self.state))));
        drop(task);

        info!("Connected to {}, requesting initial status", config.host);
        self.refresh().await;

        Ok(())
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.state.sender().is_some()
    }

    /// Stop the background task and release both sockets.
    ///
    /// Returns once the task has fully stopped. Closing twice is a no-op.
    pub async fn close(&self) {
        let mut task = self.task.lock().await;
        let Some(handle) = task.take() else {
            return;
        };

        handle.abort();
        if let Err(e) = handle.await {
            if e.is_panic() {
                error!("Acquisition task panicked: {}", e);
            }
        }

        self.state.detach().await;
        info!("Closed connection to {}", self.state.config.host);
    }

    /// Subscribe to every decoded status
    pub fn subscribe(&self) -> StatusSubscription {
        self.state.subscribe()
    }

    /// Fire a status request without waiting for the reply
    pub async fn request_status(&self) -> Result<()> {
        self.state.send_status_request().await
    }

    /// Cached status; with an empty cache, one bounded status request is made first
    pub async fn get_status(&self) -> Option<Status> {
        if let Some(status) = self.state.cached() {
            return Some(status);
        }
        if !self.is_connected() {
            return None;
        }

        self.state
            .request_and_wait(self.state.config.reply_timeout)
            .await
            .or_else(|| self.state.cached())
    }

    /// Cached status, never touching the network
    pub fn cached_status(&self) -> Option<Status> {
        self.state.cached()
    }

    /// Device identity, once learned
    pub fn device_identity(&self) -> Option<DeviceIdentity> {
        self.state.identity.get()
    }

    pub fn acquisition_state(&self) -> AcquisitionState {
        self.state.acquisition_state()
    }

    /// Current best-guess mode and fan
    pub fn shadow(&self) -> Shadow {
        self.state.shadow()
    }

    /// Set mode, and fan speed if given (otherwise the fan is left as is)
    pub async fn set_mode(&self, mode: Mode, fan: Option<u8>) -> Result<()> {
        let raw = mode
            .raw()
            .ok_or_else(|| bgh_core::Error::InvalidMode(mode.to_string()))?;
        self.set_mode_raw(raw, fan).await
    }

    /// Set mode by wire value
    pub async fn set_mode_raw(&self, mode: u8, fan: Option<u8>) -> Result<()> {
        let sender = self.state.sender().ok_or(ClientError::NotConnected)?;
        let identity = self.ready_identity().await?;

        let shadow = self.state.command_shadow(Some(mode), fan);
        info!("Sending mode command: mode={}, fan={}", shadow.mode, shadow.fan);

        sender
            .send(&codec::encode_mode(&identity, shadow.mode, shadow.fan))
            .await
            .map_err(|e| {
                error!("Failed to set mode on {}: {}", self.state.config.host, e);
                e
            })?;

        self.settle_and_refresh().await;
        Ok(())
    }

    /// Change fan speed, keeping the current mode
    pub async fn set_fan(&self, fan: u8) -> Result<()> {
        let mode = self.state.shadow().mode;
        self.set_mode_raw(mode, Some(fan)).await
    }

    /// Set target temperature (°C)
    pub async fn set_temperature(&self, celsius: f64) -> Result<()> {
        if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&celsius) {
            warn!(
                "Target {:.1}°C is outside {}-{}°C, sending anyway",
                celsius, MIN_TEMPERATURE, MAX_TEMPERATURE
            );
        }

        let sender = self.state.sender().ok_or(ClientError::NotConnected)?;
        let identity = self.ready_identity().await?;

        let shadow = self.state.command_shadow(None, None);
        info!("Sending temperature command: temp={:.1}°C", celsius);

        sender
            .send(&codec::encode_temperature(&identity, shadow.mode, shadow.fan, celsius))
            .await
            .map_err(|e| {
                error!("Failed to set temperature on {}: {}", self.state.config.host, e);
                e
            })?;

        self.settle_and_refresh().await;
        Ok(())
    }

    /// Switch to cooling
    pub async fn turn_on(&self) -> Result<()> {
        self.set_mode(Mode::Cool, None).await
    }

    pub async fn turn_off(&self) -> Result<()> {
        self.set_mode(Mode::Off, None).await
    }

    /// Identity, waiting out the grace period if it is not known yet
    async fn ready_identity(&self) -> Result<DeviceIdentity> {
        if let Some(identity) = self.state.identity.get() {
            return Ok(identity);
        }

        let grace = self.state.config.identity_grace;
        warn!("Device identity not yet known, waiting up to {:?}", grace);

        self.state.identity.wait(grace).await.ok_or_else(|| {
            error!("Cannot send command to {} without device identity", self.state.config.host);
            ClientError::DeviceNotReady(grace)
        })
    }

    async fn settle_and_refresh(&self) {
        tokio::time::sleep(self.state.config.command_settle).await;
        self.refresh().await;
    }

    /// Out-of-band status refresh: polling waits for the reply, the broadcast
    /// loop catches it on its own
    async fn refresh(&self) {
        if self.state.config.policy.waits_for_reply() {
            self.state
                .request_and_wait(self.state.config.reply_timeout)
                .await;
        } else if let Err(e) = self.state.send_status_request().await {
            warn!("Status refresh failed: {}", e);
        }
    }
}

impl Drop for BghClient {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}
