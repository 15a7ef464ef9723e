//! Per-connection client state shared with the background task

use bgh_core::{codec, Status, FAN_LOW};
use bgh_transport::{CommandSender, Datagram, StatusReceiver, TransportError};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::acquisition::{AcquisitionState, Action, Event};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::identity::IdentityResolver;
use crate::subscription::{StatusSubscription, SUBSCRIPTION_CAPACITY};

/// Best-guess mode and fan, used to fill fields a command does not change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shadow {
    pub mode: u8,
    pub fan: u8,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            mode: 0,
            fan: FAN_LOW,
        }
    }
}

/// Outcome of waiting on the status socket
#[derive(Debug)]
pub(crate) enum Received {
    Status(Status),
    TimedOut,
    /// The client was closed
    Closed,
    Failed(TransportError),
}

pub(crate) struct ClientState {
    pub(crate) config: ClientConfig,
    pub(crate) identity: IdentityResolver,
    status: RwLock<Option<Status>>,
    shadow: Mutex<Shadow>,
    acquisition: Mutex<AcquisitionState>,
    status_tx: broadcast::Sender<Status>,
    /// Whoever holds this lock is the one listening
    receiver: tokio::sync::Mutex<Option<StatusReceiver>>,
    sender: RwLock<Option<Arc<CommandSender>>>,
}

impl ClientState {
    pub(crate) fn new(config: ClientConfig) -> Self {
        let (status_tx, _) = broadcast::channel(SUBSCRIPTION_CAPACITY);
        let acquisition = AcquisitionState::initial(&config.policy);

        Self {
            config,
            identity: IdentityResolver::new(),
            status: RwLock::new(None),
            shadow: Mutex::new(Shadow::default()),
            acquisition: Mutex::new(acquisition),
            status_tx,
            receiver: tokio::sync::Mutex::new(None),
            sender: RwLock::new(None),
        }
    }

    /// Install fresh sockets for a new connection
    pub(crate) async fn attach(&self, receiver: StatusReceiver, sender: CommandSender) {
        self.reset();
        *self.receiver.lock().await = Some(receiver);
        *self.sender.write() = Some(Arc::new(sender));
    }

    /// Release both sockets and forget everything learned on this connection
    pub(crate) async fn detach(&self) {
        *self.sender.write() = None;
        *self.receiver.lock().await = None;
        self.reset();
    }

    fn reset(&self) {
        self.identity.reset();
        *self.status.write() = None;
        *self.shadow.lock() = Shadow::default();
        *self.acquisition.lock() = AcquisitionState::initial(&self.config.policy);
    }

    pub(crate) fn sender(&self) -> Option<Arc<CommandSender>> {
        self.sender.read().clone()
    }

    pub(crate) fn cached(&self) -> Option<Status> {
        self.status.read().clone()
    }

    pub(crate) fn shadow(&self) -> Shadow {
        *self.shadow.lock()
    }

    /// Record a commanded mode (and fan, if given), returning the values to send
    pub(crate) fn command_shadow(&self, mode: Option<u8>, fan: Option<u8>) -> Shadow {
        let mut shadow = self.shadow.lock();
        if let Some(mode) = mode {
            shadow.mode = mode;
        }
        if let Some(fan) = fan {
            shadow.fan = fan;
        }
        *shadow
    }

    pub(crate) fn acquisition_state(&self) -> AcquisitionState {
        *self.acquisition.lock()
    }

    /// Feed an event to the acquisition state machine, returning its action
    pub(crate) fn advance(&self, event: Event) -> Action {
        let mut current = self.acquisition.lock();
        let (next, action) = current.on_event(event);
        if *current != next {
            info!("Acquisition state {:?} -> {:?}", *current, next);
            *current = next;
        }
        action
    }

    pub(crate) fn subscribe(&self) -> StatusSubscription {
        StatusSubscription::new(self.status_tx.subscribe())
    }

    /// Fire a status request at the device
    pub(crate) async fn send_status_request(&self) -> Result<()> {
        let sender = self.sender().ok_or(ClientError::NotConnected)?;
        sender.send(&codec::encode_status_request()).await?;
        debug!("Status request sent to {}", sender.target());
        Ok(())
    }

    /// Validate an inbound datagram, learning identity and publishing its status.
    ///
    /// Anything not from the configured host, or too short, is dropped here.
    pub(crate) fn accept(&self, datagram: &Datagram) -> Option<Status> {
        if datagram.from.ip() != self.config.host {
            debug!("Discarding {} bytes from {}", datagram.data.len(), datagram.from);
            return None;
        }

        self.identity.observe(&datagram.data);

        match codec::decode_status(&datagram.data) {
            Ok(status) => {
                self.publish(status.clone());
                Some(status)
            }
            Err(e) => {
                warn!("Dropping frame from {}: {}", datagram.from, e);
                None
            }
        }
    }

    fn publish(&self, status: Status) {
        {
            let mut shadow = self.shadow.lock();
            shadow.mode = status.mode_raw;
            shadow.fan = status.fan_speed;
        }
        *self.status.write() = Some(status.clone());

        // A decoded frame ends a broadcast fallback, whoever read it
        self.advance(Event::StatusReceived);

        info!(
            "Status updated: mode={}, fan={}, temp={:.1}°C, target={:.1}°C",
            status.mode, status.fan_speed, status.current_temperature, status.target_temperature
        );

        // No subscribers is not an error
        let _ = self.status_tx.send(status);
    }

    /// Receive until a valid status arrives or `deadline` passes
    pub(crate) async fn receive_status(
        &self,
        receiver: &mut StatusReceiver,
        deadline: Instant,
    ) -> Received {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Received::TimedOut;
            }

            match receiver.recv_timeout(remaining).await {
                Ok(datagram) => {
                    if let Some(status) = self.accept(&datagram) {
                        return Received::Status(status);
                    }
                }
                Err(TransportError::Timeout) => return Received::TimedOut,
                Err(e) => return Received::Failed(e),
            }
        }
    }

    /// Publish whatever queued up while nobody was listening.
    ///
    /// Leaves only datagrams sent after this call for the next receive.
    fn drain(&self, receiver: &mut StatusReceiver) {
        loop {
            match receiver.try_recv() {
                Ok(Some(datagram)) => {
                    self.accept(&datagram);
                }
                Ok(None) => return,
                Err(e) => {
                    warn!("Failed to drain status socket: {}", e);
                    return;
                }
            }
        }
    }

    /// Send a status request and wait for the frame that follows it
    async fn request_on(&self, receiver: &mut StatusReceiver, deadline: Instant) -> Received {
        self.drain(receiver);

        if let Err(e) = self.send_status_request().await {
            warn!("Failed to send status request: {}", e);
            return match e {
                ClientError::Transport(e) => Received::Failed(e),
                _ => Received::Closed,
            };
        }

        self.receive_status(receiver, deadline).await
    }

    /// Wait for the socket, send a status request, and wait for the reply
    pub(crate) async fn poll(&self, timeout: Duration) -> Received {
        let mut guard = self.receiver.lock().await;
        match guard.as_mut() {
            Some(receiver) => self.request_on(receiver, Instant::now() + timeout).await,
            None => Received::Closed,
        }
    }

    /// Wait on the socket for up to `deadline` without sending anything
    pub(crate) async fn listen(&self, deadline: Instant) -> Received {
        let mut guard = self.receiver.lock().await;
        match guard.as_mut() {
            Some(receiver) => self.receive_status(receiver, deadline).await,
            None => Received::Closed,
        }
    }

    /// Request status and wait up to `timeout` for the next decoded one.
    ///
    /// If the socket is idle the reply is read here; otherwise whoever is
    /// listening decodes it and the result arrives through the status channel.
    pub(crate) async fn request_and_wait(&self, timeout: Duration) -> Option<Status> {
        let deadline = Instant::now() + timeout;
        let mut updates = self.status_tx.subscribe();

        if let Ok(mut guard) = self.receiver.try_lock() {
            let receiver = guard.as_mut()?;
            return match self.request_on(receiver, deadline).await {
                Received::Status(status) => Some(status),
                Received::TimedOut => {
                    warn!("No response to status request from {}", self.config.host);
                    None
                }
                _ => None,
            };
        }

        if let Err(e) = self.send_status_request().await {
            warn!("Failed to send status request: {}", e);
            return None;
        }

        loop {
            match tokio::time::timeout_at(deadline, updates.recv()).await {
                Ok(Ok(status)) => return Some(status),
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                Ok(Err(broadcast::error::RecvError::Closed)) => return None,
                Err(_) => {
                    warn!("No response to status request from {}", self.config.host);
                    return None;
                }
            }
        }
    }
}
