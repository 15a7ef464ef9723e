//! Status change subscriptions

use bgh_core::Status;
use tokio::sync::broadcast;
use tracing::warn;

/// Per-subscriber buffer; slower subscribers see [`Notification::Lagged`]
pub const SUBSCRIPTION_CAPACITY: usize = 64;

/// What a subscriber receives
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A freshly decoded status
    Status(Status),
    /// This many statuses were dropped because the subscriber fell behind
    Lagged(u64),
}

/// Receives every decoded status, in decode order.
///
/// Dropping the subscription unsubscribes.
pub struct StatusSubscription {
    rx: broadcast::Receiver<Status>,
}

impl StatusSubscription {
    pub(crate) fn new(rx: broadcast::Receiver<Status>) -> Self {
        Self { rx }
    }

    /// Next notification, `None` once the client is gone
    pub async fn next(&mut self) -> Option<Notification> {
        match self.rx.recv().await {
            Ok(status) => Some(Notification::Status(status)),
            Err(broadcast::error::RecvError::Lagged(n)) => Some(Notification::Lagged(n)),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Next status, skipping over lag notices
    pub async fn recv(&mut self) -> Option<Status> {
        loop {
            match self.next().await? {
                Notification::Status(status) => return Some(status),
                Notification::Lagged(n) => warn!("Status subscriber lagged, {} updates dropped", n),
            }
        }
    }

    /// Next status if one is already queued
    pub fn try_recv(&mut self) -> Option<Status> {
        loop {
            match self.rx.try_recv() {
                Ok(status) => return Some(status),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Status subscriber lagged, {} updates dropped", n)
                }
                Err(_) => return None,
            }
        }
    }
}
