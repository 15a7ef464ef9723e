//! Device identity resolution
//!
//! The identity is learned from the first frame the configured host sends
//! and never changes afterwards. Write commands wait on it.

use bgh_core::DeviceIdentity;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

pub struct IdentityResolver {
    tx: watch::Sender<Option<DeviceIdentity>>,
}

impl IdentityResolver {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Current identity, if learned
    pub fn get(&self) -> Option<DeviceIdentity> {
        *self.tx.borrow()
    }

    /// Learn the identity from an accepted frame.
    ///
    /// Returns the identity only when this frame resolved it.
    pub fn observe(&self, frame: &[u8]) -> Option<DeviceIdentity> {
        let candidate = DeviceIdentity::from_frame(frame)?;

        let resolved = self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(candidate);
            true
        });

        if resolved {
            info!("Device identity resolved: {}", candidate);
            Some(candidate)
        } else {
            None
        }
    }

    /// Wait up to `grace` for the identity
    pub async fn wait(&self, grace: Duration) -> Option<DeviceIdentity> {
        let mut rx = self.tx.subscribe();
        let waited = tokio::time::timeout(grace, async {
            rx.wait_for(Option::is_some).await.ok().and_then(|id| *id)
        })
        .await;

        waited.ok().flatten()
    }

    /// Forget the identity, for a fresh connection
    pub fn reset(&self) {
        self.tx.send_replace(None);
    }
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new()
    }
}
