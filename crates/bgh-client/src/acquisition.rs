//! Background status acquisition
//!
//! One task per connected client keeps the cached status fresh:
//!
//! ```text
//!   BroadcastWithFallback:
//!
//!     ┌──────────────────────┐   timeout / send request   ┌──────────────────┐
//!     │  AwaitingBroadcast   │ ─────────────────────────▶ │ PollingFallback  │ ─┐
//!     └──────────────────────┘                            └──────────────────┘  │ timeout /
//!                ▲                  valid frame                   │     ▲        │ send request
//!                └────────────────────────────────────────────────┘     └────────┘
//!
//!   Polling:
//!
//!     every interval: send request, wait for the reply, skip the cycle on timeout
//! ```

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::AcquisitionPolicy;
use crate::state::{ClientState, Received};

/// Where the background task is in its acquisition cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    /// Listening for unsolicited broadcasts
    AwaitingBroadcast,
    /// Broadcasts went quiet; requesting status after every silent period
    PollingFallback,
    /// Fixed-interval polling
    Polling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    StatusReceived,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    None,
    RequestStatus,
}

impl AcquisitionState {
    pub(crate) fn initial(policy: &AcquisitionPolicy) -> Self {
        match policy {
            AcquisitionPolicy::BroadcastWithFallback { .. } => AcquisitionState::AwaitingBroadcast,
            AcquisitionPolicy::Polling { .. } => AcquisitionState::Polling,
        }
    }

    pub(crate) fn on_event(self, event: Event) -> (Self, Action) {
        match (self, event) {
            (AcquisitionState::Polling, _) => (AcquisitionState::Polling, Action::None),
            (_, Event::StatusReceived) => (AcquisitionState::AwaitingBroadcast, Action::None),
            (_, Event::Timeout) => (AcquisitionState::PollingFallback, Action::RequestStatus),
        }
    }
}

/// Floor for the pause after a socket error
const MIN_RETRY_DELAY: Duration = Duration::from_millis(100);

fn retry_delay(settle: Duration) -> Duration {
    settle.max(MIN_RETRY_DELAY)
}

/// Run the acquisition loop for the configured policy until the client closes
pub(crate) async fn run(state: Arc<ClientState>) {
    match state.config.policy {
        AcquisitionPolicy::BroadcastWithFallback {
            broadcast_timeout,
            fallback_settle,
        } => run_broadcast(&state, broadcast_timeout, fallback_settle).await,
        AcquisitionPolicy::Polling { interval } => run_polling(&state, interval).await,
    }
    debug!("Acquisition loop exited for {}", state.config.host);
}

async fn run_broadcast(state: &ClientState, broadcast_timeout: Duration, settle: Duration) {
    info!(
        "Listening for broadcasts from {} (fallback after {:?})",
        state.config.host, broadcast_timeout
    );

    loop {
        let event = match state.listen(Instant::now() + broadcast_timeout).await {
            Received::Status(_) => Event::StatusReceived,
            Received::TimedOut => Event::Timeout,
            Received::Closed => break,
            Received::Failed(e) => {
                warn!("Status socket error: {}", e);
                tokio::time::sleep(retry_delay(settle)).await;
                continue;
            }
        };

        let action = state.advance(event);
        if action == Action::RequestStatus {
            debug!("No broadcast within {:?}, polling {}", broadcast_timeout, state.config.host);
            if let Err(e) = state.send_status_request().await {
                error!("Fallback status request failed: {}", e);
            }
            tokio::time::sleep(settle).await;
        }
    }
}

async fn run_polling(state: &ClientState, interval: Duration) {
    info!("Polling {} every {:?}", state.config.host, interval);

    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match state.poll(state.config.reply_timeout).await {
            Received::Status(_) => {}
            Received::TimedOut => warn!("No response to status poll from {}", state.config.host),
            Received::Closed => break,
            Received::Failed(e) => error!("Status poll failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        assert_eq!(
            AcquisitionState::initial(&AcquisitionPolicy::broadcast()),
            AcquisitionState::AwaitingBroadcast
        );
        assert_eq!(
            AcquisitionState::initial(&AcquisitionPolicy::polling()),
            AcquisitionState::Polling
        );
    }

    #[test]
    fn test_timeout_falls_back_to_polling() {
        let (next, action) = AcquisitionState::AwaitingBroadcast.on_event(Event::Timeout);
        assert_eq!(next, AcquisitionState::PollingFallback);
        assert_eq!(action, Action::RequestStatus);
    }

    #[test]
    fn test_fallback_keeps_polling_until_frame() {
        let mut state = AcquisitionState::AwaitingBroadcast;
        for _ in 0..3 {
            let (next, action) = state.on_event(Event::Timeout);
            assert_eq!(next, AcquisitionState::PollingFallback);
            assert_eq!(action, Action::RequestStatus);
            state = next;
        }

        let (next, action) = state.on_event(Event::StatusReceived);
        assert_eq!(next, AcquisitionState::AwaitingBroadcast);
        assert_eq!(action, Action::None);
    }

    #[test]
    fn test_broadcast_frame_keeps_waiting() {
        let (next, action) = AcquisitionState::AwaitingBroadcast.on_event(Event::StatusReceived);
        assert_eq!(next, AcquisitionState::AwaitingBroadcast);
        assert_eq!(action, Action::None);
    }

    #[test]
    fn test_retry_delay_has_floor() {
        assert_eq!(retry_delay(Duration::ZERO), MIN_RETRY_DELAY);
        assert_eq!(retry_delay(Duration::from_millis(500)), Duration::from_millis(500));
    }

    #[test]
    fn test_polling_never_transitions() {
        for event in [Event::Timeout, Event::StatusReceived] {
            let (next, action) = AcquisitionState::Polling.on_event(event);
            assert_eq!(next, AcquisitionState::Polling);
            assert_eq!(action, Action::None);
        }
    }
}
