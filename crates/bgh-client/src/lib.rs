//! BGH Client Library
//!
//! Async client for a single BGH Smart Control air-conditioning unit.
//!
//! The client learns the unit's identity from its own traffic, keeps a cached
//! [`Status`](bgh_core::Status) fresh from a background task, and sends mode
//! and setpoint commands.
//!
//! # Example
//!
//! ```no_run
//! use bgh_client::BghClient;
//! use bgh_core::Mode;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bgh_client::ClientError> {
//!     let client = BghClient::connect_to("192.168.1.50").await?;
//!
//!     if let Some(status) = client.get_status().await {
//!         println!("{} at {:.1}°C", status.mode, status.current_temperature);
//!     }
//!
//!     client.set_mode(Mode::Cool, Some(bgh_core::FAN_MEDIUM)).await?;
//!     client.set_temperature(23.0).await?;
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```

pub mod acquisition;
pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod identity;
pub mod subscription;

mod state;

pub use acquisition::AcquisitionState;
pub use builder::BghClientBuilder;
pub use client::BghClient;
pub use config::{AcquisitionPolicy, ClientConfig};
pub use error::{ClientError, Result};
pub use state::Shadow;
pub use subscription::{Notification, StatusSubscription};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::builder::BghClientBuilder;
    pub use crate::client::BghClient;
    pub use crate::config::AcquisitionPolicy;
    pub use crate::error::{ClientError, Result};
    pub use bgh_core::{DeviceIdentity, Mode, Status};
}
