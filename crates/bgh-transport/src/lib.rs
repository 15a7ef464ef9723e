//! BGH Transport Layer
//!
//! UDP plumbing for talking to a BGH unit:
//! - [`CommandSender`]: one datagram per command to the unit's command port
//! - [`StatusReceiver`]: a broadcast-capable socket on the listen port that
//!   collects both direct replies and unsolicited status broadcasts

pub mod error;
pub mod udp;

pub use error::{Result, TransportError};
pub use udp::{CommandSender, Datagram, StatusReceiver, UdpConfig};
