//! UDP transport implementation

use bytes::Bytes;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// UDP configuration
#[derive(Debug, Clone)]
pub struct UdpConfig {
    /// Largest datagram accepted on the status socket
    pub max_packet_size: usize,
    /// Enable SO_REUSEADDR on the status socket
    pub reuse_address: bool,
    /// Enable SO_BROADCAST on the status socket
    pub broadcast: bool,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            max_packet_size: 1024,
            reuse_address: true,
            broadcast: true,
        }
    }
}

/// A datagram read from the status socket
#[derive(Debug, Clone)]
pub struct Datagram {
    pub data: Bytes,
    pub from: SocketAddr,
}

/// Socket bound to the listen port, receiving replies and broadcasts
pub struct StatusReceiver {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl StatusReceiver {
    /// Bind with the default configuration
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        Self::bind_with_config(addr, UdpConfig::default())
    }

    /// Bind with config.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind_with_config(addr: SocketAddr, config: UdpConfig) -> Result<Self> {
        let bind_err = |source| TransportError::BindFailed { addr, source };

        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))
            .map_err(bind_err)?;
        socket
            .set_reuse_address(config.reuse_address)
            .map_err(bind_err)?;
        socket.set_broadcast(config.broadcast).map_err(bind_err)?;
        socket.set_nonblocking(true).map_err(bind_err)?;
        socket.bind(&addr.into()).map_err(bind_err)?;

        let socket = UdpSocket::from_std(socket.into()).map_err(bind_err)?;
        info!("Status socket bound to {}", socket.local_addr()?);

        Ok(Self {
            socket,
            buf: vec![0u8; config.max_packet_size],
        })
    }

    /// Get local address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(TransportError::Io)
    }

    /// Wait for the next datagram
    pub async fn recv(&mut self) -> Result<Datagram> {
        let (len, from) = self
            .socket
            .recv_from(&mut self.buf)
            .await
            .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;

        debug!("UDP received {} bytes from {}", len, from);
        Ok(Datagram {
            data: Bytes::copy_from_slice(&self.buf[..len]),
            from,
        })
    }

    /// Next already-queued datagram, `None` when the socket is empty
    pub fn try_recv(&mut self) -> Result<Option<Datagram>> {
        match self.socket.try_recv_from(&mut self.buf) {
            Ok((len, from)) => {
                debug!("UDP drained {} bytes from {}", len, from);
                Ok(Some(Datagram {
                    data: Bytes::copy_from_slice(&self.buf[..len]),
                    from,
                }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(TransportError::ReceiveFailed(e.to_string())),
        }
    }

    /// Wait for the next datagram, giving up after `timeout`
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Result<Datagram> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        }
    }
}

/// Sends commands to the unit's command port.
///
/// Ephemeral senders open a fresh socket per datagram. Persistent senders
/// keep one socket for the client's lifetime, optionally on a fixed source
/// port.
pub struct CommandSender {
    target: SocketAddr,
    socket: Option<UdpSocket>,
}

impl CommandSender {
    /// Sender that opens and closes a socket for every datagram
    pub fn ephemeral(target: SocketAddr) -> Self {
        Self {
            target,
            socket: None,
        }
    }

    /// Sender reusing one socket, bound to `source_port` or a system-assigned port
    pub async fn persistent(target: SocketAddr, source_port: Option<u16>) -> Result<Self> {
        let socket = bind_source(target, source_port.unwrap_or(0)).await?;
        debug!("Command socket bound to {}", socket.local_addr()?);

        Ok(Self {
            target,
            socket: Some(socket),
        })
    }

    /// Where commands are sent
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Whether this sender keeps its socket between datagrams
    pub fn is_persistent(&self) -> bool {
        self.socket.is_some()
    }

    /// Send one datagram. No acknowledgment is expected.
    pub async fn send(&self, data: &[u8]) -> Result<()> {
        debug!("Sending {} bytes to {}", data.len(), self.target);

        match &self.socket {
            Some(socket) => send_on(socket, data, self.target).await,
            None => {
                let socket = bind_source(self.target, 0).await?;
                send_on(&socket, data, self.target).await
            }
        }
    }
}

async fn send_on(socket: &UdpSocket, data: &[u8], target: SocketAddr) -> Result<()> {
    socket
        .send_to(data, target)
        .await
        .map_err(|e| TransportError::SendFailed(e.to_string()))?;
    Ok(())
}

/// Bind a send socket in the same address family as `target`
async fn bind_source(target: SocketAddr, port: u16) -> Result<UdpSocket> {
    let addr = match target {
        SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
        SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, port)),
    };

    UdpSocket::bind(addr)
        .await
        .map_err(|source| TransportError::BindFailed { addr, source })
}
